//! Probe configuration and command-line parsing.

use anyhow::{bail, Context};

/// Probe configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Window title, also used as the application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Request the Khronos validation layer (default: debug builds only).
    pub validation: bool,
    /// Attach a debug messenger that logs driver messages.
    pub debug_output: bool,
    /// Skip the window, surface and swapchain.
    pub headless: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            title: "vkchain probe".to_string(),
            width: 200,
            height: 200,
            validation: cfg!(debug_assertions),
            debug_output: true,
            headless: false,
        }
    }
}

impl ProbeConfig {
    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable the debug messenger.
    pub fn with_debug_output(mut self, debug_output: bool) -> Self {
        self.debug_output = debug_output;
        self
    }

    /// Run without a window.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Build a config from command-line arguments (without the program
    /// name). Returns `None` when help was requested.
    pub fn from_args<I>(args: I) -> anyhow::Result<Option<Self>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--no-validation" => config = config.with_validation(false),
                "--validation" => config = config.with_validation(true),
                "--no-debug" => config = config.with_debug_output(false),
                "--headless" => config = config.with_headless(true),
                "--size" => {
                    let value = args.next().context("--size needs a value like 640x480")?;
                    let (width, height) = parse_size(&value)?;
                    config = config.with_size(width, height);
                }
                other => bail!("Unknown argument: {other}"),
            }
        }

        Ok(Some(config))
    }
}

fn parse_size(value: &str) -> anyhow::Result<(u32, u32)> {
    let (width, height) = value
        .split_once('x')
        .with_context(|| format!("Invalid size {value:?}, expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .parse()
        .with_context(|| format!("Invalid width in {value:?}"))?;
    let height: u32 = height
        .parse()
        .with_context(|| format!("Invalid height in {value:?}"))?;
    if width == 0 || height == 0 {
        bail!("Size must be non-zero, got {value:?}");
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Option<ProbeConfig>> {
        ProbeConfig::from_args(args.iter().map(|arg| (*arg).to_string()))
    }

    #[test]
    fn no_arguments_gives_defaults() {
        assert_eq!(parse(&[]).unwrap(), Some(ProbeConfig::default()));
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(&["--no-debug", "-h", "--bogus"]).unwrap(), None);
    }

    #[test]
    fn flags_apply() {
        let config = parse(&["--no-validation", "--no-debug", "--headless", "--size", "640x480"])
            .unwrap()
            .unwrap();
        assert!(!config.validation);
        assert!(!config.debug_output);
        assert!(config.headless);
        assert_eq!((config.width, config.height), (640, 480));
    }

    #[test]
    fn bad_sizes_are_rejected() {
        assert!(parse(&["--size"]).is_err());
        assert!(parse(&["--size", "640"]).is_err());
        assert!(parse(&["--size", "0x480"]).is_err());
        assert!(parse(&["--size", "ax480"]).is_err());
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = parse(&["--fullscreen"]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown argument: --fullscreen");
    }
}
