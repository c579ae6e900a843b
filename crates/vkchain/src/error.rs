//! Initialization error types.

use ash::vk;
use std::ffi::NulError;
use thiserror::Error;

/// Errors surfaced by the initialization chain.
///
/// Nothing in this crate recovers from these; every variant is handed back to
/// the caller unchanged.
#[derive(Error, Debug)]
pub enum InitError {
    /// The Vulkan loader could not be loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// A name handed to the driver contained an interior NUL byte.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NulError),

    /// A step needs an extension that was not requested.
    #[error("Required extension not enabled: {0}")]
    ExtensionNotEnabled(String),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No queue family supports graphics.
    #[error("No queue family supports graphics")]
    NoGraphicsQueue,

    /// No queue family can present to the attached surface.
    #[error("No queue family can present to the surface")]
    NoPresentationQueue,

    /// A swapchain was requested but no surface is attached.
    #[error("No surface attached")]
    MissingSurface,

    /// The surface reports no formats or no present modes.
    #[error("Surface reports {formats} formats and {present_modes} present modes")]
    NoSurfaceConfiguration {
        formats: usize,
        present_modes: usize,
    },

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, InitError>;
