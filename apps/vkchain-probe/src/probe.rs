//! Runs the initialization chain and collects what it picked.

use ash::vk;
use raw_window_handle::HasDisplayHandle;
use tracing::{error, info};
use vkchain::{Attachments, SurfaceDesign, SwapchainOptions};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::ProbeConfig;

/// What the chain selected.
#[derive(Debug)]
pub struct ProbeReport {
    pub device: String,
    pub attachments: Attachments,
    pub graphics_family: Option<u32>,
    pub presentation_family: Option<u32>,
    pub queues: usize,
    pub swapchain: Option<SwapchainReport>,
}

#[derive(Debug)]
pub struct SwapchainReport {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub images: usize,
}

impl ProbeReport {
    pub fn log(&self) {
        info!("Device: {}", self.device);
        info!("Attachments: {:?}", self.attachments);
        info!(
            "Queue families: graphics {:?}, presentation {:?} ({} queues)",
            self.graphics_family, self.presentation_family, self.queues
        );
        match &self.swapchain {
            Some(swapchain) => info!(
                "Swapchain: {:?} / {:?}, {:?}, {}x{}, {} images",
                swapchain.format.format,
                swapchain.format.color_space,
                swapchain.present_mode,
                swapchain.extent.width,
                swapchain.extent.height,
                swapchain.images
            ),
            None => info!("Swapchain: none"),
        }
    }
}

/// Run every step of the chain, optionally against a window.
pub fn run_chain(config: &ProbeConfig, window: Option<&Window>) -> anyhow::Result<ProbeReport> {
    let version = vk::make_api_version(0, 0, 1, 0);
    let mut builder = vkchain::create_application(
        "vkchain",
        &config.title,
        version,
        version,
        vk::API_VERSION_1_0,
    )?;

    if config.debug_output {
        builder.add_extension(ash::ext::debug_utils::NAME);
    }
    if config.validation {
        builder.with_validation();
    }
    if let Some(window) = window {
        builder.add_window_extensions(window.display_handle()?.as_raw())?;
    }

    let mut instance = builder.start_instance()?;

    if config.debug_output {
        instance.with_default_debug_output()?;
    }
    if let Some(window) = window {
        // The window is owned by the caller and outlives this function
        unsafe { instance.with_surface(window)? };
    }

    let device_extensions: &[&std::ffi::CStr] = if window.is_some() {
        &[ash::khr::swapchain::NAME]
    } else {
        &[]
    };

    let device = instance
        .select_physical_device(None)?
        .create_device(None, device_extensions)?;

    let queues = device.retrieve_queues();
    let indices = device.default_queue_indices();

    let swapchain = match window {
        Some(window) => {
            let size = window.inner_size();
            let designer = |caps: &vk::SurfaceCapabilitiesKHR| {
                SurfaceDesign::fit_window(caps, size.width, size.height)
            };
            let swapchain = device.create_swapchain(&SwapchainOptions::new(&designer))?;
            Some(SwapchainReport {
                format: swapchain.format,
                present_mode: swapchain.present_mode,
                extent: swapchain.extent,
                images: swapchain.image_count(),
            })
        }
        None => None,
    };

    let report = ProbeReport {
        device: device.device_info().summary(),
        attachments: device.attachments(),
        graphics_family: indices.map(|indices| indices.graphics_family),
        presentation_family: indices.and_then(|indices| indices.presentation_family),
        queues: queues.handles().len(),
        swapchain,
    };

    device.wait_idle()?;
    device.terminate();

    Ok(report)
}

/// Open a window, probe against it and exit.
pub fn run_windowed(config: ProbeConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut runner = ProbeRunner {
        config,
        window: None,
        outcome: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.outcome {
        Some(outcome) => outcome.map(|report| report.log()),
        None => anyhow::bail!("Event loop exited before the window was created"),
    }
}

struct ProbeRunner {
    config: ProbeConfig,
    window: Option<Window>,
    outcome: Option<anyhow::Result<ProbeReport>>,
}

impl ApplicationHandler for ProbeRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {e}");
                self.outcome = Some(Err(e.into()));
                event_loop.exit();
                return;
            }
        };

        info!("Running initialization chain...");
        self.outcome = Some(run_chain(&self.config, Some(&window)));
        self.window = Some(window);
        event_loop.exit();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if event == WindowEvent::CloseRequested {
            event_loop.exit();
        }
    }
}
