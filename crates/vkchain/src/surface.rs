//! Presentation surface attachment and queries.
//!
//! A surface is created from anything exposing `raw-window-handle` handles,
//! or adopted from a handle the caller created elsewhere.

use crate::error::{InitError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// A window's presentation target, owned by the initialization chain.
pub struct Surface {
    surface: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The instance must be valid and the window must outlive the surface.
    pub(crate) unsafe fn from_window<W>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| InitError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| InitError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = ash_window::create_surface(
            entry,
            instance,
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )
        .map_err(|e| InitError::SurfaceCreation(e.to_string()))?;

        Ok(Self::adopt(entry, instance, surface))
    }

    /// Take ownership of an existing surface.
    pub(crate) fn adopt(
        entry: &ash::Entry,
        instance: &ash::Instance,
        surface: vk::SurfaceKHR,
    ) -> Self {
        Self {
            surface,
            loader: ash::khr::surface::Instance::new(entry, instance),
        }
    }

    /// The raw surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Whether a queue family of the device can present to this surface.
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        family: u32,
    ) -> Result<bool> {
        let supported = unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, family, self.surface)?
        };
        Ok(supported)
    }

    /// Presentation support for the first `family_count` queue families.
    pub fn present_support(
        &self,
        physical_device: vk::PhysicalDevice,
        family_count: usize,
    ) -> Result<Vec<bool>> {
        (0..)
            .take(family_count)
            .map(|family| self.supports_present(physical_device, family))
            .collect()
    }

    /// Query surface capabilities, formats and present modes.
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceCapabilities> {
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)?;

            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.surface)?;

            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)?;

            Ok(SurfaceCapabilities {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// Must be called once, before the instance is destroyed, with no
    /// swapchain still using the surface.
    pub(crate) unsafe fn destroy(&self) {
        self.loader.destroy_surface(self.surface, None);
    }
}

/// Surface capabilities query result.
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats, in driver order.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes, in driver order.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilities {
    /// Whether the surface can be presented to at all.
    pub fn is_presentable(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Fail unless at least one format and one present mode are reported.
    pub fn ensure_presentable(&self) -> Result<()> {
        if self.is_presentable() {
            Ok(())
        } else {
            Err(InitError::NoSurfaceConfiguration {
                formats: self.formats.len(),
                present_modes: self.present_modes.len(),
            })
        }
    }
}
