//! The staged initialization chain.
//!
//! Each stage owns exactly the handles that are valid at that point:
//!
//! ```text
//! InstanceBuilder --start_instance--> InstanceContext
//!     --select_physical_device--> PhysicalDeviceContext
//!     --create_device--> DeviceContext --create_swapchain--> Swapchain<'_>
//! ```
//!
//! Transitions move the previous stage, so skipping a step or reusing a
//! terminated stage does not compile. Resources are released exactly once,
//! by `terminate` or by dropping the stage.

use crate::capabilities::DeviceInfo;
use crate::debug::{DebugMessenger, DebugOutput};
use crate::device::{
    create_logical_device, DefaultDesigner, DeviceDesigner, DeviceEnumerator, DeviceTarget,
    FirstDevice,
};
use crate::error::{InitError, Result};
use crate::instance::InstanceCore;
use crate::queue::{DefaultQueueIndices, QueueLocator, RetrievedQueues};
use crate::surface::{Surface, SurfaceCapabilities};
use crate::swapchain::{
    resolve_image_sharing, ImageSharing, Swapchain, SwapchainOptions, SwapchainPlan,
};
use ash::vk;
use bitflags::bitflags;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};

bitflags! {
    /// Optional instance-level objects that have been attached.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attachments: u32 {
        const DEBUG_MESSENGER = 1;
        const SURFACE = 1 << 1;
    }
}

fn attachments_of(core: &InstanceCore) -> Attachments {
    let mut attachments = Attachments::empty();
    attachments.set(Attachments::DEBUG_MESSENGER, core.debug.is_some());
    attachments.set(Attachments::SURFACE, core.surface.is_some());
    attachments
}

/// A live Vulkan instance, optionally with a debug messenger and a surface.
pub struct InstanceContext {
    core: InstanceCore,
}

impl InstanceContext {
    pub(crate) fn new(core: InstanceCore) -> Self {
        Self { core }
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.core.instance
    }

    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.core.entry
    }

    /// Instance extensions the instance was created with.
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.core.extensions
    }

    /// Layers the instance was created with.
    pub fn enabled_layers(&self) -> &[CString] {
        &self.core.layers
    }

    /// Which optional objects are attached.
    pub fn attachments(&self) -> Attachments {
        attachments_of(&self.core)
    }

    /// The attached surface, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.core.surface.as_ref()
    }

    /// The debug messenger handle, if one is attached.
    pub fn debug_messenger(&self) -> Option<vk::DebugUtilsMessengerEXT> {
        self.core.debug.as_ref().map(DebugMessenger::handle)
    }

    /// Attach a debug messenger. Replaces any previous one.
    ///
    /// Needs `VK_EXT_debug_utils` among the instance extensions.
    pub fn with_debug_output(&mut self, output: DebugOutput) -> Result<&mut Self> {
        self.core.require_extension(ash::ext::debug_utils::NAME)?;

        let messenger =
            unsafe { DebugMessenger::new(&self.core.entry, &self.core.instance, &output)? };
        if let Some(previous) = self.core.debug.replace(messenger) {
            unsafe { previous.destroy() };
        }

        tracing::debug!("Debug messenger attached");
        Ok(self)
    }

    /// Attach a debug messenger that forwards every message to `tracing`.
    pub fn with_default_debug_output(&mut self) -> Result<&mut Self> {
        self.with_debug_output(DebugOutput::default())
    }

    /// Create and attach a surface for a window. Replaces any previous one.
    ///
    /// Needs `VK_KHR_surface` and the platform surface extension among the
    /// instance extensions.
    ///
    /// # Safety
    /// The window must outlive this context and every stage built from it.
    pub unsafe fn with_surface<W>(&mut self, window: &W) -> Result<&mut Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        self.core.require_extension(ash::khr::surface::NAME)?;

        let surface = Surface::from_window(&self.core.entry, &self.core.instance, window)?;
        self.attach_surface(surface);
        Ok(self)
    }

    /// Attach a surface created elsewhere; the chain takes ownership.
    ///
    /// # Safety
    /// `surface` must belong to this instance and must not be destroyed by
    /// anyone else.
    pub unsafe fn with_surface_handle(&mut self, surface: vk::SurfaceKHR) -> Result<&mut Self> {
        self.core.require_extension(ash::khr::surface::NAME)?;

        let surface = Surface::adopt(&self.core.entry, &self.core.instance, surface);
        self.attach_surface(surface);
        Ok(self)
    }

    fn attach_surface(&mut self, surface: Surface) {
        if let Some(previous) = self.core.surface.replace(surface) {
            unsafe { previous.destroy() };
        }
        tracing::debug!("Surface attached");
    }

    /// Pick the physical device. `None` takes the first enumerated one.
    pub fn select_physical_device(
        self,
        enumerator: Option<&dyn DeviceEnumerator>,
    ) -> Result<PhysicalDeviceContext> {
        let devices = unsafe { self.core.instance.enumerate_physical_devices()? };
        if devices.is_empty() {
            return Err(InitError::NoSuitableDevice);
        }

        let physical_device = enumerator
            .unwrap_or(&FirstDevice)
            .choose(&self.core.instance, &devices)
            .ok_or(InitError::NoSuitableDevice)?;

        let info = unsafe { DeviceInfo::query(&self.core.instance, physical_device) };
        tracing::info!("Selected GPU: {}", info.summary());

        Ok(PhysicalDeviceContext {
            core: self.core,
            physical_device,
            info,
        })
    }

    /// Release the surface, debug messenger and instance.
    pub fn terminate(self) {
        drop(self);
    }
}

/// An instance with a chosen physical device.
pub struct PhysicalDeviceContext {
    core: InstanceCore,
    physical_device: vk::PhysicalDevice,
    info: DeviceInfo,
}

impl PhysicalDeviceContext {
    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.core.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Description of the chosen device.
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Which optional objects are attached.
    pub fn attachments(&self) -> Attachments {
        attachments_of(&self.core)
    }

    /// The attached surface, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.core.surface.as_ref()
    }

    /// Create the logical device with the given device extensions.
    ///
    /// `None` uses [`DefaultDesigner`]: one graphics queue and, if a surface
    /// is attached, one presentation queue.
    pub fn create_device(
        self,
        designer: Option<&mut dyn DeviceDesigner>,
        extensions: &[&CStr],
    ) -> Result<DeviceContext> {
        let target = DeviceTarget {
            instance: &self.core.instance,
            physical_device: self.physical_device,
            surface: self.core.surface.as_ref(),
            extensions,
        };

        let design = match designer {
            Some(designer) => designer.design(&target)?,
            None => DefaultDesigner.design(&target)?,
        };

        let device = unsafe {
            create_logical_device(&self.core.instance, self.physical_device, &design, extensions)?
        };

        tracing::debug!(
            queue_families = design.queues.len(),
            extensions = extensions.len(),
            "Logical device created"
        );

        Ok(DeviceContext {
            device,
            locator: design.locator,
            extensions: extensions.iter().map(|&ext| ext.to_owned()).collect(),
            physical_device: self.physical_device,
            info: self.info,
            core: self.core,
        })
    }

    /// Release the surface, debug messenger and instance.
    pub fn terminate(self) {
        drop(self);
    }
}

/// A logical device and everything it was built from.
pub struct DeviceContext {
    device: ash::Device,
    locator: QueueLocator,
    extensions: Vec<CString>,
    physical_device: vk::PhysicalDevice,
    info: DeviceInfo,
    core: InstanceCore,
}

impl DeviceContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.core.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Description of the device.
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Which optional objects are attached.
    pub fn attachments(&self) -> Attachments {
        attachments_of(&self.core)
    }

    /// The attached surface, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.core.surface.as_ref()
    }

    /// Device extensions the device was created with.
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// How queues are located on this device.
    pub fn queue_locator(&self) -> &QueueLocator {
        &self.locator
    }

    /// Family indices chosen by the default designer; `None` for custom
    /// designs.
    pub fn default_queue_indices(&self) -> Option<&DefaultQueueIndices> {
        match &self.locator {
            QueueLocator::Default(indices) => Some(indices),
            QueueLocator::Custom(_) => None,
        }
    }

    /// Fetch the device's queues.
    pub fn retrieve_queues(&self) -> RetrievedQueues {
        unsafe { self.locator.retrieve(&self.device) }
    }

    /// Query what the attached surface supports on this device.
    pub fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        self.core
            .surface
            .as_ref()
            .ok_or(InitError::MissingSurface)?
            .capabilities(self.physical_device)
    }

    /// Create a swapchain for the attached surface.
    ///
    /// Fails if no surface is attached, if `VK_KHR_swapchain` was not enabled
    /// on the device, or if the surface reports no formats or present modes.
    pub fn create_swapchain(&self, options: &SwapchainOptions<'_>) -> Result<Swapchain<'_>> {
        let surface = self.core.surface.as_ref().ok_or(InitError::MissingSurface)?;

        if !self
            .extensions
            .iter()
            .any(|ext| ext.as_c_str() == ash::khr::swapchain::NAME)
        {
            return Err(InitError::ExtensionNotEnabled(
                ash::khr::swapchain::NAME.to_string_lossy().into_owned(),
            ));
        }

        let caps = surface.capabilities(self.physical_device)?;
        caps.ensure_presentable()?;

        let sharing = self
            .locator
            .sharing_families()
            .map_or_else(ImageSharing::exclusive, |(graphics, presentation)| {
                resolve_image_sharing(graphics, presentation)
            });

        let plan = SwapchainPlan::choose(&caps, options, sharing);

        let swapchain = unsafe {
            Swapchain::new(
                &self.core.instance,
                &self.device,
                surface.handle(),
                &caps.capabilities,
                &plan,
                options,
            )?
        };

        tracing::info!(
            format = ?plan.format.format,
            present_mode = ?plan.present_mode,
            width = plan.design.extent.width,
            height = plan.design.extent.height,
            images = swapchain.image_count(),
            "Swapchain created"
        );

        Ok(swapchain)
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }

    /// Release the device, surface, debug messenger and instance.
    pub fn terminate(self) {
        drop(self);
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        tracing::debug!("Logical device destroyed");
    }
}
