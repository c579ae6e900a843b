//! Chained Vulkan initialization.
//!
//! This crate provides:
//! - Instance creation with explicit extension and layer lists
//! - Optional debug messenger and surface attachment
//! - Physical device selection with pluggable enumerators
//! - Logical device design and queue retrieval
//! - Swapchain creation with default format and present-mode selection
//!
//! ```no_run
//! # fn main() -> vkchain::Result<()> {
//! use ash::vk;
//!
//! let mut builder = vkchain::create_application(
//!     "None",
//!     "X",
//!     vk::make_api_version(0, 1, 0, 0),
//!     vk::make_api_version(0, 1, 0, 0),
//!     vk::API_VERSION_1_0,
//! )?;
//! builder.add_extension(ash::ext::debug_utils::NAME);
//!
//! let mut instance = builder.start_instance()?;
//! instance.with_default_debug_output()?;
//!
//! let device = instance
//!     .select_physical_device(None)?
//!     .create_device(None, &[])?;
//! let queues = device.retrieve_queues();
//! assert!(queues.as_default().is_some());
//! device.terminate();
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod queue;
pub mod surface;
pub mod swapchain;

pub use capabilities::{DeviceInfo, GpuVendor};
pub use context::{Attachments, DeviceContext, InstanceContext, PhysicalDeviceContext};
pub use debug::DebugOutput;
pub use device::{
    DefaultDesigner, DeviceDesign, DeviceDesigner, DeviceEnumerator, DeviceTarget, FirstDevice,
    QueueRequest, ScoredEnumerator,
};
pub use error::{InitError, Result};
pub use instance::{create_application, ApplicationInfo, InstanceBuilder, VALIDATION_LAYER};
pub use queue::{
    select_queue_families, DefaultQueueIndices, DefaultQueues, QueueFamilySelection,
    QueueLocator, QueueRetriever, RetrievedQueues,
};
pub use surface::{Surface, SurfaceCapabilities};
pub use swapchain::{
    resolve_image_sharing, select_present_mode, select_surface_format, ImageSharing,
    SurfaceDesign, Swapchain, SwapchainOptions, SwapchainPlan,
};
