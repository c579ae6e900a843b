//! End-to-end runs of the initialization chain against a real driver.
//!
//! These need a Vulkan implementation and are ignored by default:
//! `cargo test -p vkchain -- --ignored`

use ash::vk;
use vkchain::{
    Attachments, DeviceDesign, DeviceDesigner, DeviceTarget, InitError, InstanceBuilder,
    InstanceContext, QueueLocator, QueueRequest, QueueRetriever, RetrievedQueues,
    ScoredEnumerator, SurfaceDesign, SwapchainOptions,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

fn builder() -> InstanceBuilder {
    let version = vk::make_api_version(0, 1, 0, 0);
    let mut builder =
        vkchain::create_application("None", "X", version, version, vk::API_VERSION_1_0).unwrap();
    builder.add_extension(ash::ext::debug_utils::NAME);
    builder
}

#[test]
#[ignore = "Requires GPU hardware"]
fn headless_chain_with_default_design() {
    init_logging();

    let mut builder = builder();
    builder
        .add_extension(ash::khr::surface::NAME)
        .add_extension(ash::khr::get_physical_device_properties2::NAME);
    assert_eq!(builder.extensions().len(), 3);

    let mut instance = builder.start_instance().unwrap();
    instance.with_default_debug_output().unwrap();
    assert_eq!(instance.attachments(), Attachments::DEBUG_MESSENGER);

    let physical = instance.select_physical_device(None).unwrap();
    let device = physical
        .create_device(None, &[ash::khr::swapchain::NAME])
        .unwrap();
    assert_eq!(device.enabled_extensions().len(), 1);

    let indices = *device.default_queue_indices().unwrap();
    assert_eq!(indices.presentation_family, None);

    let queues = device.retrieve_queues();
    let default = queues.as_default().unwrap();
    assert_ne!(default.graphics, vk::Queue::null());
    assert!(default.presentation.is_none());

    device.terminate();
}

#[test]
#[ignore = "Requires GPU hardware"]
fn swapchain_without_surface_is_rejected() {
    init_logging();

    let device = builder()
        .start_instance()
        .unwrap()
        .select_physical_device(Some(&ScoredEnumerator::default()))
        .unwrap()
        .create_device(None, &[])
        .unwrap();

    let designer = |caps: &vk::SurfaceCapabilitiesKHR| SurfaceDesign::fit_window(caps, 200, 200);
    let result = device.create_swapchain(&SwapchainOptions::new(&designer));
    assert!(matches!(result, Err(InitError::MissingSurface)));
}

#[test]
#[ignore = "Requires GPU hardware"]
fn debug_output_needs_the_extension() {
    init_logging();

    let version = vk::make_api_version(0, 1, 0, 0);
    let builder =
        vkchain::create_application("None", "X", version, version, vk::API_VERSION_1_0).unwrap();
    let mut instance = builder.start_instance().unwrap();

    let err = instance.with_default_debug_output().err().unwrap();
    assert!(matches!(err, InitError::ExtensionNotEnabled(_)));
    assert!(instance.attachments().is_empty());
}

#[test]
#[ignore = "Requires GPU hardware"]
fn enumerator_rejecting_everything_fails() {
    init_logging();

    let instance = builder().start_instance().unwrap();
    let reject =
        |_: &ash::Instance, _: &[vk::PhysicalDevice]| -> Option<vk::PhysicalDevice> { None };
    let result = instance.select_physical_device(Some(&reject));
    assert!(matches!(result, Err(InitError::NoSuitableDevice)));
}

/// An instance with a headless surface attached, or `None` when the driver
/// does not offer `VK_EXT_headless_surface`.
fn headless_surface_instance() -> Option<InstanceContext> {
    let mut builder = builder();
    builder
        .add_extension(ash::khr::surface::NAME)
        .add_extension(ash::ext::headless_surface::NAME);

    let mut instance = match builder.start_instance() {
        Ok(instance) => instance,
        Err(InitError::Vulkan(vk::Result::ERROR_EXTENSION_NOT_PRESENT)) => return None,
        Err(e) => panic!("instance creation failed: {e}"),
    };

    let loader = ash::ext::headless_surface::Instance::new(instance.entry(), instance.instance());
    let surface = unsafe {
        loader
            .create_headless_surface(&vk::HeadlessSurfaceCreateInfoEXT::default(), None)
            .unwrap()
    };
    unsafe { instance.with_surface_handle(surface).unwrap() };

    Some(instance)
}

#[test]
#[ignore = "Requires GPU hardware"]
fn surface_chain_builds_queues_and_swapchain() {
    init_logging();

    let Some(instance) = headless_surface_instance() else {
        return;
    };
    assert_eq!(instance.attachments(), Attachments::SURFACE);

    let device = instance
        .select_physical_device(None)
        .unwrap()
        .create_device(None, &[ash::khr::swapchain::NAME])
        .unwrap();

    let indices = *device.default_queue_indices().unwrap();
    assert!(indices.presentation_family.is_some());

    let queues = device.retrieve_queues();
    let default = queues.as_default().unwrap();
    assert!(default.presentation.is_some());
    assert_eq!(queues.handles().len(), 2);

    let caps = device.surface_capabilities().unwrap();
    let designer = |caps: &vk::SurfaceCapabilitiesKHR| SurfaceDesign::fit_window(caps, 200, 200);
    let design = designer(&caps.capabilities);

    let swapchain = device
        .create_swapchain(&SwapchainOptions::new(&designer))
        .unwrap();
    assert!(swapchain.image_count() >= design.image_count as usize);
    assert_eq!(swapchain.image_views.len(), swapchain.image_count());
    assert_eq!(swapchain.extent, design.extent);

    drop(swapchain);
    device.wait_idle().unwrap();
    device.terminate();
}

#[test]
#[ignore = "Requires GPU hardware"]
fn swapchain_needs_the_device_extension() {
    init_logging();

    let Some(instance) = headless_surface_instance() else {
        return;
    };

    let device = instance
        .select_physical_device(None)
        .unwrap()
        .create_device(None, &[])
        .unwrap();

    let designer = |caps: &vk::SurfaceCapabilitiesKHR| SurfaceDesign::fit_window(caps, 200, 200);
    match device.create_swapchain(&SwapchainOptions::new(&designer)) {
        Err(InitError::ExtensionNotEnabled(name)) => assert_eq!(name, "VK_KHR_swapchain"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("swapchain created without VK_KHR_swapchain"),
    };
}

struct TwoQueues {
    family: u32,
}

impl QueueRetriever for TwoQueues {
    fn retrieve(&self, device: &ash::Device) -> Vec<vk::Queue> {
        (0..2)
            .map(|index| unsafe { device.get_device_queue(self.family, index) })
            .collect()
    }
}

struct TwoQueueDesigner;

impl DeviceDesigner for TwoQueueDesigner {
    fn design(&mut self, target: &DeviceTarget<'_>) -> vkchain::Result<DeviceDesign> {
        let families = unsafe {
            target
                .instance
                .get_physical_device_queue_family_properties(target.physical_device)
        };
        let (family, _) = (0u32..)
            .zip(&families)
            .find(|(_, family)| {
                family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && family.queue_count >= 2
            })
            .ok_or(InitError::NoGraphicsQueue)?;

        Ok(DeviceDesign {
            queues: vec![QueueRequest {
                family_index: family,
                priorities: vec![1.0, 0.5],
            }],
            features: vk::PhysicalDeviceFeatures::default(),
            locator: QueueLocator::Custom(Box::new(TwoQueues { family })),
        })
    }
}

#[test]
#[ignore = "Requires GPU hardware"]
fn custom_designer_supplies_its_own_queues() {
    init_logging();

    let physical = builder()
        .start_instance()
        .unwrap()
        .select_physical_device(None)
        .unwrap();

    let device = match physical.create_device(Some(&mut TwoQueueDesigner), &[]) {
        Ok(device) => device,
        // Some drivers expose a single graphics queue
        Err(InitError::NoGraphicsQueue) => return,
        Err(e) => panic!("device creation failed: {e}"),
    };

    assert!(device.default_queue_indices().is_none());
    match device.retrieve_queues() {
        RetrievedQueues::Custom(queues) => assert_eq!(queues.len(), 2),
        RetrievedQueues::Default(_) => panic!("expected custom queues"),
    }
    assert_eq!(device.queue_locator().sharing_families(), None);
}
