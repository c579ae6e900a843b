//! Physical device selection and logical device design.

use crate::capabilities::DeviceInfo;
use crate::error::{InitError, Result};
use crate::queue::{select_queue_families, DefaultQueueIndices, QueueFamilySelection, QueueLocator};
use crate::surface::Surface;
use ash::vk;
use std::ffi::{c_char, CStr};

/// Picks one physical device out of those the instance enumerates.
pub trait DeviceEnumerator {
    /// Return the chosen device, or `None` if none is acceptable.
    fn choose(
        &self,
        instance: &ash::Instance,
        devices: &[vk::PhysicalDevice],
    ) -> Option<vk::PhysicalDevice>;
}

impl<F> DeviceEnumerator for F
where
    F: Fn(&ash::Instance, &[vk::PhysicalDevice]) -> Option<vk::PhysicalDevice>,
{
    fn choose(
        &self,
        instance: &ash::Instance,
        devices: &[vk::PhysicalDevice],
    ) -> Option<vk::PhysicalDevice> {
        self(instance, devices)
    }
}

/// Takes the first enumerated device.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstDevice;

impl DeviceEnumerator for FirstDevice {
    fn choose(
        &self,
        _instance: &ash::Instance,
        devices: &[vk::PhysicalDevice],
    ) -> Option<vk::PhysicalDevice> {
        devices.first().copied()
    }
}

/// Ranks devices by type and memory, skipping ones below an API version.
#[derive(Debug, Clone, Copy)]
pub struct ScoredEnumerator {
    pub min_api_version: u32,
}

impl Default for ScoredEnumerator {
    fn default() -> Self {
        Self {
            min_api_version: vk::API_VERSION_1_0,
        }
    }
}

impl DeviceEnumerator for ScoredEnumerator {
    fn choose(
        &self,
        instance: &ash::Instance,
        devices: &[vk::PhysicalDevice],
    ) -> Option<vk::PhysicalDevice> {
        let infos: Vec<DeviceInfo> = devices
            .iter()
            .map(|&device| unsafe { DeviceInfo::query(instance, device) })
            .collect();

        best_scored(&infos, self.min_api_version).map(|index| devices[index])
    }
}

/// Index of the highest-scoring device; earlier devices win ties.
fn best_scored(infos: &[DeviceInfo], min_api_version: u32) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;

    for (index, info) in infos.iter().enumerate() {
        let Some(score) = info.score(min_api_version) else {
            continue;
        };
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
}

/// Everything a designer may look at while laying out the device.
pub struct DeviceTarget<'a> {
    pub instance: &'a ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    /// The attached surface, if any.
    pub surface: Option<&'a Surface>,
    /// Device extensions that will be enabled.
    pub extensions: &'a [&'a CStr],
}

/// One queue family to create queues in.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    pub family_index: u32,
    /// One priority per queue.
    pub priorities: Vec<f32>,
}

impl QueueRequest {
    /// A single queue at full priority.
    pub fn single(family_index: u32) -> Self {
        Self {
            family_index,
            priorities: vec![1.0],
        }
    }
}

/// Output of a [`DeviceDesigner`]: how to build the device and how to find
/// its queues afterwards.
pub struct DeviceDesign {
    pub queues: Vec<QueueRequest>,
    pub features: vk::PhysicalDeviceFeatures,
    pub locator: QueueLocator,
}

/// Controls queue and feature layout of the logical device.
pub trait DeviceDesigner {
    fn design(&mut self, target: &DeviceTarget<'_>) -> Result<DeviceDesign>;
}

/// Graphics queue plus, with a surface, a presentation queue; every
/// supported feature enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDesigner;

impl DeviceDesigner for DefaultDesigner {
    fn design(&mut self, target: &DeviceTarget<'_>) -> Result<DeviceDesign> {
        let (families, features) = unsafe {
            (
                target
                    .instance
                    .get_physical_device_queue_family_properties(target.physical_device),
                target
                    .instance
                    .get_physical_device_features(target.physical_device),
            )
        };

        let present_support = target
            .surface
            .map(|surface| surface.present_support(target.physical_device, families.len()))
            .transpose()?;

        let selection = select_queue_families(&families, present_support.as_deref());
        let indices = default_indices(selection, target.surface.is_some())?;

        tracing::debug!(
            graphics = indices.graphics_family,
            presentation = ?indices.presentation_family,
            "Queue families selected"
        );

        Ok(DeviceDesign {
            queues: indices
                .unique_families()
                .into_iter()
                .map(QueueRequest::single)
                .collect(),
            features,
            locator: QueueLocator::Default(indices),
        })
    }
}

fn default_indices(
    selection: QueueFamilySelection,
    has_surface: bool,
) -> Result<DefaultQueueIndices> {
    let graphics_family = selection.graphics.ok_or(InitError::NoGraphicsQueue)?;
    let presentation_family = if has_surface {
        Some(selection.presentation.ok_or(InitError::NoPresentationQueue)?)
    } else {
        None
    };

    Ok(DefaultQueueIndices {
        graphics_family,
        presentation_family,
    })
}

/// Build the logical device a design describes.
///
/// # Safety
/// The instance and physical device must be valid.
pub(crate) unsafe fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    design: &DeviceDesign,
    extensions: &[&CStr],
) -> Result<ash::Device> {
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = design
        .queues
        .iter()
        .map(|request| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(request.family_index)
                .queue_priorities(&request.priorities)
        })
        .collect();

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&design.features);

    let device = instance.create_device(physical_device, &device_create_info, None)?;

    Ok(device)
}
