//! Physical device description.

use ash::vk;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// What the driver reports about one physical device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub vendor: GpuVendor,
    pub device_name: String,
    pub device_type: vk::PhysicalDeviceType,
    /// Highest Vulkan version the device supports
    pub api_version: u32,
    pub driver_version: u32,
    /// Device-local memory in MB
    pub device_local_memory_mb: u64,
}

impl DeviceInfo {
    /// Query a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let memory_properties = instance.get_physical_device_memory_properties(physical_device);

        let device_name = CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            device_local_memory_mb,
        }
    }

    /// Whether the device supports at least the given API version.
    pub fn supports_api(&self, version: u32) -> bool {
        let (major, minor) = (
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
        );
        (major, minor) >= (vk::api_version_major(version), vk::api_version_minor(version))
    }

    /// Rank the device for selection. `None` means unusable.
    pub fn score(&self, min_api_version: u32) -> Option<u64> {
        if !self.supports_api(min_api_version) {
            return None;
        }

        let mut score = match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
            _ => 0,
        };

        // +1 per GB
        score += self.device_local_memory_mb / 1024;

        Some(score)
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(device_type: vk::PhysicalDeviceType, api_version: u32, vram_mb: u64) -> DeviceInfo {
        DeviceInfo {
            vendor: GpuVendor::Other(0),
            device_name: "test".to_string(),
            device_type,
            api_version,
            driver_version: 0,
            device_local_memory_mb: vram_mb,
        }
    }

    #[test]
    fn vendor_identification() {
        assert_eq!(GpuVendor::from_vendor_id(0x10DE), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_vendor_id(0x1002), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_vendor_id(0x8086), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_vendor_id(0x1234), GpuVendor::Other(0x1234));
    }

    #[test]
    fn discrete_outranks_integrated() {
        let discrete = info(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_0, 2048);
        let integrated = info(vk::PhysicalDeviceType::INTEGRATED_GPU, vk::API_VERSION_1_0, 8192);
        assert!(discrete.score(vk::API_VERSION_1_0) > integrated.score(vk::API_VERSION_1_0));
    }

    #[test]
    fn memory_breaks_ties() {
        let small = info(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_3, 4096);
        let large = info(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_3, 16384);
        assert_eq!(small.score(vk::API_VERSION_1_0), Some(1004));
        assert_eq!(large.score(vk::API_VERSION_1_0), Some(1016));
    }

    #[test]
    fn api_version_gate() {
        let old = info(vk::PhysicalDeviceType::DISCRETE_GPU, vk::API_VERSION_1_1, 8192);
        assert!(old.supports_api(vk::API_VERSION_1_0));
        assert!(!old.supports_api(vk::API_VERSION_1_3));
        assert_eq!(old.score(vk::API_VERSION_1_3), None);
    }
}
