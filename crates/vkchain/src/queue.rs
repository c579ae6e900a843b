//! Queue family selection and queue retrieval.

use ash::vk;
use std::collections::BTreeSet;

/// Families picked by [`select_queue_families`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilySelection {
    pub graphics: Option<u32>,
    pub presentation: Option<u32>,
}

/// Pick a graphics family and, when presentation support is supplied, a
/// presentation family.
///
/// Every family is visited and the **last** match wins for each role. The
/// two roles are tracked independently, so both may land on the same family.
pub fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    present_support: Option<&[bool]>,
) -> QueueFamilySelection {
    let mut selection = QueueFamilySelection::default();

    for (i, family) in (0u32..).zip(families) {
        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            selection.graphics = Some(i);
        }

        if let Some(support) = present_support {
            if support.get(i as usize).copied().unwrap_or(false) {
                selection.presentation = Some(i);
            }
        }
    }

    selection
}

/// Family indices chosen by the default device designer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultQueueIndices {
    pub graphics_family: u32,
    /// Set only when a surface was attached.
    pub presentation_family: Option<u32>,
}

impl DefaultQueueIndices {
    /// Distinct families that need a queue, ascending.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = BTreeSet::new();
        families.insert(self.graphics_family);
        families.extend(self.presentation_family);
        families.into_iter().collect()
    }
}

/// Fetches queues for a device built by a custom designer.
pub trait QueueRetriever {
    /// Fetch the queues the designer asked for. `device` is the logical
    /// device built from that design and is valid for the call.
    fn retrieve(&self, device: &ash::Device) -> Vec<vk::Queue>;

    /// Graphics and presentation families for swapchain image sharing.
    fn sharing_families(&self) -> Option<(u32, u32)> {
        None
    }
}

/// How queues are located on a created device.
pub enum QueueLocator {
    Default(DefaultQueueIndices),
    Custom(Box<dyn QueueRetriever>),
}

impl QueueLocator {
    /// Fetch queues from `device`.
    ///
    /// # Safety
    /// `device` must be the valid device this locator was designed for.
    pub(crate) unsafe fn retrieve(&self, device: &ash::Device) -> RetrievedQueues {
        match self {
            Self::Default(indices) => {
                let graphics = device.get_device_queue(indices.graphics_family, 0);
                let presentation = indices
                    .presentation_family
                    .map(|family| device.get_device_queue(family, 0));
                RetrievedQueues::Default(DefaultQueues {
                    graphics,
                    presentation,
                })
            }
            Self::Custom(retriever) => RetrievedQueues::Custom(retriever.retrieve(device)),
        }
    }

    /// Families the swapchain images are shared between, if known.
    pub fn sharing_families(&self) -> Option<(u32, u32)> {
        match self {
            Self::Default(indices) => indices
                .presentation_family
                .map(|presentation| (indices.graphics_family, presentation)),
            Self::Custom(retriever) => retriever.sharing_families(),
        }
    }
}

impl std::fmt::Debug for QueueLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default(indices) => f.debug_tuple("Default").field(indices).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Queues fetched by the default locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultQueues {
    pub graphics: vk::Queue,
    /// Empty when no surface was attached.
    pub presentation: Option<vk::Queue>,
}

/// Result of `retrieve_queues`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievedQueues {
    Default(DefaultQueues),
    Custom(Vec<vk::Queue>),
}

impl RetrievedQueues {
    /// The default queue pair, if the device used the default design.
    pub fn as_default(&self) -> Option<&DefaultQueues> {
        match self {
            Self::Default(queues) => Some(queues),
            Self::Custom(_) => None,
        }
    }

    /// Every retrieved queue handle.
    pub fn handles(&self) -> Vec<vk::Queue> {
        match self {
            Self::Default(queues) => std::iter::once(queues.graphics)
                .chain(queues.presentation)
                .collect(),
            Self::Custom(queues) => queues.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn last_graphics_family_wins() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let selection = select_queue_families(&families, None);
        assert_eq!(selection.graphics, Some(2));
        assert_eq!(selection.presentation, None);
    }

    #[test]
    fn last_presenting_family_wins() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::TRANSFER),
        ];
        let support = [false, true, true];
        let selection = select_queue_families(&families, Some(&support));
        assert_eq!(selection.graphics, Some(0));
        assert_eq!(selection.presentation, Some(2));
    }

    #[test]
    fn roles_may_share_a_family() {
        let families = [
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let selection = select_queue_families(&families, Some(&[false, true]));
        assert_eq!(selection.graphics, Some(1));
        assert_eq!(selection.presentation, Some(1));
    }

    #[test]
    fn nothing_matches() {
        let families = [family(vk::QueueFlags::TRANSFER)];
        let selection = select_queue_families(&families, Some(&[false]));
        assert_eq!(selection, QueueFamilySelection::default());
        assert_eq!(select_queue_families(&[], None), QueueFamilySelection::default());
    }

    #[test]
    fn short_support_list_counts_as_unsupported() {
        let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::GRAPHICS)];
        let selection = select_queue_families(&families, Some(&[true]));
        assert_eq!(selection.presentation, Some(0));
    }

    #[test]
    fn unique_families_dedup() {
        let shared = DefaultQueueIndices {
            graphics_family: 2,
            presentation_family: Some(2),
        };
        assert_eq!(shared.unique_families(), vec![2]);

        let split = DefaultQueueIndices {
            graphics_family: 3,
            presentation_family: Some(1),
        };
        assert_eq!(split.unique_families(), vec![1, 3]);

        let headless = DefaultQueueIndices {
            graphics_family: 0,
            presentation_family: None,
        };
        assert_eq!(headless.unique_families(), vec![0]);
    }

    #[test]
    fn default_sharing_families_need_presentation() {
        let headless = QueueLocator::Default(DefaultQueueIndices {
            graphics_family: 0,
            presentation_family: None,
        });
        assert_eq!(headless.sharing_families(), None);

        let windowed = QueueLocator::Default(DefaultQueueIndices {
            graphics_family: 0,
            presentation_family: Some(1),
        });
        assert_eq!(windowed.sharing_families(), Some((0, 1)));
    }

    struct FixedFamilies;

    impl QueueRetriever for FixedFamilies {
        fn retrieve(&self, _device: &ash::Device) -> Vec<vk::Queue> {
            Vec::new()
        }

        fn sharing_families(&self) -> Option<(u32, u32)> {
            Some((4, 5))
        }
    }

    #[test]
    fn custom_sharing_families_come_from_retriever() {
        let locator = QueueLocator::Custom(Box::new(FixedFamilies));
        assert_eq!(locator.sharing_families(), Some((4, 5)));
        assert_eq!(format!("{locator:?}"), "Custom(..)");
    }

    #[test]
    fn retrieved_handles() {
        let graphics = vk::Queue::from_raw(1);
        let presentation = vk::Queue::from_raw(2);

        let headless = RetrievedQueues::Default(DefaultQueues {
            graphics,
            presentation: None,
        });
        assert_eq!(headless.handles(), vec![graphics]);
        assert!(headless.as_default().unwrap().presentation.is_none());

        let windowed = RetrievedQueues::Default(DefaultQueues {
            graphics,
            presentation: Some(presentation),
        });
        assert_eq!(windowed.handles(), vec![graphics, presentation]);

        let custom = RetrievedQueues::Custom(vec![presentation]);
        assert!(custom.as_default().is_none());
        assert_eq!(custom.handles(), vec![presentation]);
    }
}
