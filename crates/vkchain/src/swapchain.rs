//! Swapchain parameter selection and creation.

use crate::error::Result;
use crate::surface::SurfaceCapabilities;
use ash::vk;

/// Choose a surface format from the enumerated list.
pub type FormatSelector<'a> = &'a dyn Fn(&[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR>;

/// Choose a present mode from the enumerated list.
pub type PresentModeSelector<'a> =
    &'a dyn Fn(&[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR>;

/// Decide extent and image count from the surface capabilities.
pub type SurfaceDesigner<'a> = &'a dyn Fn(&vk::SurfaceCapabilitiesKHR) -> SurfaceDesign;

/// Select the default surface format.
///
/// Prefers the first 8-bit RGB (UNORM, SRGB or SNORM) format in the
/// non-linear sRGB colour space, falling back to the first format.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
                && matches!(
                    format.format,
                    vk::Format::R8G8B8_UNORM | vk::Format::R8G8B8_SRGB | vk::Format::R8G8B8_SNORM
                )
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the default present mode: the first one that is neither
/// `FIFO_RELAXED` nor `IMMEDIATE`. `None` if nothing is left.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR> {
    available
        .iter()
        .copied()
        .find(|&mode| {
            mode != vk::PresentModeKHR::FIFO_RELAXED && mode != vk::PresentModeKHR::IMMEDIATE
        })
}

/// How swapchain images are shared between queue families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSharing {
    pub mode: vk::SharingMode,
    pub family_indices: Vec<u32>,
}

impl ImageSharing {
    /// Exclusive ownership, no family list.
    pub fn exclusive() -> Self {
        Self {
            mode: vk::SharingMode::EXCLUSIVE,
            family_indices: Vec::new(),
        }
    }
}

/// Concurrent sharing across both families when they differ, exclusive when
/// they are the same family.
pub fn resolve_image_sharing(graphics_family: u32, presentation_family: u32) -> ImageSharing {
    if graphics_family == presentation_family {
        ImageSharing::exclusive()
    } else {
        ImageSharing {
            mode: vk::SharingMode::CONCURRENT,
            family_indices: vec![graphics_family, presentation_family],
        }
    }
}

/// Extent and minimum image count for a swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDesign {
    pub extent: vk::Extent2D,
    pub image_count: u32,
}

impl SurfaceDesign {
    /// Fit a window of the given size: the surface's current extent if it
    /// dictates one, otherwise the requested size clamped to the supported
    /// range; one image more than the minimum, capped at the maximum.
    pub fn fit_window(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        desired_width: u32,
        desired_height: u32,
    ) -> Self {
        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: desired_width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: desired_height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let mut image_count = capabilities.min_image_count + 1;
        if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
            image_count = capabilities.max_image_count;
        }

        Self {
            extent,
            image_count,
        }
    }
}

/// Hooks and switches for
/// [`DeviceContext::create_swapchain`](crate::DeviceContext::create_swapchain).
pub struct SwapchainOptions<'a> {
    format_selector: Option<FormatSelector<'a>>,
    present_mode_selector: Option<PresentModeSelector<'a>>,
    surface_designer: SurfaceDesigner<'a>,
    image_views: bool,
    old_swapchain: vk::SwapchainKHR,
}

impl<'a> SwapchainOptions<'a> {
    /// Default selectors with the given surface designer.
    pub fn new(surface_designer: SurfaceDesigner<'a>) -> Self {
        Self {
            format_selector: None,
            present_mode_selector: None,
            surface_designer,
            image_views: true,
            old_swapchain: vk::SwapchainKHR::null(),
        }
    }

    /// Override the surface format selector.
    pub fn format_selector(mut self, selector: FormatSelector<'a>) -> Self {
        self.format_selector = Some(selector);
        self
    }

    /// Override the present mode selector.
    pub fn present_mode_selector(mut self, selector: PresentModeSelector<'a>) -> Self {
        self.present_mode_selector = Some(selector);
        self
    }

    /// Whether to create one image view per swapchain image.
    pub fn image_views(mut self, enable: bool) -> Self {
        self.image_views = enable;
        self
    }

    /// Swapchain being replaced, if any.
    pub fn old_swapchain(mut self, old_swapchain: vk::SwapchainKHR) -> Self {
        self.old_swapchain = old_swapchain;
        self
    }
}

/// The parameters a swapchain will be created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainPlan {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub design: SurfaceDesign,
    pub sharing: ImageSharing,
}

impl SwapchainPlan {
    /// Run the selectors over a presentable surface.
    ///
    /// `caps` must report at least one format and one present mode. A
    /// selector that picks nothing falls back to the first enumerated entry.
    pub(crate) fn choose(
        caps: &SurfaceCapabilities,
        options: &SwapchainOptions<'_>,
        sharing: ImageSharing,
    ) -> Self {
        let format = options
            .format_selector
            .map_or_else(|| select_surface_format(&caps.formats), |select| select(&caps.formats))
            .unwrap_or(caps.formats[0]);

        let present_mode = match options.present_mode_selector.map_or_else(
            || select_present_mode(&caps.present_modes),
            |select| select(&caps.present_modes),
        ) {
            Some(mode) => mode,
            None => {
                let fallback = caps.present_modes[0];
                tracing::warn!(
                    "No preferred present mode among {:?}, using {:?}",
                    caps.present_modes,
                    fallback
                );
                fallback
            }
        };

        let design = (options.surface_designer)(&caps.capabilities);

        Self {
            format,
            present_mode,
            design,
            sharing,
        }
    }
}

/// A created swapchain and its images.
///
/// Borrows the device it was created on; dropping it destroys the image
/// views and the swapchain.
pub struct Swapchain<'a> {
    device: &'a ash::Device,
    loader: ash::khr::swapchain::Device,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    /// Empty unless image views were requested.
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl<'a> Swapchain<'a> {
    /// Create a swapchain from a plan.
    ///
    /// # Safety
    /// All handles must be valid and the device must have been created with
    /// `VK_KHR_swapchain`.
    pub(crate) unsafe fn new(
        instance: &ash::Instance,
        device: &'a ash::Device,
        surface: vk::SurfaceKHR,
        capabilities: &vk::SurfaceCapabilitiesKHR,
        plan: &SwapchainPlan,
        options: &SwapchainOptions<'_>,
    ) -> Result<Self> {
        let loader = ash::khr::swapchain::Device::new(instance, device);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(plan.design.image_count)
            .image_format(plan.format.format)
            .image_color_space(plan.format.color_space)
            .image_extent(plan.design.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(plan.sharing.mode)
            .queue_family_indices(&plan.sharing.family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(options.old_swapchain);

        let swapchain = loader.create_swapchain(&create_info, None)?;

        // From here on, drop cleans up whatever has been created
        let mut created = Self {
            device,
            loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format: plan.format,
            present_mode: plan.present_mode,
            extent: plan.design.extent,
        };

        created.images = created.loader.get_swapchain_images(swapchain)?;

        if options.image_views {
            for &image in &created.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(plan.format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::R,
                        g: vk::ComponentSwizzle::G,
                        b: vk::ComponentSwizzle::B,
                        a: vk::ComponentSwizzle::A,
                    })
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    );

                let view = device.create_image_view(&view_info, None)?;
                created.image_views.push(view);
            }
        }

        Ok(created)
    }

    /// Number of images in the swapchain.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain<'_> {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
