//! Application info and Vulkan instance creation.

use crate::context::InstanceContext;
use crate::debug::DebugMessenger;
use crate::error::{InitError, Result};
use crate::surface::Surface;
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

/// Standard validation layer.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Application metadata handed to the driver.
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    pub application_name: CString,
    pub engine_name: CString,
    pub application_version: u32,
    pub engine_version: u32,
    pub api_version: u32,
}

/// First step of the chain: collects everything instance creation needs.
#[derive(Debug)]
pub struct InstanceBuilder {
    app: ApplicationInfo,
    extensions: Vec<CString>,
    layers: Vec<CString>,
}

/// Start a chain with basic application information.
///
/// Versions are packed with [`vk::make_api_version`].
pub fn create_application(
    engine_name: &str,
    application_name: &str,
    application_version: u32,
    engine_version: u32,
    api_version: u32,
) -> Result<InstanceBuilder> {
    let app = ApplicationInfo {
        application_name: CString::new(application_name)?,
        engine_name: CString::new(engine_name)?,
        application_version,
        engine_version,
        api_version,
    };

    Ok(InstanceBuilder {
        app,
        extensions: Vec::new(),
        layers: Vec::new(),
    })
}

impl InstanceBuilder {
    /// Request an instance extension. Device extensions go to
    /// [`PhysicalDeviceContext::create_device`](crate::PhysicalDeviceContext::create_device).
    ///
    /// Order is kept and duplicates are not removed.
    pub fn add_extension(&mut self, name: &CStr) -> &mut Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Request an instance layer.
    pub fn add_layer(&mut self, name: &CStr) -> &mut Self {
        self.layers.push(name.to_owned());
        self
    }

    /// Request the Khronos validation layer.
    pub fn with_validation(&mut self) -> &mut Self {
        self.add_layer(VALIDATION_LAYER)
    }

    /// Request the surface extensions the given display needs.
    pub fn add_window_extensions(&mut self, display: RawDisplayHandle) -> Result<&mut Self> {
        let required = ash_window::enumerate_required_extensions(display)?;
        for &ext in required {
            // ash-window hands out pointers into static, NUL-terminated names
            let name = unsafe { CStr::from_ptr(ext) };
            self.add_extension(name);
        }
        Ok(self)
    }

    /// Requested instance extensions, in request order.
    pub fn extensions(&self) -> &[CString] {
        &self.extensions
    }

    /// Requested layers, in request order.
    pub fn layers(&self) -> &[CString] {
        &self.layers
    }

    /// Application metadata.
    pub fn application(&self) -> &ApplicationInfo {
        &self.app
    }

    /// Load Vulkan and create the instance.
    ///
    /// Layers the loader does not know about are skipped with a warning.
    pub fn start_instance(self) -> Result<InstanceContext> {
        let entry =
            unsafe { ash::Entry::load() }.map_err(|e| InitError::Loading(e.to_string()))?;

        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
        let available: Vec<&CStr> = available_layers
            .iter()
            .map(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) })
            .collect();

        let (layers, missing) = partition_layers(self.layers, &available);
        for layer in &missing {
            tracing::warn!("Layer {} not available", layer.to_string_lossy());
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(&self.app.application_name)
            .application_version(self.app.application_version)
            .engine_name(&self.app.engine_name)
            .engine_version(self.app.engine_version)
            .api_version(self.app.api_version);

        let extension_names: Vec<*const c_char> =
            self.extensions.iter().map(|ext| ext.as_ptr()).collect();
        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        // Required for MoltenVK
        let create_flags = if self
            .extensions
            .iter()
            .any(|ext| ext.as_c_str() == ash::khr::portability_enumeration::NAME)
        {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .flags(create_flags);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        tracing::debug!(
            extensions = self.extensions.len(),
            layers = layers.len(),
            "Vulkan instance created"
        );

        Ok(InstanceContext::new(InstanceCore {
            surface: None,
            debug: None,
            instance,
            entry,
            extensions: self.extensions,
            layers,
        }))
    }
}

/// Split requested layers into the ones the loader offers and the rest.
fn partition_layers(requested: Vec<CString>, available: &[&CStr]) -> (Vec<CString>, Vec<CString>) {
    requested
        .into_iter()
        .partition(|layer| available.contains(&layer.as_c_str()))
}

/// Instance-level handles shared by every stage after `start_instance`.
///
/// Dropping it destroys the surface, the debug messenger and the instance,
/// in that order.
pub(crate) struct InstanceCore {
    pub(crate) surface: Option<Surface>,
    pub(crate) debug: Option<DebugMessenger>,
    pub(crate) instance: ash::Instance,
    pub(crate) entry: ash::Entry,
    pub(crate) extensions: Vec<CString>,
    pub(crate) layers: Vec<CString>,
}

impl InstanceCore {
    pub(crate) fn has_extension(&self, name: &CStr) -> bool {
        self.extensions.iter().any(|ext| ext.as_c_str() == name)
    }

    pub(crate) fn require_extension(&self, name: &CStr) -> Result<()> {
        if self.has_extension(name) {
            Ok(())
        } else {
            Err(InitError::ExtensionNotEnabled(
                name.to_string_lossy().into_owned(),
            ))
        }
    }
}

impl Drop for InstanceCore {
    fn drop(&mut self) {
        unsafe {
            if let Some(surface) = self.surface.take() {
                surface.destroy();
            }
            if let Some(debug) = self.debug.take() {
                debug.destroy();
            }
            self.instance.destroy_instance(None);
        }
        tracing::debug!("Vulkan instance destroyed");
    }
}
