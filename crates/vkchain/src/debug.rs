//! Debug messenger attachment.

use crate::error::Result;
use ash::vk;
use std::ffi::{c_void, CStr};
use std::ptr;

/// Settings for a debug-utils messenger.
#[derive(Clone, Copy)]
pub struct DebugOutput {
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_types: vk::DebugUtilsMessageTypeFlagsEXT,
    callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
    user_data: *mut c_void,
}

impl Default for DebugOutput {
    /// Verbose, warning and error messages of every type, forwarded to `tracing`.
    fn default() -> Self {
        Self {
            severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_types: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            callback: Some(log_message),
            user_data: ptr::null_mut(),
        }
    }
}

impl DebugOutput {
    /// Default filters with a custom callback.
    pub fn with_callback(callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT) -> Self {
        Self {
            callback,
            ..Self::default()
        }
    }

    /// Set the severities to report.
    pub fn severity(mut self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        self.severity = severity;
        self
    }

    /// Set the message types to report.
    pub fn message_types(mut self, message_types: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        self.message_types = message_types;
        self
    }

    /// Pass a pointer through to the callback.
    ///
    /// # Safety
    /// The pointee must stay valid, and be safe to access from the driver's
    /// threads, until the messenger is destroyed.
    pub unsafe fn user_data(mut self, user_data: *mut c_void) -> Self {
        self.user_data = user_data;
        self
    }

    fn create_info(&self) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(self.severity)
            .message_type(self.message_types)
            .pfn_user_callback(self.callback)
            .user_data(self.user_data)
    }
}

/// A created messenger together with the loader that destroys it.
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// # Safety
    /// The instance must be valid and created with `VK_EXT_debug_utils`.
    pub(crate) unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        output: &DebugOutput,
    ) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let messenger = loader.create_debug_utils_messenger(&output.create_info(), None)?;
        Ok(Self { loader, messenger })
    }

    pub(crate) fn handle(&self) -> vk::DebugUtilsMessengerEXT {
        self.messenger
    }

    /// # Safety
    /// Must be called once, before the instance is destroyed.
    pub(crate) unsafe fn destroy(&self) {
        self.loader.destroy_debug_utils_messenger(self.messenger, None);
    }
}

/// Default callback: forward driver messages to `tracing`.
unsafe extern "system" fn log_message(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };
    let kind = message_kind(message_type);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "vkchain::driver", "[{kind}] {message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vkchain::driver", "[{kind}] {message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "vkchain::driver", "[{kind}] {message}");
    } else {
        tracing::trace!(target: "vkchain::driver", "[{kind}] {message}");
    }

    vk::FALSE
}

fn message_kind(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL) {
        "General"
    } else {
        "Unknown"
    }
}
