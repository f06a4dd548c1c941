use anyhow::Result;
use ash::vk;
use std::ffi::{
    c_void,
    CStr,
};

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let types = message_type_label(message_type);
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => log::trace!("{} {}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::debug!("{} {}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{} {}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{} {}", types, message),
        _ => log::info!("{} {}", types, message),
    }

    vk::FALSE
}

fn message_type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
        _ => "[Unknown]",
    }
}

pub fn create_debug_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
}

#[derive(Default)]
pub struct DebugUtils {
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    utils_messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugUtils {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance, enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self::default());
        }
        let debug_utils_loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let create_info = create_debug_messenger_create_info();
        let utils_messenger =
            unsafe { debug_utils_loader.create_debug_utils_messenger(&create_info, None)? };
        log::info!("debug messenger created");
        Ok(Self {
            debug_utils_loader: Some(debug_utils_loader),
            utils_messenger,
        })
    }
}

impl Drop for DebugUtils {
    fn drop(&mut self) {
        unsafe {
            if let Some(loader) = &self.debug_utils_loader {
                loader.destroy_debug_utils_messenger(self.utils_messenger, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_label() {
        assert_eq!(
            message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION),
            "[Validation]"
        );
        assert_eq!(
            message_type_label(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            ),
            "[Unknown]"
        );
    }
}
