use super::{
    debug::create_debug_messenger_create_info,
    extension::required_instance_extension_names,
    layer::{
        check_layer_support,
        required_layer_names,
    },
};
use anyhow::{
    Context,
    Result,
};
use ash::vk;
use std::ffi::{
    c_char,
    CString,
};
use winit::raw_window_handle::RawDisplayHandle;

pub struct Instance {
    instance: ash::Instance,
}

impl Instance {
    pub fn new(
        entry: &ash::Entry,
        app_name: &str,
        display_handle: RawDisplayHandle,
        enable_debug: bool,
    ) -> Result<Self> {
        let app_name = CString::new(app_name)?;
        let engine_name = CString::new("vktiny")?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .api_version(vk::API_VERSION_1_3)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .application_version(vk::make_api_version(0, 0, 1, 0));

        let display_extensions = ash_window::enumerate_required_extensions(display_handle)
            .context("Unsupported display for surface creation")?;
        let extension_names = required_instance_extension_names(display_extensions, enable_debug);

        let layer_names = required_layer_names(enable_debug);
        if !check_layer_support(entry, &layer_names)? {
            anyhow::bail!("Required layers are not available: {:?}", layer_names);
        }
        let layer_names_c_char = layer_names
            .iter()
            .map(|&name| CString::new(name))
            .collect::<Result<Vec<_>, _>>()?;
        let layer_names_ptrs: Vec<*const c_char> = layer_names_c_char
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        // also covers messages from instance creation and destruction
        let mut debug_messenger_create_info = create_debug_messenger_create_info();

        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names_ptrs);
        if enable_debug {
            create_info = create_info.push_next(&mut debug_messenger_create_info);
        }

        let instance = unsafe { entry.create_instance(&create_info, None)? };
        log::info!("instance created");
        Ok(Self { instance })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
