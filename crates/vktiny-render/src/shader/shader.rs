use anyhow::{
    ensure,
    Context as _,
    Result,
};
use ash::vk;
use std::{
    ffi::CStr,
    path::Path,
};

pub const SHADER_ENTRY_POINT: &CStr = c"main";

pub fn read_shader_code(shader_path: &Path) -> Result<Vec<u32>> {
    ensure!(
        shader_path.exists(),
        "Shader path does not exist: {:?}",
        shader_path
    );
    let mut spv_file = std::fs::File::open(shader_path)?;
    let code = ash::util::read_spv(&mut spv_file)
        .with_context(|| format!("invalid SPIR-V binary: {:?}", shader_path))?;
    Ok(code)
}

pub struct ShaderModule {
    shader_module: vk::ShaderModule,
    device: ash::Device,
}

impl ShaderModule {
    pub fn new(device: ash::Device, shader_path: &Path) -> Result<Self> {
        let code = read_shader_code(shader_path)?;
        let shader_module_create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let shader_module =
            unsafe { device.create_shader_module(&shader_module_create_info, None)? };
        log::debug!("shader module created: {:?}", shader_path);
        Ok(Self {
            shader_module,
            device,
        })
    }

    pub fn vk_shader_module(&self) -> vk::ShaderModule {
        self.shader_module
    }

    pub fn stage_create_info(
        &self,
        stage: vk::ShaderStageFlags,
    ) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage)
            .module(self.shader_module)
            .name(SHADER_ENTRY_POINT)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.shader_module, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_shader_is_an_error() {
        assert!(read_shader_code(Path::new("shader/spv/missing.rgen.spv")).is_err());
    }

    #[test]
    fn test_read_shader_code() {
        let path = std::env::temp_dir().join("vktiny_read_shader_code_test.spv");
        // SPIR-V magic number followed by one more word
        let words: [u32; 2] = [0x0723_0203, 0x0001_0400];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&path, &bytes).unwrap();
        let code = read_shader_code(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(code, words.to_vec());
    }

    #[test]
    fn test_truncated_binary_is_an_error() {
        let path = std::env::temp_dir().join("vktiny_truncated_shader_test.spv");
        std::fs::write(&path, [0x03u8, 0x02, 0x23]).unwrap();
        let result = read_shader_code(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
