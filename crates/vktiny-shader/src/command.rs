use crate::utils::{
    glob_shader_src,
    spv_output_path,
    SHADER_EXTENSIONS,
};
use anyhow::{
    ensure,
    Context,
    Result,
};
use std::{
    io::Write,
    path::Path,
    process::Command,
};
use vktiny_base::path::{
    get_shader_spv_root,
    get_shader_src_root,
};

/// Ray tracing stages need SPIR-V 1.4, which vulkan1.3 implies.
const TARGET_ENV: &str = "--target-env=vulkan1.3";

pub fn compile(input_path: &Path) -> Result<()> {
    let output_path = spv_output_path(input_path, &get_shader_src_root()?, &get_shader_spv_root()?)?;

    let output_dir = output_path.parent().context("failed to get parent")?;
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
    }

    if is_up_to_date(input_path, &output_path)? {
        log::debug!("shader is up to date: {}", output_path.display());
        return Ok(());
    }

    log::info!(
        "compiling shader: {} -> {}",
        input_path.display(),
        output_path.display()
    );
    let output = Command::new("glslc")
        .arg(input_path.as_os_str())
        .arg(TARGET_ENV)
        .arg("-O")
        .arg("-o")
        .arg(output_path.as_os_str())
        .output()
        .context("failed to run glslc, is the Vulkan SDK installed?")?;
    std::io::stderr().write_all(&output.stderr)?;
    ensure!(
        output.status.success(),
        "failed to compile shader: {}",
        input_path.display()
    );
    Ok(())
}

fn is_up_to_date(input_path: &Path, output_path: &Path) -> Result<bool> {
    if !output_path.exists() {
        return Ok(false);
    }
    let source_modified = std::fs::metadata(input_path)?.modified()?;
    let binary_modified = std::fs::metadata(output_path)?.modified()?;
    Ok(binary_modified >= source_modified)
}

pub fn compile_all() -> Result<()> {
    let shader_src_root = get_shader_src_root()?;
    let extensions = SHADER_EXTENSIONS.iter().cloned().collect();
    let target_paths = glob_shader_src(&shader_src_root, &extensions)?;
    log::info!("{} shader sources found", target_paths.len());
    for path in target_paths {
        compile(&path)?;
    }
    Ok(())
}
