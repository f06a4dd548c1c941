use anyhow::{
    Context,
    Result,
};
use glob::glob;
use std::{
    collections::HashSet,
    path::{
        Path,
        PathBuf,
    },
};

pub const SHADER_EXTENSIONS: [&str; 7] = ["comp", "rgen", "rmiss", "rchit", "rahit", "rint", "rcall"];

pub fn has_shader_extension(path: &Path, extensions: &HashSet<&str>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| extensions.contains(ext))
}

pub fn glob_shader_src(shader_src_root: &Path, extensions: &HashSet<&str>) -> Result<Vec<PathBuf>> {
    let pattern = shader_src_root.join("**/*");
    let mut paths = Vec::new();
    for entry in glob(pattern.to_str().context("failed to convert to str")?)? {
        let path = entry?;
        if has_shader_extension(&path, extensions) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Maps `<src_root>/a/b.rgen` to `<spv_root>/a/b.rgen.spv`.
pub fn spv_output_path(input_path: &Path, src_root: &Path, spv_root: &Path) -> Result<PathBuf> {
    let input_filename = input_path
        .file_name()
        .context("failed to get file name")?
        .to_str()
        .context("failed to convert to string")?;
    let relative_input_path = input_path.strip_prefix(src_root)?;
    let relative_output_path = relative_input_path.with_file_name(format!("{}.spv", input_filename));
    Ok(spv_root.join(relative_output_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_shader_extension() {
        let extensions: HashSet<&str> = SHADER_EXTENSIONS.iter().cloned().collect();
        assert!(has_shader_extension(Path::new("shader/src/raygen.rgen"), &extensions));
        assert!(has_shader_extension(Path::new("gradient.comp"), &extensions));
        assert!(!has_shader_extension(Path::new("shader/src/common.glsl"), &extensions));
        assert!(!has_shader_extension(Path::new("shader/src/README"), &extensions));
    }

    #[test]
    fn test_spv_output_path() {
        let src_root = Path::new("/repo/shader/src");
        let spv_root = Path::new("/repo/shader/spv");

        let output =
            spv_output_path(&src_root.join("miss.rmiss"), src_root, spv_root).unwrap();
        assert_eq!(output, spv_root.join("miss.rmiss.spv"));

        let nested =
            spv_output_path(&src_root.join("rt/closesthit.rchit"), src_root, spv_root).unwrap();
        assert_eq!(nested, spv_root.join("rt/closesthit.rchit.spv"));
    }

    #[test]
    fn test_spv_output_path_outside_root() {
        let result = spv_output_path(
            Path::new("/elsewhere/raygen.rgen"),
            Path::new("/repo/shader/src"),
            Path::new("/repo/shader/spv"),
        );
        assert!(result.is_err());
    }
}
