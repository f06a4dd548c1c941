use anyhow::Result;
use std::path::{
    Path,
    PathBuf,
};

const WORKSPACE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");

/// Returns the repository root.
///
/// The git work tree is preferred so binaries launched from a subdirectory still
/// resolve `shader/` correctly. Outside of a git checkout the build-time
/// workspace location is used.
pub fn get_project_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    match git2::Repository::discover(&current_dir) {
        Ok(repo) => {
            let workdir = repo
                .workdir()
                .ok_or_else(|| git2::Error::from_str("No workdir"))?;
            Ok(workdir.to_path_buf())
        }
        Err(_) => Ok(Path::new(WORKSPACE_ROOT).canonicalize()?),
    }
}

pub fn get_shader_root() -> Result<PathBuf> {
    Ok(get_project_root()?.join("shader"))
}

pub fn get_shader_src_root() -> Result<PathBuf> {
    Ok(get_shader_root()?.join("src"))
}

pub fn get_shader_spv_root() -> Result<PathBuf> {
    Ok(get_shader_root()?.join("spv"))
}

pub fn get_shader_spv_path(shader_name: &str) -> Result<PathBuf> {
    Ok(get_shader_spv_root()?.join(format!("{}.spv", shader_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_roots_are_nested() {
        let shader_root = get_shader_root().unwrap();
        assert!(shader_root.ends_with("shader"));
        assert_eq!(get_shader_src_root().unwrap(), shader_root.join("src"));
        assert_eq!(get_shader_spv_root().unwrap(), shader_root.join("spv"));
    }

    #[test]
    fn test_shader_spv_path() {
        let path = get_shader_spv_path("raygen.rgen").unwrap();
        assert!(path.ends_with("shader/spv/raygen.rgen.spv"));
    }
}
