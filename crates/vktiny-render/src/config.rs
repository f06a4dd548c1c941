use anyhow::{
    Context as _,
    Result,
};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextCreateInfo {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub debug: bool,
    pub ray_tracing: bool,
}

impl Default for ContextCreateInfo {
    fn default() -> Self {
        Self {
            title: "vktiny".to_string(),
            width: 1280,
            height: 720,
            debug: true,
            ray_tracing: true,
        }
    }
}

impl ContextCreateInfo {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn ray_tracing(mut self, ray_tracing: bool) -> Self {
        self.ray_tracing = ray_tracing;
        self
    }
}

pub fn parse_context_create_info(json: &str) -> Result<ContextCreateInfo> {
    let create_info: ContextCreateInfo = serde_json::from_str(json)?;
    anyhow::ensure!(
        create_info.width > 0 && create_info.height > 0,
        "window size must be non-zero, got {}x{}",
        create_info.width,
        create_info.height
    );
    Ok(create_info)
}

pub fn load_context_create_info(path: impl AsRef<Path>) -> Result<ContextCreateInfo> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_context_create_info(&json)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_fields() {
        let create_info = parse_context_create_info(r#"{ "title": "triangle" }"#).unwrap();
        assert_eq!(create_info.title, "triangle");
        assert_eq!(create_info.width, 1280);
        assert_eq!(create_info.height, 720);
        assert!(create_info.debug);
        assert!(create_info.ray_tracing);
    }

    #[test]
    fn test_full_config() {
        let create_info = parse_context_create_info(
            r#"{ "title": "compute", "width": 640, "height": 480, "debug": false, "ray_tracing": false }"#,
        )
        .unwrap();
        assert_eq!(
            create_info,
            ContextCreateInfo::default()
                .title("compute")
                .size(640, 480)
                .debug(false)
                .ray_tracing(false)
        );
    }

    #[test]
    fn test_rejects_zero_size() {
        assert!(parse_context_create_info(r#"{ "width": 0 }"#).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(parse_context_create_info("{ title: }").is_err());
    }

    #[test]
    fn test_shipped_configs_parse() {
        let configs = concat!(env!("CARGO_MANIFEST_DIR"), "/configs");
        let triangle =
            load_context_create_info(format!("{}/raytracing_triangle.json", configs)).unwrap();
        assert!(triangle.ray_tracing);
        let compute = load_context_create_info(format!("{}/hello_compute.json", configs)).unwrap();
        assert!(!compute.ray_tracing);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_context_create_info("does/not/exist.json").is_err());
    }
}
