use crate::utils::tool::convert_char_to_string;
use anyhow::Result;

const LAYER_KHRONOS_VALIDATION: &str = "VK_LAYER_KHRONOS_validation";

pub fn required_layer_names(enable_validation: bool) -> Vec<&'static str> {
    if enable_validation {
        vec![LAYER_KHRONOS_VALIDATION]
    } else {
        vec![]
    }
}

pub fn missing_layers<'a>(required: &[&'a str], available: &[String]) -> Vec<&'a str> {
    required
        .iter()
        .filter(|name| !available.iter().any(|available| available == *name))
        .copied()
        .collect()
}

pub fn check_layer_support(entry: &ash::Entry, layer_names: &[&str]) -> Result<bool> {
    let layer_properties = unsafe { entry.enumerate_instance_layer_properties()? };

    if layer_properties.is_empty() {
        log::warn!("No available layers.");
        return Ok(layer_names.is_empty());
    }

    log::debug!("Instance Available Layers: ");
    let mut available = vec![];
    for layer in layer_properties.iter() {
        let layer_name = convert_char_to_string(&layer.layer_name)?;
        log::debug!("\t{}", layer_name);
        available.push(layer_name);
    }

    let missing = missing_layers(layer_names, &available);
    for name in missing.iter() {
        log::warn!("Layer {} is not available.", name);
    }
    Ok(missing.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_layer_names() {
        assert_eq!(required_layer_names(true), vec![LAYER_KHRONOS_VALIDATION]);
        assert!(required_layer_names(false).is_empty());
    }

    #[test]
    fn test_missing_layers() {
        let available = vec![
            "VK_LAYER_KHRONOS_validation".to_string(),
            "VK_LAYER_MESA_overlay".to_string(),
        ];
        assert!(missing_layers(&[LAYER_KHRONOS_VALIDATION], &available).is_empty());
        assert_eq!(
            missing_layers(&["VK_LAYER_LUNARG_api_dump"], &available),
            vec!["VK_LAYER_LUNARG_api_dump"]
        );
    }
}
