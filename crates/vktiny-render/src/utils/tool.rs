use anyhow::Result;
use std::{
    ffi::CStr,
    os::raw::c_char,
};

pub fn convert_char_to_string(raw_string_array: &[c_char]) -> Result<String> {
    let bytes: Vec<u8> = raw_string_array.iter().map(|&c| c as u8).collect();
    let raw_string = CStr::from_bytes_until_nul(&bytes)?;
    Ok(raw_string.to_str()?.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_c_chars(text: &str, len: usize) -> Vec<c_char> {
        let mut chars = vec![0 as c_char; len];
        for (dst, src) in chars.iter_mut().zip(text.bytes()) {
            *dst = src as c_char;
        }
        chars
    }

    #[test]
    fn test_convert_char_to_string() {
        let raw = to_c_chars("VK_KHR_swapchain", 256);
        assert_eq!(convert_char_to_string(&raw).unwrap(), "VK_KHR_swapchain");
    }

    #[test]
    fn test_convert_char_to_string_without_nul() {
        let raw = to_c_chars("abcd", 4);
        assert!(convert_char_to_string(&raw).is_err());
    }
}
