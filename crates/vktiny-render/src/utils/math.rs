pub fn div_up<
    T: std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Div<Output = T>
        + From<u8>
        + Copy,
>(
    a: T,
    b: T,
) -> T {
    (a + b - T::from(1)) / b
}

/// Rounds `value` up to a multiple of `alignment`, which must be a power of two.
pub fn align_up<
    T: std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::BitAnd<Output = T>
        + std::ops::Not<Output = T>
        + From<u8>
        + Copy,
>(
    value: T,
    alignment: T,
) -> T {
    (value + alignment - T::from(1)) & !(alignment - T::from(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_up() {
        assert_eq!(div_up(1280u32, 16), 80);
        assert_eq!(div_up(1281u32, 16), 81);
        assert_eq!(div_up(1u32, 16), 1);
        assert_eq!(div_up(0u32, 16), 0);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(32u32, 64), 64);
        assert_eq!(align_up(64u32, 64), 64);
        assert_eq!(align_up(65u64, 64), 128);
        assert_eq!(align_up(0u64, 32), 0);
        assert_eq!(align_up(24u32, 1), 24);
    }
}
