/// Rounds `value` to `decimals` decimal places, half away from zero.
pub fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round(0.55 / 0.75 * 4.0, 2), 2.93);
        assert_eq!(round(55.004, 2), 55.0);
        assert_eq!(round(63.155, 2), 63.16);
    }
}
