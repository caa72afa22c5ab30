/// 小数第 2 位へ切り上げる（予測値の表示規約）
pub fn ceil_to_hundredths(v: f64) -> f64 {
    (v * 100.0).ceil() / 100.0
}

/// 小数第 2 位へ四捨五入する
pub fn round_to_hundredths(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_rounds_up_not_nearest() {
        assert_eq!(ceil_to_hundredths(151.991), 152.00);
        assert_eq!(ceil_to_hundredths(151.99), 151.99);
        assert_eq!(ceil_to_hundredths(100.001), 100.01);
    }

    #[test]
    fn round_is_ordinary() {
        assert_eq!(round_to_hundredths(2.004), 2.0);
        assert_eq!(round_to_hundredths(2.006), 2.01);
        assert_eq!(round_to_hundredths(-1.499), -1.5);
    }
}
