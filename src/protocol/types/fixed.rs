use std::fmt;

/// A signed 24.8 fixed-point number, as used for surface-local coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const MIN: Fixed = Fixed(i32::MIN);
    pub const MAX: Fixed = Fixed(i32::MAX);

    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Rounds to the nearest 1/256 and clamps to the representable range. NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let scaled = (value * 256.0).round();
        Self(scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 256.0
    }

    pub fn from_int(value: i32) -> Self {
        Self(value.saturating_mul(256))
    }

    /// Integer part, truncated toward zero.
    pub fn to_int(self) -> i32 {
        self.0 / 256
    }
}

impl From<f64> for Fixed {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> Self {
        value.to_f64()
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn converts_common_values() {
        assert_eq!(Fixed::from_f64(1.0).to_raw(), 256);
        assert_eq!(Fixed::from_f64(-0.5).to_raw(), -128);
        assert_eq!(Fixed::from_raw(384).to_f64(), 1.5);
        assert_eq!(Fixed::from_int(-3).to_int(), -3);
        assert_eq!(Fixed::from_f64(-2.75).to_int(), -2);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Fixed::from_f64(1e12), Fixed::MAX);
        assert_eq!(Fixed::from_f64(-1e12), Fixed::MIN);
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
        assert_eq!(Fixed::from_int(i32::MAX), Fixed::MAX);
    }

    proptest! {
        #[test]
        fn round_trip_within_one_step(value in -8_388_608.0f64..8_388_607.0) {
            let back = Fixed::from_f64(value).to_f64();
            prop_assert!((back - value).abs() < 1.0 / 256.0);
        }

        #[test]
        fn raw_values_survive(raw in any::<i32>()) {
            prop_assert_eq!(Fixed::from_f64(Fixed::from_raw(raw).to_f64()).to_raw(), raw);
        }
    }
}
