//! Fixed-point measurement units

use std::fmt;

/// A fixed-point value with one decimal place, stored as a count of tenths
///
/// The sensor reports temperature and humidity in tenths, so keeping them as
/// integers makes equality exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Tenths(i32);

impl Tenths {
    /// Create a value from a raw count of tenths
    pub const fn new(tenths: i32) -> Self {
        Self(tenths)
    }

    /// Raw count of tenths
    pub const fn tenths(self) -> i32 {
        self.0
    }

    /// Value as a floating point number
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_one_decimal() {
        assert_eq!(Tenths::new(234).to_string(), "23.4");
        assert_eq!(Tenths::new(0).to_string(), "0.0");
        assert_eq!(Tenths::new(-5).to_string(), "-0.5");
        assert_eq!(Tenths::new(-123).to_string(), "-12.3");
    }

    #[test]
    fn test_as_f64() {
        assert!((Tenths::new(456).as_f64() - 45.6).abs() < f64::EPSILON);
    }
}
