//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// This trait bounds the types that can be used as raster values,
/// ensuring they support necessary numeric operations.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data.
    ///
    /// For floating point types the comparison is on the exact bit pattern:
    /// the no-data sentinel must round-trip bitwise, never approximately.
    /// With no sentinel set, NaN is treated as no-data.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => self.to_bits() == nd.to_bits(),
                    None => self.is_nan(),
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(i64);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_int!(u64);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nodata_is_bit_exact() {
        let nd = -9999.0_f32;
        assert!((-9999.0_f32).is_nodata(Some(nd)));
        // A near miss must not count as no-data
        assert!(!(-9999.002_f32).is_nodata(Some(nd)));
        assert!(!(-9998.998_f32).is_nodata(Some(nd)));
        // A NaN sentinel matches a NaN value of the same bit pattern
        assert!(f32::NAN.is_nodata(Some(f32::NAN)));
    }

    #[test]
    fn test_nan_nodata_without_sentinel() {
        assert!(f32::NAN.is_nodata(None));
        assert!(!0.0_f32.is_nodata(None));
    }

    #[test]
    fn test_int_nodata() {
        assert!(0_u32.is_nodata(Some(0)));
        assert!(!1_u32.is_nodata(Some(0)));
        assert!(!1_u32.is_nodata(None));
    }
}
