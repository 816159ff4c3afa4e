use std::fmt::Debug;

use ndarray::ArrayD;

use crate::{array::AnyArray, enums::ElementType};

/// Numeric behaviour shared by every element type an image can carry.
///
/// Filters are written once against this trait and instantiated per element
/// type by the dispatcher, so conversions follow `as`-cast semantics
/// (saturating, NaN to zero) everywhere.
pub trait Pixel: Copy + PartialEq + PartialOrd + Debug + Default + Send + Sync + 'static {
    const TYPE: ElementType;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;

    fn wrap(array: ArrayD<Self>) -> AnyArray;

    fn unwrap_ref(array: &AnyArray) -> Option<&ArrayD<Self>>;

    #[inline]
    fn is_foreground(self) -> bool {
        self.to_f64() != 0.0
    }
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident) => {
        impl Pixel for $t {
            const TYPE: ElementType = ElementType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn wrap(array: ArrayD<Self>) -> AnyArray {
                AnyArray::$variant(array)
            }

            fn unwrap_ref(array: &AnyArray) -> Option<&ArrayD<Self>> {
                match array {
                    AnyArray::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_pixel!(f64, Double);
impl_pixel!(f32, Single);
impl_pixel!(i8, Int8);
impl_pixel!(u8, Uint8);
impl_pixel!(i16, Int16);
impl_pixel!(u16, Uint16);
impl_pixel!(i32, Int32);
impl_pixel!(u32, Uint32);
impl_pixel!(i64, Int64);
impl_pixel!(u64, Uint64);

impl Pixel for bool {
    const TYPE: ElementType = ElementType::Logical;

    #[inline]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }

    fn wrap(array: ArrayD<Self>) -> AnyArray {
        AnyArray::Logical(array)
    }

    fn unwrap_ref(array: &AnyArray) -> Option<&ArrayD<Self>> {
        match array {
            AnyArray::Logical(inner) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_follow_cast_semantics() {
        assert_eq!(u8::from_f64(-1.0), 0);
        assert_eq!(u8::from_f64(256.0), 255);
        assert_eq!(i16::from_f64(f64::NAN), 0);
        assert!(bool::from_f64(0.5));
        assert_eq!(true.to_f64(), 1.0);
        assert_eq!(<f32 as Pixel>::TYPE, ElementType::Single);
    }

    #[test]
    fn foreground_is_non_zero() {
        assert!(3i32.is_foreground());
        assert!(!0.0f64.is_foreground());
        assert!(!false.is_foreground());
    }
}
