use ndarray::{ArrayD, IxDyn};

use crate::{
    enums::ElementType,
    error::{FilterError, Result},
    pixel::Pixel,
};

/// Type-erased N-dimensional array. The variant is the runtime element type
/// tag the dispatcher resolves against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyArray {
    Logical(ArrayD<bool>),
    Double(ArrayD<f64>),
    Single(ArrayD<f32>),
    Int8(ArrayD<i8>),
    Uint8(ArrayD<u8>),
    Int16(ArrayD<i16>),
    Uint16(ArrayD<u16>),
    Int32(ArrayD<i32>),
    Uint32(ArrayD<u32>),
    Int64(ArrayD<i64>),
    Uint64(ArrayD<u64>),
}

/// Runs `$body` with `$a` bound to the typed array inside an [`AnyArray`].
macro_rules! with_any_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            $crate::array::AnyArray::Logical($a) => $body,
            $crate::array::AnyArray::Double($a) => $body,
            $crate::array::AnyArray::Single($a) => $body,
            $crate::array::AnyArray::Int8($a) => $body,
            $crate::array::AnyArray::Uint8($a) => $body,
            $crate::array::AnyArray::Int16($a) => $body,
            $crate::array::AnyArray::Uint16($a) => $body,
            $crate::array::AnyArray::Int32($a) => $body,
            $crate::array::AnyArray::Uint32($a) => $body,
            $crate::array::AnyArray::Int64($a) => $body,
            $crate::array::AnyArray::Uint64($a) => $body,
        }
    };
}
pub(crate) use with_any_array;

impl<T: Pixel> From<ArrayD<T>> for AnyArray {
    fn from(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }
}

impl AnyArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            AnyArray::Logical(_) => ElementType::Logical,
            AnyArray::Double(_) => ElementType::Double,
            AnyArray::Single(_) => ElementType::Single,
            AnyArray::Int8(_) => ElementType::Int8,
            AnyArray::Uint8(_) => ElementType::Uint8,
            AnyArray::Int16(_) => ElementType::Int16,
            AnyArray::Uint16(_) => ElementType::Uint16,
            AnyArray::Int32(_) => ElementType::Int32,
            AnyArray::Uint32(_) => ElementType::Uint32,
            AnyArray::Int64(_) => ElementType::Int64,
            AnyArray::Uint64(_) => ElementType::Uint64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_any_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_array<T: Pixel>(&self) -> Option<&ArrayD<T>> {
        T::unwrap_ref(self)
    }

    /// Elements in row-major order, widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_any_array!(self, a => a.iter().map(|v| v.to_f64()).collect())
    }

    pub fn to_f64_array(&self) -> ArrayD<f64> {
        with_any_array!(self, a => a.mapv(|v| v.to_f64()))
    }

    /// Builds an array of `element_type` from row-major f64 values, casting
    /// each element.
    pub fn from_f64(element_type: ElementType, shape: &[usize], values: Vec<f64>) -> Result<Self> {
        fn typed<T: Pixel>(shape: &[usize], values: Vec<f64>) -> Result<AnyArray> {
            let data: Vec<T> = values.into_iter().map(T::from_f64).collect();
            Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?.into())
        }

        match element_type {
            ElementType::Logical => typed::<bool>(shape, values),
            ElementType::Double => typed::<f64>(shape, values),
            ElementType::Single => typed::<f32>(shape, values),
            ElementType::Int8 => typed::<i8>(shape, values),
            ElementType::Uint8 => typed::<u8>(shape, values),
            ElementType::Int16 => typed::<i16>(shape, values),
            ElementType::Uint16 => typed::<u16>(shape, values),
            ElementType::Int32 => typed::<i32>(shape, values),
            ElementType::Uint32 => typed::<u32>(shape, values),
            ElementType::Int64 => typed::<i64>(shape, values),
            ElementType::Uint64 => typed::<u64>(shape, values),
        }
    }

    /// Reinterprets a native-endian raw element buffer.
    pub fn from_raw_bytes(element_type: ElementType, shape: &[usize], bytes: &[u8]) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(element_type.byte_size(), |bytes, &extent| bytes.checked_mul(extent))
            .ok_or_else(|| {
                FilterError::InvalidImage(format!(
                    "{element_type} elements of shape {shape:?} do not fit in memory"
                ))
            })?;
        if bytes.len() != expected {
            return Err(FilterError::InvalidImage(format!(
                "raw buffer holds {} bytes, {} {} elements of shape {:?} need {}",
                bytes.len(),
                expected / element_type.byte_size(),
                element_type,
                shape,
                expected
            )));
        }

        fn pod<T: Pixel + bytemuck::Pod>(shape: &[usize], bytes: &[u8]) -> Result<AnyArray> {
            let data: Vec<T> = bytes
                .chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned::<T>)
                .collect();
            Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?.into())
        }

        match element_type {
            ElementType::Logical => {
                let data: Vec<bool> = bytes.iter().map(|&b| b != 0).collect();
                Ok(AnyArray::Logical(ArrayD::from_shape_vec(IxDyn(shape), data)?))
            }
            ElementType::Double => pod::<f64>(shape, bytes),
            ElementType::Single => pod::<f32>(shape, bytes),
            ElementType::Int8 => pod::<i8>(shape, bytes),
            ElementType::Uint8 => pod::<u8>(shape, bytes),
            ElementType::Int16 => pod::<i16>(shape, bytes),
            ElementType::Uint16 => pod::<u16>(shape, bytes),
            ElementType::Int32 => pod::<i32>(shape, bytes),
            ElementType::Uint32 => pod::<u32>(shape, bytes),
            ElementType::Int64 => pod::<i64>(shape, bytes),
            ElementType::Uint64 => pod::<u64>(shape, bytes),
        }
    }

    /// Row-major native-endian element buffer
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        fn pod<T: bytemuck::Pod>(array: &ArrayD<T>) -> Vec<u8> {
            let data: Vec<T> = array.iter().copied().collect();
            bytemuck::cast_slice(&data).to_vec()
        }

        match self {
            AnyArray::Logical(a) => a.iter().map(|&v| v as u8).collect(),
            AnyArray::Double(a) => pod(a),
            AnyArray::Single(a) => pod(a),
            AnyArray::Int8(a) => pod(a),
            AnyArray::Uint8(a) => pod(a),
            AnyArray::Int16(a) => pod(a),
            AnyArray::Uint16(a) => pod(a),
            AnyArray::Int32(a) => pod(a),
            AnyArray::Uint32(a) => pod(a),
            AnyArray::Int64(a) => pod(a),
            AnyArray::Uint64(a) => pod(a),
        }
    }
}
