//! Sample arrays.
//!
//! An [`ArrayData`] is a dense n-dimensional array of a fixed size [`DataType`].
//! Its elements are held as a flat byte buffer in row-major (C) order with native element width and byte order.
//! This byte layout is what the [sample writer](crate::engine::write_sample) chunks and what the [sample reader](crate::engine::read_sample) reassembles, so it must be mirrored exactly by both.
//!
//! Before a sample is written, its shape is canonicalised by [`normalize_shape`].
//!
//! With the `ndarray` feature, [`ArrayData::from_ndarray`] and [`ArrayData::to_ndarray`] convert to and from [`ndarray::ArrayD`].

mod array_errors;
mod data_type;
mod element;
mod normalize;

pub use array_errors::ArrayError;
pub use data_type::{DataType, UnsupportedDataTypeError};
pub use element::Element;
pub use normalize::normalize_shape;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// An owned array of a fixed size data type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayData {
    data_type: DataType,
    shape: ArrayShape,
    bytes: Vec<u8>,
}

/// Returns the number of elements of an array with `shape`.
///
/// # Errors
/// Returns [`ArrayError::ArrayTooLarge`] if the number of elements overflows.
pub fn num_elements(shape: &[u64]) -> Result<u64, ArrayError> {
    shape
        .iter()
        .try_fold(1u64, |acc, &size| acc.checked_mul(size))
        .ok_or_else(|| ArrayError::ArrayTooLarge(shape.to_vec()))
}

/// Returns the number of bytes of an array with `shape` and `data_type`.
///
/// # Errors
/// Returns [`ArrayError::ArrayTooLarge`] if the number of bytes overflows.
pub fn num_bytes(shape: &[u64], data_type: DataType) -> Result<u64, ArrayError> {
    num_elements(shape)?
        .checked_mul(data_type.size() as u64)
        .ok_or_else(|| ArrayError::ArrayTooLarge(shape.to_vec()))
}

impl ArrayData {
    /// Create a new array from `bytes` in native byte order.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidBytesLength`] if the length of `bytes` does not match `shape` and `data_type`.
    /// Returns [`ArrayError::InvalidElementValue`] if a `bool` array holds a byte other than 0 or 1.
    pub fn new(
        data_type: DataType,
        shape: ArrayShape,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self, ArrayError> {
        let bytes = bytes.into();
        let expected = num_bytes(&shape, data_type)?;
        if bytes.len() as u64 != expected {
            return Err(ArrayError::InvalidBytesLength(bytes.len(), expected));
        }
        if data_type == DataType::Bool && bytes.iter().any(|&u| u > 1) {
            return Err(ArrayError::InvalidElementValue(data_type));
        }
        Ok(Self {
            data_type,
            shape,
            bytes,
        })
    }

    /// Create a new array from `elements` in row-major order.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidElementCount`] if the number of elements does not match `shape`.
    pub fn new_with_elements<T: Element>(
        shape: ArrayShape,
        elements: &[T],
    ) -> Result<Self, ArrayError> {
        let expected = num_elements(&shape)?;
        if elements.len() as u64 != expected {
            return Err(ArrayError::InvalidElementCount(
                elements.len(),
                expected,
                shape,
            ));
        }
        Ok(Self {
            data_type: T::DATA_TYPE,
            shape,
            bytes: T::to_bytes(elements),
        })
    }

    /// Returns the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Returns the bytes in native byte order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the array and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        (self.bytes.len() / self.data_type.size()) as u64
    }

    /// Returns the elements in row-major order.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if `T` does not match the data type.
    pub fn to_elements<T: Element>(&self) -> Result<Vec<T>, ArrayError> {
        T::validate_data_type(self.data_type)?;
        T::from_bytes(&self.bytes)
    }

    /// Reshape the array, preserving the number of elements and their order.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidReshape`] if `shape` has a different number of elements.
    pub fn reshape(self, shape: ArrayShape) -> Result<Self, ArrayError> {
        if num_elements(&shape)? == num_elements(&self.shape)? {
            Ok(Self { shape, ..self })
        } else {
            Err(ArrayError::InvalidReshape(self.shape, shape))
        }
    }

    /// Canonicalise the shape of the array with [`normalize_shape`].
    ///
    /// # Errors
    /// Returns [`ArrayError::BatchedScalar`] if `batched` is true and the array has no dimensions.
    pub fn normalize(self, batched: bool) -> Result<Self, ArrayError> {
        let shape = normalize_shape(&self.shape, batched)?;
        Ok(Self { shape, ..self })
    }

    /// Create an array from an [`ndarray::ArrayBase`].
    ///
    /// Elements are taken in logical row-major order regardless of the memory layout of `array`.
    #[cfg(feature = "ndarray")]
    #[must_use]
    pub fn from_ndarray<T: Element, S: ndarray::Data<Elem = T>, D: ndarray::Dimension>(
        array: &ndarray::ArrayBase<S, D>,
    ) -> Self {
        let shape = array.shape().iter().map(|&size| size as u64).collect();
        let elements = array.as_standard_layout();
        let bytes = elements.as_slice().map_or_else(
            || T::to_bytes(&elements.iter().copied().collect::<Vec<_>>()),
            T::to_bytes,
        );
        Self {
            data_type: T::DATA_TYPE,
            shape,
            bytes,
        }
    }

    /// Convert the array to an [`ndarray::ArrayD`].
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `T` does not match the data type or the shape cannot be represented.
    #[cfg(feature = "ndarray")]
    pub fn to_ndarray<T: Element>(&self) -> Result<ndarray::ArrayD<T>, ArrayError> {
        let shape = self
            .shape
            .iter()
            .map(|&size| usize::try_from(size))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ArrayError::ArrayTooLarge(self.shape.clone()))?;
        let elements = self.to_elements::<T>()?;
        Ok(ndarray::ArrayD::<T>::from_shape_vec(shape, elements)?)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn array_data_new() -> Result<(), Box<dyn Error>> {
        let array = ArrayData::new(DataType::UInt16, vec![2, 3], vec![0u8; 12])?;
        assert_eq!(array.num_elements(), 6);
        assert!(matches!(
            ArrayData::new(DataType::UInt16, vec![2, 3], vec![0u8; 11]),
            Err(ArrayError::InvalidBytesLength(11, 12))
        ));
        assert!(matches!(
            ArrayData::new(DataType::Bool, vec![2], vec![0u8, 3]),
            Err(ArrayError::InvalidElementValue(DataType::Bool))
        ));
        assert!(matches!(
            ArrayData::new(DataType::UInt8, vec![u64::MAX, 2], Vec::<u8>::new()),
            Err(ArrayError::ArrayTooLarge(_))
        ));
        Ok(())
    }

    #[test]
    fn array_data_elements() -> Result<(), Box<dyn Error>> {
        let array = ArrayData::new_with_elements(vec![2, 2], &[1i64, -2, 3, -4])?;
        assert_eq!(array.data_type(), DataType::Int64);
        assert_eq!(array.bytes().len(), 32);
        assert_eq!(array.to_elements::<i64>()?, vec![1, -2, 3, -4]);
        assert!(array.to_elements::<u64>().is_err());
        assert!(ArrayData::new_with_elements(vec![3], &[1u8, 2]).is_err());
        Ok(())
    }

    #[test]
    fn array_data_normalize_preserves_order() -> Result<(), Box<dyn Error>> {
        let elements: Vec<f32> = (0..24).map(|i| i as f32).collect();
        let array = ArrayData::new_with_elements(vec![2, 3, 4, 1], &elements)?;
        let normalized = array.clone().normalize(false)?;
        assert_eq!(normalized.shape(), &[1, 2, 3, 4]);
        assert_eq!(normalized.bytes(), array.bytes());
        let normalized = array.clone().normalize(true)?;
        assert_eq!(normalized.shape(), &[2, 3, 4]);
        assert_eq!(normalized.to_elements::<f32>()?, elements);
        Ok(())
    }

    #[test]
    fn array_data_reshape() -> Result<(), Box<dyn Error>> {
        let array = ArrayData::new_with_elements(vec![6], &[1u8, 2, 3, 4, 5, 6])?;
        let array = array.reshape(vec![2, 3])?;
        assert_eq!(array.shape(), &[2, 3]);
        assert!(array.reshape(vec![4]).is_err());
        Ok(())
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn array_data_ndarray() -> Result<(), Box<dyn Error>> {
        let ndarray = ndarray::Array2::<f64>::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f64);
        let array = ArrayData::from_ndarray(&ndarray);
        assert_eq!(array.shape(), &[3, 4]);
        assert_eq!(array.data_type(), DataType::Float64);
        assert_eq!(array.to_ndarray::<f64>()?, ndarray.clone().into_dyn());

        // non standard layout
        let transposed = ndarray.t();
        let array = ArrayData::from_ndarray(&transposed);
        assert_eq!(array.shape(), &[4, 3]);
        assert_eq!(array.to_elements::<f64>()?[..3], [0.0, 4.0, 8.0]);
        Ok(())
    }
}
