use thiserror::Error;

use super::{ArrayShape, DataType};

/// Array errors.
///
/// These are precondition violations on the inputs of sample writes and reads.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// The number of bytes does not match the shape and data type.
    #[error("got {_0} bytes, expected {_1} bytes for the shape and data type")]
    InvalidBytesLength(usize, u64),
    /// The number of elements does not match the shape.
    #[error("got {_0} elements, expected {_1} for shape {_2:?}")]
    InvalidElementCount(usize, u64, ArrayShape),
    /// A reshape does not preserve the number of elements.
    #[error("cannot reshape {_0:?} to {_1:?}")]
    InvalidReshape(ArrayShape, ArrayShape),
    /// A batched array must have a leading batch dimension.
    #[error("a batched array must have at least one dimension")]
    BatchedScalar,
    /// The element type is not compatible with the data type.
    #[error("the element type is not compatible with data type {_0}")]
    IncompatibleElementType(DataType),
    /// An element value is not valid for the data type.
    #[error("invalid element value for data type {_0}")]
    InvalidElementValue(DataType),
    /// The array is too large to be addressed on this platform.
    #[error("an array with shape {_0:?} is too large")]
    ArrayTooLarge(ArrayShape),
    /// An ndarray shape error.
    #[cfg(feature = "ndarray")]
    #[error(transparent)]
    NdarrayShapeError(#[from] ndarray::ShapeError),
}
