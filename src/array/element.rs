use super::{ArrayError, DataType};

/// A trait representing an array element type.
///
/// Elements are converted to and from bytes in native byte order.
pub trait Element: Sized + Copy + Send + Sync {
    /// The data type of the element.
    const DATA_TYPE: DataType;

    /// Validate the data type.
    ///
    /// # Errors
    /// Returns [`ArrayError::IncompatibleElementType`] if the data type is incompatible with [`Element`].
    fn validate_data_type(data_type: DataType) -> Result<(), ArrayError> {
        if data_type == Self::DATA_TYPE {
            Ok(())
        } else {
            Err(ArrayError::IncompatibleElementType(data_type))
        }
    }

    /// Convert a slice of elements into bytes.
    fn to_bytes(elements: &[Self]) -> Vec<u8>;

    /// Convert bytes into elements.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `bytes` is not a whole number of elements or holds an invalid element value.
    fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError>;
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn to_bytes(elements: &[Self]) -> Vec<u8> {
        bytemuck::cast_slice(elements).to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError> {
        if bytes.iter().all(|&u| u <= 1) {
            Ok(bytes.iter().map(|&u| u == 1).collect())
        } else {
            Err(ArrayError::InvalidElementValue(DataType::Bool))
        }
    }
}

macro_rules! impl_element_pod {
    ($raw_type:ty, $data_type:expr) => {
        impl Element for $raw_type {
            const DATA_TYPE: DataType = $data_type;

            fn to_bytes(elements: &[Self]) -> Vec<u8> {
                bytemuck::cast_slice(elements).to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Result<Vec<Self>, ArrayError> {
                if bytes.len() % core::mem::size_of::<Self>() == 0 {
                    // copies, so the input does not need to be aligned
                    Ok(bytemuck::pod_collect_to_vec(bytes))
                } else {
                    Err(ArrayError::InvalidBytesLength(
                        bytes.len(),
                        (bytes.len() / core::mem::size_of::<Self>() * core::mem::size_of::<Self>()) as u64,
                    ))
                }
            }
        }
    };
}

impl_element_pod!(i8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8);
impl_element_pod!(u16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64);
impl_element_pod!(half::f16, DataType::Float16);
impl_element_pod!(f32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64);
impl_element_pod!(half::bf16, DataType::BFloat16);
