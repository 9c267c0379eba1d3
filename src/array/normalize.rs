use super::{ArrayError, ArrayShape};

/// Canonicalise `shape` into the batched form used for storage.
///
/// Trailing dimensions of size one are removed, a leading batch dimension of size one is prepended if the array is not `batched`, and the result is padded with trailing ones to a rank of at least two.
/// This is a reshape, so the number of elements and their row-major order are unchanged.
///
/// ```text
/// batched:   [10, 3, 224, 224, 1, 1] -> [10, 3, 224, 224]
/// batched:   [1, 1, 1, 1]            -> [1, 1]
/// unbatched: [100]                   -> [1, 100]
/// unbatched: [3, 224, 224, 1]        -> [1, 3, 224, 224]
/// ```
///
/// # Errors
/// Returns [`ArrayError::BatchedScalar`] if `batched` is true and `shape` has no dimensions, since there is no batch dimension.
pub fn normalize_shape(shape: &[u64], batched: bool) -> Result<ArrayShape, ArrayError> {
    if batched && shape.is_empty() {
        return Err(ArrayError::BatchedScalar);
    }

    let rank = shape.iter().rposition(|&size| size != 1).map_or(0, |i| i + 1);
    let mut normalized = Vec::with_capacity(rank.max(1) + 1);
    if !batched {
        normalized.push(1);
    }
    normalized.extend_from_slice(&shape[..rank]);
    if normalized.len() < 2 {
        normalized.resize(2, 1);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_batched() {
        let cases: &[(&[u64], &[u64])] = &[
            (&[1, 100], &[1, 100]),
            (&[100, 100], &[100, 100]),
            (&[10, 224, 224, 3], &[10, 224, 224, 3]),
            (&[10, 3, 224, 224], &[10, 3, 224, 224]),
            (&[10, 3, 224, 224, 1], &[10, 3, 224, 224]),
            (&[10, 3, 224, 224, 1, 1, 1, 1], &[10, 3, 224, 224]),
            (&[1, 1, 1, 1, 1, 1, 1], &[1, 1]),
            (&[1, 1], &[1, 1]),
            (&[10], &[10, 1]),
        ];
        for (shape, expected) in cases {
            assert_eq!(&normalize_shape(shape, true).unwrap(), expected, "{shape:?}");
        }
    }

    #[test]
    fn normalize_unbatched() {
        let cases: &[(&[u64], &[u64])] = &[
            (&[1], &[1, 1]),
            (&[100], &[1, 100]),
            (&[100, 100], &[1, 100, 100]),
            (&[3, 224, 224, 1, 1, 1, 1], &[1, 3, 224, 224]),
            (&[10, 3, 224, 224, 1, 1, 1, 1], &[1, 10, 3, 224, 224]),
            (&[1, 1], &[1, 1]),
            (&[1, 1, 1, 1, 1, 1, 1], &[1, 1]),
            (&[], &[1, 1]),
            (&[1, 5, 1], &[1, 1, 5]),
        ];
        for (shape, expected) in cases {
            assert_eq!(&normalize_shape(shape, false).unwrap(), expected, "{shape:?}");
        }
    }

    #[test]
    fn normalize_preserves_element_count() {
        for rank in 1..=8 {
            for trailing_ones in 0..rank {
                let shape: Vec<u64> = (0..rank)
                    .map(|i| if i >= rank - trailing_ones { 1 } else { i as u64 + 2 })
                    .collect();
                for batched in [false, true] {
                    let normalized = normalize_shape(&shape, batched).unwrap();
                    assert!(normalized.len() >= 2);
                    assert!(normalized.len() == 2 || normalized.last() != Some(&1));
                    assert_eq!(
                        normalized.iter().product::<u64>(),
                        shape.iter().product::<u64>()
                    );
                }
            }
        }
    }

    #[test]
    fn normalize_batched_scalar() {
        assert!(matches!(
            normalize_shape(&[], true),
            Err(ArrayError::BatchedScalar)
        ));
    }
}
