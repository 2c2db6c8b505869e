//! Expansion of a shared value or a short list of values onto a fixed number of entries.

use crate::params::{ScalarMeasurement, VerticalCoupling};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("empty array input")]
    Empty,
    #[error("input array of length {len} does not evenly distribute into {count} entries")]
    Uneven { len: usize, count: usize },
}

/// A parameter given either once for every entry, or as a sequence that is repeated
/// round-robin over the entries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Broadcast<T> {
    One(T),
    Each(Vec<T>),
}

impl<T: Clone> Broadcast<T> {
    /// Produce exactly `count` values.
    ///
    /// A sequence of length `L` expands to `[a[i % L] for i in 0..count]`, which is only
    /// accepted when `L` divides `count`. The check happens before anything is produced.
    pub fn expand(&self, count: usize) -> Result<Vec<T>, BroadcastError> {
        match self {
            Self::One(value) => {
                if count == 0 {
                    return Err(BroadcastError::Empty)
                }
                Ok(vec![value.clone(); count])
            }
            Self::Each(values) => {
                let len = values.len();
                match (len, count) {
                    (0, 0) => return Ok(Vec::new()),
                    (0, _) | (_, 0) => return Err(BroadcastError::Empty),
                    _ if count % len != 0 => return Err(BroadcastError::Uneven { len, count }),
                    _ => ()
                }
                Ok(values.iter().cycle().take(count).cloned().collect())
            }
        }
    }
}

impl<T> Broadcast<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Each(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<Vec<T>> for Broadcast<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Each(values)
    }
}

impl<T: Clone> From<&[T]> for Broadcast<T> {
    fn from(values: &[T]) -> Self {
        Self::Each(values.to_vec())
    }
}

impl<T, const N: usize> From<[T; N]> for Broadcast<T> {
    fn from(values: [T; N]) -> Self {
        Self::Each(values.into())
    }
}

macro_rules! broadcast_scalar {
    ( $( $ty:ty ),+ ) => {
        $(
            impl From<$ty> for Broadcast<$ty> {
                fn from(value: $ty) -> Self {
                    Self::One(value)
                }
            }
        )+
    };
}

broadcast_scalar!(f64, bool, usize, VerticalCoupling, ScalarMeasurement);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scalar() {
        assert_eq!(Broadcast::from(2.5_f64).expand(3), Ok(vec![2.5, 2.5, 2.5]));
        assert_eq!(Broadcast::from(true).expand(1), Ok(vec![true]));
    }

    #[test]
    fn test_scalar_onto_nothing() {
        assert_eq!(Broadcast::from(2.5_f64).expand(0), Err(BroadcastError::Empty));
    }

    #[test]
    fn test_same_length() {
        let values = Broadcast::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(values.expand(3), Ok(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_round_robin() {
        for count in [2, 4, 6, 12] {
            let values = Broadcast::from([10usize, 20]);
            let expected = (0..count).map(|i| [10, 20][i % 2]).collect::<Vec<_>>();
            assert_eq!(values.expand(count), Ok(expected));
        }
        let values = Broadcast::from(vec![VerticalCoupling::AC, VerticalCoupling::DC, VerticalCoupling::Ground]);
        assert_eq!(values.expand(6).unwrap()[3..], [VerticalCoupling::AC, VerticalCoupling::DC, VerticalCoupling::Ground]);
    }

    #[test]
    fn test_uneven() {
        let values = Broadcast::from(vec![1.0, 2.0]);
        assert_eq!(values.expand(3), Err(BroadcastError::Uneven { len: 2, count: 3 }));
        let values = Broadcast::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(values.expand(2), Err(BroadcastError::Uneven { len: 4, count: 2 }));
    }

    #[test]
    fn test_empty() {
        let nothing: Broadcast<f64> = Broadcast::from(vec![]);
        assert_eq!(nothing.expand(4), Err(BroadcastError::Empty));
        assert_eq!(nothing.expand(0), Ok(vec![]));
        assert_eq!(Broadcast::from(vec![1.0]).expand(0), Err(BroadcastError::Empty));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize() {
        let one: Broadcast<f64> = serde_json::from_str("2.5").unwrap();
        assert_eq!(one, Broadcast::One(2.5));
        let each: Broadcast<VerticalCoupling> = serde_json::from_str(r#"["AC", "Ground"]"#).unwrap();
        assert_eq!(each, Broadcast::Each(vec![VerticalCoupling::AC, VerticalCoupling::Ground]));
    }
}
