//! Row-major factor space

use rand::Rng;

use super::{DataError, FactorVec, GroundTruthData};

/// A factor space where the last factor varies fastest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpace {
    factor_sizes: Vec<usize>,
    factor_names: Option<Vec<String>>,
    /// Stride of each factor in the flat index
    multipliers: Vec<usize>,
    len: usize,
}

impl StateSpace {
    /// Create a space over `factor_sizes`; every size must be at least 1
    pub fn new(factor_sizes: impl Into<Vec<usize>>) -> Result<Self, DataError> {
        let factor_sizes = factor_sizes.into();
        if factor_sizes.is_empty() {
            return Err(DataError::InvalidFactorSizes {
                reason: "at least one factor is required".to_string(),
            });
        }
        if let Some(i) = factor_sizes.iter().position(|&s| s == 0) {
            return Err(DataError::InvalidFactorSizes {
                reason: format!("factor {i} has size 0"),
            });
        }

        let mut multipliers = vec![1; factor_sizes.len()];
        let mut len: usize = 1;
        for i in (0..factor_sizes.len()).rev() {
            multipliers[i] = len;
            len = len.checked_mul(factor_sizes[i]).ok_or_else(|| DataError::InvalidFactorSizes {
                reason: format!("{factor_sizes:?} overflows the index range"),
            })?;
        }

        Ok(Self {
            factor_sizes,
            factor_names: None,
            multipliers,
            len,
        })
    }

    /// Attach factor names, one per factor
    pub fn with_names(mut self, names: Vec<String>) -> Result<Self, DataError> {
        if names.len() != self.factor_sizes.len() {
            return Err(DataError::WrongNumFactors {
                expected: self.factor_sizes.len(),
                got: names.len(),
            });
        }
        self.factor_names = Some(names);
        Ok(self)
    }

    /// Draw a uniformly random factor vector
    pub fn sample_factors<R: Rng + ?Sized>(&self, rng: &mut R) -> FactorVec {
        self.factor_sizes.iter().map(|&size| rng.random_range(0..size)).collect()
    }

    /// Draw a uniformly random flat index
    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.random_range(0..self.len)
    }
}

impl GroundTruthData for StateSpace {
    fn factor_sizes(&self) -> &[usize] {
        &self.factor_sizes
    }

    fn factor_names(&self) -> Vec<String> {
        match &self.factor_names {
            Some(names) => names.clone(),
            None => (0..self.factor_sizes.len()).map(|i| format!("factor_{i}")).collect(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn idx_to_pos(&self, idx: usize) -> Result<FactorVec, DataError> {
        if idx >= self.len {
            return Err(DataError::IndexOutOfRange { index: idx, len: self.len });
        }
        Ok(self
            .multipliers
            .iter()
            .zip(&self.factor_sizes)
            .map(|(&stride, &size)| (idx / stride) % size)
            .collect())
    }

    fn pos_to_idx(&self, pos: &[usize]) -> Result<usize, DataError> {
        if pos.len() != self.factor_sizes.len() {
            return Err(DataError::WrongNumFactors {
                expected: self.factor_sizes.len(),
                got: pos.len(),
            });
        }
        let mut idx = 0;
        for (factor, ((&value, &size), &stride)) in pos.iter().zip(&self.factor_sizes).zip(&self.multipliers).enumerate() {
            if value >= size {
                return Err(DataError::FactorOutOfRange { factor, value, size });
            }
            idx += value * stride;
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_bijection_covers_all_indices() {
        let space = StateSpace::new([2, 3, 4]).unwrap();
        assert_eq!(space.len(), 24);
        assert_eq!(space.num_factors(), 3);
        for idx in 0..space.len() {
            let pos = space.idx_to_pos(idx).unwrap();
            assert_eq!(space.pos_to_idx(&pos).unwrap(), idx);
        }
        assert_eq!(space.idx_to_pos(5).unwrap(), vec![0, 1, 1]);
        assert_eq!(space.pos_to_idx(&[1, 2, 3]).unwrap(), 23);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let space = StateSpace::new(vec![4, 4]).unwrap();
        assert_eq!(
            space.idx_to_pos(16),
            Err(DataError::IndexOutOfRange { index: 16, len: 16 })
        );
        assert_eq!(
            space.pos_to_idx(&[0, 4]),
            Err(DataError::FactorOutOfRange { factor: 1, value: 4, size: 4 })
        );
        assert!(matches!(space.pos_to_idx(&[0]), Err(DataError::WrongNumFactors { .. })));
    }

    #[test]
    fn test_factor_names() {
        let space = StateSpace::new([3, 2]).unwrap();
        assert_eq!(space.factor_names(), ["factor_0", "factor_1"]);

        let named = space
            .clone()
            .with_names(vec!["shape".to_string(), "color".to_string()])
            .unwrap();
        assert_eq!(named.factor_names(), ["shape", "color"]);

        assert_eq!(
            space.with_names(vec!["shape".to_string()]),
            Err(DataError::WrongNumFactors { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_batch_conversions() {
        let space = StateSpace::new([2, 3]).unwrap();
        let positions = space.idx_to_pos_batch(&[0, 4, 5]).unwrap();
        assert_eq!(positions, [vec![0, 0], vec![1, 1], vec![1, 2]]);
        assert_eq!(space.pos_to_idx_batch(&positions).unwrap(), [0, 4, 5]);

        // the first bad element fails the whole batch
        assert!(space.idx_to_pos_batch(&[1, 6]).is_err());
        assert!(space.pos_to_idx_batch(&[vec![0, 0], vec![2, 0]]).is_err());
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(StateSpace::new(Vec::<usize>::new()).is_err());
        assert!(StateSpace::new([3, 0]).is_err());
    }

    #[test]
    fn test_sampling_stays_in_range() {
        let space = StateSpace::new([3, 5, 1]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let pos = space.sample_factors(&mut rng);
            assert!(space.pos_to_idx(&pos).is_ok());
            assert!(space.sample_index(&mut rng) < space.len());
        }
    }
}
