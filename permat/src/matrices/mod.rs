//! The three matrix representations.
//!
//! * [`BaseMatrix`] stores boundary columns as given and reduces them on demand.
//! * [`RuMatrix`] keeps a reduced matrix `R` and a change of basis `U` with `D = R * U`.
//! * [`ChainMatrix`] keeps a basis of chains, split into paired and essential chains.
//!
//! The last two keep their barcode current through insertions and removals, and over `Z2`
//! through vine swaps. [`IdToIndexOverlay`] addresses either of them by face identifier.

mod base;
mod chain;
mod overlay;
mod ru;

pub use base::BaseMatrix;
pub use chain::ChainMatrix;
pub use overlay::IdToIndexOverlay;
pub use ru::RuMatrix;

use crate::barcode::Bar;
use crate::columns::{Cell, IntoBoundary};
use crate::fields::CoefficientField;
use crate::{Dimension, Index, PermatError};

// ======== Common interface ===================================

/// What a filtration front-end needs from any representation.
pub trait PersistenceMatrix<F: CoefficientField> {
    /// Appends the next face of the filtration and returns its position.
    /// Without an explicit dimension, a face with `k + 1` boundary cells has dimension `k`.
    fn insert_face<B: IntoBoundary<F>>(
        &mut self,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError>;

    fn number_of_columns(&self) -> usize;

    fn max_dimension(&self) -> Option<Dimension>;

    /// Bars between filtration positions.
    fn barcode(&mut self) -> Result<Vec<Bar>, PermatError>;
}

pub(crate) fn default_dimension<C>(cells: &[Cell<C>], dimension: Option<Dimension>) -> Dimension {
    dimension.unwrap_or_else(|| cells.len().saturating_sub(1))
}

// ======== Dimension bookkeeping ==============================

/// Number of columns per dimension, so the maximal dimension survives removals.
#[derive(Debug, Clone, Default)]
pub struct DimensionTracker {
    counts: Vec<usize>,
}

impl DimensionTracker {
    pub fn add(&mut self, dimension: Dimension) {
        if self.counts.len() <= dimension {
            self.counts.resize(dimension + 1, 0);
        }
        self.counts[dimension] += 1;
    }

    pub fn remove(&mut self, dimension: Dimension) {
        if let Some(count) = self.counts.get_mut(dimension) {
            *count = count.saturating_sub(1);
        }
        while self.counts.last() == Some(&0) {
            self.counts.pop();
        }
    }

    pub fn max_dimension(&self) -> Option<Dimension> {
        self.counts.len().checked_sub(1)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod dimension_tests {
    use super::DimensionTracker;

    #[test]
    fn test_max_dimension_under_removal() {
        let mut tracker = DimensionTracker::default();
        assert_eq!(tracker.max_dimension(), None);
        tracker.add(0);
        tracker.add(2);
        tracker.add(2);
        tracker.add(1);
        assert_eq!(tracker.max_dimension(), Some(2));
        tracker.remove(2);
        assert_eq!(tracker.max_dimension(), Some(2));
        tracker.remove(2);
        assert_eq!(tracker.max_dimension(), Some(1));
        tracker.remove(1);
        tracker.remove(0);
        assert_eq!(tracker.max_dimension(), None);
    }
}
