use std::marker::PhantomData;

use crate::fields::CoefficientField;
use crate::{Dimension, Index, PermatError};

use super::{Cell, CellObserver, Column};

/// A column of a chain matrix: a chain whose pivot names the face it represents.
///
/// Unlike boundary columns the pivot is stored, not read off the largest row,
/// and the chain must never become empty.
/// Whenever an addition cancels the pivot row, the two columns exchange pivots.
#[derive(Debug, Clone)]
pub struct ChainColumn<F: CoefficientField, Col: Column<F>> {
    column: Col,
    pivot: Index,
    paired_with: Option<Index>,
    dimension: Dimension,
    _field: PhantomData<F>,
}

impl<F: CoefficientField, Col: Column<F>> ChainColumn<F, Col> {
    /// `cells` must be normalised and contain `pivot`.
    pub fn new(
        field: &F,
        cells: Vec<Cell<F::Coefficient>>,
        pivot: Index,
        dimension: Dimension,
    ) -> Self {
        debug_assert!(cells.iter().any(|cell| cell.row == pivot));
        Self {
            column: Col::from_cells(field, cells),
            pivot,
            paired_with: None,
            dimension,
            _field: PhantomData,
        }
    }

    pub fn column(&self) -> &Col {
        &self.column
    }

    pub fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.column.cells()
    }

    pub fn pivot(&self) -> Index {
        self.pivot
    }

    pub fn pivot_value(&self) -> Option<F::Coefficient> {
        self.column.value_at(self.pivot)
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn paired_with(&self) -> Option<Index> {
        self.paired_with
    }

    pub fn is_paired(&self) -> bool {
        self.paired_with.is_some()
    }

    pub fn set_paired_with(&mut self, column: Option<Index>) {
        self.paired_with = column;
    }

    pub fn is_non_zero(&self, row: Index) -> bool {
        self.column.is_non_zero(row)
    }

    pub fn swap_pivots(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.pivot, &mut other.pivot);
        std::mem::swap(&mut self.dimension, &mut other.dimension);
    }

    /// Removes the cell of `row`, which must not be the pivot.
    pub fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        debug_assert_ne!(row, self.pivot);
        self.column.clear_row(row, observer)
    }

    /// `self += source`, exchanging pivots if this cancels the pivot of `self`.
    /// Returns whether the pivots were exchanged.
    pub fn add<O: CellObserver>(&mut self, field: &F, source: &mut Self, observer: &mut O) -> bool {
        let cells = source.cells();
        self.column.add_scaled(field, &cells, &field.one(), observer);
        self.exchange_pivot_if_cancelled(source)
    }

    /// `self *= value`, fails if `value` is zero or annihilates the pivot.
    pub fn scale<O: CellObserver>(
        &mut self,
        field: &F,
        value: Option<&F::Coefficient>,
        observer: &mut O,
    ) -> Result<(), PermatError> {
        let Some(value) = value else {
            return Err(PermatError::ZeroChainMultiplier(self.pivot));
        };
        let scaled_pivot = self
            .pivot_value()
            .and_then(|pivot_value| field.multiply(&pivot_value, value));
        if scaled_pivot.is_none() {
            return Err(PermatError::ZeroChainMultiplier(self.pivot));
        }
        self.column.scale(field, value, observer);
        Ok(())
    }

    /// `self = value * self + source`, fails if `value` is zero or annihilates the pivot.
    pub fn multiply_target_and_add<O: CellObserver>(
        &mut self,
        field: &F,
        value: Option<&F::Coefficient>,
        source: &mut Self,
        observer: &mut O,
    ) -> Result<bool, PermatError> {
        self.scale(field, value, observer)?;
        Ok(self.add(field, source, observer))
    }

    /// `self += value * source`, a zero `value` leaves `self` untouched.
    pub fn multiply_source_and_add<O: CellObserver>(
        &mut self,
        field: &F,
        source: &mut Self,
        value: Option<&F::Coefficient>,
        observer: &mut O,
    ) -> bool {
        let Some(value) = value else {
            return false;
        };
        let cells = source.cells();
        self.column.add_scaled(field, &cells, value, observer);
        self.exchange_pivot_if_cancelled(source)
    }

    fn exchange_pivot_if_cancelled(&mut self, source: &mut Self) -> bool {
        if self.column.is_non_zero(self.pivot) {
            return false;
        }
        self.swap_pivots(source);
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::columns::{Cell, ChainColumn, Column, VectorColumn};
    use crate::fields::{NonZeroCoefficient, Z2Field, ZpField, Z2, Z5};
    use crate::PermatError;

    type Z2Chain = ChainColumn<Z2Field, VectorColumn<Z2Field>>;

    fn z2_chain(rows: &[usize], pivot: usize) -> Z2Chain {
        let cells = rows.iter().map(|&row| Cell::new(row, Z2)).collect();
        ChainColumn::new(&Z2Field::new(), cells, pivot, 1)
    }

    #[test]
    fn test_cancelled_pivot_is_exchanged() {
        let field = Z2Field::new();
        let mut target = z2_chain(&[0, 1, 2], 2);
        let mut source = z2_chain(&[2, 3], 3);

        assert!(target.add(&field, &mut source, &mut ()));
        assert_eq!(target.pivot(), 3);
        assert_eq!(source.pivot(), 2);
        assert_eq!(target.column().rows(), vec![0, 1, 3]);
    }

    #[test]
    fn test_pivot_kept_when_not_cancelled() {
        let field = Z2Field::new();
        let mut target = z2_chain(&[0, 4], 4);
        let mut source = z2_chain(&[0, 1], 1);

        assert!(!target.add(&field, &mut source, &mut ()));
        assert_eq!(target.pivot(), 4);
        assert_eq!(target.column().rows(), vec![1, 4]);
    }

    #[test]
    fn test_zero_multiplier_is_rejected() {
        let field = ZpField::<5>::new();
        let one = Z5::one();
        let mut target =
            ChainColumn::<_, VectorColumn<_>>::new(&field, vec![Cell::new(3, one)], 3, 0);
        let mut source = target.clone();

        assert_eq!(
            target.multiply_target_and_add(&field, None, &mut source, &mut ()),
            Err(PermatError::ZeroChainMultiplier(3))
        );
        // 4 * x + x = 0 (mod 5), so the pivots are exchanged
        let four = Z5::from_integer(4).unwrap();
        assert_eq!(
            target.multiply_target_and_add(&field, Some(&four), &mut source, &mut ()),
            Ok(true)
        );
        assert!(!target.multiply_source_and_add(&field, &mut source, None, &mut ()));
    }
}
