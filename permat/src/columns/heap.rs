use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::iter::repeat;

use itertools::{EitherOrBoth, Itertools};

use crate::fields::CoefficientField;
use crate::Index;

use super::{Cell, CellObserver, Column};

const MINIMUM_PRUNE_SIZE: usize = 16;

/// Binary heap of cells where additions are pushed without merging.
/// Entries sharing a row are only summed when they reach the top of the heap,
/// so repeated additions during a reduction stay cheap.
///
/// The top of the heap is always consolidated, hence the pivot is exact.
#[derive(Clone)]
pub struct HeapColumn<F: CoefficientField> {
    heap: BinaryHeap<Cell<F::Coefficient>>,
    field: F,
    pruned_size: usize,
}

impl<F: CoefficientField> Debug for HeapColumn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(&self.heap).finish()
    }
}

impl<F: CoefficientField> HeapColumn<F> {
    /// Removes and returns the largest row with a non-zero sum.
    pub fn pop_pivot(&mut self) -> Option<Cell<F::Coefficient>> {
        // Pull out first entry
        let first_entry = self.heap.pop()?;
        let mut working_row = first_entry.row;
        let mut working_sum = Some(first_entry.value);

        loop {
            // No more elements, break and report pivot
            let Some(next_entry) = self.heap.peek() else {
                break;
            };

            // Check if next row is different
            if next_entry.row != working_row {
                if working_sum.is_some() {
                    // Found the largest row with non-zero coefficient
                    break;
                }
                // Otherwise we prepare to start adding the next largest row
                working_row = next_entry.row;
            }

            let Some(next_entry) = self.heap.pop() else {
                break;
            };
            working_sum = self
                .field
                .add_options(working_sum.as_ref(), Some(&next_entry.value));
        }

        working_sum.map(|value| Cell::new(working_row, value))
    }

    pub fn drain_sorted(&mut self) -> impl Iterator<Item = Cell<F::Coefficient>> + '_ {
        repeat(()).map_while(|()| self.pop_pivot())
    }

    fn consolidate_pivot(&mut self) {
        if let Some(pivot) = self.pop_pivot() {
            self.heap.push(pivot);
        }
    }

    fn prune(&mut self) {
        if self.heap.len() <= 2 * self.pruned_size.max(MINIMUM_PRUNE_SIZE) {
            return;
        }
        let cells: Vec<_> = self.drain_sorted().collect();
        self.pruned_size = cells.len();
        self.heap = cells.into();
    }

    fn report_difference<O: CellObserver>(
        before: &[Index],
        after: &[Index],
        observer: &mut O,
    ) {
        for entry in before.iter().merge_join_by(after, |lhs, rhs| lhs.cmp(rhs)) {
            match entry {
                EitherOrBoth::Left(&row) => observer.removed(row),
                EitherOrBoth::Right(&row) => observer.inserted(row),
                EitherOrBoth::Both(_, _) => {}
            }
        }
    }

    /// Runs `mutation`, then reports which rows appeared or vanished.
    fn tracked<O: CellObserver>(&mut self, observer: &mut O, mutation: impl FnOnce(&mut Self)) {
        if !observer.is_tracking() {
            mutation(self);
            self.consolidate_pivot();
            return;
        }
        let before = Column::<F>::rows(self);
        mutation(self);
        self.consolidate_pivot();
        let after = Column::<F>::rows(self);
        Self::report_difference(&before, &after, observer);
    }
}

impl<F: CoefficientField> Column<F> for HeapColumn<F> {
    fn from_cells(field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        Self {
            pruned_size: cells.len(),
            heap: cells.into(),
            field: field.clone(),
        }
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        let mut copy = self.clone();
        let mut cells: Vec<_> = copy.drain_sorted().collect();
        cells.reverse();
        cells
    }

    fn pivot(&self) -> Option<Index> {
        self.heap.peek().map(|cell| cell.row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.heap.peek().map(|cell| cell.value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        self.heap
            .iter()
            .filter(|cell| cell.row == row)
            .fold(None, |sum, cell| {
                self.field.add_options(sum.as_ref(), Some(&cell.value))
            })
    }

    fn len(&self) -> usize {
        self.cells().len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        if observer.is_tracking() {
            for row in Column::<F>::rows(self) {
                observer.removed(row);
            }
        }
        self.heap.clear();
        self.pruned_size = 0;
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        if !self.is_non_zero(row) {
            // Cancelled duplicates may still be stored
            self.heap.retain(|cell| cell.row != row);
            return false;
        }
        self.heap.retain(|cell| cell.row != row);
        self.consolidate_pivot();
        observer.removed(row);
        true
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        self.heap = std::mem::take(&mut self.heap)
            .into_iter()
            .map(|cell| Cell::new(map(cell.row), cell.value))
            .collect();
        self.consolidate_pivot();
    }

    fn add_scaled<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        factor: &F::Coefficient,
        observer: &mut O,
    ) {
        if other.is_empty() {
            return;
        }
        self.tracked(observer, |column| {
            column.heap.reserve(other.len());
            for cell in other {
                if let Some(value) = field.multiply(&cell.value, factor) {
                    column.heap.push(Cell::new(cell.row, value));
                }
            }
        });
        self.prune();
    }

    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O) {
        if field.is_one(factor) {
            return;
        }
        self.tracked(observer, |column| {
            column.heap = std::mem::take(&mut column.heap)
                .into_iter()
                .filter_map(|cell| Some(Cell::new(cell.row, field.multiply(&cell.value, factor)?)))
                .collect();
        });
    }
}

impl_lexicographic_order!(HeapColumn);

#[cfg(test)]
mod tests {
    use crate::columns::{Cell, Column, HeapColumn};
    use crate::fields::{NonZeroCoefficient, ZpField, Z3};

    #[test]
    fn test_pop_pivot_skips_cancelled_rows() {
        let field = ZpField::<3>::new();
        let one = Z3::one();
        let two = (one + one).unwrap();
        let mut column = HeapColumn::from_cells(&field, vec![Cell::new(1, one), Cell::new(4, one)]);
        column.add_scaled(&field, &[Cell::new(4, one), Cell::new(5, one)], &two, &mut ());

        // Row 4 cancels: 1 + 2 * 1 = 0 (mod 3)
        assert_eq!(column.pivot(), Some(5));
        assert_eq!(column.pop_pivot(), Some(Cell::new(5, two)));
        assert_eq!(column.pop_pivot(), Some(Cell::new(1, one)));
        assert_eq!(column.pop_pivot(), None);
    }

    #[test]
    fn test_pruning_keeps_sums() {
        let field = ZpField::<3>::new();
        let one = Z3::one();
        let mut column = HeapColumn::empty(&field);
        let other: Vec<_> = (0..10).map(|row| Cell::new(row, one)).collect();
        for _ in 0..7 {
            column.add_scaled(&field, &other, &one, &mut ());
        }
        // 7 = 1 (mod 3)
        assert_eq!(column.cells(), other);
        assert_eq!(column.len(), 10);
    }
}
