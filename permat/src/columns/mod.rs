//! Sparse matrix columns, i.e. linear combinations of rows with a leading term (the pivot).
//!
//! Every backing keeps the same contract: cells are strictly increasing by row,
//! no row appears twice and no stored value is zero.
//! The backings differ only in how cells are laid out in memory:
//!
//! | Type | Storage |
//! | --- | --- |
//! | [`VectorColumn`] | sorted `Vec`, rebuilt by a sorted merge |
//! | [`ListColumn`] | `LinkedList`, rebuilt by a sorted merge |
//! | [`SetColumn`] | `BTreeMap` keyed by row, updated in place |
//! | [`HeapColumn`] | binary heap with lazily cancelled duplicates |
//! | [`IntrusiveListColumn`] | pool-allocated doubly linked list, `O(1)` unlink |
//! | [`IntrusiveSetColumn`] | pool-allocated cells indexed by a row map |
//!
//! Mutations report inserted and removed rows to a [`CellObserver`],
//! which is how matrices with row access keep their row view in sync.

// ======== Lexicographic order ================================

/// Columns compare as their sequences of `(row, value)` pairs.
macro_rules! impl_lexicographic_order {
    ($column:ident) => {
        impl<F: $crate::fields::CoefficientField> PartialEq for $column<F> {
            fn eq(&self, other: &Self) -> bool {
                $crate::columns::Column::<F>::cells(self) == $crate::columns::Column::<F>::cells(other)
            }
        }

        impl<F: $crate::fields::CoefficientField> Eq for $column<F> {}

        impl<F: $crate::fields::CoefficientField> PartialOrd for $column<F> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<F: $crate::fields::CoefficientField> Ord for $column<F> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                $crate::columns::Column::<F>::cells(self)
                    .cmp(&$crate::columns::Column::<F>::cells(other))
            }
        }
    };
}

mod chain;
mod heap;
mod intrusive_list;
mod intrusive_set;
mod list;
mod pool;
mod set;
mod vector;

#[cfg(test)]
mod tests;

pub use chain::ChainColumn;
pub use heap::HeapColumn;
pub use intrusive_list::IntrusiveListColumn;
pub use intrusive_set::IntrusiveSetColumn;
pub use list::ListColumn;
pub use set::SetColumn;
pub use vector::VectorColumn;

use std::fmt::Debug;

use itertools::{EitherOrBoth, Itertools};

use crate::fields::CoefficientField;
use crate::Index;

// ======== Cells ==============================================

/// A non-zero entry of a column.
/// Ordered by row first, so sorting cells sorts them by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell<C> {
    pub row: Index,
    pub value: C,
}

impl<C> Cell<C> {
    pub fn new(row: Index, value: C) -> Self {
        Self { row, value }
    }
}

impl<C> From<(Index, C)> for Cell<C> {
    fn from((row, value): (Index, C)) -> Self {
        Self { row, value }
    }
}

impl<C> From<Cell<C>> for (Index, C) {
    fn from(cell: Cell<C>) -> Self {
        (cell.row, cell.value)
    }
}

/// Notified whenever a row appears in, or disappears from, a column.
pub trait CellObserver {
    fn inserted(&mut self, row: Index);
    fn removed(&mut self, row: Index);
    /// When `false`, columns may skip the work of computing events.
    fn is_tracking(&self) -> bool {
        true
    }
}

impl CellObserver for () {
    fn inserted(&mut self, _row: Index) {}

    fn removed(&mut self, _row: Index) {}

    fn is_tracking(&self) -> bool {
        false
    }
}

// ======== Column contract ====================================

pub trait Column<F: CoefficientField>: Clone + Debug {
    /// `cells` must already be normalised, see [`normalize`].
    fn from_cells(field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self;

    /// All non-zero cells, by increasing row.
    fn cells(&self) -> Vec<Cell<F::Coefficient>>;

    /// Largest row with a non-zero value.
    fn pivot(&self) -> Option<Index>;

    fn pivot_value(&self) -> Option<F::Coefficient>;

    fn value_at(&self, row: Index) -> Option<F::Coefficient>;

    fn len(&self) -> usize;

    fn clear<O: CellObserver>(&mut self, observer: &mut O);

    /// Returns whether a cell was removed.
    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool;

    /// Relabels every row through `map`, which must be injective on the rows present.
    fn reorder(&mut self, map: impl Fn(Index) -> Index);

    /// `self += factor * other`, where `other` is normalised.
    fn add_scaled<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        factor: &F::Coefficient,
        observer: &mut O,
    );

    /// `self *= factor`. Over a multi-field some cells may vanish.
    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O);

    fn empty(field: &F) -> Self {
        Self::from_cells(field, vec![])
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_non_zero(&self, row: Index) -> bool {
        self.value_at(row).is_some()
    }

    fn rows(&self) -> Vec<Index> {
        self.cells().into_iter().map(|cell| cell.row).collect()
    }

    /// `self += other`, returns whether the row of the previous pivot was zeroed.
    fn add<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        observer: &mut O,
    ) -> bool {
        let pivot = self.pivot();
        self.add_scaled(field, other, &field.one(), observer);
        pivot.is_some_and(|pivot| !self.is_non_zero(pivot))
    }

    /// `self = value * self + other`, a zero `value` discards the current cells.
    fn multiply_and_add<O: CellObserver>(
        &mut self,
        field: &F,
        value: Option<&F::Coefficient>,
        other: &[Cell<F::Coefficient>],
        observer: &mut O,
    ) {
        match value {
            Some(value) => self.scale(field, value, observer),
            None => self.clear(observer),
        }
        self.add_scaled(field, other, &field.one(), observer);
    }

    /// `self += other * value`.
    fn multiply_and_add_scaled<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        value: Option<&F::Coefficient>,
        observer: &mut O,
    ) {
        if let Some(value) = value {
            self.add_scaled(field, other, value, observer);
        }
    }
}

/// Sorts `cells` by row, sums duplicated rows and drops the cells that cancel.
pub fn normalize<F: CoefficientField>(
    field: &F,
    mut cells: Vec<Cell<F::Coefficient>>,
) -> Vec<Cell<F::Coefficient>> {
    cells.sort_by_key(|cell| cell.row);
    let mut normalized: Vec<Cell<F::Coefficient>> = Vec::with_capacity(cells.len());
    let mut pending: Option<(Index, Option<F::Coefficient>)> = None;
    for cell in cells {
        if let Some((row, sum)) = &mut pending {
            if *row == cell.row {
                *sum = field.add_options(sum.as_ref(), Some(&cell.value));
                continue;
            }
        }
        if let Some((row, Some(sum))) = pending.take() {
            normalized.push(Cell::new(row, sum));
        }
        pending = Some((cell.row, Some(cell.value)));
    }
    if let Some((row, Some(sum))) = pending {
        normalized.push(Cell::new(row, sum));
    }
    normalized
}

/// Sorted merge of `lhs + factor * rhs`, used by the backings that rebuild on addition.
pub(crate) fn merge_scaled<F, O, B>(
    field: &F,
    lhs: impl IntoIterator<Item = Cell<F::Coefficient>>,
    rhs: &[Cell<F::Coefficient>],
    factor: &F::Coefficient,
    observer: &mut O,
) -> B
where
    F: CoefficientField,
    O: CellObserver,
    B: FromIterator<Cell<F::Coefficient>>,
{
    lhs.into_iter()
        .merge_join_by(rhs, |cell, other| cell.row.cmp(&other.row))
        .filter_map(|entry| match entry {
            EitherOrBoth::Left(cell) => Some(cell),
            EitherOrBoth::Right(other) => {
                let value = field.multiply(&other.value, factor)?;
                observer.inserted(other.row);
                Some(Cell::new(other.row, value))
            }
            EitherOrBoth::Both(cell, other) => {
                let scaled = field.multiply(&other.value, factor);
                match field.add_options(Some(&cell.value), scaled.as_ref()) {
                    Some(value) => Some(Cell::new(cell.row, value)),
                    None => {
                        observer.removed(cell.row);
                        None
                    }
                }
            }
        })
        .collect()
}

/// Multiplies every cell by `factor`, dropping (and reporting) the ones that vanish.
pub(crate) fn scale_cells<'a, F, O>(
    field: &F,
    cells: impl Iterator<Item = &'a mut Cell<F::Coefficient>>,
    factor: &F::Coefficient,
    observer: &mut O,
) -> Vec<Index>
where
    F: CoefficientField,
    F::Coefficient: 'a,
    O: CellObserver,
{
    let mut vanished = vec![];
    for cell in cells {
        match field.multiply(&cell.value, factor) {
            Some(value) => cell.value = value,
            None => {
                observer.removed(cell.row);
                vanished.push(cell.row);
            }
        }
    }
    vanished
}

// ======== Boundaries =========================================

/// Anything that can be turned into the normalised cells of a column.
pub trait IntoBoundary<F: CoefficientField> {
    fn into_cells(self, field: &F) -> Vec<Cell<F::Coefficient>>;
}

/// Every listed row gets coefficient one.
impl<F: CoefficientField> IntoBoundary<F> for Vec<Index> {
    fn into_cells(self, field: &F) -> Vec<Cell<F::Coefficient>> {
        self.as_slice().into_cells(field)
    }
}

impl<F: CoefficientField> IntoBoundary<F> for &[Index] {
    fn into_cells(self, field: &F) -> Vec<Cell<F::Coefficient>> {
        let cells = self.iter().map(|&row| Cell::new(row, field.one())).collect();
        normalize(field, cells)
    }
}

/// Integer coefficients, reduced modulo the characteristic.
impl<F: CoefficientField> IntoBoundary<F> for Vec<(Index, u64)> {
    fn into_cells(self, field: &F) -> Vec<Cell<F::Coefficient>> {
        let cells = self
            .into_iter()
            .filter_map(|(row, value)| Some(Cell::new(row, field.from_integer(value)?)))
            .collect();
        normalize(field, cells)
    }
}

impl<F: CoefficientField> IntoBoundary<F> for Vec<Cell<F::Coefficient>> {
    fn into_cells(self, field: &F) -> Vec<Cell<F::Coefficient>> {
        normalize(field, self)
    }
}
