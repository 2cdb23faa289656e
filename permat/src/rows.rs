//! Optional row view of a matrix.
//!
//! A matrix is generic over [`RowAccess`]: [`NoRows`] stores nothing and costs nothing,
//! [`Rows`] keeps, for every row, the set of columns with a non-zero cell in that row.
//! Columns report their changes through [`RowObserver`], so both views always agree.

use std::collections::BTreeSet;
use std::fmt::Debug;

use rustc_hash::FxHashMap;

use crate::columns::CellObserver;
use crate::Index;

pub trait RowAccess: Clone + Debug + Default {
    const TRACKING: bool;

    fn link(&mut self, row: Index, column: Index);
    fn unlink(&mut self, row: Index, column: Index);
    /// Exchanges the contents of two rows.
    fn swap_rows(&mut self, first: Index, second: Index);
    /// Renames every column `c` of every row to `map(c)`.
    fn relabel_columns(&mut self, map: impl Fn(Index) -> Index);
    /// Renames every row `r` to `map(r)`.
    fn relabel_rows(&mut self, map: impl Fn(Index) -> Index);
    fn erase_row(&mut self, row: Index);

    fn observer(&mut self, column: Index) -> RowObserver<'_, Self> {
        RowObserver { rows: self, column }
    }
}

/// Disabled row access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRows;

impl RowAccess for NoRows {
    const TRACKING: bool = false;

    fn link(&mut self, _row: Index, _column: Index) {}

    fn unlink(&mut self, _row: Index, _column: Index) {}

    fn swap_rows(&mut self, _first: Index, _second: Index) {}

    fn relabel_columns(&mut self, _map: impl Fn(Index) -> Index) {}

    fn relabel_rows(&mut self, _map: impl Fn(Index) -> Index) {}

    fn erase_row(&mut self, _row: Index) {}
}

/// For each row, the columns with a non-zero cell in it, in increasing order.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    rows: FxHashMap<Index, BTreeSet<Index>>,
}

impl Rows {
    pub fn row(&self, row: Index) -> impl Iterator<Item = Index> + '_ {
        self.rows.get(&row).into_iter().flatten().copied()
    }

    pub fn is_row_empty(&self, row: Index) -> bool {
        self.rows.get(&row).map_or(true, BTreeSet::is_empty)
    }
}

impl RowAccess for Rows {
    const TRACKING: bool = true;

    fn link(&mut self, row: Index, column: Index) {
        self.rows.entry(row).or_default().insert(column);
    }

    fn unlink(&mut self, row: Index, column: Index) {
        if let Some(columns) = self.rows.get_mut(&row) {
            columns.remove(&column);
        }
    }

    fn swap_rows(&mut self, first: Index, second: Index) {
        let first_columns = self.rows.remove(&first);
        let second_columns = self.rows.remove(&second);
        if let Some(columns) = first_columns {
            self.rows.insert(second, columns);
        }
        if let Some(columns) = second_columns {
            self.rows.insert(first, columns);
        }
    }

    fn relabel_columns(&mut self, map: impl Fn(Index) -> Index) {
        for columns in self.rows.values_mut() {
            *columns = columns.iter().map(|&column| map(column)).collect();
        }
    }

    fn relabel_rows(&mut self, map: impl Fn(Index) -> Index) {
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .map(|(row, columns)| (map(row), columns))
            .collect();
    }

    fn erase_row(&mut self, row: Index) {
        self.rows.remove(&row);
    }
}

/// Forwards the cell events of one column to the row view.
pub struct RowObserver<'a, R: RowAccess> {
    rows: &'a mut R,
    column: Index,
}

impl<'a, R: RowAccess> CellObserver for RowObserver<'a, R> {
    fn inserted(&mut self, row: Index) {
        self.rows.link(row, self.column);
    }

    fn removed(&mut self, row: Index) {
        self.rows.unlink(row, self.column);
    }

    fn is_tracking(&self) -> bool {
        R::TRACKING
    }
}

#[cfg(test)]
mod tests {
    use crate::columns::{Column, IntoBoundary, VectorColumn};
    use crate::fields::Z2Field;
    use crate::Index;

    use super::{RowAccess, Rows};

    #[test]
    fn test_observer_links_cells() {
        let field = Z2Field::new();
        let mut rows = Rows::default();
        let mut column: VectorColumn<Z2Field> = Column::empty(&field);
        let boundary: Vec<Index> = vec![0, 2];
        column.add(&field, &boundary.into_cells(&field), &mut rows.observer(3));
        assert_eq!(rows.row(2).collect::<Vec<_>>(), vec![3]);

        let boundary: Vec<Index> = vec![2];
        column.add(&field, &boundary.into_cells(&field), &mut rows.observer(3));
        assert!(rows.is_row_empty(2));
        assert_eq!(rows.row(0).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_swap_and_relabel() {
        let mut rows = Rows::default();
        rows.link(0, 5);
        rows.link(1, 6);
        rows.link(1, 7);
        rows.swap_rows(0, 1);
        assert_eq!(rows.row(0).collect::<Vec<_>>(), vec![6, 7]);
        assert_eq!(rows.row(1).collect::<Vec<_>>(), vec![5]);

        rows.relabel_columns(|column| column - 5);
        rows.relabel_rows(|row| row + 10);
        assert_eq!(rows.row(10).collect::<Vec<_>>(), vec![1, 2]);
        assert!(rows.is_row_empty(0));

        rows.erase_row(10);
        assert!(rows.is_row_empty(10));
    }
}
