use std::collections::LinkedList;

use crate::fields::CoefficientField;
use crate::Index;

use super::{merge_scaled, scale_cells, Cell, CellObserver, Column};

/// Cells in a sorted `LinkedList`.
#[derive(Debug, Clone)]
pub struct ListColumn<F: CoefficientField> {
    cells: LinkedList<Cell<F::Coefficient>>,
}

impl<F: CoefficientField> Column<F> for ListColumn<F> {
    fn from_cells(_field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
        }
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.cells.iter().cloned().collect()
    }

    fn pivot(&self) -> Option<Index> {
        self.cells.back().map(|cell| cell.row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.cells.back().map(|cell| cell.value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        self.cells
            .iter()
            .take_while(|cell| cell.row <= row)
            .find(|cell| cell.row == row)
            .map(|cell| cell.value.clone())
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        while let Some(cell) = self.cells.pop_front() {
            observer.removed(cell.row);
        }
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        let before = self.cells.len();
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells.into_iter().filter(|cell| cell.row != row).collect();
        let removed = self.cells.len() != before;
        if removed {
            observer.removed(row);
        }
        removed
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        let mut cells: Vec<_> = std::mem::take(&mut self.cells)
            .into_iter()
            .map(|cell| Cell::new(map(cell.row), cell.value))
            .collect();
        cells.sort_by_key(|cell| cell.row);
        self.cells = cells.into_iter().collect();
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
        let cells = std::mem::take(&mut self.cells);
        self.cells = merge_scaled(field, cells, other, factor, observer);
    }

    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O) {
        if field.is_one(factor) {
            return;
        }
        let vanished = scale_cells(field, self.cells.iter_mut(), factor, observer);
        if !vanished.is_empty() {
            let cells = std::mem::take(&mut self.cells);
            self.cells = cells
                .into_iter()
                .filter(|cell| !vanished.contains(&cell.row))
                .collect();
        }
    }
}

impl_lexicographic_order!(ListColumn);
