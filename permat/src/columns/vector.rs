use crate::fields::CoefficientField;
use crate::Index;

use super::{merge_scaled, scale_cells, Cell, CellObserver, Column};

/// Cells in a sorted `Vec`, lookups are binary searches.
#[derive(Debug, Clone)]
pub struct VectorColumn<F: CoefficientField> {
    cells: Vec<Cell<F::Coefficient>>,
}

impl<F: CoefficientField> VectorColumn<F> {
    fn position(&self, row: Index) -> Result<usize, usize> {
        self.cells.binary_search_by_key(&row, |cell| cell.row)
    }
}

impl<F: CoefficientField> Column<F> for VectorColumn<F> {
    fn from_cells(_field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        Self { cells }
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.cells.clone()
    }

    fn pivot(&self) -> Option<Index> {
        self.cells.last().map(|cell| cell.row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.cells.last().map(|cell| cell.value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        let position = self.position(row).ok()?;
        Some(self.cells[position].value.clone())
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        for cell in self.cells.drain(..) {
            observer.removed(cell.row);
        }
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        let Ok(position) = self.position(row) else {
            return false;
        };
        self.cells.remove(position);
        observer.removed(row);
        true
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        for cell in self.cells.iter_mut() {
            cell.row = map(cell.row);
        }
        self.cells.sort_by_key(|cell| cell.row);
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
            self.cells.retain(|cell| !vanished.contains(&cell.row));
        }
    }
}

impl_lexicographic_order!(VectorColumn);
