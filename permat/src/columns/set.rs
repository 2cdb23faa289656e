use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::fields::CoefficientField;
use crate::Index;

use super::{Cell, CellObserver, Column};

/// Cells in a `BTreeMap` from row to value, additions are applied cell by cell.
#[derive(Debug, Clone)]
pub struct SetColumn<F: CoefficientField> {
    cells: BTreeMap<Index, F::Coefficient>,
}

impl<F: CoefficientField> Column<F> for SetColumn<F> {
    fn from_cells(_field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        Self {
            cells: cells.into_iter().map(|cell| (cell.row, cell.value)).collect(),
        }
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.cells
            .iter()
            .map(|(&row, value)| Cell::new(row, value.clone()))
            .collect()
    }

    fn pivot(&self) -> Option<Index> {
        self.cells.last_key_value().map(|(&row, _)| row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.cells.last_key_value().map(|(_, value)| value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        self.cells.get(&row).cloned()
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        for row in std::mem::take(&mut self.cells).into_keys() {
            observer.removed(row);
        }
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        let removed = self.cells.remove(&row).is_some();
        if removed {
            observer.removed(row);
        }
        removed
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        self.cells = std::mem::take(&mut self.cells)
            .into_iter()
            .map(|(row, value)| (map(row), value))
            .collect();
    }

    fn add_scaled<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        factor: &F::Coefficient,
        observer: &mut O,
    ) {
        for cell in other {
            let Some(scaled) = field.multiply(&cell.value, factor) else {
                continue;
            };
            match self.cells.entry(cell.row) {
                Entry::Vacant(entry) => {
                    entry.insert(scaled);
                    observer.inserted(cell.row);
                }
                Entry::Occupied(mut entry) => match field.add(entry.get(), &scaled) {
                    Some(sum) => {
                        entry.insert(sum);
                    }
                    None => {
                        entry.remove();
                        observer.removed(cell.row);
                    }
                },
            }
        }
    }

    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O) {
        if field.is_one(factor) {
            return;
        }
        self.cells.retain(|&row, value| match field.multiply(value, factor) {
            Some(product) => {
                *value = product;
                true
            }
            None => {
                observer.removed(row);
                false
            }
        });
    }
}

impl_lexicographic_order!(SetColumn);
