use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::fields::CoefficientField;
use crate::Index;

use super::pool::{Handle, Pool};
use super::{Cell, CellObserver, Column};

/// Cells allocated in a per-column pool and ordered through a row index.
/// Values are updated in their pool slot, only insertions and removals touch the index.
#[derive(Clone)]
pub struct IntrusiveSetColumn<F: CoefficientField> {
    pool: Pool<Cell<F::Coefficient>>,
    by_row: BTreeMap<Index, Handle>,
}

impl<F: CoefficientField> Debug for IntrusiveSetColumn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.by_row.values().map(|&handle| &self.pool[handle]))
            .finish()
    }
}

impl<F: CoefficientField> IntrusiveSetColumn<F> {
    fn last(&self) -> Option<&Cell<F::Coefficient>> {
        let (_, &handle) = self.by_row.last_key_value()?;
        Some(&self.pool[handle])
    }
}

impl<F: CoefficientField> Column<F> for IntrusiveSetColumn<F> {
    fn from_cells(_field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        let mut pool = Pool::with_capacity(cells.len());
        let by_row = cells
            .into_iter()
            .map(|cell| (cell.row, pool.insert(cell)))
            .collect();
        Self { pool, by_row }
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.by_row
            .values()
            .map(|&handle| self.pool[handle].clone())
            .collect()
    }

    fn pivot(&self) -> Option<Index> {
        self.last().map(|cell| cell.row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.last().map(|cell| cell.value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        let &handle = self.by_row.get(&row)?;
        Some(self.pool[handle].value.clone())
    }

    fn len(&self) -> usize {
        self.by_row.len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        for row in std::mem::take(&mut self.by_row).into_keys() {
            observer.removed(row);
        }
        self.pool.clear();
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        let Some(handle) = self.by_row.remove(&row) else {
            return false;
        };
        self.pool.remove(handle);
        observer.removed(row);
        true
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        for &handle in self.by_row.values() {
            let cell = &mut self.pool[handle];
            cell.row = map(cell.row);
        }
        self.by_row = self
            .by_row
            .values()
            .map(|&handle| (self.pool[handle].row, handle))
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
            match self.by_row.entry(cell.row) {
                Entry::Vacant(entry) => {
                    entry.insert(self.pool.insert(Cell::new(cell.row, scaled)));
                    observer.inserted(cell.row);
                }
                Entry::Occupied(entry) => {
                    let handle = *entry.get();
                    match field.add(&self.pool[handle].value, &scaled) {
                        Some(sum) => self.pool[handle].value = sum,
                        None => {
                            entry.remove();
                            self.pool.remove(handle);
                            observer.removed(cell.row);
                        }
                    }
                }
            }
        }
    }

    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O) {
        if field.is_one(factor) {
            return;
        }
        let pool = &mut self.pool;
        self.by_row.retain(|&row, &mut handle| {
            let cell = &mut pool[handle];
            match field.multiply(&cell.value, factor) {
                Some(product) => {
                    cell.value = product;
                    true
                }
                None => {
                    pool.remove(handle);
                    observer.removed(row);
                    false
                }
            }
        });
    }
}

impl_lexicographic_order!(IntrusiveSetColumn);
