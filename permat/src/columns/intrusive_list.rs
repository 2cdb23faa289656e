use std::fmt::Debug;

use crate::fields::CoefficientField;
use crate::Index;

use super::pool::{Handle, Pool};
use super::{Cell, CellObserver, Column};

#[derive(Debug, Clone)]
struct Node<C> {
    cell: Cell<C>,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Doubly linked list of cells living in a per-column pool.
/// Additions walk both columns once and splice cells in place,
/// removing a cell only relinks its neighbours.
#[derive(Clone)]
pub struct IntrusiveListColumn<F: CoefficientField> {
    pool: Pool<Node<F::Coefficient>>,
    head: Option<Handle>,
    tail: Option<Handle>,
}

impl<F: CoefficientField> Debug for IntrusiveListColumn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<F: CoefficientField> IntrusiveListColumn<F> {
    fn iter(&self) -> impl Iterator<Item = &Cell<F::Coefficient>> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = &self.pool[cursor?];
            cursor = node.next;
            Some(&node.cell)
        })
    }

    fn find(&self, row: Index) -> Option<Handle> {
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let node = &self.pool[handle];
            if node.cell.row >= row {
                return (node.cell.row == row).then_some(handle);
            }
            cursor = node.next;
        }
        None
    }

    /// Links `cell` just before `position`, or at the back when `position` is `None`.
    fn insert_before(&mut self, position: Option<Handle>, cell: Cell<F::Coefficient>) -> Handle {
        let prev = match position {
            Some(next) => self.pool[next].prev,
            None => self.tail,
        };
        let handle = self.pool.insert(Node {
            cell,
            prev,
            next: position,
        });
        match prev {
            Some(prev) => self.pool[prev].next = Some(handle),
            None => self.head = Some(handle),
        }
        match position {
            Some(next) => self.pool[next].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        handle
    }

    fn unlink(&mut self, handle: Handle) -> Option<Cell<F::Coefficient>> {
        let node = self.pool.remove(handle)?;
        match node.prev {
            Some(prev) => self.pool[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.pool[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.cell)
    }

    fn rebuild(&mut self, cells: Vec<Cell<F::Coefficient>>) {
        self.pool = Pool::with_capacity(cells.len());
        self.head = None;
        self.tail = None;
        for cell in cells {
            self.insert_before(None, cell);
        }
    }
}

impl<F: CoefficientField> Column<F> for IntrusiveListColumn<F> {
    fn from_cells(_field: &F, cells: Vec<Cell<F::Coefficient>>) -> Self {
        let mut column = Self {
            pool: Pool::default(),
            head: None,
            tail: None,
        };
        column.rebuild(cells);
        column
    }

    fn cells(&self) -> Vec<Cell<F::Coefficient>> {
        self.iter().cloned().collect()
    }

    fn pivot(&self) -> Option<Index> {
        self.tail.map(|tail| self.pool[tail].cell.row)
    }

    fn pivot_value(&self) -> Option<F::Coefficient> {
        self.tail.map(|tail| self.pool[tail].cell.value.clone())
    }

    fn value_at(&self, row: Index) -> Option<F::Coefficient> {
        self.find(row).map(|handle| self.pool[handle].cell.value.clone())
    }

    fn len(&self) -> usize {
        self.pool.len()
    }

    fn clear<O: CellObserver>(&mut self, observer: &mut O) {
        for cell in self.iter() {
            observer.removed(cell.row);
        }
        self.pool.clear();
        self.head = None;
        self.tail = None;
    }

    fn clear_row<O: CellObserver>(&mut self, row: Index, observer: &mut O) -> bool {
        let Some(handle) = self.find(row) else {
            return false;
        };
        self.unlink(handle);
        observer.removed(row);
        true
    }

    fn reorder(&mut self, map: impl Fn(Index) -> Index) {
        let mut cells: Vec<_> = self
            .iter()
            .map(|cell| Cell::new(map(cell.row), cell.value.clone()))
            .collect();
        cells.sort_by_key(|cell| cell.row);
        self.rebuild(cells);
    }

    fn add_scaled<O: CellObserver>(
        &mut self,
        field: &F,
        other: &[Cell<F::Coefficient>],
        factor: &F::Coefficient,
        observer: &mut O,
    ) {
        let mut cursor = self.head;
        for cell in other {
            let Some(scaled) = field.multiply(&cell.value, factor) else {
                continue;
            };
            while let Some(handle) = cursor {
                let node = &self.pool[handle];
                if node.cell.row >= cell.row {
                    break;
                }
                cursor = node.next;
            }

            match cursor {
                Some(handle) if self.pool[handle].cell.row == cell.row => {
                    let node = &mut self.pool[handle];
                    match field.add(&node.cell.value, &scaled) {
                        Some(sum) => node.cell.value = sum,
                        None => {
                            cursor = node.next;
                            self.unlink(handle);
                            observer.removed(cell.row);
                        }
                    }
                }
                _ => {
                    self.insert_before(cursor, Cell::new(cell.row, scaled));
                    observer.inserted(cell.row);
                }
            }
        }
    }

    fn scale<O: CellObserver>(&mut self, field: &F, factor: &F::Coefficient, observer: &mut O) {
        if field.is_one(factor) {
            return;
        }
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let node = &mut self.pool[handle];
            cursor = node.next;
            match field.multiply(&node.cell.value, factor) {
                Some(product) => node.cell.value = product,
                None => {
                    let row = node.cell.row;
                    self.unlink(handle);
                    observer.removed(row);
                }
            }
        }
    }
}

impl_lexicographic_order!(IntrusiveListColumn);
