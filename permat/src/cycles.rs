//! Representative cycles of the bars of a matrix.
//!
//! Cycles are a snapshot: matrices rebuild them in `update_representative_cycles`
//! and never touch them on mutation, so they go stale until the next update.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::columns::{Cell, Column};
use crate::fields::CoefficientField;
use crate::{Dimension, Index};

/// A cycle born at position `birth`, as a combination of faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<C> {
    pub birth: Index,
    pub dimension: Dimension,
    pub cells: Vec<Cell<C>>,
}

impl<C> Cycle<C> {
    pub fn faces(&self) -> impl Iterator<Item = Index> + '_ {
        self.cells.iter().map(|cell| cell.row)
    }
}

#[derive(Debug, Clone)]
pub struct RepresentativeCycles<C> {
    cycles: Vec<Cycle<C>>,
    by_birth: FxHashMap<Index, usize>,
}

impl<C> Default for RepresentativeCycles<C> {
    fn default() -> Self {
        Self {
            cycles: vec![],
            by_birth: FxHashMap::default(),
        }
    }
}

impl<C> RepresentativeCycles<C> {
    pub(crate) fn replace(&mut self, mut cycles: Vec<Cycle<C>>) {
        cycles.sort_by_key(|cycle| cycle.birth);
        self.by_birth = cycles
            .iter()
            .enumerate()
            .map(|(index, cycle)| (cycle.birth, index))
            .collect();
        self.cycles = cycles;
    }

    /// All cycles, by increasing birth.
    pub fn all(&self) -> &[Cycle<C>] {
        &self.cycles
    }

    pub fn born_at(&self, birth: Index) -> Option<&Cycle<C>> {
        self.by_birth.get(&birth).map(|&index| &self.cycles[index])
    }
}

/// Column `target` of `U^{-1}`, where `rows_of_u[k]` holds row `k` of the upper triangular `U`.
pub(crate) fn inverse_column<F, Col>(
    field: &F,
    rows_of_u: &[Col],
    target: Index,
) -> Vec<Cell<F::Coefficient>>
where
    F: CoefficientField,
    Col: Column<F>,
{
    let mut solution: BTreeMap<Index, F::Coefficient> = BTreeMap::new();
    for k in (0..=target).rev() {
        let right_hand_side = if k == target {
            Some(field.one())
        } else {
            rows_of_u[k]
                .cells()
                .into_iter()
                .filter(|cell| cell.row > k)
                .filter_map(|cell| field.multiply(&cell.value, solution.get(&cell.row)?))
                .fold(None, |sum, term| field.add_options(sum.as_ref(), Some(&term)))
                .map(|sum| field.additive_inverse(&sum))
        };
        // Diagonal entries of U are units
        let value = right_hand_side.and_then(|value| {
            let diagonal = field.inverse(&rows_of_u[k].value_at(k)?)?;
            field.multiply(&value, &diagonal)
        });
        if let Some(value) = value {
            solution.insert(k, value);
        }
    }
    solution.into_iter().map(Cell::from).collect()
}

#[cfg(test)]
mod tests {
    use crate::columns::{Cell, Column, IntoBoundary, VectorColumn};
    use crate::fields::{NonZeroCoefficient, ZpField, Z5};

    use super::{inverse_column, Cycle, RepresentativeCycles};

    #[test]
    fn test_inverse_of_unitriangular() {
        let field = ZpField::<5>::new();
        // U = [[1, 2, 0], [0, 1, 3], [0, 0, 1]], rows stored as columns
        let rows: Vec<VectorColumn<_>> = vec![
            vec![(0, 1), (1, 2)],
            vec![(1, 1), (2, 3)],
            vec![(2, 1)],
        ]
        .into_iter()
        .map(|row: Vec<(usize, u64)>| VectorColumn::from_cells(&field, row.into_cells(&field)))
        .collect();

        // U^{-1} e_2 = (6, -3, 1) = (1, 2, 1) mod 5
        let expected: Vec<Cell<Z5>> = vec![(0, 1), (1, 2), (2, 1)]
            .into_iter()
            .map(|(row, value)| Cell::new(row, Z5::from_integer(value).unwrap()))
            .collect();
        assert_eq!(inverse_column(&field, &rows, 2), expected);
        assert_eq!(
            inverse_column(&field, &rows, 0),
            vec![Cell::new(0, Z5::one())]
        );
    }

    #[test]
    fn test_inverse_with_scaled_diagonal() {
        let field = ZpField::<5>::new();
        // U = [[1, 1], [0, 2]], so U^{-1} e_1 = (-3, 3) = (2, 3) mod 5
        let rows: Vec<VectorColumn<_>> = vec![vec![(0, 1), (1, 1)], vec![(1, 2)]]
            .into_iter()
            .map(|row: Vec<(usize, u64)>| VectorColumn::from_cells(&field, row.into_cells(&field)))
            .collect();
        let expected: Vec<Cell<Z5>> = vec![(0, 2), (1, 3)]
            .into_iter()
            .map(|(row, value)| Cell::new(row, Z5::from_integer(value).unwrap()))
            .collect();
        assert_eq!(inverse_column(&field, &rows, 1), expected);
    }

    #[test]
    fn test_cycles_by_birth() {
        let mut cycles = RepresentativeCycles::default();
        cycles.replace(vec![
            Cycle {
                birth: 5,
                dimension: 1,
                cells: vec![Cell::new(3, ()), Cell::new(4, ())],
            },
            Cycle {
                birth: 0,
                dimension: 0,
                cells: vec![Cell::new(0, ())],
            },
        ]);
        assert_eq!(cycles.all()[0].birth, 0);
        let cycle = cycles.born_at(5).unwrap();
        assert_eq!(cycle.faces().collect::<Vec<_>>(), vec![3, 4]);
        assert!(cycles.born_at(1).is_none());
    }
}
