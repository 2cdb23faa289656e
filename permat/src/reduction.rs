//! The standard algorithm, run in place on a vector of boundary columns.
//!
//! Columns are reduced left to right: while the pivot of a column is owned by an earlier column,
//! a multiple of that column is added to cancel it.
//! [`Pairing`] remembers how far it got, so querying the barcode again only reduces new columns.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::barcode::Bar;
use crate::columns::Column;
use crate::fields::CoefficientField;
use crate::rows::RowAccess;
use crate::{Dimension, Index, PermatError};

/// Reduces `columns[index]` against the pivots in `pivot_to_column`.
///
/// Calls `on_addition(source, factor)` after each `columns[index] += factor * columns[source]`.
/// Returns the final pivot, `None` if the column was reduced to zero.
pub(crate) fn reduce_column<F, Col, R>(
    field: &F,
    columns: &mut [Col],
    index: Index,
    pivot_to_column: &FxHashMap<Index, Index>,
    rows: &mut R,
    mut on_addition: impl FnMut(Index, &F::Coefficient),
) -> Result<Option<Index>, PermatError>
where
    F: CoefficientField,
    Col: Column<F>,
    R: RowAccess,
{
    'reduction: loop {
        let (Some(pivot), Some(pivot_value)) = (columns[index].pivot(), columns[index].pivot_value())
        else {
            // Column reduced to 0 -> found cycle
            break 'reduction Ok(None);
        };

        // Check if there is a column with the same pivot
        let Some(&other) = pivot_to_column.get(&pivot) else {
            // Cannot reduce further -> found boundary
            break 'reduction Ok(Some(pivot));
        };

        let other_value = columns[other]
            .pivot_value()
            .ok_or(PermatError::NonInvertiblePivot(other))?;
        let factor = field
            .cancelling_factor(&pivot_value, &other_value)
            .ok_or(PermatError::NonInvertiblePivot(other))?;

        trace!("Reducing column {index} by column {other} (pivot {pivot})");
        let cells = columns[other].cells();
        columns[index].add_scaled(field, &cells, &factor, &mut rows.observer(index));
        on_addition(other, &factor);

        // Over a multi-field a non-unit factor may leave the pivot behind
        if columns[index].pivot() == Some(pivot) {
            break 'reduction Err(PermatError::NonInvertiblePivot(other));
        }
    }
}

/// Resumable state of the standard algorithm over a matrix whose columns only ever get appended.
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    pivot_to_column: FxHashMap<Index, Index>,
    barcode: Vec<Bar>,
    position_to_bar: FxHashMap<Index, usize>,
    reduced_up_to: usize,
}

impl Pairing {
    pub fn barcode(&self) -> &[Bar] {
        &self.barcode
    }

    pub fn column_with_pivot(&self, pivot: Index) -> Option<Index> {
        self.pivot_to_column.get(&pivot).copied()
    }

    pub fn is_reduced(&self, number_of_columns: usize) -> bool {
        self.reduced_up_to == number_of_columns
    }

    /// Forgets everything, the next [`Pairing::reduce`] starts from the first column.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reduces every column not yet reduced, recording the bars they create or close.
    pub fn reduce<F, Col, R>(
        &mut self,
        field: &F,
        columns: &mut [Col],
        dimensions: &[Dimension],
        rows: &mut R,
    ) -> Result<(), PermatError>
    where
        F: CoefficientField,
        Col: Column<F>,
        R: RowAccess,
    {
        if self.reduced_up_to == columns.len() {
            return Ok(());
        }
        let start = self.reduced_up_to;
        for index in start..columns.len() {
            let pivot =
                reduce_column(field, columns, index, &self.pivot_to_column, rows, |_, _| {})?;
            self.record(index, pivot, dimensions);
            self.reduced_up_to = index + 1;
        }
        debug!(
            "Reduced columns {start}..{}, {} bars",
            columns.len(),
            self.barcode.len()
        );
        Ok(())
    }

    fn record(&mut self, index: Index, pivot: Option<Index>, dimensions: &[Dimension]) {
        match pivot {
            None => {
                let dimension = dimensions.get(index).copied().unwrap_or_default();
                self.position_to_bar.insert(index, self.barcode.len());
                self.barcode.push(Bar::essential(dimension, index));
            }
            Some(pivot) => {
                self.pivot_to_column.insert(pivot, index);
                match self.position_to_bar.get(&pivot) {
                    Some(&bar) => self.barcode[bar].death = Some(index),
                    None => {
                        let dimension = dimensions.get(pivot).copied().unwrap_or_default();
                        self.barcode.push(Bar::finite(dimension, pivot, index));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::barcode::Bar;
    use crate::columns::{Column, IntoBoundary, VectorColumn};
    use crate::fields::{MultiField, Z2Field};
    use crate::rows::NoRows;
    use crate::{Index, PermatError};

    use super::Pairing;

    fn simple_z2_columns(boundaries: Vec<Vec<Index>>) -> Vec<VectorColumn<Z2Field>> {
        let field = Z2Field::new();
        boundaries
            .into_iter()
            .map(|boundary| VectorColumn::from_cells(&field, boundary.into_cells(&field)))
            .collect()
    }

    #[test]
    fn test_filled_triangle() {
        let field = Z2Field::new();
        let mut columns = simple_z2_columns(vec![
            vec![],
            vec![],
            vec![],
            vec![0, 1],
            vec![1, 2],
            vec![0, 2],
            vec![3, 4, 5],
        ]);
        let dimensions = vec![0, 0, 0, 1, 1, 1, 2];
        let mut pairing = Pairing::default();
        pairing
            .reduce(&field, &mut columns, &dimensions, &mut NoRows)
            .unwrap();

        let mut barcode = pairing.barcode().to_vec();
        barcode.sort();
        assert_eq!(
            barcode,
            vec![
                Bar::essential(0, 0),
                Bar::finite(0, 1, 3),
                Bar::finite(0, 2, 4),
                Bar::finite(1, 5, 6),
            ]
        );
        // 0 + 2 = (0 + 1) + (1 + 2)
        assert!(columns[5].is_empty());
        assert_eq!(pairing.column_with_pivot(2), Some(4));
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let field = Z2Field::new();
        let mut columns = simple_z2_columns(vec![vec![], vec![], vec![0, 1], vec![0, 1]]);
        let dimensions = vec![0, 0, 1, 1];
        let mut pairing = Pairing::default();
        pairing
            .reduce(&field, &mut columns, &dimensions, &mut NoRows)
            .unwrap();
        let reduced = columns.clone();

        let mut again = Pairing::default();
        again
            .reduce(&field, &mut columns, &dimensions, &mut NoRows)
            .unwrap();
        assert_eq!(columns, reduced);
        assert_eq!(again.barcode(), pairing.barcode());
        assert!(again.is_reduced(4));
    }

    #[test]
    fn test_zero_divisor_pivot_is_rejected() {
        let field = MultiField::initialize(2, 3).unwrap();
        let boundaries: Vec<Vec<(Index, u64)>> = vec![vec![], vec![], vec![(1, 2)], vec![(1, 1)]];
        let mut columns: Vec<VectorColumn<_>> = boundaries
            .into_iter()
            .map(|boundary| VectorColumn::from_cells(&field, boundary.into_cells(&field)))
            .collect();
        let mut pairing = Pairing::default();
        // 2 is not a unit modulo 6
        assert_eq!(
            pairing.reduce(&field, &mut columns, &[0, 0, 1, 1], &mut NoRows),
            Err(PermatError::NonInvertiblePivot(2))
        );
    }
}
