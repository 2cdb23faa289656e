use log::debug;

use crate::barcode::Bar;
use crate::columns::{Cell, Column, IntoBoundary};
use crate::fields::CoefficientField;
use crate::reduction::Pairing;
use crate::rows::{NoRows, RowAccess, Rows};
use crate::{Dimension, Index, PermatError};

use super::{default_dimension, DimensionTracker, PersistenceMatrix};

/// Columns stored as they are given, with free access to column and row operations.
///
/// The barcode is computed on demand by the standard algorithm, which reduces the columns in place.
/// Appending columns keeps the reduction done so far, any other mutation discards it.
#[derive(Debug, Clone)]
pub struct BaseMatrix<F: CoefficientField, Col: Column<F>, R: RowAccess = NoRows> {
    pub(crate) field: F,
    pub(crate) columns: Vec<Col>,
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) rows: R,
    tracker: DimensionTracker,
    pairing: Pairing,
}

impl<F, Col, R> BaseMatrix<F, Col, R>
where
    F: CoefficientField,
    Col: Column<F>,
    R: RowAccess,
{
    pub fn new(field: F) -> Self {
        Self::with_capacity(field, 0)
    }

    pub fn with_capacity(field: F, capacity: usize) -> Self {
        Self {
            field,
            columns: Vec::with_capacity(capacity),
            dimensions: Vec::with_capacity(capacity),
            rows: R::default(),
            tracker: DimensionTracker::default(),
            pairing: Pairing::default(),
        }
    }

    /// One column per boundary, in order, with dimensions inferred from the boundary sizes.
    pub fn with_boundaries<B: IntoBoundary<F>>(
        field: F,
        boundaries: impl IntoIterator<Item = B>,
    ) -> Self {
        let mut matrix = Self::new(field);
        for boundary in boundaries {
            matrix.insert_boundary(boundary);
        }
        matrix
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    // ======== Insertion and removal ==========================

    pub fn insert_boundary<B: IntoBoundary<F>>(&mut self, boundary: B) -> Index {
        self.insert_boundary_with_dimension(boundary, None)
    }

    pub fn insert_boundary_with_dimension<B: IntoBoundary<F>>(
        &mut self,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Index {
        let cells = boundary.into_cells(&self.field);
        let dimension = default_dimension(&cells, dimension);
        self.insert_column(cells, dimension)
    }

    /// Appends a column from already normalised cells.
    pub fn insert_column(&mut self, cells: Vec<Cell<F::Coefficient>>, dimension: Dimension) -> Index {
        let index = self.columns.len();
        for cell in &cells {
            self.rows.link(cell.row, index);
        }
        self.columns.push(Col::from_cells(&self.field, cells));
        self.dimensions.push(dimension);
        self.tracker.add(dimension);
        index
    }

    /// Removes and returns the last column.
    pub fn remove_last(&mut self) -> Result<Col, PermatError> {
        let column = self.columns.pop().ok_or(PermatError::EmptyMatrix)?;
        let index = self.columns.len();
        for row in column.rows() {
            self.rows.unlink(row, index);
        }
        if let Some(dimension) = self.dimensions.pop() {
            self.tracker.remove(dimension);
        }
        self.pairing.reset();
        Ok(column)
    }

    /// Empties the matrix, keeping its field.
    pub fn reset(&mut self) {
        self.columns.clear();
        self.dimensions.clear();
        self.rows = R::default();
        self.tracker.clear();
        self.pairing.reset();
    }

    // ======== Queries ========================================

    pub fn get_column(&self, index: Index) -> Result<&Col, PermatError> {
        self.columns
            .get(index)
            .ok_or(PermatError::ColumnOutOfRange(index))
    }

    pub fn get_column_dimension(&self, index: Index) -> Result<Dimension, PermatError> {
        self.dimensions
            .get(index)
            .copied()
            .ok_or(PermatError::ColumnOutOfRange(index))
    }

    pub fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn max_dimension(&self) -> Option<Dimension> {
        self.tracker.max_dimension()
    }

    pub fn is_zero_cell(&self, column: Index, row: Index) -> Result<bool, PermatError> {
        Ok(!self.get_column(column)?.is_non_zero(row))
    }

    pub fn is_zero_column(&self, column: Index) -> Result<bool, PermatError> {
        Ok(self.get_column(column)?.is_empty())
    }

    /// Only meaningful once the barcode has been computed.
    pub fn get_column_with_pivot(&self, pivot: Index) -> Option<Index> {
        self.pairing.column_with_pivot(pivot)
    }

    // ======== Column operations ==============================

    fn check(&self, index: Index) -> Result<(), PermatError> {
        if index < self.columns.len() {
            Ok(())
        } else {
            Err(PermatError::ColumnOutOfRange(index))
        }
    }

    /// `target += source`
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        let one = self.field.one();
        self.multiply_source_and_add_to(&one, source, target)
    }

    /// `target = coefficient * target + source`
    pub fn multiply_target_and_add_to(
        &mut self,
        source: Index,
        coefficient: &F::Coefficient,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check(source)?;
        self.check(target)?;
        let cells = self.columns[source].cells();
        self.columns[target].multiply_and_add(
            &self.field,
            Some(coefficient),
            &cells,
            &mut self.rows.observer(target),
        );
        self.pairing.reset();
        Ok(())
    }

    /// `target += coefficient * source`
    pub fn multiply_source_and_add_to(
        &mut self,
        coefficient: &F::Coefficient,
        source: Index,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check(source)?;
        self.check(target)?;
        let cells = self.columns[source].cells();
        self.columns[target].add_scaled(
            &self.field,
            &cells,
            coefficient,
            &mut self.rows.observer(target),
        );
        self.pairing.reset();
        Ok(())
    }

    pub fn zero_cell(&mut self, column: Index, row: Index) -> Result<(), PermatError> {
        self.check(column)?;
        if self.columns[column].clear_row(row, &mut self.rows.observer(column)) {
            self.pairing.reset();
        }
        Ok(())
    }

    pub fn zero_column(&mut self, column: Index) -> Result<(), PermatError> {
        self.check(column)?;
        self.columns[column].clear(&mut self.rows.observer(column));
        self.pairing.reset();
        Ok(())
    }

    /// Exchanges two columns together with their dimensions.
    pub fn swap_columns(&mut self, first: Index, second: Index) -> Result<(), PermatError> {
        self.check(first)?;
        self.check(second)?;
        if first == second {
            return Ok(());
        }
        if R::TRACKING {
            let first_rows = self.columns[first].rows();
            let second_rows = self.columns[second].rows();
            for &row in &first_rows {
                self.rows.unlink(row, first);
            }
            for &row in &second_rows {
                self.rows.unlink(row, second);
            }
            for row in first_rows {
                self.rows.link(row, second);
            }
            for row in second_rows {
                self.rows.link(row, first);
            }
        }
        self.columns.swap(first, second);
        self.dimensions.swap(first, second);
        self.pairing.reset();
        Ok(())
    }

    /// Exchanges two rows. Only the columns holding either row are touched.
    pub fn swap_rows(&mut self, first: Index, second: Index) {
        if first == second {
            return;
        }
        let map = move |row: Index| {
            if row == first {
                second
            } else if row == second {
                first
            } else {
                row
            }
        };
        for column in self.columns.iter_mut() {
            if column.is_non_zero(first) || column.is_non_zero(second) {
                column.reorder(map);
            }
        }
        self.rows.swap_rows(first, second);
        self.pairing.reset();
    }

    // ======== Barcode ========================================

    /// Reduces the columns not reduced yet and returns the bars between column positions.
    pub fn get_current_barcode(&mut self) -> Result<&[Bar], PermatError> {
        let Self {
            field,
            columns,
            dimensions,
            rows,
            pairing,
            ..
        } = self;
        if !pairing.is_reduced(columns.len()) {
            debug!("Reducing base matrix with {} columns", columns.len());
        }
        pairing.reduce(field, columns, dimensions, rows)?;
        Ok(pairing.barcode())
    }
}

impl<F, Col> BaseMatrix<F, Col, Rows>
where
    F: CoefficientField,
    Col: Column<F>,
{
    /// Columns with a non-zero cell in `row`, increasing.
    pub fn get_row(&self, row: Index) -> Vec<Index> {
        self.rows.row(row).collect()
    }

    pub fn erase_empty_row(&mut self, row: Index) -> Result<(), PermatError> {
        if !self.rows.is_row_empty(row) {
            return Err(PermatError::RowNotEmpty(row));
        }
        self.rows.erase_row(row);
        Ok(())
    }
}

impl<F, Col, R> PersistenceMatrix<F> for BaseMatrix<F, Col, R>
where
    F: CoefficientField,
    Col: Column<F>,
    R: RowAccess,
{
    fn insert_face<B: IntoBoundary<F>>(
        &mut self,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError> {
        Ok(self.insert_boundary_with_dimension(boundary, dimension))
    }

    fn number_of_columns(&self) -> usize {
        self.number_of_columns()
    }

    fn max_dimension(&self) -> Option<Dimension> {
        self.max_dimension()
    }

    fn barcode(&mut self) -> Result<Vec<Bar>, PermatError> {
        Ok(self.get_current_barcode()?.to_vec())
    }
}
