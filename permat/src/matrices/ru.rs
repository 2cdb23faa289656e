use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::barcode::Bar;
use crate::columns::{Cell, Column, IntoBoundary};
use crate::cycles::{inverse_column, Cycle, RepresentativeCycles};
use crate::fields::{CoefficientField, Z2Field};
use crate::reduction::reduce_column;
use crate::rows::{NoRows, RowAccess, Rows};
use crate::{Dimension, Index, PermatError};

use super::{default_dimension, BaseMatrix, PersistenceMatrix};

/// A boundary matrix `D` kept as `D = R * U`, with `R` reduced and `U` upper unitriangular.
///
/// `U` is stored by rows: column `k` of `mirror` holds row `k` of `U`.
/// Every face is reduced as soon as it is inserted, so the barcode is always current.
#[derive(Debug, Clone)]
pub struct RuMatrix<F: CoefficientField, Col: Column<F>, R: RowAccess = NoRows> {
    reduced: BaseMatrix<F, Col, R>,
    mirror: BaseMatrix<F, Col>,
    pivot_to_column: FxHashMap<Index, Index>,
    barcode: Vec<Bar>,
    // Both endpoints of every bar
    position_to_bar: FxHashMap<Index, usize>,
    cycles: RepresentativeCycles<F::Coefficient>,
}

impl<F, Col, R> RuMatrix<F, Col, R>
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
            mirror: BaseMatrix::with_capacity(field.clone(), capacity),
            reduced: BaseMatrix::with_capacity(field, capacity),
            pivot_to_column: FxHashMap::default(),
            barcode: Vec::with_capacity(capacity),
            position_to_bar: FxHashMap::default(),
            cycles: RepresentativeCycles::default(),
        }
    }

    pub fn with_boundaries<B: IntoBoundary<F>>(
        field: F,
        boundaries: impl IntoIterator<Item = B>,
    ) -> Result<Self, PermatError> {
        let mut matrix = Self::new(field);
        for boundary in boundaries {
            matrix.insert_boundary(boundary)?;
        }
        Ok(matrix)
    }

    pub fn field(&self) -> &F {
        self.reduced.field()
    }

    // ======== Insertion ======================================

    pub fn insert_boundary<B: IntoBoundary<F>>(&mut self, boundary: B) -> Result<Index, PermatError> {
        self.insert_boundary_with_dimension(boundary, None)
    }

    /// Appends a face and reduces its column, opening or closing a bar.
    pub fn insert_boundary_with_dimension<B: IntoBoundary<F>>(
        &mut self,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError> {
        let cells = boundary.into_cells(self.reduced.field());
        let dimension = default_dimension(&cells, dimension);
        let index = self.reduced.insert_column(cells, dimension);
        let one = self.reduced.field.one();
        self.mirror
            .insert_column(vec![Cell::new(index, one)], dimension);

        let field = &self.reduced.field;
        let columns = &mut self.reduced.columns;
        let rows = &mut self.reduced.rows;
        let mirror = &mut self.mirror.columns;
        let pivot = reduce_column(
            field,
            columns,
            index,
            &self.pivot_to_column,
            rows,
            |source, factor| {
                // R[index] += factor * R[source] so U[source] -= factor * U[index]
                let cells = mirror[index].cells();
                let negated = field.additive_inverse(factor);
                mirror[source].add_scaled(field, &cells, &negated, &mut ());
            },
        )?;

        match pivot {
            None => {
                self.position_to_bar.insert(index, self.barcode.len());
                self.barcode.push(Bar::essential(dimension, index));
            }
            Some(pivot) => {
                self.pivot_to_column.insert(pivot, index);
                match self.position_to_bar.get(&pivot).copied() {
                    Some(bar) => {
                        self.barcode[bar].death = Some(index);
                        self.position_to_bar.insert(index, bar);
                    }
                    None => {
                        let birth_dimension = self.reduced.dimensions[pivot];
                        self.position_to_bar.insert(pivot, self.barcode.len());
                        self.position_to_bar.insert(index, self.barcode.len());
                        self.barcode
                            .push(Bar::finite(birth_dimension, pivot, index));
                    }
                }
            }
        }
        trace!("Inserted face {index} with pivot {pivot:?}");
        Ok(index)
    }

    // ======== Removal ========================================

    /// Removes the last face, which is always maximal.
    pub fn remove_last(&mut self) -> Result<(), PermatError> {
        let last = self
            .number_of_columns()
            .checked_sub(1)
            .ok_or(PermatError::EmptyMatrix)?;

        match self.reduced.columns[last].pivot() {
            Some(pivot) => {
                // The partner survives as an essential class
                self.pivot_to_column.remove(&pivot);
                if let Some(bar) = self.position_to_bar.remove(&last) {
                    self.barcode[bar].death = None;
                }
            }
            None => {
                if let Some(bar) = self.position_to_bar.remove(&last) {
                    self.remove_bar(bar);
                }
            }
        }

        self.reduced.remove_last()?;
        self.reduced.rows.erase_row(last);
        self.mirror.remove_last()?;
        for row_of_u in self.mirror.columns.iter_mut() {
            row_of_u.clear_row(last, &mut ());
        }
        Ok(())
    }

    fn remove_bar(&mut self, bar: usize) {
        self.barcode.swap_remove(bar);
        if let Some(moved) = self.barcode.get(bar).copied() {
            self.position_to_bar.insert(moved.birth, bar);
            if let Some(death) = moved.death {
                self.position_to_bar.insert(death, bar);
            }
        }
    }

    // ======== Queries ========================================

    /// Column `index` of `R`.
    pub fn get_column(&self, index: Index) -> Result<&Col, PermatError> {
        self.reduced.get_column(index)
    }

    /// Column `index` of `U`, non-zero only in rows `0..=index`.
    pub fn get_column_of_u(&self, index: Index) -> Result<Vec<Cell<F::Coefficient>>, PermatError> {
        self.reduced.get_column(index)?;
        Ok(self.mirror.columns[..=index]
            .iter()
            .enumerate()
            .filter_map(|(row, row_of_u)| Some(Cell::new(row, row_of_u.value_at(index)?)))
            .collect())
    }

    /// Row `index` of `U`, non-zero only in columns `index..`.
    pub fn get_row_of_u(&self, index: Index) -> Result<&Col, PermatError> {
        self.mirror.get_column(index)
    }

    pub fn get_pivot(&self, column: Index) -> Result<Option<Index>, PermatError> {
        Ok(self.reduced.get_column(column)?.pivot())
    }

    pub fn get_column_with_pivot(&self, pivot: Index) -> Option<Index> {
        self.pivot_to_column.get(&pivot).copied()
    }

    pub fn get_column_dimension(&self, index: Index) -> Result<Dimension, PermatError> {
        self.reduced.get_column_dimension(index)
    }

    pub fn number_of_columns(&self) -> usize {
        self.reduced.number_of_columns()
    }

    pub fn max_dimension(&self) -> Option<Dimension> {
        self.reduced.max_dimension()
    }

    pub fn is_zero_cell(&self, column: Index, row: Index) -> Result<bool, PermatError> {
        self.reduced.is_zero_cell(column, row)
    }

    pub fn is_zero_column(&self, column: Index) -> Result<bool, PermatError> {
        self.reduced.is_zero_column(column)
    }

    pub fn get_current_barcode(&self) -> &[Bar] {
        &self.barcode
    }

    // ======== Representative cycles ==========================

    /// Recomputes one cycle per positive column, the matching column of `U^{-1}`.
    pub fn update_representative_cycles(&mut self) {
        let field = &self.reduced.field;
        let cycles = (0..self.number_of_columns())
            .filter(|&index| self.reduced.columns[index].is_empty())
            .map(|birth| Cycle {
                birth,
                dimension: self.reduced.dimensions[birth],
                cells: inverse_column(field, &self.mirror.columns, birth),
            })
            .collect();
        self.cycles.replace(cycles);
        debug!("Updated {} representative cycles", self.cycles.all().len());
    }

    /// As of the last [`RuMatrix::update_representative_cycles`].
    pub fn get_representative_cycles(&self) -> &[Cycle<F::Coefficient>] {
        self.cycles.all()
    }

    pub fn get_representative_cycle(&self, bar: &Bar) -> Option<&Cycle<F::Coefficient>> {
        self.cycles.born_at(bar.birth)
    }

    // ======== Column operations ==============================

    // The operations below keep `D = R * U` but not the reduction of `R`:
    // the barcode and the cycles are left as they were.

    fn check_pair(&self, source: Index, target: Index) -> Result<(), PermatError> {
        self.reduced.get_column(source)?;
        self.reduced.get_column(target)?;
        match source.cmp(&target) {
            std::cmp::Ordering::Less => Ok(()),
            std::cmp::Ordering::Equal => Err(PermatError::SameColumn(source)),
            std::cmp::Ordering::Greater => Err(PermatError::SourceAfterTarget(source, target)),
        }
    }

    /// `R[target] += R[source]`, with `source < target` so that `U` stays upper triangular.
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        let one = self.reduced.field.one();
        self.multiply_source_and_add_to(&one, source, target)
    }

    /// `R[target] += coefficient * R[source]`
    pub fn multiply_source_and_add_to(
        &mut self,
        coefficient: &F::Coefficient,
        source: Index,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check_pair(source, target)?;
        let previous = self.reduced.columns[target].pivot();
        self.add_scaled_to(source, coefficient, target);
        self.refresh_pivot(target, previous);
        Ok(())
    }

    /// `R[target] = coefficient * R[target] + R[source]`
    ///
    /// Row `target` of `U` is divided by `coefficient`, which must therefore be invertible.
    pub fn multiply_target_and_add_to(
        &mut self,
        source: Index,
        coefficient: &F::Coefficient,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check_pair(source, target)?;
        let field = &self.reduced.field;
        let inverse = field
            .inverse(coefficient)
            .ok_or(PermatError::NonInvertibleMultiplier(target))?;
        let previous = self.reduced.columns[target].pivot();
        self.reduced.columns[target].scale(
            field,
            coefficient,
            &mut self.reduced.rows.observer(target),
        );
        self.mirror.columns[target].scale(field, &inverse, &mut ());
        let one = field.one();
        self.add_scaled_to(source, &one, target);
        self.refresh_pivot(target, previous);
        Ok(())
    }

    /// Zeroes a cell of `R`; the boundary `D = R * U` changes with it.
    pub fn zero_cell(&mut self, column: Index, row: Index) -> Result<(), PermatError> {
        let previous = self.get_pivot(column)?;
        self.reduced.zero_cell(column, row)?;
        self.refresh_pivot(column, previous);
        Ok(())
    }

    /// Zeroes a column of `R`; the boundary `D = R * U` changes with it.
    pub fn zero_column(&mut self, column: Index) -> Result<(), PermatError> {
        let previous = self.get_pivot(column)?;
        self.reduced.zero_column(column)?;
        self.refresh_pivot(column, previous);
        Ok(())
    }

    fn refresh_pivot(&mut self, column: Index, previous: Option<Index>) {
        if let Some(pivot) = previous {
            if self.pivot_to_column.get(&pivot) == Some(&column) {
                self.pivot_to_column.remove(&pivot);
            }
        }
        if let Some(pivot) = self.reduced.columns[column].pivot() {
            self.pivot_to_column.entry(pivot).or_insert(column);
        }
    }

    /// `R[target] += factor * R[source]`, compensated in `U` so that `D = R * U` still holds.
    fn add_scaled_to(&mut self, source: Index, factor: &F::Coefficient, target: Index) {
        let cells = self.reduced.columns[source].cells();
        self.reduced.columns[target].add_scaled(
            &self.reduced.field,
            &cells,
            factor,
            &mut self.reduced.rows.observer(target),
        );
        let negated = self.reduced.field.additive_inverse(factor);
        let cells = self.mirror.columns[target].cells();
        self.mirror.columns[source].add_scaled(&self.mirror.field, &cells, &negated, &mut ());
    }

    /// Exchanges faces `index` and `index + 1` in both `R` and `U`.
    fn swap_at(&mut self, index: Index) -> Result<(), PermatError> {
        self.reduced.swap_columns(index, index + 1)?;
        self.reduced.swap_rows(index, index + 1);
        self.mirror.swap_columns(index, index + 1)?;
        self.mirror.swap_rows(index, index + 1);
        Ok(())
    }
}

impl<F, Col> RuMatrix<F, Col, Rows>
where
    F: CoefficientField,
    Col: Column<F>,
{
    /// Columns of `R` with a non-zero cell in `row`, increasing.
    pub fn get_row(&self, row: Index) -> Vec<Index> {
        self.reduced.get_row(row)
    }

    pub fn erase_empty_row(&mut self, row: Index) -> Result<(), PermatError> {
        self.reduced.erase_empty_row(row)
    }
}

// ======== Vine swaps =========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwapMode {
    Checked,
    // Caller guarantees U[i][i + 1] == 1
    Coupled,
}

impl<Col, R> RuMatrix<Z2Field, Col, R>
where
    Col: Column<Z2Field>,
    R: RowAccess,
{
    /// Updates the decomposition after faces `index` and `index + 1` exchanged positions.
    ///
    /// Returns `true` if both faces kept their partner, i.e. their bars moved with them,
    /// and `false` if they exchanged roles, leaving the barcode unchanged.
    pub fn vine_swap(&mut self, index: Index) -> Result<bool, PermatError> {
        self.swap_and_refresh(index, SwapMode::Checked)
    }

    /// As [`RuMatrix::vine_swap`], skipping the checks for when the swap is trivial.
    /// Only valid when `U[index][index + 1] == 1`.
    pub fn vine_swap_with_z_eq_1_case(&mut self, index: Index) -> Result<bool, PermatError> {
        self.swap_and_refresh(index, SwapMode::Coupled)
    }

    /// Vine-swaps the face at `position` to the end of the filtration and removes it.
    /// The face must have no coface.
    pub fn remove_maximal_face(&mut self, position: Index) -> Result<(), PermatError> {
        if position >= self.number_of_columns() {
            return Err(PermatError::ColumnOutOfRange(position));
        }
        for index in position..self.number_of_columns() - 1 {
            self.vine_swap(index)?;
        }
        self.remove_last()
    }

    fn swap_and_refresh(&mut self, index: Index, mode: SwapMode) -> Result<bool, PermatError> {
        let next = index + 1;
        if next >= self.number_of_columns() {
            return Err(PermatError::ColumnOutOfRange(next));
        }

        let deaths = (
            self.get_column_with_pivot(index),
            self.get_column_with_pivot(next),
        );
        let mut touched = vec![index, next];
        touched.extend(deaths.0);
        touched.extend(deaths.1);
        for &column in &touched {
            if let Some(pivot) = self.reduced.columns[column].pivot() {
                self.pivot_to_column.remove(&pivot);
            }
        }

        let slots = (self.position_to_bar[&index], self.position_to_bar[&next]);
        let old_bars = (self.barcode[slots.0], self.barcode[slots.1]);

        self.swap_cases(index, mode, deaths)?;

        for &column in &touched {
            if let Some(pivot) = self.reduced.columns[column].pivot() {
                self.pivot_to_column.insert(pivot, column);
            }
        }

        let new_bars = (self.bar_at(index), self.bar_at(next));
        let anchor = |bar: &Bar| {
            if bar.birth == index || bar.birth == next {
                bar.death
            } else {
                Some(bar.birth)
            }
        };
        let transposed = anchor(&old_bars.0) == anchor(&new_bars.1)
            && anchor(&old_bars.1) == anchor(&new_bars.0);
        let (first, second) = if transposed {
            (new_bars.1, new_bars.0)
        } else {
            new_bars
        };
        for (slot, bar) in [(slots.0, first), (slots.1, second)] {
            self.barcode[slot] = bar;
            self.position_to_bar.insert(bar.birth, slot);
            if let Some(death) = bar.death {
                self.position_to_bar.insert(death, slot);
            }
        }
        Ok(transposed)
    }

    fn swap_cases(
        &mut self,
        index: Index,
        mode: SwapMode,
        deaths: (Option<Index>, Option<Index>),
    ) -> Result<(), PermatError> {
        let next = index + 1;
        let one = self.reduced.field.one();
        let first_positive = self.reduced.columns[index].is_empty();
        let second_positive = self.reduced.columns[next].is_empty();
        let trivial = mode == SwapMode::Checked
            && (self.reduced.dimensions[index] != self.reduced.dimensions[next]
                || !self.mirror.columns[index].is_non_zero(next));

        match (first_positive, second_positive) {
            (true, true) => {
                trace!("Positive vine swap at {index}");
                // R[index] is zero, so this entry of U does not contribute to D
                self.mirror.columns[index].clear_row(next, &mut ());
                self.swap_at(index)?;
                if let (Some(death), Some(next_death)) = deaths {
                    // Rows were exchanged, so R[next_death] meets the old face `index` in row `next`
                    if self.reduced.columns[next_death].is_non_zero(next) {
                        if death < next_death {
                            self.add_scaled_to(death, &one, next_death);
                        } else {
                            self.add_scaled_to(next_death, &one, death);
                        }
                    }
                }
            }
            _ if trivial => {
                self.swap_at(index)?;
            }
            (false, false) => {
                trace!("Negative vine swap at {index}");
                let births = (
                    self.reduced.columns[index].pivot(),
                    self.reduced.columns[next].pivot(),
                );
                self.add_scaled_to(index, &one, next);
                self.swap_at(index)?;
                if births.0 > births.1 {
                    self.add_scaled_to(index, &one, next);
                }
            }
            (true, false) => {
                trace!("Positive-negative vine swap at {index}");
                self.mirror.columns[index].clear_row(next, &mut ());
                self.swap_at(index)?;
            }
            (false, true) => {
                trace!("Negative-positive vine swap at {index}");
                self.add_scaled_to(index, &one, next);
                self.swap_at(index)?;
                self.add_scaled_to(index, &one, next);
            }
        }
        Ok(())
    }

    /// The bar with an endpoint at `position`, read off the current reduction.
    fn bar_at(&self, position: Index) -> Bar {
        let dimensions = &self.reduced.dimensions;
        if let Some(pivot) = self.reduced.columns[position].pivot() {
            Bar::finite(dimensions[pivot], pivot, position)
        } else if let Some(death) = self.get_column_with_pivot(position) {
            Bar::finite(dimensions[position], position, death)
        } else {
            Bar::essential(dimensions[position], position)
        }
    }
}

impl<F, Col, R> PersistenceMatrix<F> for RuMatrix<F, Col, R>
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
        self.insert_boundary_with_dimension(boundary, dimension)
    }

    fn number_of_columns(&self) -> usize {
        self.number_of_columns()
    }

    fn max_dimension(&self) -> Option<Dimension> {
        self.max_dimension()
    }

    fn barcode(&mut self) -> Result<Vec<Bar>, PermatError> {
        Ok(self.barcode.clone())
    }
}
