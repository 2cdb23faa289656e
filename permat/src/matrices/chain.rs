use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::barcode::Bar;
use crate::columns::{normalize, Cell, ChainColumn, Column, IntoBoundary};
use crate::cycles::{Cycle, RepresentativeCycles};
use crate::fields::{CoefficientField, Z2Field};
use crate::rows::{NoRows, RowAccess, Rows};
use crate::{Dimension, Index, PermatError, ID};

use super::{default_dimension, DimensionTracker, PersistenceMatrix};

/// Working copy of a boundary during reduction, keyed by filtration position.
type WorkingColumn<C> = BTreeMap<Index, (ID, C)>;

/// A basis of chains, one per face, each with the face as its pivot.
///
/// Chains come in three kinds:
/// * `F`: unpaired cycles, the essential classes.
/// * `G`: cycles paired with a chain of `H`, born at their pivot.
/// * `H`: chains whose boundary is their partner in `G`, killing it at their pivot.
///
/// Rows are face identifiers. Vine swaps exchange filtration positions, never columns,
/// so positions are tracked separately from the storage order.
#[derive(Debug, Clone)]
pub struct ChainMatrix<F: CoefficientField, Col: Column<F>, R: RowAccess = NoRows> {
    field: F,
    columns: Vec<ChainColumn<F, Col>>,
    pivot_to_column: FxHashMap<ID, Index>,
    pivot_to_position: FxHashMap<ID, Index>,
    position_to_pivot: Vec<ID>,
    next_id: ID,
    barcode: Vec<Bar>,
    // Both endpoint faces of every bar
    face_to_bar: FxHashMap<ID, usize>,
    tracker: DimensionTracker,
    rows: R,
    cycles: RepresentativeCycles<F::Coefficient>,
}

fn pair_mut<T>(items: &mut [T], first: usize, second: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(first, second);
    if first < second {
        let (left, right) = items.split_at_mut(second);
        (&mut left[first], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(first);
        (&mut right[0], &mut left[second])
    }
}

impl<F, Col, R> ChainMatrix<F, Col, R>
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
            pivot_to_column: FxHashMap::default(),
            pivot_to_position: FxHashMap::default(),
            position_to_pivot: Vec::with_capacity(capacity),
            next_id: 0,
            barcode: Vec::with_capacity(capacity),
            face_to_bar: FxHashMap::default(),
            tracker: DimensionTracker::default(),
            rows: R::default(),
            cycles: RepresentativeCycles::default(),
        }
    }

    /// Faces get the identifiers `0, 1, ...` in order.
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
        &self.field
    }

    // ======== Insertion ======================================

    /// Inserts a face under the next unused identifier, returns its position.
    pub fn insert_boundary<B: IntoBoundary<F>>(&mut self, boundary: B) -> Result<Index, PermatError> {
        self.insert_boundary_with_id(self.next_id, boundary, None)
    }

    /// Inserts face `id` at the end of the filtration, its boundary is given in face identifiers.
    /// Returns its position.
    pub fn insert_boundary_with_id<B: IntoBoundary<F>>(
        &mut self,
        id: ID,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError> {
        if self.pivot_to_column.contains_key(&id) {
            return Err(PermatError::DuplicateFace(id));
        }
        let cells = boundary.into_cells(&self.field);
        let dimension = default_dimension(&cells, dimension);
        let mut working = WorkingColumn::new();
        for cell in cells {
            let position = *self
                .pivot_to_position
                .get(&cell.row)
                .ok_or(PermatError::UnknownFace(cell.row))?;
            working.insert(position, (cell.row, cell.value));
        }

        // Reduce by G (recording the partners in H) and by F, youngest pivot first
        let mut chains_in_h = vec![];
        let mut chains_in_f = vec![];
        while let Some((&position, (pivot, value))) = working.last_key_value() {
            let (pivot, value) = (*pivot, value.clone());
            let owner = self.pivot_to_column[&pivot];
            let pivot_value = self.columns[owner]
                .pivot_value()
                .ok_or(PermatError::NonInvertiblePivot(owner))?;
            let factor = self
                .field
                .cancelling_factor(&value, &pivot_value)
                .ok_or(PermatError::NonInvertiblePivot(owner))?;
            self.add_to_working(&mut working, owner, &factor);
            if working.contains_key(&position) {
                return Err(PermatError::NonInvertiblePivot(owner));
            }
            match self.columns[owner].paired_with() {
                Some(partner) => chains_in_h.push((partner, factor)),
                None => chains_in_f.push((owner, factor)),
            }
        }

        let position = self.position_to_pivot.len();
        self.pivot_to_position.insert(id, position);
        self.position_to_pivot.push(id);
        self.next_id = self.next_id.max(id + 1);

        // The new chain is the face plus the H chains whose boundaries reduced its own
        let mut chain = WorkingColumn::new();
        chain.insert(position, (id, self.field.one()));
        for (partner, factor) in &chains_in_h {
            self.add_to_working(&mut chain, *partner, factor);
        }
        let cells = normalize(
            &self.field,
            chain
                .into_values()
                .map(|(row, value)| Cell::new(row, value))
                .collect(),
        );

        let index = self.columns.len();
        for cell in &cells {
            self.rows.link(cell.row, index);
        }
        self.columns
            .push(ChainColumn::new(&self.field, cells, id, dimension));
        self.pivot_to_column.insert(id, index);
        self.tracker.add(dimension);

        match chains_in_f.first().map(|(column, _)| *column) {
            None => {
                self.face_to_bar.insert(id, self.barcode.len());
                self.barcode.push(Bar::essential(dimension, position));
            }
            Some(youngest) => {
                self.fold_into_youngest(&chains_in_f)?;
                self.columns[youngest].set_paired_with(Some(index));
                self.columns[index].set_paired_with(Some(youngest));
                let birth = self.columns[youngest].pivot();
                match self.face_to_bar.get(&birth).copied() {
                    Some(bar) => {
                        self.barcode[bar].death = Some(position);
                        self.face_to_bar.insert(id, bar);
                    }
                    None => {
                        let birth_position = self.pivot_to_position[&birth];
                        let dimension = self.columns[youngest].dimension();
                        self.face_to_bar.insert(birth, self.barcode.len());
                        self.face_to_bar.insert(id, self.barcode.len());
                        self.barcode
                            .push(Bar::finite(dimension, birth_position, position));
                    }
                }
            }
        }
        trace!(
            "Inserted face {id} at {position}: {} chains in H, {} in F",
            chains_in_h.len(),
            chains_in_f.len()
        );
        Ok(position)
    }

    /// `working += factor * columns[column]`
    fn add_to_working(
        &self,
        working: &mut WorkingColumn<F::Coefficient>,
        column: Index,
        factor: &F::Coefficient,
    ) {
        for cell in self.columns[column].cells() {
            let position = self.pivot_to_position[&cell.row];
            let Some(scaled) = self.field.multiply(&cell.value, factor) else {
                continue;
            };
            match working.entry(position) {
                Entry::Vacant(entry) => {
                    entry.insert((cell.row, scaled));
                }
                Entry::Occupied(mut entry) => match self.field.add(&entry.get().1, &scaled) {
                    Some(sum) => entry.get_mut().1 = sum,
                    None => {
                        entry.remove();
                    }
                },
            }
        }
    }

    /// Replaces the youngest reducing F chain by `-sum(factor * f)`, the boundary of the new chain.
    fn fold_into_youngest(&mut self, chains_in_f: &[(Index, F::Coefficient)]) -> Result<(), PermatError> {
        let Some(((youngest, factor), others)) = chains_in_f.split_first() else {
            return Ok(());
        };
        let negated = self.field.additive_inverse(factor);
        if !self.field.is_one(&negated) {
            self.columns[*youngest].scale(
                &self.field,
                Some(&negated),
                &mut self.rows.observer(*youngest),
            )?;
        }
        for (other, factor) in others {
            let negated = self.field.additive_inverse(factor);
            let (target, source) = pair_mut(&mut self.columns, *youngest, *other);
            target.multiply_source_and_add(
                &self.field,
                source,
                Some(&negated),
                &mut self.rows.observer(*youngest),
            );
        }
        Ok(())
    }

    // ======== Removal ========================================

    /// Removes the face at the last position, which is always maximal.
    pub fn remove_last(&mut self) -> Result<(), PermatError> {
        let id = *self
            .position_to_pivot
            .last()
            .ok_or(PermatError::EmptyMatrix)?;
        let column = self.pivot_to_column[&id];

        let bar = self.face_to_bar.remove(&id);
        match self.columns[column].paired_with() {
            Some(partner) => {
                // The partner survives as an essential class
                self.columns[partner].set_paired_with(None);
                if let Some(bar) = bar {
                    self.barcode[bar].death = None;
                }
            }
            None => {
                if let Some(bar) = bar {
                    self.remove_bar(bar);
                }
            }
        }

        self.position_to_pivot.pop();
        self.pivot_to_position.remove(&id);
        self.pivot_to_column.remove(&id);
        self.tracker.remove(self.columns[column].dimension());
        for cell in self.columns[column].cells() {
            self.rows.unlink(cell.row, column);
        }

        self.columns.swap_remove(column);
        if let Some(moved) = self.columns.get(column) {
            let moved_from = self.columns.len();
            let (pivot, partner, rows) = (moved.pivot(), moved.paired_with(), moved.column().rows());
            self.pivot_to_column.insert(pivot, column);
            if let Some(partner) = partner {
                self.columns[partner].set_paired_with(Some(column));
            }
            for row in rows {
                self.rows.unlink(row, moved_from);
                self.rows.link(row, column);
            }
        }
        self.rows.erase_row(id);
        Ok(())
    }

    fn remove_bar(&mut self, bar: usize) {
        self.barcode.swap_remove(bar);
        if let Some(moved) = self.barcode.get(bar).copied() {
            self.face_to_bar
                .insert(self.position_to_pivot[moved.birth], bar);
            if let Some(death) = moved.death {
                self.face_to_bar
                    .insert(self.position_to_pivot[death], bar);
            }
        }
    }

    // ======== Queries ========================================

    pub fn get_column(&self, index: Index) -> Result<&ChainColumn<F, Col>, PermatError> {
        self.columns
            .get(index)
            .ok_or(PermatError::ColumnOutOfRange(index))
    }

    /// The face represented by a column.
    pub fn get_pivot(&self, index: Index) -> Result<ID, PermatError> {
        Ok(self.get_column(index)?.pivot())
    }

    pub fn get_column_with_pivot(&self, face: ID) -> Option<Index> {
        self.pivot_to_column.get(&face).copied()
    }

    pub fn get_column_dimension(&self, index: Index) -> Result<Dimension, PermatError> {
        Ok(self.get_column(index)?.dimension())
    }

    pub fn position_of(&self, face: ID) -> Option<Index> {
        self.pivot_to_position.get(&face).copied()
    }

    pub fn face_at(&self, position: Index) -> Option<ID> {
        self.position_to_pivot.get(position).copied()
    }

    pub fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn max_dimension(&self) -> Option<Dimension> {
        self.tracker.max_dimension()
    }

    pub fn is_zero_cell(&self, column: Index, row: ID) -> Result<bool, PermatError> {
        Ok(!self.get_column(column)?.is_non_zero(row))
    }

    /// Always `false` for a chain basis, kept for parity with the other matrices.
    pub fn is_zero_column(&self, column: Index) -> Result<bool, PermatError> {
        Ok(self.get_column(column)?.column().is_empty())
    }

    /// Bars between filtration positions.
    pub fn get_current_barcode(&self) -> &[Bar] {
        &self.barcode
    }

    /// Paired, with a partner earlier in the filtration.
    fn is_negative(&self, column: Index) -> bool {
        let chain = &self.columns[column];
        chain.paired_with().is_some_and(|partner| {
            self.pivot_to_position[&self.columns[partner].pivot()]
                < self.pivot_to_position[&chain.pivot()]
        })
    }

    // ======== Column operations ==============================

    fn check(&self, first: Index, second: Index) -> Result<(), PermatError> {
        for index in [first, second] {
            self.get_column(index)?;
        }
        if first == second {
            return Err(PermatError::SameColumn(first));
        }
        Ok(())
    }

    fn refresh_pivots(&mut self, columns: &[Index]) {
        for &column in columns {
            self.pivot_to_column
                .insert(self.columns[column].pivot(), column);
        }
    }

    /// `target += source`, exchanging pivots if the pivot of `target` cancels.
    pub fn add_to(&mut self, source: Index, target: Index) -> Result<(), PermatError> {
        self.check(source, target)?;
        let (target_chain, source_chain) = pair_mut(&mut self.columns, target, source);
        target_chain.add(&self.field, source_chain, &mut self.rows.observer(target));
        self.refresh_pivots(&[source, target]);
        Ok(())
    }

    /// `target = coefficient * target + source`, fails if `coefficient` annihilates the pivot of `target`.
    pub fn multiply_target_and_add_to(
        &mut self,
        source: Index,
        coefficient: &F::Coefficient,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check(source, target)?;
        let (target_chain, source_chain) = pair_mut(&mut self.columns, target, source);
        target_chain.multiply_target_and_add(
            &self.field,
            Some(coefficient),
            source_chain,
            &mut self.rows.observer(target),
        )?;
        self.refresh_pivots(&[source, target]);
        Ok(())
    }

    /// `target += coefficient * source`
    pub fn multiply_source_and_add_to(
        &mut self,
        coefficient: &F::Coefficient,
        source: Index,
        target: Index,
    ) -> Result<(), PermatError> {
        self.check(source, target)?;
        let (target_chain, source_chain) = pair_mut(&mut self.columns, target, source);
        target_chain.multiply_source_and_add(
            &self.field,
            source_chain,
            Some(coefficient),
            &mut self.rows.observer(target),
        );
        self.refresh_pivots(&[source, target]);
        Ok(())
    }

    // ======== Representative cycles ==========================

    /// Recomputes one cycle per chain of `F` and `G`, whose cells are face identifiers.
    pub fn update_representative_cycles(&mut self) {
        let cycles = (0..self.columns.len())
            .filter(|&column| !self.is_negative(column))
            .map(|column| {
                let chain = &self.columns[column];
                Cycle {
                    birth: self.pivot_to_position[&chain.pivot()],
                    dimension: chain.dimension(),
                    cells: chain.cells(),
                }
            })
            .collect();
        self.cycles.replace(cycles);
        debug!("Updated {} representative cycles", self.cycles.all().len());
    }

    /// As of the last [`ChainMatrix::update_representative_cycles`].
    pub fn get_representative_cycles(&self) -> &[Cycle<F::Coefficient>] {
        self.cycles.all()
    }

    pub fn get_representative_cycle(&self, bar: &Bar) -> Option<&Cycle<F::Coefficient>> {
        self.cycles.born_at(bar.birth)
    }
}

impl<F, Col> ChainMatrix<F, Col, Rows>
where
    F: CoefficientField,
    Col: Column<F>,
{
    /// Columns whose chain contains `face`, increasing.
    pub fn get_row(&self, face: ID) -> Vec<Index> {
        self.rows.row(face).collect()
    }
}

// ======== Vine swaps =========================================

impl<Col, R> ChainMatrix<Z2Field, Col, R>
where
    Col: Column<Z2Field>,
    R: RowAccess,
{
    /// Exchanges the faces of two columns, which must sit at adjacent positions.
    ///
    /// Returns the column now representing the face that moved to the later position.
    pub fn vine_swap(&mut self, first: Index, second: Index) -> Result<Index, PermatError> {
        self.swap_and_refresh(first, second, true)
    }

    /// As [`ChainMatrix::vine_swap`] when the later chain is known to contain the earlier face.
    pub fn vine_swap_with_z_eq_1_case(
        &mut self,
        first: Index,
        second: Index,
    ) -> Result<Index, PermatError> {
        self.swap_and_refresh(first, second, false)
    }

    /// Vine-swaps `face` to the end of the filtration and removes it.
    /// The face must have no coface.
    pub fn remove_maximal_face(&mut self, face: ID) -> Result<(), PermatError> {
        let position = self.position_of(face).ok_or(PermatError::UnknownFace(face))?;
        for next in position + 1..self.position_to_pivot.len() {
            let first = self.pivot_to_column[&face];
            let second = self.pivot_to_column[&self.position_to_pivot[next]];
            self.vine_swap(first, second)?;
        }
        self.remove_last()
    }

    fn swap_and_refresh(
        &mut self,
        first: Index,
        second: Index,
        check_trivial: bool,
    ) -> Result<Index, PermatError> {
        self.check(first, second)?;
        let position = |matrix: &Self, column: Index| {
            matrix.pivot_to_position[&matrix.columns[column].pivot()]
        };
        let (early, late) = match (position(self, first), position(self, second)) {
            (p, q) if q == p + 1 => (first, second),
            (p, q) if p == q + 1 => (second, first),
            _ => return Err(PermatError::NonContiguousSwap(first, second)),
        };
        let early_face = self.columns[early].pivot();
        let late_face = self.columns[late].pivot();
        let index = self.pivot_to_position[&early_face];
        let next = index + 1;

        let slots = (self.face_to_bar[&early_face], self.face_to_bar[&late_face]);
        let old_bars = (self.barcode[slots.0], self.barcode[slots.1]);

        if !check_trivial || self.columns[late].is_non_zero(early_face) {
            self.swap_cases(early, late)?;
        }

        self.pivot_to_position.insert(early_face, next);
        self.pivot_to_position.insert(late_face, index);
        self.position_to_pivot.swap(index, next);

        let new_bars = (self.bar_of(late_face), self.bar_of(early_face));
        let anchor = |bar: &Bar| {
            if bar.birth == index || bar.birth == next {
                bar.death
            } else {
                Some(bar.birth)
            }
        };
        let transposed = anchor(&old_bars.0) == anchor(&new_bars.1)
            && anchor(&old_bars.1) == anchor(&new_bars.0);
        let (first_bar, second_bar) = if transposed {
            (new_bars.1, new_bars.0)
        } else {
            new_bars
        };
        for (slot, bar) in [(slots.0, first_bar), (slots.1, second_bar)] {
            self.barcode[slot] = bar;
            self.face_to_bar
                .insert(self.position_to_pivot[bar.birth], slot);
            if let Some(death) = bar.death {
                self.face_to_bar
                    .insert(self.position_to_pivot[death], slot);
            }
        }
        Ok(self.pivot_to_column[&early_face])
    }

    /// Restores the basis when `late` contains the pivot of `early`.
    fn swap_cases(&mut self, early: Index, late: Index) -> Result<(), PermatError> {
        let early_partner = self.columns[early].paired_with();
        let late_partner = self.columns[late].paired_with();
        let pivot_position = |matrix: &Self, column: Index| {
            matrix.pivot_to_position[&matrix.columns[column].pivot()]
        };

        match (self.is_negative(early), self.is_negative(late)) {
            (false, false) => match (early_partner, late_partner) {
                (None, Some(_)) => {
                    trace!("Positive vine swap of {early} and {late}, F x G");
                    self.add_to(late, early)?;
                }
                (Some(early_partner), Some(late_partner)) => {
                    trace!("Positive vine swap of {early} and {late}, G x G");
                    if pivot_position(self, early_partner) < pivot_position(self, late_partner) {
                        self.add_to(early_partner, late_partner)?;
                        self.add_to(early, late)?;
                    } else {
                        self.add_to(late_partner, early_partner)?;
                        self.add_to(late, early)?;
                    }
                }
                _ => {
                    trace!("Positive vine swap of {early} and {late}");
                    self.add_to(early, late)?;
                }
            },
            (true, true) => {
                trace!("Negative vine swap of {early} and {late}");
                let (Some(early_partner), Some(late_partner)) = (early_partner, late_partner) else {
                    return Ok(());
                };
                if pivot_position(self, early_partner) < pivot_position(self, late_partner) {
                    self.add_to(early_partner, late_partner)?;
                    self.add_to(early, late)?;
                } else {
                    self.add_to(late_partner, early_partner)?;
                    self.add_to(late, early)?;
                }
            }
            (false, true) => {
                trace!("Positive-negative vine swap of {early} and {late}");
                self.add_to(early, late)?;
            }
            (true, false) => {
                trace!("Negative-positive vine swap of {early} and {late}");
                self.add_to(late, early)?;
            }
        }
        Ok(())
    }

    /// The bar with an endpoint at `face`, in positions.
    fn bar_of(&self, face: ID) -> Bar {
        let chain = &self.columns[self.pivot_to_column[&face]];
        let position = self.pivot_to_position[&face];
        match chain.paired_with() {
            None => Bar::essential(chain.dimension(), position),
            Some(partner) => {
                let partner = &self.columns[partner];
                let other = self.pivot_to_position[&partner.pivot()];
                if other < position {
                    Bar::finite(partner.dimension(), other, position)
                } else {
                    Bar::finite(chain.dimension(), position, other)
                }
            }
        }
    }
}

impl<F, Col, R> PersistenceMatrix<F> for ChainMatrix<F, Col, R>
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
        self.insert_boundary_with_id(self.next_id, boundary, dimension)
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
