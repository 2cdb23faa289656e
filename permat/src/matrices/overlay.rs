use rustc_hash::FxHashMap;

use crate::barcode::Bar;
use crate::columns::{Cell, ChainColumn, Column, IntoBoundary};
use crate::fields::{CoefficientField, Z2Field};
use crate::rows::RowAccess;
use crate::{Dimension, Index, PermatError, ID};

use super::{ChainMatrix, RuMatrix};

/// Addresses the faces of a matrix by identifier instead of by position.
///
/// An RU matrix stores faces in filtration order, so the overlay translates identifiers to
/// positions and follows the faces through vine swaps.
/// A chain matrix already works with identifiers and the overlay forwards to it.
#[derive(Debug, Clone)]
pub struct IdToIndexOverlay<M> {
    matrix: M,
    id_to_index: FxHashMap<ID, Index>,
    index_to_id: Vec<ID>,
}

impl<M> IdToIndexOverlay<M> {
    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn index_of(&self, id: ID) -> Result<Index, PermatError> {
        self.id_to_index
            .get(&id)
            .copied()
            .ok_or(PermatError::UnknownFace(id))
    }

    pub fn id_at(&self, index: Index) -> Option<ID> {
        self.index_to_id.get(index).copied()
    }

    fn wrap(matrix: M) -> Self {
        Self {
            matrix,
            id_to_index: FxHashMap::default(),
            index_to_id: vec![],
        }
    }
}

// ======== Over an RU matrix ==================================

impl<F, Col, R> IdToIndexOverlay<RuMatrix<F, Col, R>>
where
    F: CoefficientField,
    Col: Column<F>,
    R: RowAccess,
{
    pub fn new(field: F) -> Self {
        Self::wrap(RuMatrix::new(field))
    }

    /// Appends face `id`, whose boundary is given in face identifiers.
    pub fn insert_boundary<B: IntoBoundary<F>>(
        &mut self,
        id: ID,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError> {
        if self.id_to_index.contains_key(&id) {
            return Err(PermatError::DuplicateFace(id));
        }
        let mut cells = vec![];
        for cell in boundary.into_cells(self.matrix.field()) {
            cells.push(Cell::new(self.index_of(cell.row)?, cell.value));
        }
        let index = self.matrix.insert_boundary_with_dimension(cells, dimension)?;
        self.id_to_index.insert(id, index);
        self.index_to_id.push(id);
        Ok(index)
    }

    /// Column of `R` for face `id`, its rows are positions.
    pub fn get_column(&self, id: ID) -> Result<&Col, PermatError> {
        self.matrix.get_column(self.index_of(id)?)
    }

    pub fn remove_last(&mut self) -> Result<(), PermatError> {
        self.matrix.remove_last()?;
        if let Some(id) = self.index_to_id.pop() {
            self.id_to_index.remove(&id);
        }
        Ok(())
    }

    pub fn get_current_barcode(&self) -> &[Bar] {
        self.matrix.get_current_barcode()
    }
}

impl<Col, R> IdToIndexOverlay<RuMatrix<Z2Field, Col, R>>
where
    Col: Column<Z2Field>,
    R: RowAccess,
{
    /// Exchanges two faces at adjacent positions.
    /// Returns `true` if both faces kept their partner.
    pub fn vine_swap(&mut self, first: ID, second: ID) -> Result<bool, PermatError> {
        let (first_index, second_index) = (self.index_of(first)?, self.index_of(second)?);
        let index = first_index.min(second_index);
        if first_index.abs_diff(second_index) != 1 {
            return Err(PermatError::NonContiguousSwap(first_index, second_index));
        }
        let transposed = self.matrix.vine_swap(index)?;
        self.exchange(index);
        Ok(transposed)
    }

    pub fn remove_maximal_face(&mut self, id: ID) -> Result<(), PermatError> {
        let position = self.index_of(id)?;
        for index in position..self.index_to_id.len() - 1 {
            self.matrix.vine_swap(index)?;
            self.exchange(index);
        }
        self.remove_last()
    }

    fn exchange(&mut self, index: Index) {
        self.index_to_id.swap(index, index + 1);
        self.id_to_index.insert(self.index_to_id[index], index);
        self.id_to_index
            .insert(self.index_to_id[index + 1], index + 1);
    }
}

// ======== Over a chain matrix ================================

impl<F, Col, R> IdToIndexOverlay<ChainMatrix<F, Col, R>>
where
    F: CoefficientField,
    Col: Column<F>,
    R: RowAccess,
{
    pub fn new(field: F) -> Self {
        Self::wrap(ChainMatrix::new(field))
    }

    /// Appends face `id`, whose boundary is given in face identifiers.
    pub fn insert_boundary<B: IntoBoundary<F>>(
        &mut self,
        id: ID,
        boundary: B,
        dimension: Option<Dimension>,
    ) -> Result<Index, PermatError> {
        let position = self.matrix.insert_boundary_with_id(id, boundary, dimension)?;
        self.id_to_index.insert(id, position);
        self.index_to_id.push(id);
        Ok(position)
    }

    /// The chain representing face `id`.
    pub fn get_column(&self, id: ID) -> Result<&ChainColumn<F, Col>, PermatError> {
        let column = self
            .matrix
            .get_column_with_pivot(id)
            .ok_or(PermatError::UnknownFace(id))?;
        self.matrix.get_column(column)
    }

    pub fn remove_last(&mut self) -> Result<(), PermatError> {
        self.matrix.remove_last()?;
        if let Some(id) = self.index_to_id.pop() {
            self.id_to_index.remove(&id);
        }
        Ok(())
    }

    pub fn get_current_barcode(&self) -> &[Bar] {
        self.matrix.get_current_barcode()
    }
}

impl<Col, R> IdToIndexOverlay<ChainMatrix<Z2Field, Col, R>>
where
    Col: Column<Z2Field>,
    R: RowAccess,
{
    /// Exchanges two faces at adjacent positions.
    /// Returns `true` if both faces kept their partner.
    pub fn vine_swap(&mut self, first: ID, second: ID) -> Result<bool, PermatError> {
        let (first_index, second_index) = (self.index_of(first)?, self.index_of(second)?);
        let early = if first_index < second_index {
            first
        } else {
            second
        };
        let column_of = |matrix: &ChainMatrix<Z2Field, Col, R>, id: ID| {
            matrix
                .get_column_with_pivot(id)
                .ok_or(PermatError::UnknownFace(id))
        };
        let before = column_of(&self.matrix, early)?;
        let after = self
            .matrix
            .vine_swap(column_of(&self.matrix, first)?, column_of(&self.matrix, second)?)?;

        let index = first_index.min(second_index);
        self.index_to_id.swap(index, index + 1);
        self.id_to_index.insert(self.index_to_id[index], index);
        self.id_to_index
            .insert(self.index_to_id[index + 1], index + 1);
        Ok(before == after)
    }

    pub fn remove_maximal_face(&mut self, id: ID) -> Result<(), PermatError> {
        let position = self.index_of(id)?;
        self.matrix.remove_maximal_face(id)?;
        self.index_to_id.remove(position);
        self.id_to_index.remove(&id);
        for (index, &other) in self.index_to_id.iter().enumerate().skip(position) {
            self.id_to_index.insert(other, index);
        }
        Ok(())
    }
}
