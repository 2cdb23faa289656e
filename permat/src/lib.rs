//! Persistence matrices over finite fields.
//!
//! A boundary matrix is either reduced into an RU decomposition ([`matrices::RuMatrix`]),
//! maintained directly as a chain basis ([`matrices::ChainMatrix`]), or stored as-is and
//! reduced on demand ([`matrices::BaseMatrix`]).
//! The first two keep their barcode up to date through insertions, removals and vine swaps.

pub mod barcode;
pub mod columns;
pub mod cycles;
pub mod fields;
pub mod matrices;
pub mod reduction;
pub mod rows;

use thiserror::Error;

/// Position of a column (or row) inside a matrix.
pub type Index = usize;
/// Stable identifier of a face, independent of where its column currently lives.
pub type ID = usize;
pub type Dimension = usize;

// TODO: Vine swaps over Zp need the coefficient bookkeeping of the chain reduction

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermatError {
    #[error("Characteristic must be strictly positive")]
    NonPositiveCharacteristic,
    #[error("The given interval [{min}, {max}] is not valid.")]
    InvalidInterval { min: u32, max: u32 },
    #[error("The given interval [{min}, {max}] does not contain a prime number.")]
    NoPrimeInInterval { min: u32, max: u32 },
    #[error("Chain column {0} cannot be multiplied by zero")]
    ZeroChainMultiplier(Index),
    #[error("Pivot of column {0} is not invertible in the coefficient ring")]
    NonInvertiblePivot(Index),
    #[error("Column {0} does not exist")]
    ColumnOutOfRange(Index),
    #[error("Column {0} cannot be combined with itself")]
    SameColumn(Index),
    #[error("Column {0} comes after column {1} and cannot be added to it")]
    SourceAfterTarget(Index, Index),
    #[error("Column {0} can only be multiplied by an invertible coefficient")]
    NonInvertibleMultiplier(Index),
    #[error("Row {0} is not empty")]
    RowNotEmpty(Index),
    #[error("Face {0} is not part of the matrix")]
    UnknownFace(ID),
    #[error("Face {0} was already inserted")]
    DuplicateFace(ID),
    #[error("Columns {0} and {1} are not contiguous in the filtration")]
    NonContiguousSwap(Index, Index),
    #[error("The matrix is empty")]
    EmptyMatrix,
}

#[cfg(test)]
mod tests {
    use crate::PermatError;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PermatError::NonPositiveCharacteristic.to_string(),
            "Characteristic must be strictly positive"
        );
        assert_eq!(
            PermatError::NoPrimeInInterval { min: 24, max: 28 }.to_string(),
            "The given interval [24, 28] does not contain a prime number."
        );
        assert_eq!(
            PermatError::SameColumn(3).to_string(),
            "Column 3 cannot be combined with itself"
        );
    }
}
