//! Barcodes, as maintained by the matrices, and their read-outs.
//!
//! Matrices report bars between filtration positions.
//! [`filtration_bars`] maps them to filtration values and [`Diagram`] forgets the dimensions.

use ordered_float::NotNan;
use rustc_hash::FxHashSet;

use crate::{Dimension, Index, PermatError};

/// A persistence interval between two filtration positions, `death` is `None` for essential classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bar {
    pub dimension: Dimension,
    pub birth: Index,
    pub death: Option<Index>,
}

impl Bar {
    pub fn essential(dimension: Dimension, birth: Index) -> Self {
        Self {
            dimension,
            birth,
            death: None,
        }
    }

    pub fn finite(dimension: Dimension, birth: Index, death: Index) -> Self {
        Self {
            dimension,
            birth,
            death: Some(death),
        }
    }

    pub fn is_essential(&self) -> bool {
        self.death.is_none()
    }
}

/// A bar with its endpoints replaced by filtration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiltrationBar {
    pub dimension: Dimension,
    pub birth: NotNan<f64>,
    pub death: Option<NotNan<f64>>,
}

impl FiltrationBar {
    /// `None` for essential bars.
    pub fn persistence(&self) -> Option<f64> {
        self.death.map(|death| (death - self.birth).into_inner())
    }
}

/// Looks up the filtration value of both endpoints of every bar.
/// Finite bars whose endpoints share a filtration value are dropped.
pub fn filtration_bars(
    bars: &[Bar],
    filtration: &[NotNan<f64>],
) -> Result<Vec<FiltrationBar>, PermatError> {
    let value = |position: Index| {
        filtration
            .get(position)
            .copied()
            .ok_or(PermatError::ColumnOutOfRange(position))
    };

    let mut mapped = Vec::with_capacity(bars.len());
    for bar in bars {
        let birth = value(bar.birth)?;
        let death = bar.death.map(value).transpose()?;
        if death == Some(birth) {
            continue;
        }
        mapped.push(FiltrationBar {
            dimension: bar.dimension,
            birth,
            death,
        });
    }
    Ok(mapped)
}

#[derive(Debug, Clone)]
pub struct Diagram<T> {
    pub essential: FxHashSet<T>,
    pub pairings: FxHashSet<(T, T)>,
}

impl<T> Default for Diagram<T> {
    fn default() -> Self {
        Self {
            essential: FxHashSet::default(),
            pairings: FxHashSet::default(),
        }
    }
}

impl From<&[Bar]> for Diagram<Index> {
    fn from(bars: &[Bar]) -> Self {
        let mut diagram = Diagram::default();
        for bar in bars {
            match bar.death {
                None => {
                    diagram.essential.insert(bar.birth);
                }
                Some(death) => {
                    diagram.pairings.insert((bar.birth, death));
                }
            }
        }
        diagram
    }
}

#[cfg(test)]
mod tests {
    use ordered_float::NotNan;

    use crate::PermatError;

    use super::{filtration_bars, Bar, Diagram, FiltrationBar};

    fn values(values: &[f64]) -> Vec<NotNan<f64>> {
        values.iter().map(|&v| NotNan::new(v).unwrap()).collect()
    }

    #[test]
    fn test_zero_length_bars_are_dropped() {
        let filtration = values(&[0.0, 0.0, 1.0, 1.0]);
        let bars = vec![
            Bar::finite(0, 1, 2),
            Bar::finite(0, 2, 3),
            Bar::essential(0, 0),
        ];
        let mapped = filtration_bars(&bars, &filtration).unwrap();
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].persistence(), Some(1.0));
        assert_eq!(
            mapped[1],
            FiltrationBar {
                dimension: 0,
                birth: NotNan::new(0.0).unwrap(),
                death: None
            }
        );

        assert_eq!(
            filtration_bars(&[Bar::finite(1, 2, 7)], &filtration),
            Err(PermatError::ColumnOutOfRange(7))
        );
    }

    #[test]
    fn test_diagram_from_bars() {
        let bars = [Bar::finite(0, 1, 2), Bar::essential(0, 0)];
        let diagram = Diagram::from(&bars[..]);
        assert!(diagram.essential.contains(&0));
        assert!(diagram.pairings.contains(&(1, 2)));
        assert_eq!(diagram.pairings.len(), 1);
    }
}
