use proptest::prelude::*;

use crate::columns::{
    Cell, CellObserver, Column, HeapColumn, IntoBoundary, IntrusiveListColumn,
    IntrusiveSetColumn, ListColumn, SetColumn, VectorColumn,
};
use crate::fields::{CoefficientField, NonZeroCoefficient, Z2Field, ZpField, Z2, Z5};
use crate::Index;

#[derive(Debug, Default)]
struct Recorder {
    inserted: Vec<Index>,
    removed: Vec<Index>,
}

impl CellObserver for Recorder {
    fn inserted(&mut self, row: Index) {
        self.inserted.push(row);
    }

    fn removed(&mut self, row: Index) {
        self.removed.push(row);
    }
}

impl Recorder {
    fn sorted(mut self) -> (Vec<Index>, Vec<Index>) {
        self.inserted.sort();
        self.removed.sort();
        (self.inserted, self.removed)
    }
}

fn z2_column<Col: Column<Z2Field>>(rows: Vec<Index>) -> Col {
    let field = Z2Field::new();
    Col::from_cells(&field, rows.into_cells(&field))
}

fn z5_column<Col: Column<ZpField<5>>>(cells: Vec<(Index, u64)>) -> Col {
    let field = ZpField::<5>::new();
    Col::from_cells(&field, cells.into_cells(&field))
}

fn z5_values<Col: Column<ZpField<5>>>(column: &Col) -> Vec<(Index, u32)> {
    column
        .cells()
        .into_iter()
        .map(|cell| (cell.row, cell.value.value()))
        .collect()
}

fn z2_cells(rows: Vec<Index>) -> Vec<Cell<Z2>> {
    rows.into_cells(&Z2Field::new())
}

fn z5_cells_of(cells: Vec<(Index, u64)>) -> Vec<Cell<Z5>> {
    cells.into_cells(&ZpField::<5>::new())
}

fn z5(value: u64) -> Z5 {
    Z5::from_integer(value).unwrap()
}

macro_rules! column_tests {
    ($name:ident, $column:ident) => {
        mod $name {
            use super::*;

            type Z2Col = $column<Z2Field>;
            type Z5Col = $column<ZpField<5>>;

            #[test]
            fn test_xor_addition() {
                let field = Z2Field::new();
                let mut column: Z2Col = z2_column(vec![0, 2, 5]);
                let other = z2_cells(vec![2, 3]);

                assert!(!column.add(&field, &other, &mut ()));
                assert_eq!(column.rows(), vec![0, 3, 5]);
                assert_eq!(column.pivot(), Some(5));

                let pivot_row = z2_cells(vec![5]);
                assert!(column.add(&field, &pivot_row, &mut ()));
                assert_eq!(column.pivot(), Some(3));
                assert_eq!(column.len(), 2);
            }

            #[test]
            fn test_boundary_is_normalised() {
                let column: Z5Col = z5_column(vec![(4, 2), (1, 3), (4, 1), (2, 7), (0, 5)]);
                assert_eq!(z5_values(&column), vec![(1, 3), (2, 2), (4, 3)]);
                assert_eq!(column.pivot(), Some(4));
                assert_eq!(column.pivot_value(), Some(z5(3)));
                assert_eq!(column.value_at(2), Some(z5(2)));
                assert_eq!(column.value_at(3), None);
                assert!(!column.is_non_zero(0));
            }

            #[test]
            fn test_scaled_addition_reports_rows() {
                let field = ZpField::<5>::new();
                let mut column: Z5Col = z5_column(vec![(1, 3), (2, 2), (4, 3)]);
                let other = z5_cells_of(vec![(2, 4), (3, 1)]);
                let mut recorder = Recorder::default();

                // 2 + 2 * 4 = 0 (mod 5)
                column.add_scaled(&field, &other, &z5(2), &mut recorder);
                assert_eq!(z5_values(&column), vec![(1, 3), (3, 2), (4, 3)]);
                assert_eq!(recorder.sorted(), (vec![3], vec![2]));

                column.scale(&field, &z5(2), &mut ());
                assert_eq!(z5_values(&column), vec![(1, 1), (3, 4), (4, 1)]);
            }

            #[test]
            fn test_multiply_and_add() {
                let field = ZpField::<5>::new();
                let mut column: Z5Col = z5_column(vec![(0, 1)]);

                let other = z5_cells_of(vec![(0, 2), (1, 1)]);
                column.multiply_and_add(&field, Some(&z5(3)), &other, &mut ());
                assert_eq!(z5_values(&column), vec![(1, 1)]);

                let other = z5_cells_of(vec![(2, 1)]);
                column.multiply_and_add(&field, None, &other, &mut ());
                assert_eq!(z5_values(&column), vec![(2, 1)]);

                column.multiply_and_add_scaled(&field, &other, Some(&z5(4)), &mut ());
                assert!(column.is_empty());
                assert_eq!(column.pivot(), None);
            }

            #[test]
            fn test_clear_row_and_reorder() {
                let mut column: Z2Col = z2_column(vec![1, 3, 6]);
                let mut recorder = Recorder::default();
                assert!(column.clear_row(3, &mut recorder));
                assert!(!column.clear_row(3, &mut recorder));
                assert_eq!(recorder.sorted(), (vec![], vec![3]));

                column.reorder(|row| 10 - row);
                assert_eq!(column.rows(), vec![4, 9]);
                assert_eq!(column.pivot(), Some(9));

                let mut recorder = Recorder::default();
                column.clear(&mut recorder);
                assert!(column.is_empty());
                assert_eq!(recorder.sorted(), (vec![], vec![4, 9]));
            }

            #[test]
            fn test_lexicographic_order() {
                let field = Z2Field::new();
                let small: Z2Col = z2_column(vec![0, 1]);
                let large: Z2Col = z2_column(vec![0, 2]);
                assert!(small < large);
                assert!(z2_column::<Z2Col>(vec![1]) > z2_column::<Z2Col>(vec![0, 5]));

                let mut built: Z2Col = z2_column(vec![0, 1, 2]);
                let other = z2_cells(vec![2]);
                built.add(&field, &other, &mut ());
                assert_eq!(built, small);
            }
        }
    };
}

column_tests!(vector, VectorColumn);
column_tests!(list, ListColumn);
column_tests!(set, SetColumn);
column_tests!(heap, HeapColumn);
column_tests!(intrusive_list, IntrusiveListColumn);
column_tests!(intrusive_set, IntrusiveSetColumn);

// ======== Properties shared by all backings ==================

fn check_self_inverse<Col: Column<Z2Field> + PartialEq>(
    rows: Vec<Index>,
    other: Vec<Index>,
) -> Result<(), TestCaseError> {
    let field = Z2Field::new();
    let original: Col = z2_column(rows);
    let other = other.into_cells(&field);
    let mut column = original.clone();
    column.add(&field, &other, &mut ());
    column.add(&field, &other, &mut ());
    prop_assert_eq!(column.cells(), original.cells());
    prop_assert!(column == original);
    Ok(())
}

fn check_agrees_with_vector<Col: Column<ZpField<5>>>(
    cells: Vec<(Index, u64)>,
    other: Vec<(Index, u64)>,
    factor: u64,
) -> Result<(), TestCaseError> {
    let field = ZpField::<5>::new();
    let other = other.into_cells(&field);
    let mut expected: VectorColumn<_> = z5_column(cells.clone());
    let mut column: Col = z5_column(cells);
    let mut expected_events = Recorder::default();
    let mut events = Recorder::default();

    if let Some(factor) = field.from_integer(factor) {
        expected.add_scaled(&field, &other, &factor, &mut expected_events);
        column.add_scaled(&field, &other, &factor, &mut events);
        expected.scale(&field, &factor, &mut ());
        column.scale(&field, &factor, &mut ());
    }
    prop_assert_eq!(column.cells(), expected.cells());
    prop_assert_eq!(column.pivot(), expected.pivot());
    prop_assert_eq!(events.sorted(), expected_events.sorted());
    Ok(())
}

fn rows() -> impl Strategy<Value = Vec<Index>> {
    proptest::collection::vec(0..30_usize, 0..15)
}

fn z5_cells() -> impl Strategy<Value = Vec<(Index, u64)>> {
    proptest::collection::vec((0..30_usize, 0..5_u64), 0..15)
}

proptest! {
    #[test]
    fn test_z2_addition_is_self_inverse(a in rows(), b in rows()) {
        check_self_inverse::<VectorColumn<Z2Field>>(a.clone(), b.clone())?;
        check_self_inverse::<ListColumn<Z2Field>>(a.clone(), b.clone())?;
        check_self_inverse::<SetColumn<Z2Field>>(a.clone(), b.clone())?;
        check_self_inverse::<HeapColumn<Z2Field>>(a.clone(), b.clone())?;
        check_self_inverse::<IntrusiveListColumn<Z2Field>>(a.clone(), b.clone())?;
        check_self_inverse::<IntrusiveSetColumn<Z2Field>>(a, b)?;
    }

    #[test]
    fn test_backings_agree(a in z5_cells(), b in z5_cells(), factor in 0..5_u64) {
        check_agrees_with_vector::<ListColumn<_>>(a.clone(), b.clone(), factor)?;
        check_agrees_with_vector::<SetColumn<_>>(a.clone(), b.clone(), factor)?;
        check_agrees_with_vector::<HeapColumn<_>>(a.clone(), b.clone(), factor)?;
        check_agrees_with_vector::<IntrusiveListColumn<_>>(a.clone(), b.clone(), factor)?;
        check_agrees_with_vector::<IntrusiveSetColumn<_>>(a, b, factor)?;
    }
}
