use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num::{BigUint, Zero};

use super::CoefficientField;

/// A possibly-zero element of a coefficient field, carrying the context it lives in.
///
/// Columns only ever store the non-zero [`CoefficientField::Coefficient`]s;
/// this type is the user-facing arithmetic on top of them.
#[derive(Clone)]
pub struct FieldElement<F: CoefficientField> {
    pub(crate) field: F,
    pub(crate) value: Option<F::Coefficient>,
}

impl<F: CoefficientField> FieldElement<F> {
    /// `value` is reduced modulo the characteristic.
    pub fn new(field: F, value: u64) -> Self {
        let value = field.from_integer(value);
        Self { field, value }
    }

    pub fn from_coefficient(field: F, value: Option<F::Coefficient>) -> Self {
        Self { field, value }
    }

    pub fn coefficient(&self) -> Option<&F::Coefficient> {
        self.value.as_ref()
    }

    pub fn into_coefficient(self) -> Option<F::Coefficient> {
        self.value
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_none()
    }

    pub fn additive_identity(&self) -> Self {
        Self::from_coefficient(self.field.clone(), None)
    }

    pub fn multiplicative_identity(&self) -> Self {
        let one = self.field.one();
        Self::from_coefficient(self.field.clone(), Some(one))
    }

    /// Zero when the element is not invertible.
    pub fn inverse(&self) -> Self {
        let inverse = self.value.as_ref().and_then(|v| self.field.inverse(v));
        Self::from_coefficient(self.field.clone(), inverse)
    }

    pub fn characteristic(&self) -> BigUint {
        self.field.characteristic()
    }

    pub fn value(&self) -> BigUint {
        self.value
            .as_ref()
            .map(|v| self.field.to_integer(v))
            .unwrap_or_else(BigUint::zero)
    }
}

impl<F: CoefficientField> PartialEq for FieldElement<F> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<F: CoefficientField> Eq for FieldElement<F> {}

impl<F: CoefficientField> Debug for FieldElement<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (mod {})", self.value(), self.characteristic())
    }
}

impl<F: CoefficientField> Display for FieldElement<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl<F: CoefficientField> AddAssign<&FieldElement<F>> for FieldElement<F> {
    fn add_assign(&mut self, rhs: &FieldElement<F>) {
        self.value = self
            .field
            .add_options(self.value.as_ref(), rhs.value.as_ref());
    }
}

impl<F: CoefficientField> SubAssign<&FieldElement<F>> for FieldElement<F> {
    fn sub_assign(&mut self, rhs: &FieldElement<F>) {
        let negated = rhs.value.as_ref().map(|v| self.field.additive_inverse(v));
        self.value = self.field.add_options(self.value.as_ref(), negated.as_ref());
    }
}

impl<F: CoefficientField> MulAssign<&FieldElement<F>> for FieldElement<F> {
    fn mul_assign(&mut self, rhs: &FieldElement<F>) {
        self.value = match (&self.value, &rhs.value) {
            (Some(lhs), Some(rhs)) => self.field.multiply(lhs, rhs),
            _ => None,
        };
    }
}

macro_rules! impl_by_value_ops {
    ($assign_trait:ident, $assign_fn:ident, $op_trait:ident, $op_fn:ident) => {
        impl<F: CoefficientField> $assign_trait<FieldElement<F>> for FieldElement<F> {
            fn $assign_fn(&mut self, rhs: FieldElement<F>) {
                self.$assign_fn(&rhs);
            }
        }

        impl<F: CoefficientField> $op_trait<FieldElement<F>> for FieldElement<F> {
            type Output = FieldElement<F>;

            fn $op_fn(mut self, rhs: FieldElement<F>) -> Self::Output {
                self.$assign_fn(&rhs);
                self
            }
        }

        impl<F: CoefficientField> $op_trait<&FieldElement<F>> for &FieldElement<F> {
            type Output = FieldElement<F>;

            fn $op_fn(self, rhs: &FieldElement<F>) -> Self::Output {
                let mut result = self.clone();
                result.$assign_fn(rhs);
                result
            }
        }
    };
}

impl_by_value_ops!(AddAssign, add_assign, Add, add);
impl_by_value_ops!(SubAssign, sub_assign, Sub, sub);
impl_by_value_ops!(MulAssign, mul_assign, Mul, mul);

impl<F: CoefficientField> Neg for FieldElement<F> {
    type Output = FieldElement<F>;

    fn neg(self) -> Self::Output {
        let value = self.value.as_ref().map(|v| self.field.additive_inverse(v));
        Self::from_coefficient(self.field, value)
    }
}

#[cfg(test)]
mod tests {
    use num::BigUint;

    use crate::fields::{FieldElement, Z2Field, ZpField};

    #[test]
    fn test_z2_elements() {
        let one = FieldElement::new(Z2Field::new(), 1);
        let zero = one.additive_identity();
        assert_eq!(&one + &one, zero);
        assert_eq!(&one * &one, one);
        assert_eq!(&one * &zero, zero);
        assert_eq!(one.inverse(), one);
        assert_eq!(zero.inverse(), zero);
        assert_eq!(one.characteristic(), BigUint::from(2_u32));
    }

    #[test]
    fn test_zp_compound_assignment() {
        let field = ZpField::<7>::new();
        let mut a = FieldElement::new(field, 5);
        a += FieldElement::new(field, 4);
        assert_eq!(a.value(), BigUint::from(2_u32));
        a -= FieldElement::new(field, 3);
        assert_eq!(a.value(), BigUint::from(6_u32));
        a *= FieldElement::new(field, 3);
        assert_eq!(a.value(), BigUint::from(4_u32));
        assert_eq!(-a.clone() + a.clone(), a.additive_identity());
        assert_eq!(&a * &a.inverse(), a.multiplicative_identity());
        assert_eq!(format!("{a}"), "4");
    }
}
