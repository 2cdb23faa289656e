//! Traits for types that represent non-zero coefficients in a matrix, and the field contexts combining them.
//! Prime fields are provided as const generics ([`ZP`]), the multi-field is configured at runtime ([`MultiField`]).

mod element;
mod multi_field;

pub use element::FieldElement;
pub use multi_field::MultiField;

use std::fmt::Debug;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::ops::{Add, Mul};

use num::BigUint;

/// Ensure that you are unable to construct an element that represents `0`.
/// Instead, `0` will be represented by the absence of a cell.
/// We avoid requiring an element for `0` to make [`Z2`] calculations more efficient.
pub trait NonZeroCoefficient:
    Eq
    + Ord
    + Sized
    + Copy
    + Debug
    + Add<Option<Self>, Output = Option<Self>>
    + Add<Self, Output = Option<Self>>
    + Mul<Self, Output = Self>
{
    fn one() -> Self;
    fn additive_inverse(self) -> Self;
    fn characteristic() -> u32;
    /// Reduces `value` modulo the characteristic, `None` if it vanishes.
    fn from_integer(value: u64) -> Option<Self>;
    fn value(self) -> u32;
}

pub trait Invertible: NonZeroCoefficient {
    fn inverse(self) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Z2;

impl Add<Z2> for Z2 {
    type Output = Option<Z2>;

    fn add(self, _rhs: Z2) -> Self::Output {
        None
    }
}

impl Mul<Z2> for Z2 {
    type Output = Z2;

    // 1 * 1 = 1
    fn mul(self, _rhs: Z2) -> Self::Output {
        Z2
    }
}

impl Invertible for Z2 {
    fn inverse(self) -> Self {
        Self
    }
}

macro_rules! impl_add_options {
    ($cf:ty $(, $p:ident)?) => {
        impl$(<const $p: u32>)? Add<Option<$cf>> for $cf {
            type Output = Option<$cf>;

            fn add(self, rhs: Option<$cf>) -> Self::Output {
                match rhs {
                    None => Some(self),
                    Some(rhs) => self + rhs,
                }
            }
        }
    };
}

impl_add_options!(Z2);

impl NonZeroCoefficient for Z2 {
    fn one() -> Self {
        Self
    }

    fn additive_inverse(self) -> Self {
        Self
    }

    fn characteristic() -> u32 {
        2
    }

    fn from_integer(value: u64) -> Option<Self> {
        (value % 2 == 1).then_some(Z2)
    }

    fn value(self) -> u32 {
        1
    }
}

/// Const generic struct for the finite field `Z_p`.
/// Should ensure that `p` is prime, products are computed in `u64` so any `p < 2^32` fits.
/// For `p=2` prefer [`Z2`], which stores nothing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZP<const P: u32>(NonZeroU32);

impl<const P: u32> Debug for ZP<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<const P: u32> Add<ZP<P>> for ZP<P> {
    type Output = Option<ZP<P>>;

    fn add(self, rhs: ZP<P>) -> Self::Output {
        let result = (u64::from(self.0.get()) + u64::from(rhs.0.get())) % u64::from(P);
        Some(ZP(NonZeroU32::new(result as u32)?))
    }
}

impl_add_options!(ZP<P>, P);

impl<const P: u32> Mul<ZP<P>> for ZP<P> {
    type Output = ZP<P>;

    fn mul(self, rhs: ZP<P>) -> Self::Output {
        let product = (u64::from(self.0.get()) * u64::from(rhs.0.get())) % u64::from(P);
        ZP(NonZeroU32::new(product as u32)
            .expect("Product of two non-zero should be non-zero, is P prime?"))
    }
}

impl<const P: u32> NonZeroCoefficient for ZP<P> {
    fn one() -> Self {
        Self(NonZeroU32::MIN)
    }

    fn additive_inverse(self) -> Self {
        // 0 < self < P so P - self is in the same range
        Self(NonZeroU32::new(P - self.0.get()).unwrap_or(NonZeroU32::MIN))
    }

    fn characteristic() -> u32 {
        P
    }

    fn from_integer(value: u64) -> Option<Self> {
        let reduced = value % u64::from(P);
        Some(Self(NonZeroU32::new(reduced as u32)?))
    }

    fn value(self) -> u32 {
        self.0.get()
    }
}

impl<const P: u32> Invertible for ZP<P> {
    // Fermat's little theorem: x^(p-2) = x^(-1)
    fn inverse(self) -> Self {
        let modulus = u64::from(P);
        let mut base = u64::from(self.0.get());
        let mut exponent = P - 2;
        let mut result = 1_u64;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result * base % modulus;
            }
            base = base * base % modulus;
            exponent >>= 1;
        }
        Self(NonZeroU32::new(result as u32).unwrap_or(NonZeroU32::MIN))
    }
}

pub type Z3 = ZP<3>;
pub type Z5 = ZP<5>;
pub type Z7 = ZP<7>;
pub type Z11 = ZP<11>;
pub type Z13 = ZP<13>;

// ======== Field contexts =====================================

/// Arithmetic on non-zero coefficients, performed through a context value.
/// Columns never store a zero, so every operation that can cancel returns an [`Option`].
pub trait CoefficientField: Clone + Debug {
    type Coefficient: Clone + Eq + Ord + Debug;

    fn one(&self) -> Self::Coefficient;
    fn add(&self, lhs: &Self::Coefficient, rhs: &Self::Coefficient) -> Option<Self::Coefficient>;
    /// Can only vanish in rings with zero divisors, i.e. the [`MultiField`].
    fn multiply(&self, lhs: &Self::Coefficient, rhs: &Self::Coefficient)
        -> Option<Self::Coefficient>;
    fn additive_inverse(&self, value: &Self::Coefficient) -> Self::Coefficient;
    /// `None` when `value` is not a unit.
    fn inverse(&self, value: &Self::Coefficient) -> Option<Self::Coefficient>;
    fn characteristic(&self) -> BigUint;
    fn from_integer(&self, value: u64) -> Option<Self::Coefficient>;
    fn to_integer(&self, value: &Self::Coefficient) -> BigUint;

    fn is_one(&self, value: &Self::Coefficient) -> bool {
        *value == self.one()
    }

    fn subtract(
        &self,
        lhs: &Self::Coefficient,
        rhs: &Self::Coefficient,
    ) -> Option<Self::Coefficient> {
        self.add(lhs, &self.additive_inverse(rhs))
    }

    fn add_options(
        &self,
        lhs: Option<&Self::Coefficient>,
        rhs: Option<&Self::Coefficient>,
    ) -> Option<Self::Coefficient> {
        match (lhs, rhs) {
            (None, None) => None,
            (Some(value), None) | (None, Some(value)) => Some(value.clone()),
            (Some(lhs), Some(rhs)) => self.add(lhs, rhs),
        }
    }

    /// The multiple `c` with `value + c * pivot = 0`, `None` if `pivot` is not invertible.
    fn cancelling_factor(
        &self,
        value: &Self::Coefficient,
        pivot: &Self::Coefficient,
    ) -> Option<Self::Coefficient> {
        let inverse = self.inverse(pivot)?;
        self.multiply(&self.additive_inverse(value), &inverse)
    }
}

/// Lifts a [`NonZeroCoefficient`] type to a zero-sized field context.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StaticField<CF>(PhantomData<CF>);

impl<CF> StaticField<CF> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<CF> Default for StaticField<CF> {
    fn default() -> Self {
        Self::new()
    }
}

impl<CF: NonZeroCoefficient> Debug for StaticField<CF> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Z{}", CF::characteristic())
    }
}

impl<CF: NonZeroCoefficient + Invertible> CoefficientField for StaticField<CF> {
    type Coefficient = CF;

    fn one(&self) -> CF {
        CF::one()
    }

    fn add(&self, lhs: &CF, rhs: &CF) -> Option<CF> {
        *lhs + *rhs
    }

    fn multiply(&self, lhs: &CF, rhs: &CF) -> Option<CF> {
        Some(*lhs * *rhs)
    }

    fn additive_inverse(&self, value: &CF) -> CF {
        value.additive_inverse()
    }

    fn inverse(&self, value: &CF) -> Option<CF> {
        Some(value.inverse())
    }

    fn characteristic(&self) -> BigUint {
        BigUint::from(CF::characteristic())
    }

    fn from_integer(&self, value: u64) -> Option<CF> {
        CF::from_integer(value)
    }

    fn to_integer(&self, value: &CF) -> BigUint {
        BigUint::from(value.value())
    }
}

pub type Z2Field = StaticField<Z2>;
pub type ZpField<const P: u32> = StaticField<ZP<P>>;

#[cfg(test)]
mod tests {

    use std::num::NonZeroU32;

    use num::BigUint;
    use rstest::rstest;

    use crate::fields::{
        CoefficientField, Invertible, NonZeroCoefficient, Z2Field, Z3, Z5, Z7, ZpField, ZP,
    };

    use super::Z2;

    #[test]
    fn test_add_mod_2() {
        assert_eq!(Z2 + Z2, None);
        assert_eq!(Z2 + None, Some(Z2));
    }

    #[test]
    fn test_prod_mod_2() {
        assert_eq!(Z2 * Z2, Z2);
    }

    #[test]
    fn test_add_mod_3() {
        assert_eq!(
            Z3::one() + Z3::one(),
            Some(ZP::<3>(NonZeroU32::new(2).unwrap()))
        );
        let two = Z3::one() + Z3::one();
        assert_eq!(Z3::one() + two, None);
    }

    #[test]
    fn test_prod_mod_3() {
        let two = (Z3::one() + Z3::one()).unwrap();
        let one = Z3::one();
        assert_eq!(two * one, two);
        assert_eq!(one * two, two);
        assert_eq!(two * two, one);
        assert_eq!(one * one, one);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 4)]
    #[case(3, 5)]
    #[case(6, 6)]
    fn test_inverse_mod_7(#[case] value: u64, #[case] inverse: u64) {
        let value = Z7::from_integer(value).unwrap();
        assert_eq!(value.inverse(), Z7::from_integer(inverse).unwrap());
        assert_eq!(value * value.inverse(), Z7::one());
    }

    #[test]
    fn test_large_prime_does_not_overflow() {
        let field = ZpField::<2_147_483_647>::new();
        let big = field.from_integer(2_147_483_646).unwrap();
        // (-1) * (-1) = 1
        assert_eq!(field.multiply(&big, &big), Some(field.one()));
        assert_eq!(field.add(&big, &field.one()), None);
    }

    #[test]
    fn test_static_field_context() {
        let field = ZpField::<5>::new();
        let two = field.from_integer(7).unwrap();
        assert_eq!(field.to_integer(&two), BigUint::from(2_u32));
        assert_eq!(field.characteristic(), BigUint::from(5_u32));
        assert_eq!(field.subtract(&two, &two), None);
        assert_eq!(field.from_integer(10), None);
        let factor = field.cancelling_factor(&two, &Z5::from_integer(3).unwrap()).unwrap();
        // 2 + c * 3 = 0 (mod 5) => c = 1
        assert_eq!(factor, Z5::one());

        let z2 = Z2Field::new();
        assert_eq!(z2.add_options(Some(&Z2), None), Some(Z2));
        assert_eq!(z2.add_options(Some(&Z2), Some(&Z2)), None);
        assert_eq!(z2.cancelling_factor(&Z2, &Z2), Some(Z2));
    }
}
