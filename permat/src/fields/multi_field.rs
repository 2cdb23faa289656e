//! Simultaneous arithmetic over every prime field `Z_p` with `p` in a configured interval.
//! Elements live in `Z_M` where `M` is the product of those primes, the CRT partials recover each factor.

use std::fmt::Debug;
use std::rc::Rc;

use log::debug;
use num::{BigInt, BigUint, Integer, One, Zero};

use crate::PermatError;

use super::{CoefficientField, FieldElement};

struct MultiFieldContext {
    primes: Vec<u32>,
    product: BigUint,
    /// `partials[i] = (M / p_i)^(p_i - 1) mod M`, congruent to 1 mod `p_i` and to 0 mod the other primes.
    partials: Vec<BigUint>,
    multiplicative_identity: BigUint,
}

/// Shared multi-field configuration.
/// Cloning is cheap, all clones refer to the same primes.
#[derive(Clone)]
pub struct MultiField {
    context: Rc<MultiFieldContext>,
}

impl MultiField {
    /// Collects every prime in `[minimum, maximum]` and precomputes the CRT partials.
    pub fn initialize(minimum: u32, maximum: u32) -> Result<Self, PermatError> {
        if maximum < 2 {
            return Err(PermatError::NonPositiveCharacteristic);
        }
        if minimum > maximum {
            return Err(PermatError::InvalidInterval {
                min: minimum,
                max: maximum,
            });
        }

        let primes: Vec<u32> = (minimum.max(2)..=maximum).filter(|&n| is_prime(n)).collect();
        if primes.is_empty() {
            return Err(PermatError::NoPrimeInInterval {
                min: minimum,
                max: maximum,
            });
        }

        let product = primes
            .iter()
            .fold(BigUint::one(), |product, &p| product * p);
        let partials = primes
            .iter()
            .map(|&p| (&product / p).modpow(&BigUint::from(p - 1), &product))
            .collect();

        debug!("Initialised multi-field over primes {primes:?} (product {product})");

        Ok(Self {
            context: Rc::new(MultiFieldContext {
                primes,
                product,
                partials,
                multiplicative_identity: BigUint::one(),
            }),
        })
    }

    pub fn primes(&self) -> &[u32] {
        &self.context.primes
    }

    pub fn product(&self) -> &BigUint {
        &self.context.product
    }

    pub fn element(&self, value: u64) -> FieldElement<MultiField> {
        FieldElement::new(self.clone(), value)
    }

    fn reduce(&self, value: BigUint) -> Option<BigUint> {
        let reduced = value % &self.context.product;
        (!reduced.is_zero()).then_some(reduced)
    }

    /// Sum of the partials of the primes dividing `product`, or the identity when `product` is zero.
    pub fn partial_multiplicative_identity(&self, product: &BigUint) -> Option<BigUint> {
        if product.is_zero() {
            return Some(self.context.multiplicative_identity.clone());
        }
        let sum = self
            .context
            .primes
            .iter()
            .zip(&self.context.partials)
            .filter(|(p, _)| (product % **p).is_zero())
            .fold(BigUint::zero(), |sum, (_, partial)| sum + partial);
        self.reduce(sum)
    }

    /// Inverse of `value` restricted to the primes of `product` for which it is a unit.
    ///
    /// Returns the partial inverse together with the sub-product `QT` it is valid for.
    /// When `value` vanishes modulo every prime of `product`, returns zero with the identity as weight.
    pub fn partial_inverse(
        &self,
        value: Option<&BigUint>,
        product: &BigUint,
    ) -> (Option<BigUint>, BigUint) {
        let zero = BigUint::zero();
        let value = value.unwrap_or(&zero);
        let common = value.gcd(product);
        if &common == product {
            return (None, self.context.multiplicative_identity.clone());
        }

        let sub_product = product / &common;
        let Some(inverse) = modular_inverse(value, &sub_product) else {
            return (None, self.context.multiplicative_identity.clone());
        };
        let partial = self
            .partial_multiplicative_identity(&sub_product)
            .and_then(|identity| self.reduce(identity * inverse));
        (partial, sub_product)
    }
}

impl Debug for MultiField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MultiField{:?}", self.context.primes)
    }
}

impl PartialEq for MultiField {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.context, &other.context) || self.context.primes == other.context.primes
    }
}

impl Eq for MultiField {}

impl CoefficientField for MultiField {
    type Coefficient = BigUint;

    fn one(&self) -> BigUint {
        self.context.multiplicative_identity.clone()
    }

    fn add(&self, lhs: &BigUint, rhs: &BigUint) -> Option<BigUint> {
        self.reduce(lhs + rhs)
    }

    fn multiply(&self, lhs: &BigUint, rhs: &BigUint) -> Option<BigUint> {
        self.reduce(lhs * rhs)
    }

    fn additive_inverse(&self, value: &BigUint) -> BigUint {
        &self.context.product - value
    }

    fn inverse(&self, value: &BigUint) -> Option<BigUint> {
        let (inverse, sub_product) = self.partial_inverse(Some(value), &self.context.product);
        // Only a unit if it is invertible modulo every prime
        if sub_product == self.context.product {
            inverse
        } else {
            None
        }
    }

    fn characteristic(&self) -> BigUint {
        self.context.product.clone()
    }

    fn from_integer(&self, value: u64) -> Option<BigUint> {
        self.reduce(BigUint::from(value))
    }

    fn to_integer(&self, value: &BigUint) -> BigUint {
        value.clone()
    }
}

impl FieldElement<MultiField> {
    /// See [`MultiField::partial_inverse`].
    pub fn partial_inverse(&self, product: &BigUint) -> (Self, BigUint) {
        let (inverse, sub_product) = self.field.partial_inverse(self.value.as_ref(), product);
        (
            FieldElement::from_coefficient(self.field.clone(), inverse),
            sub_product,
        )
    }

    /// See [`MultiField::partial_multiplicative_identity`].
    pub fn partial_multiplicative_identity(&self, product: &BigUint) -> Self {
        let identity = self.field.partial_multiplicative_identity(product);
        FieldElement::from_coefficient(self.field.clone(), identity)
    }
}

fn is_prime(n: u32) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let n = u64::from(n);
    let mut i = 5_u64;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Extended Euclid, `None` unless `gcd(value, modulus) = 1`.
fn modular_inverse(value: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let modulus = BigInt::from(modulus.clone());
    let (mut old_r, mut r) = (BigInt::from(value.clone()), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }
    if !old_r.is_one() {
        return None;
    }
    old_s.mod_floor(&modulus).to_biguint()
}

#[cfg(test)]
mod tests {
    use num::{BigUint, Integer};
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::fields::CoefficientField;
    use crate::PermatError;

    use super::{is_prime, modular_inverse, MultiField};

    #[rstest]
    #[case(0, 1, PermatError::NonPositiveCharacteristic)]
    #[case(9, 5, PermatError::InvalidInterval { min: 9, max: 5 })]
    #[case(24, 28, PermatError::NoPrimeInInterval { min: 24, max: 28 })]
    #[case(8, 8, PermatError::NoPrimeInInterval { min: 8, max: 8 })]
    fn test_invalid_intervals(#[case] min: u32, #[case] max: u32, #[case] error: PermatError) {
        assert_eq!(MultiField::initialize(min, max).unwrap_err(), error);
    }

    #[test]
    fn test_product_of_primes() {
        let field = MultiField::initialize(2, 7).unwrap();
        assert_eq!(field.primes(), &[2, 3, 5, 7]);
        assert_eq!(field.product(), &BigUint::from(210_u32));
        assert_eq!(field.characteristic(), BigUint::from(210_u32));

        let single = MultiField::initialize(12, 13).unwrap();
        assert_eq!(single.primes(), &[13]);
    }

    #[test]
    fn test_partials_are_crt_idempotents() {
        let field = MultiField::initialize(2, 7).unwrap();
        let identity = field
            .partial_multiplicative_identity(field.product())
            .unwrap();
        assert_eq!(identity, BigUint::from(1_u32));

        // Restricted to 3 * 5 the identity is 1 mod 3, 1 mod 5 and 0 mod 2, 7
        let partial = field
            .partial_multiplicative_identity(&BigUint::from(15_u32))
            .unwrap();
        for (p, expected) in [(2_u32, 0_u32), (3, 1), (5, 1), (7, 0)] {
            assert_eq!(&partial % p, BigUint::from(expected));
        }
        assert_eq!(
            field.partial_multiplicative_identity(&BigUint::from(0_u32)),
            Some(BigUint::from(1_u32))
        );
    }

    #[test]
    fn test_partial_inverse_of_zero_divisor() {
        let field = MultiField::initialize(2, 7).unwrap();
        // 6 vanishes mod 2 and 3, so it is only invertible over 5 * 7
        let six = field.element(6);
        let (inverse, sub_product) = six.partial_inverse(field.product());
        assert_eq!(sub_product, BigUint::from(35_u32));
        let product = &six * &inverse;
        assert_eq!(product.value() % 35_u32, BigUint::from(1_u32));
        assert!(six.inverse().is_zero());

        let zero = field.element(0);
        let (inverse, weight) = zero.partial_inverse(field.product());
        assert!(inverse.is_zero());
        assert_eq!(weight, BigUint::from(1_u32));
    }

    #[test]
    fn test_small_primes() {
        let primes: Vec<u32> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert_eq!(
            modular_inverse(&BigUint::from(3_u32), &BigUint::from(7_u32)),
            Some(BigUint::from(5_u32))
        );
        assert_eq!(
            modular_inverse(&BigUint::from(4_u32), &BigUint::from(8_u32)),
            None
        );
    }

    proptest! {
        #[test]
        fn test_inverse_of_units(x in 1_u64..210) {
            let field = MultiField::initialize(2, 7).unwrap();
            prop_assume!(x.gcd(&210) == 1);
            let element = field.element(x);
            let product = &element * &element.inverse();
            prop_assert_eq!(product, element.multiplicative_identity());
        }
    }
}
