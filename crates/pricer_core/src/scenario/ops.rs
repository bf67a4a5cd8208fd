//! Arithmetic operator implementations for [`ScenarioValue`].
//!
//! Binary operators delegate to [`ScenarioValue::zip_with`] and panic on
//! operands with different path counts.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::ScenarioValue;

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&ScenarioValue> for &ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: &ScenarioValue) -> ScenarioValue {
                self.zip_with(rhs, |a, b| a $op b)
            }
        }

        impl $trait<ScenarioValue> for ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: ScenarioValue) -> ScenarioValue {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&ScenarioValue> for ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: &ScenarioValue) -> ScenarioValue {
                (&self).$method(rhs)
            }
        }

        impl $trait<ScenarioValue> for &ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: ScenarioValue) -> ScenarioValue {
                self.$method(&rhs)
            }
        }

        impl $trait<f64> for &ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: f64) -> ScenarioValue {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<f64> for ScenarioValue {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: f64) -> ScenarioValue {
                (&self).$method(rhs)
            }
        }

        impl $trait<&ScenarioValue> for f64 {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: &ScenarioValue) -> ScenarioValue {
                rhs.map(|b| self $op b)
            }
        }

        impl $trait<ScenarioValue> for f64 {
            type Output = ScenarioValue;

            #[inline]
            fn $method(self, rhs: ScenarioValue) -> ScenarioValue {
                self.$method(&rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for &ScenarioValue {
    type Output = ScenarioValue;

    #[inline]
    fn neg(self) -> ScenarioValue {
        self.map(|x| -x)
    }
}

impl Neg for ScenarioValue {
    type Output = ScenarioValue;

    #[inline]
    fn neg(self) -> ScenarioValue {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_operators() {
        let x = ScenarioValue::from_paths(vec![1.0, 2.0]);
        assert_eq!((&x + 1.0).to_vec(2), vec![2.0, 3.0]);
        assert_eq!((&x - 1.0).to_vec(2), vec![0.0, 1.0]);
        assert_eq!((2.0 * &x).to_vec(2), vec![2.0, 4.0]);
        assert_eq!((1.0 / &x).to_vec(2), vec![1.0, 0.5]);
        assert_eq!((3.0 - x.clone()).to_vec(2), vec![2.0, 1.0]);
    }

    #[test]
    fn test_owned_operators() {
        let x = ScenarioValue::from_paths(vec![1.0, 2.0]);
        let y = ScenarioValue::from_paths(vec![3.0, 4.0]);
        assert_eq!((x.clone() + y.clone()).to_vec(2), vec![4.0, 6.0]);
        assert_eq!((y.clone() - &x).to_vec(2), vec![2.0, 2.0]);
        assert_eq!((&x * y).to_vec(2), vec![3.0, 8.0]);
        assert_eq!((-x).to_vec(2), vec![-1.0, -2.0]);
    }
}
