use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Price        ---------------------------------------------------------
/// A price in whole units of the shop currency. Prices are never fractional in the catalogue, so an integer is all we
/// need and it maps straight onto an SQLite INTEGER column.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Price(i64);

op!(binary Price, Add, add);
op!(binary Price, Sub, sub);
op!(inplace Price, AddAssign, add_assign);
op!(unary Price, Neg, neg);

impl Mul<i64> for Price {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a price: {0}")]
pub struct PriceConversionError(String);

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Price {
    type Error = PriceConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| PriceConversionError(format!("{value} is too large")))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Price {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}
