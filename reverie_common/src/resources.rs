use std::{
    collections::BTreeMap,
    fmt::Display,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------      Category       ---------------------------------------------------------
/// The fixed set of equipment and labour categories that the marketplace trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Truck,
    Crane,
    Tanker,
    RoadRoller,
    ForkLift,
    BoomLifter,
    ManLifter,
    HydraulicJack,
    Manpower,
}

impl Category {
    pub const COUNT: usize = 9;
    /// Every category, in storage order.
    pub const ALL: [Category; Category::COUNT] = [
        Category::Truck,
        Category::Crane,
        Category::Tanker,
        Category::RoadRoller,
        Category::ForkLift,
        Category::BoomLifter,
        Category::ManLifter,
        Category::HydraulicJack,
        Category::Manpower,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Truck => "Truck",
            Category::Crane => "Crane",
            Category::Tanker => "Tanker",
            Category::RoadRoller => "RoadRoller",
            Category::ForkLift => "ForkLift",
            Category::BoomLifter => "BoomLifter",
            Category::ManLifter => "ManLifter",
            Category::HydraulicJack => "HydraulicJack",
            Category::Manpower => "Manpower",
        }
    }

    /// Membership check for lookup queries that name categories as free text.
    pub fn is_known(name: &str) -> bool {
        Category::ALL.iter().any(|c| c.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ResourceVectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ResourceVectorError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceVectorError {
    #[error("{0} is not a recognised resource category")]
    UnknownCategory(String),
    #[error("Resource quantities cannot be negative. Negative values were given for {}", list(.0))]
    NegativeFields(Vec<Category>),
    #[error("Resource quantities cannot exceed {}. Larger values were given for {}", ResourceVector::MAX_QUANTITY, list(.0))]
    TooLarge(Vec<Category>),
}

fn list(categories: &[Category]) -> String {
    categories.iter().map(Category::as_str).collect::<Vec<_>>().join(", ")
}

//--------------------------------------   ResourceVector    ---------------------------------------------------------
/// A quantity for every [`Category`].
///
/// Requirements, offers and vendor inventories are all resource vectors, so the validation and accounting rules are
/// written once here and applied field-wise. Zero-valued categories are omitted when serialized and when persisted,
/// and read back as zero.
///
/// The arithmetic operators are plain field-wise integer arithmetic. They do not check signs; use
/// [`ResourceVector::validate_quantities`] at the boundaries where out-of-range quantities are illegal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Category, i64>", into = "BTreeMap<Category, i64>")]
pub struct ResourceVector {
    values: [i64; Category::COUNT],
}

impl ResourceVector {
    /// The largest quantity accepted for a single category. Stored totals are sums of a bounded number of such
    /// quantities, which keeps them well inside `i64`.
    pub const MAX_QUANTITY: i64 = 1_000_000_000;

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> i64 {
        self.values[category.index()]
    }

    pub fn set(&mut self, category: Category, amount: i64) {
        self.values[category.index()] = amount;
    }

    /// Builder-style setter.
    pub fn with(mut self, category: Category, amount: i64) -> Self {
        self.set(category, amount);
        self
    }

    /// Iterates over every category, including zero-valued ones.
    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Iterates over the categories with a non-zero quantity. This is the persisted (sparse) form of the vector.
    pub fn non_zero(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        self.iter().filter(|(_, v)| *v != 0)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0)
    }

    pub fn negative_fields(&self) -> Vec<Category> {
        self.iter().filter(|(_, v)| *v < 0).map(|(c, _)| c).collect()
    }

    pub fn validate_non_negative(&self) -> Result<(), ResourceVectorError> {
        let negatives = self.negative_fields();
        if negatives.is_empty() {
            Ok(())
        } else {
            Err(ResourceVectorError::NegativeFields(negatives))
        }
    }

    /// Every category must lie in `0..=MAX_QUANTITY`. Negative fields are reported ahead of oversized ones.
    pub fn validate_quantities(&self) -> Result<(), ResourceVectorError> {
        self.validate_non_negative()?;
        let too_large = self.iter().filter(|(_, v)| *v > Self::MAX_QUANTITY).map(|(c, _)| c).collect::<Vec<_>>();
        if too_large.is_empty() {
            Ok(())
        } else {
            Err(ResourceVectorError::TooLarge(too_large))
        }
    }

    /// Field-wise comparison against `bound`. Returns every category where `self` is strictly greater than `bound`.
    pub fn exceeding(&self, bound: &ResourceVector) -> Vec<Category> {
        self.iter().filter(|(c, v)| *v > bound.get(*c)).map(|(c, _)| c).collect()
    }

    /// True when no category of `self` exceeds `bound`.
    pub fn fits_within(&self, bound: &ResourceVector) -> bool {
        self.exceeding(bound).is_empty()
    }

    pub fn total(&self) -> i64 {
        self.values.iter().sum()
    }
}

impl FromIterator<(Category, i64)> for ResourceVector {
    /// Repeated categories accumulate.
    fn from_iter<T: IntoIterator<Item = (Category, i64)>>(iter: T) -> Self {
        let mut result = ResourceVector::zero();
        for (category, amount) in iter {
            result.values[category.index()] += amount;
        }
        result
    }
}

impl From<BTreeMap<Category, i64>> for ResourceVector {
    fn from(map: BTreeMap<Category, i64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<ResourceVector> for BTreeMap<Category, i64> {
    fn from(v: ResourceVector) -> Self {
        v.non_zero().collect()
    }
}

impl Add for ResourceVector {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for ResourceVector {
    fn add_assign(&mut self, rhs: Self) {
        self.values.iter_mut().zip(rhs.values).for_each(|(a, b)| *a += b);
    }
}

impl Sub for ResourceVector {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl SubAssign for ResourceVector {
    fn sub_assign(&mut self, rhs: Self) {
        self.values.iter_mut().zip(rhs.values).for_each(|(a, b)| *a -= b);
    }
}

impl Neg for ResourceVector {
    type Output = Self;

    fn neg(mut self) -> Self::Output {
        self.values.iter_mut().for_each(|v| *v = -*v);
        self
    }
}

impl Display for ResourceVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.non_zero().map(|(c, v)| format!("{c}: {v}")).collect::<Vec<_>>().join(", ");
        write!(f, "{{{fields}}}")
    }
}
