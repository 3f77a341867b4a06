use std::ops::{Add, AddAssign};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// The nutrient set tracked per meal and per day, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nutrient {
    Calories,
    Protein,
    Fiber,
    Carbs,
    Fat,
    Sugar,
}

impl Nutrient {
    pub const ALL: [Nutrient; 6] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fiber,
        Nutrient::Carbs,
        Nutrient::Fat,
        Nutrient::Sugar,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Fiber => "fiber",
            Nutrient::Carbs => "carbs",
            Nutrient::Fat => "fat",
            Nutrient::Sugar => "sugar",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::Protein => "Protein (g)",
            Nutrient::Fiber => "Fiber (g)",
            Nutrient::Carbs => "Carbs (g)",
            Nutrient::Fat => "Fat (g)",
            Nutrient::Sugar => "Sugar (g)",
        }
    }
}

/// Fully-resolved amounts; absent values have already been coalesced to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrients {
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub calories: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub protein: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub fiber: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub fat: f64,
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub sugar: f64,
}

impl Nutrients {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Fiber => self.fiber,
            Nutrient::Carbs => self.carbs,
            Nutrient::Fat => self.fat,
            Nutrient::Sugar => self.sugar,
        }
    }

    /// Builds from optional amounts, treating missing values as zero.
    pub fn from_optional(
        calories: Option<f64>,
        protein: Option<f64>,
        fiber: Option<f64>,
        carbs: Option<f64>,
        fat: Option<f64>,
        sugar: Option<f64>,
    ) -> Self {
        Self {
            calories: calories.unwrap_or(0.0),
            protein: protein.unwrap_or(0.0),
            fiber: fiber.unwrap_or(0.0),
            carbs: carbs.unwrap_or(0.0),
            fat: fat.unwrap_or(0.0),
            sugar: sugar.unwrap_or(0.0),
        }
    }
}

impl Add for Nutrients {
    type Output = Nutrients;

    fn add(mut self, rhs: Nutrients) -> Nutrients {
        self += rhs;
        self
    }
}

impl AddAssign for Nutrients {
    fn add_assign(&mut self, rhs: Nutrients) {
        self.calories += rhs.calories;
        self.protein += rhs.protein;
        self.fiber += rhs.fiber;
        self.carbs += rhs.carbs;
        self.fat += rhs.fat;
        self.sugar += rhs.sugar;
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Nutrients>>(iter: I) -> Self {
        iter.fold(Nutrients::default(), Add::add)
    }
}

/// Pulls the first number out of free text such as `"220 kcal"` or `"~14g"`.
pub fn extract_number(text: &str) -> Option<f64> {
    lazy_static! {
        static ref NUMBER_RE: Regex = Regex::new(r"[-+]?[0-9]*\.?[0-9]+").unwrap();
    }
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn sanitize(v: f64) -> Option<f64> {
    (v.is_finite() && v >= 0.0).then_some(v)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Accepts numbers, numeric strings, or null. Negative and non-numeric
/// values are treated as absent.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawAmount::Number(v)) => sanitize(v),
        Some(RawAmount::Text(s)) => extract_number(&s).and_then(sanitize),
    })
}

fn amount_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_amount(deserializer)?.unwrap_or(0.0))
}
