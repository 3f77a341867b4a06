use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

use crate::nutrition::{lenient_amount, Nutrients};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A persisted meal as returned by `/meals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub description: String,
    #[serde(default)]
    pub assumptions: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub fiber: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub fat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub sugar: Option<f64>,
    #[serde(default, with = "iso_date::option")]
    pub meal_date: Option<Date>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl MealEntry {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients::from_optional(
            self.calories,
            self.protein,
            self.fiber,
            self.carbs,
            self.fat,
            self.sugar,
        )
    }
}

/// An AI-proposed meal that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealCandidate {
    pub description: String,
    #[serde(default)]
    pub assumptions: Option<String>,
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

/// Body of `POST /meals/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMeal<'a> {
    pub user_id: &'a str,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<&'a str>,
    pub calories: f64,
    pub protein: f64,
    pub fiber: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sugar: f64,
    #[serde(with = "iso_date")]
    pub meal_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl<'a> NewMeal<'a> {
    pub fn from_candidate(
        user_id: &'a str,
        candidate: &'a MealCandidate,
        meal_date: Date,
        timestamp: OffsetDateTime,
    ) -> Self {
        let n = candidate.nutrients;
        Self {
            user_id,
            description: &candidate.description,
            assumptions: candidate.assumptions.as_deref(),
            calories: n.calories,
            protein: n.protein,
            fiber: n.fiber,
            carbs: n.carbs,
            fat: n.fat,
            sugar: n.sugar,
            meal_date,
            timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MealsResponse {
    #[serde(default)]
    pub meals: Option<Vec<MealEntry>>,
}

#[derive(Debug, Serialize)]
pub struct MealsQuery {
    #[serde(with = "iso_date")]
    pub search_date: Date,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Uint(u64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Int(i) => i.to_string(),
            RawId::Uint(u) => u.to_string(),
        }
    }
}

/// Ids arrive as integers from the backend; they are kept as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_string)
}

pub(crate) fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}
