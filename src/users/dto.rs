use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::meals::dto::optional_string_or_number;
use crate::nutrition::{lenient_amount, Nutrients};

/// Profile as stored by the backend. Weight in kg, height in cm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub weight: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfileResponse {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub height: Option<f64>,
}

impl From<UserProfileResponse> for UserProfile {
    fn from(r: UserProfileResponse) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            date_of_birth: r.date_of_birth,
            weight: r.weight.unwrap_or(0.0),
            height: r.height.unwrap_or(0.0),
        }
    }
}

/// Editable text fields of the profile screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub weight: String,
    pub height: String,
}

impl ProfileForm {
    /// Presence of every field plus numeric weight and height; nothing more.
    pub fn to_profile(&self) -> Result<UserProfile, ClientError> {
        let required = |name: &str, value: &str| -> Result<String, ClientError> {
            let v = value.trim();
            if v.is_empty() {
                Err(ClientError::InvalidProfile(format!("{name} is required")))
            } else {
                Ok(v.to_string())
            }
        };
        let number = |name: &str, value: &str| -> Result<f64, ClientError> {
            let v = required(name, value)?;
            v.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| ClientError::InvalidProfile(format!("{name} must be a number")))
        };

        Ok(UserProfile {
            first_name: required("first name", &self.first_name)?,
            last_name: required("last name", &self.last_name)?,
            date_of_birth: required("date of birth", &self.date_of_birth)?,
            weight: number("weight", &self.weight)?,
            height: number("height", &self.height)?,
        })
    }
}

impl From<&UserProfile> for ProfileForm {
    fn from(p: &UserProfile) -> Self {
        Self {
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            date_of_birth: p.date_of_birth.clone(),
            weight: p.weight.to_string(),
            height: p.height.to_string(),
        }
    }
}

/// Daily targets computed by the backend from the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutritionNeeds(pub Nutrients);
