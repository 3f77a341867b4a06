use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::error::Result;
use crate::users::dto::{NutritionNeeds, UserProfile, UserProfileResponse};

#[instrument(skip(api))]
pub async fn fetch_profile(api: &ApiClient, user_id: &str) -> Result<UserProfile> {
    let res: UserProfileResponse = api.get(&format!("/users/{}", user_id)).await?;
    Ok(res.into())
}

/// The backend may answer with the stored profile, a bare ack, or nothing;
/// the submitted profile is authoritative either way.
#[instrument(skip(api, profile))]
pub async fn update_profile(api: &ApiClient, user_id: &str, profile: &UserProfile) -> Result<()> {
    let _: serde_json::Value = api.put(&format!("/users/{}", user_id), profile).await?;
    info!("profile updated");
    Ok(())
}

#[instrument(skip(api))]
pub async fn fetch_nutrition_needs(api: &ApiClient, user_id: &str) -> Result<NutritionNeeds> {
    api.get(&format!("/users/{}/nutrition-needs", user_id)).await
}
