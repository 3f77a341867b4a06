use time::{Date, OffsetDateTime};
use tracing::{debug, info, instrument};

use crate::api::ApiClient;
use crate::error::Result;
use crate::meals::dto::{MealCandidate, MealEntry, MealsQuery, MealsResponse, NewMeal};

/// Meals logged by `user_id` on the given local date.
#[instrument(skip(api))]
pub async fn fetch_meals(api: &ApiClient, user_id: &str, date: Date) -> Result<Vec<MealEntry>> {
    let res: MealsResponse = api
        .get_query(&format!("/meals/{}", user_id), &MealsQuery { search_date: date })
        .await?;
    let meals = res.meals.unwrap_or_default();
    debug!(count = meals.len(), "meals fetched");
    Ok(meals)
}

#[instrument(skip(api, candidate), fields(description = %candidate.description))]
pub async fn create_meal(
    api: &ApiClient,
    user_id: &str,
    candidate: &MealCandidate,
    meal_date: Date,
    timestamp: OffsetDateTime,
) -> Result<MealEntry> {
    let body = NewMeal::from_candidate(user_id, candidate, meal_date, timestamp);
    let mut saved: MealEntry = api.post("/meals/", &body).await?;
    // older backends echo the meal without the date it was filed under
    if saved.meal_date.is_none() {
        saved.meal_date = Some(meal_date);
    }
    info!(meal_id = %saved.id, "meal saved");
    Ok(saved)
}

/// Saves candidates in order and stops at the first failure. Meals saved
/// before the failure are returned alongside the error.
pub async fn create_meals(
    api: &ApiClient,
    user_id: &str,
    candidates: &[MealCandidate],
    meal_date: Date,
    timestamp: OffsetDateTime,
) -> (Vec<MealEntry>, Option<crate::error::ClientError>) {
    let mut saved = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match create_meal(api, user_id, candidate, meal_date, timestamp).await {
            Ok(meal) => saved.push(meal),
            Err(e) => return (saved, Some(e)),
        }
    }
    (saved, None)
}

#[instrument(skip(api))]
pub async fn delete_meal(api: &ApiClient, meal_id: &str) -> Result<()> {
    api.delete(&format!("/meals/{}", meal_id)).await?;
    info!("meal deleted");
    Ok(())
}

/// Removes every meal the user has logged, on all dates.
#[instrument(skip(api))]
pub async fn clear_meals(api: &ApiClient, user_id: &str) -> Result<()> {
    api.delete(&format!("/meals/{}/clear", user_id)).await?;
    info!("all meals cleared");
    Ok(())
}
