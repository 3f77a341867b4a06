use time::{Date, Duration};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::meals::dto::MealEntry;
use crate::nutrition::Nutrients;

/// Identifies one fetch of the meal list. Results are applied only while
/// the log is still on the same generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub user_id: String,
    pub date: Date,
}

/// The meals for the currently viewed day.
#[derive(Debug, Clone)]
pub struct DailyMealLog {
    date: Date,
    meals: Vec<MealEntry>,
    generation: u64,
    loading: bool,
    last_error: Option<String>,
}

impl DailyMealLog {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            meals: Vec::new(),
            generation: 0,
            loading: false,
            last_error: None,
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn meals(&self) -> &[MealEntry] {
        &self.meals
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Error from the most recent failed fetch; cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn totals(&self) -> Nutrients {
        daily_totals(&self.meals)
    }

    /// Switches the viewed day. Meals of the previous day are dropped at once
    /// so they never show under the new date.
    pub fn set_date(&mut self, user_id: &str, date: Date) -> FetchTicket {
        self.date = date;
        self.meals.clear();
        self.last_error = None;
        self.begin_fetch(user_id)
    }

    pub fn shift_days(&mut self, user_id: &str, days: i64) -> FetchTicket {
        let target = self
            .date
            .checked_add(Duration::days(days))
            .unwrap_or(self.date);
        self.set_date(user_id, target)
    }

    /// Reloads the current day, keeping what is shown until the result lands.
    pub fn refresh(&mut self, user_id: &str) -> FetchTicket {
        self.begin_fetch(user_id)
    }

    /// Called after a local change to the list. A fetch already in flight
    /// may predate the change, so it is superseded by a new one.
    pub fn restart_if_loading(&mut self, user_id: &str) -> Option<FetchTicket> {
        if !self.loading {
            return None;
        }
        debug!(generation = self.generation, "superseding in-flight meal fetch");
        Some(self.begin_fetch(user_id))
    }

    fn begin_fetch(&mut self, user_id: &str) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            user_id: user_id.to_string(),
            date: self.date,
        }
    }

    /// Applies a fetch result. Returns false when the ticket is stale.
    /// A failed fetch keeps the last good list and records the error.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<MealEntry>, ClientError>,
    ) -> bool {
        if ticket.generation != self.generation || ticket.date != self.date {
            debug!(?ticket, current = self.generation, "discarding stale meal fetch");
            return false;
        }
        self.loading = false;
        match result {
            Ok(meals) => {
                self.meals = meals;
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, date = %ticket.date, "fetching meals failed; keeping previous list");
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    /// Adds a freshly saved meal at the front if it belongs to the viewed day.
    pub fn insert_saved(&mut self, date: Date, meal: MealEntry) -> bool {
        if date != self.date {
            return false;
        }
        if self.meals.iter().any(|m| m.id == meal.id) {
            return false;
        }
        self.meals.insert(0, meal);
        true
    }

    pub fn remove(&mut self, meal_id: &str) -> Option<MealEntry> {
        let idx = self.meals.iter().position(|m| m.id == meal_id)?;
        Some(self.meals.remove(idx))
    }

    /// Drops everything and invalidates in-flight fetches, e.g. on sign-out.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.meals.clear();
        self.loading = false;
        self.last_error = None;
    }
}

/// Field-wise sum over the meals, treating missing amounts as zero.
pub fn daily_totals(meals: &[MealEntry]) -> Nutrients {
    meals.iter().map(MealEntry::nutrients).sum()
}
