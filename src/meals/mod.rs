pub mod dto;
pub mod log;
pub mod services;

pub use dto::{MealCandidate, MealEntry};
pub use log::{daily_totals, DailyMealLog, FetchTicket};
