pub mod dto;
pub mod profile;
pub mod services;

pub use dto::{NutritionNeeds, ProfileForm, UserProfile};
pub use profile::ProfileState;
