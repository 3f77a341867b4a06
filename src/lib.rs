pub mod api;
pub mod app;
pub mod auth;
pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod meals;
pub mod nutrition;
pub mod state;
pub mod users;
pub mod view;

pub use error::{ClientError, Result};
