use std::sync::Arc;

use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::app::{AppEvent, Command};
use crate::auth::services::sign_up;
use crate::auth::{Session, TokenIdentityProvider};
use crate::chat::services::send_chat;
use crate::clock::now_local;
use crate::config::AppConfig;
use crate::error::Result;
use crate::meals::services::{clear_meals, create_meals, delete_meal, fetch_meals};
use crate::users::services::{fetch_nutrition_needs, fetch_profile, update_profile};

/// Everything a command needs to run: configuration, the HTTP client and
/// the session. Cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: ApiClient,
    pub session: Arc<Session>,
}

impl AppState {
    /// Reads the environment and attaches a session fed by
    /// `MEALMIND_ID_TOKEN`, if set. Needs a running tokio runtime.
    pub fn init() -> Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let provider = Arc::new(TokenIdentityProvider::from_token(config.id_token.as_deref()));
        let session = Arc::new(Session::attach(provider));
        Self::from_parts(config, session)
    }

    pub fn from_parts(config: Arc<AppConfig>, session: Arc<Session>) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config,
            api,
            session,
        })
    }

    /// Runs one command against the backend and reports how it went.
    #[instrument(skip_all, fields(command = command.name()))]
    pub async fn execute(&self, command: Command) -> AppEvent {
        debug!("executing command");
        match command {
            Command::FetchMeals(ticket) => {
                let result = fetch_meals(&self.api, &ticket.user_id, ticket.date).await;
                AppEvent::MealsFetched { ticket, result }
            }
            Command::FetchProfile {
                generation,
                user_id,
            } => AppEvent::ProfileFetched {
                generation,
                result: fetch_profile(&self.api, &user_id).await,
            },
            Command::FetchNeeds {
                generation,
                user_id,
            } => AppEvent::NeedsFetched {
                generation,
                result: fetch_nutrition_needs(&self.api, &user_id).await,
            },
            Command::SendChat { user_id, ticket } => AppEvent::ChatReplied {
                generation: ticket.generation,
                result: send_chat(&self.api, &user_id, &self.config.chat, &ticket).await,
            },
            Command::SaveMeals {
                user_id,
                date,
                ticket,
            } => {
                let (saved, error) =
                    create_meals(&self.api, &user_id, &ticket.candidates, date, now_local()).await;
                AppEvent::MealsSaved {
                    user_id,
                    date,
                    ticket,
                    saved,
                    error,
                }
            }
            Command::DeleteMeal { meal_id } => {
                let result = delete_meal(&self.api, &meal_id).await;
                AppEvent::MealDeleted { meal_id, result }
            }
            Command::SaveProfile {
                generation,
                user_id,
                profile,
            } => {
                let result = update_profile(&self.api, &user_id, &profile).await;
                AppEvent::ProfileSaved {
                    generation,
                    user_id,
                    profile,
                    result,
                }
            }
            Command::ClearMeals { user_id } => AppEvent::MealsCleared {
                result: clear_meals(&self.api, &user_id).await,
                user_id,
            },
            Command::Login { id_token } => {
                AppEvent::LoggedIn(self.session.login(&self.api, &id_token).await)
            }
            Command::Logout => AppEvent::LoggedOut(self.session.logout().await),
            Command::SignUp { request } => AppEvent::SignedUp(sign_up(&self.api, &request).await),
        }
    }
}
