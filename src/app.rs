use time::Date;
use tracing::{debug, info, warn};

use crate::auth::{CurrentUser, SessionState, SignupForm, SignupRequest};
use crate::chat::{ChatReply, ChatTicket, Conversation, ConversationEvent, Effect, SaveTicket, Selection};
use crate::error::{ClientError, Result};
use crate::meals::{DailyMealLog, FetchTicket, MealEntry};
use crate::users::{NutritionNeeds, ProfileForm, ProfileState, UserProfile};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SendMessage(String),
    ConfirmAll,
    ConfirmSelected(Vec<usize>),
    Cancel { keep_history: bool },
    PreviousDay,
    NextDay,
    Today,
    GoToDate(Date),
    Refresh,
    DeleteMeal(String),
    SaveProfile(ProfileForm),
    Login(String),
    Logout,
    ClearAllMeals,
    SignUp(SignupForm),
}

/// Backend work requested by the dashboard. Executed by
/// [`crate::state::AppState::execute`], whose answer comes back as an
/// [`AppEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchMeals(FetchTicket),
    FetchProfile { generation: u64, user_id: String },
    FetchNeeds { generation: u64, user_id: String },
    SendChat { user_id: String, ticket: ChatTicket },
    SaveMeals { user_id: String, date: Date, ticket: SaveTicket },
    DeleteMeal { meal_id: String },
    SaveProfile { generation: u64, user_id: String, profile: UserProfile },
    ClearMeals { user_id: String },
    Login { id_token: String },
    Logout,
    SignUp { request: SignupRequest },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::FetchMeals(_) => "fetch_meals",
            Command::FetchProfile { .. } => "fetch_profile",
            Command::FetchNeeds { .. } => "fetch_needs",
            Command::SendChat { .. } => "send_chat",
            Command::SaveMeals { .. } => "save_meals",
            Command::DeleteMeal { .. } => "delete_meal",
            Command::SaveProfile { .. } => "save_profile",
            Command::ClearMeals { .. } => "clear_meals",
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::SignUp { .. } => "sign_up",
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    SessionChanged(SessionState),
    MealsFetched {
        ticket: FetchTicket,
        result: Result<Vec<MealEntry>>,
    },
    ProfileFetched {
        generation: u64,
        result: Result<UserProfile>,
    },
    NeedsFetched {
        generation: u64,
        result: Result<NutritionNeeds>,
    },
    ChatReplied {
        generation: u64,
        result: Result<ChatReply>,
    },
    MealsSaved {
        user_id: String,
        date: Date,
        ticket: SaveTicket,
        saved: Vec<MealEntry>,
        error: Option<ClientError>,
    },
    MealDeleted {
        meal_id: String,
        result: Result<()>,
    },
    ProfileSaved {
        generation: u64,
        user_id: String,
        profile: UserProfile,
        result: Result<()>,
    },
    MealsCleared {
        user_id: String,
        result: Result<()>,
    },
    LoggedIn(Result<CurrentUser>),
    LoggedOut(Result<()>),
    SignedUp(Result<()>),
}

/// The whole client-side state of the home screen: who is signed in, the
/// viewed day, profile and targets, and the meal conversation.
///
/// Nothing here performs I/O. [`Dashboard::dispatch`] and
/// [`Dashboard::apply`] return the commands to run next; user-facing
/// messages pile up until [`Dashboard::take_notices`] drains them.
#[derive(Debug)]
pub struct Dashboard {
    user: Option<String>,
    initializing: bool,
    today: Date,
    log: DailyMealLog,
    profile: ProfileState,
    conversation: Conversation,
    notices: Vec<String>,
}

impl Dashboard {
    pub fn new(today: Date) -> Self {
        Self {
            user: None,
            initializing: true,
            today,
            log: DailyMealLog::new(today),
            profile: ProfileState::default(),
            conversation: Conversation::new(),
            notices: Vec::new(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn today(&self) -> Date {
        self.today
    }

    /// Keeps "today" correct across midnight.
    pub fn set_today(&mut self, today: Date) {
        self.today = today;
    }

    pub fn log(&self) -> &DailyMealLog {
        &self.log
    }

    pub fn profile(&self) -> &ProfileState {
        &self.profile
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn notice(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    fn require_user(&mut self) -> Option<String> {
        if self.user.is_none() {
            self.notice(ClientError::NotSignedIn.to_string());
        }
        self.user.clone()
    }

    fn fetch_needs(&self, user_id: &str) -> Command {
        Command::FetchNeeds {
            generation: self.profile.generation(),
            user_id: user_id.to_string(),
        }
    }

    /// Adopts a new session state. Switching users drops everything that
    /// belonged to the previous one and loads the new user's day.
    pub fn set_session(&mut self, state: SessionState) -> Vec<Command> {
        self.initializing = state.initializing;
        let uid = state.user.map(|u| u.uid);
        if uid == self.user {
            return Vec::new();
        }

        self.conversation.reduce(ConversationEvent::Reset);
        self.profile.reset();
        self.log.reset();
        self.user = uid;

        let Some(uid) = self.user.clone() else {
            info!("session ended; dashboard cleared");
            return Vec::new();
        };
        info!(%uid, "session started");
        vec![
            Command::FetchMeals(self.log.set_date(&uid, self.log.date())),
            Command::FetchProfile {
                generation: self.profile.generation(),
                user_id: uid.clone(),
            },
            self.fetch_needs(&uid),
        ]
    }

    pub fn dispatch(&mut self, action: Action) -> Vec<Command> {
        match action {
            Action::SendMessage(text) => {
                let Some(user_id) = self.require_user() else {
                    return Vec::new();
                };
                match self.conversation.reduce(ConversationEvent::Submit(text)) {
                    Effect::SendChat(ticket) => vec![Command::SendChat { user_id, ticket }],
                    Effect::Rejected(e) => {
                        self.notice(e.to_string());
                        Vec::new()
                    }
                    _ => Vec::new(),
                }
            }
            Action::ConfirmAll => self.confirm(Selection::All),
            Action::ConfirmSelected(indices) => self.confirm(Selection::Indices(indices)),
            Action::Cancel { keep_history } => {
                self.conversation
                    .reduce(ConversationEvent::Cancel { keep_history });
                Vec::new()
            }
            Action::PreviousDay => self.change_date(|log, uid| log.shift_days(uid, -1)),
            Action::NextDay => self.change_date(|log, uid| log.shift_days(uid, 1)),
            Action::Today => {
                let today = self.today;
                self.change_date(|log, uid| log.set_date(uid, today))
            }
            Action::GoToDate(date) => self.change_date(|log, uid| log.set_date(uid, date)),
            Action::Refresh => {
                let Some(uid) = self.require_user() else {
                    return Vec::new();
                };
                vec![Command::FetchMeals(self.log.refresh(&uid)), self.fetch_needs(&uid)]
            }
            Action::DeleteMeal(meal_id) => {
                if self.require_user().is_none() {
                    return Vec::new();
                }
                if !self.log.meals().iter().any(|m| m.id == meal_id) {
                    self.notice(format!("No meal {meal_id} on this day."));
                    return Vec::new();
                }
                vec![Command::DeleteMeal { meal_id }]
            }
            Action::SaveProfile(form) => {
                let Some(user_id) = self.require_user() else {
                    return Vec::new();
                };
                match self.profile.begin_save(&form) {
                    Ok(profile) => vec![Command::SaveProfile {
                        generation: self.profile.generation(),
                        user_id,
                        profile,
                    }],
                    Err(e) => {
                        self.notice(e.to_string());
                        Vec::new()
                    }
                }
            }
            Action::Login(id_token) => vec![Command::Login { id_token }],
            Action::Logout => {
                if self.require_user().is_none() {
                    return Vec::new();
                }
                vec![Command::Logout]
            }
            Action::ClearAllMeals => match self.require_user() {
                Some(user_id) => vec![Command::ClearMeals { user_id }],
                None => Vec::new(),
            },
            Action::SignUp(form) => match form.to_request() {
                Ok(request) => vec![Command::SignUp { request }],
                Err(e) => {
                    self.notice(e.to_string());
                    Vec::new()
                }
            },
        }
    }

    fn confirm(&mut self, selection: Selection) -> Vec<Command> {
        let Some(user_id) = self.require_user() else {
            return Vec::new();
        };
        match self.conversation.reduce(ConversationEvent::Confirm(selection)) {
            Effect::SaveMeals(ticket) => vec![Command::SaveMeals {
                user_id,
                date: self.log.date(),
                ticket,
            }],
            Effect::Rejected(e) => {
                self.notice(e.to_string());
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// A fetch in flight may have been answered before the local change
    /// reached the backend; ask again so the older list cannot win.
    fn restart_meal_fetch(&mut self, user_id: &str) -> Vec<Command> {
        self.log
            .restart_if_loading(user_id)
            .map(Command::FetchMeals)
            .into_iter()
            .collect()
    }

    /// Targets can depend on the day, so they are reloaded with the meals.
    fn change_date<F>(&mut self, f: F) -> Vec<Command>
    where
        F: FnOnce(&mut DailyMealLog, &str) -> FetchTicket,
    {
        let Some(uid) = self.require_user() else {
            return Vec::new();
        };
        let ticket = f(&mut self.log, &uid);
        debug!(date = %ticket.date, "viewing another day");
        vec![Command::FetchMeals(ticket), self.fetch_needs(&uid)]
    }

    pub fn apply(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::SessionChanged(state) => self.set_session(state),
            AppEvent::MealsFetched { ticket, result } => {
                if self.log.complete_fetch(&ticket, result) {
                    if let Some(e) = self.log.last_error().map(str::to_string) {
                        self.notice(format!("Could not load meals: {e}"));
                    }
                }
                Vec::new()
            }
            AppEvent::ProfileFetched { generation, result } => {
                self.profile.apply_profile(generation, result);
                Vec::new()
            }
            AppEvent::NeedsFetched { generation, result } => {
                self.profile.apply_needs(generation, result);
                Vec::new()
            }
            AppEvent::ChatReplied { generation, result } => {
                if generation == self.conversation.generation() {
                    if let Err(e) = &result {
                        self.notice(format!("Chat failed: {e}"));
                    }
                }
                self.conversation
                    .reduce(ConversationEvent::Reply { generation, result });
                Vec::new()
            }
            AppEvent::MealsSaved {
                user_id,
                date,
                ticket,
                saved,
                error,
            } => {
                if self.user.as_deref() != Some(user_id.as_str()) {
                    debug!(%user_id, "meals saved for a user who is no longer signed in");
                    return Vec::new();
                }
                let mut inserted = false;
                for meal in &saved {
                    inserted |= self.log.insert_saved(date, meal.clone());
                }
                let cmds = if inserted {
                    self.restart_meal_fetch(&user_id)
                } else {
                    Vec::new()
                };
                match self.conversation.reduce(ConversationEvent::Saved {
                    ticket,
                    saved,
                    error,
                }) {
                    Effect::Logged(meals) => {
                        let n = meals.len();
                        self.notice(format!("Logged {n} meal{}.", if n == 1 { "" } else { "s" }));
                    }
                    Effect::Rejected(e) => self.notice(format!("Saving meal failed: {e}")),
                    _ => {}
                }
                cmds
            }
            AppEvent::MealDeleted { meal_id, result } => match result {
                Ok(()) => {
                    self.log.remove(&meal_id);
                    match self.user.clone() {
                        Some(uid) => self.restart_meal_fetch(&uid),
                        None => Vec::new(),
                    }
                }
                Err(e) => {
                    warn!(%meal_id, error = %e, "delete failed");
                    self.notice(format!("Could not delete meal: {e}"));
                    Vec::new()
                }
            },
            AppEvent::ProfileSaved {
                generation,
                user_id,
                profile,
                result,
            } => match self.profile.finish_save(generation, profile, result) {
                Ok(true) => {
                    self.notice("Profile saved.");
                    vec![self.fetch_needs(&user_id)]
                }
                Ok(false) => Vec::new(),
                Err(e) => {
                    self.notice(format!("Could not save profile: {e}"));
                    Vec::new()
                }
            },
            AppEvent::MealsCleared { user_id, result } => match result {
                Ok(()) if self.user.as_deref() == Some(user_id.as_str()) => {
                    self.notice("All meals cleared.");
                    vec![Command::FetchMeals(self.log.refresh(&user_id))]
                }
                Ok(()) => Vec::new(),
                Err(e) => {
                    self.notice(format!("Could not clear meals: {e}"));
                    Vec::new()
                }
            },
            AppEvent::LoggedIn(result) => match result {
                Ok(user) => {
                    self.notice(format!("Signed in as {}.", user.uid));
                    self.set_session(SessionState {
                        initializing: false,
                        user: Some(user),
                    })
                }
                Err(e) => {
                    self.notice(format!("Sign-in failed: {e}"));
                    Vec::new()
                }
            },
            AppEvent::LoggedOut(result) => match result {
                Ok(()) => self.set_session(SessionState {
                    initializing: false,
                    user: None,
                }),
                Err(e) => {
                    self.notice(format!("Sign-out failed: {e}"));
                    Vec::new()
                }
            },
            AppEvent::SignedUp(result) => {
                match result {
                    Ok(()) => self.notice("Account created. Please log in."),
                    Err(e) => self.notice(format!("Sign-up failed: {e}")),
                }
                Vec::new()
            }
        }
    }
}
