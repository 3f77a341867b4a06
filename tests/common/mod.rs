//! In-process stand-in for the MealMind backend.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use mealmind_client::{
    api::ApiClient,
    app::{Command, Dashboard},
    auth::{peek_claims, Session, TokenIdentityProvider},
    config::AppConfig,
    state::AppState,
};
use reqwest::Url;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct Backend {
    pub meals: Vec<Value>,
    pub next_id: i64,
    pub profiles: HashMap<String, Value>,
    pub needs: Option<Value>,
    pub chat_replies: VecDeque<Value>,
    pub chat_requests: Vec<Value>,
    pub profile_puts: Vec<Value>,
    pub verify_calls: usize,
    pub needs_calls: usize,
    pub fail_deletes: bool,
    pub signups: Vec<Value>,
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct StubBackend {
    pub state: Shared,
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubBackend {
    pub async fn spawn(backend: Backend) -> Self {
        let state = Arc::new(Mutex::new(backend));
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub backend");
        });
        Self {
            state,
            addr,
            handle,
        }
    }

    pub fn config(&self) -> AppConfig {
        let url = Url::parse(&format!("http://{}/", self.addr)).expect("url");
        AppConfig::new(url)
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("api client")
    }

    /// Client state with a signed-out session.
    pub fn app_state(&self) -> AppState {
        let provider = Arc::new(TokenIdentityProvider::from_token(None));
        let session = Arc::new(Session::attach(provider));
        AppState::from_parts(Arc::new(self.config()), session).expect("app state")
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.state.lock().expect("backend lock"))
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Runs commands and whatever follow-ups they produce until the dashboard
/// has nothing left to do.
pub async fn drive(state: &AppState, dashboard: &mut Dashboard, commands: Vec<Command>) {
    let mut queue: VecDeque<Command> = commands.into();
    while let Some(command) = queue.pop_front() {
        let event = state.execute(command).await;
        queue.extend(dashboard.apply(event));
    }
}

/// HS256 token carrying Firebase-style claims.
pub fn id_token(uid: &str, ttl_secs: i64) -> String {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = json!({
        "sub": uid,
        "user_id": uid,
        "iat": now,
        "exp": now + ttl_secs,
        "iss": "https://securetoken.google.com/test-project",
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"stub"))
        .expect("sign token")
}

pub fn meal_json(description: &str, calories: f64, protein: f64) -> Value {
    json!({
        "description": description,
        "assumptions": null,
        "calories": calories,
        "protein": protein,
        "carbs": 0,
        "fat": 0,
        "sugar": 0,
    })
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/verify", get(verify))
        .route("/auth/signup", post(signup))
        .route("/users/:uid", get(get_profile).put(put_profile))
        .route("/users/:uid/nutrition-needs", get(get_needs))
        .route("/meals/", post(create_meal))
        .route("/meals/:key", get(list_meals).delete(delete_meal))
        .route("/meals/:key/clear", axum::routing::delete(clear_meals))
        .route("/openai/chat", post(chat))
        .with_state(state)
}

fn uid_from_bearer(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    peek_claims(token).ok().map(|c| c.uid().to_string())
}

async fn verify(State(s): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    s.lock().expect("lock").verify_calls += 1;
    let uid = uid_from_bearer(&headers).ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(json!({ "uid": uid, "message": "Token is valid" })))
}

/// Creates `uid-<n>` with the submitted profile. The stored row carries an
/// integer id like the legacy users table.
async fn signup(
    State(s): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut s = s.lock().expect("lock");
    if s.signups.iter().any(|u| u["email"] == body["email"]) {
        let detail = json!({ "detail": "The user with the provided email already exists" });
        return Err((StatusCode::BAD_REQUEST, Json(detail)));
    }
    s.signups.push(body.clone());
    let n = s.signups.len();
    let uid = format!("uid-{n}");
    let mut profile = json!({ "id": n });
    for key in ["first_name", "last_name", "date_of_birth", "weight", "height"] {
        profile[key] = body[key].clone();
    }
    s.profiles.insert(uid.clone(), profile);
    Ok(Json(json!({ "message": "User created successfully", "uid": uid })))
}

async fn get_profile(
    State(s): State<Shared>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let s = s.lock().expect("lock");
    s.profiles
        .get(&uid)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_profile(
    State(s): State<Shared>,
    Path(uid): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut s = s.lock().expect("lock");
    s.profile_puts.push(body.clone());
    s.profiles.insert(uid, body);
    s.needs = Some(json!({ "calories": 2100, "protein": 120, "carbs": 250, "fat": 70, "sugar": 50 }));
    Json(json!({ "message": "User updated" }))
}

async fn get_needs(State(s): State<Shared>) -> Result<Json<Value>, StatusCode> {
    let mut s = s.lock().expect("lock");
    s.needs_calls += 1;
    s.needs.clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(serde::Deserialize)]
struct MealsParams {
    search_date: Option<String>,
}

async fn list_meals(
    State(s): State<Shared>,
    Path(uid): Path<String>,
    Query(q): Query<MealsParams>,
) -> Json<Value> {
    let s = s.lock().expect("lock");
    let meals: Vec<Value> = s
        .meals
        .iter()
        .rev()
        .filter(|m| m["user_id"] == uid.as_str())
        .filter(|m| match &q.search_date {
            Some(d) => m["meal_date"] == d.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    Json(json!({ "meals": meals }))
}

async fn create_meal(State(s): State<Shared>, Json(mut body): Json<Value>) -> Json<Value> {
    let mut s = s.lock().expect("lock");
    s.next_id += 1;
    body["id"] = json!(s.next_id);
    s.meals.push(body.clone());
    Json(body)
}

async fn delete_meal(State(s): State<Shared>, Path(id): Path<String>) -> (StatusCode, &'static str) {
    let mut s = s.lock().expect("lock");
    if s.fail_deletes {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable");
    }
    let before = s.meals.len();
    s.meals.retain(|m| m["id"].to_string() != id);
    if s.meals.len() == before {
        (StatusCode::NOT_FOUND, "Meal not found")
    } else {
        (StatusCode::OK, "Meal deleted")
    }
}

async fn clear_meals(State(s): State<Shared>, Path(uid): Path<String>) -> StatusCode {
    let mut s = s.lock().expect("lock");
    s.meals.retain(|m| m["user_id"] != uid.as_str());
    StatusCode::NO_CONTENT
}

async fn chat(State(s): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut s = s.lock().expect("lock");
    s.chat_requests.push(body);
    let reply = s.chat_replies.pop_front().unwrap_or_else(|| {
        json!({
            "conversation_id": "c-default",
            "message": "Tell me more about what you ate.",
        })
    });
    Json(reply)
}
