//! End-to-end tests of the client against an in-process backend stub.
//!
//! These exercise:
//! - Sign-up, sign-in, token checks and sign-out
//! - Chat, confirmation and the daily meal list
//! - Profile editing and nutrition targets

mod common;

use common::{drive, id_token, meal_json, Backend, StubBackend};
use mealmind_client::{
    app::{Action, Dashboard},
    auth::SignupForm,
    chat::Phase,
    meals::services::{create_meal, fetch_meals},
    nutrition::Nutrients,
    state::AppState,
    users::{services::fetch_profile, ProfileForm},
    view, ClientError,
};
use serde_json::json;
use time::{macros::date, Date, OffsetDateTime};

const TODAY: Date = date!(2026 - 10 - 15);

async fn signed_in(backend: &StubBackend, uid: &str) -> (AppState, Dashboard) {
    let state = backend.app_state();
    let mut dashboard = Dashboard::new(TODAY);
    let commands = dashboard.dispatch(Action::Login(id_token(uid, 3600)));
    drive(&state, &mut dashboard, commands).await;
    assert_eq!(dashboard.user_id(), Some(uid));
    (state, dashboard)
}

#[tokio::test]
async fn test_login_verifies_with_backend() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let (state, dashboard) = signed_in(&backend, "firebase-uid-1").await;

    assert_eq!(backend.with(|b| b.verify_calls), 1);
    let session = state.session.state();
    assert!(!session.initializing);
    assert_eq!(session.uid(), Some("firebase-uid-1"));
    assert!(dashboard.log().meals().is_empty());
    assert!(dashboard.log().last_error().is_none());
}

#[tokio::test]
async fn test_expired_token_never_reaches_backend() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let state = backend.app_state();
    let mut dashboard = Dashboard::new(TODAY);

    let commands = dashboard.dispatch(Action::Login(id_token("u1", -3600)));
    drive(&state, &mut dashboard, commands).await;

    assert_eq!(backend.with(|b| b.verify_calls), 0);
    assert_eq!(dashboard.user_id(), None);
    let notices = dashboard.take_notices();
    assert!(notices[0].contains("expired"), "{notices:?}");

    let err = state
        .session
        .login(&state.api, &id_token("u1", -3600))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ExpiredToken));
}

#[tokio::test]
async fn test_logout_clears_dashboard() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    let commands = dashboard.dispatch(Action::SendMessage("a banana".into()));
    drive(&state, &mut dashboard, commands).await;
    assert!(!dashboard.conversation().history().is_empty());

    let commands = dashboard.dispatch(Action::Logout);
    drive(&state, &mut dashboard, commands).await;

    assert_eq!(dashboard.user_id(), None);
    let mut session = state.session.subscribe();
    if session.borrow_and_update().user.is_some() {
        session.changed().await.expect("session update");
    }
    assert!(session.borrow().user.is_none());
    assert!(dashboard.conversation().history().is_empty());
    assert_eq!(view::dashboard(&dashboard), "Signed out. Use /login <id-token> to sign in.\n");
}

#[tokio::test]
async fn test_log_two_meals_from_one_message() {
    let backend = StubBackend::spawn(Backend::default()).await;
    backend.with(|b| {
        b.chat_replies.push_back(json!({
            "conversation_id": "c-1",
            "meals": [meal_json("2 eggs", 156.0, 12.6), meal_json("toast", 64.0, 2.0)],
            "conversation_complete": false,
        }))
    });
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    let commands = dashboard.dispatch(Action::SendMessage("I had 2 eggs and toast".into()));
    assert!(dashboard.conversation().is_loading());
    assert!(view::history(dashboard.conversation()).contains(view::THINKING));
    drive(&state, &mut dashboard, commands).await;

    let request = backend.with(|b| b.chat_requests[0].clone());
    assert_eq!(request["user_id"], "u1");
    assert_eq!(request["description"], "I had 2 eggs and toast");
    assert_eq!(request["conversation_id"], serde_json::Value::Null);
    assert_eq!(request["model"], "gpt-4");
    assert_eq!(request["max_tokens"], 150);
    assert!(request.get("user_feedback").is_none());

    assert_eq!(dashboard.conversation().candidates().len(), 2);
    assert_eq!(
        dashboard.conversation().history().last().map(String::as_str),
        Some("App: Found 2 meals: \"2 eggs\" (156 cal), \"toast\" (64 cal)")
    );

    let commands = dashboard.dispatch(Action::ConfirmAll);
    drive(&state, &mut dashboard, commands).await;

    let meals = dashboard.log().meals();
    assert_eq!(meals.len(), 2);
    assert_eq!(meals[0].description, "toast");
    assert_eq!(meals[1].description, "2 eggs");
    assert_eq!(dashboard.log().totals().calories, 220.0);
    assert_eq!(dashboard.conversation().phase(), &Phase::Idle);
    assert!(dashboard.conversation().history().is_empty());
    assert!(dashboard.conversation().conversation_id().is_none());

    // the backend filed both under the viewed day
    let stored = fetch_meals(&state.api, "u1", TODAY).await.expect("fetch");
    let ids: Vec<_> = stored.iter().map(|m| m.id.clone()).collect();
    let shown: Vec<_> = dashboard.log().meals().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, shown);
}

#[tokio::test]
async fn test_refinement_sends_feedback_and_conversation_id() {
    let backend = StubBackend::spawn(Backend::default()).await;
    backend.with(|b| {
        b.chat_replies.push_back(json!({
            "conversation_id": "c-9",
            "meal": meal_json("pasta", 400.0, 14.0),
        }));
        b.chat_replies.push_back(json!({
            "conversation_id": "c-9",
            "meal": meal_json("pasta, large bowl", 600.0, 21.0),
        }));
    });
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    let commands = dashboard.dispatch(Action::SendMessage("pasta".into()));
    drive(&state, &mut dashboard, commands).await;
    assert!(dashboard.conversation().is_awaiting_confirmation());

    let commands = dashboard.dispatch(Action::SendMessage("it was a big bowl".into()));
    drive(&state, &mut dashboard, commands).await;

    let second = backend.with(|b| b.chat_requests[1].clone());
    assert_eq!(second["conversation_id"], "c-9");
    assert_eq!(second["user_feedback"], "it was a big bowl");
    assert_eq!(
        dashboard.conversation().candidates()[0].description,
        "pasta, large bowl"
    );

    let commands = dashboard.dispatch(Action::Cancel { keep_history: true });
    assert!(commands.is_empty());
    assert_eq!(dashboard.conversation().phase(), &Phase::Idle);
    assert_eq!(dashboard.conversation().history().len(), 4);
    assert!(backend.with(|b| b.meals.is_empty()));
}

#[tokio::test]
async fn test_plain_message_reply_returns_to_idle() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    let commands = dashboard.dispatch(Action::SendMessage("is rice healthy?".into()));
    drive(&state, &mut dashboard, commands).await;

    assert_eq!(dashboard.conversation().phase(), &Phase::Idle);
    assert_eq!(dashboard.conversation().conversation_id(), Some("c-default"));
    assert_eq!(
        dashboard.conversation().history(),
        &[
            "You: is rice healthy?".to_string(),
            "App: Tell me more about what you ate.".to_string()
        ]
    );
}

#[tokio::test]
async fn test_delete_meal_success_and_failure() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let api = backend.api();
    let now = OffsetDateTime::now_utc();
    for (d, cal) in [("oatmeal", 150.0), ("apple", 95.0)] {
        let candidate = serde_json::from_value(meal_json(d, cal, 1.0)).expect("candidate");
        create_meal(&api, "u1", &candidate, TODAY, now).await.expect("seed");
    }

    let (state, mut dashboard) = signed_in(&backend, "u1").await;
    assert_eq!(dashboard.log().meals().len(), 2);
    let apple_id = dashboard.log().meals()[0].id.clone();

    backend.with(|b| b.fail_deletes = true);
    let commands = dashboard.dispatch(Action::DeleteMeal(apple_id.clone()));
    drive(&state, &mut dashboard, commands).await;
    assert_eq!(dashboard.log().meals().len(), 2);
    assert!(dashboard
        .take_notices()
        .iter()
        .any(|n| n.starts_with("Could not delete meal")));

    backend.with(|b| b.fail_deletes = false);
    let commands = dashboard.dispatch(Action::DeleteMeal(apple_id));
    drive(&state, &mut dashboard, commands).await;
    assert_eq!(dashboard.log().meals().len(), 1);
    assert_eq!(dashboard.log().totals().calories, 150.0);
    assert_eq!(backend.with(|b| b.meals.len()), 1);
}

#[tokio::test]
async fn test_empty_day_has_zero_totals() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    let commands = dashboard.dispatch(Action::PreviousDay);
    drive(&state, &mut dashboard, commands).await;

    assert_eq!(dashboard.log().date(), date!(2026 - 10 - 14));
    assert_eq!(dashboard.log().totals(), Nutrients::default());
    let screen = view::dashboard(&dashboard);
    assert!(screen.contains("Wed Oct 14 2026"));
    assert!(!screen.contains("(today)"));
    assert!(screen.contains(view::EMPTY_MEALS));
}

#[tokio::test]
async fn test_lenient_meal_fields_from_backend() {
    let backend = StubBackend::spawn(Backend::default()).await;
    backend.with(|b| {
        b.meals.push(json!({
            "id": 17,
            "user_id": "u1",
            "description": "latte",
            "calories": "190 kcal",
            "protein": "~10g",
            "sugar": -3,
            "meal_date": "2026-10-15",
            "timestamp": "2026-10-15T08:30:00",
        }))
    });
    let api = backend.api();

    let meals = fetch_meals(&api, "u1", TODAY).await.expect("fetch");
    assert_eq!(meals.len(), 1);
    assert_eq!(meals[0].id, "17");
    assert_eq!(meals[0].calories, Some(190.0));
    assert_eq!(meals[0].protein, Some(10.0));
    assert_eq!(meals[0].sugar, None);
    assert_eq!(meals[0].fiber, None);
    assert_eq!(meals[0].nutrients().sugar, 0.0);
}

#[tokio::test]
async fn test_profile_save_refreshes_needs() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let (state, mut dashboard) = signed_in(&backend, "u1").await;

    // no profile yet: 404s are not errors
    assert!(dashboard.profile().profile().is_none());
    assert!(dashboard.profile().last_error().is_none());
    assert_eq!(dashboard.profile().needs().0.calories, 0.0);
    let needs_calls = backend.with(|b| b.needs_calls);

    let form = ProfileForm {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        date_of_birth: "1990-12-10".into(),
        weight: "61.5".into(),
        height: "170".into(),
    };
    let commands = dashboard.dispatch(Action::SaveProfile(form));
    drive(&state, &mut dashboard, commands).await;

    let put = backend.with(|b| b.profile_puts[0].clone());
    assert_eq!(put["weight"], 61.5);
    assert_eq!(put["date_of_birth"], "1990-12-10");
    assert_eq!(backend.with(|b| b.needs_calls), needs_calls + 1);
    assert_eq!(dashboard.profile().needs().0.calories, 2100.0);
    assert_eq!(dashboard.profile().needs().0.fiber, 0.0);
    assert_eq!(
        dashboard.profile().profile().map(|p| p.first_name.as_str()),
        Some("Ada")
    );

    let profile = fetch_profile(&state.api, "u1").await.expect("profile");
    assert_eq!(profile.height, 170.0);
    assert!(fetch_profile(&state.api, "nobody")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_clear_all_meals() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let api = backend.api();
    let candidate = serde_json::from_value(meal_json("soup", 120.0, 4.0)).expect("candidate");
    create_meal(&api, "u1", &candidate, TODAY, OffsetDateTime::now_utc())
        .await
        .expect("seed");

    let (state, mut dashboard) = signed_in(&backend, "u1").await;
    assert_eq!(dashboard.log().meals().len(), 1);

    let commands = dashboard.dispatch(Action::ClearAllMeals);
    drive(&state, &mut dashboard, commands).await;
    assert!(dashboard.log().meals().is_empty());
    assert!(backend.with(|b| b.meals.is_empty()));
}

#[tokio::test]
async fn test_sign_up_then_log_in() {
    let backend = StubBackend::spawn(Backend::default()).await;
    let state = backend.app_state();
    let mut dashboard = Dashboard::new(TODAY);
    let form = SignupForm {
        email: "ada@example.com".into(),
        password: "correct horse".into(),
        profile: ProfileForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: "1990-12-10".into(),
            weight: "61.5".into(),
            height: "170".into(),
        },
    };

    let commands = dashboard.dispatch(Action::SignUp(form.clone()));
    drive(&state, &mut dashboard, commands).await;
    assert_eq!(dashboard.take_notices(), vec!["Account created. Please log in.".to_string()]);
    assert_eq!(dashboard.user_id(), None);

    let body = backend.with(|b| b.signups[0].clone());
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["password"], "correct horse");
    assert_eq!(body["first_name"], "Ada");
    assert_eq!(body["weight"], 61.5);
    assert_eq!(body["height"], 170.0);

    let commands = dashboard.dispatch(Action::SignUp(form));
    drive(&state, &mut dashboard, commands).await;
    let notices = dashboard.take_notices();
    assert!(notices[0].starts_with("Sign-up failed"), "{notices:?}");
    assert!(notices[0].contains("already exists"), "{notices:?}");
    assert_eq!(backend.with(|b| b.signups.len()), 1);

    // the stored profile has an integer id
    let commands = dashboard.dispatch(Action::Login(id_token("uid-1", 3600)));
    drive(&state, &mut dashboard, commands).await;
    assert_eq!(dashboard.user_id(), Some("uid-1"));
    let profile = dashboard.profile().profile().expect("profile loaded");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.height, 170.0);
}
