use anyhow::Context;
use mealmind_client::{
    app::{Action, AppEvent, Command, Dashboard},
    auth::SignupForm,
    clock::local_today,
    state::AppState,
    users::ProfileForm,
    view,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
commands:
  <text>                 describe a meal or ask about food
  /confirm [n ...]       log all pending meals, or only the numbered ones
  /cancel [keep]         discard pending meals (keep: keep the history)
  /prev /next /today     change the viewed day
  /date YYYY-MM-DD       jump to a day
  /refresh               reload the viewed day
  /delete <id>           delete a logged meal
  /profile [first last dob weight height]
  /login <id-token>      sign in with an identity token
  /signup <email> <password> <first> <last> <dob> <weight> <height>
  /logout
  /clear                 delete every logged meal
  /quit";

#[derive(Debug, PartialEq)]
enum Input {
    Action(Action),
    ShowProfile,
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Input::Action(Action::SendMessage(line.to_string())));
    };
    let mut parts = rest.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let input = match (cmd, args.as_slice()) {
        ("confirm", []) => Input::Action(Action::ConfirmAll),
        ("confirm", idx) => match idx.iter().map(|s| s.parse::<usize>()).collect::<Result<Vec<_>, _>>() {
            Ok(indices) => Input::Action(Action::ConfirmSelected(indices)),
            Err(_) => Input::Invalid("meal numbers must be whole numbers".into()),
        },
        ("cancel", []) => Input::Action(Action::Cancel { keep_history: false }),
        ("cancel", ["keep"]) => Input::Action(Action::Cancel { keep_history: true }),
        ("prev", []) => Input::Action(Action::PreviousDay),
        ("next", []) => Input::Action(Action::NextDay),
        ("today", []) => Input::Action(Action::Today),
        ("date", [d]) => {
            let fmt = time::macros::format_description!("[year]-[month]-[day]");
            match time::Date::parse(d, &fmt) {
                Ok(date) => Input::Action(Action::GoToDate(date)),
                Err(_) => Input::Invalid(format!("`{d}` is not a YYYY-MM-DD date")),
            }
        }
        ("refresh", []) => Input::Action(Action::Refresh),
        ("delete", [id]) => Input::Action(Action::DeleteMeal(id.to_string())),
        ("profile", []) => Input::ShowProfile,
        ("profile", [first, last, dob, weight, height]) => {
            Input::Action(Action::SaveProfile(ProfileForm {
                first_name: first.to_string(),
                last_name: last.to_string(),
                date_of_birth: dob.to_string(),
                weight: weight.to_string(),
                height: height.to_string(),
            }))
        }
        ("login", [token]) => Input::Action(Action::Login(token.to_string())),
        ("signup", [email, password, first, last, dob, weight, height]) => {
            Input::Action(Action::SignUp(SignupForm {
                email: email.to_string(),
                password: password.to_string(),
                profile: ProfileForm {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    date_of_birth: dob.to_string(),
                    weight: weight.to_string(),
                    height: height.to_string(),
                },
            }))
        }
        ("signup", _) => Input::Invalid("/signup needs all seven fields; /help shows the order".into()),
        ("logout", []) => Input::Action(Action::Logout),
        ("clear", []) => Input::Action(Action::ClearAllMeals),
        ("help", _) => Input::Help,
        ("quit", _) | ("exit", _) => Input::Quit,
        _ => Input::Invalid(format!("unknown command `/{rest}`; /help lists them")),
    };
    Some(input)
}

fn spawn_commands(state: &AppState, tx: &mpsc::UnboundedSender<AppEvent>, commands: Vec<Command>) {
    for command in commands {
        let state = state.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = state.execute(command).await;
            if tx.send(event).is_err() {
                tracing::debug!("event loop gone; dropping result");
            }
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealmind_client=info,mealmind=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let state = AppState::init().context("loading configuration")?;
    tracing::info!(api = %state.api.base_url(), "mealmind client starting");

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut dashboard = Dashboard::new(local_today());

    let mut session_rx = state.session.subscribe();
    let initial = session_rx.borrow_and_update().clone();
    let commands = dashboard.set_session(initial);
    spawn_commands(&state, &tx, commands);
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            while session_rx.changed().await.is_ok() {
                let next = session_rx.borrow_and_update().clone();
                if tx.send(AppEvent::SessionChanged(next)).is_err() {
                    break;
                }
            }
        });
    }

    println!("{HELP}\n");
    print!("{}", view::dashboard(&dashboard));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    None => continue,
                    Some(Input::Quit) => break,
                    Some(Input::Help) => println!("{HELP}"),
                    Some(Input::Invalid(msg)) => println!("* {msg}"),
                    Some(Input::ShowProfile) => {
                        print!("{}", view::profile(dashboard.profile().profile()));
                        continue;
                    }
                    Some(Input::Action(action)) => {
                        let commands = dashboard.dispatch(action);
                        spawn_commands(&state, &tx, commands);
                    }
                }
            }
            Some(event) = rx.recv() => {
                let commands = dashboard.apply(event);
                spawn_commands(&state, &tx, commands);
            }
        }

        dashboard.set_today(local_today());
        for notice in dashboard.take_notices() {
            println!("* {notice}");
        }
        println!();
        print!("{}", view::dashboard(&dashboard));
    }

    tracing::info!("bye");
    Ok(())
}
