//! Plain-text rendering of the dashboard for the terminal front end.

use std::fmt::Write as _;

use time::{macros::format_description, Date};

use crate::app::Dashboard;
use crate::chat::Conversation;
use crate::meals::{MealCandidate, MealEntry};
use crate::nutrition::{Nutrient, Nutrients};
use crate::users::{NutritionNeeds, UserProfile};

pub const EMPTY_MEALS: &str = "No meals logged for this date.";
pub const EMPTY_HISTORY: &str = "Ask about food or log a meal by typing below";
pub const THINKING: &str = "AI is thinking...";

/// `Thu Oct 15 2026`, with a marker when the date is today.
pub fn date_header(date: Date, today: Date) -> String {
    let fmt = format_description!("[weekday repr:short] [month repr:short] [day] [year]");
    let text = date.format(&fmt).unwrap_or_else(|_| date.to_string());
    if date == today {
        format!("{text} (today)")
    } else {
        text
    }
}

/// One line of the daily summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub nutrient: Nutrient,
    pub total: f64,
    pub target: f64,
    /// `round(target - total)`; negative once the target is exceeded.
    pub remaining: i64,
    pub over: bool,
}

pub fn summary_rows(totals: &Nutrients, needs: &NutritionNeeds) -> Vec<SummaryRow> {
    Nutrient::ALL
        .iter()
        .map(|&nutrient| {
            let total = totals.get(nutrient);
            let target = needs.0.get(nutrient);
            SummaryRow {
                nutrient,
                total,
                target,
                remaining: (target - total).round() as i64,
                over: total >= target,
            }
        })
        .collect()
}

pub fn nutrition_summary(totals: &Nutrients, needs: &NutritionNeeds) -> String {
    let mut out = String::new();
    for row in summary_rows(totals, needs) {
        let _ = writeln!(
            out,
            "{:<12} {:>9} {:>6}{}",
            row.nutrient.label(),
            format!("{:.0}/{:.0}", row.total, row.target),
            row.remaining,
            if row.over { " over" } else { "" }
        );
    }
    out
}

fn nutrient_line(n: &Nutrients) -> String {
    Nutrient::ALL
        .iter()
        .map(|&k| {
            let label = k.label().split(' ').next().unwrap_or_default();
            format!("{label}: {:.0}", n.get(k))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn meal_list(meals: &[MealEntry]) -> String {
    if meals.is_empty() {
        return format!("{EMPTY_MEALS}\n");
    }
    let mut out = String::new();
    for meal in meals {
        let _ = writeln!(out, "[{}] {}", meal.id, meal.description);
        let _ = writeln!(out, "    {}", nutrient_line(&meal.nutrients()));
    }
    out
}

pub fn history(conversation: &Conversation) -> String {
    let mut out = String::new();
    if conversation.history().is_empty() && !conversation.is_loading() {
        let _ = writeln!(out, "{EMPTY_HISTORY}");
    }
    for line in conversation.history() {
        let _ = writeln!(out, "{line}");
    }
    if conversation.is_loading() {
        let _ = writeln!(out, "{THINKING}");
    }
    out
}

/// The batch awaiting confirmation, numbered for `/confirm`.
pub fn confirmation_card(candidates: &[MealCandidate]) -> String {
    let mut out = String::new();
    for (i, c) in candidates.iter().enumerate() {
        let _ = writeln!(out, "({i}) {}", c.description);
        if let Some(a) = c.assumptions.as_deref().filter(|a| !a.trim().is_empty()) {
            let _ = writeln!(out, "    {a}");
        }
        let _ = writeln!(out, "    {}", nutrient_line(&c.nutrients));
    }
    out.push_str("/confirm [n ...] to log, or type to refine, /cancel to discard\n");
    out
}

pub fn profile(profile: Option<&UserProfile>) -> String {
    match profile {
        Some(p) => format!(
            "{} {}, born {}, {} kg, {} cm\n",
            p.first_name, p.last_name, p.date_of_birth, p.weight, p.height
        ),
        None => "No profile saved yet. Use /profile to set one.\n".to_string(),
    }
}

pub fn dashboard(d: &Dashboard) -> String {
    if d.is_initializing() {
        return "Loading...\n".to_string();
    }
    let Some(uid) = d.user_id() else {
        return "Signed out. Use /login <id-token> to sign in.\n".to_string();
    };

    let log = d.log();
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==  ({uid})", date_header(log.date(), d.today()));
    out.push_str(&nutrition_summary(&log.totals(), &d.profile().needs()));
    out.push('\n');
    if log.is_loading() && log.meals().is_empty() {
        out.push_str("Loading meals...\n");
    } else {
        out.push_str(&meal_list(log.meals()));
    }
    if let Some(e) = log.last_error() {
        let _ = writeln!(out, "! {e} (/refresh to retry)");
    }
    out.push('\n');
    out.push_str(&history(d.conversation()));
    let candidates = d.conversation().candidates();
    if !candidates.is_empty() {
        out.push_str(&confirmation_card(candidates));
    }
    out
}
