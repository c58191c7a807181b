//! Server-rendered HTML pages.
//!
//! Pages are Tera templates embedded at build time. Names end in `.html`, so
//! every interpolated value is HTML-escaped unless a template marks it `safe`.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::error;

use crate::chat::display::{highlight_sql, user_initial};
use crate::chat::ManagerSnapshot;
use crate::models::{Message, MessageRole, QueryResults};
use crate::notify::Notice;
use crate::upgrade::{UpgradeOutcome, PRO_PLAN};

static TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("layout.html", include_str!("templates/layout.html")),
        ("notice.html", include_str!("templates/notice.html")),
        ("index.html", include_str!("templates/index.html")),
        ("loader.html", include_str!("templates/loader.html")),
        ("not_found.html", include_str!("templates/not_found.html")),
        ("auth.html", include_str!("templates/auth.html")),
        ("contact.html", include_str!("templates/contact.html")),
        ("chat.html", include_str!("templates/chat.html")),
        ("upgrade.html", include_str!("templates/upgrade.html")),
        ("upgrade_complete.html", include_str!("templates/upgrade_complete.html")),
    ])
    .expect("embedded page templates are valid");
    tera.register_filter("highlight_sql", highlight_sql_filter);
    tera
});

/// A page failed to render.
#[derive(Debug, Error)]
#[error("failed to render {template}: {source}")]
pub struct RenderError {
    template: &'static str,
    #[source]
    source: tera::Error,
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        error!(template = self.template, error = ?self.source, "page render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

pub type Page = Result<Html<String>, RenderError>;

fn render(template: &'static str, context: &Context) -> Page {
    TEMPLATES
        .render(template, context)
        .map(Html)
        .map_err(|source| RenderError { template, source })
}

/// Escaped, keyword-highlighted SQL. The template marks the result `safe`.
fn highlight_sql_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let sql = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("highlight_sql expects a string"))?;
    Ok(Value::String(highlight_sql(sql).join("\n")))
}

fn with_notice(notice: Option<&Notice>) -> Context {
    let mut context = Context::new();
    context.insert("notice", &notice);
    context
}

pub fn index() -> Page {
    render("index.html", &Context::new())
}

/// Placeholder shown while the auth state is still being resolved.
pub fn loader() -> Page {
    render("loader.html", &Context::new())
}

pub fn not_found(path: &str) -> Page {
    let mut context = Context::new();
    context.insert("path", path);
    render("not_found.html", &context)
}

pub fn auth(notice: Option<&Notice>) -> Page {
    render("auth.html", &with_notice(notice))
}

pub fn contact(notice: Option<&Notice>) -> Page {
    render("contact.html", &with_notice(notice))
}

// === Chat ===

#[derive(Serialize)]
struct HistoryItem<'a> {
    href: String,
    title: &'a str,
    active: bool,
}

#[derive(Serialize)]
struct MessageView<'a> {
    role: MessageRole,
    content: &'a str,
    sql: Option<&'a str>,
    results: Option<ResultsView<'a>>,
}

#[derive(Serialize)]
struct ResultsView<'a> {
    label: String,
    columns: &'a [String],
    rows: Vec<Vec<String>>,
}

impl<'a> ResultsView<'a> {
    fn new(results: &'a QueryResults) -> Self {
        let rows = (0..results.data.len())
            .map(|i| {
                results
                    .row_values(i)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        Self {
            label: results.row_count_label(),
            columns: &results.columns,
            rows,
        }
    }
}

impl<'a> From<&'a Message> for MessageView<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role,
            content: &message.content,
            sql: message.sql_code.as_deref(),
            results: message.results.as_ref().map(ResultsView::new),
        }
    }
}

pub fn chat(snapshot: &ManagerSnapshot, user_email: Option<&str>) -> Page {
    let history: Vec<HistoryItem<'_>> = snapshot
        .sessions
        .iter()
        .map(|session| HistoryItem {
            href: urlencoding::encode(&session.id).into_owned(),
            title: &session.title,
            active: snapshot.active_session_id.as_deref() == Some(session.id.as_str()),
        })
        .collect();
    let messages: Vec<MessageView<'_>> =
        snapshot.active_messages.iter().map(MessageView::from).collect();

    let mut context = Context::new();
    context.insert("history", &history);
    context.insert("messages", &messages);
    context.insert("email", user_email.unwrap_or(""));
    context.insert("initial", &user_initial(user_email).to_string());
    render("chat.html", &context)
}

// === Upgrade ===

#[derive(Serialize)]
struct PlanView {
    name: &'static str,
    amount: String,
    period: &'static str,
    features: &'static [&'static str],
}

pub fn upgrade(notice: Option<&Notice>) -> Page {
    let mut context = with_notice(notice);
    context.insert(
        "plan",
        &PlanView {
            name: PRO_PLAN.name,
            amount: PRO_PLAN.amount_display(),
            period: PRO_PLAN.period,
            features: PRO_PLAN.features,
        },
    );
    render("upgrade.html", &context)
}

pub fn upgrade_complete(outcome: &UpgradeOutcome, redirect_after: Duration) -> Page {
    let mut context = with_notice(Some(&outcome.notice));
    context.insert("refresh_secs", &redirect_after.as_secs().max(1));
    context.insert("redirect_to", outcome.redirect_to);
    context.insert("receipt_path", &outcome.receipt_path.display().to_string());
    render("upgrade_complete.html", &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatSessionManager;
    use std::path::PathBuf;

    fn html(page: Page) -> String {
        page.unwrap().0
    }

    fn head(page: &str) -> &str {
        page.split("</head>").next().unwrap()
    }

    #[test]
    fn test_chat_page_renders_demo_session() {
        let mut manager = ChatSessionManager::new();
        manager.initialize();
        manager.switch_session("demo");

        let html = html(chat(&manager.snapshot(), Some("jane@example.com")));

        assert!(html.contains("Show me total revenue by categ..."));
        assert!(html.contains("<span class=\"kw\">SELECT</span>"));
        assert!(html.contains("1 row found"));
        assert!(html.contains("<td>Category 10</td>"));
        assert!(html.contains("<td>9036.4</td>"));
        assert!(html.contains("class=\"active\""));
        assert!(html.contains(">J</button>"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let mut manager = ChatSessionManager::new();
        manager.initialize();
        manager.send_message("<script>alert(1)</script>");

        let html = html(chat(&manager.snapshot(), None));

        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)"));
    }

    #[test]
    fn test_session_title_is_escaped() {
        let mut manager = ChatSessionManager::new();
        manager.initialize();
        manager.send_message("<b>bold</b> question");
        manager.new_chat();

        let html = html(chat(&manager.snapshot(), None));

        assert!(!html.contains("<b>bold"));
        assert!(html.contains("&lt;b&gt;bold"));
    }

    #[test]
    fn test_not_found_escapes_path() {
        let html = html(not_found("/<img src=x>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img src=x&gt;"));
    }

    #[test]
    fn test_notice_rendered() {
        let html = html(contact(Some(&Notice::success("Message Sent!", "Thanks"))));
        assert!(html.contains("notice success"));
        assert!(html.contains("Message Sent!"));
        assert!(!html.contains("notice error"));
    }

    #[test]
    fn test_upgrade_page_shows_plan() {
        let html = html(upgrade(None));
        assert!(html.contains("Pro Plan"));
        assert!(html.contains("Confirm Payment ($19.00/month)"));
        assert!(html.contains("<li>Priority email support</li>"));
    }

    #[test]
    fn test_refresh_meta_is_in_head() {
        let page = html(loader());
        assert!(head(&page).contains("<meta http-equiv=\"refresh\" content=\"1\">"));

        let outcome = UpgradeOutcome {
            notice: Notice::success("Payment Successful!", "Welcome to Pro"),
            receipt_path: PathBuf::from("receipt.pdf"),
            redirect_to: "/chat",
        };
        let page = html(upgrade_complete(&outcome, Duration::from_secs(2)));
        assert!(head(&page).contains("http-equiv=\"refresh\" content=\"2;url="));
        assert!(!page.split("</head>").nth(1).unwrap().contains("http-equiv"));
        assert!(page.contains("receipt.pdf"));
    }

    #[test]
    fn test_index_renders_in_layout() {
        let html = html(index());
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("Convert Text to SQL with AI"));
        assert!(html.contains("</body>"));
    }
}
