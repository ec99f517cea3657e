//! Server-rendered pages.
//!
//! `GET /` serves the polling page; everything it shows is fetched from
//! `/messages` and escaped client-side. `/noscript` renders the log on the
//! server instead. Both templates end in `.html`, so minijinja auto-escapes
//! every interpolated value.

use std::sync::Arc;

use anonchat_core::Message;
use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Form, Router};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::error::ServerError;
use crate::schemas::messages::SendMessageRequest;
use crate::state::AppState;

/// How many of the newest messages the no-script page shows.
pub const NOSCRIPT_WINDOW: usize = 50;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const NOSCRIPT_TEMPLATE: &str = include_str!("../../templates/noscript.html");

/// Template environment with every page registered.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)?;
    env.add_template("noscript.html", NOSCRIPT_TEMPLATE)?;
    Ok(env)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/noscript", get(noscript_page).post(noscript_post))
}

#[derive(Debug, Serialize)]
struct PageMessage {
    time: String,
    user: String,
    text: String,
    attachment: Option<String>,
}

impl From<Message> for PageMessage {
    fn from(m: Message) -> Self {
        let attachment = m.attachment().map(str::to_owned);
        Self {
            time: m.time,
            user: m.user,
            text: m.text,
            attachment,
        }
    }
}

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    let page = state.templates.get_template("index.html")?.render(context! {
        poll_interval_ms => state.config.poll_interval_ms,
        max_upload_bytes => state.config.max_upload_bytes,
    })?;
    Ok(Html(page))
}

pub async fn noscript_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, ServerError> {
    let messages: Vec<PageMessage> = state
        .room
        .list(NOSCRIPT_WINDOW)
        .await?
        .into_iter()
        .map(PageMessage::from)
        .collect();
    let page = state
        .templates
        .get_template("noscript.html")?
        .render(context! { messages })?;
    Ok(Html(page))
}

/// Form submit from the no-script page. Blank text is ignored; either way the
/// browser is sent back to the page.
pub async fn noscript_post(
    State(state): State<Arc<AppState>>,
    Form(req): Form<SendMessageRequest>,
) -> Result<Redirect, ServerError> {
    if req.text.trim().is_empty() {
        debug!("ignoring blank no-script message");
    } else {
        state.room.post(&req.user, &req.text).await?;
    }
    Ok(Redirect::to("/noscript"))
}
