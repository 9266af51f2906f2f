//! JSON surface the page talks to. Presentation lives in the browser.

mod chat;
mod misc;
mod people;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};

use crate::{graph::HttpGraph, workspace::Workspace, AppState, AppWorkspaces};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(misc::index))
        .route("/me", get(misc::me))
        .route("/alerts", get(misc::alerts))
        .route("/snapshot", post(misc::snapshot))
        .route("/assets/no-profile-photo.png", get(misc::no_profile_photo))

        .route("/chat", get(chat::view))
        .route("/chat/input", post(chat::input))
        .route("/chat/send", post(chat::send))
        .route("/chat/attachment", delete(chat::remove_attachment))
        .route("/chat/hosted", get(chat::hosted))
        .route("/chat/messages/{key}/html", get(chat::message_html))

        .route("/people", get(people::view))
        .route("/people/input", post(people::input))
        .route("/people/select", post(people::select))
        .route("/people/remove", post(people::remove))
}

/// The signed-in workspace, or a ready-made 401.
pub(crate) async fn current(workspaces: &AppWorkspaces) -> Result<Workspace<HttpGraph>, Response> {
    workspaces
        .current()
        .await
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "not signed in").into_response())
}
