use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    chat::{ChatMessage, ChatPhase, InlineImage},
    AppGraph, AppWorkspaces,
};

use super::current;

#[derive(Serialize)]
pub(crate) struct ChatView {
    phase: ChatPhase,
    messages: Vec<ChatMessage>,
    input: String,
    attachment: Option<InlineImage>,
    is_polling: bool,
}

#[derive(Deserialize)]
pub(crate) struct InputBody {
    text: String,
}

#[derive(Deserialize)]
pub(crate) struct HostedQuery {
    url: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn view(State(workspaces): State<AppWorkspaces>) -> Response {
    let workspace = match current(&workspaces).await {
        Ok(workspace) => workspace,
        Err(response) => return response,
    };
    let chat = &workspace.chat;

    Json(ChatView {
        phase: chat.phase().await,
        messages: chat.messages().await,
        input: chat.input().await,
        attachment: chat.attachment().await,
        is_polling: chat.is_polling(),
    })
    .into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn input(
    State(workspaces): State<AppWorkspaces>,
    Json(InputBody { text }): Json<InputBody>,
) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => {
            workspace.chat.set_input(text).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(response) => response,
    }
}

/// Sends the composed input to everyone currently picked.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(State(workspaces): State<AppWorkspaces>) -> Response {
    let workspace = match current(&workspaces).await {
        Ok(workspace) => workspace,
        Err(response) => return response,
    };

    let selected = workspace.people.selected().await;
    Json(workspace.chat.send(&selected).await).into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn remove_attachment(State(workspaces): State<AppWorkspaces>) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => {
            workspace.chat.remove_attachment().await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(response) => response,
    }
}

/// Hosted content as a `data:` URL; empty when it could not be fetched.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn hosted(
    State(graph): State<AppGraph>,
    Query(HostedQuery { url }): Query<HostedQuery>,
) -> String {
    graph.get_hosted_image(&url).await
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn message_html(
    State(workspaces): State<AppWorkspaces>,
    State(graph): State<AppGraph>,
    Path(key): Path<String>,
) -> Response {
    let workspace = match current(&workspaces).await {
        Ok(workspace) => workspace,
        Err(response) => return response,
    };

    let Some(message) = workspace.chat.message(&key).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    Html(graph.inline_hosted_images(&message.content).await).into_response()
}
