use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{people::Person, AppWorkspaces};

use super::current;

#[derive(Deserialize)]
pub(crate) struct InputBody {
    text: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn view(State(workspaces): State<AppWorkspaces>) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => Json(workspace.people.view().await).into_response(),
        Err(response) => response,
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn input(
    State(workspaces): State<AppWorkspaces>,
    Json(InputBody { text }): Json<InputBody>,
) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => {
            workspace.people.input_changed(&text).await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(response) => response,
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn select(
    State(workspaces): State<AppWorkspaces>,
    Json(person): Json<Person>,
) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => {
            let added = workspace.people.select(person).await;
            Json(json!({ "added": added })).into_response()
        }
        Err(response) => response,
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn remove(
    State(workspaces): State<AppWorkspaces>,
    Json(person): Json<Person>,
) -> Response {
    match current(&workspaces).await {
        Ok(workspace) => {
            let removed = workspace.people.remove(&person).await;
            Json(json!({ "removed": removed })).into_response()
        }
        Err(response) => response,
    }
}
