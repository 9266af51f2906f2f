use axum::{debug_handler, extract::{Query, State}, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::SessionContext, AppResult, AppState, AppWorkspaces};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    State(context): State<SessionContext>,
    State(workspaces): State<AppWorkspaces>,
    session: Session,
) -> AppResult<Redirect> {
    session.clear().await;
    workspaces.close().await;
    context.sign_out().await;
    Ok(Redirect::to(return_url.unwrap_or("/".to_string()).as_str()))
}
