use anyhow::anyhow;
use axum::{debug_handler, extract::{Query, State}, response::{IntoResponse, Redirect, Response}};
use oauth2::{reqwest, AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    alerts::Alerts,
    session::{SessionContext, CSRF_STATE, PKCE_VERIFIER, RETURN_URL},
    AppGraph, AppResult, AppState, AppWorkspaces,
};

use super::SignInClient;

#[derive(Deserialize)]
pub(crate) struct LockinQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    /// Set instead of `code` when the user or tenant refused.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Query(LockinQuery { state, code, error, error_description }): Query<LockinQuery>,
    State(sign_in): State<SignInClient>,
    State(context): State<SessionContext>,
    State(graph): State<AppGraph>,
    State(alerts): State<Alerts>,
    State(workspaces): State<AppWorkspaces>,
    session: Session,
) -> AppResult<Response> {
    if let Some(error) = error {
        let detail = serde_json::json!({ "error": error, "description": error_description });
        alerts.add_error("Login failed", Some(detail.to_string()));
        return Ok(Redirect::to("/").into_response());
    }

    let state = CsrfToken::new(state.ok_or(anyhow!("OAuth: without state"))?);
    let code = AuthorizationCode::new(code.ok_or(anyhow!("OAuth: without code"))?);

    let Some(stored_state) = session.remove::<String>(CSRF_STATE).await? else {
        return Err(anyhow!("no csrf_state"))?;
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err(anyhow!("csrf tokens don't match"))?;
    }

    let Some(pkce_verifier) = session.remove::<String>(PKCE_VERIFIER).await? else {
        return Err(anyhow!("no pkce_verifier"))?;
    };

    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = match sign_in
        .client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await
    {
        Ok(token_result) => token_result,
        Err(err) => {
            tracing::warn!(error = %err, "token exchange failed");
            alerts.add_error("Login failed", Some(err.to_string()));
            return Ok(Redirect::to("/").into_response());
        }
    };

    let access_token = token_result.access_token().secret().clone();
    let scopes = token_result
        .scopes()
        .unwrap_or(&sign_in.scopes)
        .iter()
        .map(|scope| scope.as_str().to_owned())
        .collect();

    match context.sign_in(graph.api(), access_token, scopes).await {
        Ok(identity) => {
            tracing::info!(name = %identity.display_name, "welcome");
            workspaces.open().await;
        }
        Err(err) => {
            alerts.add_error("Login failed", Some(err.detail()));
            return Ok(Redirect::to("/").into_response());
        }
    }

    let return_url = session.remove::<String>(RETURN_URL).await?;
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")).into_response())
}
