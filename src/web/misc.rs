use axum::{
    body::Bytes,
    debug_handler,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use crate::{
    alerts::{Alert, Alerts},
    include_res,
    session::SessionContext,
    snapshot::{Snapshot, SnapshotHub},
    AppState,
};

#[debug_handler(state = AppState)]
pub(crate) async fn index(State(context): State<SessionContext>) -> Response {
    if !context.is_authenticated().await {
        return Redirect::to("/login").into_response();
    }

    Html(include_res!(str, "/pages/index.html")).into_response()
}

#[debug_handler(state = AppState)]
pub(crate) async fn me(State(context): State<SessionContext>) -> Response {
    match context.identity().await {
        Some(identity) => Json(identity).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn alerts(State(alerts): State<Alerts>) -> Json<Vec<Alert>> {
    Json(alerts.drain())
}

/// Shares a captured PNG with every listening chat flow.
#[debug_handler(state = AppState)]
pub(crate) async fn snapshot(State(snapshots): State<SnapshotHub>, body: Bytes) -> Response {
    match Snapshot::from_png(body.to_vec()) {
        Ok(snapshot) => {
            let listeners = snapshots.share(snapshot);
            Json(json!({ "listeners": listeners })).into_response()
        }
        Err(err) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn no_profile_photo() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/png")],
        include_res!(bytes, "/assets/no-profile-photo.png"),
    )
}
