mod clients;
mod login;
mod lockin;
mod logout;

use axum::{routing::get, Router};

use crate::AppState;

pub use clients::{IdentityClient, SignInClient};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login))
        .route("/lockin", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}
