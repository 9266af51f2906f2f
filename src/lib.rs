pub mod alerts;
pub mod appresult;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod graph;
pub mod people;
pub mod res;
pub mod session;
pub mod snapshot;
pub mod subscription;
pub mod web;
pub mod workspace;

use std::sync::Arc;

use axum::{extract::FromRef, Router};

use crate::{
    alerts::Alerts,
    auth::SignInClient,
    config::Config,
    graph::{GraphClient, HttpGraph},
    session::SessionContext,
    snapshot::SnapshotHub,
    workspace::Workspaces,
};

pub use appresult::{AppError, AppResult};

pub type AppGraph = Arc<GraphClient<HttpGraph>>;
pub type AppWorkspaces = Workspaces<HttpGraph>;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub sign_in: SignInClient,
    pub context: SessionContext,
    pub alerts: Alerts,
    pub snapshots: SnapshotHub,
    pub graph: AppGraph,
    pub workspaces: AppWorkspaces,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let sign_in = SignInClient::from_config(config)?;
        let context = SessionContext::new();
        let alerts = Alerts::new();
        let snapshots = SnapshotHub::default();

        let api = HttpGraph::new(reqwest::Client::new(), config.graph_url.clone(), context.clone());
        let graph = Arc::new(GraphClient::new(api, context.clone(), alerts.clone()));
        let workspaces = Workspaces::new(
            graph.clone(),
            snapshots.clone(),
            config.chat_settings(),
            config.search_settings(),
        );

        Ok(Self {
            sign_in,
            context,
            alerts,
            snapshots,
            graph,
            workspaces,
        })
    }

    pub fn router(self) -> Router {
        Router::new()
            .merge(auth::router())
            .merge(web::router())
            .with_state(self)
    }
}
