//! Settings read from the environment (and `.env`, loaded in `main`).

use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

use crate::{chat::ChatSettings, graph::types::UserType, people::SearchSettings};

const DEFAULT_SCOPES: &str =
    "openid profile offline_access User.Read People.Read User.ReadBasic.All Chat.ReadWrite Chat.Create";

#[derive(Debug, Clone)]
pub struct Config {
    /// Env: `HTTP_ADDR`, default `127.0.0.1:8080`.
    pub http_addr: SocketAddr,

    /// App registration id. Env: `GRAPH_CLIENT_ID` (required).
    pub client_id: String,
    /// Env: `GRAPH_CLIENT_SECRET`. Public clients leave it unset.
    pub client_secret: Option<String>,
    /// Env: `GRAPH_TENANT`, default `common`.
    pub tenant: String,
    /// Env: `GRAPH_REDIRECT_URL`.
    pub redirect_url: String,
    /// Space separated in `GRAPH_SCOPES`.
    pub scopes: Vec<String>,
    /// Env: `GRAPH_URL`, default `https://graph.microsoft.com`.
    pub graph_url: String,

    /// Topic given to chats created on first send. Env: `CHAT_TOPIC`.
    pub chat_topic: String,
    pub poll_delay: Duration,
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub search_top: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: ([127, 0, 0, 1], 8080).into(),
            client_id: String::new(),
            client_secret: None,
            tenant: "common".to_owned(),
            redirect_url: "http://localhost:8080/lockin".to_owned(),
            scopes: split_scopes(DEFAULT_SCOPES),
            graph_url: "https://graph.microsoft.com".to_owned(),
            chat_topic: "Test Chat".to_owned(),
            poll_delay: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(5000),
            search_debounce: Duration::from_millis(300),
            search_top: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        config.client_id = dotenv::var("GRAPH_CLIENT_ID").context("GRAPH_CLIENT_ID must be set")?;
        config.client_secret = dotenv::var("GRAPH_CLIENT_SECRET").ok().filter(|s| !s.is_empty());

        if let Ok(tenant) = dotenv::var("GRAPH_TENANT") {
            config.tenant = tenant;
        }
        if let Ok(url) = dotenv::var("GRAPH_REDIRECT_URL") {
            config.redirect_url = url;
        }
        if let Ok(scopes) = dotenv::var("GRAPH_SCOPES") {
            config.scopes = split_scopes(&scopes);
        }
        if let Ok(url) = dotenv::var("GRAPH_URL") {
            config.graph_url = url.trim_end_matches('/').to_owned();
        }
        if let Ok(addr) = dotenv::var("HTTP_ADDR") {
            config.http_addr = addr.parse().with_context(|| format!("invalid HTTP_ADDR {addr}"))?;
        }
        if let Ok(topic) = dotenv::var("CHAT_TOPIC") {
            config.chat_topic = topic;
        }

        config.poll_delay = millis("POLL_DELAY_MS", config.poll_delay)?;
        config.poll_interval = millis("POLL_INTERVAL_MS", config.poll_interval)?;
        config.search_debounce = millis("SEARCH_DEBOUNCE_MS", config.search_debounce)?;
        if let Ok(top) = dotenv::var("SEARCH_TOP") {
            config.search_top = top.parse().with_context(|| format!("invalid SEARCH_TOP {top}"))?;
        }

        Ok(config)
    }

    pub fn authority(&self) -> String {
        format!("https://login.microsoftonline.com/{}/oauth2/v2.0", self.tenant)
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            topic: self.chat_topic.clone(),
            poll_delay: self.poll_delay,
            poll_interval: self.poll_interval,
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: self.search_debounce,
            top: self.search_top,
            user_type: UserType::Any,
        }
    }
}

fn split_scopes(scopes: &str) -> Vec<String> {
    scopes.split_whitespace().map(str::to_owned).collect()
}

fn millis(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match dotenv::var(key) {
        Ok(value) => Ok(Duration::from_millis(
            value.parse().with_context(|| format!("invalid {key} {value}"))?,
        )),
        Err(_) => Ok(default),
    }
}
