use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong talking to Graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("graph returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("not a hosted content url: {0}")]
    InvalidHostedContentUrl(String),
}

impl GraphError {
    /// Pretty JSON diagnostic attached to alerts.
    pub fn detail(&self) -> String {
        let mut value = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });

        if let GraphError::Status { status, body } = self {
            value["statusCode"] = json!(status.as_u16());
            value["body"] = serde_json::from_str(body).unwrap_or_else(|_| json!(body));
        }

        serde_json::to_string_pretty(&value).unwrap_or_else(|_| self.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            GraphError::NotSignedIn => "notSignedIn",
            GraphError::Transport(_) => "transport",
            GraphError::Status { .. } => "status",
            GraphError::Shape(_) => "shape",
            GraphError::InvalidHostedContentUrl(_) => "invalidHostedContentUrl",
        }
    }
}
