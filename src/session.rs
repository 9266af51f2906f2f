use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::{error::GraphError, graph::GraphApi};

// tower-sessions keys used during the OAuth round trip
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

pub const DEFAULT_AVATAR: &str = "/assets/no-profile-photo.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub display_name: String,
    pub email: String,
    pub time_zone: String,
    pub avatar: String,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user_id: String,
    pub access_token: String,
    pub scopes: Vec<String>,
    pub identity: Identity,
}

/// Who is signed in and how to call Graph on their behalf.
///
/// Built once in `main` and cloned into everything that needs it. Sign-in
/// and sign-out swap the whole [`SignedIn`] record under one write lock,
/// so readers never see a token from one user with the id of another.
#[derive(Clone, Default)]
pub struct SessionContext {
    state: Arc<RwLock<Option<SignedIn>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.user_id.clone())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.access_token.clone())
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.as_ref().map(|s| s.identity.clone())
    }

    pub async fn scopes(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.scopes.clone())
            .unwrap_or_default()
    }

    /// Looks the user up with `access_token` and, only if that works,
    /// installs the new session.
    pub async fn sign_in<A: GraphApi>(
        &self,
        api: &A,
        access_token: String,
        scopes: Vec<String>,
    ) -> Result<Identity, GraphError> {
        let user = api.me(&access_token).await?;
        let identity = Identity {
            display_name: user.display_name.unwrap_or_default(),
            email: user.mail.or(user.user_principal_name).unwrap_or_default(),
            time_zone: user
                .mailbox_settings
                .and_then(|m| m.time_zone)
                .unwrap_or_else(|| "UTC".to_owned()),
            avatar: DEFAULT_AVATAR.to_owned(),
        };

        tracing::info!(user_id = %user.id, name = %identity.display_name, "signed in");
        self.install(SignedIn {
            user_id: user.id,
            access_token,
            scopes,
            identity: identity.clone(),
        })
        .await;

        Ok(identity)
    }

    pub async fn install(&self, signed_in: SignedIn) {
        *self.state.write().await = Some(signed_in);
    }

    /// Returns whether anyone was signed in.
    pub async fn sign_out(&self) -> bool {
        let previous = self.state.write().await.take();
        if let Some(previous) = &previous {
            tracing::info!(user_id = %previous.user_id, "signed out");
        }
        previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::fake::FakeGraph;

    use super::*;

    #[tokio::test]
    async fn sign_in_builds_identity() {
        let api = FakeGraph::new("me-id");
        let session = SessionContext::new();
        assert!(!session.is_authenticated().await);

        let identity = session
            .sign_in(&api, "token".to_owned(), vec!["User.Read".to_owned()])
            .await
            .unwrap();

        assert_eq!(identity.display_name, "Me");
        assert_eq!(identity.email, "me@contoso.com");
        assert_eq!(identity.time_zone, "UTC");
        assert_eq!(identity.avatar, DEFAULT_AVATAR);
        assert_eq!(session.user_id().await.as_deref(), Some("me-id"));
        assert_eq!(session.access_token().await.as_deref(), Some("token"));
        assert_eq!(session.scopes().await, vec!["User.Read".to_owned()]);
    }

    #[tokio::test]
    async fn failed_lookup_leaves_session_empty() {
        let api = FakeGraph::new("me-id");
        api.fail_me();
        let session = SessionContext::new();

        assert!(session.sign_in(&api, "token".to_owned(), vec![]).await.is_err());
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn sign_out_clears_everything() {
        let api = FakeGraph::new("me-id");
        let session = SessionContext::new();
        session.sign_in(&api, "token".to_owned(), vec![]).await.unwrap();

        assert!(session.sign_out().await);
        assert!(!session.sign_out().await);
        assert_eq!(session.access_token().await, None);
        assert_eq!(session.identity().await, None);
    }
}
