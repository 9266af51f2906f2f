use anyhow::Context;
use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl};

use crate::config::Config;

pub type IdentityClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

/// Microsoft identity platform client for the authorization code flow.
#[derive(Clone)]
pub struct SignInClient {
    pub(crate) client: IdentityClient,
    pub(crate) scopes: Vec<Scope>,
}

impl SignInClient {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let authority = config.authority();
        let auth_url = AuthUrl::new(format!("{authority}/authorize")).context("invalid authorize url")?;
        let token_url = TokenUrl::new(format!("{authority}/token")).context("invalid token url")?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .with_context(|| format!("invalid GRAPH_REDIRECT_URL {}", config.redirect_url))?;

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Ok(Self {
            client,
            scopes: config.scopes.iter().cloned().map(Scope::new).collect(),
        })
    }
}
