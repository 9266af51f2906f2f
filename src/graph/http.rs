use reqwest::{header::CONTENT_TYPE, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{error::GraphError, session::SessionContext};

use super::{
    api::GraphApi,
    types::{
        Collection, HostedBlob, NewChat, NewChatMessage, PeopleQuery, WireChat, WireChatMessage,
        WirePerson, WireUser,
    },
};

#[derive(Debug, Clone, Copy)]
enum Surface {
    V1,
    Beta,
}

/// [`GraphApi`] over HTTPS, authenticated with the session's bearer token.
#[derive(Clone)]
pub struct HttpGraph {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl HttpGraph {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, session: SessionContext) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    fn url(&self, surface: Surface, path: &str) -> String {
        let version = match surface {
            Surface::V1 => "v1.0",
            Surface::Beta => "beta",
        };
        format!("{}/{version}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, GraphError> {
        let token = self.session.access_token().await.ok_or(GraphError::NotSignedIn)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(request: RequestBuilder) -> Result<Response, GraphError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Status { status, body });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GraphError> {
        let bytes = Self::send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl GraphApi for HttpGraph {
    async fn me(&self, access_token: &str) -> Result<WireUser, GraphError> {
        let request = self
            .http
            .get(self.url(Surface::V1, "me"))
            .query(&[("$select", "id,displayName,mail,mailboxSettings,userPrincipalName")])
            .bearer_auth(access_token);
        Self::decode(request).await
    }

    async fn create_chat(&self, chat: &NewChat) -> Result<WireChat, GraphError> {
        let request = self.authorized(self.http.post(self.url(Surface::V1, "chats")).json(chat)).await?;
        Self::decode(request).await
    }

    async fn list_chat_messages(&self, chat_id: &str) -> Result<Vec<WireChatMessage>, GraphError> {
        let request = self
            .authorized(self.http.get(self.url(Surface::V1, &format!("me/chats/{chat_id}/messages"))))
            .await?;
        let page: Collection<WireChatMessage> = Self::decode(request).await?;
        Ok(page.value)
    }

    async fn post_chat_message(
        &self,
        chat_id: &str,
        message: &NewChatMessage,
    ) -> Result<WireChatMessage, GraphError> {
        let request = self
            .authorized(
                self.http
                    .post(self.url(Surface::Beta, &format!("chats/{chat_id}/messages")))
                    .json(message),
            )
            .await?;
        Self::decode(request).await
    }

    async fn hosted_content(&self, path: &str) -> Result<HostedBlob, GraphError> {
        let request = self.authorized(self.http.get(self.url(Surface::V1, path))).await?;
        let response = Self::send(request).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?.to_vec();
        Ok(HostedBlob { content_type, bytes })
    }

    async fn find_people(&self, query: &PeopleQuery) -> Result<Vec<WirePerson>, GraphError> {
        let top = query.top.to_string();
        let mut request = self.http.get(self.url(Surface::V1, "me/people")).query(&[
            ("$search", query.search.as_str()),
            ("$top", top.as_str()),
            ("$filter", query.filter.as_str()),
        ]);
        if query.wide_sources {
            request = request.header("X-PeopleQuery-QuerySources", "Mailbox,Directory");
        }
        let page: Collection<WirePerson> = Self::decode(self.authorized(request).await?).await?;
        Ok(page.value)
    }
}
