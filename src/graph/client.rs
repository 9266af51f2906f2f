use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::future::join_all;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    alerts::Alerts,
    chat::{content, Chat, ChatMessage, InlineImage},
    error::GraphError,
    people::Person,
    session::SessionContext,
};

use super::{
    api::GraphApi,
    types::{
        ConversationMember, ItemBody, NewChat, NewChatMessage, NewHostedContent, PeopleQuery,
        UserType, WireChatMessage,
    },
};

/// Typed Graph operations for the flows. Failures never escape: each one
/// raises an alert and the caller gets an empty result.
pub struct GraphClient<A> {
    api: A,
    session: SessionContext,
    alerts: Alerts,
}

impl<A: GraphApi> GraphClient<A> {
    pub fn new(api: A, session: SessionContext, alerts: Alerts) -> Self {
        Self { api, session, alerts }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn alerts(&self) -> &Alerts {
        &self.alerts
    }

    async fn viewer(&self) -> Option<String> {
        let user_id = self.session.user_id().await;
        if user_id.is_none() {
            self.alerts.add_error("Graph client is not initialized.", None);
        }
        user_id
    }

    fn report(&self, title: impl Into<String>, err: &GraphError) {
        self.alerts.add_error(title, Some(err.detail()));
    }

    /// Creates a group chat with `participant_ids` plus the viewer.
    pub async fn create_or_get_group_chat(&self, topic: &str, participant_ids: &[String]) -> Option<Chat> {
        let viewer = self.viewer().await?;

        let members = participant_ids
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(viewer.as_str()))
            .map(ConversationMember::owner)
            .collect();
        let request = NewChat {
            chat_type: "group",
            topic: topic.to_owned(),
            members,
        };

        match self.api.create_chat(&request).await {
            Ok(chat) => {
                tracing::info!(chat_id = %chat.id, %topic, "chat created");
                Some(Chat {
                    id: chat.id,
                    topic: chat.topic,
                    chat_type: chat.chat_type,
                })
            }
            Err(err) => {
                self.report("Could not create chat", &err);
                None
            }
        }
    }

    /// Oldest first, system events removed. Errors are alerted and returned.
    pub async fn try_chat_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, GraphError> {
        let Some(viewer) = self.viewer().await else {
            return Err(GraphError::NotSignedIn);
        };

        match self.api.list_chat_messages(chat_id).await {
            Ok(raw) => {
                let mut messages: Vec<ChatMessage> = raw
                    .into_iter()
                    .filter(|m| !m.is_system_event())
                    .map(|m| confirmed(m, chat_id, &viewer, None))
                    .collect();
                messages.reverse();
                Ok(messages)
            }
            Err(err) => {
                self.report(format!("Could not get chat messages for chatId: {chat_id}"), &err);
                Err(err)
            }
        }
    }

    pub async fn get_chat_messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.try_chat_messages(chat_id).await.unwrap_or_default()
    }

    pub async fn send_chat_message(
        &self,
        chat_id: &str,
        html: &str,
        tracking_id: Uuid,
        inline_image: Option<&InlineImage>,
    ) -> Option<ChatMessage> {
        let viewer = self.viewer().await?;

        let (content, hosted_contents) = match inline_image {
            Some(image) => (
                content::with_hosted_image(html, image),
                vec![NewHostedContent {
                    temporary_id: content::HOSTED_CONTENT_TEMP_ID.to_owned(),
                    content_bytes: image.base64_image.clone(),
                    content_type: "image/png",
                }],
            ),
            None => (html.to_owned(), Vec::new()),
        };
        let request = NewChatMessage {
            body: ItemBody {
                content: Some(content),
                content_type: Some("html".to_owned()),
            },
            hosted_contents,
        };

        match self.api.post_chat_message(chat_id, &request).await {
            Ok(created) => {
                tracing::debug!(%chat_id, message_id = %created.id, %tracking_id, "message sent");
                let mut message = confirmed(created, chat_id, &viewer, Some(tracking_id));
                message.is_mine = true;
                Some(message)
            }
            Err(err) => {
                self.report("Could not send chat message", &err);
                None
            }
        }
    }

    /// Fetches a hosted content URL as a `data:` URL, or `""` if it can't.
    pub async fn get_hosted_image(&self, url: &str) -> String {
        if self.viewer().await.is_none() {
            return String::new();
        }

        let result = match url.split_once("/chats/") {
            Some((_, rest)) => self.api.hosted_content(&format!("chats/{rest}")).await,
            None => Err(GraphError::InvalidHostedContentUrl(url.to_owned())),
        };

        match result {
            Ok(blob) => format!(
                "data:{};base64,{}",
                blob.content_type.as_deref().unwrap_or("application/octet-stream"),
                STANDARD.encode(&blob.bytes)
            ),
            Err(err) => {
                self.report("Could not get chat hosted content", &err);
                String::new()
            }
        }
    }

    /// Swaps every non-`data:` image source for its fetched data URL.
    pub async fn inline_hosted_images(&self, html: &str) -> String {
        let sources: Vec<_> = content::image_sources(html)
            .into_iter()
            .filter(|(_, src)| !src.starts_with("data:image"))
            .collect();
        if sources.is_empty() {
            return html.to_owned();
        }

        let fetched = join_all(sources.iter().map(|(_, src)| self.get_hosted_image(src))).await;
        let replacements = sources
            .into_iter()
            .zip(fetched)
            .map(|((range, _), data_url)| (range, data_url))
            .collect();
        content::replace_ranges(html, replacements)
    }

    pub async fn find_people(&self, query: &str, top: u32, filters: &str, user_type: UserType) -> Vec<Person> {
        if self.viewer().await.is_none() {
            return Vec::new();
        }

        let request = PeopleQuery::new(query, top, filters, user_type);
        match self.api.find_people(&request).await {
            Ok(people) => people.into_iter().map(Person::from).collect(),
            Err(err) => {
                self.report("Could not find people", &err);
                Vec::new()
            }
        }
    }
}

fn confirmed(raw: WireChatMessage, chat_id: &str, viewer: &str, tracking_id: Option<Uuid>) -> ChatMessage {
    let sender = raw.sender().cloned().unwrap_or_default();
    ChatMessage {
        content: raw.content().to_owned(),
        is_mine: sender.id.as_deref() == Some(viewer),
        from_user_id: sender.id,
        from_user_display_name: sender.display_name,
        created_date_time: raw.created_date_time.unwrap_or_else(OffsetDateTime::now_utc),
        id: Some(raw.id),
        tracking_id,
        sent: true,
        owner_chat_id: chat_id.to_owned(),
        inline_image: None,
    }
}
