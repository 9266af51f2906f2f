//! Request and response bodies for the Graph endpoints we call.
//!
//! Required fields are not `Option`: a response without them fails to
//! deserialize and surfaces as [`GraphError::Shape`](crate::error::GraphError::Shape).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The body of a message whose content is exactly this is a roster or
/// topic change, not something a person wrote.
pub const SYSTEM_EVENT_MESSAGE: &str = "<systemEventMessage/>";

#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxSettings {
    pub time_zone: Option<String>,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    pub id: String,
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
    pub mailbox_settings: Option<MailboxSettings>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChat {
    pub id: String,
    pub topic: Option<String>,
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIdentity {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentitySet {
    pub user: Option<WireIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChatMessage {
    pub id: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_date_time: Option<OffsetDateTime>,
    pub body: Option<ItemBody>,
    pub from: Option<IdentitySet>,
}

impl WireChatMessage {
    pub fn content(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.content.as_deref())
            .unwrap_or("")
    }

    pub fn sender(&self) -> Option<&WireIdentity> {
        self.from.as_ref().and_then(|f| f.user.as_ref())
    }

    pub fn is_system_event(&self) -> bool {
        self.content() == SYSTEM_EVENT_MESSAGE
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoredEmailAddress {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePerson {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub scored_email_addresses: Vec<ScoredEmailAddress>,
}

/// `POST /chats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChat {
    pub chat_type: &'static str,
    pub topic: String,
    pub members: Vec<ConversationMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationMember {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    pub roles: Vec<&'static str>,
    #[serde(rename = "user@odata.bind")]
    pub user_bind: String,
}

impl ConversationMember {
    pub fn owner(user_id: &str) -> Self {
        Self {
            odata_type: "#microsoft.graph.aadUserConversationMember",
            roles: vec!["owner"],
            user_bind: format!("https://graph.microsoft.com/v1.0/users('{user_id}')"),
        }
    }
}

/// `POST /chats/{id}/messages` (beta surface when hosted contents are set)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub body: ItemBody,
    pub hosted_contents: Vec<NewHostedContent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHostedContent {
    #[serde(rename = "@microsoft.graph.temporaryId")]
    pub temporary_id: String,
    pub content_bytes: String,
    pub content_type: &'static str,
}

/// Raw bytes of a hosted content item plus the type the server declared.
#[derive(Debug, Clone, Default)]
pub struct HostedBlob {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Any,
    User,
    Contact,
}

/// `GET /me/people` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeopleQuery {
    pub search: String,
    pub top: u32,
    pub filter: String,
    /// Adds `X-PeopleQuery-QuerySources: Mailbox,Directory`.
    pub wide_sources: bool,
}

impl PeopleQuery {
    pub fn new(search: &str, top: u32, filters: &str, user_type: UserType) -> Self {
        let mut filter = "personType/class eq 'Person'".to_owned();
        match user_type {
            UserType::Any => {}
            UserType::User => filter += " and personType/subclass eq 'OrganizationUser'",
            UserType::Contact => {
                filter += " and (personType/subclass eq 'ImplicitContact' or personType/subclass eq 'PersonalContact')"
            }
        }
        if !filters.is_empty() {
            filter = format!("{filter} and {filters}");
        }

        Self {
            search: search.to_owned(),
            top,
            filter,
            wide_sources: user_type != UserType::Contact,
        }
    }
}
