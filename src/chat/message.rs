use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chat {
    pub id: String,
    pub topic: Option<String>,
    pub chat_type: Option<String>,
}

/// Image that rides along with one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    pub base64_image: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Assigned by the server once the message exists there.
    pub id: Option<String>,
    /// Assigned locally before sending, for matching the optimistic copy.
    pub tracking_id: Option<Uuid>,
    pub content: String,
    pub from_user_id: Option<String>,
    pub from_user_display_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_date_time: OffsetDateTime,
    pub is_mine: bool,
    pub sent: bool,
    pub owner_chat_id: String,
    pub inline_image: Option<InlineImage>,
}

impl ChatMessage {
    /// Placeholder shown until the server copy arrives.
    pub fn pending(
        chat_id: &str,
        tracking_id: Uuid,
        content: String,
        from_user_id: Option<String>,
        inline_image: Option<InlineImage>,
    ) -> Self {
        Self {
            id: None,
            tracking_id: Some(tracking_id),
            content,
            from_user_id,
            from_user_display_name: None,
            created_date_time: OffsetDateTime::now_utc(),
            is_mine: true,
            sent: false,
            owner_chat_id: chat_id.to_owned(),
            inline_image,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.sent
    }

    /// Stable display key: the tracking id while one is known, else the server id.
    pub fn key(&self) -> String {
        match (&self.tracking_id, &self.id) {
            (Some(tracking_id), _) => tracking_id.to_string(),
            (None, Some(id)) => id.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        !key.is_empty()
            && (self.id.as_deref() == Some(key)
                || self.tracking_id.is_some_and(|t| t.to_string() == key))
    }
}
