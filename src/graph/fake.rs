//! Scripted in-memory [`GraphApi`] for tests.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use reqwest::StatusCode;
use time::OffsetDateTime;

use crate::error::GraphError;

use super::{
    api::GraphApi,
    types::{
        HostedBlob, IdentitySet, ItemBody, NewChat, NewChatMessage, PeopleQuery, WireChat,
        WireChatMessage, WireIdentity, WirePerson, WireUser,
    },
};

#[derive(Default)]
struct FakeState {
    fail_me: bool,
    fail_create: bool,
    fail_list: bool,
    fail_post: bool,
    create_delay: Duration,
    list_delay: Duration,
    post_delay: Duration,

    chats_created: Vec<NewChat>,
    /// Newest first, like the real endpoint.
    messages: HashMap<String, Vec<WireChatMessage>>,
    posted: Vec<(String, NewChatMessage)>,
    list_calls: usize,
    next_id: u64,

    hosted: HashMap<String, HostedBlob>,
    hosted_requests: Vec<String>,

    people: HashMap<String, (Duration, Vec<WirePerson>)>,
    people_queries: Vec<PeopleQuery>,
}

pub struct FakeGraph {
    user_id: String,
    state: Mutex<FakeState>,
}

fn forbidden() -> GraphError {
    GraphError::Status {
        status: StatusCode::FORBIDDEN,
        body: r#"{"error":{"code":"Forbidden","message":"scripted failure"}}"#.to_owned(),
    }
}

pub fn wire_message(id: &str, sender_id: &str, content: &str) -> WireChatMessage {
    WireChatMessage {
        id: id.to_owned(),
        created_date_time: Some(OffsetDateTime::now_utc()),
        body: Some(ItemBody {
            content: Some(content.to_owned()),
            content_type: Some("html".to_owned()),
        }),
        from: Some(IdentitySet {
            user: Some(WireIdentity {
                id: Some(sender_id.to_owned()),
                display_name: Some(format!("User {sender_id}")),
            }),
        }),
    }
}

pub fn wire_person(id: Option<&str>, display_name: &str) -> WirePerson {
    WirePerson {
        id: id.map(str::to_owned),
        display_name: Some(display_name.to_owned()),
        ..WirePerson::default()
    }
}

impl FakeGraph {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            state: Mutex::new(FakeState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_me(&self) {
        self.state().fail_me = true;
    }

    pub fn fail_create(&self) {
        self.state().fail_create = true;
    }

    pub fn fail_list(&self, fail: bool) {
        self.state().fail_list = fail;
    }

    pub fn fail_post(&self) {
        self.state().fail_post = true;
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.state().create_delay = delay;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state().list_delay = delay;
    }

    pub fn set_post_delay(&self, delay: Duration) {
        self.state().post_delay = delay;
    }

    /// Adds a message as the newest in `chat_id`.
    pub fn push_message(&self, chat_id: &str, message: WireChatMessage) {
        self.state()
            .messages
            .entry(chat_id.to_owned())
            .or_default()
            .insert(0, message);
    }

    pub fn chats_created(&self) -> Vec<NewChat> {
        self.state().chats_created.clone()
    }

    pub fn posted(&self) -> Vec<(String, NewChatMessage)> {
        self.state().posted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn add_hosted(&self, path: &str, blob: HostedBlob) {
        self.state().hosted.insert(path.to_owned(), blob);
    }

    pub fn hosted_requests(&self) -> Vec<String> {
        self.state().hosted_requests.clone()
    }

    pub fn people_result(&self, search: &str, delay: Duration, people: Vec<WirePerson>) {
        self.state().people.insert(search.to_owned(), (delay, people));
    }

    pub fn people_queries(&self) -> Vec<PeopleQuery> {
        self.state().people_queries.clone()
    }
}

impl GraphApi for FakeGraph {
    async fn me(&self, _access_token: &str) -> Result<WireUser, GraphError> {
        if self.state().fail_me {
            return Err(forbidden());
        }
        Ok(WireUser {
            id: self.user_id.clone(),
            display_name: Some("Me".to_owned()),
            mail: Some("me@contoso.com".to_owned()),
            user_principal_name: Some("me@contoso.onmicrosoft.com".to_owned()),
            mailbox_settings: None,
        })
    }

    async fn create_chat(&self, chat: &NewChat) -> Result<WireChat, GraphError> {
        let delay = self.state().create_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_create {
            return Err(forbidden());
        }
        state.chats_created.push(chat.clone());
        Ok(WireChat {
            id: format!("chat-{}", state.chats_created.len()),
            topic: Some(chat.topic.clone()),
            chat_type: Some(chat.chat_type.to_owned()),
        })
    }

    async fn list_chat_messages(&self, chat_id: &str) -> Result<Vec<WireChatMessage>, GraphError> {
        // answered as of request time, delivered after the delay
        let (delay, result) = {
            let mut state = self.state();
            state.list_calls += 1;
            let result = if state.fail_list {
                Err(forbidden())
            } else {
                Ok(state.messages.get(chat_id).cloned().unwrap_or_default())
            };
            (state.list_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn post_chat_message(
        &self,
        chat_id: &str,
        message: &NewChatMessage,
    ) -> Result<WireChatMessage, GraphError> {
        let delay = self.state().post_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_post {
            return Err(forbidden());
        }
        state.next_id += 1;
        state.posted.push((chat_id.to_owned(), message.clone()));

        let created = wire_message(
            &format!("server-{}", state.next_id),
            &self.user_id,
            message.body.content.as_deref().unwrap_or(""),
        );
        state
            .messages
            .entry(chat_id.to_owned())
            .or_default()
            .insert(0, created.clone());
        Ok(created)
    }

    async fn hosted_content(&self, path: &str) -> Result<HostedBlob, GraphError> {
        let mut state = self.state();
        state.hosted_requests.push(path.to_owned());
        state.hosted.get(path).cloned().ok_or_else(|| GraphError::Status {
            status: StatusCode::NOT_FOUND,
            body: String::new(),
        })
    }

    async fn find_people(&self, query: &PeopleQuery) -> Result<Vec<WirePerson>, GraphError> {
        let (delay, people) = {
            let mut state = self.state();
            state.people_queries.push(query.clone());
            state.people.get(&query.search).cloned().unwrap_or_default()
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(people)
    }
}
