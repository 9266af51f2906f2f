use std::{future::Future, sync::Arc};

use crate::error::GraphError;

use super::types::{
    HostedBlob, NewChat, NewChatMessage, PeopleQuery, WireChat, WireChatMessage, WirePerson,
    WireUser,
};

/// Raw Graph operations. Implementations do transport and decoding only;
/// alerting and degradation live in [`GraphClient`](super::GraphClient).
pub trait GraphApi: Send + Sync + 'static {
    /// `GET /me` with an explicit token, used while signing in.
    fn me(&self, access_token: &str) -> impl Future<Output = Result<WireUser, GraphError>> + Send;

    fn create_chat(&self, chat: &NewChat) -> impl Future<Output = Result<WireChat, GraphError>> + Send;

    /// First page only, newest first.
    fn list_chat_messages(
        &self,
        chat_id: &str,
    ) -> impl Future<Output = Result<Vec<WireChatMessage>, GraphError>> + Send;

    fn post_chat_message(
        &self,
        chat_id: &str,
        message: &NewChatMessage,
    ) -> impl Future<Output = Result<WireChatMessage, GraphError>> + Send;

    /// `path` is relative to the version root, e.g. `chats/<id>/messages/<id>/hostedContents/<id>/$value`.
    fn hosted_content(&self, path: &str) -> impl Future<Output = Result<HostedBlob, GraphError>> + Send;

    fn find_people(
        &self,
        query: &PeopleQuery,
    ) -> impl Future<Output = Result<Vec<WirePerson>, GraphError>> + Send;
}

impl<T: GraphApi> GraphApi for Arc<T> {
    fn me(&self, access_token: &str) -> impl Future<Output = Result<WireUser, GraphError>> + Send {
        (**self).me(access_token)
    }

    fn create_chat(&self, chat: &NewChat) -> impl Future<Output = Result<WireChat, GraphError>> + Send {
        (**self).create_chat(chat)
    }

    fn list_chat_messages(
        &self,
        chat_id: &str,
    ) -> impl Future<Output = Result<Vec<WireChatMessage>, GraphError>> + Send {
        (**self).list_chat_messages(chat_id)
    }

    fn post_chat_message(
        &self,
        chat_id: &str,
        message: &NewChatMessage,
    ) -> impl Future<Output = Result<WireChatMessage, GraphError>> + Send {
        (**self).post_chat_message(chat_id, message)
    }

    fn hosted_content(&self, path: &str) -> impl Future<Output = Result<HostedBlob, GraphError>> + Send {
        (**self).hosted_content(path)
    }

    fn find_people(
        &self,
        query: &PeopleQuery,
    ) -> impl Future<Output = Result<Vec<WirePerson>, GraphError>> + Send {
        (**self).find_people(query)
    }
}
