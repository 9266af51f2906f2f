use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::{broadcast::{self, error::RecvError}, Mutex},
    time::{interval_at, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    error::GraphError,
    graph::{GraphApi, GraphClient},
    people::Person,
    snapshot::{Snapshot, SnapshotHub},
    subscription::Subscription,
};

use super::{content, Chat, ChatMessage, InlineImage};

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub topic: String,
    pub poll_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            topic: "Test Chat".to_owned(),
            poll_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ChatPhase {
    NoChat,
    #[serde(rename_all = "camelCase")]
    ChatActive { chat_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "camelCase")]
pub enum SendOutcome {
    /// Nothing to send, or the flow is stopped.
    Ignored,
    /// No chat yet and none could be created.
    Abandoned,
    Confirmed(ChatMessage),
    /// The post failed; the placeholder stays pending.
    Pending(Uuid),
}

#[derive(Default)]
struct ChatState {
    chat: Option<Chat>,
    messages: Vec<ChatMessage>,
    input: String,
    attachment: Option<InlineImage>,
    fetches_issued: u64,
    fetch_applied: u64,
    stopped: bool,
}

struct ChatInner<A> {
    client: Arc<GraphClient<A>>,
    settings: ChatSettings,
    state: Mutex<ChatState>,
    creating: Mutex<()>,
    poller: StdMutex<Option<Subscription>>,
    stager: StdMutex<Option<Subscription>>,
}

/// The active chat: its messages, the composer, and the poller that keeps
/// both in line with the server.
pub struct ChatFlow<A> {
    inner: Arc<ChatInner<A>>,
}

impl<A> Clone for ChatFlow<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: GraphApi> ChatFlow<A> {
    pub fn new(client: Arc<GraphClient<A>>, settings: ChatSettings) -> Self {
        Self {
            inner: Arc::new(ChatInner {
                client,
                settings,
                state: Mutex::new(ChatState::default()),
                creating: Mutex::new(()),
                poller: StdMutex::new(None),
                stager: StdMutex::new(None),
            }),
        }
    }

    /// Starts polling and listening for shared snapshots.
    pub fn start(&self, snapshots: &SnapshotHub) {
        let poller = Subscription::spawn("message-poll", poll_messages(self.inner.clone()));
        let stager = Subscription::spawn(
            "snapshot-stage",
            stage_snapshots(self.inner.clone(), snapshots.subscribe()),
        );
        tracing::debug!(
            delay_ms = self.inner.settings.poll_delay.as_millis() as u64,
            interval_ms = self.inner.settings.poll_interval.as_millis() as u64,
            "chat flow started"
        );

        *self.inner.poller.lock().unwrap_or_else(PoisonError::into_inner) = Some(poller);
        *self.inner.stager.lock().unwrap_or_else(PoisonError::into_inner) = Some(stager);
    }

    /// Tears the flow down. Safe to call more than once.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                return;
            }
            state.stopped = true;
        }

        for slot in [&self.inner.poller, &self.inner.stager] {
            if let Some(mut subscription) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                subscription.cancel();
            }
        }
        tracing::debug!("chat flow stopped");
    }

    pub fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    pub async fn phase(&self) -> ChatPhase {
        match &self.inner.state.lock().await.chat {
            Some(chat) => ChatPhase::ChatActive {
                chat_id: chat.id.clone(),
            },
            None => ChatPhase::NoChat,
        }
    }

    pub async fn chat(&self) -> Option<Chat> {
        self.inner.state.lock().await.chat.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().await.messages.clone()
    }

    /// Looks a message up by tracking id or server id.
    pub async fn message(&self, key: &str) -> Option<ChatMessage> {
        self.inner
            .state
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.matches(key))
            .cloned()
    }

    pub async fn input(&self) -> String {
        self.inner.state.lock().await.input.clone()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.inner.state.lock().await.input = text.into();
    }

    pub async fn attachment(&self) -> Option<InlineImage> {
        self.inner.state.lock().await.attachment.clone()
    }

    pub async fn stage_attachment(&self, image: InlineImage) {
        self.inner.stage(image).await;
    }

    pub async fn remove_attachment(&self) {
        self.inner.state.lock().await.attachment = None;
    }

    /// Re-reads the active chat. Does nothing without one.
    pub async fn refresh(&self) -> Result<(), GraphError> {
        let Some(chat) = self.chat().await else {
            return Ok(());
        };
        self.inner.refresh(&chat.id).await.map(|_| ())
    }

    /// Sends the composed input, creating the chat with `selected` first if
    /// there is none yet.
    pub async fn send(&self, selected: &[Person]) -> SendOutcome {
        let inner = &self.inner;
        {
            let state = inner.state.lock().await;
            if state.stopped || state.input.trim().is_empty() {
                return SendOutcome::Ignored;
            }
        }

        let Some(chat_id) = inner.ensure_chat(selected).await else {
            if inner.state.lock().await.stopped {
                return SendOutcome::Ignored;
            }
            return SendOutcome::Abandoned;
        };

        let tracking_id = Uuid::new_v4();
        let viewer = inner.client.session().user_id().await;
        let (html, image) = {
            let mut state = inner.state.lock().await;
            if state.stopped || state.input.trim().is_empty() {
                return SendOutcome::Ignored;
            }

            let html = content::paragraph(&std::mem::take(&mut state.input));
            let image = state.attachment.take();

            let mut local = html.clone();
            if let Some(image) = &image {
                local.push_str(&content::optimistic_image(image));
            }
            state
                .messages
                .push(ChatMessage::pending(&chat_id, tracking_id, local, viewer, image.clone()));
            (html, image)
        };

        match inner
            .client
            .send_chat_message(&chat_id, &html, tracking_id, image.as_ref())
            .await
        {
            Some(confirmed) => {
                if let Err(err) = inner.refresh(&chat_id).await {
                    tracing::warn!(%chat_id, error = %err, "refetch after send failed");
                }
                SendOutcome::Confirmed(confirmed)
            }
            None => {
                tracing::warn!(%chat_id, %tracking_id, "message left pending");
                SendOutcome::Pending(tracking_id)
            }
        }
    }
}

impl<A: GraphApi> ChatInner<A> {
    async fn ensure_chat(&self, selected: &[Person]) -> Option<String> {
        let _creating = self.creating.lock().await;
        if let Some(chat) = &self.state.lock().await.chat {
            return Some(chat.id.clone());
        }

        let participant_ids: Vec<String> = selected.iter().filter_map(|p| p.id.clone()).collect();
        if participant_ids.is_empty() {
            tracing::debug!("no participants selected, send abandoned");
            return None;
        }

        let chat = self
            .client
            .create_or_get_group_chat(&self.settings.topic, &participant_ids)
            .await?;
        let chat_id = chat.id.clone();
        let mut state = self.state.lock().await;
        if state.stopped {
            tracing::debug!(%chat_id, "flow stopped while creating chat");
            return None;
        }
        state.chat = Some(chat);
        Some(chat_id)
    }

    /// Replaces the messages with a fresh fetch unless a newer fetch has
    /// already landed. Returns whether this one was applied.
    async fn refresh(&self, chat_id: &str) -> Result<bool, GraphError> {
        let ticket = {
            let mut state = self.state.lock().await;
            state.fetches_issued += 1;
            state.fetches_issued
        };

        let messages = self.client.try_chat_messages(chat_id).await?;

        let mut state = self.state.lock().await;
        if state.stopped || ticket <= state.fetch_applied {
            tracing::debug!(ticket, applied = state.fetch_applied, "dropping superseded fetch");
            return Ok(false);
        }
        state.fetch_applied = ticket;
        state.messages = messages;
        Ok(true)
    }

    async fn stage(&self, image: InlineImage) {
        let mut state = self.state.lock().await;
        if !state.stopped {
            state.attachment = Some(image);
        }
    }
}

async fn poll_messages<A: GraphApi>(inner: Arc<ChatInner<A>>) {
    let every = inner.settings.poll_interval.max(Duration::from_millis(1));
    let mut ticks = interval_at(Instant::now() + inner.settings.poll_delay, every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        let chat_id = {
            let state = inner.state.lock().await;
            if state.stopped {
                break;
            }
            state.chat.as_ref().map(|c| c.id.clone())
        };
        let Some(chat_id) = chat_id else {
            continue;
        };

        tracing::debug!(%chat_id, "polling messages");
        if let Err(err) = inner.refresh(&chat_id).await {
            tracing::warn!(%chat_id, error = %err, "message polling stopped");
            break;
        }
    }
}

async fn stage_snapshots<A: GraphApi>(inner: Arc<ChatInner<A>>, mut rx: broadcast::Receiver<Snapshot>) {
    loop {
        match rx.recv().await {
            Ok(snapshot) => inner.stage(snapshot.to_inline_image()).await,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "snapshot listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        alerts::Alerts,
        graph::fake::{wire_message, FakeGraph},
        session::SessionContext,
        snapshot::png,
    };

    use super::*;

    struct Harness {
        api: Arc<FakeGraph>,
        flow: ChatFlow<Arc<FakeGraph>>,
        hub: SnapshotHub,
        alerts: Alerts,
    }

    async fn harness() -> Harness {
        let api = Arc::new(FakeGraph::new("me-id"));
        let session = SessionContext::new();
        session.sign_in(&api, "token".to_owned(), vec![]).await.unwrap();
        let alerts = Alerts::new();
        let client = Arc::new(GraphClient::new(api.clone(), session, alerts.clone()));
        let flow = ChatFlow::new(client, ChatSettings::default());
        let hub = SnapshotHub::default();
        flow.start(&hub);
        Harness { api, flow, hub, alerts }
    }

    fn alice() -> Vec<Person> {
        vec![Person {
            id: Some("alice-id".to_owned()),
            display_name: Some("Alice".to_owned()),
            email: None,
            user_principal_name: None,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_chat_creation_leaves_no_chat() {
        let h = harness().await;
        h.api.set_create_delay(Duration::from_secs(1));
        h.flow.set_input("hi").await;

        let flow = h.flow.clone();
        let sending = tokio::spawn(async move { flow.send(&alice()).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.flow.stop().await;

        assert_eq!(sending.await.unwrap(), SendOutcome::Ignored);
        assert_eq!(h.flow.phase().await, ChatPhase::NoChat);
        assert!(h.flow.messages().await.is_empty());
        assert!(h.api.posted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_poller_leaves_snapshot_staging_running() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;

        h.api.fail_list(true);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(!h.flow.is_polling());

        h.hub.share(Snapshot::from_png(png(3, 3)).unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.flow.attachment().await.map(|image| image.width), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_send_creates_chat_with_viewer() {
        let h = harness().await;
        assert_eq!(h.flow.phase().await, ChatPhase::NoChat);

        h.flow.set_input("hi").await;
        let outcome = h.flow.send(&alice()).await;

        assert!(matches!(outcome, SendOutcome::Confirmed(_)));
        let created = h.api.chats_created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].topic, "Test Chat");
        let binds: Vec<&str> = created[0].members.iter().map(|m| m.user_bind.as_str()).collect();
        assert_eq!(
            binds,
            vec![
                "https://graph.microsoft.com/v1.0/users('alice-id')",
                "https://graph.microsoft.com/v1.0/users('me-id')",
            ]
        );
        assert_eq!(
            h.flow.phase().await,
            ChatPhase::ChatActive {
                chat_id: "chat-1".to_owned()
            }
        );

        h.flow.set_input("again").await;
        h.flow.send(&[]).await;
        assert_eq!(h.api.chats_created().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_is_optimistic() {
        let h = harness().await;
        h.api.set_post_delay(Duration::from_secs(1));
        h.flow.set_input("  hello  ").await;

        let flow = h.flow.clone();
        let sending = tokio::spawn(async move { flow.send(&alice()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let messages = h.flow.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_pending());
        assert!(messages[0].is_mine);
        assert_eq!(messages[0].content, "<p>hello</p>");
        assert_eq!(messages[0].from_user_id.as_deref(), Some("me-id"));
        assert_eq!(h.flow.input().await, "");

        let SendOutcome::Confirmed(confirmed) = sending.await.unwrap() else {
            panic!("send should confirm");
        };
        assert_eq!(Some(confirmed.tracking_id.unwrap()), messages[0].tracking_id);

        let messages = h.flow.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].sent);
        assert_eq!(messages[0].id.as_deref(), Some("server-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_input_is_ignored() {
        let h = harness().await;
        h.flow.set_input("   ").await;

        assert_eq!(h.flow.send(&alice()).await, SendOutcome::Ignored);
        assert!(h.api.chats_created().is_empty());
        assert!(h.flow.messages().await.is_empty());
        assert!(h.alerts.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_participants_abandons_quietly() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        let contact_only = vec![Person {
            id: None,
            display_name: Some("Sam".to_owned()),
            email: None,
            user_principal_name: None,
        }];

        assert_eq!(h.flow.send(&contact_only).await, SendOutcome::Abandoned);
        assert_eq!(h.flow.phase().await, ChatPhase::NoChat);
        assert_eq!(h.flow.input().await, "hello");
        assert!(h.alerts.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_chat_creation_stays_in_no_chat() {
        let h = harness().await;
        h.api.fail_create();
        h.flow.set_input("hello").await;

        assert_eq!(h.flow.send(&alice()).await, SendOutcome::Abandoned);
        assert_eq!(h.flow.phase().await, ChatPhase::NoChat);
        assert_eq!(h.alerts.list()[0].title, "Could not create chat");
    }

    #[tokio::test(start_paused = true)]
    async fn shared_snapshot_rides_along() {
        let h = harness().await;
        h.hub.share(Snapshot::from_png(png(300, 200)).unwrap());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.flow.attachment().await.map(|i| (i.width, i.height)), Some((300, 200)));

        h.api.set_post_delay(Duration::from_secs(1));
        h.flow.set_input("hello").await;
        let flow = h.flow.clone();
        let sending = tokio::spawn(async move { flow.send(&alice()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let messages = h.flow.messages().await;
        let optimistic = &messages[0];
        assert!(optimistic.content.starts_with("<p>hello</p><img src=\"data:image/png;base64,"));
        let image = optimistic.inline_image.as_ref().unwrap();
        assert_eq!((image.width, image.height), (300, 200));
        assert_eq!(h.flow.attachment().await, None);

        sending.await.unwrap();
        let posted = h.api.posted();
        let (_, posted) = &posted[0];
        let body = posted.body.content.as_deref().unwrap();
        assert!(body.contains("../hostedContents/1/$value"));
        assert!(!body.contains(&image.base64_image));

        let persisted = h.flow.messages().await;
        assert!(persisted[0].content.contains("../hostedContents/1/$value"));
    }

    #[tokio::test(start_paused = true)]
    async fn removed_attachment_is_not_sent() {
        let h = harness().await;
        h.flow
            .stage_attachment(InlineImage {
                base64_image: "AA==".to_owned(),
                width: 1,
                height: 1,
            })
            .await;
        h.flow.remove_attachment().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;

        assert!(h.api.posted()[0].1.hosted_contents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_stays_pending() {
        let h = harness().await;
        h.api.fail_post();
        h.flow.set_input("hello").await;

        let SendOutcome::Pending(tracking_id) = h.flow.send(&alice()).await else {
            panic!("send should stay pending");
        };

        let pending = h.flow.message(&tracking_id.to_string()).await.unwrap();
        assert!(pending.is_pending());
        assert_eq!(h.alerts.list()[0].title, "Could not send chat message");
    }

    #[tokio::test(start_paused = true)]
    async fn polling_picks_up_new_messages() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;
        assert_eq!(h.api.list_calls(), 1);

        h.api.push_message("chat-1", wire_message("m2", "alice-id", "<p>hey</p>"));
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let messages = h.flow.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].id.as_deref(), Some("m2"));
        assert!(!messages[1].is_mine);
        assert_eq!(h.api.list_calls(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.api.list_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_waits_for_a_chat() {
        let h = harness().await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(h.api.list_calls(), 0);
        assert!(h.flow.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_stops_polling_for_good() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;

        h.api.fail_list(true);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(h.api.list_calls(), 2);
        assert!(!h.flow.is_polling());

        h.api.fail_list(false);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.api.list_calls(), 2);
        assert_eq!(h.flow.messages().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_final() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;

        h.flow.stop().await;
        h.flow.stop().await;
        assert!(!h.flow.is_polling());

        h.api.push_message("chat-1", wire_message("m2", "alice-id", "<p>late</p>"));
        h.hub.share(Snapshot::from_png(png(5, 5)).unwrap());
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(h.api.list_calls(), 1);
        assert_eq!(h.flow.messages().await.len(), 1);
        assert_eq!(h.flow.attachment().await, None);

        h.flow.set_input("after").await;
        assert_eq!(h.flow.send(&alice()).await, SendOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn slower_older_fetch_is_dropped() {
        let h = harness().await;
        h.flow.set_input("hello").await;
        h.flow.send(&alice()).await;

        h.api.set_list_delay(Duration::from_secs(2));
        let flow = h.flow.clone();
        let slow = tokio::spawn(async move { flow.refresh().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.api.set_list_delay(Duration::ZERO);
        h.api.push_message("chat-1", wire_message("m2", "alice-id", "<p>newer</p>"));
        h.flow.refresh().await.unwrap();
        assert_eq!(h.flow.messages().await.len(), 2);

        slow.await.unwrap().unwrap();
        assert_eq!(h.flow.messages().await.len(), 2);
    }
}
