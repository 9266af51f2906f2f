use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    chat::{ChatFlow, ChatSettings},
    graph::{GraphApi, GraphClient},
    people::{PeopleSearch, SearchSettings},
    snapshot::SnapshotHub,
};

/// Flows that live for one sign-in.
pub struct Workspace<A> {
    pub chat: ChatFlow<A>,
    pub people: PeopleSearch<A>,
}

impl<A> Clone for Workspace<A> {
    fn clone(&self) -> Self {
        Self {
            chat: self.chat.clone(),
            people: self.people.clone(),
        }
    }
}

impl<A: GraphApi> Workspace<A> {
    async fn stop(&self) {
        self.chat.stop().await;
        self.people.stop().await;
    }
}

/// Holds the current [`Workspace`], if anyone is signed in.
pub struct Workspaces<A> {
    client: Arc<GraphClient<A>>,
    snapshots: SnapshotHub,
    chat_settings: ChatSettings,
    search_settings: SearchSettings,
    current: Arc<RwLock<Option<Workspace<A>>>>,
}

impl<A> Clone for Workspaces<A> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            snapshots: self.snapshots.clone(),
            chat_settings: self.chat_settings.clone(),
            search_settings: self.search_settings.clone(),
            current: self.current.clone(),
        }
    }
}

impl<A: GraphApi> Workspaces<A> {
    pub fn new(
        client: Arc<GraphClient<A>>,
        snapshots: SnapshotHub,
        chat_settings: ChatSettings,
        search_settings: SearchSettings,
    ) -> Self {
        Self {
            client,
            snapshots,
            chat_settings,
            search_settings,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Replaces any open workspace with a fresh, running one.
    pub async fn open(&self) -> Workspace<A> {
        let workspace = Workspace {
            chat: ChatFlow::new(self.client.clone(), self.chat_settings.clone()),
            people: PeopleSearch::new(self.client.clone(), self.search_settings.clone()),
        };
        workspace.chat.start(&self.snapshots);

        let previous = self.current.write().await.replace(workspace.clone());
        if let Some(previous) = previous {
            previous.stop().await;
        }
        tracing::info!("workspace opened");
        workspace
    }

    pub async fn close(&self) -> bool {
        let Some(previous) = self.current.write().await.take() else {
            return false;
        };
        previous.stop().await;
        tracing::info!("workspace closed");
        true
    }

    pub async fn current(&self) -> Option<Workspace<A>> {
        self.current.read().await.clone()
    }
}
