use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::{
    graph::{types::UserType, GraphApi, GraphClient},
    subscription::Subscription,
};

use super::Person;

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub top: u32,
    pub user_type: UserType,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            top: 10,
            user_type: UserType::Any,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PickerView {
    pub input: String,
    pub selected: Vec<Person>,
    pub suggestions: Vec<Person>,
    pub is_loading: bool,
}

#[derive(Default)]
struct PickerState {
    input: String,
    selected: Vec<Person>,
    suggestions: Vec<Person>,
    /// Bumped per accepted query; results from older ones are dropped.
    generation: u64,
    is_loading: bool,
    stopped: bool,
}

struct SearchInner<A> {
    client: Arc<GraphClient<A>>,
    settings: SearchSettings,
    state: Mutex<PickerState>,
    in_flight: StdMutex<Option<Subscription>>,
}

/// People picker: debounced search with suggestions that never repeat
/// someone already picked.
pub struct PeopleSearch<A> {
    inner: Arc<SearchInner<A>>,
    queries: mpsc::UnboundedSender<String>,
    pipeline: Arc<StdMutex<Option<Subscription>>>,
}

impl<A> Clone for PeopleSearch<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            queries: self.queries.clone(),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<A: GraphApi> PeopleSearch<A> {
    /// Spawns the query pipeline, so call it inside a runtime.
    pub fn new(client: Arc<GraphClient<A>>, settings: SearchSettings) -> Self {
        let inner = Arc::new(SearchInner {
            client,
            settings,
            state: Mutex::new(PickerState::default()),
            in_flight: StdMutex::new(None),
        });
        let (queries, rx) = mpsc::unbounded_channel();
        let pipeline = Subscription::spawn("people-query", run_pipeline(inner.clone(), rx));

        Self {
            inner,
            queries,
            pipeline: Arc::new(StdMutex::new(Some(pipeline))),
        }
    }

    /// Raw text from the picker box. Blank input is not searched.
    pub async fn input_changed(&self, text: &str) {
        {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                return;
            }
            state.input = text.to_owned();
        }

        let query = text.trim();
        if !query.is_empty() {
            let _ = self.queries.send(query.to_owned());
        }
    }

    /// Adds `person` unless already picked, then clears the box and the
    /// suggestions. Returns whether the person was added.
    pub async fn select(&self, person: Person) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.stopped {
            return false;
        }

        let added = !person.is_in(&state.selected);
        if added {
            tracing::debug!(id = ?person.id, name = ?person.display_name, "person selected");
            state.selected.push(person);
        }
        state.input.clear();
        state.suggestions.clear();
        state.generation += 1;
        state.is_loading = false;
        added
    }

    pub async fn remove(&self, person: &Person) -> bool {
        let mut state = self.inner.state.lock().await;
        let before = state.selected.len();
        state.selected.retain(|p| !person.is_same_as(p));
        state.selected.len() != before
    }

    pub async fn selected(&self) -> Vec<Person> {
        self.inner.state.lock().await.selected.clone()
    }

    pub async fn suggestions(&self) -> Vec<Person> {
        self.inner.state.lock().await.suggestions.clone()
    }

    pub async fn view(&self) -> PickerView {
        let state = self.inner.state.lock().await;
        PickerView {
            input: state.input.clone(),
            selected: state.selected.clone(),
            suggestions: state.suggestions.clone(),
            is_loading: state.is_loading,
        }
    }

    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if state.stopped {
                return;
            }
            state.stopped = true;
        }

        for slot in [&*self.pipeline, &self.inner.in_flight] {
            if let Some(mut subscription) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                subscription.cancel();
            }
        }
        tracing::debug!("people search stopped");
    }
}

impl<A: GraphApi> SearchInner<A> {
    /// Starts a search for `query`, superseding whatever was in flight.
    async fn launch(self: &Arc<Self>, query: String) {
        let generation = {
            let mut state = self.state.lock().await;
            if state.stopped {
                return;
            }
            state.generation += 1;
            state.is_loading = true;
            state.generation
        };

        let inner = self.clone();
        let search = Subscription::spawn("people-search", async move {
            inner.search(generation, query).await;
        });
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(search);
        if let Some(mut previous) = previous {
            previous.cancel();
        }
    }

    async fn search(&self, generation: u64, query: String) {
        tracing::debug!(%query, generation, "searching people");
        let found = self
            .client
            .find_people(&query, self.settings.top, "", self.settings.user_type)
            .await;

        let mut state = self.state.lock().await;
        if state.stopped || state.generation != generation {
            tracing::debug!(%query, generation, "dropping superseded search");
            return;
        }
        let suggestions: Vec<Person> = found.into_iter().filter(|p| !p.is_in(&state.selected)).collect();
        state.suggestions = suggestions;
        state.is_loading = false;
    }
}

/// Trailing debounce, then drop repeats of the last accepted query.
async fn run_pipeline<A: GraphApi>(inner: Arc<SearchInner<A>>, mut rx: mpsc::UnboundedReceiver<String>) {
    let debounce = inner.settings.debounce;
    let mut last_accepted: Option<String> = None;

    while let Some(mut query) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(next) => query = next,
                    None => return,
                },
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        if last_accepted.as_deref() == Some(query.as_str()) {
            continue;
        }
        last_accepted = Some(query.clone());
        inner.launch(query).await;
    }
}
