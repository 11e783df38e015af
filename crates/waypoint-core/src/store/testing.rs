//! Test fixtures: a small resource type and an in-memory `ResourceApi`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ListParams, ResourceApi};

use super::{InsertPosition, Resource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewWidget {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WidgetPatch {
    pub name: Option<String>,
}

impl Resource for Widget {
    type Create = NewWidget;
    type Patch = WidgetPatch;

    const NAME: &'static str = "widgets";
    const PATH: &'static str = "widgets";
    const INSERT_AT: InsertPosition = InsertPosition::Back;

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn widget(id: &str, name: &str) -> Widget {
    Widget {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// In-memory backend counting every call it receives.
///
/// Reads and writes take effect on the server side when the call arrives;
/// the response is then held back for the configured delay.
#[derive(Default)]
pub struct MockApi {
    items: Mutex<Vec<Widget>>,
    failure: Mutex<Option<ApiError>>,
    last_params: Mutex<Vec<(String, String)>>,
    list_delay: Duration,
    mutation_delay: Duration,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl MockApi {
    pub fn new(items: Vec<Widget>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    pub fn with_list_delay(mut self, millis: u64) -> Self {
        self.list_delay = Duration::from_millis(millis);
        self
    }

    pub fn with_mutation_delay(mut self, millis: u64) -> Self {
        self.mutation_delay = Duration::from_millis(millis);
        self
    }

    /// Make every following call fail with `err` (or succeed again with `None`).
    pub fn fail_with(&self, err: Option<ApiError>) {
        *self.failure.lock().unwrap() = err;
    }

    pub fn set_items(&self, items: Vec<Widget>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Query pairs sent with the most recent list call.
    pub fn last_params(&self) -> Vec<(String, String)> {
        self.last_params.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::NotFound(format!("widget {}", id))
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ResourceApi<Widget> for MockApi {
    async fn list(&self, params: &ListParams) -> Result<Vec<Widget>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = params.as_pairs().to_vec();
        let result = self
            .check_failure()
            .map(|_| self.items.lock().unwrap().clone());
        Self::pause(self.list_delay).await;
        result
    }

    async fn get(&self, id: &str) -> Result<Widget, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.check_failure().and_then(|_| {
            self.items
                .lock()
                .unwrap()
                .iter()
                .find(|w| w.id == id)
                .cloned()
                .ok_or_else(|| Self::not_found(id))
        });
        Self::pause(self.mutation_delay).await;
        result
    }

    async fn create(&self, input: &NewWidget) -> Result<Widget, ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.check_failure().map(|_| {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let created = widget(&format!("new-{}", n), &input.name);
            self.items.lock().unwrap().push(created.clone());
            created
        });
        Self::pause(self.mutation_delay).await;
        result
    }

    async fn update(&self, id: &str, patch: &WidgetPatch) -> Result<Widget, ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.check_failure().and_then(|_| {
            let mut items = self.items.lock().unwrap();
            let item = items
                .iter_mut()
                .find(|w| w.id == id)
                .ok_or_else(|| Self::not_found(id))?;
            if let Some(name) = &patch.name {
                item.name = name.clone();
            }
            Ok(item.clone())
        });
        Self::pause(self.mutation_delay).await;
        result
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.check_failure().and_then(|_| {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|w| w.id != id);
            if items.len() == before {
                Err(Self::not_found(id))
            } else {
                Ok(())
            }
        });
        Self::pause(self.mutation_delay).await;
        result
    }
}
