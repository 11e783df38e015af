//! The single in-flight fetch of a store.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::api::ApiError;

/// Result handed to every caller attached to a fetch.
pub type FetchOutcome<T> = Result<Arc<Vec<T>>, ApiError>;

/// Identifies a fetch and the store state it was issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    /// Store generation when the fetch was issued. `reset` starts a new one.
    pub generation: u64,
}

/// A fetch that is currently on the wire.
///
/// The request runs in its own task, so it completes and updates the store
/// even when every caller waiting on it has gone away. Callers await a
/// clone of a `Shared` handle over that task and all resolve to the same
/// outcome.
pub struct PendingFetch<T> {
    pub ticket: FetchTicket,
    future: Shared<BoxFuture<'static, FetchOutcome<T>>>,
}

impl<T: Send + Sync + 'static> PendingFetch<T> {
    /// Start `request` on the runtime. Must be called from within a tokio
    /// runtime.
    pub fn spawn<F>(ticket: FetchTicket, request: F) -> Self
    where
        F: Future<Output = FetchOutcome<T>> + Send + 'static,
    {
        let handle = tokio::spawn(request);
        let future = async move {
            handle.await.unwrap_or_else(|err| {
                Err(ApiError::ServerError(format!(
                    "fetch {} did not complete: {}",
                    ticket.id, err
                )))
            })
        };
        Self {
            ticket,
            future: future.boxed().shared(),
        }
    }

    /// A handle that resolves to this fetch's outcome.
    pub fn attach(&self) -> Shared<BoxFuture<'static, FetchOutcome<T>>> {
        self.future.clone()
    }
}

impl<T> std::fmt::Debug for PendingFetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}
