//! The collaborator seam between resource stores and the transport.

use std::future::Future;

use crate::store::Resource;

use super::ApiError;

/// Query parameters for a collection fetch, sent as a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams(Vec<(String, String)>);

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Remote operations for one resource type.
///
/// Implementations resolve to either the payload or a classified `ApiError`.
/// Auth headers, retries of rate-limited calls and global failure signalling
/// are the implementation's business; stores only see the outcome.
pub trait ResourceApi<R: Resource>: Send + Sync + 'static {
    /// `GET collection(params)`
    fn list(&self, params: &ListParams) -> impl Future<Output = Result<Vec<R>, ApiError>> + Send;

    /// `GET item(id)`. A missing item is `ApiError::NotFound`, never an empty success.
    fn get(&self, id: &str) -> impl Future<Output = Result<R, ApiError>> + Send;

    /// `POST collection(input)`
    fn create(&self, input: &R::Create) -> impl Future<Output = Result<R, ApiError>> + Send;

    /// `PUT item(id, patch)`
    fn update(
        &self,
        id: &str,
        patch: &R::Patch,
    ) -> impl Future<Output = Result<R, ApiError>> + Send;

    /// `DELETE item(id)`
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
