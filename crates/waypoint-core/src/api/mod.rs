//! REST API client module for the booking backend.
//!
//! This module provides the `ApiClient` for communicating with the backend
//! and the `ResourceApi` trait that resource stores are written against.
//! Stores never see HTTP: they only see payloads and classified `ApiError`s.
//!
//! Bearer tokens are attached by the client, and unauthorized responses are
//! broadcast as `ApiEvent::Unauthorized` so the host can force a logout.

pub mod client;
pub mod error;
pub mod resource;

pub use client::{ApiClient, ApiEvent};
pub use error::{ApiError, FailureKind};
pub use resource::{ListParams, ResourceApi};
