//! Core library for waypoint.
//!
//! Provides the cached resource stores that back the travel-booking site and
//! admin console, together with the REST API client they talk to and the
//! domain models for every resource the backend exposes.
//!
//! - `api`: `ApiClient`, `ApiError` and the `ResourceApi` collaborator trait
//! - `models`: tours, transfers, categories, blog posts, users, bookings,
//!   consultations and settings
//! - `store`: the generic `ResourceStore` (TTL cache, fetch dedup, mutation
//!   reconciliation)
//! - `stores`: one store per resource, built from a shared client and config
//! - `config`: application configuration

pub mod api;
pub mod config;
pub mod models;
pub mod store;
pub mod stores;

pub use api::{ApiClient, ApiError, ApiEvent, FailureKind, ListParams, ResourceApi};
pub use config::{CacheConfig, Config};
pub use store::{InsertPosition, Resource, ResourceStore, Snapshot, StoreFailure, StoreOperation};
pub use stores::{BackendApi, Stores};
