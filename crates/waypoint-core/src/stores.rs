//! One store per backend resource, wired from a shared API client and the
//! cache configuration.

use std::sync::Arc;

use crate::api::ResourceApi;
use crate::config::CacheConfig;
use crate::models::{
    BlogPost, Booking, Consultation, Setting, Tour, TourCategory, Transfer, TransferCategory, User,
};
use crate::store::{Resource, ResourceStore};

/// An API client able to serve every resource the backend exposes.
pub trait BackendApi:
    ResourceApi<Tour>
    + ResourceApi<Transfer>
    + ResourceApi<TourCategory>
    + ResourceApi<TransferCategory>
    + ResourceApi<BlogPost>
    + ResourceApi<User>
    + ResourceApi<Booking>
    + ResourceApi<Consultation>
    + ResourceApi<Setting>
{
}

impl<A> BackendApi for A where
    A: ResourceApi<Tour>
        + ResourceApi<Transfer>
        + ResourceApi<TourCategory>
        + ResourceApi<TransferCategory>
        + ResourceApi<BlogPost>
        + ResourceApi<User>
        + ResourceApi<Booking>
        + ResourceApi<Consultation>
        + ResourceApi<Setting>
{
}

pub struct Stores<A> {
    pub tours: ResourceStore<Tour, A>,
    pub transfers: ResourceStore<Transfer, A>,
    pub tour_categories: ResourceStore<TourCategory, A>,
    pub transfer_categories: ResourceStore<TransferCategory, A>,
    pub blog_posts: ResourceStore<BlogPost, A>,
    pub users: ResourceStore<User, A>,
    pub bookings: ResourceStore<Booking, A>,
    pub consultations: ResourceStore<Consultation, A>,
    pub settings: ResourceStore<Setting, A>,
}

impl<A> Clone for Stores<A> {
    fn clone(&self) -> Self {
        Self {
            tours: self.tours.clone(),
            transfers: self.transfers.clone(),
            tour_categories: self.tour_categories.clone(),
            transfer_categories: self.transfer_categories.clone(),
            blog_posts: self.blog_posts.clone(),
            users: self.users.clone(),
            bookings: self.bookings.clone(),
            consultations: self.consultations.clone(),
            settings: self.settings.clone(),
        }
    }
}

fn store<T, A>(api: &Arc<A>, cache: &CacheConfig) -> ResourceStore<T, A>
where
    T: Resource,
    A: ResourceApi<T>,
{
    ResourceStore::new(Arc::clone(api), cache.ttl_for(T::NAME))
}

impl<A: BackendApi> Stores<A> {
    pub fn new(api: Arc<A>, cache: &CacheConfig) -> Self {
        Self {
            tours: store(&api, cache),
            transfers: store(&api, cache),
            tour_categories: store(&api, cache),
            transfer_categories: store(&api, cache),
            blog_posts: store(&api, cache),
            users: store(&api, cache),
            bookings: store(&api, cache),
            consultations: store(&api, cache),
            settings: store(&api, cache),
        }
    }

    /// Drop every cached collection and discard in-flight results, e.g. on
    /// logout.
    pub fn reset_all(&self) {
        self.tours.reset();
        self.transfers.reset();
        self.tour_categories.reset();
        self.transfer_categories.reset();
        self.blog_posts.reset();
        self.users.reset();
        self.bookings.reset();
        self.consultations.reset();
        self.settings.reset();
    }

    /// Mark every collection stale without discarding what is displayed.
    pub fn invalidate_all(&self) {
        self.tours.invalidate();
        self.transfers.invalidate();
        self.tour_categories.invalidate();
        self.transfer_categories.invalidate();
        self.blog_posts.invalidate();
        self.users.invalidate();
        self.bookings.invalidate();
        self.consultations.invalidate();
        self.settings.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::ApiClient;

    fn stores(cache: &CacheConfig) -> Stores<ApiClient> {
        let client = ApiClient::new("http://localhost:5000/api", Duration::from_secs(5)).unwrap();
        Stores::new(Arc::new(client), cache)
    }

    #[test]
    fn test_per_resource_ttl_overrides() {
        let mut cache = CacheConfig::default();
        cache.ttl_minutes.insert("settings".to_string(), 60);
        cache.ttl_minutes.insert("bookings".to_string(), 0);

        let stores = stores(&cache);
        assert_eq!(stores.settings.ttl(), chrono::Duration::minutes(60));
        assert_eq!(stores.bookings.ttl(), chrono::Duration::zero());
        assert_eq!(stores.tours.ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_reset_all_leaves_every_store_empty() {
        let stores = stores(&CacheConfig::default());
        stores.invalidate_all();
        stores.reset_all();
        assert!(stores.tours.items().is_empty());
        assert!(!stores.settings.is_fresh());
        assert_eq!(stores.users.age_display(), "never");
    }
}
