//! Data models for the booking backend's resources.
//!
//! Every collection the site and admin console manage is represented here,
//! together with the request bodies used to create and update it:
//!
//! - `Tour`, `Transfer`: bookable products
//! - `TourCategory`, `TransferCategory`: their groupings
//! - `BlogPost`: site content
//! - `User`: admin console accounts
//! - `Booking`, `Consultation`: customer requests
//! - `Setting`: site-wide key/value configuration
//! - `DashboardStats`: admin console aggregates (read-only, not a collection)
//!
//! Wire names are camelCase; identifiers accept both `id` and `_id`.

pub mod blog;
pub mod booking;
pub mod category;
pub mod consultation;
pub mod dashboard;
pub mod setting;
pub mod tour;
pub mod transfer;
pub mod user;

pub use blog::{BlogPost, BlogPostInput, BlogPostPatch};
pub use booking::{Booking, BookingInput, BookingPatch, BookingStatus};
pub use category::{CategoryInput, CategoryPatch, TourCategory, TransferCategory};
pub use consultation::{Consultation, ConsultationInput, ConsultationPatch, ConsultationStatus};
pub use dashboard::DashboardStats;
pub use setting::{Setting, SettingInput, SettingPatch};
pub use tour::{Tour, TourInput, TourPatch};
pub use transfer::{Transfer, TransferInput, TransferPatch, VehicleType};
pub use user::{User, UserInput, UserPatch, UserRole};
