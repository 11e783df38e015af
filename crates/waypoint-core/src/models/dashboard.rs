//! Admin console dashboard figures.
//!
//! The dashboard is a single aggregate document rather than a collection, so
//! it is not a `Resource`; `ApiClient::dashboard_stats` reads it directly.

use serde::{Deserialize, Serialize};

use super::booking::Booking;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_tours: u64,
    pub total_transfers: u64,
    pub total_bookings: u64,
    pub pending_bookings: u64,
    pub total_consultations: u64,
    pub new_consultations: u64,
    pub total_users: u64,
    pub total_blog_posts: u64,
    pub recent_bookings: Vec<Booking>,
}

impl DashboardStats {
    /// Requests still waiting on staff: pending bookings plus new consultations.
    pub fn open_requests(&self) -> u64 {
        self.pending_bookings + self.new_consultations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_counts_default_to_zero() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"totalTours":12,"pendingBookings":3,"newConsultations":2,
                "recentBookings":[{"_id":"b1","customerName":"Ana"}]}"#,
        )
        .unwrap();
        assert_eq!(stats.total_tours, 12);
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.open_requests(), 5);
        assert_eq!(stats.recent_bookings[0].id, "b1");
    }
}
