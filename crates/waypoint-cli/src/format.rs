//! Plain-text rendering of cached collections for the terminal.

use waypoint_core::models::{
    BlogPost, Booking, Consultation, DashboardStats, Setting, Tour, TourCategory, Transfer,
    TransferCategory, User,
};
use waypoint_core::Resource;

/// Column width for the summary column in list output
const SUMMARY_WIDTH: usize = 60;

/// One-line description of an item for list output.
pub trait Summary: Resource {
    fn summary(&self) -> String;
}

impl Summary for Tour {
    fn summary(&self) -> String {
        format!("{} ({})", self.title, self.display_price())
    }
}

impl Summary for Transfer {
    fn summary(&self) -> String {
        format!("{} [{}]", self.title, self.route())
    }
}

impl Summary for TourCategory {
    fn summary(&self) -> String {
        self.name.clone()
    }
}

impl Summary for TransferCategory {
    fn summary(&self) -> String {
        self.name.clone()
    }
}

impl Summary for BlogPost {
    fn summary(&self) -> String {
        let state = if self.is_published { "published" } else { "draft" };
        format!("{} ({})", self.title, state)
    }
}

impl Summary for User {
    fn summary(&self) -> String {
        format!("{} <{}>", self.display_name(), self.email)
    }
}

impl Summary for Booking {
    fn summary(&self) -> String {
        let date = self
            .travel_date
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| "no date".to_string());
        format!(
            "{} x{} on {} - {}",
            self.customer_name, self.guests, date, self.status
        )
    }
}

impl Summary for Consultation {
    fn summary(&self) -> String {
        format!("{} <{}>", self.name, format_optional(&self.email, "no email"))
    }
}

impl Summary for Setting {
    fn summary(&self) -> String {
        self.value.to_string()
    }
}

/// Render a collection as an aligned two-column table.
pub fn format_list<R: Summary>(items: &[R], age: &str) -> String {
    let width = items.iter().map(|i| i.id().len()).max().unwrap_or(2).max(2);
    let mut out = format!("{} {} (updated {})\n", items.len(), R::NAME, age);
    for item in items {
        out.push_str(&format!(
            "{:<width$}  {}\n",
            item.id(),
            truncate_string(&item.summary(), SUMMARY_WIDTH),
            width = width
        ));
    }
    out
}

/// Render the dashboard figures, followed by the most recent bookings.
pub fn format_dashboard(stats: &DashboardStats) -> String {
    let mut out = format!(
        "Tours: {}  Transfers: {}  Blog posts: {}  Users: {}\n\
         Bookings: {} ({} pending)  Consultations: {} ({} new)\n",
        stats.total_tours,
        stats.total_transfers,
        stats.total_blog_posts,
        stats.total_users,
        stats.total_bookings,
        stats.pending_bookings,
        stats.total_consultations,
        stats.new_consultations,
    );
    if !stats.recent_bookings.is_empty() {
        out.push_str(&format_list(&stats.recent_bookings, "recently"));
    }
    out
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}
