//! Device Event Generator
//!
//! Turns the store's view of "now" into the plain-text events a phone would
//! surface: where the user is, and what is coming up in the next two hours.

use crate::user_data::UserData;
use chrono::NaiveDateTime;
use tracing::info;

/// Window, in hours, used when looking for upcoming calendar events.
pub const UPCOMING_WINDOW_HOURS: i64 = 2;

/// Marker shared by every upcoming-event line; handlers match on it.
pub const UPCOMING_EVENT_MARKER: &str = "Upcoming event";

/// Generates location and upcoming-event lines for a point in simulated time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceData;

impl DeviceData {
    pub fn new() -> Self {
        Self
    }

    /// Returns the events visible at `at`.
    ///
    /// The first line always reports the current location. Each following
    /// line announces one calendar event starting within the next
    /// [`UPCOMING_WINDOW_HOURS`], with the lead time floored to whole minutes.
    pub fn generate_events(&self, user: &UserData, at: NaiveDateTime) -> Vec<String> {
        let mut events = vec![format!(
            "{} is currently at {}",
            user.name,
            user.current_location(at)
        )];

        for event in user.upcoming_events(at, UPCOMING_WINDOW_HOURS) {
            let minutes_until = (event.starts_at() - at).num_seconds().div_euclid(60);
            let line = format!(
                "{UPCOMING_EVENT_MARKER} in {minutes_until} minutes: {}",
                event.description
            );
            info!("[Event Notification] {}", line);
            events.push(line);
        }

        events
    }
}
