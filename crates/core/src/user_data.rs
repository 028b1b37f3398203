//! User Data Store
//!
//! Holds everything the assistant knows about the user: the free-form profile
//! document, the location history, the calendar, and the social media and
//! playlist summaries. Location and calendar lookups always take an explicit
//! point in simulated time.

use crate::error::DataError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Place reported when no location record precedes the query time.
pub const UNKNOWN_LOCATION: &str = "Unknown";

const LOCATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// --- Profile ---

/// The user's personal attributes, as loaded from `user_profile.json`.
///
/// The document is free-form; only the handful of fields the simulator reads
/// have typed accessors, and each of them fails with
/// [`DataError::MissingField`] when the field is absent or mistyped.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile(Value);

impl UserProfile {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// The raw profile document.
    pub fn document(&self) -> &Value {
        &self.0
    }

    pub fn name(&self) -> Result<&str, DataError> {
        let path = ["name"];
        self.field(&path)?
            .as_str()
            .ok_or_else(|| missing(&path))
    }

    pub fn last_night_sleep(&self) -> Result<&Value, DataError> {
        self.field(&["fitness_data", "sleep", "last_night"])
    }

    pub fn steps_today(&self) -> Result<f64, DataError> {
        let path = ["fitness_data", "steps_today"];
        self.field(&path)?.as_f64().ok_or_else(|| missing(&path))
    }

    pub fn calories_burned_today(&self) -> Result<f64, DataError> {
        let path = ["fitness_data", "calories_burned_today"];
        self.field(&path)?.as_f64().ok_or_else(|| missing(&path))
    }

    pub fn average_daily_steps(&self) -> Result<f64, DataError> {
        let path = ["fitness_data", "average_daily_steps"];
        self.field(&path)?.as_f64().ok_or_else(|| missing(&path))
    }

    fn field(&self, path: &[&str]) -> Result<&Value, DataError> {
        path.iter()
            .try_fold(&self.0, |node, key| node.get(*key))
            .ok_or_else(|| missing(path))
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn missing(path: &[&str]) -> DataError {
    DataError::MissingField(path.join("."))
}

// --- Location and calendar records ---

/// A single point of the user's location history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub timestamp: NaiveDateTime,
    pub place: String,
}

impl LocationRecord {
    pub fn new(timestamp: NaiveDateTime, place: impl Into<String>) -> Self {
        Self {
            timestamp,
            place: place.into(),
        }
    }

    /// Builds a record from a `YYYY-MM-DD HH:MM:SS` timestamp string.
    pub fn parse(timestamp: &str, place: impl Into<String>) -> Result<Self, DataError> {
        let timestamp = NaiveDateTime::parse_from_str(timestamp.trim(), LOCATION_TIMESTAMP_FORMAT)
            .map_err(|source| DataError::Timestamp {
                value: timestamp.to_string(),
                source,
            })?;
        Ok(Self::new(timestamp, place))
    }
}

/// A calendar entry. Durations are kept as the opaque strings found in the
/// calendar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
    pub duration: String,
}

impl CalendarEvent {
    /// Creates an event starting at `starts_at`, truncated to the minute.
    pub fn new(
        starts_at: NaiveDateTime,
        description: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        let time = starts_at.time();
        let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
        Self {
            date: starts_at.date(),
            time,
            description: description.into(),
            duration: duration.into(),
        }
    }

    /// Builds an event from `YYYY-MM-DD` and `HH:MM` strings.
    pub fn parse(
        date: &str,
        time: &str,
        description: impl Into<String>,
        duration: impl Into<String>,
    ) -> Result<Self, DataError> {
        let raw = format!("{} {}", date.trim(), time.trim());
        let starts_at =
            NaiveDateTime::parse_from_str(&raw, &format!("{DATE_FORMAT} {TIME_FORMAT}"))
                .map_err(|source| DataError::Timestamp { value: raw, source })?;
        Ok(Self::new(starts_at, description, duration))
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} (duration: {})",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT),
            self.description,
            self.duration
        )
    }
}

// --- Store ---

/// In-memory view of all user data for one simulation.
///
/// The calendar is append-only: events can be added through
/// [`UserData::add_event`] but never removed.
#[derive(Debug, Clone)]
pub struct UserData {
    pub name: String,
    pub profile: UserProfile,
    pub social_media: Value,
    pub spotify_playlists: Value,
    location_data: Vec<LocationRecord>,
    calendar: Vec<CalendarEvent>,
}

impl UserData {
    /// Creates a store with an empty history, calendar and media documents.
    pub fn new(name: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            name: name.into(),
            profile,
            social_media: Value::Null,
            spotify_playlists: Value::Null,
            location_data: Vec::new(),
            calendar: Vec::new(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<LocationRecord>) -> Self {
        self.location_data = locations;
        self
    }

    pub fn with_calendar(mut self, calendar: Vec<CalendarEvent>) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_social_media(mut self, social_media: Value) -> Self {
        self.social_media = social_media;
        self
    }

    pub fn with_spotify_playlists(mut self, playlists: Value) -> Self {
        self.spotify_playlists = playlists;
        self
    }

    /// Loads every data source from `data_dir`.
    ///
    /// Expected layout:
    ///
    /// ```text
    /// data_dir/user_data/user_profile.json
    /// data_dir/user_data/social_media.json
    /// data_dir/user_data/spotify_playlists.json
    /// data_dir/device_data/location.csv   (timestamp,location)
    /// data_dir/device_data/calendar.csv   (date,time,event,duration)
    /// ```
    ///
    /// Any unreadable file, malformed row or bad timestamp aborts the load.
    pub fn load(data_dir: &Path, name: impl Into<String>) -> Result<Self, DataError> {
        let user_dir = data_dir.join("user_data");
        let device_dir = data_dir.join("device_data");

        let profile = UserProfile::new(read_json(&user_dir.join("user_profile.json"))?);
        let social_media = read_json(&user_dir.join("social_media.json"))?;
        let spotify_playlists = read_json(&user_dir.join("spotify_playlists.json"))?;

        let locations = read_csv::<LocationRow>(&device_dir.join("location.csv"))?
            .into_iter()
            .map(|row| LocationRecord::parse(&row.timestamp, row.location))
            .collect::<Result<Vec<_>, _>>()?;

        let calendar = read_csv::<CalendarRow>(&device_dir.join("calendar.csv"))?
            .into_iter()
            .map(|row| CalendarEvent::parse(&row.date, &row.time, row.event, row.duration))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            locations = locations.len(),
            events = calendar.len(),
            data_dir = %data_dir.display(),
            "User data loaded"
        );

        Ok(Self::new(name, profile)
            .with_locations(locations)
            .with_calendar(calendar)
            .with_social_media(social_media)
            .with_spotify_playlists(spotify_playlists))
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.location_data
    }

    pub fn calendar(&self) -> &[CalendarEvent] {
        &self.calendar
    }

    /// Returns the place of the latest record at or before `at`.
    ///
    /// When several records share that latest timestamp, the one scanned
    /// last wins. Returns [`UNKNOWN_LOCATION`] if no record qualifies.
    pub fn current_location(&self, at: NaiveDateTime) -> &str {
        self.location_data
            .iter()
            .filter(|record| record.timestamp <= at)
            .fold(None::<&LocationRecord>, |latest, record| match latest {
                Some(best) if best.timestamp > record.timestamp => Some(best),
                _ => Some(record),
            })
            .map_or(UNKNOWN_LOCATION, |record| record.place.as_str())
    }

    /// Returns the events starting within `[at, at + window_hours]`, bounds
    /// included, in calendar order.
    pub fn upcoming_events(&self, at: NaiveDateTime, window_hours: i64) -> Vec<&CalendarEvent> {
        let horizon = at + Duration::hours(window_hours);
        self.calendar
            .iter()
            .filter(|event| {
                let starts_at = event.starts_at();
                at <= starts_at && starts_at <= horizon
            })
            .collect()
    }

    /// Appends an event. No deduplication or overlap check is made.
    pub fn add_event(&mut self, event: CalendarEvent) {
        info!(event = %event, "[Event added]");
        self.calendar.push(event);
    }
}

// --- Flat-file helpers ---

/// One row of `location.csv`.
#[derive(Debug, Deserialize)]
struct LocationRow {
    timestamp: String,
    location: String,
}

/// One row of `calendar.csv`.
#[derive(Debug, Deserialize)]
struct CalendarRow {
    date: String,
    time: String,
    event: String,
    duration: String,
}

fn read_to_string(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Value, DataError> {
    let text = read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a headed CSV file, matching columns to `T`'s fields by name.
fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DataError> {
    let text = read_to_string(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            line: source.position().map_or(0, |pos| pos.line()),
            source,
        })?;
    debug!(path = %path.display(), rows = rows.len(), "Parsed CSV file");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").unwrap()
    }

    fn profile() -> UserProfile {
        UserProfile::new(json!({
            "name": "Dan",
            "fitness_data": {
                "steps_today": 10250,
                "calories_burned_today": 2310,
                "average_daily_steps": 8000,
                "sleep": { "last_night": { "hours": 7.5, "quality": "good" } }
            }
        }))
    }

    fn store() -> UserData {
        UserData::new("Dan", profile()).with_locations(vec![
            LocationRecord::parse("2024-01-01 08:00:00", "Home").unwrap(),
            LocationRecord::parse("2024-01-01 09:30:00", "Office").unwrap(),
        ])
    }

    #[test]
    fn test_current_location_follows_history() {
        let user = store();
        assert_eq!(user.current_location(at("2024-01-01 09:00")), "Home");
        assert_eq!(user.current_location(at("2024-01-01 09:30")), "Office");
        assert_eq!(user.current_location(at("2024-01-01 23:59")), "Office");
    }

    #[test]
    fn test_current_location_unknown_before_history() {
        let user = store();
        assert_eq!(user.current_location(at("2024-01-01 07:00")), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_current_location_ignores_insertion_order() {
        let user = UserData::new("Dan", profile()).with_locations(vec![
            LocationRecord::parse("2024-01-01 12:00:00", "Gym").unwrap(),
            LocationRecord::parse("2024-01-01 08:00:00", "Home").unwrap(),
        ]);
        assert_eq!(user.current_location(at("2024-01-01 10:00")), "Home");
        assert_eq!(user.current_location(at("2024-01-01 12:30")), "Gym");
    }

    #[test]
    fn test_current_location_tie_goes_to_last_record() {
        let user = UserData::new("Dan", profile()).with_locations(vec![
            LocationRecord::parse("2024-01-01 08:00:00", "Home").unwrap(),
            LocationRecord::parse("2024-01-01 08:00:00", "Driveway").unwrap(),
        ]);
        assert_eq!(user.current_location(at("2024-01-01 08:15")), "Driveway");
    }

    #[test]
    fn test_upcoming_events_bounds_are_inclusive() {
        let user = store().with_calendar(vec![
            CalendarEvent::parse("2024-01-01", "08:59", "Too early", "1").unwrap(),
            CalendarEvent::parse("2024-01-01", "09:00", "Standup", "1").unwrap(),
            CalendarEvent::parse("2024-01-01", "11:00", "Lunch prep", "1").unwrap(),
            CalendarEvent::parse("2024-01-01", "11:01", "Too late", "1").unwrap(),
        ]);

        let upcoming: Vec<_> = user
            .upcoming_events(at("2024-01-01 09:00"), 2)
            .into_iter()
            .map(|event| event.description.as_str())
            .collect();
        assert_eq!(upcoming, vec!["Standup", "Lunch prep"]);
    }

    #[test]
    fn test_upcoming_events_keep_calendar_order() {
        let user = store().with_calendar(vec![
            CalendarEvent::parse("2024-01-01", "10:30", "Later", "1").unwrap(),
            CalendarEvent::parse("2024-01-01", "09:15", "Sooner", "1").unwrap(),
        ]);
        let upcoming: Vec<_> = user
            .upcoming_events(at("2024-01-01 09:00"), 2)
            .into_iter()
            .map(|event| event.description.as_str())
            .collect();
        assert_eq!(upcoming, vec!["Later", "Sooner"]);
    }

    #[test]
    fn test_add_event_appends_without_dedup() {
        let mut user = store();
        let event = CalendarEvent::new(at("2024-01-01 09:00"), "Stretch", "1");
        user.add_event(event.clone());
        user.add_event(event);
        assert_eq!(user.calendar().len(), 2);
        assert_eq!(user.upcoming_events(at("2024-01-01 09:00"), 0).len(), 2);
    }

    #[test]
    fn test_calendar_event_new_truncates_seconds() {
        let starts_at = NaiveDateTime::parse_from_str("2024-01-01 09:00:42", LOCATION_TIMESTAMP_FORMAT)
            .unwrap();
        let event = CalendarEvent::new(starts_at, "Walk", "1");
        assert_eq!(event.time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(event.to_string(), "2024-01-01 09:00: Walk (duration: 1)");
    }

    #[test]
    fn test_malformed_timestamps_are_errors() {
        assert!(matches!(
            LocationRecord::parse("yesterday", "Home"),
            Err(DataError::Timestamp { .. })
        ));
        assert!(matches!(
            CalendarEvent::parse("2024-13-01", "09:00", "Bad", "1"),
            Err(DataError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_profile_accessors() {
        let profile = profile();
        assert_eq!(profile.name().unwrap(), "Dan");
        assert_eq!(profile.steps_today().unwrap(), 10250.0);
        assert_eq!(profile.calories_burned_today().unwrap(), 2310.0);
        assert_eq!(profile.average_daily_steps().unwrap(), 8000.0);
        assert_eq!(profile.last_night_sleep().unwrap()["quality"], "good");
    }

    #[test]
    fn test_profile_missing_field() {
        let profile = UserProfile::new(json!({ "name": "Dan" }));
        match profile.steps_today() {
            Err(DataError::MissingField(field)) => assert_eq!(field, "fitness_data.steps_today"),
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    fn write_data_dir(calendar_csv: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("user_data");
        let device_dir = dir.path().join("device_data");
        fs::create_dir_all(&user_dir).unwrap();
        fs::create_dir_all(&device_dir).unwrap();

        fs::write(user_dir.join("user_profile.json"), profile().to_string()).unwrap();
        fs::write(user_dir.join("social_media.json"), r#"{"recent_posts": []}"#).unwrap();
        fs::write(user_dir.join("spotify_playlists.json"), r#"{"playlists": []}"#).unwrap();
        fs::write(
            device_dir.join("location.csv"),
            "timestamp,location\n2024-01-01 08:00:00,Home\n\n2024-01-01 09:30:00,Office\n",
        )
        .unwrap();
        fs::write(device_dir.join("calendar.csv"), calendar_csv).unwrap();
        dir
    }

    #[test]
    fn test_load_reads_all_sources() {
        let dir = write_data_dir(
            "date,time,event,duration\n2024-01-01,10:00,\"Team sync, weekly\",1\n",
        );
        let user = UserData::load(dir.path(), "Dan").unwrap();

        assert_eq!(user.name, "Dan");
        assert_eq!(user.profile.name().unwrap(), "Dan");
        assert_eq!(user.locations().len(), 2);
        assert_eq!(user.calendar().len(), 1);
        assert_eq!(user.calendar()[0].description, "Team sync, weekly");
        assert_eq!(user.social_media["recent_posts"], json!([]));
    }

    #[test]
    fn test_load_accepts_reordered_columns() {
        let dir = write_data_dir("event,duration,date,time\nGym,2,2024-01-01,18:00\n");
        let user = UserData::load(dir.path(), "Dan").unwrap();
        assert_eq!(user.calendar()[0].description, "Gym");
        assert_eq!(user.calendar()[0].duration, "2");
    }

    #[test]
    fn test_load_skips_byte_order_mark() {
        let dir = write_data_dir("\u{feff}date,time,event,duration\n2024-01-01,09:00,Sync,1\n");
        let user = UserData::load(dir.path(), "Dan").unwrap();
        assert_eq!(user.calendar().len(), 1);
        assert_eq!(user.calendar()[0].description, "Sync");
    }

    #[test]
    fn test_load_keeps_quoted_newlines_and_quotes() {
        let dir = write_data_dir(
            "date,time,event,duration\n2024-01-01,09:00,\"Sync\nagenda, then \"\"deep\"\" work\",1\n",
        );
        let user = UserData::load(dir.path(), "Dan").unwrap();
        assert_eq!(
            user.calendar()[0].description,
            "Sync\nagenda, then \"deep\" work"
        );
        assert_eq!(user.calendar()[0].duration, "1");
    }

    #[test]
    fn test_load_rejects_missing_columns() {
        let dir = write_data_dir("date,time,duration\n2024-01-01,09:00,1\n");
        assert!(matches!(
            UserData::load(dir.path(), "Dan"),
            Err(DataError::Csv { .. })
        ));
    }

    #[test]
    fn test_load_rejects_bad_rows() {
        let dir = write_data_dir("date,time,event,duration\n2024-01-01,10:00,Sync\n");
        match UserData::load(dir.path(), "Dan") {
            Err(DataError::Csv { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Csv error, got {:?}", other),
        }

        let dir = write_data_dir("date,time,event,duration\n2024-01-01,25:00,Sync,1\n");
        assert!(matches!(
            UserData::load(dir.path(), "Dan"),
            Err(DataError::Timestamp { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            UserData::load(dir.path(), "Dan"),
            Err(DataError::Io { .. })
        ));
    }
}
