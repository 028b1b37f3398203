//! Day Simulator
//!
//! Replays one day of the user's life on a simulated clock. The day moves
//! through three states:
//!
//! - `NotStarted` -> `Running` via [`DaySimulator::start_day`]: greeting,
//!   task list and a first recommendation.
//! - `Running` -> `Running` via [`DaySimulator::process_time`] (one tick):
//!   device events are dispatched to handlers, and recommendations are
//!   generated on the configured hours.
//! - `Running` -> `Ended` via [`DaySimulator::end_day`]: summary and a
//!   simulated closing reply.
//!
//! Everything runs sequentially; each LLM call is awaited before the
//! simulation continues.

use crate::{
    config::{HistoryPolicy, SimulationConfig},
    device_data::{DeviceData, UPCOMING_EVENT_MARKER},
    error::SimulationError,
    llm_client::LlmGateway,
    prompts::{self, PromptLibrary},
    user_data::{CalendarEvent, UserData},
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use minijinja::context;
use std::fmt;
use tracing::{debug, info};

/// Format used for times shown to the user.
const DISPLAY_TIME_FORMAT: &str = "%I:%M %p";
/// Calendar look-ahead, in hours, used when planning the day's tasks.
const TASK_PLANNING_WINDOW_HOURS: i64 = 24;
/// Duration given to calendar events created from recommendations.
const RECOMMENDED_EVENT_DURATION: &str = "1";
/// How many recommendations are repeated in the evening summary.
const SUMMARY_RECOMMENDATIONS: usize = 3;

const EVENT_FOLLOW_UP: &str = "Would you like me to take care of anything related to this event?";
const CLOSING_PROMPT: &str =
    "Is there anything else you'd like me to help with before you call it a day?";

// --- Public types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    NotStarted,
    Running,
    Ended,
}

impl fmt::Display for DayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayState::NotStarted => write!(f, "not started"),
            DayState::Running => write!(f, "running"),
            DayState::Ended => write!(f, "ended"),
        }
    }
}

/// Where a notification was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Shown to the user.
    Notification,
    /// Internal trace of generated recommendations.
    Brain,
    /// A calendar entry created by the assistant.
    EventAdded,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Notification => write!(f, "NOTIFICATION"),
            Channel::Brain => write!(f, "AI's Brain"),
            Channel::EventAdded => write!(f, "Event added"),
        }
    }
}

/// A message emitted during the simulation, stamped with simulated time.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub at: NaiveDateTime,
    pub channel: Channel,
    pub message: String,
}

/// Urgency of a recommendation, read from the model's free-text answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Urgent,
    Important,
    Normal,
}

impl Urgency {
    /// Case-insensitive substring match; "urgent" wins over "important".
    pub fn classify(response: &str) -> Self {
        let lowered = response.to_lowercase();
        if lowered.contains("urgent") {
            Urgency::Urgent
        } else if lowered.contains("important") {
            Urgency::Important
        } else {
            Urgency::Normal
        }
    }

    /// Whether a calendar slot should be booked for the recommendation.
    pub fn needs_calendar_slot(self) -> bool {
        !matches!(self, Urgency::Normal)
    }
}

/// End-of-day report.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub tasks_completed: usize,
    pub steps: f64,
    pub calories: f64,
    pub exceeded_average_steps: bool,
    pub recent_recommendations: Vec<String>,
    pub user_reply: String,
    pub ticks: usize,
}

// --- Simulator ---

pub struct DaySimulator {
    user: UserData,
    devices: DeviceData,
    gateway: LlmGateway,
    prompts: PromptLibrary,
    config: SimulationConfig,
    state: DayState,
    clock: Option<NaiveDateTime>,
    ticks: usize,
    tasks: Vec<String>,
    recommendations: Vec<String>,
    notifications: Vec<Notification>,
}

impl DaySimulator {
    /// Creates a simulator in the `NotStarted` state.
    ///
    /// Fails if `config` does not pass [`SimulationConfig::validate`].
    pub fn new(
        user: UserData,
        devices: DeviceData,
        gateway: LlmGateway,
        prompts: PromptLibrary,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            user,
            devices,
            gateway,
            prompts,
            config,
            state: DayState::NotStarted,
            clock: None,
            ticks: 0,
            tasks: Vec::new(),
            recommendations: Vec::new(),
            notifications: Vec::new(),
        })
    }

    pub fn state(&self) -> DayState {
        self.state
    }

    pub fn clock(&self) -> Option<NaiveDateTime> {
        self.clock
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Runs a full day on `date`: start, one tick per interval from the
    /// configured start time up to and including the end time, then end.
    pub async fn simulate_day(&mut self, date: NaiveDate) -> Result<DaySummary, SimulationError> {
        let start = date.and_time(self.config.start_time);
        let end = date.and_time(self.config.end_time);
        let step = Duration::minutes(i64::from(self.config.interval_minutes));
        info!(%date, %start, %end, interval = self.config.interval_minutes, "Simulating day");

        self.start_day(start).await?;

        let mut current_time = start;
        while current_time <= end {
            self.process_time(current_time).await?;
            current_time += step;
        }

        self.end_day(end).await
    }

    /// Opens the day: greeting, the day's task list and a first recommendation.
    ///
    /// Allowed from `NotStarted` and from `Ended`, which begins a new day on
    /// the same simulator.
    pub async fn start_day(&mut self, current_time: NaiveDateTime) -> Result<(), SimulationError> {
        if self.state == DayState::Running {
            return Err(SimulationError::InvalidState {
                operation: "start the day",
                state: self.state,
            });
        }

        if self.config.history == HistoryPolicy::ResetOnStart {
            self.tasks.clear();
            self.recommendations.clear();
            self.notifications.clear();
        }
        let (previous_state, previous_clock, previous_ticks) = (self.state, self.clock, self.ticks);
        self.state = DayState::Running;
        self.clock = Some(current_time);
        self.ticks = 0;

        if let Err(e) = self.open_day(current_time).await {
            self.state = previous_state;
            self.clock = previous_clock;
            self.ticks = previous_ticks;
            return Err(e);
        }
        Ok(())
    }

    async fn open_day(&mut self, current_time: NaiveDateTime) -> Result<(), SimulationError> {
        let greeting = self.generate_personalised_greeting(current_time).await?;
        self.notify(current_time, Channel::Notification, greeting);
        self.notify(
            current_time,
            Channel::Notification,
            format!(
                "It's {}. Here's your day at a glance:",
                display_time(current_time)
            ),
        );

        self.generate_tasks(current_time).await?;
        self.generate_recommendations(current_time).await?;
        Ok(())
    }

    /// Processes one tick at `current_time`.
    pub async fn process_time(&mut self, current_time: NaiveDateTime) -> Result<(), SimulationError> {
        self.require_running("process a tick")?;
        self.require_not_before_clock(current_time)?;
        self.clock = Some(current_time);
        self.ticks += 1;
        debug!(tick = self.ticks, time = %current_time, "Processing tick");

        let events = self.devices.generate_events(&self.user, current_time);
        for event in events {
            self.handle_event(&event, current_time).await?;
        }

        if current_time.minute() == 0 && self.config.is_recommendation_hour(current_time.hour()) {
            self.generate_recommendations(current_time).await?;
        }
        Ok(())
    }

    /// Reacts to a single device event. Only upcoming-event lines trigger a
    /// proactive suggestion; everything else is ignored.
    ///
    /// Only valid while the day is running, at or after the current clock.
    pub async fn handle_event(
        &mut self,
        event: &str,
        current_time: NaiveDateTime,
    ) -> Result<(), SimulationError> {
        self.require_running("handle an event")?;
        self.require_not_before_clock(current_time)?;
        if !event.contains(UPCOMING_EVENT_MARKER) {
            return Ok(());
        }

        let name = self.user.name.clone();
        self.notify(
            current_time,
            Channel::Notification,
            format!("Heads up, {name}! {event}"),
        );

        let event_details = event
            .split_once(": ")
            .map_or(event, |(_, details)| details);
        let location = self.user.current_location(current_time).to_string();
        let profile = self.user.profile.to_string();
        let prompt = self.prompts.render(
            prompts::PROACTIVE_ACTION,
            context! {
                event => event_details,
                location,
                current_time => display_time(current_time),
                profile,
            },
        )?;

        let action = self.gateway.query(&prompt).await;
        self.notify(
            current_time,
            Channel::Notification,
            format!("I suggest: {action}"),
        );
        self.notify(current_time, Channel::Notification, EVENT_FOLLOW_UP.to_string());
        Ok(())
    }

    /// Asks the model for a recommendation and books a calendar slot for it
    /// when the answer reads as urgent or important.
    ///
    /// Fails unless the day is running and `current_time` is not before the
    /// clock.
    pub async fn generate_recommendations(
        &mut self,
        current_time: NaiveDateTime,
    ) -> Result<Urgency, SimulationError> {
        self.require_running("generate a recommendation")?;
        self.require_not_before_clock(current_time)?;
        let name = self.user.name.clone();
        let location = self.user.current_location(current_time).to_string();
        let profile = self.user.profile.to_string();
        let social_media = self.user.social_media.to_string();
        let playlists = self.user.spotify_playlists.to_string();
        let prompt = self.prompts.render(
            prompts::RECOMMENDATION,
            context! {
                name => &name,
                profile,
                social_media,
                playlists,
                location,
                current_time => display_time(current_time),
            },
        )?;

        let response = self.gateway.query(&prompt).await;
        self.recommendations.push(response.clone());
        self.notify(
            current_time,
            Channel::Brain,
            format!("Generated recommendation: {response}"),
        );

        let urgency = Urgency::classify(&response);
        if urgency.needs_calendar_slot() {
            self.notify(
                current_time,
                Channel::Notification,
                format!("Important recommendation: {response}"),
            );
            let event = CalendarEvent::new(current_time, response, RECOMMENDED_EVENT_DURATION);
            self.notify(current_time, Channel::EventAdded, event.to_string());
            self.user.add_event(event);
        } else {
            // Left for the user to confirm; nothing is booked.
            self.notify(
                current_time,
                Channel::Notification,
                format!("I have a new suggestion for you, {name}. Would you like to hear it?"),
            );
        }
        Ok(urgency)
    }

    /// Closes the day with a summary and a simulated reply from the user.
    pub async fn end_day(&mut self, current_time: NaiveDateTime) -> Result<DaySummary, SimulationError> {
        self.require_running("end the day")?;
        let name = self.user.name.clone();

        self.notify(
            current_time,
            Channel::Notification,
            format!("--- Good evening, {name}. ---"),
        );
        self.notify(
            current_time,
            Channel::Notification,
            "Here's a quick summary of your day:".to_string(),
        );

        let profile = &self.user.profile;
        let steps = profile.steps_today()?;
        let calories = profile.calories_burned_today()?;
        let exceeded_average_steps = steps > profile.average_daily_steps()?;
        let tasks_completed = self.tasks.len();

        let mut summary = format!(
            "You completed {tasks_completed} tasks today, took {steps} steps, and burned {calories} calories. Great job!"
        );
        if exceeded_average_steps {
            summary.push_str(" You exceeded your average daily step count!");
        }
        self.notify(current_time, Channel::Notification, summary);

        self.notify(
            current_time,
            Channel::Notification,
            "Here are some key recommendations for tomorrow:".to_string(),
        );
        let skip = self.recommendations.len().saturating_sub(SUMMARY_RECOMMENDATIONS);
        let recent_recommendations = self.recommendations[skip..].to_vec();
        for recommendation in &recent_recommendations {
            self.notify(
                current_time,
                Channel::Notification,
                format!("- {recommendation}"),
            );
        }

        self.notify(current_time, Channel::Notification, CLOSING_PROMPT.to_string());
        let user_reply = self.simulate_user_response(CLOSING_PROMPT, current_time).await?;

        self.state = DayState::Ended;
        info!(ticks = self.ticks, tasks = tasks_completed, "Day ended");

        Ok(DaySummary {
            tasks_completed,
            steps,
            calories,
            exceeded_average_steps,
            recent_recommendations,
            user_reply,
            ticks: self.ticks,
        })
    }

    /// Asks the model to play the user answering `prompt`.
    pub async fn simulate_user_response(
        &mut self,
        prompt: &str,
        current_time: NaiveDateTime,
    ) -> Result<String, SimulationError> {
        let request = self
            .prompts
            .render(prompts::SIMULATE_USER_RESPONSE, context! { prompt })?;
        let response = self.gateway.query(&request).await;
        self.notify(
            current_time,
            Channel::Notification,
            format!("Simulated user response: {response}"),
        );
        Ok(response)
    }

    async fn generate_personalised_greeting(
        &mut self,
        current_time: NaiveDateTime,
    ) -> Result<String, SimulationError> {
        let name = self.user.profile.name()?.to_string();
        let sleep_data = self.user.profile.last_night_sleep()?.to_string();
        let prompt = self.prompts.render(
            prompts::GREETING,
            context! {
                name,
                sleep_data,
                current_time => display_time(current_time),
            },
        )?;
        Ok(self.gateway.query(&prompt).await)
    }

    /// Replaces the task list with one task per non-empty line of the answer.
    async fn generate_tasks(&mut self, current_time: NaiveDateTime) -> Result<(), SimulationError> {
        let calendar = self
            .user
            .upcoming_events(current_time, TASK_PLANNING_WINDOW_HOURS)
            .iter()
            .map(|event| format!("- {event}"))
            .collect::<Vec<_>>();
        let calendar = if calendar.is_empty() {
            "No upcoming events".to_string()
        } else {
            calendar.join("\n")
        };
        let name = self.user.name.clone();
        let profile = self.user.profile.to_string();
        let prompt = self.prompts.render(
            prompts::GENERATE_TASKS,
            context! {
                name,
                profile,
                calendar,
                current_time => display_time(current_time),
            },
        )?;

        let response = self.gateway.query(&prompt).await;
        self.tasks = response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        self.notify(
            current_time,
            Channel::Notification,
            "Today's tasks:".to_string(),
        );
        for task in self.tasks.clone() {
            self.notify(current_time, Channel::Notification, format!("- {task}"));
        }
        Ok(())
    }

    fn require_running(&self, operation: &'static str) -> Result<(), SimulationError> {
        if self.state == DayState::Running {
            Ok(())
        } else {
            Err(SimulationError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn require_not_before_clock(&self, current_time: NaiveDateTime) -> Result<(), SimulationError> {
        match self.clock {
            Some(clock) if current_time < clock => Err(SimulationError::ClockRewind {
                from: clock,
                to: current_time,
            }),
            _ => Ok(()),
        }
    }

    fn notify(&mut self, at: NaiveDateTime, channel: Channel, message: String) {
        info!(time = %display_time(at), "[{}] {}", channel, message);
        self.notifications.push(Notification {
            at,
            channel,
            message,
        });
    }
}

fn display_time(at: NaiveDateTime) -> String {
    at.format(DISPLAY_TIME_FORMAT).to_string()
}
