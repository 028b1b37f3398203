//! Simulation settings, fixed for the lifetime of a [`crate::simulator::DaySimulator`].

use crate::error::SimulationError;
use crate::llm_client::ModelConfig;
use chrono::NaiveTime;

/// What happens to the task list and recommendation log when a new day starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Keep everything from earlier runs of the same simulator.
    #[default]
    Accumulate,
    /// Clear both collections at the start of every day.
    ResetOnStart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub interval_minutes: u32,
    /// Hours of the day at which a recommendation is generated, on minute 0.
    pub recommendation_hours: Vec<u32>,
    pub model: ModelConfig,
    pub history: HistoryPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            end_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            interval_minutes: 30,
            recommendation_hours: vec![9, 12, 15, 18],
            model: ModelConfig::default(),
            history: HistoryPolicy::default(),
        }
    }
}

impl SimulationConfig {
    /// Rejects settings under which the day loop would never terminate or
    /// could never fire.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.interval_minutes == 0 {
            return Err(SimulationError::InvalidConfig(
                "interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.end_time < self.start_time {
            return Err(SimulationError::InvalidConfig(format!(
                "end time {} is before start time {}",
                self.end_time, self.start_time
            )));
        }
        if let Some(hour) = self.recommendation_hours.iter().find(|&&h| h > 23) {
            return Err(SimulationError::InvalidConfig(format!(
                "recommendation hour {hour} is out of range"
            )));
        }
        Ok(())
    }

    pub fn is_recommendation_hour(&self, hour: u32) -> bool {
        self.recommendation_hours.contains(&hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.start_time, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(config.end_time, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(config.interval_minutes, 30);
        assert_eq!(config.recommendation_hours, vec![9, 12, 15, 18]);
        assert_eq!(config.history, HistoryPolicy::Accumulate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = SimulationConfig {
            interval_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config = SimulationConfig {
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let config = SimulationConfig {
            recommendation_hours: vec![9, 24],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recommendation hour 24"));
    }

    #[test]
    fn test_is_recommendation_hour() {
        let config = SimulationConfig::default();
        assert!(config.is_recommendation_hour(12));
        assert!(!config.is_recommendation_hour(13));
    }
}
