pub mod config;
pub mod device_data;
pub mod error;
pub mod llm_client;
pub mod prompts;
pub mod simulator;
pub mod user_data;

pub use config::{HistoryPolicy, SimulationConfig};
pub use error::{DataError, SimulationError};
pub use simulator::{DaySimulator, DaySummary};
