pub mod config;
pub mod history;
pub mod intake;
pub mod output;
pub mod rating;
pub mod telemetry;
