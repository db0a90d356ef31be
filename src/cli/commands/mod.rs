//! CLI command implementations.

mod config;
mod doctor;
mod poll;
mod serve;
mod transcribe;
mod webhook;

pub use config::run_config;
pub use doctor::run_doctor;
pub use poll::run_poll;
pub use serve::run_serve;
pub use transcribe::run_transcribe;
pub use webhook::run_set_webhook;
