//! Configuration module for Skriv.
//!
//! Handles loading settings from the TOML config file and the environment.

mod settings;

pub use settings::{
    DeliverySettings, GeneralSettings, ServerSettings, Settings, TelegramSettings,
    TranscriptionSettings,
};
