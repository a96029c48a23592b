#![deny(unsafe_code)]

//! Gemini-backed model service.
//!
//! Implements the engine's `ModelService` contract over the Google Gemini
//! API through rig, holding the multi-turn context on behalf of the session
//! so the engine never resends history.

mod service;
mod settings;

pub use service::GeminiService;
pub use settings::{
    DEFAULT_GEMINI_MODEL, GeminiSettings, SETTINGS_DIRECTORY_NAME, SETTINGS_FILE_NAME,
};
