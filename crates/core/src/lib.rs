//! Core business logic for anitrack.

pub mod services;

pub use services::*;
