#![forbid(unsafe_code)]

//! Core domain model and session logic for Mapty, a map-based workout log.
//!
//! This crate provides:
//! - Domain types (coordinates, running and cycling workouts)
//! - The in-memory workout store
//! - Persistence over a key-value store (in memory or a locked JSON file)
//! - List and marker views, and the session state machine tying them together
//! - Configuration, logging and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod validation;
pub mod storage;
pub mod persistence;
pub mod store;
pub mod view;
pub mod session;
pub mod export;

// Re-export commonly used types
pub use error::{Error, FormField, Result, ValidationError};
pub use types::*;
pub use config::Config;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use persistence::{RestoreReport, WorkoutRepository};
pub use store::WorkoutStore;
pub use view::{ListEntry, MapViewport, MarkerView, PanOptions, ViewSynchronizer, WorkoutList};
pub use session::{
    FormInput, Geolocation, Session, SessionOptions, SessionState, StartupReport, SubmitOutcome,
    WorkoutForm,
};
pub use export::export_csv;
