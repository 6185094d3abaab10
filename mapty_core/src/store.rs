//! In-memory workout store.
//!
//! The store is the single source of truth during a session. Workouts are
//! kept in insertion order; an id index gives constant-time lookup for
//! resolving list clicks.

use crate::{Error, Result, Workout, WorkoutId};
use std::collections::HashMap;

/// Ordered collection of the workouts active in this session
#[derive(Debug, Default)]
pub struct WorkoutStore {
    workouts: Vec<Workout>,
    by_id: HashMap<WorkoutId, usize>,
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a workout to the end of the store
    ///
    /// Fails if a workout with the same id is already present.
    pub fn append(&mut self, workout: Workout) -> Result<()> {
        if self.by_id.contains_key(workout.id()) {
            return Err(Error::DuplicateWorkout(workout.id().to_string()));
        }

        self.by_id.insert(workout.id().clone(), self.workouts.len());
        tracing::debug!("Stored workout {} ({})", workout.id(), workout.kind());
        self.workouts.push(workout);
        Ok(())
    }

    /// Iterate workouts in insertion order
    pub fn all(&self) -> impl Iterator<Item = &Workout> + '_ {
        self.workouts.iter()
    }

    pub fn find_by_id(&self, id: &WorkoutId) -> Option<&Workout> {
        self.by_id.get(id).map(|&idx| &self.workouts[idx])
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}
