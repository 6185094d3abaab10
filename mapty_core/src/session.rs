//! Session controller.
//!
//! Drives startup (position, map, restore) and the create-workout flow as
//! an explicit state machine:
//!
//! ```text
//! AwaitingPosition -> MapReady -> Idle <-> FormOpen
//!          \                 \
//!           +-----------------+--> Degraded (no map, list only)
//! ```
//!
//! Map clicks, form events and list clicks are delivered by the host
//! calling the matching `handle_*` / `submit` / `cancel` methods.

use crate::persistence::WorkoutRepository;
use crate::storage::KeyValueStore;
use crate::store::WorkoutStore;
use crate::validation::{parse_finite, parse_positive};
use crate::view::{MapViewport, ViewSynchronizer, WorkoutList};
use crate::{
    Coordinates, Error, FormField, Result, ValidationError, Workout, WorkoutId, WorkoutKind,
};
use chrono::{DateTime, Utc};

/// Current position capability
pub trait Geolocation {
    fn current_position(&mut self) -> Result<Coordinates>;
}

/// Raw values as typed into the workout form
#[derive(Clone, Debug, PartialEq)]
pub struct FormInput {
    pub kind: WorkoutKind,
    pub distance: String,
    pub duration: String,
    pub cadence: String,
    pub elevation: String,
}

/// Workout form capability
pub trait WorkoutForm {
    fn read(&self) -> FormInput;
    fn show(&mut self);
    fn focus_distance(&mut self);

    /// Show cadence for running, elevation for cycling
    fn show_kind_fields(&mut self, kind: WorkoutKind);

    /// Clear every field and select running
    fn reset(&mut self);
    fn hide(&mut self);
    fn report_error(&mut self, error: &ValidationError);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionState {
    AwaitingPosition,
    MapReady,
    Idle,
    /// Form shown; `pending` is where the map was clicked
    FormOpen { pending: Coordinates },
    /// Startup could not open the map; restored workouts are listed only
    Degraded,
}

/// Tunables for a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    pub zoom: u8,
    pub pan_duration_secs: f64,
    pub geolocation_attempts: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            zoom: 13,
            pan_duration_secs: 1.4,
            geolocation_attempts: 3,
        }
    }
}

/// What startup achieved
#[derive(Clone, Debug, PartialEq)]
pub struct StartupReport {
    pub center: Option<Coordinates>,
    pub restored: usize,
    pub skipped: usize,
    /// Why the map is unavailable, if it is
    pub degraded: Option<String>,
}

/// Result of submitting the form
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    Created { id: WorkoutId, persisted: bool },
    Rejected(ValidationError),
    /// Submit arrived while no form was open
    Ignored,
}

/// Validate form input and build the workout it describes
///
/// Distance, duration and cadence must be positive; elevation only has to
/// be a finite number since a ride can end lower than it started.
pub fn build_workout(
    input: &FormInput,
    coordinates: Coordinates,
    now: DateTime<Utc>,
) -> std::result::Result<Workout, ValidationError> {
    let distance = parse_positive(FormField::Distance, &input.distance)?;
    let duration = parse_positive(FormField::Duration, &input.duration)?;

    let workout = match input.kind {
        WorkoutKind::Running => {
            let cadence = parse_positive(FormField::Cadence, &input.cadence)?;
            Workout::running(coordinates, distance, duration, cadence, now)
        }
        WorkoutKind::Cycling => {
            let elevation = parse_finite(FormField::Elevation, &input.elevation)?;
            Workout::cycling(coordinates, distance, duration, elevation, now)
        }
    };

    Ok(workout)
}

/// Orchestrates the store, persistence and views for one session
pub struct Session<S, M, L> {
    state: SessionState,
    options: SessionOptions,
    store: WorkoutStore,
    repository: WorkoutRepository<S>,
    views: ViewSynchronizer,
    map: M,
    list: L,
}

impl<S, M, L> Session<S, M, L>
where
    S: KeyValueStore,
    M: MapViewport,
    L: WorkoutList,
{
    pub fn new(repository: WorkoutRepository<S>, map: M, list: L, options: SessionOptions) -> Self {
        Self {
            state: SessionState::AwaitingPosition,
            options,
            store: WorkoutStore::new(),
            repository,
            views: ViewSynchronizer::new(options.zoom, options.pan_duration_secs),
            map,
            list,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub fn repository(&self) -> &WorkoutRepository<S> {
        &self.repository
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn list(&self) -> &L {
        &self.list
    }

    /// Run startup: acquire position, open the map, restore workouts
    ///
    /// Position and map failures are logged and leave the session
    /// `Degraded`; restored workouts are still listed.
    pub fn start<G: Geolocation>(&mut self, geolocation: &mut G) -> Result<StartupReport> {
        if self.state != SessionState::AwaitingPosition {
            return Err(Error::Other(format!(
                "session already started (state {:?})",
                self.state
            )));
        }

        let (center, degraded) = match self.open_map(geolocation) {
            Ok(center) => {
                self.state = SessionState::MapReady;
                (Some(center), None)
            }
            Err(e) => {
                tracing::error!("Map unavailable, continuing without it: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let (restored, skipped) = self.restore();

        self.state = if degraded.is_none() {
            SessionState::Idle
        } else {
            SessionState::Degraded
        };

        Ok(StartupReport {
            center,
            restored,
            skipped,
            degraded,
        })
    }

    fn open_map<G: Geolocation>(&mut self, geolocation: &mut G) -> Result<Coordinates> {
        let center = self.acquire_position(geolocation)?;
        self.map
            .initialize(center, self.options.zoom)
            .map_err(|e| match e {
                Error::MapInit(_) => e,
                other => Error::MapInit(other.to_string()),
            })?;
        tracing::info!("Map ready at {}", center);
        Ok(center)
    }

    /// Bounded retry around the geolocation capability
    fn acquire_position<G: Geolocation>(&self, geolocation: &mut G) -> Result<Coordinates> {
        let attempts = self.options.geolocation_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match geolocation.current_position() {
                Ok(position) => return Ok(position),
                Err(e) => {
                    tracing::warn!("Position attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(Error::Geolocation(reason)) => Error::Geolocation(reason),
            Some(other) => Error::Geolocation(other.to_string()),
            None => Error::Geolocation("no attempts made".into()),
        })
    }

    /// Load persisted workouts into the store and render them
    fn restore(&mut self) -> (usize, usize) {
        let report = self.repository.load_all();
        let skipped = report.skipped.len();
        let map_ready = self.state == SessionState::MapReady;
        let mut restored = 0;

        for workout in report.workouts {
            let id = workout.id().clone();
            if let Err(e) = self.store.append(workout) {
                tracing::warn!("Not restoring {}: {}", id, e);
                continue;
            }
            restored += 1;

            if let Some(workout) = self.store.find_by_id(&id) {
                let map = map_ready.then_some(&mut self.map);
                if let Err(e) = self.views.render(workout, &mut self.list, map) {
                    tracing::warn!("Failed to draw marker for {}: {}", id, e);
                }
            }
        }

        (restored, skipped)
    }

    /// A click on the map opens the form at that point
    ///
    /// Returns false if the map is not accepting clicks.
    pub fn handle_map_click<F: WorkoutForm>(&mut self, form: &mut F, at: Coordinates) -> bool {
        match self.state {
            SessionState::Idle | SessionState::FormOpen { .. } => {
                self.state = SessionState::FormOpen { pending: at };
                form.show();
                form.focus_distance();
                tracing::debug!("Form opened at {}", at);
                true
            }
            state => {
                tracing::debug!("Ignoring map click in state {:?}", state);
                false
            }
        }
    }

    /// The workout type was changed on the open form
    pub fn change_kind<F: WorkoutForm>(&mut self, form: &mut F, kind: WorkoutKind) {
        if let SessionState::FormOpen { .. } = self.state {
            form.show_kind_fields(kind);
        }
    }

    /// Submit the open form
    ///
    /// Invalid input is reported to the form and leaves it open. A valid
    /// workout is stored, rendered, persisted, and the form is closed.
    /// Marker and persistence failures are logged; the latter shows up as
    /// `persisted: false`. Either way the workout stays in the session.
    pub fn submit<F: WorkoutForm>(
        &mut self,
        form: &mut F,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let SessionState::FormOpen { pending } = self.state else {
            tracing::debug!("Ignoring submit in state {:?}", self.state);
            return Ok(SubmitOutcome::Ignored);
        };

        let workout = match build_workout(&form.read(), pending, now) {
            Ok(workout) => workout,
            Err(e) => {
                tracing::info!("Rejected workout input: {}", e);
                form.report_error(&e);
                return Ok(SubmitOutcome::Rejected(e));
            }
        };

        let id = workout.id().clone();
        self.store.append(workout)?;

        let mut persisted = false;
        if let Some(workout) = self.store.find_by_id(&id) {
            // The workout is already in the store; a missing marker must not
            // keep it from being saved
            if let Err(e) = self.views.render(workout, &mut self.list, Some(&mut self.map)) {
                tracing::warn!("Failed to draw marker for {}: {}", id, e);
            }

            persisted = match self.repository.save(workout) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Failed to persist workout {}: {}", id, e);
                    false
                }
            };
        }

        form.reset();
        form.hide();
        self.state = SessionState::Idle;

        tracing::info!("Logged workout {}", id);
        Ok(SubmitOutcome::Created { id, persisted })
    }

    /// Close the form without creating anything
    pub fn cancel<F: WorkoutForm>(&mut self, form: &mut F) {
        if let SessionState::FormOpen { .. } = self.state {
            form.reset();
            form.hide();
            self.state = SessionState::Idle;
        }
    }

    /// A click on the workout list recentres the map on that workout
    pub fn handle_list_click(&mut self, clicked: Option<&WorkoutId>) -> Option<Coordinates> {
        if matches!(
            self.state,
            SessionState::AwaitingPosition | SessionState::MapReady | SessionState::Degraded
        ) {
            tracing::debug!("Ignoring list click in state {:?}", self.state);
            return None;
        }

        match self.views.focus(&self.store, &mut self.map, clicked) {
            Ok(center) => center,
            Err(e) => {
                tracing::warn!("Failed to move map: {}", e);
                None
            }
        }
    }
}
