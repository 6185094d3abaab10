//! Workout views: list entries, map markers, and list-click focusing.
//!
//! Both renderings are pure functions of a workout. The synchronizer
//! pushes them into the injected list and map collaborators and turns a
//! click on a list entry back into a viewport move.

use crate::store::WorkoutStore;
use crate::{Coordinates, Result, Workout, WorkoutDetails, WorkoutId, WorkoutKind};
use std::fmt;

/// Animation settings for a viewport move
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanOptions {
    pub animate: bool,
    pub duration_secs: f64,
}

/// Popup settings attached to each marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopupOptions {
    pub max_width: u32,
    pub min_width: u32,
    pub auto_close: bool,
    pub close_on_click: bool,
}

impl Default for PopupOptions {
    fn default() -> Self {
        Self {
            max_width: 400,
            min_width: 100,
            auto_close: false,
            close_on_click: false,
        }
    }
}

/// Map capability used by the views and the session
pub trait MapViewport {
    /// Create the map centred on `center`
    fn initialize(&mut self, center: Coordinates, zoom: u8) -> Result<()>;

    fn place_marker(&mut self, marker: &MarkerView) -> Result<()>;

    fn recenter(&mut self, center: Coordinates, zoom: u8, pan: PanOptions) -> Result<()>;
}

/// Workout list capability
pub trait WorkoutList {
    /// Show a new entry; where it goes (top, bottom) is up to the list
    fn show_entry(&mut self, entry: ListEntry);
}

/// One line of detail in a list entry
#[derive(Clone, Debug, PartialEq)]
pub struct Detail {
    pub icon: &'static str,
    pub value: String,
    pub unit: &'static str,
}

impl Detail {
    fn new(icon: &'static str, value: String, unit: &'static str) -> Self {
        Self { icon, value, unit }
    }
}

/// Rendered list entry, tagged with the workout id
#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub id: WorkoutId,
    pub kind: WorkoutKind,
    pub title: String,
    pub details: Vec<Detail>,
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  [{}]", self.title, self.id)?;
        for detail in &self.details {
            write!(f, "\n    {} {} {}", detail.icon, detail.value, detail.unit)?;
        }
        Ok(())
    }
}

/// Rendered map marker
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerView {
    pub id: WorkoutId,
    pub coordinates: Coordinates,
    pub label: String,
    pub class_name: String,
    pub popup: PopupOptions,
}

/// Build the list entry for a workout
pub fn list_entry(workout: &Workout) -> ListEntry {
    let icon = match workout.kind() {
        WorkoutKind::Running => "🏃",
        WorkoutKind::Cycling => "🚴",
    };

    let mut details = vec![
        Detail::new(icon, workout.distance_km().to_string(), "km"),
        Detail::new("⏱", workout.duration_min().to_string(), "min"),
    ];

    match workout.details() {
        WorkoutDetails::Running {
            cadence_spm,
            pace_min_per_km,
        } => {
            details.push(Detail::new("⚡", format!("{:.1}", pace_min_per_km), "min/km"));
            details.push(Detail::new("🦶", cadence_spm.to_string(), "spm"));
        }
        WorkoutDetails::Cycling {
            elevation_gain_m,
            speed_km_per_h,
        } => {
            details.push(Detail::new("⚡", format!("{:.1}", speed_km_per_h), "km/h"));
            details.push(Detail::new("⛰", elevation_gain_m.to_string(), "m"));
        }
    }

    ListEntry {
        id: workout.id().clone(),
        kind: workout.kind(),
        title: workout.label(),
        details,
    }
}

/// Build the map marker for a workout
pub fn marker(workout: &Workout) -> MarkerView {
    MarkerView {
        id: workout.id().clone(),
        coordinates: workout.coordinates(),
        label: workout.label(),
        class_name: format!("{}-popup", workout.kind()),
        popup: PopupOptions::default(),
    }
}

/// Keeps the list and map in step with the workout store
#[derive(Clone, Copy, Debug)]
pub struct ViewSynchronizer {
    zoom: u8,
    pan: PanOptions,
}

impl ViewSynchronizer {
    pub fn new(zoom: u8, pan_duration_secs: f64) -> Self {
        Self {
            zoom,
            pan: PanOptions {
                animate: true,
                duration_secs: pan_duration_secs,
            },
        }
    }

    /// Render a workout into the list, and onto the map when there is one
    pub fn render<L, M>(&self, workout: &Workout, list: &mut L, map: Option<&mut M>) -> Result<()>
    where
        L: WorkoutList,
        M: MapViewport,
    {
        list.show_entry(list_entry(workout));
        if let Some(map) = map {
            map.place_marker(&marker(workout))?;
        }
        Ok(())
    }

    /// Move the map to the workout behind a clicked list entry
    ///
    /// Returns the new centre, or `None` when the click did not resolve
    /// to a stored workout.
    pub fn focus<M: MapViewport>(
        &self,
        store: &WorkoutStore,
        map: &mut M,
        clicked: Option<&WorkoutId>,
    ) -> Result<Option<Coordinates>> {
        let Some(workout) = clicked.and_then(|id| store.find_by_id(id)) else {
            tracing::debug!("List click did not match a workout: {:?}", clicked);
            return Ok(None);
        };

        let center = workout.coordinates();
        map.recenter(center, self.zoom, self.pan)?;
        Ok(Some(center))
    }
}

impl Default for ViewSynchronizer {
    fn default() -> Self {
        Self::new(13, 1.4)
    }
}
