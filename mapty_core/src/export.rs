//! CSV export of logged workouts.

use crate::{Result, Workout, WorkoutDetails};
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    kind: String,
    created_at: String,
    lat: f64,
    lng: f64,
    distance_km: f64,
    duration_min: f64,
    pace_min_per_km: Option<f64>,
    speed_km_per_h: Option<f64>,
    cadence_spm: Option<f64>,
    elevation_gain_m: Option<f64>,
}

impl From<&Workout> for CsvRow {
    fn from(workout: &Workout) -> Self {
        let coords = workout.coordinates();
        let mut row = CsvRow {
            id: workout.id().to_string(),
            kind: workout.kind().to_string(),
            created_at: workout.created_at().to_rfc3339(),
            lat: coords.lat(),
            lng: coords.lng(),
            distance_km: workout.distance_km(),
            duration_min: workout.duration_min(),
            pace_min_per_km: None,
            speed_km_per_h: None,
            cadence_spm: None,
            elevation_gain_m: None,
        };

        match workout.details() {
            WorkoutDetails::Running {
                cadence_spm,
                pace_min_per_km,
            } => {
                row.cadence_spm = Some(*cadence_spm);
                row.pace_min_per_km = Some(*pace_min_per_km);
            }
            WorkoutDetails::Cycling {
                elevation_gain_m,
                speed_km_per_h,
            } => {
                row.elevation_gain_m = Some(*elevation_gain_m);
                row.speed_km_per_h = Some(*speed_km_per_h);
            }
        }

        row
    }
}

/// Write workouts to a CSV file, replacing any existing file
///
/// Returns the number of rows written. The file is synced to disk before
/// returning.
pub fn export_csv<'a>(
    workouts: impl IntoIterator<Item = &'a Workout>,
    path: &Path,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(&file);

    let mut count = 0;
    for workout in workouts {
        writer.serialize(CsvRow::from(workout))?;
        count += 1;
    }

    writer.flush()?;
    drop(writer);
    file.sync_all()?;

    tracing::info!("Exported {} workouts to {:?}", count, path);
    Ok(count)
}
