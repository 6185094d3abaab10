//! Workout persistence on top of a key-value store.
//!
//! Each workout is stored as one JSON entry under its id. A separate index
//! entry holds the ids in creation order so that a restore returns
//! workouts in the order they were logged, whatever order the underlying
//! store enumerates keys in.
//!
//! Entries written by the original browser version of the app (no
//! `version` field, short field names) are read as schema version 0.

use crate::storage::KeyValueStore;
use crate::validation::{require_finite, require_positive};
use crate::{Coordinates, Error, FormField, Result, Workout, WorkoutDetails, WorkoutId, WorkoutKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved key holding the JSON array of workout ids in creation order
pub const INDEX_KEY: &str = "mapty:index";

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// On-disk representation of a workout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWorkout {
    #[serde(default)]
    version: u32,
    id: String,
    #[serde(alias = "date")]
    created_at: DateTime<Utc>,
    #[serde(alias = "cords")]
    coordinates: [f64; 2],
    #[serde(alias = "distance")]
    distance_km: f64,
    #[serde(alias = "duration")]
    duration_min: f64,
    #[serde(alias = "type")]
    kind: WorkoutKind,
    #[serde(default, alias = "cadence", skip_serializing_if = "Option::is_none")]
    cadence_spm: Option<f64>,
    #[serde(default, alias = "elevationGain", skip_serializing_if = "Option::is_none")]
    elevation_gain_m: Option<f64>,
    #[serde(default, alias = "clicks")]
    click_count: u32,
}

impl From<&Workout> for PersistedWorkout {
    fn from(workout: &Workout) -> Self {
        let coords = workout.coordinates();
        let (cadence_spm, elevation_gain_m) = match workout.details() {
            WorkoutDetails::Running { cadence_spm, .. } => (Some(*cadence_spm), None),
            WorkoutDetails::Cycling {
                elevation_gain_m, ..
            } => (None, Some(*elevation_gain_m)),
        };

        PersistedWorkout {
            version: SCHEMA_VERSION,
            id: workout.id().to_string(),
            created_at: workout.created_at(),
            coordinates: coords.into(),
            distance_km: workout.distance_km(),
            duration_min: workout.duration_min(),
            kind: workout.kind(),
            cadence_spm,
            elevation_gain_m,
            click_count: workout.click_count(),
        }
    }
}

impl TryFrom<PersistedWorkout> for Workout {
    type Error = Error;

    fn try_from(entry: PersistedWorkout) -> Result<Self> {
        if entry.version > SCHEMA_VERSION {
            return Err(Error::Other(format!(
                "schema version {} is newer than supported version {}",
                entry.version, SCHEMA_VERSION
            )));
        }

        let coordinates = Coordinates::try_from(entry.coordinates)?;
        let distance = require_positive(FormField::Distance, entry.distance_km)?;
        let duration = require_positive(FormField::Duration, entry.duration_min)?;
        let id = WorkoutId::from(entry.id);

        // Derived metrics are recomputed, never read back
        let workout = match entry.kind {
            WorkoutKind::Running => {
                let cadence = entry
                    .cadence_spm
                    .ok_or_else(|| Error::Other("running entry without cadence".into()))?;
                Workout::restore_running(
                    id,
                    entry.created_at,
                    coordinates,
                    distance,
                    duration,
                    require_positive(FormField::Cadence, cadence)?,
                    entry.click_count,
                )
            }
            WorkoutKind::Cycling => {
                let elevation = entry
                    .elevation_gain_m
                    .ok_or_else(|| Error::Other("cycling entry without elevation".into()))?;
                Workout::restore_cycling(
                    id,
                    entry.created_at,
                    coordinates,
                    distance,
                    duration,
                    require_finite(FormField::Elevation, elevation)?,
                    entry.click_count,
                )
            }
        };

        Ok(workout)
    }
}

/// Serialize a workout to its stored JSON form
pub fn encode(workout: &Workout) -> Result<String> {
    Ok(serde_json::to_string(&PersistedWorkout::from(workout))?)
}

/// Decode the entry stored under `key`
pub fn decode(key: &str, raw: &str) -> Result<Workout> {
    let corrupt = |reason: String| Error::StorageCorruption {
        key: key.to_string(),
        reason,
    };

    let entry: PersistedWorkout = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    if entry.id != key {
        return Err(corrupt(format!("entry id {} does not match its key", entry.id)));
    }

    Workout::try_from(entry).map_err(|e| corrupt(e.to_string()))
}

/// An entry that could not be restored
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

/// Result of reading every persisted workout
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub workouts: Vec<Workout>,
    pub skipped: Vec<SkippedEntry>,
}

impl RestoreReport {
    fn skip(&mut self, key: String, reason: String) {
        tracing::warn!("Skipping stored entry {}: {}", key, reason);
        self.skipped.push(SkippedEntry { key, reason });
    }
}

/// Saves and restores workouts through a key-value store
#[derive(Debug)]
pub struct WorkoutRepository<S> {
    store: S,
}

impl<S: KeyValueStore> WorkoutRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a workout under its id and record it in the index
    ///
    /// The record is written first. If only the index update fails, the
    /// error says so: the workout is still restored, after the indexed ones.
    pub fn save(&mut self, workout: &Workout) -> Result<()> {
        let id = workout.id().as_str();
        self.store.set(id, &encode(workout)?)?;

        self.append_to_index(id).map_err(|e| {
            Error::Storage(format!(
                "workout {} was stored but the restore order index was not updated: {}",
                id, e
            ))
        })?;

        tracing::debug!("Persisted workout {}", id);
        Ok(())
    }

    fn append_to_index(&mut self, id: &str) -> Result<()> {
        // Without a usable index, seed it from what is already stored so
        // older entries keep their place ahead of the new one.
        let mut ids = match self.read_index()? {
            Some(ids) => ids,
            None => self
                .storage_keys()?
                .into_iter()
                .filter(|key| key != id)
                .collect(),
        };

        if !ids.iter().any(|key| key == id) {
            ids.push(id.to_string());
            self.store.set(INDEX_KEY, &serde_json::to_string(&ids)?)?;
        }
        Ok(())
    }

    /// Read back every stored workout
    ///
    /// Indexed ids come first in creation order, followed by any stored
    /// entries the index does not know about, in storage order. Entries
    /// that cannot be read or decoded are skipped and reported.
    pub fn load_all(&self) -> RestoreReport {
        let mut report = RestoreReport::default();

        let keys = match self.restore_order() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Storage unavailable, nothing restored: {}", e);
                return report;
            }
        };

        for key in keys {
            let raw = match self.store.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    report.skip(key, "listed in index but not stored".into());
                    continue;
                }
                Err(e) => {
                    report.skip(key, e.to_string());
                    continue;
                }
            };

            match decode(&key, &raw) {
                Ok(workout) => report.workouts.push(workout),
                Err(e) => report.skip(key, e.to_string()),
            }
        }

        tracing::info!(
            "Restored {} workouts ({} skipped)",
            report.workouts.len(),
            report.skipped.len()
        );
        report
    }

    fn restore_order(&self) -> Result<Vec<String>> {
        let indexed = self.read_index()?.unwrap_or_default();
        let stored = self.storage_keys()?;

        let mut seen = HashSet::new();
        Ok(indexed
            .into_iter()
            .chain(stored)
            .filter(|key| seen.insert(key.clone()))
            .collect())
    }

    /// Ids from the index entry; `None` if missing or unreadable
    fn read_index(&self) -> Result<Option<Vec<String>>> {
        let Some(raw) = self.store.get(INDEX_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(Some(ids)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable workout index: {}", e);
                Ok(None)
            }
        }
    }

    /// All keys except the index, in storage iteration order
    fn storage_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for i in 0..self.store.len()? {
            if let Some(key) = self.store.key_at(i)? {
                if key != INDEX_KEY {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 7, 15, 0).unwrap()
    }

    fn coords() -> Coordinates {
        Coordinates::new(39.74, -104.99).unwrap()
    }

    fn running() -> Workout {
        Workout::running(coords(), 5.0, 30.0, 150.0, at())
    }

    fn cycling() -> Workout {
        Workout::cycling(coords(), 20.0, 60.0, -35.0, at())
    }

    #[test]
    fn test_roundtrip_both_variants() {
        let mut repo = WorkoutRepository::new(MemoryStore::new());
        let (run, ride) = (running(), cycling());
        repo.save(&run).unwrap();
        repo.save(&ride).unwrap();

        let report = repo.load_all();
        assert!(report.skipped.is_empty());
        assert_eq!(report.workouts, vec![run, ride]);
    }

    #[test]
    fn test_corrupted_entry_skipped() {
        let mut repo = WorkoutRepository::new(MemoryStore::new());
        let run = running();
        repo.save(&run).unwrap();

        let mut store = repo.store().clone();
        store.set("broken", "{ this is not json").unwrap();
        let repo = WorkoutRepository::new(store);

        let report = repo.load_all();
        assert_eq!(report.workouts, vec![run]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].key, "broken");
    }

    #[test]
    fn test_invalid_values_skipped() {
        let mut store = MemoryStore::new();
        store
            .set(
                "neg",
                r#"{"version":1,"id":"neg","createdAt":"2024-06-01T07:15:00Z","coordinates":[1.0,2.0],"distanceKm":-5.0,"durationMin":30.0,"kind":"running","cadenceSpm":150.0}"#,
            )
            .unwrap();
        store
            .set(
                "nocadence",
                r#"{"version":1,"id":"nocadence","createdAt":"2024-06-01T07:15:00Z","coordinates":[1.0,2.0],"distanceKm":5.0,"durationMin":30.0,"kind":"running"}"#,
            )
            .unwrap();
        store
            .set(
                "future",
                r#"{"version":99,"id":"future","createdAt":"2024-06-01T07:15:00Z","coordinates":[1.0,2.0],"distanceKm":5.0,"durationMin":30.0,"kind":"cycling","elevationGainM":10.0}"#,
            )
            .unwrap();

        let report = WorkoutRepository::new(store).load_all();
        assert!(report.workouts.is_empty());
        assert_eq!(report.skipped.len(), 3);
    }

    #[test]
    fn test_stale_cached_metric_is_recomputed() {
        // Legacy browser entry with a wrong cached pace
        let raw = r#"{"id":"1717225200","date":"2024-06-01T07:15:00.000Z","options":{"year":"numeric","month":"long"},"clicks":0,"cords":[39.74,-104.99],"distance":5,"duration":30,"type":"running","cadence":150,"pace":99}"#;
        let workout = decode("1717225200", raw).unwrap();

        assert_eq!(workout.id().as_str(), "1717225200");
        assert_eq!(workout.kind(), WorkoutKind::Running);
        assert_eq!(workout.created_at(), at());
        match workout.details() {
            WorkoutDetails::Running {
                pace_min_per_km,
                cadence_spm,
            } => {
                assert!((pace_min_per_km - 6.0).abs() < 1e-12);
                assert_eq!(*cadence_spm, 150.0);
            }
            other => panic!("expected running, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_cycling_entry() {
        let raw = r#"{"id":"1717225201","date":"2024-06-01T07:15:00.000Z","clicks":0,"cords":[39.74,-104.99],"distance":20,"duration":60,"type":"cycling","elevationGain":150,"speed":20}"#;
        let workout = decode("1717225201", raw).unwrap();
        match workout.details() {
            WorkoutDetails::Cycling {
                speed_km_per_h,
                elevation_gain_m,
            } => {
                assert!((speed_km_per_h - 20.0).abs() < 1e-12);
                assert_eq!(*elevation_gain_m, 150.0);
            }
            other => panic!("expected cycling, got {:?}", other),
        }
    }

    #[test]
    fn test_key_mismatch_is_corruption() {
        let raw = encode(&running()).unwrap();
        let err = decode("some-other-key", &raw).unwrap_err();
        assert!(matches!(err, Error::StorageCorruption { .. }));
    }

    #[test]
    fn test_restore_follows_creation_order_not_storage_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workouts.json");

        let mut repo = WorkoutRepository::new(FileStore::open(&path).unwrap());
        let mut expected = Vec::new();
        for distance in [3.0, 1.0, 4.0, 1.5, 9.0] {
            let w = Workout::running(coords(), distance, 20.0, 170.0, at());
            repo.save(&w).unwrap();
            expected.push(w.id().clone());
        }

        // FileStore enumerates keys sorted, which for random ids differs
        // from creation order in general
        let repo = WorkoutRepository::new(FileStore::open(&path).unwrap());
        let restored: Vec<_> = repo
            .load_all()
            .workouts
            .iter()
            .map(|w| w.id().clone())
            .collect();
        assert_eq!(restored, expected);
    }

    #[test]
    fn test_unindexed_entries_follow_indexed_ones() {
        let mut store = MemoryStore::new();
        let legacy = running();
        store.set(legacy.id().as_str(), &encode(&legacy).unwrap()).unwrap();

        let mut repo = WorkoutRepository::new(store);
        let fresh = cycling();
        repo.save(&fresh).unwrap();

        // The index was seeded with the legacy entry before the new one
        let index: Vec<String> =
            serde_json::from_str(&repo.store().get(INDEX_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(
            index,
            vec![legacy.id().to_string(), fresh.id().to_string()]
        );

        let restored = repo.load_all().workouts;
        assert_eq!(restored, vec![legacy, fresh]);
    }

    #[test]
    fn test_save_is_idempotent_for_index() {
        let mut repo = WorkoutRepository::new(MemoryStore::new());
        let run = running();
        repo.save(&run).unwrap();
        repo.save(&run).unwrap();

        let report = repo.load_all();
        assert_eq!(report.workouts.len(), 1);
    }

    #[test]
    fn test_corrupt_index_falls_back_to_storage_order() {
        let mut repo = WorkoutRepository::new(MemoryStore::new());
        let (run, ride) = (running(), cycling());
        repo.save(&run).unwrap();
        repo.save(&ride).unwrap();

        let mut store = repo.store().clone();
        store.set(INDEX_KEY, "not an index").unwrap();

        let report = WorkoutRepository::new(store).load_all();
        assert_eq!(report.workouts, vec![run, ride]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_index_entry_without_record() {
        let mut store = MemoryStore::new();
        store.set(INDEX_KEY, r#"["ghost"]"#).unwrap();

        let report = WorkoutRepository::new(store).load_all();
        assert!(report.workouts.is_empty());
        assert_eq!(report.skipped[0].key, "ghost");
    }

    /// Memory store that refuses to write the index
    #[derive(Default)]
    struct IndexRejectingStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for IndexRejectingStore {
        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if key == INDEX_KEY {
                return Err(Error::Storage("quota exceeded".into()));
            }
            self.inner.set(key, value)
        }

        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn len(&self) -> Result<usize> {
            self.inner.len()
        }

        fn key_at(&self, index: usize) -> Result<Option<String>> {
            self.inner.key_at(index)
        }
    }

    #[test]
    fn test_index_failure_reports_record_was_stored() {
        let mut repo = WorkoutRepository::new(IndexRejectingStore::default());
        let run = running();

        let err = repo.save(&run).unwrap_err().to_string();
        assert!(err.contains("was stored"), "unexpected error: {}", err);
        assert!(err.contains("quota exceeded"));

        // Restored as an unindexed entry
        assert_eq!(repo.load_all().workouts, vec![run]);
    }
}
