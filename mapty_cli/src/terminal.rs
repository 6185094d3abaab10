//! Terminal stand-ins for the map, list, form and position sources.

use mapty_core::config::MapConfig;
use mapty_core::{
    Coordinates, Error, FormInput, Geolocation, ListEntry, MapViewport, MarkerView, PanOptions,
    Result, ValidationError, WorkoutForm, WorkoutKind, WorkoutList,
};

/// Position from `--position` or the configured home
pub struct ConfiguredPosition {
    position: Option<Coordinates>,
}

impl ConfiguredPosition {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

impl Geolocation for ConfiguredPosition {
    fn current_position(&mut self) -> Result<Coordinates> {
        self.position.ok_or_else(|| {
            Error::Geolocation("no position; pass --position or set [geolocation] home".into())
        })
    }
}

/// Map that describes what it would draw
pub struct TerminalMap {
    tile_url: String,
    attribution: String,
    lines: Vec<String>,
}

impl TerminalMap {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            tile_url: config.tile_url.clone(),
            attribution: config.attribution.clone(),
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl MapViewport for TerminalMap {
    fn initialize(&mut self, center: Coordinates, zoom: u8) -> Result<()> {
        let has_placeholders = ["{z}", "{x}", "{y}"]
            .into_iter()
            .all(|p| self.tile_url.contains(p));
        if !has_placeholders {
            return Err(Error::MapInit(format!(
                "tile url {} needs {{z}}, {{x}} and {{y}} placeholders",
                self.tile_url
            )));
        }

        tracing::debug!(
            "Map at {} zoom {} using {} ({})",
            center,
            zoom,
            self.tile_url,
            self.attribution
        );
        Ok(())
    }

    fn place_marker(&mut self, marker: &MarkerView) -> Result<()> {
        self.lines
            .push(format!("📍 {}  {}", marker.coordinates, marker.label));
        Ok(())
    }

    fn recenter(&mut self, center: Coordinates, zoom: u8, pan: PanOptions) -> Result<()> {
        self.lines.push(format!(
            "Map centred on {} (zoom {}, {:.1}s pan)",
            center, zoom, pan.duration_secs
        ));
        Ok(())
    }
}

/// Workout list, newest entry first
#[derive(Default)]
pub struct TerminalList {
    entries: Vec<ListEntry>,
}

impl TerminalList {
    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }
}

impl WorkoutList for TerminalList {
    fn show_entry(&mut self, entry: ListEntry) {
        self.entries.insert(0, entry);
    }
}

/// Form filled from command-line arguments
pub struct ArgsForm {
    input: FormInput,
}

impl ArgsForm {
    pub fn new(input: FormInput) -> Self {
        Self { input }
    }
}

impl WorkoutForm for ArgsForm {
    fn read(&self) -> FormInput {
        self.input.clone()
    }

    fn show(&mut self) {}

    fn focus_distance(&mut self) {}

    fn show_kind_fields(&mut self, kind: WorkoutKind) {
        tracing::debug!("Form fields switched to {}", kind);
    }

    fn reset(&mut self) {
        self.input = FormInput {
            kind: WorkoutKind::Running,
            distance: String::new(),
            duration: String::new(),
            cadence: String::new(),
            elevation: String::new(),
        };
    }

    fn hide(&mut self) {}

    fn report_error(&mut self, error: &ValidationError) {
        eprintln!("Invalid input: {}", error);
    }
}
