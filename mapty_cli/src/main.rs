mod terminal;

use clap::{Parser, Subcommand};
use mapty_core::*;
use std::path::{Path, PathBuf};
use terminal::{ArgsForm, ConfiguredPosition, TerminalList, TerminalMap};

type TerminalSession = Session<FileStore, TerminalMap, TerminalList>;

#[derive(Parser)]
#[command(name = "mapty")]
#[command(about = "Map-based running and cycling log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Current position as "lat,lng" (defaults to [geolocation] home)
    #[arg(long, global = true, allow_hyphen_values = true)]
    position: Option<Coordinates>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a workout at a point on the map
    Log {
        /// Where on the map, as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        at: Coordinates,

        /// running or cycling
        #[arg(long, default_value = "running")]
        kind: WorkoutKind,

        /// Distance in km
        #[arg(long, allow_hyphen_values = true)]
        distance: String,

        /// Duration in minutes
        #[arg(long, allow_hyphen_values = true)]
        duration: String,

        /// Steps per minute (running)
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        cadence: String,

        /// Elevation gain in metres (cycling)
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        elevation: String,
    },

    /// List logged workouts, newest first
    List,

    /// Centre the map on a workout
    Show {
        /// Workout id as shown by `list`
        id: String,
    },

    /// Export all workouts to CSV
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        mapty_core::logging::init_with_level("debug");
    } else {
        mapty_core::logging::init();
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    config.validate()?;

    let position = match cli.position {
        Some(position) => Some(position),
        None => config.geolocation.home_position()?,
    };

    match cli.command {
        Commands::Log {
            at,
            kind,
            distance,
            duration,
            cadence,
            elevation,
        } => {
            let input = FormInput {
                kind,
                distance,
                duration,
                cadence,
                elevation,
            };
            cmd_log(&config, position, at, input)
        }
        Commands::List => cmd_list(&config, position),
        Commands::Show { id } => cmd_show(&config, position, WorkoutId::from(id)),
        Commands::Export { path } => cmd_export(&config, position, &path),
        Commands::Config => cmd_config(&config),
    }
}

/// Open storage and run session startup
fn open_session(config: &Config, position: Option<Coordinates>) -> Result<TerminalSession> {
    let store = FileStore::open(config.storage_path())?;
    let mut session = Session::new(
        WorkoutRepository::new(store),
        TerminalMap::new(&config.map),
        TerminalList::default(),
        config.session_options(),
    );

    let report = session.start(&mut ConfiguredPosition::new(position))?;
    if let Some(ref reason) = report.degraded {
        eprintln!("Map unavailable: {}", reason);
    }
    if report.skipped > 0 {
        eprintln!("Skipped {} unreadable stored entries", report.skipped);
    }

    Ok(session)
}

fn cmd_log(
    config: &Config,
    position: Option<Coordinates>,
    at: Coordinates,
    input: FormInput,
) -> Result<()> {
    let mut session = open_session(config, position)?;
    let mut form = ArgsForm::new(input.clone());

    if !session.handle_map_click(&mut form, at) {
        return Err(Error::MapInit("cannot place a workout without a map".into()));
    }
    session.change_kind(&mut form, input.kind);

    match session.submit(&mut form, chrono::Utc::now())? {
        SubmitOutcome::Created { id, persisted } => {
            if let Some(workout) = session.store().find_by_id(&id) {
                println!("{}", view::list_entry(workout));
            }
            if let Some(marker) = session.map().lines().last() {
                println!("{}", marker);
            }

            if !persisted {
                return Err(Error::Storage(format!(
                    "workout {} was logged but not fully saved; see the error above",
                    id
                )));
            }
            println!("\n✓ Workout logged!");
            Ok(())
        }
        SubmitOutcome::Rejected(e) => Err(Error::Validation(e)),
        SubmitOutcome::Ignored => Err(Error::Other("form was not open".into())),
    }
}

fn cmd_list(config: &Config, position: Option<Coordinates>) -> Result<()> {
    let session = open_session(config, position)?;

    if session.store().is_empty() {
        println!("No workouts logged yet.");
        return Ok(());
    }

    for entry in session.list().entries() {
        println!("{}", entry);
    }

    let markers = session.map().lines();
    if !markers.is_empty() {
        println!();
        for line in markers {
            println!("{}", line);
        }
    }

    Ok(())
}

fn cmd_show(config: &Config, position: Option<Coordinates>, id: WorkoutId) -> Result<()> {
    let mut session = open_session(config, position)?;

    if session.handle_list_click(Some(&id)).is_none() {
        return Err(Error::Other(format!("Cannot show workout {}", id)));
    }

    if let Some(workout) = session.store().find_by_id(&id) {
        println!("{}", view::list_entry(workout));
    }
    if let Some(line) = session.map().lines().last() {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_export(config: &Config, position: Option<Coordinates>, path: &Path) -> Result<()> {
    let session = open_session(config, position)?;

    let count = export_csv(session.store().all(), path)?;
    println!("✓ Exported {} workouts", count);
    println!("  CSV: {}", path.display());
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
