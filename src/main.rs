use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ifc_verifier::completeness::audit;
use ifc_verifier::export::{
    export_aggregate_csv, export_audit_csv, export_evaluation_csv, export_filter_csv, export_json, ExportError,
};
use ifc_verifier::filter::run_filter;
use ifc_verifier::loader::{load_checks, load_filter, load_grouping_rules, load_scene, load_specifications};
use ifc_verifier::{Aggregator, Config, Evaluator, SceneGraph, TextMatcher};

#[derive(Parser, Debug)]
#[command(name = "ifc-verifier")]
#[command(about = "IFC Verifier - check, filter and aggregate BIM element metadata")]
#[command(version)]
struct Args {
    /// Path to the scene JSON (element list or metadata model)
    #[arg(required = true)]
    scene: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// Export to CSV (optional output path)
    #[arg(long, value_name = "FILE", global = true)]
    csv: Option<PathBuf>,

    /// Export to JSON (optional output path)
    #[arg(long, value_name = "FILE", global = true)]
    json: Option<PathBuf>,

    /// Compare names and values without folding case
    #[arg(long, global = true)]
    case_sensitive: bool,

    /// Evaluate elements in parallel
    #[arg(long, global = true)]
    parallel: bool,

    /// Abort evaluation after this many seconds and keep the partial result
    #[arg(long, value_name = "SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Fail requirements using an unknown operator instead of using equals
    #[arg(long, global = true)]
    strict_operators: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate specifications (native JSON or IDS) against the scene
    Check {
        #[arg(long, value_name = "FILE")]
        specs: PathBuf,
    },
    /// Group elements by building, storey and code
    Aggregate {
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,
    },
    /// Select elements with a filter descriptor
    Filter {
        #[arg(long, value_name = "FILE")]
        descriptor: PathBuf,
    },
    /// Audit property completeness
    Audit {
        #[arg(long, value_name = "FILE")]
        checks: PathBuf,
    },
    /// List spatial elements
    List {
        #[arg(value_enum)]
        kind: ListKind,
        /// Restrict to children of this element (space id for `objects`)
        #[arg(long)]
        parent: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ListKind {
    Buildings,
    Storeys,
    Spaces,
    Objects,
}

impl Args {
    /// Environment settings overridden by command-line flags.
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        config.case_sensitive |= self.case_sensitive;
        config.parallel |= self.parallel;
        config.strict_operators |= self.strict_operators;
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        config
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();
    tracing::debug!(?config, "configuration");

    let scene = load_scene(&args.scene)?;

    match &args.command {
        Command::Check { specs } => {
            let specifications = load_specifications(specs)?;
            let results = Evaluator::new(&config).evaluate_all(&specifications, scene.elements());
            emit(&args, &results, |path| export_evaluation_csv(&results, path))?;
        }
        Command::Aggregate { rules } => {
            let rules = load_grouping_rules(rules)?;
            let report = Aggregator::new(&config).aggregate(&scene, &rules);
            emit(&args, &report, |path| export_aggregate_csv(&report, path))?;
        }
        Command::Filter { descriptor } => {
            let descriptor = load_filter(descriptor)?;
            let result = run_filter(&scene, &descriptor, &Evaluator::new(&config));
            emit(&args, &result, |path| export_filter_csv(&result, path))?;
        }
        Command::Audit { checks } => {
            let checks = load_checks(checks)?;
            let report = audit(scene.elements(), &checks, TextMatcher::new(config.case_sensitive));
            emit(&args, &report, |path| export_audit_csv(&report, path))?;
        }
        Command::List { kind, parent } => list(&args, &scene, *kind, parent.as_deref())?,
    }

    Ok(())
}

fn list(args: &Args, scene: &SceneGraph, kind: ListKind, parent: Option<&str>) -> Result<()> {
    match kind {
        ListKind::Buildings => print_or_export(args, &scene.buildings()),
        ListKind::Storeys => print_or_export(args, &scene.storeys(parent)),
        ListKind::Spaces => print_or_export(args, &scene.spaces(parent)),
        ListKind::Objects => {
            let space = parent.ok_or_else(|| color_eyre::eyre::eyre!("`list objects` needs --parent <SPACE_ID>"))?;
            let contained = scene
                .contained_objects(space)
                .ok_or_else(|| color_eyre::eyre::eyre!("no element with id '{space}'"))?;
            print_or_export(args, &contained)
        }
    }
}

fn print_or_export<T: Serialize + ?Sized>(args: &Args, value: &T) -> Result<()> {
    if args.csv.is_some() {
        tracing::warn!("CSV export is not available for listings, ignoring --csv");
    }
    match &args.json {
        Some(json_path) => {
            export_json(value, json_path)?;
            println!("Exported to JSON: {}", json_path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Writes the requested exports, or pretty JSON on stdout when none is asked.
fn emit<T, F>(args: &Args, value: &T, csv: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&Path) -> std::result::Result<(), ExportError>,
{
    if let Some(csv_path) = &args.csv {
        csv(csv_path.as_path())?;
        println!("Exported to CSV: {}", csv_path.display());
    }

    if let Some(json_path) = &args.json {
        export_json(value, json_path)?;
        println!("Exported to JSON: {}", json_path.display());
    }

    if args.csv.is_none() && args.json.is_none() {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
