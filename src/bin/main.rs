use clap::{Parser, Subcommand};
use contact_density_rs::{
    analyze, analyze_trajectory, build_contacts, read_ca_coordinates, read_ca_models,
    save_contact_pairs_to_csv, AnalysisConfig, AnalysisError, DEFAULT_CONTACT_THRESHOLD,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Command-line tool for comparing protein conformations by contact density
#[derive(Parser)]
#[command(name = "contact-density")]
#[command(about = "Compare alpha-carbon contact maps of a conformation and its native structure", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Contact density of a single conformation against the native structure
    Density {
        /// Path to the native (reference) PDB file
        #[arg(short, long)]
        native: PathBuf,

        /// Path to the conformation PDB file
        #[arg(short, long)]
        conformation: PathBuf,

        /// Contact distance cutoff in Å (default: 6.0)
        #[arg(short, long, default_value_t = DEFAULT_CONTACT_THRESHOLD)]
        threshold: f64,

        /// Skip superposing the conformation onto the native structure
        #[arg(long)]
        no_superpose: bool,

        /// Write the conformation's contacting residue pairs to this CSV file
        #[arg(long)]
        contacts_out: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Contact density of every model in a multi-model PDB file
    Trajectory {
        /// Path to the native (reference) PDB file
        #[arg(short, long)]
        native: PathBuf,

        /// Path to the multi-model PDB trajectory
        #[arg(short = 'i', long)]
        trajectory: PathBuf,

        /// Contact distance cutoff in Å (default: 6.0)
        #[arg(short, long, default_value_t = DEFAULT_CONTACT_THRESHOLD)]
        threshold: f64,

        /// Skip superposing each model onto the native structure
        #[arg(long)]
        no_superpose: bool,

        /// Maximum number of models to process (default: all models)
        #[arg(long)]
        max_frames: Option<usize>,

        /// Output CSV path (default: auto-generated from trajectory path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbosity: u8, quiet: bool) {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let outcome = match cli.command {
        Commands::Density {
            native,
            conformation,
            threshold,
            no_superpose,
            contacts_out,
            json,
        } => run_density(
            &native,
            &conformation,
            AnalysisConfig {
                threshold,
                superpose: !no_superpose,
            },
            contacts_out.as_deref(),
            json,
        ),

        Commands::Trajectory {
            native,
            trajectory,
            threshold,
            no_superpose,
            max_frames,
            output,
        } => run_trajectory(
            &native,
            &trajectory,
            AnalysisConfig {
                threshold,
                superpose: !no_superpose,
            },
            max_frames,
            output,
        ),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn run_density(
    native_path: &Path,
    conformation_path: &Path,
    config: AnalysisConfig,
    contacts_out: Option<&Path>,
    json: bool,
) -> Result<(), AnalysisError> {
    info!(native = ?native_path, conformation = ?conformation_path, threshold = config.threshold, "comparing structures");

    let native = read_ca_coordinates(native_path)?;
    let conformation = read_ca_coordinates(conformation_path)?;
    let report = analyze(&native, &conformation, &config)?;

    if let Some(path) = contacts_out {
        // Contacts are invariant under rigid motion, so the raw coordinates suffice
        let contacts = build_contacts(&conformation, config.threshold)?;
        save_contact_pairs_to_csv(&contacts, path)?;
        info!(path = ?path, "saved conformation contacts");
    }

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("Contacts in given protein conformation = {}", report.conformation_contacts);
    println!("Contacts in native protein conformation = {}", report.native_contacts);
    println!("Common contacts = {}", report.common_contacts);
    println!("Contact density % = {}", report.contact_density);
    if let Some(rmsd) = report.rmsd {
        println!("RMSD after superposition = {:.3}", rmsd);
    }

    Ok(())
}

fn run_trajectory(
    native_path: &Path,
    trajectory_path: &Path,
    config: AnalysisConfig,
    max_frames: Option<usize>,
    output: Option<PathBuf>,
) -> Result<(), AnalysisError> {
    println!("Reading trajectory: {:?}", trajectory_path);
    println!("Native structure: {:?}", native_path);
    println!("Contact threshold: {}", config.threshold);

    let native = read_ca_coordinates(native_path)?;
    let models = read_ca_models(trajectory_path, max_frames)?;
    println!("✅ Loaded {} models", models.len());

    let output_path = output.unwrap_or_else(|| {
        let base = trajectory_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("trajectory");
        let dir = trajectory_path.parent().unwrap_or(Path::new("."));
        dir.join(format!("{}_contact_density.csv", base))
    });

    let reports = analyze_trajectory(&native, &models, &config, Some(&output_path))?;

    if !reports.is_empty() {
        let mean = reports.iter().map(|r| r.report.contact_density).sum::<f64>() / reports.len() as f64;
        println!("✅ Successfully scored {} models (mean contact density {:.2}%)", reports.len(), mean);
    }
    println!("📄 Results saved to: {:?}", output_path);

    Ok(())
}
