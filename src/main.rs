use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use codelens::export::{self, ExportData, ExportFormat};
use codelens::program::normalize_path;
use codelens::{AnalysisConfig, AnalysisSession};

#[derive(Parser)]
#[command(name = "codelens")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version)]
#[command(about = "Whole-program static analysis for JavaScript and TypeScript projects", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command that analyzes a project.
#[derive(Args)]
struct ProjectArgs {
    /// Project root (defaults to the config file's root, then ".")
    path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only analyze files matching this glob (repeatable)
    #[arg(long)]
    include: Vec<String>,

    /// Skip files matching this glob (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
}

/// Where and how to write the result.
#[derive(Args)]
struct OutputArgs {
    /// Output format: json, text, mermaid, graphml, dot
    #[arg(short, long)]
    format: Option<ExportFormat>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report unused code, complexity, mixed logic and cycles
    Analyze {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Warn about functions above this cyclomatic complexity
        #[arg(long)]
        complexity_threshold: Option<usize>,

        /// Minimum entities before a file can be flagged as mixed logic
        #[arg(long)]
        mixed_logic_threshold: Option<usize>,
    },
    /// Export the import graph
    Graph {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List import cycles
    Cycles {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Shortest import chain between two files
    Path {
        /// Importing file
        from: PathBuf,

        /// Imported file
        to: PathBuf,

        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Files that share direct imports with a file
    Related {
        file: PathBuf,

        /// Minimum number of shared imports
        #[arg(long)]
        min_shared: Option<usize>,

        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(project: &ProjectArgs) -> Result<AnalysisConfig> {
    let mut config = match &project.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(path) = &project.path {
        config.root = path.clone();
    }
    config.include.extend(project.include.iter().cloned());
    config.exclude.extend(project.exclude.iter().cloned());
    Ok(config)
}

fn open_session(config: AnalysisConfig) -> Result<AnalysisSession> {
    let root = config.root.display().to_string();
    AnalysisSession::open(config).with_context(|| format!("Failed to analyze {}", root))
}

fn writer_for(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

fn write_export(data: &ExportData, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let mut writer = writer_for(output)?;
    export::export(format, data, &mut writer).context("Failed to write output")?;
    writer.flush().context("Failed to write output")?;
    Ok(())
}

/// Resolves a file argument to the normalized absolute form the program uses.
fn program_path(session: &AnalysisSession, file: &Path) -> Result<PathBuf> {
    let path = file
        .canonicalize()
        .with_context(|| format!("No such file: {}", file.display()))?;
    let path = normalize_path(&path);
    if session.program().file(&path).is_none() {
        bail!("{} is not part of the analyzed program", file.display());
    }
    Ok(path)
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze {
            project,
            output,
            complexity_threshold,
            mixed_logic_threshold,
        } => {
            let mut config = load_config(&project)?;
            if let Some(threshold) = complexity_threshold {
                config.complexity_threshold = threshold;
            }
            if let Some(threshold) = mixed_logic_threshold {
                config.mixed_logic_threshold = threshold;
            }
            let session = open_session(config)?;
            let data = ExportData::from_session(&session);
            let format = output.format.unwrap_or(ExportFormat::Text);
            write_export(&data, format, output.output.as_deref())
        }
        Commands::Graph { project, output } => {
            let session = open_session(load_config(&project)?)?;
            let data = ExportData::from_session(&session);
            let format = output.format.unwrap_or(ExportFormat::Mermaid);
            write_export(&data, format, output.output.as_deref())
        }
        Commands::Cycles { project } => {
            let session = open_session(load_config(&project)?)?;
            let cycles = session
                .cycles()
                .map_err(|d| anyhow::anyhow!("{}", d.message))?;
            if cycles.is_empty() {
                println!("No import cycles found.");
            }
            for cycle in &cycles {
                println!("[{}] {}", cycle.severity, cycle.cycle_path());
            }
            Ok(())
        }
        Commands::Path { from, to, project } => {
            let session = open_session(load_config(&project)?)?;
            let from = program_path(&session, &from)?;
            let to = program_path(&session, &to)?;
            let chain = session
                .find_path(&from, &to)
                .map_err(|d| anyhow::anyhow!("{}", d.message))?;
            match chain {
                Some(chain) => {
                    let chain: Vec<String> =
                        chain.iter().map(|p| session.display_path(p)).collect();
                    println!("{}", chain.join(" -> "));
                }
                None => println!(
                    "No import path from {} to {}",
                    session.display_path(&from),
                    session.display_path(&to)
                ),
            }
            Ok(())
        }
        Commands::Related {
            file,
            min_shared,
            project,
        } => {
            let session = open_session(load_config(&project)?)?;
            let file = program_path(&session, &file)?;
            let min_shared = min_shared.unwrap_or(session.config().related_min_shared);
            let related = session
                .related_files(&file, min_shared)
                .map_err(|d| anyhow::anyhow!("{}", d.message))?;
            if related.is_empty() {
                println!("No related files.");
            }
            for entry in &related {
                let shared: Vec<String> = entry
                    .shared
                    .iter()
                    .map(|p| session.display_path(p))
                    .collect();
                println!(
                    "{} ({} shared: {})",
                    session.display_path(&entry.path),
                    entry.shared_count(),
                    shared.join(", ")
                );
            }
            Ok(())
        }
        Commands::Version => {
            println!("codelens v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(command) => run(command),
        None => {
            println!("codelens - whole-program analysis for JS/TS projects");
            println!("Run 'codelens analyze [PATH]' to analyze a project");
            println!("Run 'codelens --help' for more information");
            Ok(())
        }
    }
}
