//! BIDS Lite CLI - validate, plan and apply an organize run from the shell.
//!
//! Reports go to stdout, logging to stderr. The exit code is 0 on success,
//! 1 for validation errors, 2 for configuration errors, 3 for planning
//! conflicts and 4 for anything else (including failed apply operations).

use anyhow::{Context, Result};
use bids_lite_core::planner::AuxiliaryFiles;
use bids_lite_core::writer::render_plan;
use bids_lite_core::{
    BidsError, CancellationToken, DatasetType, MatchPolicy, Organizer, OrganizerOptions, Plan,
    TransferMode, Writer,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const EXIT_SUCCESS: u8 = 0;
const EXIT_VALIDATION: u8 = 1;
/// Exit code for failed apply operations and unexpected errors.
const EXIT_FAILURE: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "bids-lite")]
#[command(about = "Organize loose neuroimaging files into a BIDS layout")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// JSON options file; flags given on the command line take precedence
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the metadata table against the input folder
    Validate {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Build a dry-run plan without touching any file
    Plan {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        run: RunArgs,
        /// Target dataset root
        #[arg(long = "out", value_name = "DIR")]
        output: PathBuf,
        /// Write the plan as JSON for later review or apply
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
        #[command(flatten)]
        side: SideFolderArgs,
    },
    /// Execute a saved plan, or plan and execute in one go
    Apply {
        /// Previously saved plan (skips validation and matching)
        #[arg(long, value_name = "FILE", conflicts_with_all = ["input", "metadata", "output"])]
        plan: Option<PathBuf>,
        /// Incoming folder with loosely named files
        #[arg(long = "in", value_name = "DIR", required_unless_present = "plan")]
        input: Option<PathBuf>,
        /// Metadata table (CSV or TSV)
        #[arg(long = "meta", value_name = "FILE", required_unless_present = "plan")]
        metadata: Option<PathBuf>,
        /// Target dataset root
        #[arg(long = "out", value_name = "DIR", required_unless_present = "plan")]
        output: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        side: SideFolderArgs,
        /// Move files instead of copying them
        #[arg(long = "move")]
        move_files: bool,
        /// README template used when the dataset has no README yet
        #[arg(long, value_name = "FILE")]
        readme_template: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Incoming folder with loosely named files
    #[arg(long = "in", value_name = "DIR")]
    input: PathBuf,
    /// Metadata table (CSV or TSV)
    #[arg(long = "meta", value_name = "FILE")]
    metadata: PathBuf,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Kind of dataset to produce
    #[arg(long, value_enum)]
    dataset_type: Option<DatasetTypeArg>,
    /// Pipeline folder name (required for derivatives)
    #[arg(long)]
    pipeline_name: Option<String>,
    /// Which files of a matched participant to keep
    #[arg(long = "match", value_enum)]
    match_policy: Option<MatchPolicyArg>,
}

#[derive(Args, Debug, Default)]
struct SideFolderArgs {
    /// Phenotype file copied into the phenotype folder (repeatable)
    #[arg(long, value_name = "FILE")]
    phenotype: Vec<PathBuf>,
    /// Publication file copied into the publications folder (repeatable)
    #[arg(long, value_name = "FILE")]
    publication: Vec<PathBuf>,
}

impl SideFolderArgs {
    fn into_auxiliary(self) -> AuxiliaryFiles {
        AuxiliaryFiles {
            phenotype: self.phenotype,
            publications: self.publication,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DatasetTypeArg {
    Raw,
    Derivatives,
}

impl From<DatasetTypeArg> for DatasetType {
    fn from(value: DatasetTypeArg) -> Self {
        match value {
            DatasetTypeArg::Raw => DatasetType::Raw,
            DatasetTypeArg::Derivatives => DatasetType::Derivatives,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MatchPolicyArg {
    SpecifiedOnly,
    AllModalities,
}

impl From<MatchPolicyArg> for MatchPolicy {
    fn from(value: MatchPolicyArg) -> Self {
        match value {
            MatchPolicyArg::SpecifiedOnly => MatchPolicy::SpecifiedOnly,
            MatchPolicyArg::AllModalities => MatchPolicy::AllModalities,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging on stderr so stdout carries only reports
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let base = load_options(cli.config.as_deref())?;

    match cli.command {
        Command::Validate { inputs, run } => {
            let organizer = Organizer::new(run.apply_to(base));
            let loaded = organizer.load_inputs(&inputs.input, &inputs.metadata)?;
            let report = organizer.validate(&loaded);
            print!("{}", report.render_text());
            Ok(if report.has_errors() {
                EXIT_VALIDATION
            } else {
                EXIT_SUCCESS
            })
        }
        Command::Plan {
            inputs,
            run,
            output,
            json,
            side,
        } => {
            let organizer = Organizer::new(run.apply_to(base));
            let loaded = organizer.load_inputs(&inputs.input, &inputs.metadata)?;
            let report = organizer.validate(&loaded);
            if report.has_errors() {
                println!("Fix validation issues before planning.");
                print!("{}", report.render_text());
                return Ok(EXIT_VALIDATION);
            }

            let plan = organizer.plan(&loaded, &output, side.into_auxiliary())?;
            print!("{}", render_plan(&plan));
            if let Some(path) = json {
                plan.save(&path)?;
                println!("Wrote dry-run plan to {}", path.display());
            }
            Ok(EXIT_SUCCESS)
        }
        Command::Apply {
            plan,
            input,
            metadata,
            output,
            run,
            side,
            move_files,
            readme_template,
        } => {
            let mut options = run.apply_to(base);
            if move_files {
                options.transfer_mode = TransferMode::Move;
            }
            let organizer = Organizer::new(options);
            let mut writer = Writer::new();
            if let Some(template) = readme_template {
                writer = writer.readme_template(template);
            }

            let plan = match plan {
                Some(path) => {
                    info!("Applying saved plan {}", path.display());
                    Plan::load(&path)?
                }
                None => {
                    let (input, metadata, output) = match (input, metadata, output) {
                        (Some(i), Some(m), Some(o)) => (i, m, o),
                        _ => {
                            return Err(BidsError::config(
                                "apply needs either --plan or all of --in, --meta and --out",
                            )
                            .into())
                        }
                    };
                    let loaded = organizer.load_inputs(&input, &metadata)?;
                    let report = organizer.validate(&loaded);
                    if report.has_errors() {
                        print!("{}", report.render_text());
                        return Ok(EXIT_VALIDATION);
                    }
                    let plan = organizer.plan(&loaded, &output, side.into_auxiliary())?;
                    writer = writer.validation_report(report);
                    plan
                }
            };

            let report = organizer.apply(&plan, &writer, &CancellationToken::new())?;
            print!("{}", report.render_text());
            Ok(if report.is_success() {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            })
        }
    }
}

impl RunArgs {
    /// Overlay explicit flags on options loaded from file or defaults.
    fn apply_to(self, mut options: OrganizerOptions) -> OrganizerOptions {
        if let Some(dataset_type) = self.dataset_type {
            options.dataset_type = dataset_type.into();
        }
        if let Some(name) = self.pipeline_name {
            options.pipeline_name = Some(name);
        }
        if let Some(policy) = self.match_policy {
            options.match_policy = policy.into();
        }
        options
    }
}

fn load_options(path: Option<&Path>) -> Result<OrganizerOptions> {
    match path {
        Some(path) => {
            debug!("Loading options from {}", path.display());
            OrganizerOptions::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(OrganizerOptions::default()),
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<BidsError>()
        .and_then(|e| u8::try_from(e.exit_code()).ok())
        .unwrap_or(EXIT_FAILURE)
}
