use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nidata_core::config::resolve_subjects_dir;
use nidata_core::constants::{DEFAULT_FILE_TEMPLATE, SUBJECTS_DIR_ENV};
use nidata_core::interfaces::ComposeXfmInputs;
use nidata_core::interfaces::dtitk::COMPOSE_XFM_COMMAND;
use nidata_core::{
    DataGrabber, DataSink, DataSource, DepositSpec, FreeSurferSource, SubjectInfo, TemplateArg,
};

#[derive(Parser)]
#[command(name = "nidata")]
#[command(about = "Locate, aggregate and deposit neuroimaging files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a FreeSurfer subject's outputs
    Freesurfer {
        /// Subject identifier
        subject_id: String,
        /// FreeSurfer subjects directory (defaults to $SUBJECTS_DIR)
        #[arg(long)]
        subjects_dir: Option<PathBuf>,
        /// Hemisphere, e.g. lh or rh
        #[arg(long)]
        hemi: Option<String>,
        /// Resolve a single semantic key instead of the whole table
        #[arg(long)]
        key: Option<String>,
    },
    /// Expand a file template and list the matching files
    Grab {
        /// Template with printf-style placeholders
        file_template: String,
        /// Positional template argument (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Named template argument as name=value, applied in the order given
        #[arg(long = "named", value_parser = parse_key_value)]
        named: Vec<(String, String)>,
    },
    /// Aggregate a subject's runs into named fields
    Source {
        /// YAML file mapping subject ids to run groups
        #[arg(long)]
        subject_info: PathBuf,
        #[arg(long)]
        subject_id: Option<String>,
        #[arg(long)]
        base_directory: Option<PathBuf>,
        /// Subject directory template, e.g. sub-%s
        #[arg(long)]
        subject_template: Option<String>,
        /// Use this directory instead of locating the subject
        #[arg(long)]
        subject_directory: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_FILE_TEMPLATE)]
        file_template: String,
    },
    /// Copy files into a nested output tree
    Sink {
        /// Deposit entry as key.path=source (repeatable)
        #[arg(long = "deposit", value_parser = parse_key_value, required = true)]
        deposits: Vec<(String, String)>,
        /// Output root; overrides subject location
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        base_directory: Option<PathBuf>,
        #[arg(long)]
        subject_id: Option<String>,
        #[arg(long)]
        subject_template: Option<String>,
        /// Extra directory level below the root
        #[arg(long)]
        parameterization: Option<String>,
    },
    /// Render the dfRightComposeAffine command line
    ComposeXfm {
        #[arg(long)]
        in_aff: Option<PathBuf>,
        #[arg(long)]
        in_df: Option<PathBuf>,
        #[arg(long)]
        out_file: Option<PathBuf>,
        /// Extra arguments appended verbatim
        #[arg(long, allow_hyphen_values = true)]
        args: Option<String>,
        /// Directory derived output names are placed in (defaults to the working directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .ok_or_else(|| format!("expected key=value, got [{}]", value))
}

/// Entry point for the nidata CLI.
///
/// Results are printed to stdout as pretty JSON; logs go to stderr.
///
/// # Environment Variables
/// - `SUBJECTS_DIR`: FreeSurfer subjects directory, used when `--subjects-dir` is absent
/// - `RUST_LOG`: log filter (default directive `nidata=info`)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nidata=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Some(Commands::Freesurfer {
            subject_id,
            subjects_dir,
            hemi,
            key,
        }) => {
            let subjects_dir =
                resolve_subjects_dir(subjects_dir, std::env::var(SUBJECTS_DIR_ENV).ok())?;
            tracing::info!(
                "++ Resolving FreeSurfer outputs for {} in {}",
                subject_id,
                subjects_dir.display()
            );
            let source = FreeSurferSource::new(Some(subjects_dir), &subject_id, hemi.as_deref())?;
            match key {
                Some(key) => serde_json::to_string_pretty(&source.resolve_key(&key)?)?,
                None => serde_json::to_string_pretty(&source.aggregate()?)?,
            }
        }
        Some(Commands::Grab {
            file_template,
            args,
            named,
        }) => {
            tracing::info!("++ Grabbing files for {}", file_template);
            let mut grabber = DataGrabber::new(file_template);
            grabber.template_args = args.iter().map(|a| TemplateArg::parse_lenient(a)).collect();
            for (name, value) in named {
                grabber.named_args.insert(name.clone(), TemplateArg::parse_lenient(&value));
                grabber.template_argnames.push(name);
            }
            serde_json::to_string_pretty(&grabber.aggregate()?)?
        }
        Some(Commands::Source {
            subject_info,
            subject_id,
            base_directory,
            subject_template,
            subject_directory,
            file_template,
        }) => {
            tracing::info!("++ Loading subject info from {}", subject_info.display());
            let yaml = std::fs::read_to_string(&subject_info)
                .with_context(|| format!("reading {}", subject_info.display()))?;
            let source = DataSource {
                base_directory,
                subject_template,
                file_template,
                subject_id,
                subject_directory,
                subject_info: Some(SubjectInfo::from_yaml_str(&yaml)?),
            };
            serde_json::to_string_pretty(&source.aggregate()?)?
        }
        Some(Commands::Sink {
            deposits,
            root,
            base_directory,
            subject_id,
            subject_template,
            parameterization,
        }) => {
            let mut sink = DataSink::for_subject(
                root.as_deref(),
                base_directory.as_deref(),
                subject_id.as_deref(),
                subject_template.as_deref(),
            )?;
            if let Some(parameterization) = parameterization {
                sink = sink.with_parameterization(parameterization);
            }

            tracing::info!("++ Depositing into {}", sink.output_directory().display());
            let mut spec = DepositSpec::new();
            for (key_path, source) in deposits {
                spec.push(key_path, source);
            }
            serde_json::to_string_pretty(&sink.deposit(&spec)?)?
        }
        Some(Commands::ComposeXfm {
            in_aff,
            in_df,
            out_file,
            args,
            output_dir,
        }) => {
            let output_dir = match output_dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            tracing::info!("++ Rendering {}", COMPOSE_XFM_COMMAND);
            let inputs = ComposeXfmInputs {
                in_aff,
                in_df,
                out_file,
                args,
                ..ComposeXfmInputs::default()
            };
            serde_json::to_string_pretty(&inputs.command_line(&output_dir)?)?
        }
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    println!("{}", output);
    Ok(())
}
