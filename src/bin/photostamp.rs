use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "photostamp", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate every image listed in a job table.
    Run(RunArgs),
    /// Print the merged metadata and resolved timestamp of one image.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Job table (.xlsx/.xls/.ods or .json).
    #[arg(long, default_value = photostamp::DEFAULT_JOB_TABLE)]
    jobs: PathBuf,

    /// Output root. Defaults to ~/Downloads/output.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory holding the default font and logo.
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Font file, overriding the one in the assets directory.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Logo image, overriding the one in the assets directory.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// JSON file overriding annotation style fields.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Extension picked up from job folders (repeatable).
    #[arg(long = "ext", default_values_t = vec!["jpg".to_string()])]
    extensions: Vec<String>,

    /// Disambiguated names tried before a destination is given up.
    #[arg(long, default_value_t = photostamp::DEFAULT_RETRY_LIMIT)]
    retry_limit: u32,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Image to inspect.
    image: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photostamp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Inspect(args) => cmd_inspect(&args.image),
    }
}

fn run_config(args: &RunArgs) -> anyhow::Result<photostamp::RunConfig> {
    let mut config = photostamp::RunConfig::with_defaults(&args.assets);
    if let Some(output) = &args.output {
        config.output_root = output.clone();
    }
    if let Some(font) = &args.font {
        config.font_path = font.clone();
    }
    if let Some(logo) = &args.logo {
        config.logo_path = logo.clone();
    }
    if let Some(style) = &args.style {
        config.style = photostamp::AnnotationStyle::from_json_file(style)
            .with_context(|| format!("load style '{}'", style.display()))?;
    }
    config.extensions = args.extensions.clone();
    config.retry_limit = args.retry_limit;
    Ok(config)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let config = run_config(&args)?;
    tracing::info!(
        jobs = %args.jobs.display(),
        output = %config.output_root.display(),
        font = %config.font_path.display(),
        logo = %config.logo_path.display(),
        "starting batch"
    );

    let summary = photostamp::run_job_table(&args.jobs, &config, photostamp::SystemClock)
        .with_context(|| format!("run job table '{}'", args.jobs.display()))?;

    for written in &summary.outputs {
        eprintln!("wrote {}", written.display());
    }
    for failure in &summary.failures {
        eprintln!("failed {}: {}", failure.source, failure.error);
    }
    eprintln!("{summary}");

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_inspect(image: &Path) -> anyhow::Result<ExitCode> {
    let bag = photostamp::resolve(image)
        .with_context(|| format!("read metadata of '{}'", image.display()))?;
    let timestamp = photostamp::resolve_timestamp(&bag, &photostamp::SystemClock);

    let report = serde_json::json!({
        "path": image.display().to_string(),
        "metadata": bag,
        "timestamp": timestamp.at,
        "timestamp_source": timestamp.source.to_string(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize metadata report")?
    );
    Ok(ExitCode::SUCCESS)
}
