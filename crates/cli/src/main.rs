#![deny(warnings)]

mod interactive;
mod output;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use emotion_lens_core::config::{resolve_service_config, Env, ServiceConfig, StdEnv};
use emotion_lens_core::extract::SourceFile;
use emotion_lens_core::service::{AnalysisMode, HttpAnalysisService};
use emotion_lens_core::session::Session;
use output::OutputFormat;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Parser, Debug)]
#[command(name = "emotion-lens")]
#[command(about = "Annotate transcripts with detected emotions, per sentence or per character")]
struct Args {
    /// Base URL of the emotion-analysis service [env: EMOTION_SERVICE_URL]
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Request timeout in seconds [env: EMOTION_SERVICE_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one transcript and print the annotated result
    Analyze(AnalyzeArgs),
    /// Line-oriented session: type or load text, switch views, analyze repeatedly
    Interactive {
        #[arg(long, default_value_t = AnalysisMode::Sentence)]
        mode: AnalysisMode,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(clap::Args, Debug)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["text", "file"])
))]
struct AnalyzeArgs {
    #[arg(long)]
    text: Option<String>,

    /// A .txt or .pdf transcript
    #[arg(long)]
    file: Option<PathBuf>,

    /// Declared media type of --file; guessed from the extension when absent
    #[arg(long, requires = "file")]
    media_type: Option<String>,

    #[arg(long, default_value_t = AnalysisMode::Sentence)]
    mode: AnalysisMode,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    tracing::info!(
        service_url = %cfg.base_url.as_url(),
        timeout_secs = cfg.timeout.secs,
        "config loaded"
    );

    let service = HttpAnalysisService::new(&cfg).context("building analysis client")?;

    match args.command {
        Command::Analyze(analyze) => run_analyze(analyze, &service).await,
        Command::Interactive { mode, format } => interactive::run(service, mode, format).await,
    }
}

async fn run_analyze(args: AnalyzeArgs, service: &HttpAnalysisService) -> anyhow::Result<()> {
    let mut session = Session::with_mode(args.mode);

    if let Some(text) = args.text {
        session.set_text(text);
    }
    if let Some(path) = args.file.as_deref() {
        let declared = declared_media_type(path, args.media_type.as_deref());
        let file = SourceFile::from_path(path, declared).await?;
        session.load_file(&file).await?;
    }

    let result = session.analyze(service).await?;
    output::print_result(result, args.format)
}

fn declared_media_type(path: &Path, explicit: Option<&str>) -> String {
    match explicit {
        Some(media_type) => media_type.to_owned(),
        None => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(UNKNOWN_MEDIA_TYPE)
            .to_owned(),
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<ServiceConfig> {
    Ok(resolve_service_config(
        args.service_url.clone(),
        args.timeout_secs,
        env,
    )?)
}
