//! `textpipe`: estimate and submit text plus attached files to Azure OpenAI.

mod input;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use textpipe_core::aggregate::aggregate_pairs;
use textpipe_core::credentials::{DEFAULT_API_VERSION, DEFAULT_MODEL};
use textpipe_core::prelude::*;
use textpipe_core::{BudgetGuard, FileTextLoader, TokenizerAdapter};

use crate::output::StderrSink;

#[derive(Parser)]
#[command(name = "textpipe")]
#[command(about = "Aggregate text and files, check the token budget, and send them to Azure OpenAI")]
#[command(version)]
struct Cli {
    /// Credential file (defaults to the user configuration directory)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save endpoint credentials
    Configure {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        api_key: String,
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        #[arg(long, default_value = DEFAULT_API_VERSION)]
        api_version: String,
    },
    /// Delete saved credentials
    ClearCredentials,
    /// Print the token estimate for the given input
    Estimate(InputArgs),
    /// Submit the input once and print the result
    Run {
        #[command(flatten)]
        input: InputArgs,
        /// Directory to write the result file into
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Primary text
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,
    /// Read the primary text from a file
    #[arg(long)]
    text_file: Option<PathBuf>,
    /// Plain-text files to append, in order
    files: Vec<PathBuf>,
}

fn credential_store(
    path: Option<PathBuf>,
) -> Result<FileCredentialStore, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::default_location()?,
    })
}

/// Environment credentials take precedence over the saved ones.
fn resolve_credentials(
    store: &FileCredentialStore,
) -> Result<Option<CredentialSet>, Box<dyn std::error::Error>> {
    if let Some(creds) = CredentialSet::from_env() {
        return Ok(Some(creds));
    }
    Ok(store.load()?)
}

fn attachable_files(paths: &[PathBuf]) -> Vec<FileHandle> {
    let (files, skipped) = input::text_file_handles(paths);
    for path in skipped {
        eprintln!("skipping {}: only .txt files can be attached", path.display());
    }
    files
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    textpipe_core::init_observability();

    let cli = Cli::parse();
    let store = credential_store(cli.credentials)?;

    match cli.command {
        Commands::Configure {
            endpoint,
            api_key,
            model,
            api_version,
        } => {
            let creds = CredentialSet::new(endpoint, api_key)
                .model(model)
                .api_version(api_version);
            if !creds.is_complete() {
                eprintln!("all credential fields must be non-empty");
                return Ok(ExitCode::FAILURE);
            }
            store.save(&creds)?;
            println!("Saved credentials to {}", store.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::ClearCredentials => {
            store.clear()?;
            println!("Cleared credentials at {}", store.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Estimate(args) => estimate(args).await,
        Commands::Run { input: args, out } => run(args, out, &store).await,
    }
}

async fn estimate(args: InputArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = ProcessorConfig::from_env();
    let text = input::primary_text(args.text, args.text_file.as_deref())?;
    let files = attachable_files(&args.files);

    let report = FileTextLoader::new(config.decode_concurrency).load(&files).await;
    for failure in &report.failures {
        eprintln!("[warning] File Read Failed: {}", failure.error);
    }
    let payload = aggregate_pairs(
        &text,
        files
            .iter()
            .zip(&report.contents)
            .map(|(file, content)| (file.name(), content.as_str())),
    );
    let budget = BudgetGuard::new(TokenizerAdapter::default(), config.budget).evaluate(&payload);
    println!("{}", output::render_budget(&budget));
    Ok(if budget.admitted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(
    args: InputArgs,
    out: Option<PathBuf>,
    store: &FileCredentialStore,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let text = input::primary_text(args.text, args.text_file.as_deref())?;
    let files = attachable_files(&args.files);

    let mut builder = Processor::builder()
        .config(ProcessorConfig::from_env())
        .notifier(Arc::new(StderrSink));
    if let Some(creds) = resolve_credentials(store)? {
        builder = builder.credentials(creds);
    }
    let processor = builder.build()?;

    if processor.set_primary_text(text).is_err() {
        return Ok(ExitCode::FAILURE);
    }
    if !files.is_empty() {
        processor.add_files(files).await?;
    }
    eprintln!("{}", output::render_budget(&processor.budget()));

    match processor.submit().await {
        Ok(SubmitOutcome::Succeeded(text)) => {
            print!("{text}");
            if let (Some(dir), Some(artifact)) = (out, processor.download()) {
                let path = output::write_artifact(&dir, &artifact)?;
                eprintln!("Saved result to {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(SubmitOutcome::Failed(_) | SubmitOutcome::Ignored) => Ok(ExitCode::FAILURE),
        Err(ProcessError::Blocked(_)) => Ok(ExitCode::FAILURE),
        Err(err) => Err(err.into()),
    }
}
