// docverify CLI: verify one document or a batch and print the verdicts as JSON
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docverify::collaborators::{ChatCompletionsExtractor, RegistryProbe};
use docverify::pipeline::{BatchInput, TesseractCli};
use docverify::{CrossReference, Document, DocumentVerifier, ErrorReport, VerifierConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forensic and OCR verification of identity documents")]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a single document
    Verify {
        file: PathBuf,
        /// Declared document type, e.g. "PAN" or "Aadhaar"
        #[arg(long = "type")]
        document_type: Option<String>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Verify several documents concurrently
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
struct IdentityArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    dob: Option<String>,
    #[arg(long)]
    application_id: Option<String>,
}

impl IdentityArgs {
    fn into_cross_reference(self) -> Option<CrossReference> {
        let xref = CrossReference {
            name: self.name,
            dob: self.dob,
            application_id: self.application_id,
        };
        (!xref.is_empty()).then_some(xref)
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docverify=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_document(path: &Path) -> Result<Document> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(Document::new(bytes, document_name(path)))
}

// unreadable paths keep their slot as an error entry
fn batch_input(path: &Path) -> BatchInput {
    match read_document(path) {
        Ok(document) => BatchInput::Ready(document),
        Err(e) => BatchInput::Unreadable(ErrorReport::unreadable(document_name(path), &format!("{:#}", e))),
    }
}

fn build_verifier(config: VerifierConfig) -> Result<DocumentVerifier> {
    let recognizer = Arc::new(TesseractCli::new(&config.ocr));
    let extractor = Arc::new(ChatCompletionsExtractor::from_env(&config.ai)?);
    let registry = RegistryProbe::from_config(&config.registry);
    if !registry.is_enabled() {
        tracing::debug!("registry lookup disabled");
    }
    Ok(DocumentVerifier::new(config, recognizer, extractor)?.with_registry(registry))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = VerifierConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { file, document_type, identity } => {
            let mut document = read_document(&file)?;
            document.type_hint = document_type;
            document.cross_reference = identity.into_cross_reference();
            let filename = document.filename.clone();

            let verifier = build_verifier(config)?;
            match verifier.verify(document).await {
                Ok(verdict) => {
                    print_json(&verdict)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::error!(kind = e.kind(), error = %e, "verification failed");
                    print_json(&ErrorReport::from_error(filename, &e))?;
                    Ok(ExitCode::from(2))
                }
            }
        }
        Command::Batch { files, identity } => {
            let inputs = files.iter().map(|path| batch_input(path)).collect();
            let verifier = build_verifier(config)?;
            let report = verifier.verify_inputs(inputs, identity.into_cross_reference()).await;
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    run(cli).await
}
