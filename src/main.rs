//! resume-forge – export an HTML résumé to PDF, or run the render service.
//!
//! Usage:
//!   resume-forge export <page.html> [--filename resume.pdf] [--save-as PATH | --prompt]
//!   resume-forge plan <page.html>
//!   resume-forge serve [--host 127.0.0.1] [--port 3000]
//!
//! Configuration comes from `--config FILE` (TOML) and `RESUME_FORGE_*`
//! environment variables; tokens are only ever read from the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use resume_forge::config::{BackendKind, ExportConfig};
use resume_forge::dom::Document;
use resume_forge::export::{ExportOptions, ExportOrchestrator};
use resume_forge::fonts::FontManager;
use resume_forge::inline::StyleInliner;
use resume_forge::pipeline;
use resume_forge::resources::{DefaultLoader, ImageCache};
use resume_forge::save::{FixedPath, NoDialog, SaveDialog, TerminalPrompt};
use resume_forge::server;

#[derive(Parser)]
#[command(name = "resume-forge", version, about = "Export an HTML résumé preview as an A4 PDF")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export the résumé preview in an HTML page
    Export(ExportArgs),
    /// Print the page plan for an HTML page as JSON
    Plan(PageArgs),
    /// Run the headless-browser render service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct PageArgs {
    /// HTML page containing the preview element
    input: PathBuf,

    /// Id of the preview element
    #[arg(long)]
    root_id: Option<String>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Suggested file name
    #[arg(long)]
    filename: Option<String>,

    /// Save to this path instead of downloading
    #[arg(long, conflicts_with = "prompt")]
    save_as: Option<PathBuf>,

    /// Ask for the destination on the terminal
    #[arg(long)]
    prompt: bool,

    /// Directory for downloads
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = ExportConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Export(args) => export(config, args).await,
        Command::Plan(args) => plan(config, args).await,
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::serve(&config.server).await?;
            Ok(())
        }
    }
}

async fn export(mut config: ExportConfig, args: ExportArgs) -> Result<()> {
    let mut doc = read_page(&mut config, &args.page)?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dir) = args.out_dir {
        config.save.download_dir = Some(dir);
    }
    config.validate()?;

    let dialog: Arc<dyn SaveDialog> = match (args.save_as, args.prompt) {
        (Some(path), _) => Arc::new(FixedPath(path)),
        (None, true) => Arc::new(TerminalPrompt),
        (None, false) => Arc::new(NoDialog),
    };
    let orchestrator = ExportOrchestrator::from_config(&config, dialog)?;

    let mut states = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            log::debug!("Export state: {state:?}");
        }
    });

    let outcome = orchestrator
        .export_resume(
            &mut doc,
            ExportOptions {
                filename: args.filename,
            },
        )
        .await;
    drop(orchestrator);
    progress.await.ok();

    match outcome {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(e) => {
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

async fn plan(mut config: ExportConfig, args: PageArgs) -> Result<()> {
    let mut doc = read_page(&mut config, &args)?;
    let loader = Arc::new(DefaultLoader::new(&config.resources)?);
    let snapshot = StyleInliner::new(loader.clone()).snapshot(&doc).await;
    let images = match doc.find_by_id(&config.root_id) {
        Some(root) => ImageCache::prefetch(root, loader.as_ref()).await,
        None => ImageCache::default(),
    };
    let fonts = FontManager::from_config(&config.fonts);
    let plan = pipeline::plan_document(&mut doc, &snapshot, &images, &fonts, &config)?;
    info!("{} page(s)", plan.page_count());
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Parse the page; relative assets resolve next to it unless configured.
fn read_page(config: &mut ExportConfig, args: &PageArgs) -> Result<Document> {
    let html = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    if let Some(root_id) = &args.root_id {
        config.root_id = root_id.clone();
    }
    if config.resources.base_dir.is_none() && config.resources.base_url.is_none() {
        config.resources.base_dir = args.input.parent().map(Path::to_path_buf);
    }
    Ok(Document::parse(&html))
}
