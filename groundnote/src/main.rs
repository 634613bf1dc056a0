use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::{Parser, Subcommand, ValueEnum};
use groundnote::actors::{run_query, SearchSessionActor, SearchSessionArguments};
use groundnote::api;
use groundnote::config::GroundnoteConfig;
use groundnote::render::{render_outcome_html, render_terminal, TerminalOptions};
use groundnote::runtime_env;
use groundnote::upstream::{ChunkSource, GeminiSearch, ReplaySource};
use ractor::Actor;
use shared_types::QueryProgress;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

/// Ask a search-grounded question and get an answer with footnoted sources.
#[derive(Parser, Debug)]
#[command(name = "groundnote", version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single query and print the annotated answer
    Ask {
        prompt: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Replay a captured response stream instead of calling the model
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,

        /// Disable terminal hyperlinks on footnote markers
        #[arg(long)]
        no_links: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Listen address (defaults to server.bind from config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
    Json,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("groundnote={default_level},warn")));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match std::env::current_dir() {
        Ok(cwd) => {
            runtime_env::load_env_file(&cwd);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup")
        }
    }
    let config = GroundnoteConfig::load();

    match cli.command {
        Command::Ask {
            prompt,
            format,
            replay,
            no_links,
        } => ask(config, prompt, format, replay, !no_links).await,
        Command::Serve { bind } => serve(config, bind).await,
    }
}

fn chunk_source(
    config: &GroundnoteConfig,
    replay: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn ChunkSource>> {
    if let Some(path) = replay {
        let source = ReplaySource::from_path(&path)
            .with_context(|| format!("loading replay capture {}", path.display()))?;
        tracing::info!(path = %path.display(), frames = source.len(), "Replaying capture");
        return Ok(Arc::new(source));
    }

    match runtime_env::ensure_tls_cert_env() {
        Some(path) => tracing::debug!(path = %path, "Configured SSL_CERT_FILE for TLS clients"),
        None => tracing::warn!(
            "No TLS cert bundle auto-detected; upstream HTTPS calls may fail in this environment"
        ),
    }
    let source = GeminiSearch::new(config.upstream.clone()).context("building upstream client")?;
    Ok(Arc::new(source))
}

async fn ask(
    config: GroundnoteConfig,
    prompt: String,
    format: OutputFormat,
    replay: Option<PathBuf>,
    hyperlinks: bool,
) -> anyhow::Result<()> {
    let source = chunk_source(&config, replay)?;
    let (session, handle) = Actor::spawn(
        None,
        SearchSessionActor,
        SearchSessionArguments {
            source,
            history_limit: config.session.history_limit,
        },
    )
    .await
    .context("spawning search session")?;

    eprintln!("Thinking...");
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let echo = matches!(format, OutputFormat::Text);
    let progress = tokio::spawn(async move {
        let mut stderr = std::io::stderr();
        while let Some(event) = progress_rx.recv().await {
            if let QueryProgress::TextDelta { text, .. } = event {
                if echo {
                    let _ = write!(stderr, "{text}");
                    let _ = stderr.flush();
                }
            }
        }
        if echo {
            let _ = writeln!(stderr);
        }
    });

    let result = run_query(&session, prompt, Some(progress_tx)).await;
    let _ = progress.await;
    session.stop(None);
    let _ = handle.await;
    let outcome = result?;

    let rendered = match format {
        OutputFormat::Text => render_terminal(&outcome, TerminalOptions { hyperlinks }),
        OutputFormat::Html => render_outcome_html(&outcome),
        OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
    };
    println!("{}", rendered.trim_end_matches('\n'));

    if !outcome.is_completed() {
        std::process::exit(2);
    }
    Ok(())
}

async fn serve(config: GroundnoteConfig, bind: Option<String>) -> anyhow::Result<()> {
    let source = chunk_source(&config, None)?;
    let (session, _handle) = Actor::spawn(
        Some("search-session".to_string()),
        SearchSessionActor,
        SearchSessionArguments {
            source,
            history_limit: config.session.history_limit,
        },
    )
    .await
    .context("spawning search session")?;

    let allowed_origins = config
        .server
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let app = api::router()
        .with_state(api::ApiState { session })
        .layer(cors);

    let bind = bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(bind = %bind, model = %config.upstream.model, "Starting groundnote HTTP server");
    axum::serve(listener, app).await?;
    Ok(())
}
