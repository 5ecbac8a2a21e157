use anyhow::{Context, Result};
use seven_stations::api::{build_router, AppState};
use seven_stations::cli::commands::{AnalyzeCommand, HistoryCommand, ServeCommand, StationsCommand};
use seven_stations::cli::output::*;
use seven_stations::cli::terminal_output::print_report;
use seven_stations::cli::{Cli, Command};
use seven_stations::core::{PipelineRunResult, StationsConfig, SuccessPolicy};
use seven_stations::execution::{PipelineEvent, PipelineOrchestrator};
use seven_stations::gateway::{GatewayConfig, GeminiClient, ModelGateway, SharedGenerator};
use seven_stations::persistence::{cache_key, InMemoryRunStore, RunStore};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[cfg(feature = "sqlite")]
use seven_stations::persistence::SqliteRunStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Serve(cmd) => serve(cmd, &cli).await?,
        Command::Analyze(cmd) => analyze(cmd, &cli).await?,
        Command::Stations(cmd) => show_stations(cmd, &cli)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_stations(cli: &Cli) -> Result<StationsConfig> {
    match &cli.config {
        Some(path) => StationsConfig::from_file(path).context("Failed to load station config"),
        None => StationsConfig::builtin(),
    }
}

/// One gateway per process, shared by every run through the orchestrator
fn build_orchestrator(
    cli: &Cli,
    stations: &StationsConfig,
    policy: SuccessPolicy,
) -> Result<Arc<PipelineOrchestrator<SharedGenerator>>> {
    let mut config = GatewayConfig::new();
    if let Some(api_key) = &cli.api_key {
        config = config.with_api_key(api_key.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if cli.no_throttle {
        config = config.without_throttle();
    }

    let client = GeminiClient::new(&config).context("Failed to create generation client")?;
    let backend: SharedGenerator = Arc::new(client);
    let gateway = Arc::new(ModelGateway::new(backend, &config));

    Ok(Arc::new(
        PipelineOrchestrator::new(gateway, stations).with_policy(policy),
    ))
}

async fn open_store(no_history: bool) -> Result<Arc<dyn RunStore>> {
    if no_history {
        return Ok(Arc::new(InMemoryRunStore::new()));
    }

    #[cfg(feature = "sqlite")]
    {
        let store = SqliteRunStore::with_default_path()
            .await
            .context("Failed to open run history")?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Ok(Arc::new(InMemoryRunStore::new()))
    }
}

async fn serve(cmd: &ServeCommand, cli: &Cli) -> Result<()> {
    let stations = load_stations(cli)?;
    let orchestrator = build_orchestrator(cli, &stations, cmd.policy.into())?;
    let store = open_store(cmd.no_history).await?;

    let state = AppState::new(orchestrator, store)
        .with_cache_ttl(chrono::Duration::seconds(cmd.cache_ttl_secs));
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cmd.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cmd.bind))?;
    info!("Listening on http://{}", cmd.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down, cancelling in-flight runs");
            }
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn read_input(cmd: &AnalyzeCommand) -> Result<String> {
    match &cmd.file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path)),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn analyze(cmd: &AnalyzeCommand, cli: &Cli) -> Result<()> {
    let stations = load_stations(cli)?;
    let orchestrator = build_orchestrator(cli, &stations, cmd.policy.into())?;
    let store = open_store(cmd.no_history).await?;
    let text = read_input(cmd).await?;

    println!(
        "{} Loaded {} characters, {} stations",
        INFO,
        style(text.chars().count()).bold(),
        style(orchestrator.stations().len()).cyan()
    );

    // Progress output goes to stderr through the bar
    let progress = create_progress_bar(orchestrator.stations().len());
    let bar = progress.clone();
    orchestrator
        .add_event_handler(move |event| match &event {
            PipelineEvent::StationStarted { name, .. } => bar.set_message(name.clone()),
            PipelineEvent::StationCompleted { .. } | PipelineEvent::StationFailed { .. } => {
                bar.println(format_pipeline_event(&event));
                bar.inc(1);
            }
            PipelineEvent::RunFinished { .. } => bar.finish_and_clear(),
            _ => bar.println(format_pipeline_event(&event)),
        })
        .await;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let run = orchestrator
        .execute(&text, cmd.metadata.clone(), cancel)
        .await
        .context("Analysis could not start")?;
    progress.finish_and_clear();

    let key = cache_key(&text, cmd.metadata.as_deref());
    store.save_run(&key, &run).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_report(&run, cmd.full);
        print_run_outcome(&run, !cmd.no_history);
    }

    if !run.success {
        std::process::exit(1);
    }

    Ok(())
}

fn print_run_outcome(run: &PipelineRunResult, saved: bool) {
    if saved {
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&run.run_id.to_string()[..8]).dim()
        );
    }

    let elapsed = format_duration(std::time::Duration::from_millis(run.execution_time_ms));
    if run.success {
        println!(
            "\n{} Analysis completed {} in {} (confidence {})",
            CHECK,
            style("successfully").green(),
            style(elapsed).dim(),
            style(format!("{:.0}%", run.confidence * 100.0)).cyan()
        );
    } else {
        println!(
            "\n{} Analysis {} after {}",
            CROSS,
            format_status(run.status),
            style(elapsed).dim()
        );
        if let Some(err) = &run.error {
            error!("{}", err);
        }
    }
}

fn show_stations(cmd: &StationsCommand, cli: &Cli) -> Result<()> {
    let config = load_stations(cli)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{} {}", INFO, style(&config.name).bold());
    for station in config.to_definitions() {
        let fallback = station
            .fallback_model
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} [{} → {}] temp {} text {} prev {} timeout {}s",
            style(station.id).cyan(),
            style(&station.name).bold(),
            style(station.model).dim(),
            style(fallback).dim(),
            station.temperature,
            station.text_char_limit,
            station.previous_char_limit,
            station.timeout_secs
        );
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store(false).await?;

    // If specific run ID is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(run) => print_run_details(&run, cmd.details, cmd.json)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = store.list_runs(cmd.limit).await?;
    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Run history (showing latest {}):", INFO, cmd.limit);
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(run: &PipelineRunResult, details: bool, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }

    println!("{} Run Details", INFO);
    println!("  ID: {}", style(run.run_id).cyan());
    println!("  Status: {}", format_status(run.status));
    println!("  Started: {}", style(run.started_at.to_rfc3339()).dim());
    println!(
        "  Duration: {}",
        style(format_duration(std::time::Duration::from_millis(run.execution_time_ms))).dim()
    );
    println!(
        "  Stations: {}/{} succeeded",
        run.outputs.iter().filter(|o| o.success).count(),
        run.outputs.len()
    );
    println!(
        "  Confidence: {}",
        style(format!("{:.0}%", run.confidence * 100.0)).cyan()
    );

    print_report(run, details);
    Ok(())
}
