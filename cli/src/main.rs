//! CLI entrypoint for calendar-agent
//!
//! This is the main binary that wires together all layers using
//! dependency injection. The same binary is both the agent (`chat`, `ask`,
//! `tools`) and, by default, the tool provider it spawns (`serve`).

use anyhow::{Context, Result, anyhow};
use calagent_application::{
    AgentProgressNotifier, CalendarBackend, ConversationLogger, ConversationSession,
    NoAgentProgress, ToolSchemaPort,
};
use calagent_infrastructure::config::CalendarBackendKind;
use calagent_infrastructure::{
    CalendarCredential, ChatCompletionsGateway, ConfigLoader, FileConfig, GoogleCalendarBackend,
    InMemoryCalendar, JsonSchemaToolConverter, JsonlConversationLogger, ToolClient, ToolServer,
    calendar_registry, rpc::Channel,
};
use calagent_presentation::{
    BackendArg, ChatRepl, Cli, Command, ConsoleFormatter, ProgressReporter, ReplConfig,
    SimpleProgress,
};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const PROVIDER_NAME: &str = "calendar-agent";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs never go to stdout: in `serve` mode it carries the protocol
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting calendar-agent");

    let config = load_config(&cli)?;

    match &cli.command {
        Command::Serve { backend } => {
            serve(&config, *backend).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Chat { quiet } => {
            let session = open_session(&cli, &config).await?;
            let repl_config = ReplConfig::default()
                .quiet(*quiet)
                .with_verbose(cli.verbose > 0)
                .with_spinners(std::io::stderr().is_terminal());
            ChatRepl::new(session).with_config(repl_config).run().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { request, quiet } => {
            let session = open_session(&cli, &config).await?;
            ask(session, &request.join(" "), *quiet, cli.verbose > 0).await
        }
        Command::Tools { json } => {
            list_tools(&cli, &config, *json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ShowConfig => {
            for line in ConfigLoader::config_sources(cli.config.as_deref()) {
                println!("{}", line);
            }
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Initialize logging based on verbosity level, unless `RUST_LOG` is set.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"), // -vvv or more
        }
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("--log-file must name a file: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(Some(guard))
}

/// Merge config files and environment, then apply command-line flags.
fn load_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };

    if let Some(max) = cli.max_iterations {
        config.agent.max_iterations = max;
    }
    if let Some(model) = &cli.model {
        config.model.model = model.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn serve(config: &FileConfig, backend: Option<BackendArg>) -> Result<()> {
    let kind = match backend {
        Some(BackendArg::Google) => CalendarBackendKind::Google,
        Some(BackendArg::Memory) => CalendarBackendKind::Memory,
        None => config.calendar.backend,
    };

    let backend: Arc<dyn CalendarBackend> = match kind {
        CalendarBackendKind::Memory => Arc::new(InMemoryCalendar::new()),
        CalendarBackendKind::Google => {
            let credential = CalendarCredential::load(&config.calendar.token_file)?;
            Arc::new(GoogleCalendarBackend::new(
                credential,
                config.calendar.calendar_id.clone(),
                Duration::from_secs(config.calendar.request_timeout_secs),
            )?)
        }
    };

    let registry = calendar_registry(backend)?;
    let server = ToolServer::new(Arc::new(registry))
        .with_name(PROVIDER_NAME)
        .with_call_timeout(Duration::from_secs(config.provider.call_timeout_secs));

    info!(backend = ?kind, "Serving calendar tools on stdio");
    let state = server
        .serve(Channel::stdio(config.provider.max_frame_bytes))
        .await?;
    info!(state = ?state, "Provider stopped");
    Ok(())
}

/// Spawn the provider and discover its tools.
///
/// When the provider is this binary, it inherits the config selection flags.
async fn connect(cli: &Cli, config: &FileConfig) -> Result<Arc<ToolClient>> {
    let (command, mut args) = config.provider.resolve_command()?;
    if config.provider.command.is_none() {
        if cli.no_config {
            args.push("--no-config".to_string());
        } else if let Some(path) = &cli.config {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
    }

    info!(command = %command, "Spawning tool provider");
    let client = ToolClient::spawn(
        &command,
        &args,
        &config.provider.env,
        config.provider.max_frame_bytes,
        config.provider.client_options(),
    )
    .await
    .with_context(|| format!("Could not start tool provider '{}'", command))?;
    Ok(Arc::new(client))
}

async fn open_session(cli: &Cli, config: &FileConfig) -> Result<ConversationSession> {
    // Fail on a missing API key before a provider is spawned
    let gateway = ChatCompletionsGateway::new(
        config
            .model
            .to_gateway_config(config.agent.system_prompt.clone()),
    )?;
    let client = connect(cli, config).await?;

    let mut session = ConversationSession::new(
        Arc::new(gateway),
        client,
        config.agent.to_execution_params(),
    );
    if let Some(path) = &config.logging.conversation_log
        && let Some(logger) = JsonlConversationLogger::open_or_warn(path)
    {
        info!(path = %logger.path().display(), "Logging conversation");
        let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
        session = session.with_conversation_logger(logger);
    }
    Ok(session)
}

async fn ask(mut session: ConversationSession, request: &str, quiet: bool, verbose: bool) -> Result<ExitCode> {
    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let progress: Box<dyn AgentProgressNotifier> = if quiet {
        Box::new(NoAgentProgress)
    } else if !std::io::stderr().is_terminal() {
        Box::new(SimpleProgress)
    } else if verbose {
        Box::new(ProgressReporter::verbose())
    } else {
        Box::new(ProgressReporter::new())
    };

    let result = session.send(request, progress.as_ref()).await;
    session.close().await;

    match result {
        Ok(output) => {
            print!("{}", ConsoleFormatter::format_answer(&output));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!("Request failed: {}", e);
            eprintln!("{}", ConsoleFormatter::format_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn list_tools(cli: &Cli, config: &FileConfig, json: bool) -> Result<()> {
    let client = connect(cli, config).await?;
    let tools = client.spec().schemas();

    if json {
        let schemas = JsonSchemaToolConverter.all_tools_schema(&tools);
        println!("{}", serde_json::to_string_pretty(&schemas)?);
    } else {
        let provider = client
            .server_info()
            .map(|info| format!("{} {}", info.name, info.version))
            .unwrap_or_else(|| PROVIDER_NAME.to_string());
        print!("{}", ConsoleFormatter::format_tools(&provider, &tools));
    }

    client.shutdown().await;
    Ok(())
}
