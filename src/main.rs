use anyhow::{Context, Result};
use auth0_actions::auth0::http::format_management_error;
use auth0_actions::auth0::ManagementClient;
use auth0_actions::config::Config;
use auth0_actions::resource::action::{self, TYPE_NAME};
use auth0_actions::{PlanAction, Provider, ResourceState, StateFile};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Declarative management of Auth0 actions
#[derive(Parser, Debug)]
#[command(name = "auth0-actions", version, about, long_about = None)]
struct Args {
    /// State file to read and write
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Auth0 tenant domain (overrides AUTH0_DOMAIN)
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a desired-state file without calling the API
    Validate { file: PathBuf },
    /// Show what apply would change
    Plan { file: PathBuf },
    /// Create, update or replace actions to match the file, delete the rest
    Apply { file: PathBuf },
    /// Re-read every action in state
    Refresh,
    /// Delete one action, or every action in state
    Destroy { address: Option<String> },
    /// Adopt an existing action: `import login_flow <action-id>`
    Import { name: String, id: String },
    /// Print the attributes of the action resource
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("auth0-actions started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("auth0-actions").join("auth0-actions.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".auth0-actions").join("auth0-actions.log");
    }
    PathBuf::from("auth0-actions.log")
}

/// Desired-state file
#[derive(Debug, Deserialize)]
struct DesiredFile {
    #[serde(default)]
    actions: BTreeMap<String, Map<String, Value>>,
}

impl DesiredFile {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Desired configuration keyed by state address
    fn by_address(self) -> BTreeMap<String, Map<String, Value>> {
        self.actions
            .into_iter()
            .map(|(name, config)| (address(&name), config))
            .collect()
    }
}

fn address(name: &str) -> String {
    if name.starts_with(&format!("{}.", TYPE_NAME)) {
        name.to_string()
    } else {
        format!("{}.{}", TYPE_NAME, name)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Warning: {err:#}");
            None
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("Error: {}", format_management_error(&err));
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let state_path = args.state.clone().unwrap_or_else(StateFile::default_path);

    match args.command {
        Command::Validate { ref file } => validate(file),
        Command::Schema => {
            print_schema();
            Ok(())
        }
        Command::Plan { ref file } => {
            let provider = build_provider(&args)?;
            plan(&provider, file, &state_path).await
        }
        Command::Apply { ref file } => {
            let provider = build_provider(&args)?;
            apply(&provider, file, &state_path).await
        }
        Command::Refresh => {
            let provider = build_provider(&args)?;
            refresh(&provider, &state_path).await
        }
        Command::Destroy { ref address } => {
            let provider = build_provider(&args)?;
            destroy(&provider, address.as_deref(), &state_path).await
        }
        Command::Import { ref name, ref id } => {
            let provider = build_provider(&args)?;
            import(&provider, name, id, &state_path).await
        }
    }
}

fn build_provider(args: &Args) -> Result<Provider> {
    let mut config = Config::load();
    if let Some(domain) = &args.domain {
        config.domain = Some(domain.clone());
        config.base_url = None;
    }
    tracing::debug!("Using config {:?}", config);

    let client = ManagementClient::with_base_url(&config.effective_base_url()?, config.credentials()?)?;
    Ok(Provider::new(Arc::new(client)))
}

fn validate(file: &Path) -> Result<()> {
    let desired = DesiredFile::load(file)?.by_address();
    let mut problems = 0;

    for (address, config) in &desired {
        for diagnostic in action::schema().validate_config(config) {
            println!("{}: {}", address, diagnostic);
            problems += 1;
        }
    }

    if problems > 0 {
        anyhow::bail!("{} problem(s) found in {}", problems, file.display());
    }
    println!("{} action(s) valid", desired.len());
    Ok(())
}

fn print_schema() {
    println!("{}", TYPE_NAME);
    for (name, field) in &action::schema().fields {
        let mut flags = Vec::new();
        if field.required {
            flags.push("required");
        }
        if field.optional {
            flags.push("optional");
        }
        if field.computed {
            flags.push("computed");
        }
        if field.force_new {
            flags.push("forces replacement");
        }
        if field.sensitive {
            flags.push("sensitive");
        }
        println!(
            "  {:<20} {:<14} [{}] {}",
            name,
            field.field_type.to_string(),
            flags.join(", "),
            field.description
        );
    }
}

/// Refresh every resource in state, dropping those deleted remotely
async fn refresh_all(provider: &Provider, state: &mut StateFile) -> Result<()> {
    let addresses: Vec<String> = state.resources.keys().cloned().collect();
    for address in addresses {
        let Some(current) = state.get(&address).cloned() else {
            continue;
        };
        let refreshed = provider
            .refresh(&current)
            .await
            .with_context(|| format!("Failed to refresh {}", address))?;
        if refreshed.is_none() {
            println!("{}: deleted outside of auth0-actions, removing from state", address);
        }
        state.set(&address, refreshed);
    }
    Ok(())
}

async fn plan(provider: &Provider, file: &Path, state_path: &Path) -> Result<()> {
    let desired = DesiredFile::load(file)?.by_address();
    let mut state = StateFile::load(state_path)?;
    refresh_all(provider, &mut state).await?;

    let mut changes = 0;
    for (address, config) in &desired {
        let plan = provider.plan(TYPE_NAME, state.get(address), config)?;
        if plan.action == PlanAction::NoOp {
            continue;
        }
        changes += 1;
        if plan.replace_because.is_empty() {
            println!("{}: {} ({})", address, plan.action, plan.changed.join(", "));
        } else {
            println!(
                "{}: {} (forced by {})",
                address,
                plan.action,
                plan.replace_because.join(", ")
            );
        }
    }

    for address in orphans(&state, &desired) {
        changes += 1;
        println!("{}: destroy", address);
    }

    if changes == 0 {
        println!("No changes. Actions match the configuration.");
    }
    Ok(())
}

fn orphans(state: &StateFile, desired: &BTreeMap<String, Map<String, Value>>) -> Vec<String> {
    state
        .resources
        .iter()
        .filter(|(address, s)| s.type_name == TYPE_NAME && !desired.contains_key(*address))
        .map(|(address, _)| address.clone())
        .collect()
}

async fn apply(provider: &Provider, file: &Path, state_path: &Path) -> Result<()> {
    let desired = DesiredFile::load(file)?.by_address();

    // Refuse before touching anything if the configuration is invalid
    for config in desired.values() {
        provider.plan(TYPE_NAME, None, config)?;
    }

    let mut state = StateFile::load(state_path)?;
    refresh_all(provider, &mut state).await?;
    state.save(state_path)?;

    let mut failures = 0;
    for (address, config) in &desired {
        let prior = state.get(address).cloned();
        let result = provider.apply(TYPE_NAME, prior.as_ref(), config).await;

        match &result.error {
            Some(err) => {
                failures += 1;
                eprintln!("{}: {}", address, format_management_error(err));
                tracing::error!("{}: {:#}", address, err);
            }
            None => match (&prior, &result.state) {
                (Some(before), Some(after)) if before == after => {}
                (_, Some(after)) => println!("{}: applied (id {})", address, after.id),
                (_, None) => println!("{}: gone", address),
            },
        }

        state.set(address, result.state);
        state.save(state_path)?;
    }

    for address in orphans(&state, &desired) {
        if let Err(err) = destroy_one(provider, &mut state, &address).await {
            failures += 1;
            eprintln!("{}: {}", address, format_management_error(&err));
        }
        state.save(state_path)?;
    }

    if failures > 0 {
        anyhow::bail!("{} resource(s) failed to apply", failures);
    }
    Ok(())
}

async fn destroy_one(provider: &Provider, state: &mut StateFile, address: &str) -> Result<()> {
    let Some(current) = state.get(address).cloned() else {
        anyhow::bail!("{} is not in state", address);
    };
    provider.destroy(&current.type_name, &current).await?;
    state.set(address, None);
    println!("{}: destroyed", address);
    Ok(())
}

async fn refresh(provider: &Provider, state_path: &Path) -> Result<()> {
    let mut state = StateFile::load(state_path)?;
    refresh_all(provider, &mut state).await?;
    state.save(state_path)?;
    println!("{} action(s) in state", state.resources.len());
    Ok(())
}

async fn destroy(provider: &Provider, target: Option<&str>, state_path: &Path) -> Result<()> {
    let mut state = StateFile::load(state_path)?;

    let addresses: Vec<String> = match target {
        Some(name) => vec![address(name)],
        None => state.resources.keys().cloned().collect(),
    };

    for address in addresses {
        let result = destroy_one(provider, &mut state, &address).await;
        state.save(state_path)?;
        result?;
    }
    Ok(())
}

async fn import(provider: &Provider, name: &str, id: &str, state_path: &Path) -> Result<()> {
    let address = address(name);
    let mut state = StateFile::load(state_path)?;

    if state.get(&address).is_some() {
        anyhow::bail!("{} is already managed, remove it from state first", address);
    }

    let imported: ResourceState = provider.import(TYPE_NAME, id).await?;
    println!("{}: imported (id {})", address, imported.id);
    state.set(&address, Some(imported));
    state.save(state_path)
}
