//! gr - run one command under a gridrun execution backend.
//!
//! Usage:
//!   gr run [-c CONFIG] [-b BACKEND] -- <command>...   Run a command as a task
//!   gr validate <CONFIG>                              Check a configuration file
//!   gr status [-c CONFIG] <JOB_ID>                    Query a scheduler job

use clap::{Parser, Subcommand};
use gridrun::{
    create_backend, AbortFlag, BackendKind, CommandTask, Config, Event, EventBus, EventHandler,
    GridClient, JobId, ResourceAllocation, TaskStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// gr - run tasks locally or on a batch scheduler
#[derive(Parser)]
#[command(name = "gr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command as a task under the configured backend
    Run {
        /// Path to a YAML configuration file
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured backend (local or grid)
        #[arg(short, long)]
        backend: Option<String>,

        /// Task name (default: the program name)
        #[arg(short, long)]
        name: Option<String>,

        /// Directory the task runs in
        #[arg(short, long, value_name = "DIR")]
        job_dir: Option<PathBuf>,

        /// Print the terminal report as JSON
        #[arg(long)]
        json: bool,

        /// The command to execute
        #[arg(value_name = "COMMAND", required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Validate a configuration file without running anything
    Validate {
        /// Path to a YAML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Query the scheduler for a job's status snapshot
    Status {
        /// Path to a YAML configuration file
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// The job id to query
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },
}

/// Event handler that logs lifecycle events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::JobSubmitted {
                task_id, job_id, ..
            } => {
                info!("task '{}' submitted as job '{}'", task_id, job_id);
            }
            Event::TaskStarted { task_id, .. } => {
                info!("task '{}' started", task_id);
            }
            Event::TaskCompleted {
                task_id,
                duration,
                exit_code,
                ..
            } => {
                let exit_info = exit_code
                    .map(|c| format!(" (exit: {})", c))
                    .unwrap_or_default();
                info!("task '{}' completed in {:?}{}", task_id, duration, exit_info);
            }
            Event::TaskFailed { task_id, error, .. } => {
                error!("task '{}' failed: {}", task_id, error);
            }
            Event::TaskAborted {
                task_id, duration, ..
            } => {
                warn!("task '{}' aborted after {:?}", task_id, duration);
            }
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, gridrun::ConfigError> {
    match path {
        Some(path) => Config::from_yaml_file(path),
        None => Ok(Config::default()),
    }
}

async fn run_command(
    config: Option<PathBuf>,
    backend_name: Option<String>,
    name: Option<String>,
    job_dir: Option<PathBuf>,
    json: bool,
    command: Vec<String>,
) -> i32 {
    let mut config = match load_config(config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {}", err);
            return 2;
        }
    };
    if let Some(name) = backend_name {
        config.backend = match name.parse::<BackendKind>() {
            Ok(kind) => kind,
            Err(err) => {
                error!("{}", err);
                return 2;
            }
        };
    }

    let (program, args) = command.split_first().expect("clap requires a command");
    let mut builder = CommandTask::builder(program).args(args.iter().cloned());
    if let Some(name) = name {
        builder = builder.name(name);
    }
    if let Some(dir) = job_dir {
        builder = builder.job_dir(dir);
    }
    let task = builder.build();

    let events = EventBus::new();
    events.register(Arc::new(LoggingHandler)).await;
    let backend = create_backend(&config, events);
    info!("using {} backend", backend.kind());

    let abort = AbortFlag::new();
    let ctrl_c_abort = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting task");
            ctrl_c_abort.set();
        }
    });

    let report = match backend.run(&task, &ResourceAllocation::none(), &abort).await {
        Ok(report) => report,
        Err(err) => {
            error!("task supervision failed: {}", err);
            return 1;
        }
    };

    if json {
        let payload = serde_json::json!({
            "task": report.task_id.as_str(),
            "run": report.run_id.to_string(),
            "status": report.status,
            "exit_code": report.exit_code,
            "duration_ms": report.duration.as_millis() as u64,
            "error": report.error,
            "diagnostics": report.diagnostics,
        });
        println!("{}", payload);
    } else if let Some(error) = &report.error {
        eprintln!("task '{}' {}: {}", report.task_id, report.status, error);
        for line in &report.diagnostics {
            eprintln!("  {}", line);
        }
    } else {
        println!("task '{}' {}", report.task_id, report.status);
    }

    match report.status {
        TaskStatus::Done => 0,
        TaskStatus::Aborted => 130,
        _ => 1,
    }
}

fn validate_command(config: PathBuf) -> i32 {
    match Config::from_yaml_file(&config) {
        Ok(config) => {
            println!("backend: {}", config.backend);
            if config.backend == BackendKind::Grid && config.grid.is_empty() {
                warn!("grid backend selected but the grid configuration is empty");
                return 1;
            }
            println!("ok");
            0
        }
        Err(err) => {
            error!("invalid configuration: {}", err);
            2
        }
    }
}

async fn status_command(config: Option<PathBuf>, job_id: String) -> i32 {
    let config = match load_config(config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {}", err);
            return 2;
        }
    };

    let client = GridClient::new(config.grid);
    match client.status(&JobId::new(job_id.as_str())).await {
        Ok(snapshot) if snapshot.is_empty() => {
            println!("job '{}' is not known to the scheduler", job_id);
            1
        }
        Ok(snapshot) => {
            let mut fields: Vec<_> = snapshot.fields().collect();
            fields.sort();
            for (key, value) in fields {
                println!("{} = {}", key, value);
            }
            0
        }
        Err(err) => {
            error!("status query failed: {}", err);
            2
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Run {
            config,
            backend,
            name,
            job_dir,
            json,
            command,
        } => run_command(config, backend, name, job_dir, json, command).await,
        Commands::Validate { config } => validate_command(config),
        Commands::Status { config, job_id } => status_command(config, job_id).await,
    };
    std::process::exit(code);
}
