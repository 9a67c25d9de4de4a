mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ow_core::config::{Config, LogFormat, TaskSource};

use commands::AppContext;

/// orgwatch -- keep an eye on a project-automation backend: tasks,
/// dependencies, budget and artifacts.
#[derive(Parser)]
#[command(name = "orgwatch", version, about)]
struct Cli {
    /// Config file (default: ~/.orgwatch/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding [api].base_url.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Graph,
    Backlog,
}

impl From<SourceArg> for TaskSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Graph => TaskSource::Graph,
            SourceArg::Backlog => TaskSource::Backlog,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend and report refreshes, budget alerts and errors
    /// (default when no subcommand is given).
    Watch {
        /// Poll interval in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Endpoint that supplies the task list.
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },

    /// One refresh, then a budget and backlog summary.
    Status,

    /// Print the dependency graph model as JSON.
    Graph {
        /// Add random node positions.
        #[arg(long)]
        layout: bool,
    },

    /// Show one task and its artifacts.
    Task {
        /// Task id.
        id: String,
    },

    /// Submit a new purpose and print the generated blueprint.
    Purpose {
        /// Purpose text.
        text: String,
    },

    /// Log in and store the access token.
    Login {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Remove the stored access token.
    Logout,

    /// Manage prompt templates.
    #[command(subcommand)]
    Templates(TemplateCommands),
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List template names.
    List,
    /// Print a template.
    Show { name: String },
    /// Upload a template from a file.
    Save { name: String, file: PathBuf },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(Commands::Watch {
        interval_ms,
        source,
    }) = &cli.command
    {
        if let Some(ms) = interval_ms {
            config.sync.interval_ms = *ms;
        }
        if let Some(source) = source {
            config.sync.task_source = (*source).into();
        }
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let level = config.general.log_level.clone();
    if cli.json_logs || config.general.log_format == LogFormat::Json {
        ow_telemetry::logging::init_logging_json("orgwatch", &level);
    } else {
        ow_telemetry::logging::init_logging("orgwatch", &level);
    }

    let ctx = AppContext::new(config);
    match cli.command {
        None | Some(Commands::Watch { .. }) => commands::watch::run(&ctx).await?,
        Some(Commands::Status) => commands::status::run(&ctx).await?,
        Some(Commands::Graph { layout }) => commands::graph::run(&ctx, layout).await?,
        Some(Commands::Task { id }) => commands::task::run(&ctx, &id).await?,
        Some(Commands::Purpose { text }) => commands::purpose::run(&ctx, &text).await?,
        Some(Commands::Login { username, password }) => {
            commands::login::run(&ctx, &username, password).await?
        }
        Some(Commands::Logout) => commands::login::logout(&ctx)?,
        Some(Commands::Templates(cmd)) => match cmd {
            TemplateCommands::List => commands::templates::list(&ctx).await?,
            TemplateCommands::Show { name } => commands::templates::show(&ctx, &name).await?,
            TemplateCommands::Save { name, file } => {
                commands::templates::save(&ctx, &name, &file).await?
            }
        },
    }

    Ok(())
}
