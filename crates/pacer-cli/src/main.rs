mod config;
mod serve;
mod task_cmds;
#[cfg(test)]
mod test_util;
mod user_cmds;

use clap::{CommandFactory, Parser, Subcommand};
use sqlx::PgPool;

use pacer_db::pool;

use config::PacerConfig;

#[derive(Parser)]
#[command(name = "pacer", about = "Fitness plan and activity tracking service")]
struct Cli {
    /// Database URL (overrides PACER_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a pacer config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/pacer")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the pacer database (requires config file or env vars)
    DbInit,
    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Task catalog administration
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// User administration
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Generate a shell completion script
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task to the catalog
    Add {
        /// Task name (e.g. pushups)
        name: String,
        /// Human-readable description
        #[arg(long)]
        description: Option<String>,
        /// Duration: hours component
        #[arg(long, default_value_t = 0)]
        hours: i32,
        /// Duration: minutes component (0-59)
        #[arg(long, default_value_t = 0)]
        minutes: i32,
    },
    /// List the task catalog
    List,
    /// Remove a task from the catalog
    Remove {
        /// Task ID to remove
        task_id: i64,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user and print their API bearer token
    Add {
        /// Unique username
        username: String,
    },
    /// List all users
    List,
}

/// `pacer init`: generate a signing secret and write the config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    println!();
    println!("Next: run `pacer db-init` to create and migrate the database.");

    Ok(())
}

/// `pacer db-init`: create the database if needed and bring it up to date.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = PacerConfig::resolve(cli_db_url)?;

    println!("Initializing pacer database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run the embedded migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("pacer db-init complete.");
    Ok(())
}

/// Resolve config and open a pool, for the commands that talk to the
/// database.
async fn connect(cli_db_url: Option<&str>) -> anyhow::Result<(PacerConfig, PgPool)> {
    let resolved = PacerConfig::resolve(cli_db_url)?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    Ok((resolved, db_pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let (resolved, db_pool) = connect(cli.database_url.as_deref()).await?;
            let result = serve::run_serve(db_pool.clone(), resolved.tokens, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Task { command } => {
            let (_, db_pool) = connect(cli.database_url.as_deref()).await?;
            let result = task_cmds::run_task_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::User { command } => {
            let (resolved, db_pool) = connect(cli.database_url.as_deref()).await?;
            let result = user_cmds::run_user_command(command, &db_pool, &resolved.tokens).await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
