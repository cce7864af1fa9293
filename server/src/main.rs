mod config;
mod graphql;
mod http;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect, ensure_studio_user};
use platform_obs::{ObsConfig, init_tracing};
use products_promises::CacheBus;
use products_promises::seed::seed_studio;
use tracing::info;

use crate::{
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "studio-server", version, about = "Studio commercial pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Create a studio with its default stages and lookup catalogs.
    Seed(SeedCommand),
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[derive(Args, Debug)]
struct SeedCommand {
    /// Studio slug; defaults to DEFAULT_STUDIO_SLUG.
    #[arg(long)]
    slug: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Platform user id to register as a studio member.
    #[arg(long)]
    owner: Option<uuid::Uuid>,
    #[arg(long, default_value = "Administrador")]
    owner_name: String,
}

impl From<ServeCommand> for ServeConfig {
    fn from(value: ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed(cmd) => run_seed(cmd, &app_config).await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

async fn run_seed(cmd: SeedCommand, config: &AppConfig) -> Result<()> {
    let pool = setup_pool().await?;
    let slug = cmd.slug.unwrap_or_else(|| config.default_studio_slug.clone());
    let name = cmd.name.unwrap_or_else(|| config.default_studio_name.clone());
    let seeded = seed_studio(&pool, &slug, &name).await?;
    info!(
        studio = %seeded.studio.slug,
        stages = seeded.stages.len(),
        channels = seeded.channels.len(),
        "studio seeded"
    );
    if let Some(platform_user_id) = cmd.owner {
        let member =
            ensure_studio_user(&pool, seeded.studio.id, platform_user_id, &cmd.owner_name).await?;
        info!(studio_user = %member.id, %platform_user_id, "studio member registered");
    }
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let graphql_data = GraphqlData {
        pool: pool.clone(),
        cache: CacheBus::new(config.log_cache_ttl),
    };
    let schema = graphql::build_schema(graphql_data);
    let state = AppState {
        pool,
        schema,
        config: config.clone(),
    };
    http::serve(cmd.into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `cargo run -p server -- migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}
