use clap::Parser;
use postboard::{
    cli::{Cli, Command},
    config::{self, Config},
    context, seed, Postboard,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt as _};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::ConfigTemplate) => config::print_config_template(),
        Some(Command::ConfigInit { config_path }) => {
            config::init_config(config_path)?;
        }
        Some(Command::Migrate { args }) => {
            let config = Config::load(args.config_path)?;
            context::create_context(config).await?;
            info!("database is up to date");
        }
        Some(Command::Seed { args, users, posts }) => {
            let config = Config::load(args.config_path)?;
            let context = context::create_context(config).await?;
            seed::seed(&context.database, users, posts).await?;
        }
        None => {
            let config = Config::load(cli.args.config_path)?;
            Postboard::boot(config).await?.serve().await?;
        }
    }

    Ok(())
}
