// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{AdminArgs, AdminCommands, Cli, Commands};
use shadow_core::auth::password::{generate_secret, hash_password};
use shadow_core::auth::signup::MIN_PASSWORD_LEN;
use shadow_core::store::{AdminStore, PgStore};
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::GenerateSecret { length } => {
            if *length < 32 {
                return Err(Error::Custom("secret length must be at least 32".into()));
            }
            println!("{}", generate_secret(*length));
        }
        Commands::Admin { command } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(admin(command))?;
        }
    }

    Ok(())
}

async fn open_store(args: &AdminArgs) -> Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&args.database_url)
        .await?;
    shadow_core::migrate::migrate(&pool).await?;
    Ok(PgStore::new(pool))
}

fn checked_hash(password: &str) -> Result<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Custom(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(hash_password(password)?)
}

async fn admin(command: &AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Create(args) => {
            let hash = checked_hash(&args.password)?;
            let store = open_store(args).await?;
            store.insert_admin(&args.username, &hash).await?;
            log::info!("created admin account {}", args.username);
        }
        AdminCommands::SetPassword(args) => {
            let hash = checked_hash(&args.password)?;
            let store = open_store(args).await?;
            if !store.update_admin_password(&args.username, &hash).await? {
                return Err(Error::Custom(format!(
                    "no admin account named {}",
                    args.username
                )));
            }
            log::info!("updated password for admin account {}", args.username);
        }
    }
    Ok(())
}
