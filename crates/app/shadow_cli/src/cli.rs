use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shadow_cli", version, about = "ShadowHacker admin CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Manage admin accounts.
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Print a random signing secret.
    GenerateSecret {
        /// Secret length in characters.
        #[arg(long, default_value_t = 64)]
        length: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    /// Create an admin account.
    Create(AdminArgs),

    /// Replace an admin account's password.
    SetPassword(AdminArgs),
}

#[derive(Args, Debug)]
pub struct AdminArgs {
    /// Admin username.
    pub username: String,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Password for the account.
    #[arg(long, env = "SHADOW_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}
