use crate::cli::{Cli, Commands};
use crate::config::{Config, ProfileOverrides};
use anyhow::Result;

mod check;
mod kv;
mod profiles;
mod push;
mod tail;

pub fn execute(cli: Cli) -> Result<()> {
    let overrides = ProfileOverrides {
        profile: cli.profile,
        account_id: cli.account_id,
        api_token: cli.api_token,
    };

    // Load config once - every command resolves against the same view
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Push { script, name } => push::execute(&config, &overrides, &script, name),

        Commands::Tail { port } => tail::execute(port),

        Commands::Kv(action) => kv::execute(&config, &overrides, action),

        Commands::Profiles => profiles::execute(&config),

        Commands::Check => check::execute(&config),
    }
}
