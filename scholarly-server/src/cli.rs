//! Process entry-point flags (§6: "CLI flags > environment variables >
//! `config.toml` > built-in defaults"). Grounded on the teacher's
//! `llmspell-cli/src/cli.rs` use of `clap::Parser` for the top-level
//! binary args.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "scholarly-server", about = "Scholarly agent HTTP server")]
pub struct Args {
    /// Use an in-process conversation store instead of Postgres. Useful
    /// for local development without a database.
    #[arg(long)]
    pub in_memory_store: bool,

    /// Overrides `ProcessConfig::http_port`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Overrides `ProcessConfig::database_url`.
    #[arg(long)]
    pub database_url: Option<String>,
}
