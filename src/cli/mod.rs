//! CLI module for kgconsole.
//!
//! Subcommands:
//! - `search`: Search (or list) nodes and print the laid-out view
//! - `expand`: Expand a node's neighbourhood
//! - `orphans`: List nodes without edges
//! - `gaps`: List schema indexes without query examples
//! - `suggest`: Ranked connection suggestions for a node
//! - `stats`, `paths`, `reload`: Graph-wide backend operations

mod expand;
mod gaps;
mod graph;
mod search;
mod suggest;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use serde::Serialize;

use crate::config::Config;
use crate::context::Context;

pub use expand::ExpandCommand;
pub use gaps::{GapsCommand, OrphansCommand};
pub use graph::{PathsCommand, StatsCommand};
pub use search::SearchCommand;
pub use suggest::SuggestCommand;

/// kgconsole - Knowledge Graph Console
#[derive(Parser)]
#[command(name = "kgconsole")]
#[command(about = "Explore, lay out and curate a multi-tenant knowledge graph")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search nodes (empty query lists them) and print the laid-out view
    Search(SearchCommand),

    /// Expand the neighbourhood of a node
    Expand(ExpandCommand),

    /// List nodes that have no edges
    Orphans(OrphansCommand),

    /// List schema indexes that have no query examples
    Gaps(GapsCommand),

    /// Ranked connection suggestions for a node
    Suggest(SuggestCommand),

    /// Graph statistics
    Stats(StatsCommand),

    /// Find paths between two nodes
    Paths(PathsCommand),

    /// Force the backend to rebuild its graph
    Reload,
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> Result<()> {
        let ctx = load_context()?;
        match self.command {
            Command::Search(cmd) => cmd.run(&ctx).await,
            Command::Expand(cmd) => cmd.run(&ctx).await,
            Command::Orphans(cmd) => cmd.run(&ctx).await,
            Command::Gaps(cmd) => cmd.run(&ctx).await,
            Command::Suggest(cmd) => cmd.run(&ctx).await,
            Command::Stats(cmd) => cmd.run(&ctx).await,
            Command::Paths(cmd) => cmd.run(&ctx).await,
            Command::Reload => graph::run_reload(&ctx).await,
        }
    }
}

fn load_context() -> Result<Context> {
    let config = Config::load()?;
    tracing::debug!(base_url = %config.api.base_url, "Loaded configuration");
    Ok(Context::from_config(config)?)
}

/// Tenants given on the command line, else the configured ones.
fn tenants_or_default(ctx: &Context, tenants: &[String]) -> Vec<String> {
    if tenants.is_empty() {
        ctx.config.explorer.tenant_ids.clone()
    } else {
        tenants.to_vec()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
