//! Graph-wide subcommands: stats, paths and reload.

use clap::Parser;
use color_eyre::Result;

use crate::context::Context;
use crate::models::NodeId;
use crate::services::GraphService;

use super::{print_json, tenants_or_default};

/// Graph statistics.
#[derive(Parser)]
pub struct StatsCommand {
    /// Tenant to count (repeatable). Defaults to `explorer.tenant_ids`.
    #[arg(short, long = "tenant")]
    pub tenants: Vec<String>,
}

impl StatsCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let service: GraphService = ctx.resolve();
        print_json(&service.stats(&tenants_or_default(ctx, &self.tenants)).await?)
    }
}

/// Find paths between two nodes.
#[derive(Parser)]
pub struct PathsCommand {
    pub from: NodeId,
    pub to: NodeId,

    /// Maximum path length in hops.
    #[arg(long, default_value = "4")]
    pub max_depth: u32,
}

impl PathsCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let service: GraphService = ctx.resolve();
        let paths = service.find_paths(self.from, self.to, self.max_depth).await?;
        if paths.paths.is_empty() {
            tracing::info!(from = self.from, to = self.to, "No path found");
        }
        print_json(&paths)
    }
}

pub(super) async fn run_reload(ctx: &Context) -> Result<()> {
    let service: GraphService = ctx.resolve();
    print_json(&service.reload().await?)
}
