//! Suggest subcommand.

use clap::Parser;
use color_eyre::Result;

use crate::context::Context;
use crate::models::NodeId;
use crate::services::GapDetectionEngine;

use super::print_json;

/// Ranked connection suggestions for a node.
#[derive(Parser)]
pub struct SuggestCommand {
    /// Node to find connections for.
    pub node_id: NodeId,

    /// Maximum suggestions. Defaults to `explorer.suggestion_limit`.
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Apply the suggestion targeting this node.
    #[arg(long)]
    pub apply: Option<NodeId>,
}

impl SuggestCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let gaps: GapDetectionEngine = ctx.resolve();
        let limit = self.limit.unwrap_or(ctx.config.explorer.suggestion_limit);
        let suggestions = gaps.fetch_suggestions(self.node_id, limit).await?;

        match self.apply {
            Some(target_id) => print_json(&gaps.apply(target_id).await?),
            None => print_json(&suggestions),
        }
    }
}
