//! Expand subcommand.

use clap::Parser;
use color_eyre::Result;

use crate::context::Context;
use crate::models::{EdgeType, NodeId, NodeType};
use crate::services::{ExpandParams, ExplorerSession};

use super::print_json;

/// Expand the neighbourhood of a node.
#[derive(Parser)]
pub struct ExpandCommand {
    /// Center node id.
    pub node_id: NodeId,

    /// Hops to follow.
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Keep only neighbours of this type (repeatable).
    #[arg(long = "type")]
    pub node_types: Vec<NodeType>,

    /// Traverse only this edge type (repeatable).
    #[arg(long = "edge-type")]
    pub edge_types: Vec<EdgeType>,
}

impl ExpandCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let mut params = ExpandParams::new(
            self.node_id,
            self.depth.unwrap_or(ctx.config.explorer.depth),
        );
        if !self.node_types.is_empty() {
            params.node_types = Some(self.node_types);
        }
        params.edge_types = self.edge_types;

        let session = ExplorerSession::new(ctx);
        let outcome = session.expand(&params).await;
        if let Some(error) = outcome.error {
            return Err(color_eyre::eyre::eyre!("Expand failed: {}", error));
        }
        if outcome.edges_approximate {
            tracing::info!("Edges are synthesized from the center node only");
        }
        print_json(&outcome)
    }
}
