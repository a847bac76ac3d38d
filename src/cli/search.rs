//! Search subcommand - run a search and print the laid-out view.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::Context;
use crate::graph::{Direction, GraphFilter};
use crate::models::{HeatPeriod, NodeId, NodeType};
use crate::services::{ExplorerSession, RenderGraph, SearchParams, ViewMode};

use super::{print_json, tenants_or_default};

/// Search the knowledge graph.
#[derive(Parser)]
pub struct SearchCommand {
    /// Free-text query. Omit to list nodes.
    #[arg(default_value = "")]
    pub query: String,

    /// Tenant to search (repeatable). Defaults to `explorer.tenant_ids`.
    #[arg(short, long = "tenant")]
    pub tenants: Vec<String>,

    /// Restrict to a node type (repeatable).
    #[arg(long = "type")]
    pub node_types: Vec<NodeType>,

    /// Expansion depth.
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Maximum entry points or listed nodes.
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Drop `shared_tag` and `similar` edges.
    #[arg(long)]
    pub no_implicit: bool,

    /// Layout direction (TB or LR).
    #[arg(long)]
    pub direction: Option<Direction>,

    /// Decorate nodes with usage heat for this period (7d, 30d, 90d, all).
    #[arg(long)]
    pub heat: Option<HeatPeriod>,

    /// Read queries from stdin, one per line, debounced like typed input.
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(Serialize)]
struct SearchReport {
    total_nodes: usize,
    type_histogram: BTreeMap<NodeType, usize>,
    search_matches: BTreeSet<NodeId>,
    graph: RenderGraph,
}

impl SearchCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let explorer = &ctx.config.explorer;
        let mut params = SearchParams::from_config(self.query, explorer);
        params.tenant_ids = tenants_or_default(ctx, &self.tenants);
        if !self.node_types.is_empty() {
            params.node_types = Some(self.node_types);
        }
        params.depth = self.depth.unwrap_or(params.depth);
        params.limit = self.limit.unwrap_or(params.limit);
        params.include_implicit = params.include_implicit && !self.no_implicit;

        let session = Arc::new(ExplorerSession::new(ctx));
        let outcome = if self.interactive {
            let typing = session.type_ahead(params);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                typing.push(line);
            }
            typing
                .finish()
                .await
                .ok_or_else(|| color_eyre::eyre::eyre!("No query read from stdin"))?
        } else {
            session.search(&params).await
        };
        if let Some(error) = outcome.error {
            return Err(color_eyre::eyre::eyre!("Search failed: {}", error));
        }

        if let Some(direction) = self.direction {
            session.set_direction(direction);
        }
        if let Some(period) = self.heat {
            session.set_heat_period(period).await?;
            session.set_view_mode(ViewMode::Heat).await?;
        }

        print_json(&SearchReport {
            total_nodes: outcome.total_nodes,
            type_histogram: outcome.type_histogram,
            search_matches: outcome.search_matches,
            graph: session.render(&GraphFilter::all()),
        })
    }
}
