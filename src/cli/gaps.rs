//! Gap detection subcommands.

use clap::Parser;
use color_eyre::Result;

use crate::context::Context;
use crate::services::{ExplorerSession, GapDetectionEngine, SearchParams};

use super::{print_json, tenants_or_default};

/// List nodes that have no edges.
#[derive(Parser)]
pub struct OrphansCommand {
    /// Tenant to inspect (repeatable). Defaults to `explorer.tenant_ids`.
    #[arg(short, long = "tenant")]
    pub tenants: Vec<String>,

    /// Ask the backend instead of checking a locally loaded listing.
    #[arg(long)]
    pub remote: bool,
}

impl OrphansCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let tenant_ids = tenants_or_default(ctx, &self.tenants);

        if self.remote {
            let gaps: GapDetectionEngine = ctx.resolve();
            return print_json(&gaps.remote_orphans(&tenant_ids).await?);
        }

        let session = ExplorerSession::new(ctx);
        let mut params = SearchParams::from_config("", &ctx.config.explorer);
        params.tenant_ids = tenant_ids.clone();
        let outcome = session.search(&params).await;
        if let Some(error) = outcome.error {
            return Err(color_eyre::eyre::eyre!("Loading nodes failed: {}", error));
        }

        let tenant = match tenant_ids.as_slice() {
            [single] => Some(single.as_str()),
            _ => None,
        };
        print_json(&session.orphans(tenant))
    }
}

/// List schema indexes without query examples.
#[derive(Parser)]
pub struct GapsCommand {
    /// Tenant to inspect (repeatable). Defaults to `explorer.tenant_ids`.
    #[arg(short, long = "tenant")]
    pub tenants: Vec<String>,
}

impl GapsCommand {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let gaps: GapDetectionEngine = ctx.resolve();
        let missing = gaps
            .missing_examples(&tenants_or_default(ctx, &self.tenants))
            .await?;
        tracing::info!(count = missing.len(), "Schema indexes without examples");
        print_json(&missing)
    }
}
