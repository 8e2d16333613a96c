//! Read-only database commands.

use clap::Args;
use serde::Serialize;

use super::util::print_value;
use crate::config::Backend;
use crate::{config, Cli};

/// List enrolled identities.
#[derive(Args)]
pub struct ListCommand {}

/// Show database and configuration summary.
#[derive(Args)]
pub struct InspectCommand {}

#[derive(Serialize)]
struct IdentitySummary<'a> {
    name: &'a str,
    samples: usize,
    handle: u64,
}

#[derive(Serialize)]
struct Inspection {
    db_path: String,
    backend: Backend,
    dim: usize,
    threshold: f32,
    normalize: bool,
    identities: usize,
    samples: usize,
    next_handle: u64,
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = config::from_cli(cli)?;
        let engine = cfg.open_engine()?;

        let list: Vec<IdentitySummary<'_>> = engine
            .store()
            .identities()
            .map(|i| IdentitySummary {
                name: i.name(),
                samples: i.sample_count(),
                handle: i.handle().raw(),
            })
            .collect();
        print_value(cli, &list)
    }
}

impl InspectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = config::from_cli(cli)?;
        let engine = cfg.open_engine()?;
        let store = engine.store();

        print_value(
            cli,
            &Inspection {
                db_path: cfg.db_path()?.display().to_string(),
                backend: cfg.backend,
                dim: store.dim(),
                threshold: cfg.engine.threshold,
                normalize: cfg.engine.normalize,
                identities: store.len(),
                samples: store.sample_count(),
                next_handle: store.next_handle(),
            },
        )
    }
}
