//! Enrollment command.

use clap::Args;
use serde::Serialize;

use super::util::{print_value, VectorReader};
use crate::{config, Cli};

/// Add embedding samples for a named identity.
#[derive(Args)]
pub struct EnrollCommand {
    /// Identity name (case-sensitive)
    name: String,

    /// JSON-lines file of vectors (default: stdin)
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Use at most this many samples from the input
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct EnrollSummary<'a> {
    name: &'a str,
    added: usize,
    total_samples: usize,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = config::from_cli(cli)?;
        let mut engine = cfg.open_engine()?;

        let limit = self.limit.unwrap_or(usize::MAX);
        let vectors = VectorReader::open(self.input.as_deref())?
            .take(limit)
            .collect::<anyhow::Result<Vec<_>>>()?;
        if vectors.is_empty() {
            anyhow::bail!("no vectors to enroll for '{}'", self.name);
        }

        {
            let mut session = engine.begin_enrollment(&self.name, vectors.len())?;
            for v in &vectors {
                session.submit(v)?;
            }
        }
        engine.flush()?;

        let total_samples = engine
            .store()
            .identity(&self.name)
            .map(|i| i.sample_count())
            .unwrap_or(0);
        print_value(
            cli,
            &EnrollSummary {
                name: &self.name,
                added: vectors.len(),
                total_samples,
            },
        )
    }
}
