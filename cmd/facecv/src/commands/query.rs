//! Recognition command.

use clap::Args;
use facecv_faceid::Recognition;
use serde::Serialize;

use super::util::VectorReader;
use crate::{config, Cli};

/// Recognize embeddings against enrolled identities.
///
/// Prints one JSON object per input vector.
#[derive(Args)]
pub struct QueryCommand {
    /// JSON-lines file of vectors (default: stdin)
    #[arg(short = 'i', long)]
    input: Option<String>,
}

/// One line of query output.
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct QueryOutput<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl<'a> From<&'a Recognition> for QueryOutput<'a> {
    fn from(r: &'a Recognition) -> Self {
        match r {
            Recognition::Matched { name, distance } => QueryOutput {
                status: "matched",
                name: Some(name),
                distance: Some(*distance),
            },
            Recognition::EnrollPrompt => QueryOutput {
                status: "enroll_prompt",
                name: None,
                distance: None,
            },
            Recognition::EnrollSuppressed => QueryOutput {
                status: "enroll_suppressed",
                name: None,
                distance: None,
            },
        }
    }
}

impl QueryCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = config::from_cli(cli)?;
        let mut engine = cfg.open_engine()?;

        for v in VectorReader::open(self.input.as_deref())? {
            let r = engine.query(&v?)?;
            println!("{}", serde_json::to_string(&QueryOutput::from(&r))?);
        }
        Ok(())
    }
}
