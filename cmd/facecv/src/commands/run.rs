//! Interactive recognition loop.

use std::io::{self, BufRead, Write};

use clap::Args;
use facecv_faceid::{FaceIdError, Recognition, RecognitionEngine};
use serde::Serialize;
use tracing::{info, warn};

use super::query::QueryOutput;
use super::util::VectorReader;
use crate::{config, Cli};

/// Recognize a stream of embeddings, prompting to enroll unknown faces.
///
/// The terminal is used for the prompts, so vectors must come from a file
/// or pipe given with `--input`.
#[derive(Args)]
pub struct RunCommand {
    /// JSON-lines file or FIFO of vectors
    #[arg(short = 'i', long)]
    input: String,
}

#[derive(Serialize)]
struct Enrolled<'a> {
    status: &'static str,
    name: &'a str,
    collected: usize,
}

impl RunCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        if self.input == "-" {
            anyhow::bail!("run reads prompts from stdin; pass vectors with --input FILE");
        }
        let cfg = config::from_cli(cli)?;
        let mut engine = cfg.open_engine()?;
        let mut vectors = VectorReader::open(Some(&self.input))?;
        let stdin = io::stdin();
        let mut prompts = stdin.lock();

        while let Some(v) = vectors.next() {
            let v = v?;
            let r = match engine.query(&v) {
                Ok(r) => r,
                Err(
                    e @ (FaceIdError::DimensionMismatch { .. }
                    | FaceIdError::NonFiniteComponent { .. }),
                ) => {
                    warn!(error = %e, "skipping vector");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            println!("{}", serde_json::to_string(&QueryOutput::from(&r))?);

            if r != Recognition::EnrollPrompt {
                continue;
            }
            let Some(name) = ask(&mut prompts, "New face detected. Enter name: ")? else {
                break;
            };
            if name.is_empty() {
                continue;
            }
            let Some(count) = ask(&mut prompts, "Enter number of samples to capture: ")? else {
                break;
            };
            let count: usize = match count.parse() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(input = %count, "not a positive number, skipping enrollment");
                    continue;
                }
            };

            let collected = enroll(&mut engine, &name, count, &mut vectors)?;
            println!(
                "{}",
                serde_json::to_string(&Enrolled {
                    status: "enrolled",
                    name: &name,
                    collected,
                })?
            );
        }

        engine.flush()?;
        Ok(())
    }
}

/// Feeds the next `count` vectors to a new session for `name`.
fn enroll<I>(
    engine: &mut RecognitionEngine,
    name: &str,
    count: usize,
    vectors: &mut I,
) -> anyhow::Result<usize>
where
    I: Iterator<Item = anyhow::Result<Vec<f32>>>,
{
    let mut session = engine.begin_enrollment(name, count)?;
    while !session.is_complete() {
        let Some(v) = vectors.next() else {
            warn!(
                name,
                remaining = session.remaining(),
                "input ended before enrollment finished"
            );
            break;
        };
        match session.submit(&v?) {
            Ok(()) => {}
            Err(
                e @ (FaceIdError::DimensionMismatch { .. }
                | FaceIdError::NonFiniteComponent { .. }),
            ) => warn!(error = %e, "skipping sample"),
            Err(FaceIdError::PersistenceFailure(e)) => {
                warn!(error = %e, "sample kept in memory, save will be retried")
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(name, collected = session.submitted(), "enrollment finished");
    Ok(session.submitted())
}

/// Prints `prompt` on stderr and reads one trimmed line. `None` at end of input.
fn ask(input: &mut impl BufRead, prompt: &str) -> anyhow::Result<Option<String>> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
