//! Utility functions for CLI commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use crate::Cli;

/// Reads embedding vectors, one JSON array per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub struct VectorReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl VectorReader<Box<dyn BufRead>> {
    /// Opens `path`, or stdin when `path` is `None` or `-`.
    pub fn open(path: Option<&str>) -> anyhow::Result<Self> {
        let reader: Box<dyn BufRead> = match path {
            None | Some("-") => Box::new(BufReader::new(io::stdin())),
            Some(p) => {
                let f = File::open(Path::new(p)).with_context(|| format!("open {p}"))?;
                Box::new(BufReader::new(f))
            }
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> VectorReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for VectorReader<R> {
    type Item = anyhow::Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let line_no = self.line_no;
            return Some(
                serde_json::from_str::<Vec<f32>>(trimmed)
                    .with_context(|| format!("line {line_no}: expected a JSON array of numbers")),
            );
        }
    }
}

/// Prints a value as YAML, or pretty JSON with `--json`.
pub fn print_value<T: Serialize>(cli: &Cli, value: &T) -> anyhow::Result<()> {
    let output = if cli.json {
        serde_json::to_string_pretty(value)?
    } else {
        serde_yaml::to_string(value)?
    };
    println!("{}", output.trim_end());
    Ok(())
}
