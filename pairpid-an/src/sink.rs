//! JSON result output

use crate::accumulator::{Aggregate, FinalResult};
use crate::stats::ClassificationStats;
use chrono::{DateTime, Utc};
use pairpid_common::{time, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Version and commit of the build that wrote a result
pub fn generator() -> String {
    format!("pairpid {} [{}]", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
}

/// Everything written to the result file
#[derive(Debug, Serialize)]
pub struct ResultDocument<'a> {
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    pub dataset: &'a str,
    pub stats: &'a ClassificationStats,
    pub aggregates: &'a BTreeMap<String, Aggregate>,
}

impl<'a> ResultDocument<'a> {
    pub fn new(result: &'a FinalResult, dataset: &'a str) -> Self {
        Self {
            generator: generator(),
            generated_at: time::now(),
            dataset,
            stats: &result.stats,
            aggregates: &result.aggregates,
        }
    }
}

/// Serialize a result to any writer
pub fn write_result_to<W: Write>(writer: W, result: &FinalResult, dataset: &str) -> Result<()> {
    serde_json::to_writer(writer, &ResultDocument::new(result, dataset))?;
    Ok(())
}

/// Write a result file, replacing any existing one
pub fn write_result(path: &Path, result: &FinalResult, dataset: &str) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_result_to(&mut writer, result, dataset)?;
    writer.flush()?;
    info!(
        "Wrote {} aggregates to {}",
        result.aggregates.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::{AccumulatorArena, HistogramBook, HistogramSpec};

    fn result() -> FinalResult {
        let mut book = HistogramBook::new();
        book.book("count", HistogramSpec::one_d(2, 0.0, 2.0).unwrap())
            .unwrap();
        let mut arena = AccumulatorArena::new(book, 1);
        arena.workers_mut()[0].fill("count", &[0.5], 1.0).unwrap();
        arena.workers_mut()[0].stats_mut().events = 3;
        arena.merge_all().unwrap()
    }

    #[test]
    fn test_document_fields() {
        let mut buffer = Vec::new();
        write_result_to(&mut buffer, &result(), "run14heau200").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["dataset"], "run14heau200");
        assert_eq!(value["stats"]["events"], 3);
        assert_eq!(value["aggregates"]["count"]["kind"], "hist1d");
        assert_eq!(value["aggregates"]["count"]["sumw"][1], 1.0);
        assert!(value["generated_at"].is_string());
        assert_eq!(value["generator"], generator());
    }

    #[test]
    fn test_generator_names_build_commit() {
        let generator = generator();
        assert!(generator.starts_with(&format!("pairpid {} [", env!("CARGO_PKG_VERSION"))));
        assert!(generator.ends_with(']'));
        assert!(generator.len() > "pairpid  []".len() + env!("CARGO_PKG_VERSION").len());
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_result(&path, &result(), "run16dau200").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("run16dau200"));
    }
}
