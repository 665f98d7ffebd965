use crate::error::QueryError;
use crate::models::QueryOutput;
use crate::traits::OutputStore;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// Append-only JSONL store for query outputs, one record per line.
pub struct JsonlOutputStore {
    path: PathBuf,
}

impl JsonlOutputStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl OutputStore for JsonlOutputStore {
    fn load(&self) -> Result<Vec<QueryOutput>, QueryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path)?;
        let mut outputs = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            outputs.push(serde_json::from_str(&line)?);
        }
        Ok(outputs)
    }

    fn save(&self, output: &QueryOutput) -> Result<(), QueryError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(output)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryOutput, SearchParameters};
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample_output() -> QueryOutput {
        QueryOutput {
            question_variants: vec!["q1".to_string()],
            answers: vec!["a1".to_string()],
            final_answer: "a1".to_string(),
            rerank: false,
            rerank_type: None,
            evaluations: Vec::new(),
            search_parameters: SearchParameters {
                embedding_model: "ngram-128".to_string(),
                chunk_size: 512,
                overlap_size: 128,
                ef_construction: 400,
                ef_search: 400,
                search_variant: "keyword".to_string(),
                index_name: "prefix-512-128-ngram-128-400-400".to_string(),
            },
            produced_at: Utc::now(),
        }
    }

    #[test]
    fn save_then_load_round_trips_records() {
        let dir = tempdir().unwrap();
        let store = JsonlOutputStore::new(dir.path().join("outputs.jsonl"));

        store.save(&sample_output()).unwrap();
        store.save(&sample_output()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].final_answer, "a1");
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonlOutputStore::new(dir.path().join("absent.jsonl"));
        assert!(store.load().unwrap().is_empty());
    }
}
