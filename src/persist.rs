use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::models::PredictionRecord;

/// Where finished predictions go. The engine never reads back from it; history lookups
/// are for the CLI.
pub trait VerdictSink {
    fn record(&self, record: &PredictionRecord) -> Result<PathBuf>;
}

/// One pretty-printed JSON file per query under `<root>/<YYYY-MM-DD>/`.
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Stable id of a record: the file stem it is stored under.
    pub fn record_id(record: &PredictionRecord) -> String {
        format!(
            "{:016x}",
            xxh3_64(format!("{}|{}", record.query, record.created_at.to_rfc3339()).as_bytes())
        )
    }

    fn record_path(&self, record: &PredictionRecord) -> PathBuf {
        let date = record.created_at.format("%Y-%m-%d").to_string();
        self.root
            .join(date)
            .join(format!("{}.json", Self::record_id(record)))
    }

    /// Date directories, newest first. A missing root is an empty history.
    fn date_dirs(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .with_context(|| format!("read {:?}", self.root))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(dirs)
    }

    fn read_record(path: &Path) -> Result<PredictionRecord> {
        let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse {:?}", path))
    }

    /// Most recent records first, at most `limit`. Unreadable files are skipped.
    pub fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let mut out: Vec<PredictionRecord> = Vec::new();
        for dir in self.date_dirs()? {
            if out.len() >= limit {
                break;
            }
            let mut day: Vec<PredictionRecord> = std::fs::read_dir(&dir)
                .with_context(|| format!("read {:?}", dir))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|p| match Self::read_record(&p) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!("Skipping unreadable prediction record - error={:#}", e);
                        None
                    }
                })
                .collect();
            day.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            out.extend(day);
        }
        out.truncate(limit);
        Ok(out)
    }

    /// Look a record up by id. `Ok(None)` when no such record exists.
    pub fn load(&self, id: &str) -> Result<Option<PredictionRecord>> {
        if id.len() != 16 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("invalid prediction id {:?}", id);
        }
        for dir in self.date_dirs()? {
            let path = dir.join(format!("{id}.json"));
            if path.is_file() {
                return Self::read_record(&path).map(Some);
            }
        }
        Ok(None)
    }
}

impl VerdictSink for JsonFileSink {
    fn record(&self, record: &PredictionRecord) -> Result<PathBuf> {
        let path = self.record_path(record);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
        }
        std::fs::write(&path, serde_json::to_vec_pretty(record)?)
            .with_context(|| format!("write {:?}", path))?;
        debug!("Wrote prediction record: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataQualityMetrics, DirectionalLabel, EvidenceSet, FinalVerdict};
    use crate::query::Topic;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record() -> PredictionRecord {
        record_at("Will the bill pass?", Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap())
    }

    fn record_at(query: &str, created_at: chrono::DateTime<Utc>) -> PredictionRecord {
        PredictionRecord {
            query: query.into(),
            enhanced_query: "Will the bill pass? policy legislation congress".into(),
            topic: Topic::Politics,
            created_at,
            evidence: EvidenceSet::default(),
            verdict: FinalVerdict {
                label: DirectionalLabel::Likely,
                confidence_score: 72,
                verdict_text: "LIKELY - votes are there".into(),
                data_quality: DataQualityMetrics {
                    source_count: 0,
                    platforms_used: 0,
                    platform_breakdown: BTreeMap::new(),
                    avg_quality_score: 0.0,
                    avg_relevance_score: 0.0,
                    confidence_boost: 0,
                },
                key_factors: vec![],
                caveats: vec![],
                evidence: vec![],
            },
        }
    }

    #[test]
    fn test_json_sink_writes_date_scoped_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let path = sink.record(&record()).unwrap();

        assert!(path.starts_with(dir.path().join("2026-03-01")));
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["verdict"]["label"], "LIKELY");
        assert_eq!(written["topic"], "politics");
        assert_eq!(written["verdict"]["confidence_score"], 72);
    }

    #[test]
    fn test_same_record_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        assert_eq!(sink.record(&record()).unwrap(), sink.record(&record()).unwrap());
    }

    #[test]
    fn test_recent_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let older = record_at("Will rates fall?", Utc.with_ymd_and_hms(2026, 2, 27, 8, 0, 0).unwrap());
        let morning = record_at("Will the bill pass?", Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let evening = record_at("Will the vote slip?", Utc.with_ymd_and_hms(2026, 3, 1, 21, 0, 0).unwrap());
        for r in [&morning, &older, &evening] {
            sink.record(r).unwrap();
        }
        std::fs::write(dir.path().join("2026-03-01").join("broken.json"), b"{").unwrap();

        let queries: Vec<String> = sink.recent(10).unwrap().into_iter().map(|r| r.query).collect();
        assert_eq!(queries, vec!["Will the vote slip?", "Will the bill pass?", "Will rates fall?"]);

        let latest = sink.recent(1).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].query, "Will the vote slip?");
    }

    #[test]
    fn test_recent_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("never-written"));
        assert!(sink.recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_load_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let rec = record();
        sink.record(&rec).unwrap();

        let id = JsonFileSink::record_id(&rec);
        let loaded = sink.load(&id).unwrap().unwrap();
        assert_eq!(loaded.query, rec.query);
        assert_eq!(loaded.created_at, rec.created_at);
        assert_eq!(loaded.verdict, rec.verdict);

        assert!(sink.load("0000000000000000").unwrap().is_none());
        assert!(sink.load("../../etc/passwd").is_err());
    }
}
