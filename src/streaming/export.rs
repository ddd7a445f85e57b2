//! JSON-lines export of events and summaries

use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::RecordStore;
use crate::core::OutputRecord;
use crate::error::SinkError;

/// Appends one JSON object per line, events and summaries in separate files
pub struct DataExporter {
    path: PathBuf,
    events_file: Mutex<Option<BufWriter<File>>>,
    summaries_file: Mutex<Option<BufWriter<File>>>,
}

#[derive(Serialize)]
struct ExportLine<'a> {
    path: String,
    #[serde(flatten)]
    record: &'a OutputRecord,
}

impl DataExporter {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        std::fs::create_dir_all(&path)?;
        info!("Exporting records to {:?}", path);

        Ok(Self {
            path,
            events_file: Mutex::new(None),
            summaries_file: Mutex::new(None),
        })
    }

    pub fn events_path(&self) -> PathBuf {
        self.path.join("events.jsonl")
    }

    pub fn summaries_path(&self) -> PathBuf {
        self.path.join("summaries.jsonl")
    }

    fn append(
        &self,
        slot: &Mutex<Option<BufWriter<File>>>,
        filename: PathBuf,
        line: &str,
    ) -> Result<(), SinkError> {
        let mut file_lock = slot.lock();

        // Open file if not already open
        if file_lock.is_none() {
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            *file_lock = Some(BufWriter::new(file));
        }

        if let Some(ref mut writer) = *file_lock {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        Ok(())
    }
}

impl RecordStore for DataExporter {
    fn name(&self) -> &str {
        "export"
    }

    fn store(&self, record: &OutputRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(&ExportLine { path: record.path(), record })?;
        match record {
            OutputRecord::Event { .. } => self.append(&self.events_file, self.events_path(), &line),
            OutputRecord::Summary { .. } => {
                self.append(&self.summaries_file, self.summaries_path(), &line)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Summary;
    use crate::detection::{Event, EventKind, Severity};

    #[test]
    fn test_records_split_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DataExporter::new(dir.path().join("out")).unwrap();

        exporter
            .store(&OutputRecord::Event {
                sector: "A".into(),
                event: Event {
                    timestamp: 10,
                    kind: EventKind::PowerOutage,
                    kind_id: "7".into(),
                    detail: "no current for 61 s".into(),
                    severity: Severity::Error,
                },
            })
            .unwrap();
        exporter
            .store(&OutputRecord::Summary {
                sector: "A".into(),
                summary: Summary {
                    timestamp: 60,
                    avg_current: 3.0,
                    window_kwh: 0.01,
                    cumulative_kwh: 0.01,
                    min_temp: None,
                    max_temp: None,
                    presence_seconds: 0,
                    estimated_cost: 0.0,
                    cumulative_cost: 0.0,
                },
            })
            .unwrap();

        let events = std::fs::read_to_string(exporter.events_path()).unwrap();
        let lines: Vec<&str> = events.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["path"], "events/A/10");
        assert_eq!(value["record"], "event");
        assert_eq!(value["event"]["kind"], "power_outage");

        let summaries = std::fs::read_to_string(exporter.summaries_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(summaries.trim()).unwrap();
        assert_eq!(value["path"], "summaries/A/60");
        assert!(value["summary"]["min_temp"].is_null());
    }
}
