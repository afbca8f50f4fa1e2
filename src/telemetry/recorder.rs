//! # Telemetry Recorder
//!
//! Writes dashboard telemetry to JSON Lines files with rotation.
//!
//! - One record per line, timestamped with UTC RFC 3339 time
//! - A new file is started after `max_records_per_file` records
//! - Only the newest `max_files_to_keep` files are retained

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::{BatteryStatus, ServoAngles, TelemetrySnapshot};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::state::DashboardState;

const FILE_PREFIX: &str = "telemetry_";
const FILE_SUFFIX: &str = ".jsonl";

/// One line of the telemetry log.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: String,
    pub connected: bool,
    pub run_time_s: u64,
    pub imu: TelemetrySnapshot,
    pub battery: Option<BatteryStatus>,
    pub servo: Option<ServoAngles>,
}

impl TelemetryRecord {
    /// Captures the telemetry slices of the current dashboard state.
    pub fn from_state(state: &DashboardState) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            connected: state.connected,
            run_time_s: state.run_time_s,
            imu: state.imu,
            battery: state.battery,
            servo: state.servo,
        }
    }
}

/// Rotating JSONL writer.
#[derive(Debug)]
pub struct TelemetryRecorder {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl TelemetryRecorder {
    /// Creates a recorder writing into `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(dir: P, max_records_per_file: usize, max_files_to_keep: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Recording telemetry to {}", dir.display());
        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Creates a recorder from the `[telemetry]` configuration section.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// Appends one record, rotating first if the current file is full.
    pub fn record(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    /// Flushes and closes the current file.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.close()?;

        self.file_seq += 1;
        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_seq,
            FILE_SUFFIX
        );
        let path = self.dir.join(name);
        debug!("Opening telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;
        self.prune()
    }

    /// Deletes the oldest log files beyond `max_files_to_keep`.
    fn prune(&self) -> Result<()> {
        let mut files = self.log_files()?;
        files.sort();

        let excess = files.len().saturating_sub(self.max_files_to_keep);
        for path in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old telemetry file {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    /// Lists the recorder's files in the log directory.
    pub fn log_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_log = path
                .file_name()
                .map(|n| {
                    let n = n.to_string_lossy();
                    n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX)
                })
                .unwrap_or(false);
            if is_log {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl Drop for TelemetryRecorder {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(roll: f64) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            connected: true,
            run_time_s: 42,
            imu: TelemetrySnapshot { roll, pitch: 0.0, yaw: 0.0, temperature: 30.0 },
            battery: Some(BatteryStatus { voltage: 12.6, percentage: 100 }),
            servo: None,
        }
    }

    fn read_lines(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .flat_map(|f| fs::read_to_string(f).unwrap().lines().map(String::from).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn test_records_are_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = TelemetryRecorder::new(dir.path(), 100, 5).unwrap();

        recorder.record(&sample_record(1.0)).unwrap();
        recorder.record(&sample_record(2.0)).unwrap();

        let files = recorder.log_files().unwrap();
        assert_eq!(files.len(), 1);

        let lines = read_lines(&files);
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(parsed["imu"]["roll"], 2.0);
        assert_eq!(parsed["battery"]["percentage"], 100);
        assert!(parsed["servo"].is_null());
        assert_eq!(parsed["run_time_s"], 42);
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = TelemetryRecorder::new(dir.path(), 2, 10).unwrap();

        for i in 0..5 {
            recorder.record(&sample_record(i as f64)).unwrap();
        }

        let mut files = recorder.log_files().unwrap();
        files.sort();
        assert_eq!(files.len(), 3);
        assert_eq!(read_lines(&files).len(), 5);
    }

    #[test]
    fn test_old_files_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = TelemetryRecorder::new(dir.path(), 1, 2).unwrap();

        for i in 0..6 {
            recorder.record(&sample_record(i as f64)).unwrap();
        }

        let mut files = recorder.log_files().unwrap();
        files.sort();
        assert_eq!(files.len(), 2);

        // The survivors are the two newest records.
        let lines = read_lines(&files);
        let rolls: Vec<f64> = lines
            .iter()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["imu"]["roll"].as_f64().unwrap())
            .collect();
        assert_eq!(rolls, vec![4.0, 5.0]);
    }

    #[test]
    fn test_unrelated_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut recorder = TelemetryRecorder::new(dir.path(), 1, 1).unwrap();
        for i in 0..3 {
            recorder.record(&sample_record(i as f64)).unwrap();
        }

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(recorder.log_files().unwrap().len(), 1);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut recorder = TelemetryRecorder::new(&nested, 10, 10).unwrap();
        recorder.record(&sample_record(0.0)).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_record_from_state() {
        let mut state = DashboardState::default();
        state.connected = true;
        state.run_time_s = 7;
        state.imu.yaw = 45.0;

        let record = TelemetryRecord::from_state(&state);
        assert!(record.connected);
        assert_eq!(record.run_time_s, 7);
        assert_eq!(record.imu.yaw, 45.0);
        assert!(record.battery.is_none());
    }
}
