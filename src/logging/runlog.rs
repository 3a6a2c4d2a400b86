// file: src/logging/runlog.rs
// version: 1.0.0
// guid: 7c3e91a5-2f68-4d0b-b1c7-84a6d92f5e03

//! Per-run event log
//!
//! Every run writes a timestamped event log into the log directory:
//! workspace creation, the command line, the exit status, side effects
//! and staging results. With `--verbose` the same lines are echoed to
//! the terminal in color. The file is appended and flushed line by line
//! so it survives even when the run is cut short.

use crate::Result;
use colored::{Color, Colorize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only event log for a single run
pub struct RunLog {
    file: File,
    path: PathBuf,
    echo: bool,
}

impl RunLog {
    /// Open the event log file for appending, creating it if needed
    pub fn create<P: Into<PathBuf>>(path: P, echo: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                crate::error::RunnerError::workspace(format!(
                    "Failed to create run log {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self { file, path, echo })
    }

    /// Path of the event log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an uncolored event
    pub fn event(&mut self, message: &str) -> Result<()> {
        self.write_line(message)?;
        if self.echo {
            println!("{}", message);
        }
        Ok(())
    }

    /// Record an event, echoed in color when verbose
    pub fn event_colored(&mut self, message: &str, color: Color) -> Result<()> {
        self.write_line(message)?;
        if self.echo {
            println!("{}", message.color(color));
        }
        Ok(())
    }

    /// Copy a block of text into the log verbatim, without timestamps
    ///
    /// Used to preserve the child's captured stderr next to the failure
    /// event so the log reads as one record.
    pub fn raw_block(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            writeln!(self.file, "    {}", line)?;
            if self.echo {
                println!("    {}", line);
            }
        }
        self.file.flush()?;
        Ok(())
    }

    fn write_line(&mut self, message: &str) -> Result<()> {
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        writeln!(self.file, "[{}] {}", stamp, message)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_events_are_written_with_timestamps() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("run.log");

        let mut log = RunLog::create(&log_path, false).unwrap();
        log.event("Workspace initiated").unwrap();
        log.event_colored("Command failed", Color::Red).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Workspace initiated"));
        assert!(content.contains("Command failed"));
        // Color codes belong to the terminal echo, never to the file
        assert!(!content.contains('\u{1b}'));
        assert!(content.starts_with('['));
    }

    #[test]
    fn test_multiple_events_append() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("run.log");

        let mut log = RunLog::create(&log_path, false).unwrap();
        for i in 0..3 {
            log.event(&format!("event {}", i)).unwrap();
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_raw_block_is_indented_and_unstamped() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("run.log");

        let mut log = RunLog::create(&log_path, false).unwrap();
        log.event("Command failed").unwrap();
        log.raw_block("panic: oh no\ntrace line").unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("    panic: oh no"));
        assert!(!lines[1].contains('['));
    }
}
