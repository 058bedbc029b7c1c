//! Processing history: every function run on a dataset, in order, with the
//! equivalent NMRPipe command.
//!
//! A history can be exported as
//! - human-readable text
//! - JSON (the recorded specs can be loaded back and re-run)
//! - a shell script that replays the pipeline with NMRPipe

use crate::registry::{lookup, FnSpec};
use chrono::{DateTime, Local};
use nmrpipe_core::{PipeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// One function run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based position in the pipeline
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub function: String,
    pub description: String,
    pub command: String,
    pub spec: FnSpec,
}

impl HistoryEntry {
    pub fn to_text(&self) -> String {
        format!(
            "{:>3}. {} at {}\n     {}\n     $ {}",
            self.sequence,
            self.function,
            self.timestamp.format("%H:%M:%S"),
            self.description,
            self.command
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingHistory {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    pub input: String,
    pub output: String,
    pub software_version: String,
    pub entries: Vec<HistoryEntry>,
}

impl Default for ProcessingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingHistory {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            input: String::new(),
            output: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
    }

    pub fn set_output(&mut self, output: &str) {
        self.output = output.to_string();
    }

    /// Record a completed function and the shape it produced.
    pub fn record(&mut self, spec: &FnSpec, shape: &[usize]) {
        let sequence = self.entries.len() + 1;
        let summary = lookup(spec.code()).map_or("", |f| f.summary);
        let description = format!("{summary}, output shape {shape:?}");
        log::info!("[{sequence:03}] {}: {description}", spec.code());
        self.entries.push(HistoryEntry {
            sequence,
            timestamp: Local::now(),
            function: spec.code().to_string(),
            description,
            command: spec.command(),
            spec: spec.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded specs, in run order.
    pub fn steps(&self) -> Vec<FnSpec> {
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }

    /// Plain-text report: a session block, then one block per function.
    pub fn to_text(&self) -> String {
        let started = self.session_start.format("%Y-%m-%d %H:%M:%S");
        let mut out = format!(
            "# nmrpype v{} session {}\n# started {started}\n# {} -> {}\n",
            self.software_version, self.session_id, self.input, self.output
        );
        let _ = writeln!(out, "# {} function(s)\n", self.entries.len());
        for entry in &self.entries {
            let _ = writeln!(out, "{}\n", entry.to_text());
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// A script that replays the pipeline as one NMRPipe command chain.
    pub fn to_shell_script(&self) -> String {
        let mut out = format!(
            "#!/bin/sh\n# replay of nmrpype session {} (v{})\nset -e\n\n",
            self.session_id, self.software_version
        );
        let or_stdio = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
        let _ = writeln!(out, "nmrPipe -in {} \\", or_stdio(&self.input));
        for entry in &self.entries {
            let _ = writeln!(out, "| {} \\", entry.command);
        }
        let _ = writeln!(out, "| nmrPipe -out {} -ov", or_stdio(&self.output));
        out
    }

    /// Write the history; the format follows the extension (`.json`,
    /// `.sh`, anything else is text).
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.to_json().map_err(|e| {
                PipeError::TypeMismatch(format!("history cannot be written as JSON: {e}"))
            })?,
            Some("sh") => self.to_shell_script(),
            _ => self.to_text(),
        };
        std::fs::write(path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ft::FtParams;
    use crate::zf::ZfParams;

    fn sample() -> ProcessingHistory {
        let mut h = ProcessingHistory::new();
        h.set_input("test.fid");
        h.set_output("test.ft1");
        h.record(
            &FnSpec::Zf(ZfParams {
                count: 1,
                ..Default::default()
            }),
            &[16],
        );
        h.record(&FnSpec::Ft(FtParams::default()), &[16]);
        h
    }

    #[test]
    fn test_record() {
        let h = sample();
        assert_eq!(h.len(), 2);
        assert_eq!(h.entries[0].sequence, 1);
        assert_eq!(h.entries[0].command, "nmrPipe -fn ZF -zf 1");
        assert!(h.entries[1].description.contains("Fourier"));
    }

    #[test]
    fn test_shell_script_chain() {
        let script = sample().to_shell_script();
        assert!(script.contains("nmrPipe -in test.fid \\\n| nmrPipe -fn ZF -zf 1 \\\n"));
        assert!(script.ends_with("| nmrPipe -out test.ft1 -ov\n"));
    }

    #[test]
    fn test_json_reloads_steps() {
        let h = sample();
        let back: ProcessingHistory = serde_json::from_str(&h.to_json().unwrap()).unwrap();
        assert_eq!(back.steps(), h.steps());
        assert_eq!(back.session_id, h.session_id);
    }

    #[test]
    fn test_save_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let h = sample();
        let json = dir.path().join("history.json");
        h.save(&json).unwrap();
        assert!(std::fs::read_to_string(&json).unwrap().starts_with('{'));
        let text = dir.path().join("history.txt");
        h.save(&text).unwrap();
        assert!(std::fs::read_to_string(&text)
            .unwrap()
            .contains("# 2 function(s)"));
    }
}
