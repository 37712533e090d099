/*!
*  Reading and writing DID logs as JSONL
*
*  A persisted log is one JSON-encoded 5-tuple per line, `\n` terminated,
*  with no header or trailing metadata. Atomic replacement of the file
*  (write-new-and-rename) is the caller's responsibility.
*/

use super::{DIDLog, LogEntry};
use crate::DIDTdwError;
use std::{
    fs::File,
    io::{self, BufRead, Write},
};

impl DIDLog {
    /// Parses a log from JSONL text
    pub fn from_jsonl(input: &str) -> Result<DIDLog, DIDTdwError> {
        let mut entries = Vec::new();
        for line in input.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(line).map_err(|e| {
                DIDTdwError::LogEntryError(format!("Couldn't deserialize LogEntry. Reason: {e}"))
            })?;
            entries.push(entry);
        }
        if entries.is_empty() {
            return Err(DIDTdwError::InvalidState(
                "Log contains no entries".to_string(),
            ));
        }
        Ok(DIDLog { entries })
    }

    /// Serializes the log to JSONL text
    pub fn to_jsonl(&self) -> Result<String, DIDTdwError> {
        let mut output = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry).map_err(|e| {
                DIDTdwError::LogEntryError(format!(
                    "Couldn't serialize LogEntry to JSON. Reason: {e}"
                ))
            })?;
            output.push_str(&line);
            output.push('\n');
        }
        Ok(output)
    }

    /// Loads a log from a JSONL file
    pub fn load_from_file(file_path: &str) -> Result<DIDLog, DIDTdwError> {
        let file = File::open(file_path)
            .map_err(|e| DIDTdwError::LogEntryError(format!("Failed to open log file: {e}")))?;
        let buf_reader = io::BufReader::new(file);

        let mut contents = String::new();
        for line in buf_reader.lines() {
            match line {
                Ok(line) => {
                    contents.push_str(&line);
                    contents.push('\n');
                }
                Err(e) => {
                    return Err(DIDTdwError::LogEntryError(format!(
                        "Failed to read line from log file: {e}"
                    )));
                }
            }
        }
        DIDLog::from_jsonl(&contents)
    }

    /// Writes the whole log to a JSONL file
    pub fn save_to_file(&self, file_path: &str) -> Result<(), DIDTdwError> {
        let mut file = File::create(file_path).map_err(|e| {
            DIDTdwError::LogEntryError(format!("Couldn't open file {file_path}: {e}"))
        })?;
        file.write_all(self.to_jsonl()?.as_bytes()).map_err(|e| {
            DIDTdwError::LogEntryError(format!(
                "Couldn't write log to file({file_path}). Reason: {e}"
            ))
        })?;
        Ok(())
    }
}
