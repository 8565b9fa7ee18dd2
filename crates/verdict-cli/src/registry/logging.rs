use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::span::EnteredSpan;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use super::{RegistryError, RegistryResult};

/// Send JSON log lines to `path` for the rest of the process.
///
/// Returns the entered `run` span; while it is held every event carries
/// `span.run_id`. The level defaults to `info` and can be overridden with
/// `RUST_LOG`.
pub fn init_run_logging(path: &Path, run_id: Uuid) -> RegistryResult<EnteredSpan> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let file = Arc::new(Mutex::new(file));

    let make_writer = BoxMakeWriter::new(move || RunLogWriter {
        file: Arc::clone(&file),
    });

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(make_writer);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))?;

    Ok(tracing::info_span!("run", run_id = %run_id).entered())
}

struct RunLogWriter {
    file: Arc<Mutex<File>>,
}

impl RunLogWriter {
    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("run log file lock poisoned"))
    }
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installs the global subscriber; keep this the only test that does.
    #[test]
    fn events_carry_the_run_id() {
        let dir = std::env::temp_dir().join(format!("verdict_logs_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create log dir");
        let path = dir.join("logs.ndjson");
        let run_id = Uuid::new_v4();

        let span = init_run_logging(&path, run_id).expect("init logging");
        tracing::info!(event = "rule_finished", rule_id = "r1");
        drop(span);

        let contents = std::fs::read_to_string(&path).expect("read logs");
        let line = contents
            .lines()
            .find(|line| line.contains("rule_finished"))
            .expect("event line");
        let event: serde_json::Value = serde_json::from_str(line).expect("parse log line");
        assert_eq!(event["span"]["run_id"], run_id.to_string());
        assert_eq!(event["fields"]["rule_id"], "r1");
        assert_eq!(event["level"], "INFO");
    }
}
