//! The acquisition loop.
//!
//! This module bridges one serial input stream to one CSV output file,
//! line by line, until told to stop. The loop itself ([`run_loop`]) is
//! written against the [`LineSource`] seam so it can be exercised with a
//! scripted source in tests; [`Session`] owns the real endpoint and sink
//! and guarantees teardown on every exit path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, OutputConfig};
use crate::error::{Error, Result};
use crate::record::Record;
use crate::serial::{LineSource, SerialEndpoint};
use crate::storage::CsvSink;

/// A cloneable handle used to request that the acquisition loop stop.
///
/// The loop observes the flag between iterations; a blocking read in
/// progress finishes (or times out) first, so no partial row is ever
/// written in response to a stop request.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a new handle with the stop flag unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the loop stop after the current iteration.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether a stop has been requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Counters for one acquisition session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Lines received from the endpoint (accepted or not).
    pub lines_read: u64,
    /// Rows appended to the output file.
    pub rows_written: u64,
    /// Lines discarded because their field count did not match.
    pub lines_skipped: u64,
}

/// Why the acquisition loop ended.
///
/// Loop exit is a value, not an unwind: the driving code inspects it to
/// decide what to report, and teardown runs the same way regardless of
/// the variant.
#[derive(Debug)]
pub enum LoopExit {
    /// The operator requested a stop; not a failure.
    StopRequested,
    /// An unexpected error ended the loop.
    Failed(Error),
}

/// Pump lines from `source` into `sink` until a stop request or failure.
///
/// Each iteration reads at most one line. A read that times out with no
/// data is not an error; a line whose field count does not match the
/// configured shape is discarded without error. Every accepted row is
/// flushed by the sink before the next read.
pub fn run_loop(
    source: &mut dyn LineSource,
    sink: &mut CsvSink,
    output: &OutputConfig,
    stop: &StopHandle,
) -> (SessionStats, LoopExit) {
    let mut stats = SessionStats::default();

    loop {
        if stop.should_stop() {
            return (stats, LoopExit::StopRequested);
        }

        match source.read_line() {
            Ok(None) => {
                // Timeout with no data; keep waiting.
            }
            Ok(Some(line)) => {
                stats.lines_read += 1;
                match Record::parse(&line, output.delimiter, output.expected_fields) {
                    Some(record) => {
                        if let Err(e) = sink.append(&record) {
                            return (stats, LoopExit::Failed(e));
                        }
                        stats.rows_written += 1;
                        debug!("row written: {:?}", record.fields());
                    }
                    None => {
                        stats.lines_skipped += 1;
                        debug!("discarded line with unexpected shape: {:?}", line);
                    }
                }
            }
            Err(e) => return (stats, LoopExit::Failed(e)),
        }
    }
}

/// One logging session: open the endpoint, create the output file, run
/// the loop, and tear both down exactly once.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    port: String,
    baud_rate: u32,
    output: PathBuf,
}

impl Session {
    /// Create a session for the given port and baud rate.
    ///
    /// The output path is taken from the configuration.
    #[must_use]
    pub fn new(config: Config, port: impl Into<String>, baud_rate: u32) -> Self {
        let output = config.output_path();
        Self {
            config,
            port: port.into(),
            baud_rate,
            output,
        }
    }

    /// Override the output file path.
    #[must_use]
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = path;
        self
    }

    /// The output file path this session will write.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run the session until a stop request or failure.
    ///
    /// Opens the endpoint first: if that fails, the output file is never
    /// created. After a settle delay for transport initialization, the
    /// output file is created (truncated) with its header row and the
    /// loop runs. The endpoint and the output file are both released by
    /// ownership when this method returns, on every path, with the port
    /// closure reported.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be opened or the output
    /// file cannot be created. Errors inside the loop are reported
    /// through [`LoopExit::Failed`] instead, so the caller can still see
    /// the session statistics.
    pub fn run(&self, stop: &StopHandle) -> Result<(SessionStats, LoopExit)> {
        let mut endpoint =
            SerialEndpoint::open(&self.port, self.baud_rate, self.config.read_timeout())?;

        // Let the transport initialize before the first read.
        thread::sleep(self.config.settle_delay());

        let mut sink = CsvSink::create(
            &self.output,
            &self.config.output.header,
            self.config.delimiter_byte(),
        )?;

        let (stats, exit) = run_loop(&mut endpoint, &mut sink, &self.config.output, stop);

        info!(
            "session finished: {} lines read, {} rows written, {} skipped",
            stats.lines_read, stats.rows_written, stats.lines_skipped
        );

        // `sink` drops (flushing the file) before `endpoint`, whose Drop
        // reports the port closure.
        Ok((stats, exit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// A scripted line source that stops the loop once its lines run out.
    struct ScriptedSource {
        lines: VecDeque<Result<Option<String>>>,
        stop: StopHandle,
    }

    impl ScriptedSource {
        fn new(lines: Vec<Result<Option<String>>>, stop: StopHandle) -> Self {
            Self {
                lines: lines.into(),
                stop,
            }
        }
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self) -> Result<Option<String>> {
            match self.lines.pop_front() {
                Some(item) => item,
                None => {
                    self.stop.stop();
                    Ok(None)
                }
            }
        }
    }

    fn test_sink(dir: &tempfile::TempDir) -> CsvSink {
        let config = Config::default();
        CsvSink::create(
            dir.path().join("log.csv"),
            &config.output.header,
            config.delimiter_byte(),
        )
        .unwrap()
    }

    fn decode_error() -> Error {
        String::from_utf8(vec![0xff]).unwrap_err().into()
    }

    #[test]
    fn test_stop_handle_starts_unset() {
        let handle = StopHandle::new();
        assert!(!handle.should_stop());
    }

    #[test]
    fn test_stop_handle_stop() {
        let handle = StopHandle::new();
        handle.stop();
        assert!(handle.should_stop());
    }

    #[test]
    fn test_stop_handle_clone_shares_flag() {
        let handle1 = StopHandle::new();
        let handle2 = handle1.clone();

        handle1.stop();
        assert!(handle2.should_stop());
    }

    #[test]
    fn test_loop_writes_accepted_lines_and_drops_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(&dir);
        let config = Config::default();
        let stop = StopHandle::new();

        let lines = ["0.1,3.3", "0.2,3.4", "bad,line,extra", "0.3,3.5"]
            .iter()
            .map(|l| Ok(Some((*l).to_string())))
            .collect();
        let mut source = ScriptedSource::new(lines, stop.clone());

        let (stats, exit) = run_loop(&mut source, &mut sink, &config.output, &stop);

        assert!(matches!(exit, LoopExit::StopRequested));
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.lines_skipped, 1);

        drop(sink);
        let contents = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
        assert_eq!(
            contents,
            "Time(s),Voltage(V)\n0.1,3.3\n0.2,3.4\n0.3,3.5\n"
        );
    }

    #[test]
    fn test_loop_honors_prior_stop_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(&dir);
        let config = Config::default();
        let stop = StopHandle::new();
        stop.stop();

        let mut source = ScriptedSource::new(
            vec![Ok(Some("0.1,3.3".to_string()))],
            stop.clone(),
        );

        let (stats, exit) = run_loop(&mut source, &mut sink, &config.output, &stop);

        assert!(matches!(exit, LoopExit::StopRequested));
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn test_loop_treats_timeout_as_no_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(&dir);
        let config = Config::default();
        let stop = StopHandle::new();

        let mut source = ScriptedSource::new(
            vec![Ok(None), Ok(Some("0.1,3.3".to_string())), Ok(None)],
            stop.clone(),
        );

        let (stats, exit) = run_loop(&mut source, &mut sink, &config.output, &stop);

        assert!(matches!(exit, LoopExit::StopRequested));
        assert_eq!(stats.lines_read, 1);
        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.lines_skipped, 0);
    }

    #[test]
    fn test_loop_counts_blank_lines_as_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(&dir);
        let config = Config::default();
        let stop = StopHandle::new();

        let mut source = ScriptedSource::new(
            vec![Ok(Some(String::new())), Ok(Some("0.1,3.3".to_string()))],
            stop.clone(),
        );

        let (stats, _exit) = run_loop(&mut source, &mut sink, &config.output, &stop);

        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.rows_written, 1);
        assert_eq!(stats.lines_skipped, 1);
    }

    #[test]
    fn test_loop_ends_on_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = test_sink(&dir);
        let config = Config::default();
        let stop = StopHandle::new();

        let mut source = ScriptedSource::new(
            vec![Ok(Some("0.1,3.3".to_string())), Err(decode_error())],
            stop.clone(),
        );

        let (stats, exit) = run_loop(&mut source, &mut sink, &config.output, &stop);

        assert!(matches!(exit, LoopExit::Failed(Error::Decode(_))));
        // The row accepted before the failure stays written.
        assert_eq!(stats.rows_written, 1);

        drop(sink);
        let contents = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
        assert_eq!(contents, "Time(s),Voltage(V)\n0.1,3.3\n");
    }

    #[test]
    fn test_session_open_failure_creates_no_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("log.csv");

        let mut config = Config::default();
        config.output.path = Some(output.clone());
        // Keep the test fast if open were ever to succeed.
        config.acquisition.settle_delay_ms = 1;
        config.acquisition.read_timeout_ms = 50;

        let session = Session::new(config, "/dev/nonexistent-serial-port", 9600);
        let result = session.run(&StopHandle::new());

        let err = result.unwrap_err();
        assert!(err.is_port_unavailable(), "got: {err}");
        assert!(!output.exists());
    }

    #[test]
    fn test_session_output_override() {
        let config = Config::default();
        let session = Session::new(config, "/dev/ttyUSB0", 9600)
            .with_output(PathBuf::from("/tmp/custom.csv"));
        assert_eq!(session.output(), Path::new("/tmp/custom.csv"));
    }

    #[test]
    fn test_session_default_output_from_config() {
        let config = Config::default();
        let session = Session::new(config, "/dev/ttyUSB0", 9600);
        assert_eq!(session.output(), Path::new("voltage_log.csv"));
    }

    #[test]
    fn test_session_stats_serialize() {
        let stats = SessionStats {
            lines_read: 4,
            rows_written: 3,
            lines_skipped: 1,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"lines_read\":4"));
        assert!(json.contains("\"rows_written\":3"));
    }

    #[test]
    fn test_loop_exit_debug() {
        let exit = LoopExit::StopRequested;
        assert_eq!(format!("{exit:?}"), "StopRequested");
    }

    #[test]
    fn test_stop_handle_usable_across_threads() {
        let handle = StopHandle::new();
        let remote = handle.clone();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.stop();
        });

        worker.join().unwrap();
        assert!(handle.should_stop());
    }
}
