use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use super::channel::{Channel, Reading};
use super::sample::Sample;
use crate::error::LinkError;

/// Filename stamp, e.g. `20260115T093000Z`. Lexically sortable.
const FILE_STAMP: &str = "%Y%m%dT%H%M%SZ";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn log_file_name(channel: Channel, created_at: DateTime<Utc>) -> String {
    format!("{}_log_{}.csv", channel.name(), created_at.format(FILE_STAMP))
}

struct ChannelFile {
    path: PathBuf,
    writer: Box<dyn Write + Send>,
}

/// Result of logging one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOutcome {
    pub written: usize,
    pub failed: usize,
}

/// Append-only CSV writer, one file per measured channel.
///
/// The channel → file map is fixed at construction; records are routed by
/// channel key, never by file name.
pub struct ChannelLogger {
    files: BTreeMap<Channel, ChannelFile>,
    created_at: DateTime<Utc>,
}

impl ChannelLogger {
    pub fn create(dir: impl AsRef<Path>, created_at: DateTime<Utc>) -> Result<Self, LinkError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| LinkError::LogSetup {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = BTreeMap::new();
        for channel in Channel::MEASURED {
            let path = dir.join(log_file_name(channel, created_at));
            let file = open_with_header(&path, channel).map_err(|source| LinkError::LogSetup {
                path: path.clone(),
                source,
            })?;
            files.insert(
                channel,
                ChannelFile {
                    path,
                    writer: Box::new(file),
                },
            );
        }

        info!(dir = %dir.display(), channels = files.len(), "channel logger ready");
        Ok(Self { files, created_at })
    }

    /// Logger over caller-supplied writers. No header is written; channels
    /// without a writer are not logged. `path` is only used for reporting.
    pub fn from_writers<I>(writers: I, created_at: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (Channel, PathBuf, Box<dyn Write + Send>)>,
    {
        let files = writers
            .into_iter()
            .map(|(channel, path, writer)| (channel, ChannelFile { path, writer }))
            .collect();
        Self { files, created_at }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn path(&self, channel: Channel) -> Option<&Path> {
        self.files.get(&channel).map(|f| f.path.as_path())
    }

    pub fn paths(&self) -> impl Iterator<Item = (Channel, &Path)> {
        self.files.iter().map(|(c, f)| (*c, f.path.as_path()))
    }

    /// Append `timestamp,value` to every channel file. A failing file is
    /// reported and skipped; the others are still written.
    pub fn record(&mut self, sample: &Sample) -> LogOutcome {
        let stamp = format_timestamp(sample.received_at);
        let mut outcome = LogOutcome::default();

        for (channel, target) in self.files.iter_mut() {
            let Some(reading) = sample.reading(*channel) else {
                continue;
            };
            let line = format!("{stamp},{reading}\n");
            match target.writer.write_all(line.as_bytes()).and_then(|_| target.writer.flush()) {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!(channel = %channel, path = %target.path.display(), error = %e, "log write failed");
                }
            }
        }

        outcome
    }
}

fn open_with_header(path: &Path, channel: Channel) -> io::Result<File> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    // Reopening within the same second must not stamp a second header.
    if file.metadata()?.len() == 0 {
        writeln!(file, "time,{}", channel.name())?;
        file.flush()?;
    }
    Ok(file)
}

/// One data row of a channel log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub time: DateTime<Utc>,
    pub value: Reading,
}

/// Parse a channel log back into rows, checking the header names `channel`.
pub fn read_channel_log(path: impl AsRef<Path>, channel: Channel) -> Result<Vec<LogRow>, LinkError> {
    let path = path.as_ref();
    let fail = |reason: String| LinkError::LogRead {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| fail(e.to_string()))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| fail("empty file".into()))?
        .map_err(|e| fail(e.to_string()))?;
    let expected = format!("time,{}", channel.name());
    if header.trim() != expected {
        return Err(fail(format!("header {header:?}, expected {expected:?}")));
    }

    let mut rows = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line.map_err(|e| fail(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let (time, value) = line
            .split_once(',')
            .ok_or_else(|| fail(format!("row {}: missing separator", n + 1)))?;
        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| fail(format!("row {}: {e}", n + 1)))?
            .with_timezone(&Utc);
        let value = value
            .parse::<Reading>()
            .map_err(|e| fail(format!("row {}: {e}", n + 1)))?;
        rows.push(LogRow { time, value });
    }

    Ok(rows)
}
