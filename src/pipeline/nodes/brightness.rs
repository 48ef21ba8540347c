//! BrightnessNode — aggregate-brightness branch.
//!
//! For each record, averages every sample of every flagged neighborhood
//! (neighbors and center) across all three analyses and emits the integer
//! mean. Records with no flagged position have no mean; they produce an
//! `EmptyRecord` event instead of a value and still complete normally.
//!
//! The optional [`BrightnessLog`] receives one decimal value per line. It is
//! owned by this stage's single thread, so appends are serialized.

use crate::config::ConfigError;
use crate::pipeline::bridge::PipelineEvent;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::Tagged;
use crate::pipeline::node::StageContext;
use crate::pipeline::packet::{CombinedRecord, Completion};
use crate::pipeline::port::{PortDescriptor, PortKind};
use crossbeam_channel::{Receiver, Sender};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", PortKind::Record),
    PortDescriptor::output("done", PortKind::Completion),
];

/// Integer mean of all neighborhood samples of all flagged positions, or
/// `None` when nothing is flagged.
pub fn aggregate_brightness(record: &CombinedRecord) -> Option<u64> {
    let (sum, count) = record
        .neighborhoods()
        .fold((0u64, 0u64), |(sum, count), hood| {
            (sum + hood.sum(), count + hood.len() as u64)
        });
    sum.checked_div(count)
}

/// Line-per-value sink for aggregate scalars.
///
/// Write failures never fail the stage: the first one is logged as a
/// warning, later ones are only counted.
pub struct BrightnessLog {
    writer: Box<dyn Write + Send>,
    path: Option<PathBuf>,
    failures: u64,
}

impl BrightnessLog {
    /// Create (or truncate) the log file at `path`.
    pub fn create(path: &Path) -> Result<Self, ConfigError> {
        let file = File::create(path).map_err(|source| ConfigError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
            path: Some(path.to_path_buf()),
            failures: 0,
        })
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            path: None,
            failures: 0,
        }
    }

    pub fn append(&mut self, value: u64) {
        let result = writeln!(self.writer, "{value}").and_then(|()| self.writer.flush());
        if let Err(e) = result {
            if self.failures == 0 {
                tracing::warn!(
                    path = ?self.path,
                    "Failed to write brightness log, further failures are not reported: {}",
                    e
                );
            }
            self.failures += 1;
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl std::fmt::Debug for BrightnessLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrightnessLog")
            .field("path", &self.path)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

pub struct BrightnessNode {
    input: Receiver<Arc<CombinedRecord>>,
    output: Sender<Completion>,
    log: Option<BrightnessLog>,
}

impl BrightnessNode {
    pub fn new(
        input: Receiver<Arc<CombinedRecord>>,
        output: Sender<Completion>,
        log: Option<BrightnessLog>,
    ) -> Self {
        Self { input, output, log }
    }

    pub fn name(&self) -> &'static str {
        "brightness"
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    pub fn run(mut self, ctx: &StageContext) -> PipelineResult<()> {
        for record in self.input.iter() {
            let item = record.item();
            match aggregate_brightness(&record) {
                Some(value) => {
                    tracing::trace!(stage = ctx.name, %item, value, "aggregate");
                    ctx.emit(PipelineEvent::Aggregate { item, value });
                    if let Some(log) = self.log.as_mut() {
                        log.append(value);
                    }
                }
                None => {
                    tracing::debug!(%item, "no flagged positions, aggregate skipped");
                    ctx.emit(PipelineEvent::EmptyRecord { item });
                }
            }

            self.output
                .send(Completion { item })
                .map_err(|_| PipelineError::Disconnected(ctx.name))?;
        }

        if let Some(log) = &self.log {
            if log.failures() > 0 {
                tracing::debug!(failures = log.failures(), "brightness log lines lost");
                ctx.emit(PipelineEvent::LogWriteFailures {
                    count: log.failures(),
                });
            }
        }
        Ok(())
    }
}
