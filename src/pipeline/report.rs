//! Summary of one pipeline run, folded from the event stream.

use crate::pipeline::bridge::PipelineEvent;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub generated: u64,
    pub admitted: u64,
    /// Offers the gate had to hold for lack of capacity.
    pub held: u64,
    pub decrement_pulses: u64,
    pub capacity_returned: u64,
    /// Aggregate brightness values in completion order.
    pub aggregates: Vec<u64>,
    pub empty_records: u64,
    /// Aggregates that could not be written to the brightness log.
    pub log_write_failures: u64,
    pub peak_in_flight: usize,
    pub stages_exited: usize,
    pub stage_failures: Vec<String>,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn record(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Generated { .. } => self.generated += 1,
            PipelineEvent::Admitted { in_flight, .. } => {
                self.admitted += 1;
                self.peak_in_flight = self.peak_in_flight.max(*in_flight);
            }
            PipelineEvent::Held { .. } => self.held += 1,
            PipelineEvent::CapacityReturned { .. } => self.capacity_returned += 1,
            PipelineEvent::Aggregate { value, .. } => self.aggregates.push(*value),
            PipelineEvent::EmptyRecord { .. } => self.empty_records += 1,
            PipelineEvent::LogWriteFailures { count } => self.log_write_failures += count,
            PipelineEvent::Completed { .. } => self.decrement_pulses += 1,
            PipelineEvent::StageExited { .. } => self.stages_exited += 1,
            PipelineEvent::StageFailed { name, message, .. } => {
                self.stage_failures.push(format!("{name}: {message}"))
            }
        }
    }

    /// Every generated matrix was admitted and returned exactly one pulse,
    /// and every matrix either produced an aggregate or was empty.
    pub fn is_balanced(&self) -> bool {
        self.generated == self.admitted
            && self.admitted == self.decrement_pulses
            && self.decrement_pulses == self.capacity_returned
            && self.aggregates.len() as u64 + self.empty_records == self.admitted
            && self.stage_failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::id::{ItemId, NodeId};

    fn complete_item(report: &mut PipelineReport, n: u64, in_flight: usize) {
        let item = ItemId(n);
        report.record(&PipelineEvent::Generated { item });
        report.record(&PipelineEvent::Admitted { item, in_flight });
        report.record(&PipelineEvent::Aggregate { item, value: n * 10 });
        report.record(&PipelineEvent::Completed { item });
        report.record(&PipelineEvent::CapacityReturned {
            item,
            in_flight: in_flight - 1,
        });
    }

    #[test]
    fn test_balanced_run() {
        let mut report = PipelineReport::default();
        complete_item(&mut report, 0, 1);
        complete_item(&mut report, 1, 2);
        assert!(report.is_balanced());
        assert_eq!(report.aggregates, vec![0, 10]);
        assert_eq!(report.peak_in_flight, 2);
    }

    #[test]
    fn test_missing_pulse_is_unbalanced() {
        let mut report = PipelineReport::default();
        complete_item(&mut report, 0, 1);
        let item = ItemId(1);
        report.record(&PipelineEvent::Generated { item });
        report.record(&PipelineEvent::Admitted { item, in_flight: 1 });
        report.record(&PipelineEvent::EmptyRecord { item });
        assert!(!report.is_balanced());
    }

    #[test]
    fn test_failure_is_unbalanced() {
        let mut report = PipelineReport::default();
        report.record(&PipelineEvent::StageFailed {
            node_id: NodeId(3),
            name: "max_finder",
            message: "boom".into(),
        });
        assert!(!report.is_balanced());
        assert_eq!(report.stage_failures, vec!["max_finder: boom".to_string()]);
    }
}
