//! Per-period collection of CPU readings, grouped by command.

use crate::summary::{PeriodSummary, TopCommand};
use indexmap::IndexMap;
use serde::Serialize;

/// Readings gathered since the last flush.
///
/// Commands keep the order in which they first appeared; the summary
/// relies on it to break ties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Accumulator {
    readings: IndexMap<String, Vec<f64>>,
}

impl Accumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one reading for `command`.
    pub fn record(&mut self, command: &str, cpu_percent: f64) {
        match self.readings.get_mut(command) {
            Some(values) => values.push(cpu_percent),
            None => {
                self.readings.insert(command.to_owned(), vec![cpu_percent]);
            }
        }
    }

    /// True when nothing was recorded since the last flush.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Number of distinct commands seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Readings for one command, in arrival order.
    #[must_use]
    pub fn get(&self, command: &str) -> Option<&[f64]> {
        self.readings.get(command).map(Vec::as_slice)
    }

    /// Hand over the collected readings and start a fresh period.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Iterate commands in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.readings
            .iter()
            .map(|(command, values)| (command.as_str(), values.as_slice()))
    }

    /// Reduce the period to its total and its top command, normalized by
    /// `core_count`.
    ///
    /// A command takes the top slot only with a strictly greater sum, so on
    /// ties the one that showed up first wins.
    #[must_use]
    pub fn summarize(&self, core_count: usize) -> PeriodSummary {
        let mut total = 0.0;
        let mut top = TopCommand::placeholder();

        for (command, values) in self.iter() {
            let summed: f64 = values.iter().sum();
            total += summed;
            if summed > top.summed_cpu_percent {
                top = TopCommand {
                    name: command.to_owned(),
                    summed_cpu_percent: summed,
                    process_count: values.len(),
                };
            }
        }

        let cores = core_count.max(1) as f64;
        top.summed_cpu_percent /= cores;

        PeriodSummary {
            total_cpu_percent: total / cores,
            top,
        }
    }
}
