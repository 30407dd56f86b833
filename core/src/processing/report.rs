use std::collections::BTreeMap;

use serde::Serialize;

use crate::prelude::{ErrorKind, NavError};

/// One ensemble that did not make it into the series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleFailure {
    /// Position of the buffer in the source, from zero.
    pub sequence: usize,
    /// Byte offset of the buffer within the concatenated source.
    pub byte_offset: usize,
    pub error: NavError,
}

/// Outcome of feeding a sequence of buffers through the pipeline.
///
/// Only the first `max_reported` failures are kept in detail; `failed`
/// counts all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub appended: usize,
    pub failed: usize,
    pub failures: Vec<EnsembleFailure>,
    /// Sequence number of the buffer whose hard error stopped the run.
    pub halted_at: Option<usize>,
    #[serde(skip)]
    max_reported: usize,
}

impl BatchReport {
    pub fn new(max_reported: usize) -> Self {
        Self {
            attempted: 0,
            appended: 0,
            failed: 0,
            failures: Vec::new(),
            halted_at: None,
            max_reported,
        }
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.appended += 1;
    }

    pub fn record_failure(&mut self, failure: EnsembleFailure) {
        self.attempted += 1;
        self.failed += 1;
        if failure.error.is_hard() && self.halted_at.is_none() {
            self.halted_at = Some(failure.sequence);
        }
        if self.failures.len() < self.max_reported {
            self.failures.push(failure);
        }
    }

    /// Number of failed ensembles.
    pub fn len(&self) -> usize {
        self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.failed == 0
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// Failures per kind among the reported ones.
    pub fn kinds(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.error.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Byte offsets of the reported failures.
    pub fn offending_offsets(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.byte_offset).collect()
    }
}
