use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, PoisonError,
};

use fmu_driver::{Diagnostic, Logger, Origin, Status};

/// An owned copy of a [`Diagnostic`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub instance_name: String,
    pub status: Status,
    pub category: String,
    pub message: String,
    pub origin: Origin,
}

/// Keeps every diagnostic and counts stop requests.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<Record>>,
    stops: AtomicUsize,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    /// Whether any diagnostic message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(needle))
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Logger for RecordingLogger {
    fn log(&self, diagnostic: &Diagnostic<'_>) {
        log::debug!(
            target: diagnostic.instance_name,
            "{:?} [{}] {}",
            diagnostic.status,
            diagnostic.category,
            diagnostic.message
        );
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Record {
                instance_name: diagnostic.instance_name.to_owned(),
                status: diagnostic.status,
                category: diagnostic.category.to_owned(),
                message: diagnostic.message.to_owned(),
                origin: diagnostic.origin,
            });
    }

    fn request_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
