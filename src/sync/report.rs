//! Run-wide failure accumulation. One entry per failure; a failing file or folder never aborts
//! its siblings, so the report is the single place a run's outcome is judged from.

use std::sync::Mutex;

use crate::error::TaskFailure;

#[derive(Default)]
pub struct SyncReport {
    failures: Mutex<Vec<TaskFailure>>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&self, failure: TaskFailure) {
        self.failures.lock().expect("sync report mutex poisoned").push(failure);
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().expect("sync report mutex poisoned").clone()
    }

    pub fn is_success(&self) -> bool {
        self.failures.lock().expect("sync report mutex poisoned").is_empty()
    }

    pub(crate) fn from_failures(failures: Vec<TaskFailure>) -> Self {
        let report = Self::new();
        for failure in failures {
            report.record_failure(failure);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn starts_empty_and_successful() {
        let report = SyncReport::new();
        assert!(report.is_success());
        assert!(report.failures().is_empty());
    }

    #[test]
    fn recording_a_failure_marks_the_run_unsuccessful() {
        let report = SyncReport::new();
        report.record_failure(TaskFailure::new("a.jpg", ErrorKind::LocalIO("oops".into())));
        assert!(!report.is_success());
        assert_eq!(report.failures().len(), 1);
    }
}
