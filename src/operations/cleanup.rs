use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::OperationsApi;

/// Outcome of a best-effort teardown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub cancelled: usize,
    pub deleted: usize,
    pub ignored_failures: usize,
}

/// Ids of operations started during a run, cleaned up at the end of it
#[derive(Debug, Default)]
pub struct CreatedOperations {
    ids: Mutex<Vec<Uuid>>,
}

impl CreatedOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, id: Uuid) {
        self.ids().push(id);
    }

    pub fn ids(&self) -> MutexGuard<'_, Vec<Uuid>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Cancel, then delete, every tracked operation.
    ///
    /// Failures are logged and skipped so that cleanup never masks the
    /// outcome of the run it follows. Tracked ids are drained.
    pub fn teardown<A>(&self, api: &A) -> TeardownReport
    where
        A: OperationsApi + ?Sized,
    {
        let ids: Vec<Uuid> = std::mem::take(&mut *self.ids());
        let mut report = TeardownReport::default();

        for id in ids {
            match api.cancel(id) {
                Ok(()) => report.cancelled += 1,
                Err(e) => {
                    log::debug!("Ignoring failure to cancel operation {id}: {e:#}");
                    report.ignored_failures += 1;
                }
            }

            match api.delete(id) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    log::debug!("Ignoring failure to delete {id}: {e:#}");
                    report.ignored_failures += 1;
                }
            }
        }

        if report.ignored_failures > 0 {
            log::info!("Teardown finished with {report:?}");
        }
        report
    }
}
