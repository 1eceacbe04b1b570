/// Progress carried between runs of the sync job.
///
/// Owned by the job that drives the orchestrator; a fresh process starts from
/// `SyncCursor::default()` and re-derives its position from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCursor {
    /// Last node epoch for which snapshot and APY passes completed.
    pub last_epoch: Option<u64>,
    /// Set when at least one collection could not be backfilled last run.
    pub backfill_incomplete: bool,
}

impl SyncCursor {
    pub fn is_settled_at(&self, epoch: u64) -> bool {
        self.last_epoch == Some(epoch) && !self.backfill_incomplete
    }
}
