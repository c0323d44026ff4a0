use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::StepSnapshot;

const STARTED_BIT: u64 = 1 << 63;
const COUNT_MASK: u64 = STARTED_BIT - 1;

/// `(started, count)` packed into one atomic word so a reader can never see
/// half of an update.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    packed: AtomicU64,
}

impl SnapshotCell {
    pub fn store(&self, snapshot: StepSnapshot) {
        self.packed.store(pack(snapshot), Ordering::Release);
    }

    pub fn load(&self) -> StepSnapshot {
        unpack(self.packed.load(Ordering::Acquire))
    }
}

/// Read-only handle on the live session snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    cell: Arc<SnapshotCell>,
}

impl SnapshotReader {
    pub(crate) fn new(cell: Arc<SnapshotCell>) -> Self {
        Self { cell }
    }

    pub fn snapshot(&self) -> StepSnapshot {
        self.cell.load()
    }

    pub fn reply_value(&self) -> i64 {
        self.snapshot().reply_value()
    }
}

fn pack(snapshot: StepSnapshot) -> u64 {
    let count = snapshot.count.min(COUNT_MASK);
    if snapshot.started {
        count | STARTED_BIT
    } else {
        count
    }
}

fn unpack(word: u64) -> StepSnapshot {
    StepSnapshot {
        started: word & STARTED_BIT != 0,
        count: word & COUNT_MASK,
    }
}
