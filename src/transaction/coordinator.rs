use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::publisher::Publisher;

use super::{TransactionContext, TransactionEvent};

/// Outcome of handling one lifecycle event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Records handed to the publisher.
    pub attempted: usize,
    pub published: usize,
    /// Records lost because their publish failed after commit.
    pub failed: usize,
    /// Records dropped because the transaction aborted.
    pub discarded: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.attempted == 0 && self.discarded == 0
    }
}

/// Binds a transaction's outbox to the end of that transaction.
///
/// On commit every buffered record is published in capture order; a failed
/// publish is logged and the next record is still attempted. On abort the
/// buffer is dropped without touching the bus. The commit outcome is final by
/// the time this runs, so nothing here returns an error to the host.
pub struct LifecycleCoordinator {
    publisher: Arc<Publisher>,
}

impl LifecycleCoordinator {
    pub fn new(publisher: Arc<Publisher>) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// React to a lifecycle event of the transaction owning `ctx`.
    pub fn handle(&self, event: TransactionEvent, ctx: &mut TransactionContext) -> FlushReport {
        match event {
            TransactionEvent::Commit => self.flush(ctx),
            TransactionEvent::Abort => self.discard(ctx),
            other => {
                trace!(event = %other, transaction = %ctx.id(), "ignoring lifecycle event");
                FlushReport::default()
            }
        }
    }

    fn flush(&self, ctx: &mut TransactionContext) -> FlushReport {
        let mut report = FlushReport::default();
        if ctx.outbox().is_empty() {
            return report;
        }

        for record in ctx.drain() {
            report.attempted += 1;
            match self.publisher.publish(&record) {
                Ok(()) => report.published += 1,
                Err(failure) => {
                    report.failed += 1;
                    warn!(
                        table = %failure.table,
                        topic = %failure.topic,
                        error = %failure.source,
                        transaction = %ctx.id(),
                        "failed to publish notification after commit"
                    );
                }
            }
        }

        debug!(
            transaction = %ctx.id(),
            published = report.published,
            failed = report.failed,
            "flushed outbox on commit"
        );
        report
    }

    fn discard(&self, ctx: &mut TransactionContext) -> FlushReport {
        let discarded = ctx.drain().len();
        if discarded > 0 {
            debug!(transaction = %ctx.id(), discarded, "discarded outbox on abort");
        }
        FlushReport {
            discarded,
            ..Default::default()
        }
    }
}
