//! Soft-delete work items and their completion tracking.

use tokio::sync::mpsc;

/// Outcome of applying one [`DeleteBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// `mark_deleted` succeeded and changed this many rows.
    Applied(u64),
    /// `mark_deleted` failed; the error has already been logged.
    Failed,
}

/// A slice of one delete request, applied by a single `mark_deleted` call.
///
/// Created by [`partition`] and consumed by
/// [`crate::domain::delete_worker::DeletePipeline`] workers.
#[derive(Debug)]
pub struct DeleteBatch {
    pub owner_id: String,
    pub short_codes: Vec<String>,
    reply: mpsc::UnboundedSender<BatchOutcome>,
}

impl DeleteBatch {
    /// Reports the outcome to the ticket holder, if anyone is still listening.
    pub fn complete(self, outcome: BatchOutcome) {
        let _ = self.reply.send(outcome);
    }
}

/// Splits `short_codes` into batches of at most `batch_size` codes.
///
/// Order is preserved inside and across batches. An empty list yields no
/// batches.
pub fn partition(
    owner_id: &str,
    short_codes: Vec<String>,
    batch_size: usize,
    reply: &mpsc::UnboundedSender<BatchOutcome>,
) -> Vec<DeleteBatch> {
    let batch_size = batch_size.max(1);

    short_codes
        .chunks(batch_size)
        .map(|chunk| DeleteBatch {
            owner_id: owner_id.to_string(),
            short_codes: chunk.to_vec(),
            reply: reply.clone(),
        })
        .collect()
}

/// Aggregated result of one delete request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Number of batches the request was split into.
    pub batches: usize,
    /// Batches that reported back, successfully or not.
    pub completed: usize,
    /// Rows flipped to `deleted` across all successful batches.
    pub rows_updated: u64,
    /// Batches whose `mark_deleted` call failed.
    pub failed: usize,
}

/// Completion handle returned for every accepted delete request.
///
/// Dropping the ticket does not cancel anything.
#[derive(Debug)]
pub struct DeleteTicket {
    batches: usize,
    replies: mpsc::UnboundedReceiver<BatchOutcome>,
}

impl DeleteTicket {
    pub(crate) fn new(batches: usize, replies: mpsc::UnboundedReceiver<BatchOutcome>) -> Self {
        Self { batches, replies }
    }

    /// Number of batches the request was split into.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Waits until every batch has reported, or until no batch can report any
    /// more (the pipeline dropped them).
    pub async fn wait(mut self) -> DeleteSummary {
        let mut summary = DeleteSummary {
            batches: self.batches,
            ..DeleteSummary::default()
        };

        while summary.completed < self.batches {
            match self.replies.recv().await {
                Some(BatchOutcome::Applied(rows)) => summary.rows_updated += rows,
                Some(BatchOutcome::Failed) => summary.failed += 1,
                None => break,
            }
            summary.completed += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i:05}")).collect()
    }

    #[test]
    fn test_partition_splits_into_fixed_size_batches() {
        let (tx, _rx) = mpsc::unbounded_channel();

        let batches = partition("user-a", codes(2500), 1000, &tx);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].short_codes.len(), 1000);
        assert_eq!(batches[1].short_codes.len(), 1000);
        assert_eq!(batches[2].short_codes.len(), 500);
        assert!(batches.iter().all(|b| b.owner_id == "user-a"));
        assert_eq!(batches[1].short_codes[0], "c01000");
    }

    #[test]
    fn test_partition_empty_list() {
        let (tx, _rx) = mpsc::unbounded_channel();

        let batches = partition("user-a", Vec::new(), 1000, &tx);

        assert!(batches.is_empty());
    }

    #[test]
    fn test_partition_zero_batch_size_is_treated_as_one() {
        let (tx, _rx) = mpsc::unbounded_channel();

        let batches = partition("user-a", codes(3), 0, &tx);

        assert_eq!(batches.len(), 3);
    }

    #[tokio::test]
    async fn test_ticket_aggregates_outcomes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let batches = partition("user-a", codes(3), 1, &tx);
        drop(tx);

        let ticket = DeleteTicket::new(batches.len(), rx);
        let mut iter = batches.into_iter();
        iter.next().unwrap().complete(BatchOutcome::Applied(1));
        iter.next().unwrap().complete(BatchOutcome::Failed);
        iter.next().unwrap().complete(BatchOutcome::Applied(0));

        let summary = ticket.wait().await;

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.rows_updated, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_ticket_stops_when_batches_are_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let batches = partition("user-a", codes(2), 1, &tx);
        drop(tx);

        let ticket = DeleteTicket::new(batches.len(), rx);
        drop(batches);

        let summary = ticket.wait().await;

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.completed, 0);
    }
}
