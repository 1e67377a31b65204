//! Pending task registry

use parking_lot::Mutex;

use crate::dispatcher::MailTask;

/// Ordered collection of in-flight [`MailTask`]s awaiting a drain.
///
/// Insertion order is record arrival order. The lock is only ever held for a
/// push or a swap, never across a suspension point, so a drain sees exactly
/// the tasks appended before it and none appended after.
#[derive(Debug, Default)]
pub struct PendingTasks {
    tasks: Mutex<Vec<MailTask>>,
}

impl PendingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, task: MailTask) {
        self.tasks.lock().push(task);
    }

    /// Remove and return everything currently pending, leaving the registry empty.
    pub fn snapshot_and_clear(&self) -> Vec<MailTask> {
        std::mem::take(&mut *self.tasks.lock())
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dispatcher::MailDispatcher,
        error::MailError,
        mailer::{Mailer, OutboundMail},
        record::{LogRecord, level},
    };

    struct Noop;

    #[async_trait::async_trait]
    impl Mailer for Noop {
        async fn send(&self, _mail: &OutboundMail) -> Result<(), MailError> {
            Ok(())
        }
    }

    fn dispatcher() -> MailDispatcher {
        MailDispatcher::new(
            Arc::new(Noop),
            Arc::new(|record: &LogRecord| record.level().to_string()),
            "app@example.com".parse().unwrap(),
            vec!["ops@example.com".parse().unwrap()],
        )
    }

    #[tokio::test]
    async fn test_snapshot_preserves_order_and_clears() {
        let dispatcher = dispatcher();
        let pending = PendingTasks::new();
        assert!(pending.is_empty());

        for _ in 0..3 {
            pending.append(dispatcher.dispatch(&LogRecord::with_message(level::ERROR, "x"), "error"));
        }
        assert_eq!(pending.len(), 3);

        let snapshot = pending.snapshot_and_clear();
        assert_eq!(snapshot.iter().map(MailTask::id).collect::<Vec<_>>(), [1, 2, 3]);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_appends_after_snapshot_are_kept_for_next_drain() {
        let dispatcher = dispatcher();
        let pending = PendingTasks::new();

        pending.append(dispatcher.dispatch(&LogRecord::with_message(level::ERROR, "a"), "error"));
        let first = pending.snapshot_and_clear();
        pending.append(dispatcher.dispatch(&LogRecord::with_message(level::ERROR, "b"), "error"));

        assert_eq!(first.len(), 1);
        let second = pending.snapshot_and_clear();
        assert_eq!(second.iter().map(MailTask::id).collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn test_snapshot_of_empty_registry() {
        assert!(PendingTasks::new().snapshot_and_clear().is_empty());
    }
}
