//! Task fan-out where the first success wins.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::CancellationToken;
use crate::errors::ExtractError;

/// How a race settled.
#[derive(Debug)]
pub enum RaceOutcome<T> {
    /// The first task to succeed.
    Winner {
        /// Spawn index of the winner.
        index: usize,
        /// Its result.
        value: T,
    },
    /// Every task failed. Failures are sorted by spawn index.
    AllFailed(Vec<(usize, ExtractError)>),
}

/// A group of equivalent tasks racing for one success.
///
/// Each task gets its own child of the group token, so one task can be cancelled
/// alone while cancelling the group reaches all of them. Dropping the group aborts
/// whatever is still running.
pub struct RaceGroup<T> {
    /// The cancellation token for this group.
    cancel_token: Arc<CancellationToken>,
    /// Running tasks, tagged with their spawn index.
    tasks: JoinSet<(usize, Result<T, ExtractError>)>,
}

impl<T: Send + 'static> RaceGroup<T> {
    /// Creates a group, linked to `parent` when given.
    #[must_use]
    pub fn new(parent: Option<&Arc<CancellationToken>>) -> Self {
        Self {
            cancel_token: parent.map_or_else(|| Arc::new(CancellationToken::new()), CancellationToken::child),
            tasks: JoinSet::new(),
        }
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Spawns a task in the group.
    pub fn spawn<F, Fut>(&mut self, index: usize, task: F)
    where
        F: FnOnce(Arc<CancellationToken>) -> Fut,
        Fut: Future<Output = Result<T, ExtractError>> + Send + 'static,
    {
        let fut = task(self.cancel_token.child());
        self.tasks.spawn(async move {
            let result = AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ExtractError::network("attempt panicked")));
            (index, result)
        });
    }

    /// Cancels and aborts every task still running.
    pub fn cancel_all(&mut self, reason: &str) {
        self.cancel_token.cancel(reason);
        self.tasks.abort_all();
    }

    /// Waits for the first success, cancelling the rest once it arrives.
    ///
    /// Results that arrive after the winner are never observed.
    pub async fn first_success(&mut self) -> RaceOutcome<T> {
        let mut failures = Vec::new();

        while let Some(joined) = self.tasks.join_next().await {
            // Only abort_all() produces a JoinError here, and it runs after a winner.
            let Ok((index, result)) = joined else {
                continue;
            };
            match result {
                Ok(value) => {
                    self.cancel_all("another attempt succeeded");
                    return RaceOutcome::Winner { index, value };
                }
                Err(error) => failures.push((index, error)),
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        RaceOutcome::AllFailed(failures)
    }

    /// Returns the number of tasks not yet joined.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl<T> std::fmt::Debug for RaceGroup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceGroup")
            .field("task_count", &self.tasks.len())
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_fastest_success_wins() {
        let mut group = RaceGroup::new(None);
        for (index, delay) in [(0, 300), (1, 100), (2, 200)] {
            group.spawn(index, move |_token| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(index)
            });
        }

        match group.first_success().await {
            RaceOutcome::Winner { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, 1);
            }
            RaceOutcome::AllFailed(_) => panic!("expected a winner"),
        }
        assert!(group.cancel_token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_block_success() {
        let mut group = RaceGroup::new(None);
        group.spawn(0, |_token| async { Err(ExtractError::status(500)) });
        group.spawn(1, |_token| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok("late but fine")
        });

        assert!(matches!(
            group.first_success().await,
            RaceOutcome::Winner { index: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_sorted_by_index() {
        let mut group: RaceGroup<()> = RaceGroup::new(None);
        group.spawn(0, |_token| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Err(ExtractError::network("slow failure"))
        });
        group.spawn(1, |_token| async { Err(ExtractError::network("fast failure")) });

        let RaceOutcome::AllFailed(failures) = group.first_success().await else {
            panic!("expected failures");
        };
        let indexes: Vec<_> = failures.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(failures[0].1.to_string(), "request failed: slow failure");
    }

    #[tokio::test(start_paused = true)]
    async fn test_losers_are_aborted() {
        let side_effects = Arc::new(AtomicUsize::new(0));
        let mut group = RaceGroup::new(None);

        group.spawn(0, |_token| async { Ok(()) });
        let effects = side_effects.clone();
        group.spawn(1, move |_token| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            effects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(matches!(group.first_success().await, RaceOutcome::Winner { index: 0, .. }));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(side_effects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_reaches_tasks() {
        let parent = Arc::new(CancellationToken::new());
        let mut group: RaceGroup<()> = RaceGroup::new(Some(&parent));
        group.spawn(0, |token| async move {
            token.cancelled().await;
            Err(ExtractError::Cancelled(token.reason().unwrap_or_default()))
        });

        parent.cancel("navigated away");
        let RaceOutcome::AllFailed(failures) = group.first_success().await else {
            panic!("expected failures");
        };
        assert!(matches!(&failures[0].1, ExtractError::Cancelled(r) if r == "navigated away"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_do_not_accumulate_on_parent() {
        let parent = Arc::new(CancellationToken::new());
        for _ in 0..1000 {
            let mut group: RaceGroup<()> = RaceGroup::new(Some(&parent));
            group.spawn(0, |_token| async { Ok(()) });
            assert!(matches!(group.first_success().await, RaceOutcome::Winner { .. }));
        }
        assert_eq!(parent.callback_count(), 0);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_count_drains_as_tasks_settle() {
        let mut group: RaceGroup<()> = RaceGroup::new(None);
        for index in 0..3 {
            group.spawn(index, |_token| async { Err(ExtractError::network("down")) });
        }
        assert_eq!(group.task_count(), 3);

        assert!(matches!(group.first_success().await, RaceOutcome::AllFailed(ref f) if f.len() == 3));
        assert_eq!(group.task_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_a_failure() {
        let mut group: RaceGroup<()> = RaceGroup::new(None);
        group.spawn(0, |_token| async {
            if true {
                panic!("boom");
            }
            Ok(())
        });

        let RaceOutcome::AllFailed(failures) = group.first_success().await else {
            panic!("expected failures");
        };
        assert_eq!(failures.len(), 1);
    }
}
