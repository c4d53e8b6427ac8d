use crate::models::BenchmarkId;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Benchmark shown when nothing else has been selected
pub const DEFAULT_BENCHMARK_ID: &str = "1";

/// Shared, externally settable selection cells.
///
/// Cloning yields another handle to the same cells. Setting a cell to a new
/// value notifies every subscriber immediately; setting the current value
/// again is a no-op.
#[derive(Debug, Clone)]
pub struct Selection {
    benchmark: Arc<watch::Sender<BenchmarkId>>,
    question: Arc<watch::Sender<Option<String>>>,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(DEFAULT_BENCHMARK_ID)
    }
}

fn set_if_changed<T: PartialEq>(cell: &watch::Sender<T>, value: T) -> bool {
    cell.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

impl Selection {
    pub fn new(initial_benchmark: impl Into<BenchmarkId>) -> Self {
        let (benchmark, _) = watch::channel(initial_benchmark.into());
        let (question, _) = watch::channel(None);
        Self {
            benchmark: Arc::new(benchmark),
            question: Arc::new(question),
        }
    }

    pub fn selected_benchmark_id(&self) -> BenchmarkId {
        self.benchmark.borrow().clone()
    }

    /// Select a benchmark. Returns whether the value changed.
    pub fn set_selected_benchmark_id(&self, id: impl Into<BenchmarkId>) -> bool {
        let id = id.into();
        debug!(benchmark_id = %id, "selecting benchmark");
        set_if_changed(&self.benchmark, id)
    }

    pub fn subscribe_benchmark(&self) -> watch::Receiver<BenchmarkId> {
        self.benchmark.subscribe()
    }

    pub fn active_question_id(&self) -> Option<String> {
        self.question.borrow().clone()
    }

    /// Set or clear the active question. Returns whether the value changed.
    pub fn set_active_question_id(&self, id: Option<String>) -> bool {
        debug!(question_id = ?id, "setting active question");
        set_if_changed(&self.question, id)
    }

    pub fn subscribe_question(&self) -> watch::Receiver<Option<String>> {
        self.question.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let selection = Selection::default();
        assert_eq!(selection.selected_benchmark_id(), "1");
        assert_eq!(selection.active_question_id(), None);
    }

    #[test]
    fn test_set_benchmark_notifies_subscribers() {
        let selection = Selection::default();
        let mut rx = selection.subscribe_benchmark();
        assert!(!rx.has_changed().unwrap());

        assert!(selection.set_selected_benchmark_id("2"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "2");
        assert_eq!(selection.selected_benchmark_id(), "2");
    }

    #[test]
    fn test_setting_same_value_does_not_notify() {
        let selection = Selection::default();
        let rx = selection.subscribe_benchmark();

        assert!(!selection.set_selected_benchmark_id("1"));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_clones_share_cells() {
        let selection = Selection::default();
        let other = selection.clone();

        other.set_active_question_id(Some("q-9".to_string()));
        assert_eq!(selection.active_question_id(), Some("q-9".to_string()));

        selection.set_active_question_id(None);
        assert_eq!(other.active_question_id(), None);
    }

    #[test]
    fn test_cells_are_independent() {
        let selection = Selection::default();
        let question_rx = selection.subscribe_question();

        selection.set_selected_benchmark_id("5");
        assert!(!question_rx.has_changed().unwrap());
    }

    #[test]
    fn test_no_validation_against_catalog() {
        let selection = Selection::new("does-not-exist");
        assert_eq!(selection.selected_benchmark_id(), "does-not-exist");
    }

    #[tokio::test]
    async fn test_subscriber_wakes_on_change() {
        let selection = Selection::default();
        let mut rx = selection.subscribe_benchmark();

        let waiter = tokio::spawn(async move {
            rx.changed().await.unwrap();
            rx.borrow().clone()
        });

        tokio::task::yield_now().await;
        selection.set_selected_benchmark_id("3");
        assert_eq!(waiter.await.unwrap(), "3");
    }
}
