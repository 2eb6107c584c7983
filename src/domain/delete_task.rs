//! Deletion request model for asynchronous soft deletes.

use std::collections::BTreeSet;

/// A request to soft-delete a set of short IDs on behalf of one owner.
///
/// Created by [`crate::application::services::LinkService::enqueue_delete`],
/// sent through the bounded queue and consumed by exactly one
/// [`crate::domain::deletion_pipeline`] worker. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    pub owner_id: String,
    pub short_ids: BTreeSet<String>,
}

impl DeleteTask {
    /// Creates a task, collapsing duplicate IDs.
    pub fn new(owner_id: impl Into<String>, short_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_ids: short_ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.short_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_task_creation() {
        let task = DeleteTask::new("u1", vec!["a".to_string(), "b".to_string()]);

        assert_eq!(task.owner_id, "u1");
        assert_eq!(task.len(), 2);
        assert!(task.short_ids.contains("a"));
    }

    #[test]
    fn test_delete_task_collapses_duplicates() {
        let task = DeleteTask::new(
            "u1",
            vec!["a".to_string(), "a".to_string(), "b".to_string()],
        );

        assert_eq!(task.len(), 2);
    }

    #[test]
    fn test_empty_task() {
        let task = DeleteTask::new("u1", Vec::new());
        assert!(task.is_empty());
    }
}
