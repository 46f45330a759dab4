//! Priority-ordered queue of admitted analysis requests
//!
//! An ordered list, not a heap: expected depth is small and FIFO order
//! among equal priorities must be preserved. Insertion walks to the
//! first element of strictly lower urgency and inserts before it.

use crate::change::CodeChange;
use crate::rules::Priority;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use uuid::Uuid;

/// An admitted-but-not-yet-dispatched analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub change: CodeChange,
    pub priority: Priority,
    pub queued_at: DateTime<Utc>,
    /// Mentoring session that requested the analysis, if any
    pub session: Option<String>,
}

impl AnalysisRequest {
    pub fn new(change: CodeChange, priority: Priority, session: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            change,
            priority,
            queued_at: Utc::now(),
            session,
        }
    }
}

#[derive(Default)]
pub struct AnalysisQueue {
    items: VecDeque<AnalysisRequest>,
}

impl AnalysisQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping priority order, FIFO within a priority.
    pub fn enqueue(&mut self, request: AnalysisRequest) {
        let pos = self
            .items
            .iter()
            .position(|queued| queued.priority > request.priority);
        match pos {
            Some(idx) => self.items.insert(idx, request),
            None => self.items.push_back(request),
        }
    }

    /// Remove and return the most urgent request.
    pub fn dequeue(&mut self) -> Option<AnalysisRequest> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(priority: Priority) -> AnalysisRequest {
        let change = CodeChange::from_contents(
            PathBuf::from("src/app.ts"),
            "typescript",
            "",
            "let x = 1;",
        );
        AnalysisRequest::new(change, priority, None)
    }

    #[test]
    fn test_dequeue_order_by_urgency_then_arrival() {
        let mut queue = AnalysisQueue::new();
        let arrivals = [
            request(Priority::Low),
            request(Priority::High),
            request(Priority::Medium),
            request(Priority::Immediate),
            request(Priority::High),
        ];
        let first_high = arrivals[1].id;
        let second_high = arrivals[4].id;
        for req in arrivals {
            queue.enqueue(req);
        }

        let drained: Vec<AnalysisRequest> =
            std::iter::from_fn(|| queue.dequeue()).collect();
        let priorities: Vec<Priority> = drained.iter().map(|r| r.priority).collect();
        assert_eq!(
            priorities,
            vec![
                Priority::Immediate,
                Priority::High,
                Priority::High,
                Priority::Medium,
                Priority::Low,
            ]
        );

        // The two high-priority requests keep their arrival order.
        assert_eq!(drained[1].id, first_high);
        assert_eq!(drained[2].id, second_high);
    }

    #[test]
    fn test_later_high_priority_overtakes_queued_low() {
        let mut queue = AnalysisQueue::new();
        queue.enqueue(request(Priority::Low));
        queue.enqueue(request(Priority::Immediate));

        assert_eq!(queue.dequeue().map(|r| r.priority), Some(Priority::Immediate));
        assert_eq!(queue.dequeue().map(|r| r.priority), Some(Priority::Low));
    }

    #[test]
    fn test_dequeue_empty_returns_none() {
        let mut queue = AnalysisQueue::new();
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_len_tracks_contents() {
        let mut queue = AnalysisQueue::new();
        queue.enqueue(request(Priority::Medium));
        queue.enqueue(request(Priority::Medium));
        assert_eq!(queue.len(), 2);
        queue.dequeue();
        assert_eq!(queue.len(), 1);
    }
}
