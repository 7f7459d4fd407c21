//! Bounded pending-action queue. Ordered by priority (highest first), FIFO
//! within a priority.

use std::collections::VecDeque;

use crate::types::ActionEvent;

#[derive(Debug)]
pub struct ActionQueue {
    items: VecDeque<ActionEvent>,
    capacity: usize,
}

impl ActionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEvent> {
        self.items.iter()
    }

    /// Insert behind every event of equal or higher priority, so an event
    /// outranking the head goes to the front. Returns the event evicted to
    /// stay within capacity, if any.
    pub fn push(&mut self, event: ActionEvent) -> Option<ActionEvent> {
        let pos = self
            .items
            .iter()
            .position(|e| e.priority < event.priority)
            .unwrap_or(self.items.len());
        self.items.insert(pos, event);

        if self.items.len() > self.capacity {
            self.evict_lowest()
        } else {
            None
        }
    }

    /// Drop the oldest event of the lowest priority tier.
    fn evict_lowest(&mut self) -> Option<ActionEvent> {
        let lowest = self.items.back()?.priority;
        let idx = self.items.iter().position(|e| e.priority == lowest)?;
        self.items.remove(idx)
    }

    pub fn pop(&mut self) -> Option<ActionEvent> {
        self.items.pop_front()
    }

    /// Remove and return the first (highest priority) event matching `pred`.
    pub fn pop_first(&mut self, pred: impl Fn(&ActionEvent) -> bool) -> Option<ActionEvent> {
        let idx = self.items.iter().position(pred)?;
        self.items.remove(idx)
    }

    /// Drop every event matching `pred`.
    pub fn remove_where(&mut self, pred: impl Fn(&ActionEvent) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|e| !pred(e));
        before - self.items.len()
    }

    pub fn peek(&self) -> Option<&ActionEvent> {
        self.items.front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;

    fn ev(kind: ActionKind, priority: i32) -> ActionEvent {
        ActionEvent::external(kind, priority)
    }

    #[test]
    fn test_higher_priority_preempts_head() {
        let mut q = ActionQueue::new(4);
        q.push(ev(ActionKind::Idle, 10));
        q.push(ev(ActionKind::Celebrate, 80));
        assert_eq!(q.peek().unwrap().kind, ActionKind::Celebrate);
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut q = ActionQueue::new(4);
        q.push(ev(ActionKind::React, 60));
        q.push(ev(ActionKind::Eat, 60));
        assert_eq!(q.pop().unwrap().kind, ActionKind::React);
        assert_eq!(q.pop().unwrap().kind, ActionKind::Eat);
        assert!(q.pop().is_none());
    }

    #[test]
    fn test_overflow_drops_lowest_never_highest() {
        let mut q = ActionQueue::new(3);
        q.push(ev(ActionKind::Unavailable, 0));
        q.push(ev(ActionKind::Idle, 10));
        q.push(ev(ActionKind::React, 60));
        let dropped = q.push(ev(ActionKind::Celebrate, 80)).unwrap();
        assert_eq!(dropped.kind, ActionKind::Unavailable);
        assert_eq!(q.len(), 3);
        assert_eq!(q.peek().unwrap().kind, ActionKind::Celebrate);
    }

    #[test]
    fn test_overflow_drops_oldest_of_lowest_tier() {
        let mut q = ActionQueue::new(2);
        q.push(ev(ActionKind::React, 60));
        q.push(ev(ActionKind::Eat, 60));
        let dropped = q.push(ev(ActionKind::Happy, 60)).unwrap();
        assert_eq!(dropped.kind, ActionKind::React);
        let kinds: Vec<_> = q.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Eat, ActionKind::Happy]);
    }

    #[test]
    fn test_new_lowest_event_is_the_one_dropped() {
        let mut q = ActionQueue::new(1);
        q.push(ev(ActionKind::Celebrate, 80));
        let dropped = q.push(ev(ActionKind::Unavailable, 0)).unwrap();
        assert_eq!(dropped.kind, ActionKind::Unavailable);
        assert_eq!(q.peek().unwrap().kind, ActionKind::Celebrate);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut q = ActionQueue::new(5);
        for i in 0..50 {
            q.push(ev(ActionKind::React, i % 7));
            assert!(q.len() <= q.capacity());
        }
    }
}
