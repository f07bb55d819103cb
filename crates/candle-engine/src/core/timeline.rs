/// Delayed signals keyed by session time.
///
/// Stands in for browser timeouts: the session schedules an item, and the
/// frame loop collects everything that has come due.
#[derive(Debug)]
pub struct Timeline<T> {
    pending: Vec<Scheduled<T>>,
    next_seq: u64,
}

#[derive(Debug)]
struct Scheduled<T> {
    due_ms: f64,
    seq: u64,
    item: T,
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Schedule `item` to fire `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled {
            due_ms: now_ms + delay_ms.max(0.0),
            seq,
            item,
        });
    }

    /// Remove and return every item due at `now_ms`, earliest first.
    /// Items due at the same instant come out in scheduling order.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| s.due_ms <= now_ms);
        self.pending = rest;
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|s| s.item).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_due_before_delay() {
        let mut tl = Timeline::new();
        tl.schedule(0.0, 300.0, "fade");
        assert!(tl.take_due(299.0).is_empty());
        assert_eq!(tl.take_due(300.0), vec!["fade"]);
        assert!(tl.is_empty());
    }

    #[test]
    fn due_items_ordered_by_time_then_insertion() {
        let mut tl = Timeline::new();
        tl.schedule(0.0, 800.0, 'c');
        tl.schedule(0.0, 300.0, 'a');
        tl.schedule(0.0, 300.0, 'b');
        tl.schedule(0.0, 5000.0, 'z');
        assert_eq!(tl.take_due(1000.0), vec!['a', 'b', 'c']);
        assert_eq!(tl.len(), 1);
    }

    #[test]
    fn negative_delay_fires_immediately() {
        let mut tl = Timeline::new();
        tl.schedule(100.0, -50.0, 1);
        assert_eq!(tl.take_due(100.0), vec![1]);
    }

    #[test]
    fn clear_drops_pending() {
        let mut tl = Timeline::new();
        tl.schedule(0.0, 10.0, ());
        tl.clear();
        assert!(tl.take_due(100.0).is_empty());
    }
}
