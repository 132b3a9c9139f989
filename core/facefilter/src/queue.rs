use std::collections::VecDeque;

/// What a render request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKey {
    /// The full composited image.
    Result,
    /// The overview grid of all faces.
    Overview,
    /// The padded preview of one region.
    Preview(usize),
}

/// Coalescing queue of render requests.
///
/// Holds at most one pending request per key. Asking again for a key that is
/// already pending supersedes the earlier request instead of adding another.
/// Asking for the key that is currently rendering queues exactly one rerun.
#[derive(Debug, Default)]
pub struct RenderQueue {
    pending: VecDeque<RenderKey>,
    in_flight: Option<RenderKey>,
    superseded: u64,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key`. Returns `false` when an identical pending request
    /// absorbed it.
    pub fn push(&mut self, key: RenderKey) -> bool {
        if self.pending.contains(&key) {
            self.superseded += 1;
            return false;
        }
        self.pending.push_back(key);
        true
    }

    /// Take the next request and mark it in flight.
    pub fn start_next(&mut self) -> Option<RenderKey> {
        let key = self.pending.pop_front()?;
        self.in_flight = Some(key);
        Some(key)
    }

    /// Mark the in-flight request done.
    pub fn finish(&mut self) -> Option<RenderKey> {
        self.in_flight.take()
    }

    /// Drop every pending request, e.g. because the image changed.
    pub fn clear(&mut self) {
        self.superseded += self.pending.len() as u64;
        self.pending.clear();
    }

    pub fn in_flight(&self) -> Option<RenderKey> {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of requests that were absorbed or dropped without rendering.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_pending_request_is_coalesced() {
        let mut queue = RenderQueue::new();
        assert!(queue.push(RenderKey::Preview(0)));
        assert!(queue.push(RenderKey::Result));
        assert!(!queue.push(RenderKey::Preview(0)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.superseded(), 1);
    }

    #[test]
    fn in_flight_key_gets_one_rerun() {
        let mut queue = RenderQueue::new();
        queue.push(RenderKey::Overview);
        assert_eq!(queue.start_next(), Some(RenderKey::Overview));
        assert_eq!(queue.in_flight(), Some(RenderKey::Overview));

        assert!(queue.push(RenderKey::Overview));
        assert!(!queue.push(RenderKey::Overview));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.finish(), Some(RenderKey::Overview));
        assert_eq!(queue.start_next(), Some(RenderKey::Overview));
        assert!(queue.is_empty());
    }

    #[test]
    fn requests_keep_submission_order() {
        let mut queue = RenderQueue::new();
        queue.push(RenderKey::Preview(2));
        queue.push(RenderKey::Result);
        queue.push(RenderKey::Preview(1));
        assert_eq!(queue.start_next(), Some(RenderKey::Preview(2)));
        assert_eq!(queue.start_next(), Some(RenderKey::Result));
        assert_eq!(queue.start_next(), Some(RenderKey::Preview(1)));
        assert_eq!(queue.start_next(), None);
    }

    #[test]
    fn clear_counts_as_superseded() {
        let mut queue = RenderQueue::new();
        queue.push(RenderKey::Preview(0));
        queue.push(RenderKey::Preview(5));
        queue.push(RenderKey::Result);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.superseded(), 3);
    }
}
