//! Identifiers and a simple allocator for controller-owned tracks.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// Monotonic allocator for TrackId. IDs are opaque externally and never reused
/// by the same controller.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_track: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_track(&mut self) -> TrackId {
        let id = TrackId(self.next_track);
        self.next_track = self.next_track.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_track(), TrackId(0));
        assert_eq!(alloc.alloc_track(), TrackId(1));
    }
}
