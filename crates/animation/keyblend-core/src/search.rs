//! Bounding-keyframe search over a time-sorted keyframe list.
//!
//! Model:
//! - Keyframes are ascending by time.
//! - A query hitting a keyframe time exactly returns that keyframe on both sides.
//! - Outside the covered range one side is `None`; [`Bounds::segment`] coalesces it.

use crate::data::{Keyframe, KeyframeSequence};
use crate::error::{BlendError, Result};

/// Raw search result: indices of the keyframes surrounding the query time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

/// Bounds with the absent side filled in and the interpolation ratio resolved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub left: usize,
    pub right: usize,
    /// 0 when both sides share a time, else the position of `time` between them.
    pub ratio: f64,
}

/// Binary search for the keyframes bounding `time`. O(log n).
pub fn bounding_keyframes(keyframes: &[Keyframe], time: f64) -> Result<Bounds> {
    if keyframes.is_empty() {
        return Err(BlendError::invalid(
            "bounding keyframe search on an empty keyframe list",
        ));
    }
    let mut left = None;
    let mut right = None;
    let mut low = 0usize;
    let mut high = keyframes.len();
    while low < high {
        let mid = low + (high - low) / 2;
        let t = keyframes[mid].time;
        if t == time {
            return Ok(Bounds {
                left: Some(mid),
                right: Some(mid),
            });
        }
        if t < time {
            left = Some(mid);
            low = mid + 1;
        } else {
            right = Some(mid);
            high = mid;
        }
    }
    Ok(Bounds { left, right })
}

impl Bounds {
    /// Coalesce a missing side to the present one and compute the ratio at `time`.
    pub fn segment(self, keyframes: &[Keyframe], time: f64) -> Option<Segment> {
        let (left, right) = match (self.left, self.right) {
            (Some(l), Some(r)) => (l, r),
            (Some(l), None) => (l, l),
            (None, Some(r)) => (r, r),
            (None, None) => return None,
        };
        let lt = keyframes[left].time;
        let rt = keyframes[right].time;
        let ratio = if lt == rt {
            0.0
        } else {
            (time - lt) / (rt - lt)
        };
        Some(Segment { left, right, ratio })
    }
}

impl KeyframeSequence {
    /// Bounding keyframes of this sequence at `time`.
    pub fn bounding_keyframes(&self, time: f64) -> Result<Bounds> {
        bounding_keyframes(self.keyframes(), time)
    }

    /// Coalesced segment of this sequence at `time`.
    pub fn segment_at(&self, time: f64) -> Result<Segment> {
        let bounds = self.bounding_keyframes(time)?;
        bounds
            .segment(self.keyframes(), time)
            .ok_or_else(|| BlendError::invalid("no keyframe bounds the query time"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kfs(times: &[f64]) -> Vec<Keyframe> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| Keyframe::new(format!("k{i}"), *t))
            .collect()
    }

    #[test]
    fn empty_is_an_error() {
        assert!(bounding_keyframes(&[], 0.0).is_err());
    }

    #[test]
    fn exact_hit_returns_same_keyframe() {
        let k = kfs(&[0.0, 1.0, 2.0]);
        let b = bounding_keyframes(&k, 1.0).unwrap();
        assert_eq!(b.left, Some(1));
        assert_eq!(b.right, Some(1));
        assert_eq!(b.segment(&k, 1.0).unwrap().ratio, 0.0);
    }

    #[test]
    fn between_keyframes() {
        let k = kfs(&[0.0, 1.0, 2.0]);
        let b = bounding_keyframes(&k, 1.5).unwrap();
        assert_eq!((b.left, b.right), (Some(1), Some(2)));
        assert_eq!(b.segment(&k, 1.5).unwrap().ratio, 0.5);
    }

    #[test]
    fn outside_range() {
        let k = kfs(&[0.0, 1.0, 2.0]);
        let before = bounding_keyframes(&k, -1.0).unwrap();
        assert_eq!((before.left, before.right), (None, Some(0)));
        let seg = before.segment(&k, -1.0).unwrap();
        assert_eq!((seg.left, seg.right, seg.ratio), (0, 0, 0.0));

        let after = bounding_keyframes(&k, 5.0).unwrap();
        assert_eq!((after.left, after.right), (Some(2), None));
        let seg = after.segment(&k, 5.0).unwrap();
        assert_eq!((seg.left, seg.right, seg.ratio), (2, 2, 0.0));
    }

    #[test]
    fn every_gap_of_a_long_list() {
        let times: Vec<f64> = (0..37).map(|i| i as f64 * 0.25).collect();
        let k = kfs(&times);
        for i in 0..times.len() - 1 {
            let q = times[i] + 0.1;
            let b = bounding_keyframes(&k, q).unwrap();
            assert_eq!((b.left, b.right), (Some(i), Some(i + 1)), "query {q}");
        }
    }

    #[test]
    fn single_keyframe() {
        let k = kfs(&[0.5]);
        assert_eq!(
            bounding_keyframes(&k, 0.0).unwrap(),
            Bounds {
                left: None,
                right: Some(0)
            }
        );
        assert_eq!(
            bounding_keyframes(&k, 0.5).unwrap(),
            Bounds {
                left: Some(0),
                right: Some(0)
            }
        );
    }
}
