//! Binary layout for keyframe sequences.
//!
//! All integers and floats are little-endian; strings are `u32` length + UTF-8 bytes.
//!
//! ```text
//! Sequence  := u8 loop, str name, u32 keyframe_count, Keyframe*
//! Keyframe  := f64 time, str name, u32 pose_count, PoseEntry*
//! PoseEntry := str key, str name, str parent_key (empty = root),
//!              f64[12] transform (position, then basis rows),
//!              u32 easing_direction, str easing_style, f64 weight
//! ```
//!
//! Decoding is bounds-checked: every length is validated against the remaining
//! buffer before anything is allocated, and any structural problem aborts the
//! whole decode with [`BlendError::MalformedData`].

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::data::{EasingDirection, Keyframe, KeyframeSequence, Pose, PoseId};
use crate::error::{BlendError, Result};
use crate::transform::Transform;

/// Smallest encoded keyframe: time + empty name + zero poses.
const MIN_KEYFRAME_LEN: usize = 8 + 4 + 4;
/// Smallest encoded pose entry: four empty strings, 12 components, direction, weight.
const MIN_POSE_LEN: usize = 4 * 4 + 12 * 8 + 4 + 8;

impl KeyframeSequence {
    /// Encode into the binary layout.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode_into(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode from the binary layout. Trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

/// Write `seq` to any byte sink.
pub fn encode_into<W: Write>(seq: &KeyframeSequence, w: &mut W) -> Result<()> {
    w.write_u8(u8::from(seq.looped))?;
    write_str(w, &seq.name)?;
    write_len(w, seq.len())?;
    for kf in seq.keyframes() {
        w.write_f64::<LittleEndian>(kf.time)?;
        write_str(w, &kf.name)?;
        write_len(w, kf.len())?;
        for (id, key, pose) in kf.iter() {
            write_str(w, key)?;
            write_str(w, &pose.name)?;
            let parent_key = kf.parent_of(id).and_then(|p| kf.key_of(p)).unwrap_or("");
            write_str(w, parent_key)?;
            for c in pose.transform.components() {
                w.write_f64::<LittleEndian>(c)?;
            }
            w.write_u32::<LittleEndian>(pose.easing_direction.ordinal())?;
            write_str(w, &pose.easing_style)?;
            w.write_f64::<LittleEndian>(pose.weight)?;
        }
    }
    Ok(())
}

fn write_len<W: Write>(w: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| BlendError::Encode {
        reason: format!("length {len} does not fit in u32"),
    })?;
    w.write_u32::<LittleEndian>(len)?;
    Ok(())
}

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<()> {
    write_len(w, s.len())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Parse a sequence from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<KeyframeSequence> {
    let mut r = Reader::new(bytes);
    let looped = match r.u8()? {
        0 => false,
        1 => true,
        other => return Err(BlendError::malformed(0, format!("invalid loop flag {other}"))),
    };
    let name = r.string()?;
    let count = r.count(MIN_KEYFRAME_LEN)?;
    let mut keyframes = Vec::with_capacity(count);
    for _ in 0..count {
        keyframes.push(read_keyframe(&mut r)?);
    }
    if r.remaining() != 0 {
        return Err(BlendError::malformed(
            r.pos,
            format!("{} trailing bytes", r.remaining()),
        ));
    }
    Ok(KeyframeSequence::new(name, looped, keyframes))
}

struct PoseEntry {
    offset: usize,
    key: String,
    pose: Pose,
    parent_key: String,
}

fn read_keyframe(r: &mut Reader<'_>) -> Result<Keyframe> {
    let start = r.pos;
    let time = r.f64()?;
    if !time.is_finite() {
        return Err(BlendError::malformed(start, format!("keyframe time {time} is not finite")));
    }
    let name = r.string()?;
    let count = r.count(MIN_POSE_LEN)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(read_pose(r)?);
    }

    let mut kf = Keyframe::new(name, time);
    for entry in &entries {
        kf.add_pose(entry.key.clone(), entry.pose.clone(), None)
            .map_err(|err| BlendError::malformed(entry.offset, err.to_string()))?;
    }
    // Parents may appear after their children, so link once every key exists.
    for (i, entry) in entries.iter().enumerate() {
        if entry.parent_key.is_empty() {
            continue;
        }
        kf.set_parent(PoseId(i), kf.pose_id(&entry.parent_key));
    }
    if let Some(i) = find_cycle(&kf) {
        return Err(BlendError::malformed(
            entries[i].offset,
            format!("parent chain of pose '{}' forms a cycle", entries[i].key),
        ));
    }
    Ok(kf)
}

fn read_pose(r: &mut Reader<'_>) -> Result<PoseEntry> {
    let offset = r.pos;
    let key = r.string()?;
    let name = r.string()?;
    let parent_key = r.string()?;
    let mut components = [0.0; 12];
    for c in components.iter_mut() {
        *c = r.f64()?;
    }
    if components.iter().any(|c| !c.is_finite()) {
        return Err(BlendError::malformed(offset, "non-finite transform component"));
    }
    let dir_offset = r.pos;
    let direction = EasingDirection::from_ordinal(r.u32()?).ok_or_else(|| {
        BlendError::malformed(dir_offset, "easing direction out of range")
    })?;
    let style = r.string()?;
    let weight = r.f64()?;

    let pose = Pose::new(name)
        .with_transform(Transform::from_components(components))
        .with_easing(style, direction)
        .with_weight(weight);
    Ok(PoseEntry {
        offset,
        key,
        pose,
        parent_key,
    })
}

/// Index of a pose whose parent chain loops back, if any.
fn find_cycle(kf: &Keyframe) -> Option<usize> {
    (0..kf.len()).find(|&i| {
        let mut cur = kf.parent_of(PoseId(i));
        for _ in 0..kf.len() {
            match cur {
                Some(PoseId(p)) if p == i => return true,
                Some(p) => cur = kf.parent_of(p),
                None => return false,
            }
        }
        cur.is_some()
    })
}

/// Cursor over an input slice that reports the failing offset.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(BlendError::malformed(
                self.pos,
                format!("need {n} bytes, {} remain", self.remaining()),
            ));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    /// Element count whose minimum encoded size must fit in what is left.
    fn count(&mut self, min_elem_len: usize) -> Result<usize> {
        let at = self.pos;
        let n = self.u32()? as usize;
        if n.saturating_mul(min_elem_len) > self.remaining() {
            return Err(BlendError::malformed(
                at,
                format!("count {n} exceeds remaining buffer"),
            ));
        }
        Ok(n)
    }

    fn string(&mut self) -> Result<String> {
        let at = self.pos;
        let len = self.u32()? as usize;
        if len > self.remaining() {
            return Err(BlendError::malformed(at, "string length exceeds buffer"));
        }
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| BlendError::malformed(at, "string is not valid UTF-8"))
    }
}
