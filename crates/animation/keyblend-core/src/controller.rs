//! Controller: owns tracks, drives per-step sampling and weighted accumulation,
//! and keeps the per-step pose cache used for hierarchy queries.
//!
//! Methods:
//! - new, load_track, play/stop/stop_all, tick_transitions, step, update
//! - cached_pose, ancestor_poses, compute_pose_transform, destroy

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::accumulate::blend_keyframes;
use crate::config::Config;
use crate::data::{Keyframe, KeyframeSequence, Pose, PoseId};
use crate::easing::{EasingRegistry, LINEAR};
use crate::error::{BlendError, Result};
use crate::ids::{IdAllocator, TrackId};
use crate::interp::track_alpha;
use crate::outputs::{ControllerStepped, PoseTransforms};
use crate::signal::Signal;
use crate::track::{valid_delta, PlayOptions, Track};
use crate::transform::Transform;

/// Source pose that first wrote a bone during the latest step.
#[derive(Clone, Debug)]
pub struct CachedPose {
    sequence: Arc<KeyframeSequence>,
    keyframe: usize,
    pose: PoseId,
}

impl CachedPose {
    #[inline]
    pub fn sequence(&self) -> &Arc<KeyframeSequence> {
        &self.sequence
    }

    #[inline]
    pub fn keyframe(&self) -> &Keyframe {
        &self.sequence.keyframes()[self.keyframe]
    }

    #[inline]
    pub fn id(&self) -> PoseId {
        self.pose
    }

    pub fn pose(&self) -> Option<&Pose> {
        self.keyframe().pose(self.pose)
    }
}

/// Walks parent links nearest-first. Bounded by the keyframe's pose count.
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    keyframe: Option<&'a Keyframe>,
    next: Option<PoseId>,
    remaining: usize,
}

impl<'a> Ancestors<'a> {
    fn empty() -> Self {
        Self {
            keyframe: None,
            next: None,
            remaining: 0,
        }
    }

    fn starting_at(keyframe: &'a Keyframe, start: PoseId) -> Self {
        Self {
            keyframe: Some(keyframe),
            next: keyframe.parent_of(start),
            remaining: keyframe.len(),
        }
    }

    /// Continue the walk yielding arena ids.
    pub fn ids(self) -> impl Iterator<Item = PoseId> + 'a {
        let mut walk = self;
        std::iter::from_fn(move || walk.advance().map(|(id, _)| id))
    }

    fn advance(&mut self) -> Option<(PoseId, &'a Pose)> {
        let kf = self.keyframe?;
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let pose = kf.pose(id)?;
        self.remaining -= 1;
        self.next = pose.parent();
        Some((id, pose))
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Pose;

    fn next(&mut self) -> Option<&'a Pose> {
        self.advance().map(|(_, pose)| pose)
    }
}

/// Playback and blending front-end.
#[derive(Debug)]
pub struct Controller {
    cfg: Config,
    ids: IdAllocator,
    tracks: Vec<Track>,
    easing: EasingRegistry,

    // Per-step state
    pose_cache: HashMap<String, CachedPose>,
    warned_styles: HashSet<String>,

    /// Fired after each step with the blended transforms.
    pub stepped: Signal<ControllerStepped>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Controller {
    pub fn new(cfg: Config) -> Self {
        Self::with_easing(cfg, EasingRegistry::new())
    }

    /// Create a controller with a host-populated easing registry.
    pub fn with_easing(cfg: Config, easing: EasingRegistry) -> Self {
        Self {
            cfg,
            ids: IdAllocator::new(),
            tracks: Vec::new(),
            easing,
            pose_cache: HashMap::new(),
            warned_styles: HashSet::new(),
            stepped: Signal::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[inline]
    pub fn easing(&self) -> &EasingRegistry {
        &self.easing
    }

    #[inline]
    pub fn easing_mut(&mut self) -> &mut EasingRegistry {
        &mut self.easing
    }

    /// Play options seeded from this controller's config.
    #[inline]
    pub fn play_options(&self) -> PlayOptions {
        PlayOptions::from(&self.cfg)
    }

    /// Wrap a sequence in a new (stopped) track. Tracks blend in load order.
    pub fn load_track(&mut self, sequence: Arc<KeyframeSequence>) -> Result<TrackId> {
        let id = self.ids.alloc_track();
        let track = Track::new(id, sequence)?;
        debug!(
            "loaded track {:?} over '{}' ({} keyframes)",
            id,
            track.sequence().name,
            track.sequence().len()
        );
        self.tracks.push(track);
        Ok(id)
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let idx = self.tracks.iter().position(|t| t.id() == id)?;
        debug!("removed track {:?}", id);
        Some(self.tracks.remove(idx))
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn playing_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_playing())
    }

    pub fn play(&mut self, id: TrackId, opts: PlayOptions) -> Result<()> {
        self.require_track(id)?.play(opts)
    }

    pub fn stop(&mut self, id: TrackId, transition_time: f64) -> Result<()> {
        self.require_track(id)?.stop(transition_time)
    }

    /// Stop every playing track, using the configured fade when `None`.
    pub fn stop_all(&mut self, transition_time: Option<f64>) -> Result<()> {
        let tt = transition_time.unwrap_or(self.cfg.default_transition_time);
        for track in self.tracks.iter_mut().filter(|t| t.is_playing()) {
            track.stop(tt)?;
        }
        Ok(())
    }

    fn require_track(&mut self, id: TrackId) -> Result<&mut Track> {
        self.track_mut(id)
            .ok_or(BlendError::TrackNotFound { track: id.0 })
    }

    /// Advance weight/speed transitions of every track. A negative or non-finite
    /// `dt` is ignored.
    pub fn tick_transitions(&mut self, dt: f64) {
        if !valid_delta(dt) {
            warn!("ignored transition tick of {dt}");
            return;
        }
        for track in self.tracks.iter_mut() {
            track.tick_transitions(dt);
        }
    }

    /// Tick transitions, then step.
    pub fn update(&mut self, delta_time: f64) -> PoseTransforms {
        self.tick_transitions(delta_time);
        self.step(delta_time, None)
    }

    /// Advance every playing track by `delta_time` and blend their poses.
    ///
    /// `carry` seeds the output; bones already present are blended onward from
    /// their carried value instead of identity. A negative or non-finite
    /// `delta_time` leaves track time where it is; the poses are still blended.
    pub fn step(&mut self, delta_time: f64, carry: Option<PoseTransforms>) -> PoseTransforms {
        let delta_time = if valid_delta(delta_time) {
            delta_time
        } else {
            warn!("step delta {delta_time} ignored; sampling at current time");
            0.0
        };
        let mut out = carry.unwrap_or_default();
        self.pose_cache.clear();

        let total_weight = self
            .tracks
            .iter()
            .filter(|t| t.is_playing())
            .map(Track::weight_current)
            .sum::<f64>()
            .max(1.0);

        let Self {
            cfg,
            tracks,
            easing,
            pose_cache,
            warned_styles,
            ..
        } = &mut *self;

        for track in tracks.iter_mut().filter(|t| t.is_playing()) {
            let last_frame = track.advance(delta_time);
            let sequence = Arc::clone(track.sequence());
            let segment = match sequence.segment_at(track.time_position()) {
                Ok(segment) => segment,
                Err(err) => {
                    warn!("track {:?} skipped: {err}", track.id());
                    continue;
                }
            };
            track.note_keyframe(if last_frame {
                segment.right
            } else {
                segment.left
            });

            let keyframes = sequence.keyframes();
            let alpha = track_alpha(track.weight_current(), total_weight);
            blend_keyframes(
                &mut out,
                &keyframes[segment.left],
                &keyframes[segment.right],
                segment.ratio,
                alpha,
                |pose, t| ease_pose(easing, cfg, warned_styles, pose, t),
                |key, id| {
                    if !pose_cache.contains_key(key) {
                        pose_cache.insert(
                            key.to_string(),
                            CachedPose {
                                sequence: Arc::clone(&sequence),
                                keyframe: segment.left,
                                pose: id,
                            },
                        );
                    }
                },
            );
            track.fire_stepped(delta_time);
        }

        if self.stepped.has_subscribers() {
            let event = ControllerStepped {
                delta_time,
                transforms: out,
            };
            self.stepped.fire(&event);
            out = event.transforms;
        }
        out
    }

    /// Source pose that first wrote `name` in the latest step.
    pub fn cached_pose(&self, name: &str) -> Option<&CachedPose> {
        self.pose_cache.get(name)
    }

    /// Ancestors of the cached pose for `name`, nearest first. Empty when the
    /// bone was not written in the latest step.
    pub fn ancestor_poses(&self, name: &str) -> Ancestors<'_> {
        match self.pose_cache.get(name) {
            Some(cached) => Ancestors::starting_at(cached.keyframe(), cached.id()),
            None => Ancestors::empty(),
        }
    }

    /// Compose the blended transforms of `name` and its ancestors, root first.
    /// Bones missing from `transforms` contribute identity.
    pub fn compute_pose_transform(
        &self,
        name: &str,
        transforms: &PoseTransforms,
    ) -> Option<Transform> {
        let cached = self.pose_cache.get(name)?;
        let kf = cached.keyframe();
        let chain: Vec<PoseId> = Ancestors::starting_at(kf, cached.id()).ids().collect();
        let lookup = |key: &str| transforms.get(key).copied().unwrap_or(Transform::IDENTITY);
        let world = chain
            .iter()
            .rev()
            .filter_map(|id| kf.key_of(*id))
            .fold(Transform::IDENTITY, |acc, key| acc * lookup(key));
        Some(world * lookup(name))
    }

    /// Drop every track, subscription and cached pose.
    pub fn destroy(&mut self) {
        debug!("destroying controller with {} tracks", self.tracks.len());
        self.tracks.clear();
        self.pose_cache.clear();
        self.warned_styles.clear();
        self.stepped.clear();
    }
}

fn ease_pose(
    easing: &EasingRegistry,
    cfg: &Config,
    warned: &mut HashSet<String>,
    pose: &Pose,
    t: f64,
) -> f64 {
    match easing.resolve(&pose.easing_style) {
        Ok(f) => f(t, pose.easing_direction),
        Err(err) => {
            if cfg.warn_unknown_easing && !warned.contains(&pose.easing_style) {
                warn!("{err}; falling back to '{}'", cfg.fallback_easing_style);
                warned.insert(pose.easing_style.clone());
            }
            easing.ease_or(
                &cfg.fallback_easing_style,
                LINEAR,
                t,
                pose.easing_direction,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn two_frame(name: &str, bone: &str, to: DVec3, looped: bool) -> Arc<KeyframeSequence> {
        let mut a = Keyframe::new("start", 0.0);
        a.add_pose(bone, Pose::new(bone), None).unwrap();
        let mut b = Keyframe::new("end", 1.0);
        let moved = Pose::new(bone).with_transform(Transform::from_translation(to));
        b.add_pose(bone, moved, None).unwrap();
        Arc::new(KeyframeSequence::new(name, looped, vec![a, b]))
    }

    #[test]
    fn unknown_track_is_an_error() {
        let mut c = Controller::default();
        let err = c.play(TrackId(42), PlayOptions::new()).unwrap_err();
        assert_eq!(err, BlendError::TrackNotFound { track: 42 });
    }

    #[test]
    fn stopped_tracks_do_not_contribute() {
        let mut c = Controller::default();
        c.load_track(two_frame("a", "Arm", DVec3::X, false)).unwrap();
        let out = c.step(0.5, None);
        assert!(out.is_empty());
        assert!(c.cached_pose("Arm").is_none());
    }

    #[test]
    fn single_track_samples_midpoint() {
        let mut c = Controller::default();
        let id = c.load_track(two_frame("a", "Arm", DVec3::new(2.0, 0.0, 0.0), false)).unwrap();
        c.play(id, PlayOptions::new().with_transition_time(0.0)).unwrap();
        let out = c.step(0.5, None);
        assert!((out["Arm"].position.x - 1.0).abs() < 1e-12);
        assert_eq!(c.cached_pose("Arm").unwrap().keyframe().name, "start");
    }

    #[test]
    fn unknown_style_falls_back_to_linear() {
        let mut a = Keyframe::new("a", 0.0);
        a.add_pose(
            "Arm",
            Pose::new("Arm").with_easing("Bounce", crate::data::EasingDirection::Out),
            None,
        )
        .unwrap();
        let mut b = Keyframe::new("b", 1.0);
        b.add_pose(
            "Arm",
            Pose::new("Arm").with_transform(Transform::from_translation(DVec3::new(4.0, 0.0, 0.0))),
            None,
        )
        .unwrap();
        let mut c = Controller::default();
        let id = c
            .load_track(Arc::new(KeyframeSequence::new("s", false, vec![a, b])))
            .unwrap();
        c.play(id, PlayOptions::new().with_transition_time(0.0)).unwrap();
        let out = c.step(0.25, None);
        assert!((out["Arm"].position.x - 1.0).abs() < 1e-12);
        assert!(c.warned_styles.contains("Bounce"));
    }

    #[test]
    fn destroy_clears_everything() {
        let mut c = Controller::default();
        let id = c.load_track(two_frame("a", "Arm", DVec3::X, true)).unwrap();
        c.play(id, PlayOptions::new().with_transition_time(0.0)).unwrap();
        c.stepped.subscribe(|_| {});
        c.step(0.1, None);
        c.destroy();
        assert_eq!(c.tracks().count(), 0);
        assert!(c.cached_pose("Arm").is_none());
        assert!(!c.stepped.has_subscribers());
        // ids keep counting after destroy
        assert_eq!(c.load_track(two_frame("b", "Arm", DVec3::X, true)).unwrap(), TrackId(1));
    }
}
