//! Track: playback state over one shared keyframe sequence.

use std::sync::Arc;

use log::{trace, warn};

use crate::config::Config;
use crate::data::KeyframeSequence;
use crate::error::{ensure_finite, BlendError, Result};
use crate::ids::TrackId;
use crate::outputs::{KeyframeReached, TrackEnded, TrackStepped, TrackStopped};
use crate::signal::Signal;
use crate::transition::{Completion, Transition, TransitionScheduler, TransitionTarget};

/// Parameters for [`Track::play`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlayOptions {
    /// Fade duration in seconds; `<= 0` applies immediately.
    pub transition_time: f64,
    pub speed: f64,
    pub weight: f64,
}

impl PlayOptions {
    #[inline]
    pub fn new() -> Self {
        Self {
            transition_time: 0.2,
            speed: 1.0,
            weight: 1.0,
        }
    }

    #[inline]
    pub fn with_transition_time(mut self, transition_time: f64) -> Self {
        self.transition_time = transition_time;
        self
    }

    #[inline]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[inline]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Config> for PlayOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            transition_time: cfg.default_transition_time,
            speed: cfg.default_speed,
            weight: cfg.default_weight,
        }
    }
}

/// Mutable playback state: time cursor, speed, weight and in-flight transitions.
#[derive(Debug)]
pub struct Track {
    id: TrackId,
    sequence: Arc<KeyframeSequence>,
    is_playing: bool,
    looped: bool,
    length: f64,
    time_position: f64,
    speed: f64,
    weight_current: f64,
    weight_target: f64,
    keyframe_index: Option<usize>,
    transitions: TransitionScheduler,

    pub keyframe_reached: Signal<KeyframeReached>,
    pub stepped: Signal<TrackStepped>,
    pub stopped: Signal<TrackStopped>,
    pub ended: Signal<TrackEnded>,
}

impl Track {
    /// Wrap a sequence. Sequences without keyframes are rejected.
    pub fn new(id: TrackId, sequence: Arc<KeyframeSequence>) -> Result<Self> {
        if sequence.is_empty() {
            return Err(BlendError::EmptySequence {
                name: sequence.name.clone(),
            });
        }
        Ok(Self {
            id,
            looped: sequence.looped,
            length: sequence.length(),
            sequence,
            is_playing: false,
            time_position: 0.0,
            speed: 1.0,
            weight_current: 1.0,
            weight_target: 1.0,
            keyframe_index: None,
            transitions: TransitionScheduler::new(),
            keyframe_reached: Signal::new(),
            stepped: Signal::new(),
            stopped: Signal::new(),
            ended: Signal::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[inline]
    pub fn sequence(&self) -> &Arc<KeyframeSequence> {
        &self.sequence
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    #[inline]
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn time_position(&self) -> f64 {
        self.time_position
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub fn weight_current(&self) -> f64 {
        self.weight_current
    }

    #[inline]
    pub fn weight_target(&self) -> f64 {
        self.weight_target
    }

    /// Index of the last keyframe announced through `keyframe_reached`.
    #[inline]
    pub fn keyframe_index(&self) -> Option<usize> {
        self.keyframe_index
    }

    /// Transitions still ticking.
    #[inline]
    pub fn pending_transitions(&self) -> usize {
        self.transitions.pending()
    }

    /// Start playback and fade weight and speed toward the requested values.
    pub fn play(&mut self, opts: PlayOptions) -> Result<()> {
        let transition_time = ensure_finite("transition_time", opts.transition_time)?;
        let speed = ensure_finite("speed", opts.speed)?;
        let weight = ensure_weight(opts.weight)?;
        self.is_playing = true;
        self.start(TransitionTarget::Weight, weight, transition_time, Completion::Nothing);
        self.start(TransitionTarget::Speed, speed, transition_time, Completion::Nothing);
        Ok(())
    }

    /// Fade weight to zero; playback stops when the fade completes uninterrupted.
    pub fn stop(&mut self, transition_time: f64) -> Result<()> {
        let transition_time = ensure_finite("transition_time", transition_time)?;
        self.start(
            TransitionTarget::Weight,
            0.0,
            transition_time,
            Completion::StopPlayback,
        );
        Ok(())
    }

    pub fn adjust_weight(&mut self, weight: f64, transition_time: f64) -> Result<()> {
        let transition_time = ensure_finite("transition_time", transition_time)?;
        let weight = ensure_weight(weight)?;
        self.start(TransitionTarget::Weight, weight, transition_time, Completion::Nothing);
        Ok(())
    }

    pub fn adjust_speed(&mut self, speed: f64, transition_time: f64) -> Result<()> {
        let transition_time = ensure_finite("transition_time", transition_time)?;
        let speed = ensure_finite("speed", speed)?;
        self.start(TransitionTarget::Speed, speed, transition_time, Completion::Nothing);
        Ok(())
    }

    /// Move the cursor. Looped tracks wrap into `[0, length)`, others clamp.
    pub fn set_time_position(&mut self, time: f64) -> Result<()> {
        let time = ensure_finite("time_position", time)?;
        self.time_position = if self.looped && self.length > 0.0 {
            time.rem_euclid(self.length)
        } else {
            time.clamp(0.0, self.length)
        };
        Ok(())
    }

    /// Advance in-flight transitions by `dt` seconds. A negative or non-finite
    /// `dt` is ignored.
    pub fn tick_transitions(&mut self, dt: f64) {
        if !valid_delta(dt) {
            warn!("track {:?} ignored transition tick of {dt}", self.id);
            return;
        }
        let finished = self
            .transitions
            .tick(dt, &mut self.weight_current, &mut self.speed);
        for t in &finished {
            self.complete(t);
        }
    }

    fn start(
        &mut self,
        target: TransitionTarget,
        goal: f64,
        duration: f64,
        completion: Completion,
    ) {
        let initial = match target {
            TransitionTarget::Weight => {
                self.weight_target = goal;
                self.weight_current
            }
            TransitionTarget::Speed => self.speed,
        };
        let mut transition = self
            .transitions
            .begin(target, initial, goal, duration, completion);
        if duration > 0.0 {
            self.transitions.schedule(transition);
            return;
        }
        let latest = self.transitions.generation(target);
        let slot = match target {
            TransitionTarget::Weight => &mut self.weight_current,
            TransitionTarget::Speed => &mut self.speed,
        };
        transition.tick(0.0, latest, slot);
        self.complete(&transition);
    }

    fn complete(&mut self, t: &Transition) {
        if !self.transitions.is_current(t) {
            return;
        }
        let value = match t.target {
            TransitionTarget::Weight => self.weight_current,
            TransitionTarget::Speed => self.speed,
        };
        if value != t.goal {
            return;
        }
        trace!(
            "track {:?} {:?} transition reached {}",
            self.id,
            t.target,
            t.goal
        );
        if t.completion == Completion::StopPlayback {
            self.is_playing = false;
            self.stopped.fire(&TrackStopped { track: self.id });
        }
    }

    /// Move the cursor by `dt * speed`. Returns true when a non-looped track
    /// clamped at its end on this step.
    pub(crate) fn advance(&mut self, dt: f64) -> bool {
        let before = self.time_position;
        let mut time = before + dt * self.speed;
        let mut last_frame = false;
        if time > self.length {
            if self.looped && self.length > 0.0 {
                time -= self.length;
                if time > self.length {
                    time = time.rem_euclid(self.length);
                }
                // The final keyframe is skipped visually on wrap; announce it anyway.
                let last = self.sequence.len() - 1;
                self.announce_keyframe(last);
            } else {
                time = self.length;
                last_frame = true;
                if before < self.length {
                    self.ended.fire(&TrackEnded {
                        track: self.id,
                        length: self.length,
                    });
                }
            }
        } else if time < 0.0 {
            time = if self.looped && self.length > 0.0 {
                time.rem_euclid(self.length)
            } else {
                0.0
            };
        }
        self.time_position = time;
        last_frame
    }

    /// Record the active keyframe, announcing it when it changed.
    pub(crate) fn note_keyframe(&mut self, index: usize) {
        if self.keyframe_index != Some(index) {
            self.keyframe_index = Some(index);
            self.announce_keyframe(index);
        }
    }

    pub(crate) fn fire_stepped(&mut self, delta_time: f64) {
        if self.stepped.has_subscribers() {
            self.stepped.fire(&TrackStepped {
                track: self.id,
                delta_time,
            });
        }
    }

    fn announce_keyframe(&mut self, index: usize) {
        let Some(kf) = self.sequence.keyframe(index) else {
            return;
        };
        trace!("track {:?} reached keyframe '{}' ({index})", self.id, kf.name);
        if self.keyframe_reached.has_subscribers() {
            let event = KeyframeReached {
                track: self.id,
                name: kf.name.clone(),
                index,
            };
            self.keyframe_reached.fire(&event);
        }
    }
}

/// Elapsed time must be finite and >= 0.
#[inline]
pub(crate) fn valid_delta(dt: f64) -> bool {
    dt.is_finite() && dt >= 0.0
}

fn ensure_weight(weight: f64) -> Result<f64> {
    let weight = ensure_finite("weight", weight)?;
    if weight < 0.0 {
        return Err(BlendError::invalid(format!(
            "weight must be >= 0, got {weight}"
        )));
    }
    Ok(weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Keyframe;
    use std::sync::Mutex;

    fn seq(looped: bool) -> Arc<KeyframeSequence> {
        Arc::new(KeyframeSequence::new(
            "walk",
            looped,
            vec![
                Keyframe::new("a", 0.0),
                Keyframe::new("b", 1.0),
                Keyframe::new("c", 2.0),
            ],
        ))
    }

    #[test]
    fn rejects_empty_sequence() {
        let err = Track::new(TrackId(0), Arc::new(KeyframeSequence::empty("none"))).unwrap_err();
        assert!(matches!(err, BlendError::EmptySequence { .. }));
    }

    #[test]
    fn defaults_follow_sequence() {
        let t = Track::new(TrackId(3), seq(true)).unwrap();
        assert!(!t.is_playing());
        assert!(t.is_looped());
        assert_eq!(t.length(), 2.0);
        assert_eq!((t.speed(), t.weight_current(), t.weight_target()), (1.0, 1.0, 1.0));
        assert_eq!(t.keyframe_index(), None);
    }

    #[test]
    fn play_validates_parameters() {
        let mut t = Track::new(TrackId(0), seq(false)).unwrap();
        assert!(t.play(PlayOptions::new().with_speed(f64::NAN)).is_err());
        assert!(t.play(PlayOptions::new().with_weight(-0.1)).is_err());
        assert!(t
            .play(PlayOptions::new().with_transition_time(f64::INFINITY))
            .is_err());
        assert!(!t.is_playing());
    }

    #[test]
    fn immediate_stop_fires_inline() {
        let stops = Arc::new(Mutex::new(0));
        let mut t = Track::new(TrackId(0), seq(false)).unwrap();
        {
            let stops = stops.clone();
            t.stopped.subscribe(move |_| *stops.lock().unwrap() += 1);
        }
        t.play(PlayOptions::new().with_transition_time(0.0)).unwrap();
        assert!(t.is_playing());
        t.stop(0.0).unwrap();
        assert!(!t.is_playing());
        assert_eq!(t.weight_current(), 0.0);
        assert_eq!(*stops.lock().unwrap(), 1);
    }

    #[test]
    fn faded_stop_completes_after_duration() {
        let mut t = Track::new(TrackId(0), seq(false)).unwrap();
        t.play(PlayOptions::new().with_transition_time(0.0)).unwrap();
        t.stop(0.5).unwrap();
        t.tick_transitions(0.25);
        assert!(t.is_playing());
        assert!((t.weight_current() - 0.5).abs() < 1e-12);
        t.tick_transitions(0.25);
        assert!(!t.is_playing());
        assert_eq!(t.weight_current(), 0.0);
    }

    #[test]
    fn replay_cancels_pending_stop() {
        let mut t = Track::new(TrackId(0), seq(false)).unwrap();
        t.play(PlayOptions::new().with_transition_time(0.0)).unwrap();
        t.stop(1.0).unwrap();
        t.tick_transitions(0.5);
        t.play(PlayOptions::new().with_transition_time(0.5)).unwrap();
        t.tick_transitions(1.0);
        assert!(t.is_playing());
        assert_eq!(t.weight_current(), 1.0);
        assert_eq!(t.weight_target(), 1.0);
    }

    #[test]
    fn advance_clamps_once_and_reports_end() {
        let ends = Arc::new(Mutex::new(0));
        let mut t = Track::new(TrackId(0), seq(false)).unwrap();
        {
            let ends = ends.clone();
            t.ended.subscribe(move |_| *ends.lock().unwrap() += 1);
        }
        assert!(!t.advance(1.5));
        assert!(t.advance(1.0));
        assert_eq!(t.time_position(), 2.0);
        assert!(t.advance(1.0));
        assert_eq!(*ends.lock().unwrap(), 1);
    }

    #[test]
    fn negative_speed_runs_backwards() {
        let mut looped = Track::new(TrackId(0), seq(true)).unwrap();
        looped.adjust_speed(-1.0, 0.0).unwrap();
        looped.set_time_position(0.25).unwrap();
        looped.advance(0.5);
        assert!((looped.time_position() - 1.75).abs() < 1e-12);

        let mut once = Track::new(TrackId(1), seq(false)).unwrap();
        once.adjust_speed(-2.0, 0.0).unwrap();
        once.advance(1.0);
        assert_eq!(once.time_position(), 0.0);
    }

    #[test]
    fn set_time_position_wraps_or_clamps() {
        let mut looped = Track::new(TrackId(0), seq(true)).unwrap();
        looped.set_time_position(5.0).unwrap();
        assert_eq!(looped.time_position(), 1.0);
        let mut once = Track::new(TrackId(1), seq(false)).unwrap();
        once.set_time_position(5.0).unwrap();
        assert_eq!(once.time_position(), 2.0);
        assert!(once.set_time_position(f64::NAN).is_err());
    }
}
