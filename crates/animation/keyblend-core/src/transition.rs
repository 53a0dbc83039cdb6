//! Cooperative weight/speed transitions.
//!
//! Every start bumps a per-attribute generation counter and the new transition
//! captures it. On each tick a transition first checks that its generation is still
//! the latest; a superseded transition is dropped without writing. There is no
//! other cancellation path.

use crate::interp::lerp;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransitionTarget {
    Weight,
    Speed,
}

/// What to do when a transition reaches its goal while still current.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    Nothing,
    StopPlayback,
}

/// Result of advancing a transition by one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    Running,
    Superseded,
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub target: TransitionTarget,
    pub generation: u64,
    pub initial: f64,
    pub goal: f64,
    /// Seconds; `<= 0` finishes on the first tick.
    pub duration: f64,
    pub completion: Completion,
    progress: f64,
}

impl Transition {
    #[inline]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Advance by `dt` seconds, writing into `value` only while `latest` matches
    /// the captured generation.
    pub fn tick(&mut self, dt: f64, latest: u64, value: &mut f64) -> Tick {
        if self.generation != latest {
            return Tick::Superseded;
        }
        self.progress = if self.duration <= 0.0 {
            1.0
        } else if !dt.is_finite() {
            self.progress
        } else {
            (self.progress + dt / self.duration).clamp(0.0, 1.0)
        };
        if self.progress >= 1.0 {
            *value = self.goal;
            Tick::Finished
        } else {
            *value = lerp(self.initial, self.goal, self.progress);
            Tick::Running
        }
    }
}

/// Per-track generation counters plus the transitions still in flight.
#[derive(Debug, Default)]
pub struct TransitionScheduler {
    weight_generation: u64,
    speed_generation: u64,
    in_flight: Vec<Transition>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn generation(&self, target: TransitionTarget) -> u64 {
        match target {
            TransitionTarget::Weight => self.weight_generation,
            TransitionTarget::Speed => self.speed_generation,
        }
    }

    #[inline]
    pub fn is_current(&self, t: &Transition) -> bool {
        self.generation(t.target) == t.generation
    }

    /// Create a transition capturing a fresh generation. Any transition already in
    /// flight for `target` becomes stale.
    pub fn begin(
        &mut self,
        target: TransitionTarget,
        initial: f64,
        goal: f64,
        duration: f64,
        completion: Completion,
    ) -> Transition {
        let counter = match target {
            TransitionTarget::Weight => &mut self.weight_generation,
            TransitionTarget::Speed => &mut self.speed_generation,
        };
        *counter = counter.wrapping_add(1);
        Transition {
            target,
            generation: *counter,
            initial,
            goal,
            duration,
            completion,
            progress: 0.0,
        }
    }

    pub fn schedule(&mut self, transition: Transition) {
        self.in_flight.push(transition);
    }

    /// Number of transitions not yet finished or dropped.
    #[inline]
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Advance every in-flight transition. Returns the transitions that finished
    /// on this tick; superseded ones are discarded silently.
    pub fn tick(&mut self, dt: f64, weight: &mut f64, speed: &mut f64) -> Vec<Transition> {
        let weight_gen = self.weight_generation;
        let speed_gen = self.speed_generation;
        let mut finished = Vec::new();
        self.in_flight.retain_mut(|t| {
            let (latest, slot) = match t.target {
                TransitionTarget::Weight => (weight_gen, &mut *weight),
                TransitionTarget::Speed => (speed_gen, &mut *speed),
            };
            match t.tick(dt, latest, slot) {
                Tick::Running => true,
                Tick::Superseded => false,
                Tick::Finished => {
                    finished.push(t.clone());
                    false
                }
            }
        });
        finished
    }
}
