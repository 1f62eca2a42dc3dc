//! Scripted motion: eased segments, keyed action sets, frame cycles and smoothing.
//!
//! Scripts only ever produce an offset from a visual's resting pose. A script
//! whose segments sum to zero returns the visual exactly to where it started.

use crate::host::TextureId;
use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::ops::{Add, Mul};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => -((PI * t).cos() - 1.0) / 2.0,
        }
    }
}

/// Offset applied on top of a resting pose.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
    };

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            rotation: 0.0,
        }
    }

    pub fn rotate(rotation: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation,
        }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            rotation: self.rotation + rhs.rotation,
        }
    }
}

impl Mul<f32> for Offset {
    type Output = Offset;

    fn mul(self, k: f32) -> Offset {
        Offset {
            x: self.x * k,
            y: self.y * k,
            rotation: self.rotation * k,
        }
    }
}

/// Moves the pose by `delta` over `duration` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub delta: Offset,
    pub duration: f32,
    pub easing: Easing,
}

impl Segment {
    pub fn by(delta: Offset, duration: f32, easing: Easing) -> Self {
        Self {
            delta,
            duration: duration.max(0.0),
            easing,
        }
    }

    pub fn wait(duration: f32) -> Self {
        Self::by(Offset::ZERO, duration, Easing::Linear)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Forever,
}

#[derive(Clone, Debug)]
pub struct Script {
    segments: Vec<Segment>,
    repeat: Repeat,
    elapsed: f32,
}

impl Script {
    pub fn new(segments: Vec<Segment>, repeat: Repeat) -> Self {
        Self {
            segments,
            repeat,
            elapsed: 0.0,
        }
    }

    pub fn once(segments: Vec<Segment>) -> Self {
        Self::new(segments, Repeat::Times(1))
    }

    pub fn forever(segments: Vec<Segment>) -> Self {
        Self::new(segments, Repeat::Forever)
    }

    fn cycle_len(&self) -> f32 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    fn net(&self) -> Offset {
        self.segments
            .iter()
            .fold(Offset::ZERO, |acc, s| acc + s.delta)
    }

    pub fn is_looping(&self) -> bool {
        self.repeat == Repeat::Forever
    }

    pub fn is_finished(&self) -> bool {
        match self.repeat {
            Repeat::Forever => false,
            Repeat::Times(n) => {
                let len = self.cycle_len();
                len <= 0.0 || self.elapsed >= len * n as f32
            }
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    pub fn offset(&self) -> Offset {
        let len = self.cycle_len();
        if len <= 0.0 {
            return Offset::ZERO;
        }
        let mut cycles = (self.elapsed / len).floor();
        if let Repeat::Times(n) = self.repeat {
            if cycles >= n as f32 {
                return self.net() * n as f32;
            }
        }
        let mut t = self.elapsed - cycles * len;
        if t >= len {
            cycles += 1.0;
            t = 0.0;
        }

        let mut acc = self.net() * cycles;
        for seg in &self.segments {
            if t >= seg.duration {
                acc = acc + seg.delta;
                t -= seg.duration;
            } else {
                let k = if seg.duration > 0.0 {
                    seg.easing.apply(t / seg.duration)
                } else {
                    1.0
                };
                acc = acc + seg.delta * k;
                break;
            }
        }
        acc
    }
}

/// Scripts keyed by name. Running under an existing key replaces the old
/// script, so the same effect is never stacked twice.
#[derive(Clone, Debug, Default)]
pub struct ActionSet {
    running: BTreeMap<&'static str, Script>,
}

impl ActionSet {
    pub fn run(&mut self, key: &'static str, script: Script) {
        self.running.insert(key, script);
    }

    pub fn remove(&mut self, key: &str) {
        self.running.remove(key);
    }

    pub fn clear(&mut self) {
        self.running.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.running.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub fn step(&mut self, dt: f32) {
        for script in self.running.values_mut() {
            script.step(dt);
        }
        self.running.retain(|_, s| !s.is_finished());
    }

    pub fn offset(&self) -> Offset {
        self.running
            .values()
            .fold(Offset::ZERO, |acc, s| acc + s.offset())
    }
}

/// Flip-book over a fixed list of textures.
#[derive(Clone, Debug)]
pub struct FrameCycle {
    frames: Vec<TextureId>,
    per_frame: f32,
    elapsed: f32,
}

impl FrameCycle {
    pub fn new(frames: Vec<TextureId>, per_frame: f32) -> Self {
        Self {
            frames,
            per_frame,
            elapsed: 0.0,
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
        let period = self.per_frame * self.frames.len() as f32;
        if period > 0.0 {
            self.elapsed %= period;
        }
    }

    pub fn current(&self) -> Option<TextureId> {
        if self.frames.is_empty() {
            return None;
        }
        let idx = if self.per_frame > 0.0 {
            (self.elapsed / self.per_frame) as usize % self.frames.len()
        } else {
            0
        };
        self.frames.get(idx).copied()
    }
}

/// Exponential approach toward a moving target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoother {
    pub value: f32,
    pub time_constant: f32,
}

impl Smoother {
    pub fn new(time_constant: f32) -> Self {
        Self {
            value: 0.0,
            time_constant,
        }
    }

    pub fn step(&mut self, target: f32, dt: f32) -> f32 {
        if self.time_constant <= 0.0 {
            self.value = target;
        } else {
            let k = 1.0 - (-dt.max(0.0) / self.time_constant).exp();
            self.value += (target - self.value) * k;
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
