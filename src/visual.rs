//! Per-stage visuals.
//!
//! Every stage exposes the same [`StageVisual`] contract. The baby adds tilt
//! driven drift on top of its bounce; the other stages run a single idle
//! loop. Positions are relative to the container centre and stay unset until
//! the host reports a non-empty container size.

use crate::config::{PetConfig, Point, Size, TiltConfig};
use crate::host::{OrientationSource, SubscriptionHandle, TextureId, Tilt};
use crate::motion::{ActionSet, Easing, FrameCycle, Offset, Repeat, Script, Segment, Smoother};
use crate::stage::Stage;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const BOUNCE: &str = "bounce";
const SWAY: &str = "sway";
const WIGGLE: &str = "wiggle";

const BOUNCE_HEIGHT: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualPose {
    pub texture: Option<TextureId>,
    pub position: Option<Point>,
    pub rotation: f32,
}

pub trait StageVisual {
    fn stage(&self) -> Stage;

    /// Starts the idle loop. Starting an active visual changes nothing.
    fn start(&mut self);

    /// Stops every effect and releases tilt input. Safe to call repeatedly.
    fn stop(&mut self);

    /// One-shot celebratory motion that ends back at the resting pose.
    fn wiggle(&mut self);

    fn set_bounds(&mut self, bounds: Size);

    /// Advances running effects by `dt` seconds.
    fn step(&mut self, dt: f32);

    fn pose(&self) -> VisualPose;

    fn size(&self) -> Size;

    fn is_active(&self) -> bool;

    fn is_wiggling(&self) -> bool;

    fn running_effects(&self) -> usize;

    fn contains(&self, p: Point) -> bool {
        let Some(pos) = self.pose().position else {
            return false;
        };
        let size = self.size();
        (p.x - pos.x).abs() <= size.w / 2.0 && (p.y - pos.y).abs() <= size.h / 2.0
    }
}

fn bounce_loop(height: f32) -> Script {
    Script::forever(vec![
        Segment::by(Offset::translate(0.0, height), 0.4, Easing::EaseOut),
        Segment::by(Offset::translate(0.0, -height), 0.4, Easing::EaseIn),
        Segment::wait(1.5),
    ])
}

fn sway_loop(angle: f32, period: f32) -> Script {
    Script::forever(vec![
        Segment::by(Offset::rotate(angle), period / 4.0, Easing::EaseInOut),
        Segment::by(Offset::rotate(-2.0 * angle), period / 2.0, Easing::EaseInOut),
        Segment::by(Offset::rotate(angle), period / 4.0, Easing::EaseInOut),
    ])
}

fn lateral_wiggle() -> Script {
    Script::new(
        vec![
            Segment::by(Offset::translate(-3.0, 0.0), 0.1, Easing::Linear),
            Segment::by(Offset::translate(6.0, 0.0), 0.2, Easing::Linear),
            Segment::by(Offset::translate(-3.0, 0.0), 0.1, Easing::Linear),
        ],
        Repeat::Times(3),
    )
}

fn rotational_wiggle() -> Script {
    Script::once(vec![
        Segment::by(Offset::rotate(0.1), 0.1, Easing::Linear),
        Segment::by(Offset::rotate(-0.2), 0.2, Easing::Linear),
        Segment::by(Offset::rotate(0.1), 0.1, Easing::Linear),
    ])
}

/// State shared by all stage visuals.
struct Body {
    stage: Stage,
    sprite: Size,
    ground_margin: f32,
    bounds: Size,
    frames: Vec<TextureId>,
    actions: ActionSet,
    active: bool,
}

impl Body {
    fn new(stage: Stage, frames: Vec<TextureId>, config: &PetConfig) -> Self {
        Self {
            stage,
            sprite: config.sprite_size,
            ground_margin: config.ground_margin,
            bounds: Size::default(),
            frames,
            actions: ActionSet::default(),
            active: false,
        }
    }

    /// Standing on the floor of the container, horizontally centred.
    fn rest(&self) -> Option<Point> {
        if self.bounds.is_empty() {
            return None;
        }
        Some(Point::new(
            0.0,
            -self.bounds.h / 2.0 + self.ground_margin + self.sprite.h / 2.0,
        ))
    }

    fn set_bounds(&mut self, bounds: Size) {
        self.bounds = bounds;
        match self.rest() {
            Some(rest) => debug!(stage = %self.stage, x = rest.x, y = rest.y, "visual positioned"),
            None => debug!(stage = %self.stage, "container not sized, positioning deferred"),
        }
    }

    fn pose(&self, texture: Option<TextureId>, extra: Offset) -> VisualPose {
        let off = self.actions.offset() + extra;
        VisualPose {
            texture,
            position: self.rest().map(|r| Point::new(r.x + off.x, r.y + off.y)),
            rotation: off.rotation,
        }
    }
}

/// Latest tilt sample, written by the sensor callback and read by `step`.
#[derive(Debug, Default)]
pub struct TiltCell {
    x: AtomicU32,
    y: AtomicU32,
}

impl TiltCell {
    pub fn store(&self, tilt: Tilt) {
        self.x.store(tilt.x.to_bits(), Ordering::Relaxed);
        self.y.store(tilt.y.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> Tilt {
        Tilt {
            x: f32::from_bits(self.x.load(Ordering::Relaxed)),
            y: f32::from_bits(self.y.load(Ordering::Relaxed)),
        }
    }
}

pub struct BabyVisual {
    body: Body,
    tilt: TiltConfig,
    orientation: Rc<dyn OrientationSource>,
    subscription: Option<SubscriptionHandle>,
    latest: Arc<TiltCell>,
    drift: Smoother,
    roll: Smoother,
}

impl BabyVisual {
    pub fn new(
        frames: Vec<TextureId>,
        orientation: Rc<dyn OrientationSource>,
        config: &PetConfig,
    ) -> Self {
        Self {
            body: Body::new(Stage::Baby, frames, config),
            tilt: config.tilt.clone(),
            orientation,
            subscription: None,
            latest: Arc::new(TiltCell::default()),
            drift: Smoother::new(config.tilt.smoothing_secs),
            roll: Smoother::new(config.tilt.smoothing_secs),
        }
    }

    pub fn has_tilt_input(&self) -> bool {
        self.subscription.is_some()
    }

    /// Current lateral displacement from the resting position.
    pub fn drift_x(&self) -> f32 {
        self.drift.value
    }

    /// Where the latest tilt sample wants the baby to be, kept inside the container.
    pub fn target_x(&self) -> f32 {
        let bounds = self.body.bounds;
        if bounds.is_empty() {
            return 0.0;
        }
        let tilt = self.latest.load();
        let raw = if tilt.x.is_finite() {
            tilt.x * self.tilt.sensitivity * self.tilt.dampening
        } else {
            0.0
        };
        let max_x = (bounds.w / 2.0 - self.body.sprite.w / 2.0 - self.tilt.edge_margin).max(0.0);
        raw.clamp(-max_x, max_x)
    }

    fn subscribe(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        let cell = Arc::clone(&self.latest);
        let callback = Box::new(move |tilt: Tilt| cell.store(tilt));
        match self
            .orientation
            .subscribe(self.tilt.sample_interval_ms, callback)
        {
            Ok(handle) => {
                debug!(handle = handle.0, "tilt input subscribed");
                self.subscription = Some(handle);
            }
            Err(err) => warn!(%err, "tilt input unavailable, baby will only bounce"),
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.orientation.unsubscribe(handle);
            debug!(handle = handle.0, "tilt input released");
        }
        self.latest.store(Tilt::default());
    }
}

impl StageVisual for BabyVisual {
    fn stage(&self) -> Stage {
        Stage::Baby
    }

    fn start(&mut self) {
        if self.body.active {
            return;
        }
        self.body.active = true;
        self.body.actions.run(BOUNCE, bounce_loop(BOUNCE_HEIGHT));
        self.subscribe();
        debug!(stage = %Stage::Baby, "visual started");
    }

    fn stop(&mut self) {
        if !self.body.active && self.subscription.is_none() {
            return;
        }
        self.body.active = false;
        self.body.actions.clear();
        self.unsubscribe();
        self.drift.reset();
        self.roll.reset();
        debug!(stage = %Stage::Baby, "visual stopped");
    }

    fn wiggle(&mut self) {
        self.body.actions.run(WIGGLE, lateral_wiggle());
    }

    fn set_bounds(&mut self, bounds: Size) {
        self.body.set_bounds(bounds);
    }

    fn step(&mut self, dt: f32) {
        self.body.actions.step(dt);
        if !self.body.active {
            return;
        }
        let target = self.target_x();
        self.drift.step(target, dt);

        let tilt_x = self.latest.load().x;
        let roll = if tilt_x.is_finite() {
            tilt_x.clamp(-1.0, 1.0) * self.tilt.max_roll
        } else {
            0.0
        };
        self.roll.step(roll, dt);
    }

    fn pose(&self) -> VisualPose {
        let extra = Offset {
            x: self.drift.value,
            y: 0.0,
            rotation: self.roll.value,
        };
        self.body.pose(self.body.frames.first().copied(), extra)
    }

    fn size(&self) -> Size {
        self.body.sprite
    }

    fn is_active(&self) -> bool {
        self.body.active
    }

    fn is_wiggling(&self) -> bool {
        self.body.actions.contains(WIGGLE)
    }

    fn running_effects(&self) -> usize {
        self.body.actions.len()
    }
}

impl Drop for BabyVisual {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.orientation.unsubscribe(handle);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IdleEffect {
    FrameCycle { per_frame: f32 },
    Sway { angle: f32, period: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WiggleStyle {
    Lateral,
    Rotational,
}

/// Child, teen, adult and senior: one looping idle effect, no external input.
pub struct IdleVisual {
    body: Body,
    effect: IdleEffect,
    wiggle_style: WiggleStyle,
    lean: f32,
    cycle: Option<FrameCycle>,
}

impl IdleVisual {
    pub fn for_stage(stage: Stage, frames: Vec<TextureId>, config: &PetConfig) -> Self {
        let (effect, wiggle_style, lean) = match stage {
            Stage::Baby | Stage::Child => (
                IdleEffect::FrameCycle { per_frame: 1.0 },
                WiggleStyle::Lateral,
                0.0,
            ),
            Stage::Teen => (
                IdleEffect::Sway {
                    angle: 0.08,
                    period: 2.0,
                },
                WiggleStyle::Rotational,
                0.0,
            ),
            Stage::Adult => (
                IdleEffect::Sway {
                    angle: 0.05,
                    period: 3.0,
                },
                WiggleStyle::Rotational,
                0.0,
            ),
            Stage::Senior => (
                IdleEffect::Sway {
                    angle: 0.04,
                    period: 4.0,
                },
                WiggleStyle::Rotational,
                -0.06,
            ),
        };
        Self {
            body: Body::new(stage, frames, config),
            effect,
            wiggle_style,
            lean,
            cycle: None,
        }
    }

    pub fn effect(&self) -> IdleEffect {
        self.effect
    }
}

impl StageVisual for IdleVisual {
    fn stage(&self) -> Stage {
        self.body.stage
    }

    fn start(&mut self) {
        if self.body.active {
            return;
        }
        self.body.active = true;
        match self.effect {
            IdleEffect::FrameCycle { per_frame } => {
                self.cycle = Some(FrameCycle::new(self.body.frames.clone(), per_frame));
            }
            IdleEffect::Sway { angle, period } => {
                self.body.actions.run(SWAY, sway_loop(angle, period));
            }
        }
        debug!(stage = %self.body.stage, "visual started");
    }

    fn stop(&mut self) {
        if !self.body.active {
            return;
        }
        self.body.active = false;
        self.body.actions.clear();
        self.cycle = None;
        debug!(stage = %self.body.stage, "visual stopped");
    }

    fn wiggle(&mut self) {
        let script = match self.wiggle_style {
            WiggleStyle::Lateral => lateral_wiggle(),
            WiggleStyle::Rotational => rotational_wiggle(),
        };
        self.body.actions.run(WIGGLE, script);
    }

    fn set_bounds(&mut self, bounds: Size) {
        self.body.set_bounds(bounds);
    }

    fn step(&mut self, dt: f32) {
        self.body.actions.step(dt);
        if let Some(cycle) = self.cycle.as_mut() {
            cycle.step(dt);
        }
    }

    fn pose(&self) -> VisualPose {
        let texture = self
            .cycle
            .as_ref()
            .and_then(FrameCycle::current)
            .or_else(|| self.body.frames.first().copied());
        self.body.pose(texture, Offset::rotate(self.lean))
    }

    fn size(&self) -> Size {
        self.body.sprite
    }

    fn is_active(&self) -> bool {
        self.body.active
    }

    fn is_wiggling(&self) -> bool {
        self.body.actions.contains(WIGGLE)
    }

    fn running_effects(&self) -> usize {
        self.body.actions.len() + usize::from(self.cycle.is_some())
    }
}
