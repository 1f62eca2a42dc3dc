//! Per-frame entry point tying the pet's life cycle to its visuals.

use crate::cache::{VisualCache, VisualFactory};
use crate::clock::{seconds_between, Clock, Timestamp};
use crate::config::{PetConfig, Point, Size};
use crate::error::PetResult;
use crate::host::{BirthStore, OrientationSource, TextureId, TextureLoader};
use crate::pet::{PetSignal, PetState};
use crate::stage::Stage;
use crate::visual::StageVisual;
use std::rc::Rc;
use tracing::{debug, warn};

/// Longest animation step applied in one tick, so a stalled host does not fast-forward effects.
const MAX_STEP_SECS: f32 = 0.25;

pub const OVERLAY_TEXTURE: &str = "dead-eyes";

/// What the host has to change on screen after a call into the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    SwapVisual { from: Stage, to: Stage },
    ShowOverlay,
    HideOverlay,
}

/// Marker drawn on top of the pet while it is dead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeathOverlay {
    pub texture: Option<TextureId>,
}

pub struct PetController {
    clock: Box<dyn Clock>,
    pet: PetState,
    visuals: VisualCache,
    overlay: Option<DeathOverlay>,
    last_tick: Option<Timestamp>,
    rebirth_wiggle_in: Option<f32>,
    rebirth_wiggle_delay: f32,
}

impl PetController {
    pub fn new(
        clock: Box<dyn Clock>,
        store: Box<dyn BirthStore>,
        textures: Box<dyn TextureLoader>,
        orientation: Rc<dyn OrientationSource>,
        config: PetConfig,
    ) -> PetResult<Self> {
        let now = clock.now();
        let pet = PetState::new(store, now, &config)?;
        let rebirth_wiggle_delay = config.rebirth_wiggle_delay_secs;
        let mut visuals = VisualCache::new(VisualFactory::new(textures, orientation, config));
        visuals.get(pet.stage()).start();
        debug!(stage = %pet.stage(), born_at = %pet.born_at(), "controller ready");

        Ok(Self {
            clock,
            pet,
            visuals,
            overlay: None,
            last_tick: None,
            rebirth_wiggle_in: None,
            rebirth_wiggle_delay,
        })
    }

    /// Called once per frame by the host.
    pub fn advance(&mut self, now: Timestamp) -> Vec<HostEvent> {
        let dt = self
            .last_tick
            .map(|last| seconds_between(last, now).min(MAX_STEP_SECS))
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        let mut events = Vec::new();
        for signal in self.pet.advance(now) {
            self.apply(signal, &mut events);
        }
        self.animate(dt);
        events
    }

    /// Tap on the pet: rebirth when dead, otherwise a wiggle from the current visual.
    pub fn handle_tap(&mut self) -> PetResult<Vec<HostEvent>> {
        let mut events = Vec::new();
        if self.pet.is_dead() {
            let signal = self.pet.rebirth(self.clock.now())?;
            self.apply(signal, &mut events);
        } else {
            self.current_visual().wiggle();
        }
        Ok(events)
    }

    /// Tap at a container position; taps that miss the pet are ignored.
    pub fn handle_tap_at(&mut self, point: Point) -> PetResult<Vec<HostEvent>> {
        if !self.current_visual().contains(point) {
            return Ok(Vec::new());
        }
        self.handle_tap()
    }

    pub fn set_bounds(&mut self, size: Size) {
        debug!(w = size.w, h = size.h, "container resized");
        self.visuals.set_bounds(size);
    }

    pub fn current_visual(&mut self) -> &mut dyn StageVisual {
        self.visuals.get(self.pet.stage())
    }

    pub fn current_stage(&self) -> Stage {
        self.pet.stage()
    }

    pub fn is_dead(&self) -> bool {
        self.pet.is_dead()
    }

    pub fn overlay(&self) -> Option<DeathOverlay> {
        self.overlay
    }

    pub fn age(&self, now: Timestamp) -> f64 {
        self.pet.age_at(now)
    }

    pub fn born_at(&self) -> Timestamp {
        self.pet.born_at()
    }

    pub fn visuals(&self) -> &VisualCache {
        &self.visuals
    }

    fn apply(&mut self, signal: PetSignal, events: &mut Vec<HostEvent>) {
        match signal {
            PetSignal::StageChanged { from, to } => {
                self.visuals.get(from).stop();
                self.visuals.get(to).start();
                events.push(HostEvent::SwapVisual { from, to });
            }
            PetSignal::Died { stage } => {
                self.visuals.get(stage).stop();
                self.rebirth_wiggle_in = None;
                let texture = match self.visuals.load_texture(OVERLAY_TEXTURE) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!(%err, "death overlay texture missing");
                        None
                    }
                };
                self.overlay = Some(DeathOverlay { texture });
                events.push(HostEvent::ShowOverlay);
            }
            PetSignal::Reborn { from } => {
                self.overlay = None;
                events.push(HostEvent::HideOverlay);
                self.visuals.get(from).stop();
                self.visuals.get(Stage::Baby).start();
                if from != Stage::Baby {
                    events.push(HostEvent::SwapVisual {
                        from,
                        to: Stage::Baby,
                    });
                }
                self.rebirth_wiggle_in = Some(self.rebirth_wiggle_delay);
            }
        }
    }

    fn animate(&mut self, dt: f32) {
        if let Some(left) = self.rebirth_wiggle_in {
            let left = left - dt;
            if left <= 0.0 {
                self.rebirth_wiggle_in = None;
                self.current_visual().wiggle();
            } else {
                self.rebirth_wiggle_in = Some(left);
            }
        }
        self.current_visual().step(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{epoch, minutes, FixedClock, ManualOrientation, MemoryStore, NamedTextures};
    use crate::host::{NoOrientation, Tilt};

    struct Rig {
        clock: FixedClock,
        store: MemoryStore,
        sensor: Rc<ManualOrientation>,
        pet: PetController,
    }

    fn rig_with(store: MemoryStore, textures: NamedTextures) -> Rig {
        let clock = FixedClock::new(epoch());
        let sensor = Rc::new(ManualOrientation::default());
        let pet = PetController::new(
            Box::new(clock.clone()),
            Box::new(store.clone()),
            Box::new(textures),
            sensor.clone(),
            PetConfig::default(),
        )
        .unwrap();
        Rig {
            clock,
            store,
            sensor,
            pet,
        }
    }

    fn rig() -> Rig {
        rig_with(MemoryStore::default(), NamedTextures::default())
    }

    impl Rig {
        fn tick(&mut self, m: f64) -> Vec<HostEvent> {
            let now = epoch() + minutes(m);
            self.clock.set(now);
            self.pet.advance(now)
        }
    }

    #[test]
    fn test_initial_visual_is_started() {
        let mut r = rig();
        assert_eq!(r.pet.current_stage(), Stage::Baby);
        assert!(r.pet.current_visual().is_active());
        assert_eq!(r.sensor.subscriber_count(), 1);
        assert_eq!(r.pet.overlay(), None);
    }

    #[test]
    fn test_stage_change_swaps_visuals() {
        let mut r = rig();
        assert!(r.tick(1.0).is_empty());
        assert_eq!(
            r.tick(2.5),
            vec![HostEvent::SwapVisual {
                from: Stage::Baby,
                to: Stage::Child
            }]
        );
        assert!(r.pet.current_visual().is_active());
        let baby = r.pet.visuals().peek(Stage::Baby).unwrap();
        assert!(!baby.is_active());
        assert_eq!(r.sensor.subscriber_count(), 0);
    }

    #[test]
    fn test_death_shows_overlay_and_stops_animation() {
        let mut r = rig();
        r.tick(3.0);
        let events = r.tick(6.0);
        assert_eq!(
            events,
            vec![
                HostEvent::SwapVisual {
                    from: Stage::Child,
                    to: Stage::Teen
                },
                HostEvent::ShowOverlay
            ]
        );
        assert!(r.pet.is_dead());
        assert!(r.pet.overlay().is_some_and(|o| o.texture.is_some()));
        assert!(!r.pet.current_visual().is_active());
        assert_eq!(r.pet.current_visual().running_effects(), 0);

        // nothing repeats while dead
        assert!(r.tick(50.0).is_empty());
        assert_eq!(r.pet.current_stage(), Stage::Teen);
    }

    #[test]
    fn test_tap_while_dead_rebirths() {
        let mut r = rig();
        r.tick(6.0);
        r.clock.set(epoch() + minutes(20.0));
        let events = r.pet.handle_tap().unwrap();
        assert_eq!(
            events,
            vec![
                HostEvent::HideOverlay,
                HostEvent::SwapVisual {
                    from: Stage::Teen,
                    to: Stage::Baby
                }
            ]
        );
        assert!(!r.pet.is_dead());
        assert_eq!(r.pet.overlay(), None);
        assert_eq!(r.pet.current_stage(), Stage::Baby);
        assert!(r.pet.current_visual().is_active());
        assert_eq!(r.store.value(), Some(epoch() + minutes(20.0)));
        assert_eq!(r.pet.age(epoch() + minutes(20.0)), 0.0);

        assert!(r.tick(20.0).is_empty());
        assert_eq!(r.pet.current_stage(), Stage::Baby);
        assert!(!r.pet.is_dead());
    }

    #[test]
    fn test_rebirth_reuses_cached_baby() {
        let mut r = rig();
        r.tick(6.0);
        let built = r.pet.visuals().built();
        r.pet.handle_tap().unwrap();
        assert_eq!(r.pet.visuals().built(), built);
        assert_eq!(r.sensor.subscriber_count(), 1);
    }

    #[test]
    fn test_rebirth_wiggle_after_delay() {
        let mut r = rig();
        r.tick(6.0);
        r.clock.set(epoch() + minutes(6.0));
        r.pet.handle_tap().unwrap();
        assert!(!r.pet.current_visual().is_wiggling());

        let t0 = epoch() + minutes(6.0);
        r.pet.advance(t0);
        r.pet.advance(t0 + chrono::Duration::milliseconds(200));
        assert!(!r.pet.current_visual().is_wiggling());
        r.pet.advance(t0 + chrono::Duration::milliseconds(400));
        r.pet.advance(t0 + chrono::Duration::milliseconds(600));
        assert!(r.pet.current_visual().is_wiggling());
    }

    #[test]
    fn test_tap_while_alive_wiggles_current_only() {
        let mut r = rig();
        r.tick(3.0);
        assert_eq!(r.pet.current_stage(), Stage::Child);

        let events = r.pet.handle_tap().unwrap();
        assert!(events.is_empty());
        assert!(r.pet.current_visual().is_wiggling());
        let baby = r.pet.visuals().peek(Stage::Baby).unwrap();
        assert!(!baby.is_wiggling());
        assert_eq!(baby.running_effects(), 0);
        assert!(!r.pet.is_dead());
    }

    #[test]
    fn test_tap_position_must_hit_pet() {
        let mut r = rig();
        r.pet.set_bounds(Size::new(184.0, 224.0));
        assert!(r.pet.handle_tap_at(Point::new(90.0, 100.0)).unwrap().is_empty());
        assert!(!r.pet.current_visual().is_wiggling());

        let pos = r.pet.current_visual().pose().position.unwrap();
        r.pet.handle_tap_at(pos).unwrap();
        assert!(r.pet.current_visual().is_wiggling());
    }

    #[test]
    fn test_tilt_moves_baby_between_ticks() {
        let mut r = rig();
        r.pet.set_bounds(Size::new(184.0, 224.0));
        r.tick(0.0);
        let rest_x = r.pet.current_visual().pose().position.unwrap().x;
        r.sensor.emit(Tilt { x: 1.0, y: 0.0 });
        for i in 1..=30 {
            r.pet
                .advance(epoch() + chrono::Duration::milliseconds(100 * i));
        }
        let x = r.pet.current_visual().pose().position.unwrap().x;
        assert!(x > rest_x);
        assert!(x <= 184.0 / 2.0 - 10.0);
    }

    #[test]
    fn test_overlay_exists_even_without_texture() {
        let mut r = rig_with(
            MemoryStore::default(),
            NamedTextures::without(&[OVERLAY_TEXTURE]),
        );
        r.tick(7.0);
        assert_eq!(r.pet.overlay(), Some(DeathOverlay { texture: None }));
    }

    #[test]
    fn test_pet_without_sensor_still_lives() {
        let clock = FixedClock::new(epoch());
        let mut pet = PetController::new(
            Box::new(clock.clone()),
            Box::new(MemoryStore::default()),
            Box::new(NamedTextures::default()),
            Rc::new(NoOrientation),
            PetConfig::default(),
        )
        .unwrap();
        assert!(pet.current_visual().is_active());
        assert_eq!(pet.current_visual().running_effects(), 1);
        assert!(pet.advance(epoch() + minutes(2.0)).len() == 1);
    }

    #[test]
    fn test_resumed_pet_starts_at_loaded_stage() {
        let mut r = rig_with(
            MemoryStore::with(epoch() - minutes(11.0)),
            NamedTextures::default(),
        );
        assert_eq!(r.pet.current_stage(), Stage::Teen);
        assert!(r.pet.current_visual().is_active());
        assert_eq!(r.tick(0.0), vec![HostEvent::ShowOverlay]);
        assert_eq!(r.pet.visuals().built(), 1);
    }
}
