//! Aging, death and rebirth.

use crate::clock::{AgeScale, Timestamp};
use crate::config::PetConfig;
use crate::error::{PetError, PetResult};
use crate::host::BirthStore;
use crate::stage::{Stage, StageTable};
use tracing::{info, warn};

/// Emitted by [`PetState`] transitions; side effects are driven only by these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PetSignal {
    StageChanged { from: Stage, to: Stage },
    Died { stage: Stage },
    Reborn { from: Stage },
}

pub struct PetState {
    store: Box<dyn BirthStore>,
    table: StageTable,
    scale: AgeScale,
    death_age: f64,
    born_at: Timestamp,
    stage: Stage,
    dead: bool,
    /// Highest age seen since birth; the clock may step back, the pet may not.
    oldest: f64,
}

impl PetState {
    /// Loads the birth time, or starts a new pet born at `now` when none is stored.
    pub fn new(mut store: Box<dyn BirthStore>, now: Timestamp, config: &PetConfig) -> PetResult<Self> {
        config.validate()?;
        let table = config.stage_table()?;

        let born_at = match store.load() {
            Ok(Some(t)) => t,
            Ok(None) => {
                info!(%now, "no birth time stored, a new pet hatches");
                if let Err(err) = store.save(now) {
                    warn!(%err, "could not persist birth time");
                }
                now
            }
            Err(err) => {
                warn!(%err, "could not read birth time, starting a new pet");
                now
            }
        };

        let mut pet = Self {
            store,
            table,
            scale: config.age_scale(),
            death_age: config.death_age,
            born_at,
            stage: Stage::Baby,
            dead: false,
            oldest: 0.0,
        };
        pet.oldest = pet.age_at(now);
        pet.stage = pet.stage_at(pet.oldest);
        Ok(pet)
    }

    pub fn age_at(&self, now: Timestamp) -> f64 {
        self.scale.age_between(self.born_at, now).max(self.oldest)
    }

    /// The stage an alive pet of `age` shows; capped at the stage it dies in.
    fn stage_at(&self, age: f64) -> Stage {
        self.table.stage_for(age.min(self.death_age))
    }

    /// Recomputes stage and death for `now`. A dead pet is left untouched.
    ///
    /// If the pet crossed into a new stage and past the death age within the
    /// same tick, the stage change is reported before the death so the frozen
    /// stage is the one it had when the death age was reached.
    pub fn advance(&mut self, now: Timestamp) -> Vec<PetSignal> {
        let mut signals = Vec::new();
        if self.dead {
            return signals;
        }

        let age = self.age_at(now);
        self.oldest = age;
        let next = self.stage_at(age);
        if next != self.stage {
            info!(from = %self.stage, to = %next, age, "pet grew");
            signals.push(PetSignal::StageChanged {
                from: self.stage,
                to: next,
            });
            self.stage = next;
        }

        if age >= self.death_age {
            self.dead = true;
            info!(stage = %self.stage, age, "pet died");
            signals.push(PetSignal::Died { stage: self.stage });
        }
        signals
    }

    /// Starts over as a baby born at `now`. Refused while the pet is alive.
    pub fn rebirth(&mut self, now: Timestamp) -> PetResult<PetSignal> {
        if !self.dead {
            return Err(PetError::RebirthWhileAlive);
        }
        if let Err(err) = self.store.save(now) {
            warn!(%err, "could not persist new birth time");
        }
        let from = self.stage;
        self.born_at = now;
        self.oldest = 0.0;
        self.stage = Stage::Baby;
        self.dead = false;
        info!(%now, "pet reborn");
        Ok(PetSignal::Reborn { from })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn born_at(&self) -> Timestamp {
        self.born_at
    }

    pub fn death_age(&self) -> f64 {
        self.death_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{epoch, minutes, MemoryStore};

    fn new_pet(store: MemoryStore) -> PetState {
        PetState::new(Box::new(store), epoch(), &PetConfig::default()).unwrap()
    }

    #[test]
    fn test_first_run_is_born_now_and_saved() {
        let store = MemoryStore::default();
        let pet = new_pet(store.clone());
        assert_eq!(pet.born_at(), epoch());
        assert_eq!(pet.stage(), Stage::Baby);
        assert!(!pet.is_dead());
        assert_eq!(store.value(), Some(epoch()));
    }

    #[test]
    fn test_loaded_birth_time_sets_initial_stage() {
        let store = MemoryStore::with(epoch() - minutes(3.0));
        let pet = new_pet(store.clone());
        assert_eq!(pet.stage(), Stage::Child);
        assert_eq!(store.saves(), 0);
    }

    #[test]
    fn test_reference_lifecycle() {
        let mut pet = new_pet(MemoryStore::default());
        let t = |m: f64| epoch() + minutes(m);

        assert!(pet.advance(t(0.0)).is_empty());
        assert_eq!(pet.stage(), Stage::Baby);

        assert_eq!(
            pet.advance(t(3.0)),
            vec![PetSignal::StageChanged {
                from: Stage::Baby,
                to: Stage::Child
            }]
        );
        assert!(!pet.is_dead());

        let signals = pet.advance(t(6.0));
        assert_eq!(
            signals,
            vec![
                PetSignal::StageChanged {
                    from: Stage::Child,
                    to: Stage::Teen
                },
                PetSignal::Died { stage: Stage::Teen },
            ]
        );
        assert!(pet.is_dead());

        assert!(pet.advance(t(100.0)).is_empty());
        assert!(pet.is_dead());
        assert_eq!(pet.stage(), Stage::Teen);

        assert_eq!(
            pet.rebirth(t(100.0)),
            Ok(PetSignal::Reborn { from: Stage::Teen })
        );
        assert_eq!(pet.age_at(t(100.0)), 0.0);
        assert!(pet.advance(t(100.0)).is_empty());
        assert_eq!(pet.stage(), Stage::Baby);
        assert!(!pet.is_dead());
    }

    #[test]
    fn test_dead_stage_never_changes() {
        let mut pet = new_pet(MemoryStore::default());
        pet.advance(epoch() + minutes(5.5));
        pet.advance(epoch() + minutes(6.0));
        assert!(pet.is_dead());
        for m in [7.0, 12.0, 16.0, 1000.0] {
            assert!(pet.advance(epoch() + minutes(m)).is_empty());
            assert_eq!(pet.stage(), Stage::Teen);
        }
    }

    #[test]
    fn test_rebirth_refused_while_alive() {
        let store = MemoryStore::default();
        let mut pet = new_pet(store.clone());
        assert_eq!(
            pet.rebirth(epoch() + minutes(1.0)),
            Err(PetError::RebirthWhileAlive)
        );
        assert_eq!(pet.born_at(), epoch());
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_rebirth_persists_new_birth_time() {
        let store = MemoryStore::default();
        let mut pet = new_pet(store.clone());
        let later = epoch() + minutes(8.0);
        pet.advance(later);
        pet.rebirth(later).unwrap();
        assert_eq!(store.value(), Some(later));
        assert_eq!(pet.born_at(), later);
    }

    #[test]
    fn test_rebirth_survives_storage_failure() {
        let mut pet = new_pet(MemoryStore::failing());
        let later = epoch() + minutes(9.0);
        pet.advance(later);
        assert!(pet.rebirth(later).is_ok());
        assert!(!pet.is_dead());
        assert_eq!(pet.stage(), Stage::Baby);
    }

    #[test]
    fn test_long_dead_pet_dies_at_its_death_stage() {
        let mut pet = new_pet(MemoryStore::with(epoch() - minutes(500.0)));
        assert_eq!(pet.stage(), Stage::Teen);
        assert_eq!(pet.advance(epoch()), vec![PetSignal::Died { stage: Stage::Teen }]);
    }

    #[test]
    fn test_clock_stepping_back_keeps_age_at_zero() {
        let mut pet = new_pet(MemoryStore::default());
        assert!(pet.advance(epoch() - minutes(10.0)).is_empty());
        assert_eq!(pet.age_at(epoch() - minutes(10.0)), 0.0);
        assert_eq!(pet.stage(), Stage::Baby);
    }

    #[test]
    fn test_clock_stepping_back_never_makes_the_pet_younger() {
        let mut pet = new_pet(MemoryStore::default());
        assert_eq!(
            pet.advance(epoch() + minutes(3.0)),
            vec![PetSignal::StageChanged {
                from: Stage::Baby,
                to: Stage::Child
            }]
        );
        assert!(pet.advance(epoch() + minutes(1.0)).is_empty());
        assert_eq!(pet.stage(), Stage::Child);
        assert_eq!(pet.age_at(epoch() + minutes(1.0)), 3.0);

        // clock recovers and time moves on from the highest age seen
        assert!(pet.advance(epoch() + minutes(4.0)).is_empty());
        assert_eq!(pet.stage(), Stage::Child);
    }

    #[test]
    fn test_rebirth_clears_the_age_high_water_mark() {
        let mut pet = new_pet(MemoryStore::default());
        pet.advance(epoch() + minutes(7.0));
        assert!(pet.is_dead());
        let reborn = epoch() + minutes(8.0);
        pet.rebirth(reborn).unwrap();
        assert_eq!(pet.age_at(reborn), 0.0);
        assert!(pet.advance(reborn).is_empty());
        assert_eq!(pet.stage(), Stage::Baby);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = PetConfig::default();
        cfg.stage_thresholds = [1.0, 1.0, 1.0, 1.0];
        assert!(matches!(
            PetState::new(Box::new(MemoryStore::default()), epoch(), &cfg),
            Err(PetError::InvalidConfig(_))
        ));
    }
}
