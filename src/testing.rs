//! In-memory collaborators for unit tests.

use crate::clock::{Clock, Timestamp};
use crate::error::{PetError, PetResult};
use crate::host::{
    BirthStore, OrientationCallback, OrientationSource, SubscriptionHandle, TextureId,
    TextureLoader, Tilt,
};
use chrono::{Duration, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub(crate) fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 10, 23, 9, 0, 0).unwrap()
}

pub(crate) fn minutes(m: f64) -> Duration {
    Duration::milliseconds((m * 60_000.0) as i64)
}

#[derive(Clone)]
pub(crate) struct FixedClock {
    now: Rc<Cell<Timestamp>>,
}

impl FixedClock {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub(crate) fn set(&self, now: Timestamp) {
        self.now.set(now);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    value: Rc<RefCell<Option<Timestamp>>>,
    saves: Rc<Cell<u32>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub(crate) fn with(born_at: Timestamp) -> Self {
        let store = Self::default();
        *store.value.borrow_mut() = Some(born_at);
        store
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub(crate) fn value(&self) -> Option<Timestamp> {
        *self.value.borrow()
    }

    pub(crate) fn saves(&self) -> u32 {
        self.saves.get()
    }
}

impl BirthStore for MemoryStore {
    fn load(&self) -> PetResult<Option<Timestamp>> {
        Ok(*self.value.borrow())
    }

    fn save(&mut self, born_at: Timestamp) -> PetResult<()> {
        if self.fail_saves {
            return Err(PetError::Storage("disk full".to_string()));
        }
        *self.value.borrow_mut() = Some(born_at);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Hands out sequential ids per name; names in `missing` fail to load.
#[derive(Default)]
pub(crate) struct NamedTextures {
    ids: BTreeMap<String, TextureId>,
    missing: BTreeSet<String>,
    loads: Rc<Cell<u32>>,
}

impl NamedTextures {
    pub(crate) fn without(names: &[&str]) -> Self {
        Self {
            missing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn load_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.loads)
    }
}

impl TextureLoader for NamedTextures {
    fn load_texture(&mut self, name: &str) -> PetResult<TextureId> {
        self.loads.set(self.loads.get() + 1);
        if self.missing.contains(name) {
            return Err(PetError::TextureUnavailable(name.to_string()));
        }
        let next = TextureId(self.ids.len() as u32 + 1);
        Ok(*self.ids.entry(name.to_string()).or_insert(next))
    }
}

/// Sensor driven by the test through `emit`.
#[derive(Default)]
pub(crate) struct ManualOrientation {
    subscribers: RefCell<BTreeMap<u64, OrientationCallback>>,
    next_id: Cell<u64>,
    unsubscribes: Cell<u32>,
}

impl ManualOrientation {
    pub(crate) fn emit(&self, tilt: Tilt) {
        for callback in self.subscribers.borrow().values() {
            callback(tilt);
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub(crate) fn unsubscribe_calls(&self) -> u32 {
        self.unsubscribes.get()
    }
}

impl OrientationSource for ManualOrientation {
    fn subscribe(
        &self,
        _interval_ms: u64,
        callback: OrientationCallback,
    ) -> PetResult<SubscriptionHandle> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.subscribers.borrow_mut().insert(id, callback);
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.unsubscribes.set(self.unsubscribes.get() + 1);
        self.subscribers.borrow_mut().remove(&handle.0);
    }
}
