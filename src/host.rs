//! Collaborators supplied by whatever hosts the pet: persistence, textures, tilt input.

use crate::clock::Timestamp;
use crate::error::{PetError, PetResult};

/// Single persisted value: when the current pet was born.
pub trait BirthStore {
    fn load(&self) -> PetResult<Option<Timestamp>>;
    fn save(&mut self, born_at: Timestamp) -> PetResult<()>;
}

/// Opaque handle to an image the host knows how to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

pub trait TextureLoader {
    fn load_texture(&mut self, name: &str) -> PetResult<TextureId>;
}

/// One orientation sample; both axes are gravity components in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tilt {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Invoked by the host for every sample, possibly from another thread.
pub type OrientationCallback = Box<dyn Fn(Tilt) + Send + Sync + 'static>;

pub trait OrientationSource {
    /// Fails with `OrientationUnavailable` when the platform has no sensor.
    fn subscribe(
        &self,
        interval_ms: u64,
        callback: OrientationCallback,
    ) -> PetResult<SubscriptionHandle>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Source for platforms without a motion sensor; every subscription is refused.
pub struct NoOrientation;

impl OrientationSource for NoOrientation {
    fn subscribe(
        &self,
        _interval_ms: u64,
        _callback: OrientationCallback,
    ) -> PetResult<SubscriptionHandle> {
        Err(PetError::OrientationUnavailable(
            "no motion sensor on this device".to_string(),
        ))
    }

    fn unsubscribe(&self, _handle: SubscriptionHandle) {}
}
