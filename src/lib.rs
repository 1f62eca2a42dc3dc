//! Tomodashi: a virtual pet that grows up by the minute, dies, and is reborn with a tap.
//!
//! The host owns the render loop and calls [`PetController::advance`] once per
//! frame, forwards taps to [`PetController::handle_tap`], and redraws whatever
//! [`PetController::current_visual`] reports. Everything the pet needs from the
//! platform comes in through the traits in [`host`].

pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod motion;
pub mod pet;
pub mod stage;
pub mod visual;

#[cfg(test)]
mod testing;

pub use cache::{VisualCache, VisualFactory};
pub use clock::{AgeScale, Clock, SystemClock, Timestamp};
pub use config::{PetConfig, Point, Size, TiltConfig};
pub use controller::{DeathOverlay, HostEvent, PetController, OVERLAY_TEXTURE};
pub use error::{PetError, PetResult};
pub use host::{
    BirthStore, NoOrientation, OrientationCallback, OrientationSource, SubscriptionHandle,
    TextureId, TextureLoader, Tilt,
};
pub use pet::{PetSignal, PetState};
pub use stage::{Stage, StageTable};
pub use visual::{StageVisual, VisualPose};
