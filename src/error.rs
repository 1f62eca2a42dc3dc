//! Error types shared by the pet core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PetError {
    /// A stage name that is not one of baby/child/teen/adult/senior.
    #[error("unknown stage '{0}'")]
    InvalidStage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Rebirth is only accepted while the pet is dead.
    #[error("rebirth requested while the pet is alive")]
    RebirthWhileAlive,

    #[error("texture '{0}' is not available")]
    TextureUnavailable(String),

    #[error("orientation input unavailable: {0}")]
    OrientationUnavailable(String),

    #[error("birth time storage failed: {0}")]
    Storage(String),
}

pub type PetResult<T> = Result<T, PetError>;
