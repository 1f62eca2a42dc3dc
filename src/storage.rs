use crate::settings::atomic_rename;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tomodashi::{BirthStore, PetError, PetResult, Timestamp};
use tracing::warn;

pub(crate) const BIRTH_FILE_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct BirthFile {
    pub(crate) version: u32,
    pub(crate) born_at: DateTime<Utc>,
}

/// Keeps the pet's birth time in a small JSON file.
pub(crate) struct JsonBirthStore {
    path: PathBuf,
}

impl JsonBirthStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BirthStore for JsonBirthStore {
    fn load(&self) -> PetResult<Option<Timestamp>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PetError::Storage(err.to_string())),
        };
        match serde_json::from_str::<BirthFile>(&s) {
            Ok(file) => Ok(Some(file.born_at)),
            Err(err) => {
                warn!(%err, path = %self.path.display(), "birth file corrupt, treating as first run");
                Ok(None)
            }
        }
    }

    fn save(&mut self, born_at: Timestamp) -> PetResult<()> {
        let file = BirthFile {
            version: BIRTH_FILE_VERSION,
            born_at,
        };
        save_atomic(&self.path, &file).map_err(|e| PetError::Storage(e.to_string()))
    }
}

pub(crate) fn save_atomic(path: &Path, file: &BirthFile) -> anyhow::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(file)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}
