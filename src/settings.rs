use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tomodashi::PetConfig;
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) pet_name: String,
    pub(crate) pet: PetConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            enable_color: true,
            pet_name: "Tomo".to_string(),
            pet: PetConfig::default(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) birth_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "tomodashi", "Tomodashi")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        birth_path: dir.join("birth.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("tomodashi.log"),
    })
}

/// Falls back to defaults when the file is missing, unreadable or describes an impossible pet.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => match v.pet.validate() {
            Ok(()) => v,
            Err(err) => {
                warn!(%err, "pet settings rejected, using defaults");
                Settings {
                    pet: PetConfig::default(),
                    ..v
                }
            }
        },
        Err(err) => {
            warn!(%err, path = %path.display(), "settings unreadable, using defaults");
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    // rename-over-existing is not atomic everywhere; remove first and accept the tiny window
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}
