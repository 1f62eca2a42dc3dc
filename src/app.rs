use crate::input::{collect_input_nonblocking, map_event_to_action, InputAction, KeyTilt};
use crate::render::{draw_ground, draw_pet, ui_panel, PanelInfo, Terminal, Viewport};
use crate::settings::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::sprites::{footprint, AsciiSprites};
use crate::storage::JsonBirthStore;
use anyhow::Context;
use chrono::Utc;
use std::fs::OpenOptions;
use std::path::Path;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tomodashi::{HostEvent, PetConfig, PetController, PetResult, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TOMODASHI_LOG";
const BANNER_SECS: u64 = 4;

pub(crate) struct App {
    settings: Settings,
    paths: Paths,
    tilt: Rc<KeyTilt>,
    pet: PetController,
    term: Terminal,
    should_quit: bool,
    message: String,
    message_until: Instant,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        if let Err(err) = init_logging(&paths.log_path) {
            eprintln!("tomodashi: logging disabled: {err:#}");
        }

        let settings = load_settings(&paths.settings_path);
        let pet_config = host_pet_config(&settings);

        let tilt = Rc::new(KeyTilt::new());
        let pet = PetController::new(
            Box::new(SystemClock),
            Box::new(JsonBirthStore::new(paths.birth_path.clone())),
            Box::new(AsciiSprites),
            tilt.clone(),
            pet_config,
        )
        .context("could not start the pet")?;
        info!(stage = %pet.current_stage(), born_at = %pet.born_at(), "tomodashi started");

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            paths,
            tilt,
            pet,
            term,
            should_quit: false,
            message: String::new(),
            message_until: Instant::now(),
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        let mut vp = Viewport::for_terminal(self.term.cols, self.term.rows);
        self.pet.set_bounds(vp.container());

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                vp = Viewport::for_terminal(self.term.cols, self.term.rows);
                self.pet.set_bounds(vp.container());
            }

            // input
            for ev in collect_input_nonblocking(frame_dt)? {
                let Some(action) = map_event_to_action(&ev) else {
                    continue;
                };
                match action {
                    InputAction::Quit => {
                        self.should_quit = true;
                        break;
                    }
                    InputAction::Tap => {
                        let result = self.pet.handle_tap();
                        self.report(result);
                    }
                    InputAction::TapAt { col, row } => {
                        let result = self.pet.handle_tap_at(vp.to_point(col, row));
                        self.report(result);
                    }
                    InputAction::TiltBy(dx) => self.tilt.nudge(dx),
                    InputAction::Level => self.tilt.set(0.0),
                }
            }

            let events = self.pet.advance(Utc::now());
            self.announce(&events);

            self.render_frame(vp)?;

            // frame cap
            spin_sleep(frame_dt, Instant::now());
        }

        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        info!("tomodashi stopped");
        Ok(())
    }

    fn report(&mut self, result: PetResult<Vec<HostEvent>>) {
        match result {
            Ok(events) => self.announce(&events),
            Err(err) => {
                warn!(%err, "tap rejected");
                self.flash(err.to_string());
            }
        }
    }

    fn announce(&mut self, events: &[HostEvent]) {
        let name = self.settings.pet_name.clone();
        for event in events {
            match event {
                HostEvent::SwapVisual { to, .. } => self.flash(format!("{name} is now a {to}!")),
                HostEvent::ShowOverlay => {
                    self.flash(format!("{name} has passed on. Tap to start over."))
                }
                HostEvent::HideOverlay => self.flash(format!("Welcome back, {name}!")),
            }
        }
    }

    fn flash(&mut self, message: String) {
        self.message = message;
        self.message_until = Instant::now() + Duration::from_secs(BANNER_SECS);
    }

    fn render_frame(&mut self, vp: Viewport) -> anyhow::Result<()> {
        let bg = crossterm::style::Color::Black;
        self.term.cur.clear(bg);

        if Instant::now() >= self.message_until {
            self.message.clear();
        }

        let stage = self.pet.current_stage();
        let overlay = self.pet.overlay();
        let pose = self.pet.current_visual().pose();

        draw_ground(&mut self.term.cur, vp);
        draw_pet(&mut self.term.cur, vp, stage, pose, overlay, &self.settings);

        let info = PanelInfo {
            name: &self.settings.pet_name,
            stage,
            age: self.pet.age(Utc::now()),
            death_age: self.settings.pet.death_age,
            dead: self.pet.is_dead(),
            tilt: self.tilt.current(),
            message: &self.message,
        };
        ui_panel(&mut self.term.cur, &info);

        self.term.present(true)?;
        Ok(())
    }
}

/// The user's pet settings with the sprite size this host actually draws.
fn host_pet_config(settings: &Settings) -> PetConfig {
    PetConfig {
        sprite_size: footprint(),
        ..settings.pet.clone()
    }
}

/// Logs go to a file next to the save data; the terminal belongs to the pet.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(anyhow::Error::from_boxed)
        .context("could not install the log subscriber")?;
    Ok(())
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    app.run()?;
    Ok(())
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(left - Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_sprite_size_stays_out_of_saved_settings() {
        let mut settings = Settings::default();
        settings.pet.death_age = 9.0;
        let user_sprite = settings.pet.sprite_size;

        let cfg = host_pet_config(&settings);
        assert_eq!(cfg.sprite_size, footprint());
        assert_eq!(cfg.death_age, 9.0);
        assert_eq!(settings.pet.sprite_size, user_sprite);
    }

    #[test]
    fn test_unopenable_log_file_is_reported() {
        let dir = std::env::temp_dir().join(format!("tomodashi-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // a directory cannot be opened for appending
        let err = init_logging(&dir).unwrap_err();
        assert!(format!("{err:#}").contains("could not open log file"));
    }
}
