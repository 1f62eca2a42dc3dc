use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tomodashi::{
    OrientationCallback, OrientationSource, PetError, PetResult, SubscriptionHandle, Tilt,
};
use tracing::{debug, warn};

const TILT_STEP: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum InputAction {
    Tap,
    TapAt { col: u16, row: u16 },
    TiltBy(f32),
    Level,
    Quit,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<Event>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        out.push(event::read()?);
        if out.len() >= 32 {
            break;
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(ev: &Event) -> Option<InputAction> {
    match ev {
        Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
            if matches!(k.code, KeyCode::Char('c')) && k.modifiers.contains(KeyModifiers::CONTROL)
            {
                return Some(InputAction::Quit);
            }
            match k.code {
                KeyCode::Char(' ') | KeyCode::Enter => Some(InputAction::Tap),
                KeyCode::Left => Some(InputAction::TiltBy(-TILT_STEP)),
                KeyCode::Right => Some(InputAction::TiltBy(TILT_STEP)),
                KeyCode::Down => Some(InputAction::Level),
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(InputAction::Quit),
                _ => None,
            }
        }
        Event::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
            Some(InputAction::TapAt {
                col: m.column,
                row: m.row,
            })
        }
        _ => None,
    }
}

struct Sampler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            // wake it from its wait so the join does not stall the frame
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

/// Arrow-key stand-in for a motion sensor.
///
/// Each subscriber gets its own sampler thread that pushes the current tilt
/// at the requested interval until it is unsubscribed.
pub(crate) struct KeyTilt {
    x: Arc<AtomicU32>,
    samplers: RefCell<BTreeMap<u64, Sampler>>,
    next_id: Cell<u64>,
}

impl KeyTilt {
    pub(crate) fn new() -> Self {
        Self {
            x: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            samplers: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(0),
        }
    }

    pub(crate) fn current(&self) -> f32 {
        f32::from_bits(self.x.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, x: f32) {
        self.x.store(x.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn nudge(&self, dx: f32) {
        self.set(self.current() + dx);
    }
}

impl OrientationSource for KeyTilt {
    fn subscribe(
        &self,
        interval_ms: u64,
        callback: OrientationCallback,
    ) -> PetResult<SubscriptionHandle> {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let running = Arc::new(AtomicBool::new(true));
        let alive = Arc::clone(&running);
        let x = Arc::clone(&self.x);
        let interval = Duration::from_millis(interval_ms.max(1));
        let handle = thread::Builder::new()
            .name(format!("tilt-sampler-{id}"))
            .spawn(move || {
                while alive.load(Ordering::Relaxed) {
                    callback(Tilt {
                        x: f32::from_bits(x.load(Ordering::Relaxed)),
                        y: 0.0,
                    });
                    thread::park_timeout(interval);
                }
            })
            .map_err(|e| PetError::OrientationUnavailable(e.to_string()))?;

        debug!(id, interval_ms, "tilt sampler started");
        self.samplers.borrow_mut().insert(
            id,
            Sampler {
                running,
                handle: Some(handle),
            },
        );
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let sampler = self.samplers.borrow_mut().remove(&handle.0);
        match sampler {
            Some(mut s) => {
                s.stop();
                debug!(id = handle.0, "tilt sampler stopped");
            }
            None => warn!(id = handle.0, "unsubscribe for unknown tilt sampler"),
        }
    }
}

impl Drop for KeyTilt {
    fn drop(&mut self) {
        for sampler in self.samplers.get_mut().values_mut() {
            sampler.stop();
        }
    }
}
