//! In-memory session for tests. Delivers key presses only when they match
//! an installed grab, the way the X server does.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use x11rb::errors::ConnectionError;

use super::keys::{Keycode, ModifierMask};
use super::keysym::{self, Keysym};
use super::listener::HotkeyError;
use super::session::{InputEvent, KeySession};

pub const F2_KEYCODE: Keycode = 68;
const NUMLOCK_KEYCODE: Keycode = 77;
const F2: Keysym = 0xffbf;

pub enum Queued {
    Press(Keycode, ModifierMask),
    Motion,
    Fail,
}

#[derive(Default)]
struct Shared {
    grabs: Vec<(Keycode, ModifierMask)>,
    queue: VecDeque<Queued>,
}

#[derive(Clone, Default)]
pub struct FakeSession {
    shared: Arc<Mutex<Shared>>,
}

impl FakeSession {
    pub fn press(&self, keycode: Keycode, state: ModifierMask) {
        self.push(Queued::Press(keycode, state));
    }

    pub fn push(&self, item: Queued) {
        self.shared.lock().queue.push_back(item);
    }

    pub fn grabs(&self) -> Vec<(Keycode, ModifierMask)> {
        self.shared.lock().grabs.clone()
    }
}

impl KeySession for FakeSession {
    fn keycode_for(&self, keysym: Keysym) -> Result<Option<Keycode>, HotkeyError> {
        Ok(match keysym {
            F2 => Some(F2_KEYCODE),
            keysym::NUM_LOCK => Some(NUMLOCK_KEYCODE),
            _ => None,
        })
    }

    fn numlock_mask(&self) -> Result<ModifierMask, HotkeyError> {
        Ok(ModifierMask::MOD2)
    }

    fn grab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError> {
        self.shared.lock().grabs.push((keycode, modifiers));
        Ok(())
    }

    fn ungrab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError> {
        self.shared
            .lock()
            .grabs
            .retain(|grab| *grab != (keycode, modifiers));
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<InputEvent>, HotkeyError> {
        let mut shared = self.shared.lock();
        match shared.queue.pop_front() {
            None => Ok(None),
            Some(Queued::Motion) => Ok(Some(InputEvent::Other)),
            Some(Queued::Fail) => Err(HotkeyError::Connection(ConnectionError::UnknownError)),
            Some(Queued::Press(keycode, state)) => {
                let grabbed = shared
                    .grabs
                    .iter()
                    .any(|(k, m)| *k == keycode && (m.contains(ModifierMask::ANY) || *m == state));
                Ok(grabbed.then_some(InputEvent::KeyPress { keycode, state }))
            }
        }
    }
}
