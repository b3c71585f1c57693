//! Display session abstraction and its X11 implementation
//!
//! The listener only needs four things from the windowing system: keysym
//! to keycode lookup, the Num Lock modifier bit, passive key grabs on the
//! root window and a non-blocking event poll.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GrabMode, ModMask, Window};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::keys::{Keycode, ModifierMask};
use super::keysym::{self, Keysym};
use super::listener::HotkeyError;

/// Input delivered to the listener by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyPress { keycode: Keycode, state: ModifierMask },
    Other,
}

/// Connection to the desktop session used for global key grabs
pub trait KeySession: Send + 'static {
    /// Keycode currently producing `keysym`, if any
    fn keycode_for(&self, keysym: Keysym) -> Result<Option<Keycode>, HotkeyError>;

    /// Modifier bit assigned to Num Lock (empty if none)
    fn numlock_mask(&self) -> Result<ModifierMask, HotkeyError>;

    fn grab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError>;

    fn ungrab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError>;

    /// Next pending event without blocking
    fn poll_event(&mut self) -> Result<Option<InputEvent>, HotkeyError>;
}

/// X11 session over a pure-Rust protocol connection
pub struct X11Session {
    conn: RustConnection,
    root: Window,
}

impl X11Session {
    /// Open the display named by `$DISPLAY`
    pub fn connect() -> Result<Self, HotkeyError> {
        let (conn, screen) = x11rb::connect(None)?;
        let root = conn
            .setup()
            .roots
            .get(screen)
            .map(|s| s.root)
            .ok_or(HotkeyError::NoScreen(screen))?;
        Ok(Self { conn, root })
    }
}

impl KeySession for X11Session {
    fn keycode_for(&self, keysym: Keysym) -> Result<Option<Keycode>, HotkeyError> {
        let setup = self.conn.setup();
        let min = setup.min_keycode;
        let count = setup.max_keycode - min + 1;
        let reply = self.conn.get_keyboard_mapping(min, count)?.reply()?;
        Ok(keycode_from_mapping(
            min,
            reply.keysyms_per_keycode,
            &reply.keysyms,
            keysym,
        ))
    }

    fn numlock_mask(&self) -> Result<ModifierMask, HotkeyError> {
        let numlock = self.keycode_for(keysym::NUM_LOCK)?;
        let reply = self.conn.get_modifier_mapping()?.reply()?;
        Ok(numlock_mask_from_modmap(&reply.keycodes, numlock))
    }

    fn grab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError> {
        self.conn
            .grab_key(
                true,
                self.root,
                ModMask::from(modifiers.bits()),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .check()?;
        Ok(())
    }

    fn ungrab(&mut self, keycode: Keycode, modifiers: ModifierMask) -> Result<(), HotkeyError> {
        self.conn
            .ungrab_key(keycode, self.root, ModMask::from(modifiers.bits()))?
            .check()?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<InputEvent>, HotkeyError> {
        let event = match self.conn.poll_for_event()? {
            Some(Event::KeyPress(press)) => Some(InputEvent::KeyPress {
                keycode: press.detail,
                state: ModifierMask::from_bits_truncate(u16::from(press.state)),
            }),
            Some(_) => Some(InputEvent::Other),
            None => None,
        };
        Ok(event)
    }
}

/// Find the first keycode whose keysym row contains `target`
pub fn keycode_from_mapping(
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: &[Keysym],
    target: Keysym,
) -> Option<Keycode> {
    let per = usize::from(keysyms_per_keycode);
    if per == 0 {
        return None;
    }
    keysyms
        .chunks(per)
        .position(|row| row.contains(&target))
        .and_then(|offset| Keycode::try_from(usize::from(min_keycode) + offset).ok())
}

/// Modifier bit whose keycode list contains the Num Lock key.
///
/// `keycodes` is the modifier map: 8 rows of equal length, one per
/// modifier in Shift, Lock, Control, Mod1..Mod5 order.
pub fn numlock_mask_from_modmap(keycodes: &[Keycode], numlock: Option<Keycode>) -> ModifierMask {
    let Some(numlock) = numlock.filter(|k| *k != 0) else {
        return ModifierMask::empty();
    };
    let per = keycodes.len() / 8;
    if per == 0 {
        return ModifierMask::empty();
    }

    keycodes
        .chunks(per)
        .take(8)
        .enumerate()
        .filter(|(_, row)| row.contains(&numlock))
        .last()
        .map(|(bit, _)| ModifierMask::from_bits_truncate(1 << bit))
        .unwrap_or_else(ModifierMask::empty)
}
