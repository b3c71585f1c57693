//! Hotkey module for global keyboard activation
//!
//! Parses a `Mod+Mod+Key` string, grabs it on the X11 root window and
//! reports each matching key press as an activation.

#[cfg(test)]
pub(crate) mod fake;
mod keys;
mod keysym;
mod listener;
mod session;

#[cfg(test)]
pub(crate) use keys::ModifierMask;
pub use listener::{HotkeyError, HotkeyListener};
pub use session::{KeySession, X11Session};
