//! Key combination parsing and modifier masks
//!
//! Grammar: `[Modifier("+"Modifier)*"+"]Key`. Modifier names are
//! case-insensitive: `ctrl`, `alt`/`mod1`, `shift`, `super`/`mod4`.
//! Unrecognized modifier tokens are ignored rather than rejected, so a
//! typo such as `Crtl+F2` silently binds plain `F2`. An empty modifier
//! segment (`+F2`) matches any modifier state. Input without `+` yields
//! no combination at all.

use bitflags::bitflags;

use super::keysym::{self, Keysym};

/// X11 keycode
pub type Keycode = u8;

bitflags! {
    /// X11 core protocol modifier bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierMask: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const ANY = 1 << 15;
    }
}

/// A parsed key combination, not yet resolved against a keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: ModifierMask,
    pub keysym: Keysym,
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.contains(ModifierMask::ANY) {
            write!(f, "Any+")?;
        }
        for (flag, label) in [
            (ModifierMask::CONTROL, "Ctrl"),
            (ModifierMask::MOD1, "Alt"),
            (ModifierMask::SHIFT, "Shift"),
            (ModifierMask::MOD4, "Super"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{label}+")?;
            }
        }
        write!(f, "{}", keysym::name(self.keysym))
    }
}

/// Parse a combination string such as `Ctrl+Alt+F2`.
///
/// The key is a single printable character, `F1`..`F35`, a named key
/// (`Return`, `space`, `Page_Up`, ...), a keypad key (`KP_Enter`, `KP_5`)
/// or an XF86 media/launch key (`XF86AudioPlay`, `XF86Launch1`).
/// Returns `None` when there is no `+` or the key name is unknown.
pub fn parse_combo(input: &str) -> Option<KeyCombo> {
    let (modifiers, key) = input.trim().rsplit_once('+')?;
    let keysym = keysym::from_name(key.trim())?;
    Some(KeyCombo {
        modifiers: modifier_mask(modifiers),
        keysym,
    })
}

fn modifier_mask(spec: &str) -> ModifierMask {
    if spec.is_empty() {
        return ModifierMask::ANY;
    }

    spec.split('+')
        .map(|token| match token.trim().to_ascii_uppercase().as_str() {
            "CTRL" => ModifierMask::CONTROL,
            "ALT" | "MOD1" => ModifierMask::MOD1,
            "SHIFT" => ModifierMask::SHIFT,
            "SUPER" | "MOD4" => ModifierMask::MOD4,
            _ => ModifierMask::empty(),
        })
        .fold(ModifierMask::empty(), |mask, flag| mask | flag)
}

/// A combination resolved to a keycode on the current display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub combo: KeyCombo,
    pub keycode: Keycode,
    /// Modifier bit the keyboard currently assigns to Num_Lock
    pub numlock: ModifierMask,
}

impl HotkeyBinding {
    pub fn new(combo: KeyCombo, keycode: Keycode, numlock: ModifierMask) -> Self {
        Self {
            combo,
            keycode,
            numlock,
        }
    }

    /// Every modifier mask that must be grabbed so the binding fires
    /// regardless of Num Lock and Caps Lock state.
    pub fn grab_masks(&self) -> Vec<ModifierMask> {
        let base = self.combo.modifiers;
        if base.contains(ModifierMask::ANY) {
            return vec![ModifierMask::ANY];
        }

        let mut masks = Vec::with_capacity(4);
        for mask in [
            base,
            base | ModifierMask::LOCK,
            base | self.numlock,
            base | self.numlock | ModifierMask::LOCK,
        ] {
            if !masks.contains(&mask) {
                masks.push(mask);
            }
        }
        masks
    }
}

impl std::fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.combo.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F2: Keysym = 0xffbf;

    #[test]
    fn test_parse_keypad_combo() {
        let combo = parse_combo("Super+KP_Enter").unwrap();
        assert_eq!(combo.modifiers, ModifierMask::MOD4);
        assert_eq!(combo.to_string(), "Super+KP_Enter");
    }

    #[test]
    fn test_ctrl_alt_f2() {
        let combo = parse_combo("Ctrl+Alt+F2").unwrap();
        assert!(combo.modifiers.contains(ModifierMask::CONTROL));
        assert!(combo.modifiers.contains(ModifierMask::MOD1));
        assert!(!combo.modifiers.contains(ModifierMask::SHIFT));
        assert_eq!(combo.keysym, F2);
        assert_eq!(keysym::name(combo.keysym), "F2");
    }

    #[test]
    fn test_no_plus_is_no_binding() {
        assert_eq!(parse_combo("F2"), None);
        assert_eq!(parse_combo(""), None);
    }

    #[test]
    fn test_unknown_modifier_ignored() {
        let combo = parse_combo("Foo+F2").unwrap();
        assert_eq!(combo.modifiers, ModifierMask::empty());
        assert_eq!(combo.keysym, F2);
    }

    #[test]
    fn test_empty_modifier_means_any() {
        let combo = parse_combo("+F2").unwrap();
        assert_eq!(combo.modifiers, ModifierMask::ANY);
    }

    #[test]
    fn test_modifier_aliases_case_insensitive() {
        let combo = parse_combo("mod1+SUPER+shift+r").unwrap();
        assert_eq!(
            combo.modifiers,
            ModifierMask::MOD1 | ModifierMask::MOD4 | ModifierMask::SHIFT
        );
        assert_eq!(parse_combo("alt+mod4+r").unwrap().modifiers, combo.modifiers - ModifierMask::SHIFT);
    }

    #[test]
    fn test_unknown_key_is_no_binding() {
        assert_eq!(parse_combo("Ctrl+NoSuchKey"), None);
        assert_eq!(parse_combo("Ctrl+"), None);
    }

    #[test]
    fn test_display_canonical() {
        assert_eq!(parse_combo("alt+ctrl+f2").unwrap().to_string(), "Ctrl+Alt+F2");
        assert_eq!(parse_combo("+space").unwrap().to_string(), "Any+space");
        assert_eq!(parse_combo("Foo+F2").unwrap().to_string(), "F2");
    }

    #[test]
    fn test_grab_masks_lock_insensitive() {
        let binding = HotkeyBinding::new(parse_combo("Alt+F2").unwrap(), 68, ModifierMask::MOD2);
        assert_eq!(
            binding.grab_masks(),
            vec![
                ModifierMask::MOD1,
                ModifierMask::MOD1 | ModifierMask::LOCK,
                ModifierMask::MOD1 | ModifierMask::MOD2,
                ModifierMask::MOD1 | ModifierMask::MOD2 | ModifierMask::LOCK,
            ]
        );
    }

    #[test]
    fn test_grab_masks_without_numlock() {
        let binding = HotkeyBinding::new(parse_combo("Alt+F2").unwrap(), 68, ModifierMask::empty());
        assert_eq!(
            binding.grab_masks(),
            vec![ModifierMask::MOD1, ModifierMask::MOD1 | ModifierMask::LOCK]
        );
    }

    #[test]
    fn test_grab_masks_any() {
        let binding = HotkeyBinding::new(parse_combo("+F2").unwrap(), 68, ModifierMask::MOD2);
        assert_eq!(binding.grab_masks(), vec![ModifierMask::ANY]);
    }
}
