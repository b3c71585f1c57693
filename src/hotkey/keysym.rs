//! Symbolic key names to X11 keysym values
//!
//! Covers the keys that make sense as a launcher hotkey: letters, digits,
//! printable ASCII, function keys, the common named keys, the keypad
//! (`KP_*`) and the XF86 media and launch keys. Lookup is case-insensitive.

/// X11 keysym value
pub type Keysym = u32;

pub const NUM_LOCK: Keysym = 0xff7f;

const F1: Keysym = 0xffbe;
const MAX_FUNCTION_KEY: u32 = 35;

const NAMED: &[(&str, Keysym)] = &[
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", 0xff14),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Page_Up", 0xff55),
    ("Next", 0xff56),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("Num_Lock", NUM_LOCK),
    ("Caps_Lock", 0xffe5),
    ("Super_L", 0xffeb),
    ("Super_R", 0xffec),
    ("Delete", 0xffff),
    ("space", 0x0020),
    ("apostrophe", 0x0027),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("semicolon", 0x003b),
    ("equal", 0x003d),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("grave", 0x0060),
    // Keypad
    ("KP_Space", 0xff80),
    ("KP_Tab", 0xff89),
    ("KP_Enter", 0xff8d),
    ("KP_Home", 0xff95),
    ("KP_Left", 0xff96),
    ("KP_Up", 0xff97),
    ("KP_Right", 0xff98),
    ("KP_Down", 0xff99),
    ("KP_Prior", 0xff9a),
    ("KP_Page_Up", 0xff9a),
    ("KP_Next", 0xff9b),
    ("KP_Page_Down", 0xff9b),
    ("KP_End", 0xff9c),
    ("KP_Begin", 0xff9d),
    ("KP_Insert", 0xff9e),
    ("KP_Delete", 0xff9f),
    ("KP_Multiply", 0xffaa),
    ("KP_Add", 0xffab),
    ("KP_Separator", 0xffac),
    ("KP_Subtract", 0xffad),
    ("KP_Decimal", 0xffae),
    ("KP_Divide", 0xffaf),
    ("KP_0", 0xffb0),
    ("KP_1", 0xffb1),
    ("KP_2", 0xffb2),
    ("KP_3", 0xffb3),
    ("KP_4", 0xffb4),
    ("KP_5", 0xffb5),
    ("KP_6", 0xffb6),
    ("KP_7", 0xffb7),
    ("KP_8", 0xffb8),
    ("KP_9", 0xffb9),
    ("KP_Equal", 0xffbd),
    // Vendor media and launch keys
    ("XF86MonBrightnessUp", 0x1008ff02),
    ("XF86MonBrightnessDown", 0x1008ff03),
    ("XF86AudioLowerVolume", 0x1008ff11),
    ("XF86AudioMute", 0x1008ff12),
    ("XF86AudioRaiseVolume", 0x1008ff13),
    ("XF86AudioPlay", 0x1008ff14),
    ("XF86AudioStop", 0x1008ff15),
    ("XF86AudioPrev", 0x1008ff16),
    ("XF86AudioNext", 0x1008ff17),
    ("XF86HomePage", 0x1008ff18),
    ("XF86Mail", 0x1008ff19),
    ("XF86Search", 0x1008ff1b),
    ("XF86Calculator", 0x1008ff1d),
    ("XF86PowerOff", 0x1008ff2a),
    ("XF86WWW", 0x1008ff2e),
    ("XF86Sleep", 0x1008ff2f),
    ("XF86Favorites", 0x1008ff30),
    ("XF86AudioMedia", 0x1008ff32),
    ("XF86MyComputer", 0x1008ff33),
    ("XF86Launch0", 0x1008ff40),
    ("XF86Launch1", 0x1008ff41),
    ("XF86Launch2", 0x1008ff42),
    ("XF86Launch3", 0x1008ff43),
    ("XF86Launch4", 0x1008ff44),
    ("XF86Launch5", 0x1008ff45),
    ("XF86Launch6", 0x1008ff46),
    ("XF86Launch7", 0x1008ff47),
    ("XF86Launch8", 0x1008ff48),
    ("XF86Launch9", 0x1008ff49),
    ("XF86LaunchA", 0x1008ff4a),
    ("XF86LaunchB", 0x1008ff4b),
    ("XF86LaunchC", 0x1008ff4c),
    ("XF86LaunchD", 0x1008ff4d),
    ("XF86LaunchE", 0x1008ff4e),
    ("XF86LaunchF", 0x1008ff4f),
    ("XF86Documents", 0x1008ff5b),
    ("XF86Explorer", 0x1008ff5d),
    ("XF86Terminal", 0x1008ff80),
    ("XF86Tools", 0x1008ff81),
];

/// Resolve a key name such as `F2`, `space` or `r` to its keysym.
///
/// Single letters resolve to the upper-case keysym; the keyboard mapping
/// lists both cases under the same keycode.
pub fn from_name(name: &str) -> Option<Keysym> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_graphic() {
            return Some(u32::from(c.to_ascii_uppercase()));
        }
        return None;
    }

    if let Some(number) = name.strip_prefix(['F', 'f']) {
        if let Ok(n) = number.parse::<u32>() {
            return (1..=MAX_FUNCTION_KEY).contains(&n).then(|| F1 + n - 1);
        }
    }

    NAMED
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, keysym)| *keysym)
}

/// Canonical name for a keysym
pub fn name(keysym: Keysym) -> String {
    if (F1..F1 + MAX_FUNCTION_KEY).contains(&keysym) {
        return format!("F{}", keysym - F1 + 1);
    }
    if let Some((known, _)) = NAMED.iter().find(|(_, k)| *k == keysym) {
        return (*known).to_string();
    }
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_graphic() => c.to_string(),
        _ => format!("0x{keysym:04x}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_keys() {
        assert_eq!(from_name("F1"), Some(0xffbe));
        assert_eq!(from_name("f2"), Some(0xffbf));
        assert_eq!(from_name("F35"), Some(0xffe0));
        assert_eq!(from_name("F0"), None);
        assert_eq!(from_name("F36"), None);
    }

    #[test]
    fn test_single_characters() {
        assert_eq!(from_name("r"), Some(0x52));
        assert_eq!(from_name("R"), Some(0x52));
        assert_eq!(from_name("5"), Some(0x35));
        assert_eq!(from_name("/"), Some(0x2f));
    }

    #[test]
    fn test_named_keys_case_insensitive() {
        assert_eq!(from_name("Return"), Some(0xff0d));
        assert_eq!(from_name("RETURN"), Some(0xff0d));
        assert_eq!(from_name("space"), Some(0x20));
        assert_eq!(from_name("Page_Up"), from_name("Prior"));
    }

    #[test]
    fn test_keypad_and_media_keys() {
        assert_eq!(from_name("KP_Enter"), Some(0xff8d));
        assert_eq!(from_name("kp_7"), Some(0xffb7));
        assert_eq!(from_name("XF86AudioPlay"), Some(0x1008ff14));
        assert_eq!(from_name("XF86LaunchA"), Some(0x1008ff4a));
        assert_eq!(name(0xff8d), "KP_Enter");
        assert_eq!(name(0x1008ff12), "XF86AudioMute");
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(from_name(""), None);
        assert_eq!(from_name("Hyper_Q"), None);
        assert_eq!(from_name("Fx"), None);
    }

    #[test]
    fn test_names_round_trip() {
        assert_eq!(name(from_name("f2").unwrap()), "F2");
        assert_eq!(name(from_name("return").unwrap()), "Return");
        assert_eq!(name(from_name("a").unwrap()), "A");
        assert_eq!(name(0x1234), "0x1234");
    }
}
