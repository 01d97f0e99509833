//! Keysym name/code catalog (spec §4.6).
mod table;

use std::fmt;

/// Start of the Unicode private range: codes `0x0100_0100..=0x0110_FFFF`
/// denote `U+XXXX` for the corresponding codepoint (spec §3, §4.6).
const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;
const UNICODE_RANGE_START: u32 = 0x0100_0100;
const UNICODE_RANGE_END: u32 = 0x0110_ffff;

/// A 32-bit logical symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keysym(pub u32);

impl Keysym {
    pub const NO_SYMBOL: Keysym = Keysym(0x0000_0000);
    pub const VOID_SYMBOL: Keysym = Keysym(0x00ff_ffff);

    pub fn from_unicode(c: char) -> Keysym {
        Keysym(UNICODE_KEYSYM_BASE + c as u32)
    }

    /// The Unicode scalar value this keysym denotes, if it falls in the
    /// Unicode range.
    pub fn to_unicode(self) -> Option<char> {
        if self.0 >= UNICODE_RANGE_START && self.0 <= UNICODE_RANGE_END {
            char::from_u32(self.0 - UNICODE_KEYSYM_BASE)
        } else {
            None
        }
    }

    pub fn is_no_symbol(self) -> bool {
        self == Keysym::NO_SYMBOL
    }

    /// Case-fold to the lowercase variant, if one is known. Used by the
    /// state machine's Caps Lock handling (spec §4.7 "apply uppercase to
    /// the returned keysyms").
    pub fn to_lower(self) -> Keysym {
        table::UPPER_TO_LOWER
            .iter()
            .find(|(upper, _)| *upper == self.0)
            .map(|(_, lower)| Keysym(*lower))
            .unwrap_or(self)
    }

    /// Case-fold to the uppercase variant, if one is known.
    pub fn to_upper(self) -> Keysym {
        table::UPPER_TO_LOWER
            .iter()
            .find(|(_, lower)| *lower == self.0)
            .map(|(upper, _)| Keysym(*upper))
            .unwrap_or(self)
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", keysym_get_name(*self))
    }
}

/// `keysym_from_name(s) -> code`. Matching is case-sensitive except for the
/// two reserved alias pairs `Any`/`NoSymbol` and `None`/`VoidSymbol` (spec
/// §4.6). A name of the form `U+XXXX` (1-6 hex digits) resolves directly to
/// the Unicode range without a table lookup.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if name.eq_ignore_ascii_case("Any") || name == "NoSymbol" {
        return Some(Keysym::NO_SYMBOL);
    }
    if name.eq_ignore_ascii_case("None") || name == "VoidSymbol" {
        return Some(Keysym::VOID_SYMBOL);
    }
    if let Some(hex) = name.strip_prefix("U+").or_else(|| name.strip_prefix("u+")) {
        if let Ok(code) = u32::from_str_radix(hex, 16) {
            return char::from_u32(code).map(Keysym::from_unicode);
        }
        return None;
    }
    table::NAME_TO_CODE.get(name).copied().map(Keysym)
}

/// `keysym_get_name(code) -> string`. Unicode-range codes render as
/// `U+XXXX`; everything else is a linear reverse lookup over the same
/// table `keysym_from_name` uses (the table is small enough that this
/// costs nothing worth indexing for).
pub fn keysym_get_name(keysym: Keysym) -> String {
    if keysym == Keysym::NO_SYMBOL {
        return "NoSymbol".to_owned();
    }
    if keysym == Keysym::VOID_SYMBOL {
        return "VoidSymbol".to_owned();
    }
    if let Some(c) = keysym.to_unicode() {
        return format!("U+{:04X}", c as u32);
    }
    table::NAME_TO_CODE
        .entries()
        .find(|(_, &code)| code == keysym.0)
        .map(|(name, _)| (*name).to_owned())
        .unwrap_or_else(|| format!("0x{:08x}", keysym.0))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn name_round_trip() {
        let ks = keysym_from_name("q").unwrap();
        assert_eq!(keysym_get_name(ks), "q");
    }

    #[test]
    fn unicode_range() {
        let ks = Keysym::from_unicode('€');
        assert_eq!(ks.to_unicode(), Some('€'));
        assert_eq!(keysym_get_name(ks), "U+20AC");
    }

    #[test]
    fn case_aliases() {
        assert_eq!(keysym_from_name("Any"), Some(Keysym::NO_SYMBOL));
        assert_eq!(keysym_from_name("None"), Some(Keysym::VOID_SYMBOL));
    }

    #[test]
    fn caps_lock_folds_letters() {
        let q = keysym_from_name("q").unwrap();
        assert_eq!(q.to_upper(), keysym_from_name("Q").unwrap());
        assert_eq!(q.to_upper().to_lower(), q);
    }
}
