//! Interned strings.
//!
//! An [`Atom`] is a 32-bit handle identifying a unique string within the
//! [`AtomTable`] that created it (spec §3 "Atom", §4.1). `Atom::NONE` (0)
//! denotes absence, matching `ATOM_NONE` in the original implementation.
//! Atoms are immutable and table-scoped: comparing two atoms interned by the
//! same table is equivalent to comparing the strings they name.
use fnv::FnvHashMap;
use std::fmt;

/// A 32-bit interned-string handle. `Atom::NONE` denotes "no atom".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Atom(u32);

impl Atom {
    /// Sentinel for "no atom", matching `ATOM_NONE` in the spec.
    pub const NONE: Atom = Atom(0);

    pub fn is_none(self) -> bool {
        self == Atom::NONE
    }

    /// Raw numeric value, for callers that need a stable sort/hash key
    /// without going through [`AtomTable`] (e.g. serializing LED masks).
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Owns the backing storage for every [`Atom`] handed out. Append-only:
/// once interned, a string's atom never changes, so atoms may be freely
/// copied and compared without borrowing the table (spec §5: "the atom
/// table ... is safe to read concurrently after inserts are quiesced").
#[derive(Debug, Default, Clone)]
pub struct AtomTable {
    strings: Vec<Box<str>>,
    by_string: FnvHashMap<Box<str>, Atom>,
}

impl AtomTable {
    pub fn new() -> Self {
        // Reserve index 0 for Atom::NONE so real atoms start at 1.
        AtomTable {
            strings: vec!["".into()],
            by_string: FnvHashMap::default(),
        }
    }

    /// Intern `s`, returning the same [`Atom`] for equal strings across
    /// calls. `steal` exists for API parity with the original's
    /// steal-the-allocation variant; since Rust strings are owned values
    /// either way, it only affects whether the caller's `String` is
    /// reused instead of re-copied.
    pub fn intern(&mut self, s: &str, steal: Option<String>) -> Atom {
        if let Some(&atom) = self.by_string.get(s) {
            return atom;
        }
        let boxed: Box<str> = match steal {
            Some(owned) if owned == s => owned.into_boxed_str(),
            _ => s.into(),
        };
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(boxed.clone());
        self.by_string.insert(boxed, atom);
        atom
    }

    /// Look up the string an atom names. Panics only for an `Atom` that did
    /// not originate from this table, which is a programming error in the
    /// same class as indexing a `Vec` out of bounds.
    pub fn lookup(&self, atom: Atom) -> Option<&str> {
        if atom.is_none() {
            return None;
        }
        self.strings.get(atom.0 as usize).map(|s| s.as_ref())
    }

    /// Owned copy of the string an atom names.
    pub fn dup(&self, atom: Atom) -> Option<String> {
        self.lookup(atom).map(|s| s.to_owned())
    }

    /// Case-insensitively look up an existing atom without interning.
    /// Used by identifiers the grammar treats case-insensitively (modifier
    /// names, action names, field names, enum values — spec §4.3).
    pub fn find_ignore_ascii_case(&self, s: &str) -> Option<Atom> {
        if let Some(&atom) = self.by_string.get(s) {
            return Some(atom);
        }
        self.strings
            .iter()
            .position(|existing| existing.eq_ignore_ascii_case(s))
            .map(|idx| Atom(idx as u32))
    }

    pub fn len(&self) -> usize {
        self.strings.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let mut table = AtomTable::new();
        let a = table.intern("Shift", None);
        let b = table.intern("Shift", None);
        assert_eq!(a, b);
        assert_eq!(table.lookup(a), Some("Shift"));
    }

    #[test]
    fn none_is_distinct() {
        let mut table = AtomTable::new();
        let a = table.intern("x", None);
        assert!(a != Atom::NONE);
        assert_eq!(table.lookup(Atom::NONE), None);
    }

    #[test]
    fn distinct_strings_get_distinct_atoms() {
        let mut table = AtomTable::new();
        let a = table.intern("AE01", None);
        let b = table.intern("AE02", None);
        assert_ne!(a, b);
    }

    #[test]
    fn steal_reuses_allocation_for_equal_string() {
        let mut table = AtomTable::new();
        let owned = String::from("stolen");
        let atom = table.intern("stolen", Some(owned));
        assert_eq!(table.lookup(atom), Some("stolen"));
    }
}
