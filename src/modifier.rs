//! Modifier indices and masks.
//!
//! Indices `0..=7` are the eight *real* modifiers fixed by the X11 protocol
//! (`Shift`, `Lock`, `Control`, `Mod1..Mod5`); indices `8..=31` are *virtual*
//! modifiers, named by an [`Atom`](crate::atom::Atom) and resolved to a real
//! mask during compilation (spec §4.5 "Virtual modifier resolution").
use crate::atom::{Atom, AtomTable};
use bitflags::bitflags;
use std::fmt;

/// A modifier bit position, `0..=31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifierIndex(pub u8);

impl ModifierIndex {
    pub const SHIFT: ModifierIndex = ModifierIndex(0);
    pub const LOCK: ModifierIndex = ModifierIndex(1);
    pub const CONTROL: ModifierIndex = ModifierIndex(2);
    pub const MOD1: ModifierIndex = ModifierIndex(3);
    pub const MOD2: ModifierIndex = ModifierIndex(4);
    pub const MOD3: ModifierIndex = ModifierIndex(5);
    pub const MOD4: ModifierIndex = ModifierIndex(6);
    pub const MOD5: ModifierIndex = ModifierIndex(7);

    /// Number of real (non-virtual) modifiers.
    pub const NUM_REAL: u8 = 8;
    /// Total addressable modifier bits.
    pub const NUM_MODS: u8 = 32;

    pub fn is_real(self) -> bool {
        self.0 < Self::NUM_REAL
    }

    pub fn is_virtual(self) -> bool {
        !self.is_real()
    }

    pub fn mask(self) -> ModMask {
        ModMask::from_bits_truncate(1u32 << self.0)
    }
}

impl fmt::Display for ModifierIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// A 32-bit modifier set: bits `0..=7` real, `8..=31` virtual.
    #[derive(Default)]
    pub struct ModMask: u32 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD3    = 1 << 5;
        const MOD4    = 1 << 6;
        const MOD5    = 1 << 7;
        const REAL_MODS_MASK = 0x00ff;
        const ALL_MODS_MASK  = 0xffff_ffff;
    }
}

impl ModMask {
    pub fn real(self) -> ModMask {
        self & ModMask::REAL_MODS_MASK
    }

    pub fn has(self, index: ModifierIndex) -> bool {
        self.contains(index.mask())
    }

    pub fn with(self, index: ModifierIndex) -> ModMask {
        self | index.mask()
    }
}

/// The standard name-to-real-modifier table the lexer/expression evaluator
/// consults for bare identifiers like `Shift` or `Mod1` (case-insensitive,
/// per spec §4.3).
pub const REAL_MOD_NAMES: &[(&str, ModifierIndex)] = &[
    ("Shift", ModifierIndex::SHIFT),
    ("Lock", ModifierIndex::LOCK),
    ("Control", ModifierIndex::CONTROL),
    ("Ctrl", ModifierIndex::CONTROL),
    ("Mod1", ModifierIndex::MOD1),
    ("Mod2", ModifierIndex::MOD2),
    ("Mod3", ModifierIndex::MOD3),
    ("Mod4", ModifierIndex::MOD4),
    ("Mod5", ModifierIndex::MOD5),
];

pub fn lookup_real_mod_name(name: &str) -> Option<ModifierIndex> {
    REAL_MOD_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, idx)| *idx)
}

/// The running table of virtual modifier names (spec §3 "Modifier index":
/// indices `8..N` are "virtual modifiers named by atoms"). Populated as
/// `virtual_modifiers` statements are merged across sections, consulted by
/// the expression evaluator whenever a bare identifier needs a modifier
/// index and by the end-of-compilation vmod resolution fixpoint (spec
/// §4.5 "Virtual modifier resolution").
#[derive(Debug, Default)]
pub struct ModNameTable {
    virtual_names: Vec<Atom>,
}

impl ModNameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` as a virtual modifier, returning its index. Declaring
    /// the same name twice returns the existing index (spec's merge
    /// semantics treat `virtual_modifiers` as additive across sections).
    pub fn declare(&mut self, name: Atom) -> Option<ModifierIndex> {
        if let Some(existing) = self.lookup(name) {
            return Some(existing);
        }
        let index = ModifierIndex::NUM_REAL as usize + self.virtual_names.len();
        if index >= ModifierIndex::NUM_MODS as usize {
            return None;
        }
        self.virtual_names.push(name);
        Some(ModifierIndex(index as u8))
    }

    pub fn lookup(&self, name: Atom) -> Option<ModifierIndex> {
        self.virtual_names
            .iter()
            .position(|&n| n == name)
            .map(|i| ModifierIndex(ModifierIndex::NUM_REAL + i as u8))
    }

    /// Case-insensitive name resolution spanning both real and virtual
    /// modifiers, the way a bare identifier in a mask expression resolves
    /// (spec §4.2 "real+virtual modifier mask").
    pub fn resolve_name(&self, name: &str, atoms: &AtomTable) -> Option<ModifierIndex> {
        if let Some(real) = lookup_real_mod_name(name) {
            return Some(real);
        }
        self.virtual_names
            .iter()
            .position(|&atom| atoms.lookup(atom).map_or(false, |s| s.eq_ignore_ascii_case(name)))
            .map(|i| ModifierIndex(ModifierIndex::NUM_REAL + i as u8))
    }

    pub fn name_of(&self, index: ModifierIndex) -> Option<Atom> {
        if index.is_real() {
            return None;
        }
        self.virtual_names
            .get((index.0 - ModifierIndex::NUM_REAL) as usize)
            .copied()
    }

    pub fn virtual_count(&self) -> usize {
        self.virtual_names.len()
    }

    pub fn virtual_names(&self) -> &[Atom] {
        &self.virtual_names
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn real_mod_names_resolve() {
        assert_eq!(lookup_real_mod_name("shift"), Some(ModifierIndex::SHIFT));
        assert_eq!(lookup_real_mod_name("CTRL"), Some(ModifierIndex::CONTROL));
        assert_eq!(lookup_real_mod_name("bogus"), None);
    }

    #[test]
    fn mask_roundtrip() {
        let m = ModifierIndex::SHIFT.mask() | ModifierIndex::MOD1.mask();
        assert!(m.has(ModifierIndex::SHIFT));
        assert!(m.has(ModifierIndex::MOD1));
        assert!(!m.has(ModifierIndex::CONTROL));
    }
}
