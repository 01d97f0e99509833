//! The final, compiled keymap data model (spec §3 "Keymap", §4.5).
use crate::action::Action;
use crate::ast::{MergeMode, Section, SectionKind};
use crate::atom::{Atom, AtomTable};
use crate::context::Context;
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind, Error, Result};
use crate::keysym::Keysym;
use crate::modifier::{ModMask, ModifierIndex};
use crate::names::{RuleNames, RuleResolver};
use std::convert::TryFrom;
use std::fmt;

/// A fixed 4-octet key identifier, e.g. `AE01`. Compared by value, never
/// interned (spec §3 "Key name").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyName(pub [u8; 4]);

impl KeyName {
    pub fn new(s: &str) -> KeyName {
        let mut bytes = [0u8; 4];
        for (slot, b) in bytes.iter_mut().zip(s.as_bytes().iter().take(4)) {
            *slot = *b;
        }
        KeyName(bytes)
    }

    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }
}

impl From<&str> for KeyName {
    fn from(s: &str) -> Self {
        KeyName::new(s)
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy applied when a group index falls outside `[0, num_groups)`
/// (spec §3 "Key", §4.7 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRangeGroup {
    Wrap,
    Clamp,
    Redirect(u32),
}

impl Default for OutOfRangeGroup {
    fn default() -> Self {
        OutOfRangeGroup::Wrap
    }
}

/// One `map[mask] = Level<n>;` entry in a [`KeyType`] (spec §3 "Key type").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub mods: ModMask,
    pub level: u32,
    pub preserve: ModMask,
}

/// An atom-named modifier-mask-to-level table shared by one or more groups
/// of one or more keys.
#[derive(Debug, Clone)]
pub struct KeyType {
    pub name: Atom,
    pub mods: ModMask,
    pub num_levels: u32,
    pub map: Vec<MapEntry>,
    pub level_names: Vec<Option<Atom>>,
}

impl KeyType {
    /// The default unnamed one-level type synthesized when a `xkb_symbols`
    /// section declares no types of its own (spec §4.5 "A default unnamed
    /// one-level type is synthesized when no types are declared").
    pub fn default_one_level(name: Atom) -> KeyType {
        KeyType {
            name,
            mods: ModMask::empty(),
            num_levels: 1,
            map: Vec::new(),
            level_names: vec![None],
        }
    }

    /// First map entry whose mask exactly equals `masked` (spec §4.7 step
    /// 2), in declaration order — ties keep the earliest declaration.
    pub fn entry_for(&self, masked: ModMask) -> Option<&MapEntry> {
        self.map.iter().find(|e| e.mods == masked)
    }
}

/// One shift level of one group: the keysym(s) shown and the action fired,
/// if any, when that level is selected.
#[derive(Debug, Clone, Default)]
pub struct Level {
    pub syms: Vec<Keysym>,
    pub action: Option<Action>,
}

/// One layout alternative of a [`Key`]: a key type plus a level-indexed
/// sequence of [`Level`]s.
#[derive(Debug, Clone)]
pub struct Group {
    pub type_index: usize,
    pub levels: Vec<Level>,
}

/// A physical key, keyed by keycode (spec §3 "Key").
#[derive(Debug, Clone)]
pub struct Key {
    pub name: KeyName,
    pub groups: Vec<Group>,
    pub repeats: bool,
    pub mod_map: ModMask,
    pub out_of_range: OutOfRangeGroup,
    /// Virtual modifiers this key's symbol interpretations or actions
    /// contribute to (spec §4.5 "Virtual modifier resolution").
    pub vmod_contribution: ModMask,
}

impl Key {
    pub fn new(name: KeyName) -> Key {
        Key {
            name,
            groups: Vec::new(),
            repeats: true,
            mod_map: ModMask::empty(),
            out_of_range: OutOfRangeGroup::default(),
            vmod_contribution: ModMask::empty(),
        }
    }

    pub fn syms(&self, group: usize, level: usize) -> &[Keysym] {
        self.groups
            .get(group)
            .and_then(|g| g.levels.get(level))
            .map(|l| l.syms.as_slice())
            .unwrap_or(&[])
    }
}

/// A single indicator (LED) definition (spec §3 "Keymap").
#[derive(Debug, Clone, Default)]
pub struct Indicator {
    pub name: Atom,
    pub which_mods: WhichStateComponent,
    pub mods: ModMask,
    pub which_groups: WhichStateComponent,
    pub groups: u32,
    pub ctrls: u32,
}

/// Which state component (base/latched/locked/effective) an indicator or
/// lookup call inspects (spec §4.7 step 4, §6 `state_mod_*_is_active`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhichStateComponent {
    pub base: bool,
    pub latched: bool,
    pub locked: bool,
    pub effective: bool,
}

impl WhichStateComponent {
    pub fn effective_only() -> Self {
        WhichStateComponent {
            effective: true,
            ..Default::default()
        }
    }
}

/// Name/atom-interned virtual modifier record: index plus the real-mask it
/// resolves to after the fixpoint in spec §4.5.
#[derive(Debug, Clone)]
pub struct ModifierDef {
    pub name: Atom,
    pub real_mask: ModMask,
}

/// The fully compiled, (spec §5) effectively-immutable keymap.
#[derive(Debug)]
pub struct Keymap {
    pub atoms: AtomTable,
    pub keys: Vec<Key>,
    pub min_keycode: u8,
    pub max_keycode: u8,
    pub types: Vec<KeyType>,
    pub modifiers: Vec<ModifierDef>,
    pub indicators: Vec<Indicator>,
    pub num_groups: u32,
    pub group_names: Vec<Option<Atom>>,
    pub aliases: Vec<(KeyName, KeyName)>,
}

impl Keymap {
    /// Resolve a modifier name to its [`ModifierIndex`], checking the eight
    /// real modifier names first and then this keymap's declared virtual
    /// modifiers (spec §6 `state_mod_name_is_active`/`state_mod_names_are_active`
    /// take names; callers resolve to an index once via this lookup).
    pub fn mod_index_by_name(&self, name: &str) -> Option<ModifierIndex> {
        if let Some(index) = crate::modifier::lookup_real_mod_name(name) {
            return Some(index);
        }
        self.modifiers
            .iter()
            .position(|m| self.atoms.lookup(m.name).map_or(false, |s| s.eq_ignore_ascii_case(name)))
            .and_then(|i| u8::try_from(i).ok())
            .map(|bit| ModifierIndex(ModifierIndex::NUM_REAL + bit))
    }

    /// Resolve a key name through the alias table, then to its keycode.
    pub fn key_by_name(&self, name: KeyName) -> Option<u8> {
        let resolved = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, real)| *real)
            .unwrap_or(name);
        self.keys
            .iter()
            .position(|k| k.name == resolved)
            .and_then(|idx| u8::try_from(idx + self.min_keycode as usize).ok())
    }

    pub fn key(&self, keycode: u8) -> Option<&Key> {
        if keycode < self.min_keycode || keycode > self.max_keycode {
            return None;
        }
        self.keys.get((keycode - self.min_keycode) as usize)
    }

    pub fn key_type(&self, index: usize) -> Option<&KeyType> {
        self.types.get(index)
    }

    /// `xkb_keymap_new_from_string` (spec §6): parse one buffer holding all
    /// four `xkb_<kind>` sections back to back, resolve each section's own
    /// `include` statements against `ctx`'s search path, and compile the
    /// result. No partial keymap is ever returned once any diagnostic has
    /// fired (spec §7 "Local recovery").
    pub fn from_string(ctx: &mut Context, src: &str, file_name: &str) -> Result<Keymap> {
        let (sections, parse_diags) = crate::include::parse_top_level(src, file_name, ctx);
        let mut diags = DiagnosticBag::new();
        diags.extend(parse_diags);
        if diags.error_count() > 0 {
            return Err(Error::Compile(diags.into_vec()));
        }
        compile_sections(&sections, ctx, diags)
    }

    /// `xkb_keymap_new_from_names` (spec §6): resolve `names` through
    /// `resolver` into one component file per section kind, load each from
    /// `ctx`'s search path as though it had been `include`d, and compile
    /// the result as one `xkb_keymap`.
    pub fn from_names(ctx: &mut Context, names: &RuleNames, resolver: &dyn RuleResolver) -> Result<Keymap> {
        let mut diags = DiagnosticBag::new();
        let mut sections: Vec<Section> = Vec::new();
        for component in resolver.resolve(names) {
            let subpath = crate::include::subpath_for(component.kind);
            let Some((_, contents)) = ctx.resolver().resolve(subpath, &component.file) else {
                diags.push(Diagnostic::new(
                    DiagnosticKind::Include,
                    format!("could not find file {:?} in the {} search path", component.file, subpath),
                ));
                continue;
            };
            let (file, parse_diags) = crate::parser::parse(&contents, &component.file, ctx.atoms_mut());
            diags.extend(parse_diags);
            let found = file
                .sections
                .iter()
                .find(|s| {
                    s.kind == component.kind
                        && match &component.map {
                            Some(map) => ctx.atoms().lookup(s.name).map_or(false, |name| name.eq_ignore_ascii_case(map)),
                            None => true,
                        }
                })
                .or_else(|| file.sections.iter().find(|s| s.kind == component.kind))
                .cloned();
            match found {
                Some(section) => sections.push(section),
                None => diags.push(Diagnostic::new(
                    DiagnosticKind::Include,
                    format!("{} has no xkb_{:?} section", component.file, component.kind),
                )),
            }
        }
        if diags.error_count() > 0 {
            return Err(Error::Compile(diags.into_vec()));
        }
        compile_sections(&sections, ctx, diags)
    }
}

/// Shared tail of [`Keymap::from_string`]/[`Keymap::from_names`]: flatten
/// each section kind's statements (resolving its own `include`s) and hand
/// the four streams to [`crate::compile::compile_keymap`].
fn compile_sections(sections: &[Section], ctx: &mut Context, mut diags: DiagnosticBag) -> Result<Keymap> {
    let keycodes = flatten_kind(sections, SectionKind::Keycodes, ctx, &mut diags)?;
    let types = flatten_kind(sections, SectionKind::Types, ctx, &mut diags)?;
    let compat = flatten_kind(sections, SectionKind::Compat, ctx, &mut diags)?;
    let symbols = flatten_kind(sections, SectionKind::Symbols, ctx, &mut diags)?;

    if diags.error_count() > 0 {
        return Err(Error::Compile(diags.into_vec()));
    }

    let streams = crate::compile::SectionStreams {
        keycodes: &keycodes,
        types: &types,
        compat: &compat,
        symbols: &symbols,
    };
    crate::compile::compile_keymap(streams, ctx.atoms().clone())
}

fn flatten_kind(
    sections: &[Section],
    kind: SectionKind,
    ctx: &mut Context,
    diags: &mut DiagnosticBag,
) -> Result<Vec<(MergeMode, crate::ast::Stmt)>> {
    let mut out = Vec::new();
    for section in sections.iter().filter(|s| s.kind == kind) {
        let mut visited = Vec::new();
        let flattened = crate::include::flatten_statements(
            &section.statements,
            section.merge.resolved(),
            kind,
            ctx,
            &mut visited,
            diags,
        )?;
        out.extend(flattened);
    }
    Ok(out)
}
