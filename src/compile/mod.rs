//! Section compilation: the expression evaluator plus one compiler per
//! `xkb_<kind>` section (spec §4.5), driven by [`crate::include`]'s merge
//! resolution and assembled into a final [`crate::keymap::Keymap`].
pub mod compat;
pub mod expr;
pub mod keycodes;
pub mod symbols;
pub mod types;

use crate::atom::AtomTable;
use crate::error::{DiagnosticBag, Error, Result};
use crate::keymap::{Key, KeyName, Keymap, ModifierDef};
use crate::modifier::{ModMask, ModNameTable, ModifierIndex};
use std::collections::HashMap;
use std::convert::TryFrom;

/// Runs every section compiler over its already-merged statement stream and
/// assembles the result into a [`Keymap`] (spec §4.5 "Compilation order":
/// keycodes, then types, then compat, then symbols — virtual modifiers may
/// be declared in any of the first three, so `ModNameTable` threads through
/// all of them before the end-of-compile fixpoint runs).
pub struct SectionStreams<'a> {
    pub keycodes: &'a [(crate::ast::MergeMode, crate::ast::Stmt)],
    pub types: &'a [(crate::ast::MergeMode, crate::ast::Stmt)],
    pub compat: &'a [(crate::ast::MergeMode, crate::ast::Stmt)],
    pub symbols: &'a [(crate::ast::MergeMode, crate::ast::Stmt)],
}

pub fn compile_keymap(streams: SectionStreams, mut atoms: AtomTable) -> Result<Keymap> {
    let mut diags = DiagnosticBag::new();
    let mut mods = ModNameTable::new();

    let keycodes_info = {
        let ctx = expr::EvalContext { atoms: &atoms, mods: &mods };
        keycodes::compile(streams.keycodes, &ctx, &mut diags)
    };

    let mut types_list = types::compile(streams.types, &atoms, &mut mods, &mut diags);
    let compat_info = compat::compile(streams.compat, &atoms, &mut mods, &mut diags);
    let symbols_info =
        symbols::compile(streams.symbols, &mut atoms, &mut mods, &mut types_list, &compat_info, &mut diags);

    let (min_keycode, max_keycode) = keycodes_info.bounds();

    // `Keymap::key`/`Key::key_by_name` index by `keycode - min_keycode` into
    // a dense `Vec`, so gaps in the sparse keycode table are filled with
    // empty placeholder keys rather than dropped (spec §3 "Keymap").
    let mut dense: Vec<Key> = Vec::new();
    for code in min_keycode..=max_keycode {
        let key = match keycodes_info.keys.get(&code) {
            Some(name) => symbols_info.keys.get(name).cloned().unwrap_or_else(|| Key::new(*name)),
            None => Key::new(KeyName::new("")),
        };
        dense.push(key);
    }
    let num_groups = dense.iter().map(|k| k.groups.len() as u32).max().unwrap_or(1).max(1);

    // End-of-compilation virtual modifier resolution fixpoint (spec §4.5):
    // each virtual modifier's real-modifier mask is the union, over every
    // key whose symbols/actions reference it, of that key's own
    // modifier-map contribution.
    let mut vmod_real_masks: HashMap<ModifierIndex, ModMask> = HashMap::new();
    for key in &dense {
        if key.vmod_contribution.is_empty() {
            continue;
        }
        for bit in ModifierIndex::NUM_REAL..ModifierIndex::NUM_MODS {
            let index = ModifierIndex(bit);
            if key.vmod_contribution.has(index) {
                *vmod_real_masks.entry(index).or_insert_with(ModMask::empty) |= key.mod_map;
            }
        }
    }
    let modifiers = (0..mods.virtual_count())
        .filter_map(|i| {
            let index = ModifierIndex(ModifierIndex::NUM_REAL + u8::try_from(i).ok()?);
            let name = mods.name_of(index)?;
            Some(ModifierDef {
                name,
                real_mask: vmod_real_masks.get(&index).copied().unwrap_or_else(ModMask::empty),
            })
        })
        .collect();

    if diags.error_count() > 0 {
        return Err(Error::Compile(diags.into_vec()));
    }

    Ok(Keymap {
        atoms,
        keys: dense,
        min_keycode,
        max_keycode,
        types: types_list,
        modifiers,
        indicators: compat_info.indicators,
        num_groups,
        group_names: symbols_info.group_names,
        aliases: keycodes_info.aliases,
    })
}
