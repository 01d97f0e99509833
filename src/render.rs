//! Text-render helpers (spec §3 item "Text-render helpers"): format
//! modifier masks, action names and key names the way diagnostics want
//! them, plus `keymap_get_as_string` (spec §6), a canonical XKB-text
//! serialization of a compiled [`Keymap`]. This is not key-label
//! rendering for a UI (spec §1 Non-goals exclude that) — it is the
//! textual form a keymap's own data takes back on disk or in a log line.
use std::fmt::Write as _;

use crate::action::Action;
use crate::keymap::{KeyName, KeyType, Keymap};
use crate::keysym::keysym_get_name;
use crate::modifier::{ModMask, ModifierIndex, REAL_MOD_NAMES};

/// `<AE01>`-style key name, the form every `.xkb` file and every
/// diagnostic uses (spec §6 "Keycodes are ASCII 4-byte names").
pub fn format_key_name(name: KeyName) -> String {
    format!("<{}>", name.as_str())
}

/// A `Shift+Control`-style mask rendering (empty mask renders as `none`).
/// Virtual modifier bits are resolved against `keymap.modifiers`'
/// atom-interned names; an index with no declared name (shouldn't happen
/// post-compile, see spec §4.5) falls back to `?<n>`.
pub fn format_mod_mask(mask: ModMask, keymap: &Keymap) -> String {
    if mask.is_empty() {
        return "none".to_owned();
    }
    let mut parts = Vec::new();
    for bit in 0..ModifierIndex::NUM_MODS {
        let index = ModifierIndex(bit);
        if !mask.has(index) {
            continue;
        }
        parts.push(mod_name(index, keymap));
    }
    parts.join("+")
}

fn mod_name(index: ModifierIndex, keymap: &Keymap) -> String {
    if index.is_real() {
        return REAL_MOD_NAMES
            .iter()
            .find(|(_, i)| *i == index)
            .map(|(name, _)| (*name).to_owned())
            .unwrap_or_else(|| format!("?{}", index.0));
    }
    let slot = (index.0 - ModifierIndex::NUM_REAL) as usize;
    keymap
        .modifiers
        .get(slot)
        .and_then(|def| keymap.atoms.lookup(def.name))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("?{}", index.0))
}

/// Render one [`Action`] in its `Name(field=value,...)` statement form
/// (spec §3 "Action"; grounded on the field tables in [`crate::action`]).
/// Intended for diagnostics, not for re-parsing — flag-valued fields are
/// rendered only when set, matching how sparse real layouts write them.
pub fn format_action(action: &Action, keymap: &Keymap) -> String {
    use crate::action::IsoLockFlags;

    let kind = crate::action::action_kind_name(action);
    let args = match action {
        Action::NoAction | Action::Terminate => String::new(),
        Action::SetMods(a) | Action::LatchMods(a) | Action::LockMods(a) => format_mod_action(a, keymap),
        Action::SetGroup(a) | Action::LatchGroup(a) | Action::LockGroup(a) => {
            let group = format_group_value(a.group);
            let flags = format_mod_flags(a.flags);
            if flags.is_empty() {
                format!("group={}", group)
            } else {
                format!("group={},{}", group, flags)
            }
        }
        Action::MovePointer(p) => format!("x={},y={}", p.x, p.y),
        Action::PointerButton(p) | Action::LockPointerButton(p) => format!("button={}", p.button),
        Action::SetDefaultPointerButton(p) => format!("value={}", p.value),
        Action::IsoLock(a) => {
            let mut bits = Vec::new();
            if a.affect.contains(IsoLockFlags::DFLT_IS_GROUP) {
                bits.push(format!("group={}", format_group_value(a.group)));
            } else {
                bits.push(format!("modifiers={}", format_mod_mask(a.mods, keymap)));
            }
            bits.join(",")
        }
        Action::SwitchScreen(s) => format!("screen={}", s.screen),
        Action::SetControls(c) | Action::LockControls(c) => format_controls(c),
        Action::ActionMessage(m) => format!("data=[{}]", m.data.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(",")),
        Action::RedirectKey(r) => {
            let key = r.new_key.map(format_key_name).unwrap_or_else(|| "<>".to_owned());
            format!("key={},modifiers={}", key, format_mod_mask(r.mods, keymap))
        }
        Action::DeviceButton(d) | Action::LockDeviceButton(d) => format!("device={},button={}", d.device, d.button),
        Action::DeviceValuator(d) => format!("device={},valuator={}", d.device, d.valuator),
        Action::Private(p) => format!("type={}", p.kind),
    };
    if args.is_empty() {
        format!("{}()", kind)
    } else {
        format!("{}({})", kind, args)
    }
}

fn format_mod_action(a: &crate::action::ModAction, keymap: &Keymap) -> String {
    let flags = format_mod_flags(a.flags);
    if flags.is_empty() {
        format!("modifiers={}", format_mod_mask(a.mods, keymap))
    } else {
        format!("modifiers={},{}", format_mod_mask(a.mods, keymap), flags)
    }
}

fn format_mod_flags(flags: crate::action::ModActionFlags) -> String {
    use crate::action::ModActionFlags;
    let mut bits = Vec::new();
    if flags.contains(ModActionFlags::CLEAR_LOCKS) {
        bits.push("clearLocks");
    }
    if flags.contains(ModActionFlags::LATCH_TO_LOCK) {
        bits.push("latchToLock");
    }
    if flags.contains(ModActionFlags::USE_MOD_MAP_MODS) {
        bits.push("useModMapMods");
    }
    bits.join(",")
}

fn format_group_value(value: crate::action::GroupValue) -> String {
    use crate::action::GroupValue;
    match value {
        GroupValue::Absolute(v) => format!("{}", v + 1),
        GroupValue::Relative(v) if v >= 0 => format!("+{}", v),
        GroupValue::Relative(v) => format!("{}", v),
    }
}

fn format_controls(c: &crate::action::ControlsAction) -> String {
    format!("controls=0x{:x}", c.ctrls)
}

/// `keymap_get_as_string(km, fmt)` (spec §6). `fmt` is presently always
/// the one textual dialect this crate reads, so the parameter exists for
/// API parity but has no variants yet.
pub fn keymap_get_as_string(km: &Keymap) -> String {
    let mut out = String::new();
    write_keycodes(&mut out, km);
    out.push('\n');
    write_types(&mut out, km);
    out.push('\n');
    write_compat(&mut out, km);
    out.push('\n');
    write_symbols(&mut out, km);
    out
}

fn write_keycodes(out: &mut String, km: &Keymap) {
    writeln!(out, "xkb_keycodes \"(unnamed)\" {{").unwrap();
    writeln!(out, "\tminimum = {};", km.min_keycode).unwrap();
    writeln!(out, "\tmaximum = {};", km.max_keycode).unwrap();
    for (i, key) in km.keys.iter().enumerate() {
        if key.name.as_str().is_empty() {
            continue;
        }
        let code = km.min_keycode as usize + i;
        writeln!(out, "\t{} = {};", format_key_name(key.name), code).unwrap();
    }
    for (alias, real) in &km.aliases {
        writeln!(out, "\talias {} = {};", format_key_name(*alias), format_key_name(*real)).unwrap();
    }
    writeln!(out, "}};").unwrap();
}

fn write_types(out: &mut String, km: &Keymap) {
    writeln!(out, "xkb_types \"(unnamed)\" {{").unwrap();
    if !km.modifiers.is_empty() {
        let names: Vec<&str> = km.modifiers.iter().filter_map(|m| km.atoms.lookup(m.name)).collect();
        writeln!(out, "\tvirtual_modifiers {};", names.join(",")).unwrap();
    }
    for ty in &km.types {
        write_type(out, ty, km);
    }
    writeln!(out, "}};").unwrap();
}

fn write_type(out: &mut String, ty: &KeyType, km: &Keymap) {
    let name = km.atoms.lookup(ty.name).unwrap_or("DEFAULT");
    writeln!(out, "\ttype \"{}\" {{", name).unwrap();
    writeln!(out, "\t\tmodifiers = {};", format_mod_mask(ty.mods, km)).unwrap();
    for entry in &ty.map {
        writeln!(out, "\t\tmap[{}] = Level{};", format_mod_mask(entry.mods, km), entry.level + 1).unwrap();
        if !entry.preserve.is_empty() {
            writeln!(out, "\t\tpreserve[{}] = {};", format_mod_mask(entry.mods, km), format_mod_mask(entry.preserve, km)).unwrap();
        }
    }
    for (level, label) in ty.level_names.iter().enumerate() {
        if let Some(atom) = label {
            if let Some(text) = km.atoms.lookup(*atom) {
                writeln!(out, "\t\tlevel_name[Level{}] = \"{}\";", level + 1, text).unwrap();
            }
        }
    }
    writeln!(out, "\t}};").unwrap();
}

fn write_compat(out: &mut String, km: &Keymap) {
    writeln!(out, "xkb_compatibility \"(unnamed)\" {{").unwrap();
    for led in &km.indicators {
        let name = km.atoms.lookup(led.name).unwrap_or("");
        writeln!(out, "\tindicator \"{}\" {{", name).unwrap();
        if !led.mods.is_empty() {
            writeln!(out, "\t\tmodifiers = {};", format_mod_mask(led.mods, km)).unwrap();
        }
        if led.groups != 0 {
            writeln!(out, "\t\tgroups = {:#x};", led.groups).unwrap();
        }
        if led.ctrls != 0 {
            writeln!(out, "\t\tcontrols = {:#x};", led.ctrls).unwrap();
        }
        writeln!(out, "\t}};").unwrap();
    }
    writeln!(out, "}};").unwrap();
}

fn write_symbols(out: &mut String, km: &Keymap) {
    writeln!(out, "xkb_symbols \"(unnamed)\" {{").unwrap();
    for (i, name) in km.group_names.iter().enumerate() {
        if let Some(atom) = name {
            if let Some(text) = km.atoms.lookup(*atom) {
                writeln!(out, "\tname[Group{}] = \"{}\";", i + 1, text).unwrap();
            }
        }
    }
    for key in &km.keys {
        if key.name.as_str().is_empty() || key.groups.is_empty() {
            continue;
        }
        writeln!(out, "\tkey {} {{", format_key_name(key.name)).unwrap();
        for (g, group) in key.groups.iter().enumerate() {
            let type_name = km.types.get(group.type_index).and_then(|t| km.atoms.lookup(t.name)).unwrap_or("DEFAULT");
            let syms: Vec<String> = group
                .levels
                .iter()
                .map(|level| match level.syms.as_slice() {
                    [] => "NoSymbol".to_owned(),
                    [one] => keysym_get_name(*one),
                    many => many.iter().map(|s| keysym_get_name(*s)).collect::<Vec<_>>().join(", "),
                })
                .collect();
            writeln!(
                out,
                "\t\ttype[Group{}] = \"{}\", symbols[Group{}] = [ {} ]{}",
                g + 1,
                type_name,
                g + 1,
                syms.join(", "),
                if g + 1 == key.groups.len() { "" } else { "," },
            )
            .unwrap();
            let actions: Vec<String> = group
                .levels
                .iter()
                .map(|level| level.action.as_ref().map(|a| format_action(a, km)).unwrap_or_else(|| "NoAction()".to_owned()))
                .collect();
            if actions.iter().any(|a| a != "NoAction()") {
                writeln!(out, "\t\tactions[Group{}] = [ {} ],", g + 1, actions.join(", ")).unwrap();
            }
        }
        writeln!(out, "\t}};").unwrap();
    }
    writeln!(out, "}};").unwrap();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::atom::{Atom, AtomTable};
    use crate::keymap::{Group, Indicator, Level, MapEntry};

    fn tiny_keymap() -> Keymap {
        let mut atoms = AtomTable::new();
        let type_name = atoms.intern("TWO_LEVEL", None);
        let ty = KeyType {
            name: type_name,
            mods: ModMask::SHIFT,
            num_levels: 2,
            map: vec![MapEntry { mods: ModMask::SHIFT, level: 1, preserve: ModMask::empty() }],
            level_names: vec![None, None],
        };
        let q = crate::keysym::keysym_from_name("q").unwrap();
        let shift_q = crate::keysym::keysym_from_name("Q").unwrap();
        let mut key = crate::keymap::Key::new(KeyName::new("AD01"));
        key.groups.push(Group {
            type_index: 0,
            levels: vec![Level { syms: vec![q], action: None }, Level { syms: vec![shift_q], action: None }],
        });
        Keymap {
            atoms,
            keys: vec![key],
            min_keycode: 24,
            max_keycode: 24,
            types: vec![ty],
            modifiers: Vec::new(),
            indicators: vec![Indicator { name: Atom::default(), ..Indicator::default() }],
            num_groups: 1,
            group_names: Vec::new(),
            aliases: Vec::new(),
        }
    }

    #[test]
    fn formats_key_name_with_brackets() {
        assert_eq!(format_key_name(KeyName::new("AD01")), "<AD01>");
    }

    #[test]
    fn formats_empty_mask_as_none() {
        let km = tiny_keymap();
        assert_eq!(format_mod_mask(ModMask::empty(), &km), "none");
    }

    #[test]
    fn formats_combined_real_mods() {
        let km = tiny_keymap();
        let mask = ModMask::SHIFT | ModMask::CONTROL;
        let text = format_mod_mask(mask, &km);
        assert!(text.contains("Shift"));
        assert!(text.contains("Control"));
    }

    #[test]
    fn formats_set_mods_action() {
        let km = tiny_keymap();
        let action = Action::SetMods(crate::action::ModAction {
            mods: ModMask::CONTROL,
            flags: crate::action::ModActionFlags::CLEAR_LOCKS,
        });
        let text = format_action(&action, &km);
        assert_eq!(text, "SetMods(modifiers=Control,clearLocks)");
    }

    #[test]
    fn keymap_get_as_string_contains_all_sections() {
        let km = tiny_keymap();
        let text = keymap_get_as_string(&km);
        assert!(text.contains("xkb_keycodes"));
        assert!(text.contains("xkb_types"));
        assert!(text.contains("xkb_compatibility"));
        assert!(text.contains("xkb_symbols"));
        assert!(text.contains("<AD01>"));
        assert!(text.contains("symbols[Group1]"));
    }
}
