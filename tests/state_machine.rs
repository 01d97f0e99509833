//! End-to-end coverage of loading a keymap from source text and driving it
//! through [`xkbcore::State`], exercising the concrete evdev-keycode
//! scenarios and the universal state-machine properties.
use std::sync::Arc;
use xkbcore::state::{KeyDirection, MatchKind, ModComponent};
use xkbcore::{Context, Keymap, ModifierIndex, State};

/// LeftCtrl on 37, RightAlt on 100 as a plain `Alt` modifier, CapsLock on
/// 66, and a `Q`/`q` letter key on 24 — enough to drive scenarios 1-4.
const MODS_SRC: &str = r#"
xkb_keycodes "test" {
    minimum = 8;
    maximum = 255;
    <LCTL> = 37;
    <RALT> = 100;
    <CAPS> = 66;
    <AD01> = 24;
};

xkb_types "test" {
    type "ONE_LEVEL" {
        modifiers = none;
        map[None] = Level1;
    };
    type "TWO_LEVEL" {
        modifiers = Shift;
        map[Shift] = Level2;
        level_name[Level1] = "Base";
        level_name[Level2] = "Shift";
    };
};

xkb_compatibility "test" {
    interpret Caps_Lock {
        action = LockMods(modifiers=Lock);
    };
    indicator "Caps Lock" {
        modifiers = Lock;
    };
};

xkb_symbols "test" {
    name[Group1] = "English (US)";

    key <LCTL> {
        type = "ONE_LEVEL",
        symbols[Group1] = [ Control_L ],
        actions[Group1] = [ SetMods(modifiers=Control) ]
    };
    key <RALT> {
        type = "ONE_LEVEL",
        symbols[Group1] = [ Alt_R ],
        actions[Group1] = [ SetMods(modifiers=Mod1) ]
    };
    modifier_map Mod1 { <RALT> };
    key <CAPS> {
        type = "ONE_LEVEL",
        symbols[Group1] = [ Caps_Lock ]
    };
    key <AD01> {
        type = "TWO_LEVEL",
        symbols[Group1] = [ q, Q ]
    };
};
"#;

/// A `RightAlt` that performs a momentary group switch (held down ⇒ group 2,
/// released ⇒ back to group 1), with an `AE01` key whose two groups carry
/// distinguishable symbols — enough to drive scenario 5.
const GROUP_SWITCH_SRC: &str = r#"
xkb_keycodes "test" {
    minimum = 8;
    maximum = 255;
    <RALT> = 100;
    <AE01> = 10;
};

xkb_types "test" {
    type "ONE_LEVEL" {
        modifiers = none;
        map[None] = Level1;
    };
};

xkb_compatibility "test" {
};

xkb_symbols "test" {
    name[Group1] = "English (US)";
    name[Group2] = "German";

    key <RALT> {
        type = "ONE_LEVEL",
        symbols[Group1] = [ Mode_switch ],
        actions[Group1] = [ SetGroup(group=2) ]
    };
    key <AE01> {
        type[Group1] = "ONE_LEVEL",
        symbols[Group1] = [ 1 ],
        type[Group2] = "ONE_LEVEL",
        symbols[Group2] = [ ssharp ]
    };
};
"#;

fn load(src: &str) -> Keymap {
    let mut ctx = Context::default();
    Keymap::from_string(&mut ctx, src, "test.xkb").expect("fixture keymap should compile")
}

fn keycode(km: &Keymap, name: &str) -> u8 {
    km.key_by_name(xkbcore::keymap::KeyName::new(name))
        .unwrap_or_else(|| panic!("no key named {}", name))
}

fn sym(name: &str) -> xkbcore::Keysym {
    xkbcore::keysym::keysym_from_name(name).unwrap_or_else(|| panic!("no keysym named {}", name))
}

#[test]
fn left_ctrl_sets_modifier_and_leaves_base_level_symbol() {
    let km = Arc::new(load(MODS_SRC));
    let ctl = keycode(&km, "LCTL");
    let q = keycode(&km, "AD01");
    let mut st = State::new(km);

    assert!(!st.mod_index_is_active(ModifierIndex::CONTROL, ModComponent::Depressed));
    st.update_key(ctl, KeyDirection::Down);
    assert!(st.mod_index_is_active(ModifierIndex::CONTROL, ModComponent::Depressed));
    assert_eq!(st.key_get_syms(q), vec![sym("q")]);
}

#[test]
fn ctrl_and_alt_combine_and_names_are_active_matches_all_but_not_any_subset() {
    let km = Arc::new(load(MODS_SRC));
    let ctl = keycode(&km, "LCTL");
    let ralt = keycode(&km, "RALT");
    let mut st = State::new(km);

    st.update_key(ctl, KeyDirection::Down);
    st.update_key(ralt, KeyDirection::Down);

    let both = [ModifierIndex::CONTROL, ModifierIndex::MOD1];
    assert!(st.mod_indices_are_active(ModComponent::Effective, MatchKind::All, &both));
    assert!(!st.mod_indices_are_active(ModComponent::Effective, MatchKind::All, &[ModifierIndex::MOD1]));
    assert!(st.mod_indices_are_active(ModComponent::Effective, MatchKind::Any, &[ModifierIndex::MOD1]));
}

#[test]
fn names_are_active_resolves_modifier_names_like_indices_do() {
    let km = Arc::new(load(MODS_SRC));
    let ctl = keycode(&km, "LCTL");
    let ralt = keycode(&km, "RALT");
    let mut st = State::new(km);

    st.update_key(ctl, KeyDirection::Down);
    st.update_key(ralt, KeyDirection::Down);

    assert!(st.mod_name_is_active("Control", ModComponent::Effective));
    assert!(st.mod_name_is_active("Ctrl", ModComponent::Effective));
    assert!(!st.mod_name_is_active("Nonexistent", ModComponent::Effective));
    assert!(st.mod_names_are_active(ModComponent::Effective, MatchKind::All, &["Control", "Mod1"]));
    assert!(!st.mod_names_are_active(ModComponent::Effective, MatchKind::All, &["Mod1"]));
}

#[test]
fn releasing_both_modifiers_restores_empty_effective_mods() {
    let km = Arc::new(load(MODS_SRC));
    let ctl = keycode(&km, "LCTL");
    let ralt = keycode(&km, "RALT");
    let mut st = State::new(km);

    st.update_key(ctl, KeyDirection::Down);
    st.update_key(ralt, KeyDirection::Down);
    st.update_key(ctl, KeyDirection::Up);
    st.update_key(ralt, KeyDirection::Up);

    assert!(st.effective_mods().is_empty());
}

#[test]
fn caps_lock_toggles_lock_led_and_folds_the_q_key_symbol() {
    let km = Arc::new(load(MODS_SRC));
    let caps = keycode(&km, "CAPS");
    let q = keycode(&km, "AD01");
    let mut st = State::new(km);

    st.update_key(caps, KeyDirection::Down);
    st.update_key(caps, KeyDirection::Up);
    assert!(st.mod_index_is_active(ModifierIndex::LOCK, ModComponent::Locked));
    assert_ne!(st.serialize_leds() & 1, 0, "Caps Lock indicator should be lit");
    assert_eq!(st.key_get_syms(q), vec![sym("Q")]);

    st.update_key(caps, KeyDirection::Down);
    st.update_key(caps, KeyDirection::Up);
    assert!(!st.mod_index_is_active(ModifierIndex::LOCK, ModComponent::Locked));
    assert_eq!(st.serialize_leds() & 1, 0);
    assert_eq!(st.key_get_syms(q), vec![sym("q")]);
}

#[test]
fn holding_the_group_switch_key_selects_group_two_and_releasing_reverts() {
    let km = Arc::new(load(GROUP_SWITCH_SRC));
    let ralt = keycode(&km, "RALT");
    let ae01 = keycode(&km, "AE01");
    let mut st = State::new(km);

    assert_eq!(st.key_get_syms(ae01), vec![sym("1")]);

    st.update_key(ralt, KeyDirection::Down);
    assert_eq!(st.effective_group(), 1);
    assert_eq!(st.key_get_syms(ae01), vec![sym("ssharp")]);

    st.update_key(ralt, KeyDirection::Up);
    assert_eq!(st.effective_group(), 0);
    assert_eq!(st.key_get_syms(ae01), vec![sym("1")]);
}

#[test]
fn update_mask_linearly_replaces_state_and_drops_pending_filters() {
    let km = Arc::new(load(MODS_SRC));
    let ctl = keycode(&km, "LCTL");
    let mut st = State::new(km.clone());

    st.update_key(ctl, KeyDirection::Down);
    assert!(!st.effective_mods().is_empty());

    use xkbcore::state::StateComponent;
    st.update_mask(
        xkbcore::ModMask::empty(),
        xkbcore::ModMask::empty(),
        xkbcore::ModMask::empty(),
        0,
        0,
        0,
    );
    assert!(st.effective_mods().is_empty());

    // Releasing the physically-still-down Ctrl key now finds no filter to
    // match, which must be a no-op rather than a panic or a spurious event.
    st.update_key(ctl, KeyDirection::Up);
    assert!(st.effective_mods().is_empty());
    let _ = StateComponent::MODS_EFFECTIVE;
}

#[test]
fn consumed_modifiers_are_removed_from_a_caller_supplied_mask() {
    let km = Arc::new(load(MODS_SRC));
    let q = keycode(&km, "AD01");
    let ctl = keycode(&km, "LCTL");
    let mut st = State::new(km);
    st.update_key(ctl, KeyDirection::Down);

    // `AD01`'s type only consumes `Shift`, so a mask carrying `Control` is
    // untouched while `Shift` would be stripped had it been present.
    let requested = xkbcore::ModMask::CONTROL | xkbcore::ModMask::SHIFT;
    let remaining = st.key_get_mod_mask_remove_consumed(q, requested);
    assert_eq!(remaining, xkbcore::ModMask::CONTROL);
}
