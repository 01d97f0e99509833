//! The keyboard state machine (spec §4.7): translates key events into
//! depressed/latched/locked modifier and group state, derives the
//! effective snapshot and LED state, computes consumed modifiers, and
//! looks up a key's keysyms under the current state.
use std::sync::Arc;

use crate::action::{
    Action, GroupAction, GroupValue, IsoLockAction, IsoLockFlags, LockWhich, MessageAction,
    ModAction, ModActionFlags, PointerButtonAction, RedirectKeyAction, SwitchScreenAction,
};
use crate::keymap::{Key, KeyType, Keymap, OutOfRangeGroup, WhichStateComponent};
use crate::keysym::Keysym;
use crate::modifier::{ModMask, ModifierIndex};

/// Key press/release direction (spec §6 `state_update_key`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Up,
    Down,
}

bitflags::bitflags! {
    /// Which parts of the state changed as a result of one event (spec §6
    /// `state_update_key`/`state_update_mask` return value).
    #[derive(Default)]
    pub struct StateComponent: u32 {
        const MODS_DEPRESSED  = 1 << 0;
        const MODS_LATCHED    = 1 << 1;
        const MODS_LOCKED     = 1 << 2;
        const MODS_EFFECTIVE  = 1 << 3;
        const GROUP_DEPRESSED = 1 << 4;
        const GROUP_LATCHED   = 1 << 5;
        const GROUP_LOCKED    = 1 << 6;
        const GROUP_EFFECTIVE = 1 << 7;
        const LEDS            = 1 << 8;
    }
}

/// Which single component a `state_mod_{index,name}_is_active` query
/// inspects (spec §6: `kind ∈ {depressed,latched,locked,effective}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModComponent {
    Depressed,
    Latched,
    Locked,
    Effective,
}

/// How `state_mod_names_are_active`'s name list is matched against the
/// requested component (spec §6: `match ∈ {any,all,non-exclusive}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// At least one of the named modifiers is active.
    Any,
    /// Every named modifier is active, and no other modifier is.
    All,
    /// Every named modifier is active; other modifiers may also be active.
    NonExclusive,
}

/// An action whose effect is "surfaced as an event the host can observe
/// but does not by itself mutate modifier state" (spec §4.7: SwitchScreen,
/// ActionMessage, RedirectKey).
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    SwitchScreen(SwitchScreenAction),
    ActionMessage(MessageAction),
    RedirectKey { from: u8, to: u8 },
}

/// `GroupValue` applied to a running total: absolute replaces it, relative
/// adds the signed delta (SPEC_FULL §B.5 "Group-field sign handling").
fn apply_group_value(current: i32, value: GroupValue) -> i32 {
    match value {
        GroupValue::Absolute(v) => v,
        GroupValue::Relative(delta) => current + delta,
    }
}

/// Normalize a raw (possibly out-of-range) group number into `[0,
/// num_groups)` per one key's out-of-range policy (spec §4.7 step 3).
fn normalize_group(raw: i32, num_groups: u32, policy: OutOfRangeGroup) -> u32 {
    let n = num_groups.max(1) as i32;
    if raw >= 0 && raw < n {
        return raw as u32;
    }
    match policy {
        OutOfRangeGroup::Wrap => raw.rem_euclid(n) as u32,
        OutOfRangeGroup::Clamp => raw.clamp(0, n - 1) as u32,
        OutOfRangeGroup::Redirect(g) => g.min(num_groups.saturating_sub(1)),
    }
}

/// One in-flight action filter (spec §4.7 "Each key event runs an action
/// filter chain"): installed by a press, consulted on every subsequent
/// event bound to the same keycode, removed on that key's release.
#[derive(Debug, Clone)]
struct Filter {
    keycode: u8,
    kind: FilterKind,
}

#[derive(Debug, Clone)]
enum FilterKind {
    Mods { mods: ModMask, latch: bool, latch_to_lock: bool },
    Group { action: GroupAction, prev_depressed: i32, latch: bool },
    PtrBtn(PointerButtonAction),
}

/// The chosen map entry for one (key, group) lookup, plus the real
/// modifiers that entry actually consumed (spec §4.7 step 2, "Consumed
/// modifier").
struct LevelChoice {
    level: usize,
    consumed: ModMask,
}

fn choose_level(ty: &KeyType, effective_mods: ModMask) -> LevelChoice {
    let masked = effective_mods & ty.mods;
    match ty.entry_for(masked) {
        Some(entry) => LevelChoice {
            level: entry.level as usize,
            consumed: ty.mods & !entry.preserve,
        },
        None => LevelChoice { level: 0, consumed: ModMask::empty() },
    }
}

/// A keyboard state bound to one [`Keymap`] (spec §3 "Keyboard state", §5
/// "State references its keymap"). `Arc` rather than a bare reference
/// because distinct states sharing one keymap may be driven concurrently
/// on different threads (spec §5) provided the keymap itself is no longer
/// mutated.
#[derive(Debug)]
pub struct State {
    keymap: Arc<Keymap>,
    mods_depressed: ModMask,
    mods_latched: ModMask,
    mods_locked: ModMask,
    group_depressed: i32,
    group_latched: i32,
    group_locked: i32,
    /// Physical presses currently contributing each modifier bit, so that
    /// two keys mapped to the same modifier can be held independently
    /// (spec §3 "Keyboard state": "counter of physical presses per
    /// modifier to support multiple fingers").
    mod_key_count: [u8; 32],
    filters: Vec<Filter>,
    ptr_buttons_depressed: u32,
    ptr_buttons_locked: u32,
    controls: u32,
    events: Vec<ObservedEvent>,
}

impl State {
    /// `state_new(km)` (spec §6).
    pub fn new(keymap: Arc<Keymap>) -> State {
        State {
            keymap,
            mods_depressed: ModMask::empty(),
            mods_latched: ModMask::empty(),
            mods_locked: ModMask::empty(),
            group_depressed: 0,
            group_latched: 0,
            group_locked: 0,
            mod_key_count: [0; 32],
            filters: Vec::new(),
            ptr_buttons_depressed: 0,
            ptr_buttons_locked: 0,
            controls: 0,
            events: Vec::new(),
        }
    }

    pub fn keymap(&self) -> &Arc<Keymap> {
        &self.keymap
    }

    /// Drain the queue of host-observable events produced by `SwitchScreen`,
    /// `ActionMessage` and `RedirectKey` actions since the last call (spec
    /// §4.7: "surfaced as events the host can observe").
    pub fn take_events(&mut self) -> Vec<ObservedEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn effective_mods(&self) -> ModMask {
        self.mods_depressed | self.mods_latched | self.mods_locked
    }

    fn raw_group(&self, which: ModComponent) -> i32 {
        match which {
            ModComponent::Depressed => self.group_depressed,
            ModComponent::Latched => self.group_latched,
            ModComponent::Locked => self.group_locked,
            ModComponent::Effective => self.group_depressed + self.group_latched + self.group_locked,
        }
    }

    /// The effective group, normalized with a simple wrap-around policy
    /// (spec §4.7 step 3). Per-key lookups instead use that key's own
    /// [`OutOfRangeGroup`] policy via [`Self::key_group`].
    pub fn effective_group(&self) -> u32 {
        normalize_group(self.raw_group(ModComponent::Effective), self.keymap.num_groups, OutOfRangeGroup::Wrap)
    }

    fn key_group(&self, key: &Key) -> u32 {
        let n = key.groups.len().max(1) as u32;
        normalize_group(self.raw_group(ModComponent::Effective), n, key.out_of_range)
    }

    /// `state_mod_index_is_active` / `state_mod_name_is_active` (spec §6).
    pub fn mod_index_is_active(&self, index: ModifierIndex, which: ModComponent) -> bool {
        let mods = match which {
            ModComponent::Depressed => self.mods_depressed,
            ModComponent::Latched => self.mods_latched,
            ModComponent::Locked => self.mods_locked,
            ModComponent::Effective => self.effective_mods(),
        };
        mods.has(index)
    }

    /// `state_mod_name_is_active` (spec §6): resolves `name` against this
    /// state's keymap before delegating to [`Self::mod_index_is_active`].
    /// An unknown modifier name is never active.
    pub fn mod_name_is_active(&self, name: &str, which: ModComponent) -> bool {
        match self.keymap.mod_index_by_name(name) {
            Some(index) => self.mod_index_is_active(index, which),
            None => false,
        }
    }

    /// `state_mod_names_are_active` (spec §6), taking modifier names rather
    /// than pre-resolved indices. Any name this keymap does not declare
    /// drops out of the match set, matching the original's "no such
    /// modifier" being simply absent rather than a hard error.
    pub fn mod_names_are_active(&self, which: ModComponent, match_kind: MatchKind, names: &[&str]) -> bool {
        let indices: Vec<ModifierIndex> = names.iter().filter_map(|n| self.keymap.mod_index_by_name(n)).collect();
        self.mod_indices_are_active(which, match_kind, &indices)
    }

    /// `state_mod_names_are_active` (spec §6).
    pub fn mod_indices_are_active(&self, which: ModComponent, match_kind: MatchKind, names: &[ModifierIndex]) -> bool {
        let active = match which {
            ModComponent::Depressed => self.mods_depressed,
            ModComponent::Latched => self.mods_latched,
            ModComponent::Locked => self.mods_locked,
            ModComponent::Effective => self.effective_mods(),
        };
        let wanted = names.iter().fold(ModMask::empty(), |acc, idx| acc | idx.mask());
        match match_kind {
            MatchKind::Any => names.iter().any(|idx| active.has(*idx)),
            MatchKind::All => active == wanted,
            MatchKind::NonExclusive => active.contains(wanted),
        }
    }

    /// `state_serialize_mods` (spec §6).
    pub fn serialize_mods(&self, which: ModComponent) -> ModMask {
        match which {
            ModComponent::Depressed => self.mods_depressed,
            ModComponent::Latched => self.mods_latched,
            ModComponent::Locked => self.mods_locked,
            ModComponent::Effective => self.effective_mods(),
        }
    }

    /// `state_serialize_group` (spec §6).
    pub fn serialize_group(&self, which: ModComponent) -> i32 {
        match which {
            ModComponent::Effective => self.effective_group() as i32,
            other => self.raw_group(other),
        }
    }

    pub fn ptr_buttons_depressed(&self) -> u32 {
        self.ptr_buttons_depressed
    }

    pub fn ptr_buttons_locked(&self) -> u32 {
        self.ptr_buttons_locked
    }

    pub fn controls(&self) -> u32 {
        self.controls
    }

    /// `state_serialize_leds` (spec §6): a bit per indicator index that is
    /// currently lit (spec §4.7 step 4).
    pub fn serialize_leds(&self) -> u32 {
        let effective_mods = self.effective_mods();
        let effective_group = self.effective_group();
        let mut bits = 0u32;
        for (i, led) in self.keymap.indicators.iter().enumerate() {
            if i >= 32 {
                break;
            }
            if self.led_is_active(led, effective_mods, effective_group) {
                bits |= 1 << i;
            }
        }
        bits
    }

    fn led_is_active(
        &self,
        led: &crate::keymap::Indicator,
        effective_mods: ModMask,
        effective_group: u32,
    ) -> bool {
        let mods_ok = if led.mods.is_empty() {
            true
        } else {
            let active = self.which_mods(led.which_mods, effective_mods);
            active.contains(led.mods)
        };
        let groups_ok = if led.groups == 0 {
            true
        } else {
            let active = self.which_groups(led.which_groups, effective_group);
            (active & led.groups) != 0
        };
        let ctrls_ok = if led.ctrls == 0 {
            true
        } else {
            (self.controls & led.ctrls) == led.ctrls
        };
        mods_ok && groups_ok && ctrls_ok
    }

    fn which_mods(&self, which: WhichStateComponent, effective: ModMask) -> ModMask {
        let mut active = ModMask::empty();
        if which.base {
            active |= self.mods_depressed;
        }
        if which.latched {
            active |= self.mods_latched;
        }
        if which.locked {
            active |= self.mods_locked;
        }
        if which.effective || (!which.base && !which.latched && !which.locked) {
            active |= effective;
        }
        active
    }

    fn which_groups(&self, which: WhichStateComponent, effective_group: u32) -> u32 {
        let mut active = 0u32;
        if which.base {
            active |= 1 << normalize_group(self.group_depressed, self.keymap.num_groups, OutOfRangeGroup::Wrap);
        }
        if which.latched {
            active |= 1 << normalize_group(self.group_latched, self.keymap.num_groups, OutOfRangeGroup::Wrap);
        }
        if which.locked {
            active |= 1 << normalize_group(self.group_locked, self.keymap.num_groups, OutOfRangeGroup::Wrap);
        }
        if which.effective || (!which.base && !which.latched && !which.locked) {
            active |= 1 << effective_group;
        }
        active
    }

    /// The stored symbol array at a key's currently-chosen (group, level),
    /// with no Caps Lock case-folding applied. Spec §6 names
    /// `state_key_get_syms` as the public entry point and maps it to §4.7's
    /// `get_syms`, which *does* fold (scenario 4 in spec §8 expects `Q`, not
    /// `q`, while Caps is locked) — use [`Self::key_get_syms`] for that.
    /// This unfolded accessor stays available for callers that want the raw
    /// stored symbols (e.g. a host rendering an unshifted key cap legend).
    pub fn key_get_syms_raw(&self, keycode: u8) -> &[Keysym] {
        let Some(key) = self.keymap.key(keycode) else { return &[] };
        let group = self.key_group(key) as usize;
        let Some(g) = key.groups.get(group) else { return &[] };
        let ty = &self.keymap.types[g.type_index];
        let choice = choose_level(ty, self.effective_mods());
        let Some(level) = g.levels.get(choice.level) else { return &[] };
        &level.syms
    }

    /// `state_key_get_syms` (spec §6, §4.7 "Symbol lookup"). Applies Caps
    /// Lock case-folding when `Lock` is effective and the key's type does
    /// not itself consume `Lock` (spec §4.7: "when `Lock` is effective *and*
    /// was not already consumed by the type match, apply uppercase ...
    /// (single-symbol level only)"); the return type is owned rather than a
    /// borrowed slice because folding may need to produce a symbol that
    /// isn't stored anywhere in the keymap.
    pub fn key_get_syms(&self, keycode: u8) -> Vec<Keysym> {
        let Some(key) = self.keymap.key(keycode) else { return Vec::new() };
        let group = self.key_group(key) as usize;
        let Some(g) = key.groups.get(group) else { return Vec::new() };
        let ty = &self.keymap.types[g.type_index];
        let choice = choose_level(ty, self.effective_mods());
        let Some(level) = g.levels.get(choice.level) else { return Vec::new() };
        let fold = self.effective_mods().has(ModifierIndex::LOCK) && !ty.mods.has(ModifierIndex::LOCK);
        if fold && level.syms.len() == 1 {
            vec![level.syms[0].to_upper()]
        } else {
            level.syms.clone()
        }
    }

    /// `key_get_mod_mask_remove_consumed` (spec §6, §4.7 "Consumed
    /// modifiers").
    pub fn key_get_mod_mask_remove_consumed(&self, keycode: u8, mask: ModMask) -> ModMask {
        self.consumed_mods(keycode).map(|consumed| {
            let mut m = mask;
            m.remove(consumed);
            m
        }).unwrap_or(mask)
    }

    fn consumed_mods(&self, keycode: u8) -> Option<ModMask> {
        let key = self.keymap.key(keycode)?;
        let group = self.key_group(key) as usize;
        let g = key.groups.get(group)?;
        let ty = &self.keymap.types[g.type_index];
        Some(choose_level(ty, self.effective_mods()).consumed)
    }

    /// The action at the level a key would currently select, used to
    /// decide a fresh press's filter before that press mutates state.
    fn pending_action(&self, key: &Key) -> Option<Action> {
        let group = self.key_group(key) as usize;
        let g = key.groups.get(group)?;
        let ty = &self.keymap.types[g.type_index];
        let choice = choose_level(ty, self.effective_mods());
        g.levels.get(choice.level)?.action.clone()
    }

    fn incr_mods(&mut self, mods: ModMask) {
        for bit in 0..ModifierIndex::NUM_MODS {
            let idx = ModifierIndex(bit);
            if mods.has(idx) {
                self.mod_key_count[bit as usize] = self.mod_key_count[bit as usize].saturating_add(1);
                self.mods_depressed |= idx.mask();
            }
        }
    }

    fn decr_mods(&mut self, mods: ModMask) {
        for bit in 0..ModifierIndex::NUM_MODS {
            let idx = ModifierIndex(bit);
            if mods.has(idx) {
                let count = &mut self.mod_key_count[bit as usize];
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.mods_depressed.remove(idx.mask());
                }
            }
        }
    }

    /// Resolve a `ModAction`'s effective mask: [`ModActionFlags::USE_MOD_MAP_MODS`]
    /// (SPEC_FULL §B.3) substitutes the originating key's own modifier-map
    /// bits for a fixed mask.
    fn mod_action_mask(a: &ModAction, key: &Key) -> ModMask {
        if a.flags.contains(ModActionFlags::USE_MOD_MAP_MODS) {
            key.mod_map
        } else {
            a.mods
        }
    }

    /// Clears any pending latch consumed by this new key press, converting
    /// it to a lock first if this press is itself a matching latch-to-lock
    /// action (spec §8 "Latch→Lock").
    fn consume_pending_latch(&mut self, action: &Option<Action>, key: &Key) {
        if !self.mods_latched.is_empty() {
            let consumed_to_lock = match action {
                Some(Action::LatchMods(a)) => {
                    let mask = Self::mod_action_mask(a, key);
                    let hit = mask & self.mods_latched;
                    if !hit.is_empty() && a.flags.contains(ModActionFlags::LATCH_TO_LOCK) {
                        Some(hit)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some(hit) = consumed_to_lock {
                self.mods_locked |= hit;
            }
            self.mods_latched = ModMask::empty();
        }
        if self.group_latched != 0 {
            let consumed_to_lock = match action {
                Some(Action::LatchGroup(a)) if a.flags.contains(ModActionFlags::LATCH_TO_LOCK) => true,
                _ => false,
            };
            if consumed_to_lock {
                self.group_locked = apply_group_value(self.group_locked, GroupValue::Relative(self.group_latched));
            }
            self.group_latched = 0;
        }
    }

    /// `state_update_key` (spec §6). Runs the action filter chain (spec
    /// §4.7) and returns which components changed.
    pub fn update_key(&mut self, keycode: u8, direction: KeyDirection) -> StateComponent {
        let before = self.snapshot();
        self.apply_key(keycode, direction);
        self.changes_since(before)
    }

    fn apply_key(&mut self, keycode: u8, direction: KeyDirection) {
        match direction {
            KeyDirection::Down => self.apply_press(keycode),
            KeyDirection::Up => self.apply_release(keycode),
        }
    }

    fn apply_press(&mut self, keycode: u8) {
        let Some(key) = self.keymap.key(keycode).cloned() else { return };
        let action = self.pending_action(&key);
        self.consume_pending_latch(&action, &key);
        let Some(action) = action else { return };
        match action {
            Action::NoAction | Action::Terminate => {}
            Action::SetMods(a) => {
                let mask = Self::mod_action_mask(&a, &key);
                if a.flags.contains(ModActionFlags::CLEAR_LOCKS) {
                    self.mods_locked.remove(mask);
                }
                self.incr_mods(mask);
                self.filters.push(Filter { keycode, kind: FilterKind::Mods { mods: mask, latch: false, latch_to_lock: false } });
            }
            Action::LatchMods(a) => {
                let mask = Self::mod_action_mask(&a, &key);
                if a.flags.contains(ModActionFlags::CLEAR_LOCKS) {
                    self.mods_locked.remove(mask);
                }
                self.incr_mods(mask);
                self.filters.push(Filter {
                    keycode,
                    kind: FilterKind::Mods {
                        mods: mask,
                        latch: true,
                        latch_to_lock: a.flags.contains(ModActionFlags::LATCH_TO_LOCK),
                    },
                });
            }
            Action::LockMods(a) => {
                let mask = Self::mod_action_mask(&a, &key);
                self.mods_locked ^= mask;
            }
            Action::SetGroup(a) => {
                let prev = self.group_depressed;
                self.group_depressed = apply_group_value(prev, a.group);
                if a.flags.contains(ModActionFlags::CLEAR_LOCKS) {
                    self.group_locked = 0;
                }
                self.filters.push(Filter { keycode, kind: FilterKind::Group { action: a, prev_depressed: prev, latch: false } });
            }
            Action::LatchGroup(a) => {
                let prev = self.group_depressed;
                self.group_depressed = apply_group_value(prev, a.group);
                if a.flags.contains(ModActionFlags::CLEAR_LOCKS) {
                    self.group_locked = 0;
                }
                self.filters.push(Filter { keycode, kind: FilterKind::Group { action: a, prev_depressed: prev, latch: true } });
            }
            Action::LockGroup(a) => {
                self.group_locked = apply_group_value(self.group_locked, a.group);
            }
            Action::MovePointer(_) => {}
            Action::PointerButton(a) => {
                self.ptr_buttons_depressed |= 1 << a.button.saturating_sub(1).min(31);
                self.filters.push(Filter { keycode, kind: FilterKind::PtrBtn(a) });
            }
            Action::LockPointerButton(a) => self.toggle_locked_button(&a),
            Action::SetDefaultPointerButton(_) => {}
            Action::IsoLock(a) => self.apply_iso_lock(&a),
            Action::SwitchScreen(a) => self.events.push(ObservedEvent::SwitchScreen(a)),
            Action::SetControls(a) => self.controls |= a.ctrls,
            Action::LockControls(a) => self.controls ^= a.ctrls,
            Action::ActionMessage(a) => {
                if a.flags.contains(crate::action::MessageFlags::ON_PRESS) {
                    self.events.push(ObservedEvent::ActionMessage(a));
                }
            }
            Action::RedirectKey(a) => self.redirect(keycode, &a, KeyDirection::Down),
            Action::DeviceButton(_)
            | Action::LockDeviceButton(_)
            | Action::DeviceValuator(_)
            | Action::Private(_) => {}
        }
    }

    fn apply_release(&mut self, keycode: u8) {
        // Not every action installs a filter (LockMods/LockGroup/IsoLock
        // fire once on press), so a miss here is routine, not an error —
        // `apply_release_action` below still has to run either way to
        // catch a release-only `ActionMessage`.
        if let Some(pos) = self.filters.iter().rposition(|f| f.keycode == keycode) {
            let filter = self.filters.remove(pos);
            match filter.kind {
                FilterKind::Mods { mods, latch, latch_to_lock: _ } => {
                    self.decr_mods(mods);
                    if latch {
                        self.mods_latched |= mods;
                    }
                }
                FilterKind::Group { action, prev_depressed, latch } => {
                    self.group_depressed = prev_depressed;
                    if latch {
                        self.group_latched = apply_group_value(self.group_latched, action.group);
                    }
                }
                FilterKind::PtrBtn(a) => {
                    self.ptr_buttons_depressed &= !(1 << a.button.saturating_sub(1).min(31));
                }
            }
        }
        self.apply_release_action(keycode);
    }

    fn apply_release_action(&mut self, keycode: u8) {
        let Some(key) = self.keymap.key(keycode).cloned() else { return };
        if let Some(Action::ActionMessage(a)) = self.pending_action(&key) {
            if a.flags.contains(crate::action::MessageFlags::ON_RELEASE) {
                self.events.push(ObservedEvent::ActionMessage(a));
            }
        }
    }

    fn toggle_locked_button(&mut self, a: &PointerButtonAction) {
        let bit = 1u32 << a.button.saturating_sub(1).min(31);
        let locked = self.ptr_buttons_locked & bit != 0;
        if locked {
            if !a.lock.contains(LockWhich::NO_UNLOCK) {
                self.ptr_buttons_locked &= !bit;
            }
        } else if !a.lock.contains(LockWhich::NO_LOCK) {
            self.ptr_buttons_locked |= bit;
        }
    }

    /// `HandleISOLock` (spec §9/SPEC_FULL §B.6): locks the group when
    /// `dflt_is_group` was set by a `group=` field, otherwise locks `mods`;
    /// either is skipped when the corresponding `NO_AFFECT_*` bit is set.
    fn apply_iso_lock(&mut self, a: &IsoLockAction) {
        if a.affect.contains(IsoLockFlags::DFLT_IS_GROUP) {
            if !a.affect.contains(IsoLockFlags::NO_AFFECT_GROUP) {
                self.group_locked = apply_group_value(self.group_locked, a.group);
            }
        } else if !a.affect.contains(IsoLockFlags::NO_AFFECT_MODS) {
            self.mods_locked ^= a.mods;
        }
    }

    /// `RedirectKey` (SPEC_FULL §B): re-dispatch the event to `new_key`,
    /// temporarily overriding the depressed modifiers within `mods_mask`.
    fn redirect(&mut self, from: u8, a: &RedirectKeyAction, direction: KeyDirection) {
        let Some(name) = a.new_key else { return };
        let Some(to) = self.keymap.key_by_name(name) else { return };
        if to == from {
            return;
        }
        let saved = self.mods_depressed;
        self.mods_depressed = (saved & !a.mods_mask) | (a.mods & a.mods_mask);
        self.apply_key(to, direction);
        self.mods_depressed = saved;
        self.events.push(ObservedEvent::RedirectKey { from, to });
    }

    /// `state_update_mask` (spec §6). Bulk-replaces every component and
    /// clears any in-flight filters (spec §5: "Bulk `update_mask` preempts
    /// any in-flight filters").
    pub fn update_mask(
        &mut self,
        base_mods: ModMask,
        latched_mods: ModMask,
        locked_mods: ModMask,
        base_group: i32,
        latched_group: i32,
        locked_group: i32,
    ) -> StateComponent {
        let before = self.snapshot();
        self.filters.clear();
        self.mod_key_count = [0; 32];
        self.mods_depressed = base_mods;
        self.mods_latched = latched_mods;
        self.mods_locked = locked_mods;
        self.group_depressed = base_group;
        self.group_latched = latched_group;
        self.group_locked = locked_group;
        self.changes_since(before)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mods_depressed: self.mods_depressed,
            mods_latched: self.mods_latched,
            mods_locked: self.mods_locked,
            group_depressed: self.group_depressed,
            group_latched: self.group_latched,
            group_locked: self.group_locked,
            leds: self.serialize_leds(),
        }
    }

    fn changes_since(&self, before: Snapshot) -> StateComponent {
        let mut changed = StateComponent::empty();
        if before.mods_depressed != self.mods_depressed {
            changed |= StateComponent::MODS_DEPRESSED;
        }
        if before.mods_latched != self.mods_latched {
            changed |= StateComponent::MODS_LATCHED;
        }
        if before.mods_locked != self.mods_locked {
            changed |= StateComponent::MODS_LOCKED;
        }
        if before.effective_mods() != self.effective_mods() {
            changed |= StateComponent::MODS_EFFECTIVE;
        }
        if before.group_depressed != self.group_depressed {
            changed |= StateComponent::GROUP_DEPRESSED;
        }
        if before.group_latched != self.group_latched {
            changed |= StateComponent::GROUP_LATCHED;
        }
        if before.group_locked != self.group_locked {
            changed |= StateComponent::GROUP_LOCKED;
        }
        if before.effective_group() != self.effective_group_raw() {
            changed |= StateComponent::GROUP_EFFECTIVE;
        }
        let leds = self.serialize_leds();
        if before.leds != leds {
            changed |= StateComponent::LEDS;
        }
        changed
    }

    fn effective_group_raw(&self) -> i32 {
        self.group_depressed + self.group_latched + self.group_locked
    }
}

struct Snapshot {
    mods_depressed: ModMask,
    mods_latched: ModMask,
    mods_locked: ModMask,
    group_depressed: i32,
    group_latched: i32,
    group_locked: i32,
    leds: u32,
}

impl Snapshot {
    fn effective_mods(&self) -> ModMask {
        self.mods_depressed | self.mods_latched | self.mods_locked
    }

    fn effective_group(&self) -> i32 {
        self.group_depressed + self.group_latched + self.group_locked
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::atom::AtomTable;
    use crate::context::Context;
    use crate::keymap::{Group, KeyName, KeyType, Level, MapEntry};

    fn fixture_keymap() -> Arc<Keymap> {
        let mut atoms = AtomTable::new();
        let shift_name = atoms.intern("TWO_LEVEL", None);
        let ty = KeyType {
            name: shift_name,
            mods: ModMask::SHIFT,
            num_levels: 2,
            map: vec![MapEntry { mods: ModMask::SHIFT, level: 1, preserve: ModMask::empty() }],
            level_names: vec![None, None],
        };
        let q_lower = crate::keysym::keysym_from_name("q").unwrap();
        let q_upper = crate::keysym::keysym_from_name("Q").unwrap();
        let mut q_key = Key::new(KeyName::new("AD01"));
        q_key.groups.push(Group {
            type_index: 0,
            levels: vec![Level { syms: vec![q_lower], action: None }, Level { syms: vec![q_upper], action: None }],
        });

        let mut ctrl_key = Key::new(KeyName::new("LCTL"));
        ctrl_key.groups.push(Group {
            type_index: 0,
            levels: vec![
                Level { syms: vec![], action: Some(Action::SetMods(ModAction { mods: ModMask::CONTROL, flags: ModActionFlags::empty() })) },
                Level::default(),
            ],
        });

        let mut caps_key = Key::new(KeyName::new("CAPS"));
        caps_key.groups.push(Group {
            type_index: 0,
            levels: vec![
                Level { syms: vec![], action: Some(Action::LockMods(ModAction { mods: ModMask::LOCK, flags: ModActionFlags::empty() })) },
                Level::default(),
            ],
        });

        Arc::new(Keymap {
            atoms,
            keys: vec![ctrl_key, caps_key, q_key],
            min_keycode: 1,
            max_keycode: 3,
            types: vec![ty],
            modifiers: Vec::new(),
            indicators: Vec::new(),
            num_groups: 1,
            group_names: Vec::new(),
            aliases: Vec::new(),
        })
    }

    #[test]
    fn plain_key_resolves_level_zero() {
        let km = fixture_keymap();
        let st = State::new(km);
        let syms = st.key_get_syms(3);
        assert_eq!(syms, vec![crate::keysym::keysym_from_name("q").unwrap()]);
    }

    #[test]
    fn set_mods_press_and_release_are_symmetric() {
        let km = fixture_keymap();
        let mut st = State::new(km);
        let before = st.effective_mods();
        st.update_key(1, KeyDirection::Down);
        assert!(st.mod_index_is_active(ModifierIndex::CONTROL, ModComponent::Depressed));
        let syms = st.key_get_syms(3);
        assert_eq!(syms, vec![crate::keysym::keysym_from_name("q").unwrap()]);
        st.update_key(1, KeyDirection::Up);
        assert_eq!(st.effective_mods(), before);
    }

    #[test]
    fn caps_lock_toggles_and_folds_symbol() {
        let km = fixture_keymap();
        let mut st = State::new(km);
        st.update_key(2, KeyDirection::Down);
        st.update_key(2, KeyDirection::Up);
        assert!(st.mod_index_is_active(ModifierIndex::LOCK, ModComponent::Locked));
        let folded = st.key_get_syms(3);
        assert_eq!(folded, vec![crate::keysym::keysym_from_name("Q").unwrap()]);
        st.update_key(2, KeyDirection::Down);
        st.update_key(2, KeyDirection::Up);
        assert!(!st.mod_index_is_active(ModifierIndex::LOCK, ModComponent::Locked));
    }

    #[test]
    fn update_mask_clears_filters() {
        let km = fixture_keymap();
        let mut st = State::new(km);
        st.update_key(1, KeyDirection::Down);
        assert!(!st.filters.is_empty());
        st.update_mask(ModMask::empty(), ModMask::empty(), ModMask::empty(), 0, 0, 0);
        assert!(st.filters.is_empty());
        assert!(!st.mod_index_is_active(ModifierIndex::CONTROL, ModComponent::Depressed));
    }

    #[test]
    fn consumed_mods_match_shift_level_choice() {
        let km = fixture_keymap();
        let mut st = State::new(km);
        st.mods_depressed = ModMask::SHIFT;
        let consumed = st.consumed_mods(3).unwrap();
        assert_eq!(consumed, ModMask::SHIFT);
        let filtered = st.key_get_mod_mask_remove_consumed(3, ModMask::SHIFT | ModMask::CONTROL);
        assert_eq!(filtered, ModMask::CONTROL);
    }

    #[test]
    fn context_unused_import_guard() {
        // Keep `Context` imported for doc-linking even though this module's
        // tests build keymaps by hand rather than compiling XKB source.
        let _ = Context::default();
    }
}
