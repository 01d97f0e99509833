//! The parsed representation of an XKB file.
//!
//! Re-expressed from the original's singly-linked, tagged-union node graph
//! (spec §9 "AST graph") as an owned tree of Rust enums: each variant
//! carries its own payload, statement lists are plain `Vec`s, and there are
//! no back-edges — ownership is strictly parent-to-child.
use crate::atom::Atom;
use crate::keymap::KeyName;

/// One of the four top-level section kinds (spec §4.3 "section keywords").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Keycodes,
    Types,
    Compat,
    Symbols,
    Geometry,
}

/// How an included or re-declared fragment combines with what came before
/// (spec §4.5 "Merge semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Augment,
    Override,
    Replace,
    Default,
    Alternate,
}

impl MergeMode {
    /// `default` behaves as `override` when the surrounding context does
    /// not otherwise specify (spec §4.5 table).
    pub fn resolved(self) -> MergeMode {
        match self {
            MergeMode::Default => MergeMode::Override,
            other => other,
        }
    }
}

/// A parsed top-level file: one or more sections, e.g. a keymap file
/// containing `xkb_keycodes`, `xkb_types`, `xkb_compat` and `xkb_symbols`
/// blocks back to back.
#[derive(Debug, Clone, Default)]
pub struct XkbFile {
    pub sections: Vec<Section>,
}

/// One `xkb_<kind> "<name>" { ... };` block.
#[derive(Debug, Clone)]
pub struct Section {
    pub kind: SectionKind,
    pub name: Atom,
    pub merge: MergeMode,
    pub statements: Vec<Stmt>,
}

/// One component of an `include` statement's `file(map):modifier` triple
/// list (spec §4.4).
#[derive(Debug, Clone)]
pub struct IncludeTriple {
    pub file: String,
    pub map: Option<String>,
    pub modifier: Option<String>,
    /// `|` (augment) or `+` (override); `None` for the first component,
    /// which inherits the surrounding statement's merge mode instead.
    pub operator: Option<MergeMode>,
}

#[derive(Debug, Clone)]
pub struct IncludeStmt {
    pub components: Vec<IncludeTriple>,
}

/// A single `<mods>` expression value resolved by the evaluator (spec §4.2).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Ident(Atom),
    KeysymList(Vec<Atom>),
    ActionList(Vec<ActionCall>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `element.field` or bare `field`, e.g. `modifiers` in `modifiers =
    /// Shift;`, or `type[Group2]` for a per-group key override.
    FieldRef {
        element: Option<Atom>,
        field: Atom,
        index: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A call-shaped action literal as it appears in source, e.g.
/// `SetMods(modifiers=Shift,clearLocks)`, before field resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
    pub action: Atom,
    pub args: Vec<ActionArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionArg {
    pub field: Atom,
    /// `None` for a bare boolean flag, e.g. `clearLocks` with no `=value`.
    pub value: Option<Expr>,
}

/// One statement inside a section body.
#[derive(Debug, Clone)]
pub enum Stmt {
    Include(IncludeStmt),
    /// `<name> = <expr>;` or `<element>.<field> = <expr>;`
    VarDecl { lhs: Expr, value: Expr },
    /// `<name>[<index>] = <expr>;`, e.g. `map[Shift] = Level2;`
    ArrayDecl {
        name: Atom,
        index: Expr,
        value: Expr,
    },
    /// `key <name> { ... };` inside `xkb_keycodes`.
    KeyCodeDecl { name: KeyName, keycode: Expr },
    /// `alias <alias> = <real>;` inside `xkb_keycodes` (SPEC_FULL §B.9).
    AliasDecl { alias: KeyName, real: KeyName },
    /// `virtual_modifiers <name>[,<name>...];`
    VModDecl(Vec<Atom>),
    /// `indicator <n> = "<name>";` or a full `indicator "<name>" { ... };`
    /// body, the latter carrying its own nested field statements.
    IndicatorMap {
        name: Atom,
        statements: Vec<Stmt>,
    },
    IndicatorName {
        index: Expr,
        name: Atom,
        is_virtual: bool,
    },
    /// `type "<name>" { ... };` inside `xkb_types`.
    TypeDef {
        name: Atom,
        statements: Vec<Stmt>,
    },
    /// `interpret <keysym>(+<mods>) { ... };` inside `xkb_compat`.
    InterpretDef {
        keysym: Option<Atom>,
        predicate: Option<InterpPredicate>,
        statements: Vec<Stmt>,
    },
    /// `key <name> { [ <syms>... ] };` inside `xkb_symbols`.
    SymbolsDef {
        name: KeyName,
        statements: Vec<Stmt>,
    },
    /// `modmap <modname> { <keyname>, ... };`
    ModMapDecl {
        modifier: Atom,
        keys: Vec<KeyName>,
    },
    /// A bare expression statement, e.g. a boolean flag with no `=`.
    Expr(Expr),
}

/// A compat-section interpretation predicate, e.g. `AnyOf(Shift+Lock)`
/// (spec §4.5 "Symbol interpretations").
#[derive(Debug, Clone, PartialEq)]
pub struct InterpPredicate {
    pub kind: PredicateKind,
    pub mask: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    AnyOfOrNone,
    AnyOf,
    NoneOf,
    AllOf,
    Exactly,
}
