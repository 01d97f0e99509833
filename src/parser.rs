//! Recursive-descent parser: [`Lexer`] token stream → [`ast::XkbFile`] (spec
//! §4.3). The original grammar is LALR(1) (`parser.y`); this is a hand-rolled
//! descent over the same token set, since the XKB grammar is small and
//! mostly unambiguous with one token of lookahead, the same tradeoff the
//! `termwiz` escape-sequence parser makes over a table-driven state machine.
use crate::ast::*;
use crate::atom::{Atom, AtomTable};
use crate::error::{Diagnostic, DiagnosticBag, DiagnosticKind, Location};
use crate::keymap::KeyName;
use crate::lexer::{LexError, Lexer, Span, Spanned, Token};

/// Parse one XKB source file. Returns the parsed sections (empty on a fatal
/// lex/parse failure) alongside every diagnostic collected along the way;
/// callers decide whether any diagnostic is fatal (spec §7 "local
/// recovery": a statement-level error advances to the next statement, a
/// section-level error aborts that section but not the whole file).
pub fn parse(src: &str, file_name: &str, atoms: &mut AtomTable) -> (XkbFile, DiagnosticBag) {
    let file = atoms.intern(file_name, None);
    let mut parser = Parser::new(src, file, atoms);
    let sections = parser.parse_top_level();
    (XkbFile { sections }, parser.diags)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    atoms: &'a mut AtomTable,
    current: Spanned<Token>,
    file: Atom,
    diags: DiagnosticBag,
}

/// `4.3 Error recovery`: abort the current section once this many
/// diagnostics have accumulated in it.
const MAX_SECTION_ERRORS: usize = 10;

impl<'a> Parser<'a> {
    fn new(src: &'a str, file: Atom, atoms: &'a mut AtomTable) -> Self {
        let mut lexer = Lexer::new(src);
        let current = Self::advance_raw(&mut lexer);
        Parser {
            lexer,
            atoms,
            current,
            file,
            diags: DiagnosticBag::new(),
        }
    }

    fn advance_raw(lexer: &mut Lexer<'a>) -> Spanned<Token> {
        match lexer.next_token() {
            Ok(t) => t,
            Err(LexError { span, .. }) => Spanned {
                value: Token::Eof,
                span,
            },
        }
    }

    fn bump(&mut self) -> Token {
        let next = Self::advance_raw(&mut self.lexer);
        std::mem::replace(&mut self.current, next).value
    }

    fn peek(&self) -> &Token {
        &self.current.value
    }

    fn at(&self, t: &Token) -> bool {
        &self.current.value == t
    }

    /// Peek one token past `self.current` without consuming it, by
    /// advancing a throwaway clone of the lexer.
    fn peek2(&self) -> Token {
        Self::advance_raw(&mut self.lexer.clone()).value
    }

    fn error(&mut self, message: impl Into<String>) {
        let loc = Location::new(self.file, self.current.span.line, self.current.span.column);
        self.diags.push(Diagnostic::at(DiagnosticKind::Parse, loc, message));
    }

    fn expect(&mut self, t: Token) -> bool {
        if self.current.value == t {
            self.bump();
            true
        } else {
            self.error(format!("expected {:?}, found {:?}", t, self.current.value));
            false
        }
    }

    /// Discard tokens until the next statement boundary, per spec §4.3
    /// error recovery.
    fn recover_to_boundary(&mut self) {
        loop {
            match self.peek() {
                Token::Semicolon => {
                    self.bump();
                    return;
                }
                Token::RBrace | Token::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn intern(&mut self, s: &str) -> Atom {
        self.atoms.intern(s, None)
    }

    fn parse_top_level(&mut self) -> Vec<Section> {
        if self.at(&Token::KwXkbKeymap) {
            self.bump();
            if matches!(self.peek(), Token::String(_)) {
                self.bump();
            }
            self.expect(Token::LBrace);
            let sections = self.parse_sections_until(&Token::RBrace);
            self.expect(Token::RBrace);
            self.expect(Token::Semicolon);
            sections
        } else {
            self.parse_sections_until(&Token::Eof)
        }
    }

    fn parse_sections_until(&mut self, end: &Token) -> Vec<Section> {
        let mut sections = Vec::new();
        while !self.at(end) && !self.at(&Token::Eof) {
            match self.parse_section() {
                Some(section) => sections.push(section),
                None => {
                    if !self.at(end) && !self.at(&Token::Eof) {
                        self.bump();
                    }
                }
            }
        }
        sections
    }

    fn parse_merge_prefix(&mut self) -> Option<MergeMode> {
        let mode = match self.peek() {
            Token::KwAugment => MergeMode::Augment,
            Token::KwOverride => MergeMode::Override,
            Token::KwReplace => MergeMode::Replace,
            Token::KwDefault => MergeMode::Default,
            Token::KwAlternate => MergeMode::Alternate,
            _ => return None,
        };
        self.bump();
        Some(mode)
    }

    fn parse_section(&mut self) -> Option<Section> {
        let merge = self.parse_merge_prefix().unwrap_or(MergeMode::Default);
        let kind = match self.peek() {
            Token::KwXkbKeycodes => SectionKind::Keycodes,
            Token::KwXkbTypes => SectionKind::Types,
            Token::KwXkbCompatibility => SectionKind::Compat,
            Token::KwXkbSymbols => SectionKind::Symbols,
            Token::KwXkbGeometry => SectionKind::Geometry,
            _ => {
                self.error(format!("expected a section keyword, found {:?}", self.current.value));
                self.recover_to_boundary();
                return None;
            }
        };
        self.bump();
        let name = match self.peek() {
            Token::String(_) => {
                let Token::String(s) = self.bump() else { unreachable!() };
                self.intern(&s)
            }
            _ => Atom::NONE,
        };
        self.expect(Token::LBrace);
        let statements = self.parse_statements();
        self.expect(Token::RBrace);
        self.expect(Token::Semicolon);
        Some(Section {
            kind,
            name,
            merge,
            statements,
        })
    }

    /// Parse `;`-terminated statements until `}`, recovering per-statement
    /// on error and aborting the section early past [`MAX_SECTION_ERRORS`].
    fn parse_statements(&mut self) -> Vec<Stmt> {
        let mut out = Vec::new();
        let errors_at_entry = self.diags.error_count();
        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            if self.diags.error_count() - errors_at_entry >= MAX_SECTION_ERRORS {
                self.error("too many errors in section, aborting");
                while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
                    self.bump();
                }
                break;
            }
            match self.parse_statement() {
                Some(stmt) => out.push(stmt),
                None => self.recover_to_boundary(),
            }
        }
        out
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        let stmt = match self.peek().clone() {
            Token::KwInclude => {
                self.bump();
                let Token::String(s) = self.bump() else {
                    self.error("expected a string after include");
                    return None;
                };
                Stmt::Include(parse_include_string(&s, self.atoms))
            }
            Token::KwVirtualModifiers => {
                self.bump();
                let mut names = Vec::new();
                loop {
                    match self.bump() {
                        Token::Ident(name) => names.push(self.intern(&name)),
                        other => {
                            self.error(format!("expected a modifier name, found {:?}", other));
                            break;
                        }
                    }
                    if self.at(&Token::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                Stmt::VModDecl(names)
            }
            Token::KwAlias => {
                self.bump();
                let alias = self.expect_key_name()?;
                self.expect(Token::Equals);
                let real = self.expect_key_name()?;
                Stmt::AliasDecl { alias, real }
            }
            Token::KwType => {
                self.bump();
                let Token::String(s) = self.bump() else {
                    self.error("expected a quoted type name");
                    return None;
                };
                let name = self.intern(&s);
                self.expect(Token::LBrace);
                let statements = self.parse_statements();
                self.expect(Token::RBrace);
                Stmt::TypeDef { name, statements }
            }
            Token::KwInterpret => {
                self.bump();
                let (keysym, predicate) = self.parse_interpret_head()?;
                self.expect(Token::LBrace);
                let statements = self.parse_statements();
                self.expect(Token::RBrace);
                Stmt::InterpretDef {
                    keysym,
                    predicate,
                    statements,
                }
            }
            Token::KwModMap => {
                self.bump();
                let modifier = match self.bump() {
                    Token::Ident(name) => self.intern(&name),
                    other => {
                        self.error(format!("expected a modifier name, found {:?}", other));
                        return None;
                    }
                };
                self.expect(Token::LBrace);
                let mut keys = Vec::new();
                while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
                    if let Some(k) = self.expect_key_name() {
                        keys.push(k);
                    }
                    if self.at(&Token::Comma) {
                        self.bump();
                    } else {
                        break;
                    }
                }
                self.expect(Token::RBrace);
                Stmt::ModMapDecl { modifier, keys }
            }
            Token::KwIndicator => {
                self.bump();
                match self.peek().clone() {
                    Token::String(_) => {
                        let Token::String(s) = self.bump() else { unreachable!() };
                        let name = self.intern(&s);
                        self.expect(Token::LBrace);
                        let statements = self.parse_statements();
                        self.expect(Token::RBrace);
                        Stmt::IndicatorMap { name, statements }
                    }
                    _ => {
                        let index = self.parse_expr()?;
                        self.expect(Token::Equals);
                        let is_virtual = self.at(&Token::KwVirtual);
                        if is_virtual {
                            self.bump();
                        }
                        let Token::String(s) = self.bump() else {
                            self.error("expected a quoted indicator name");
                            return None;
                        };
                        let name = self.intern(&s);
                        Stmt::IndicatorName {
                            index,
                            name,
                            is_virtual,
                        }
                    }
                }
            }
            Token::KwKey => {
                self.bump();
                let name = self.expect_key_name()?;
                match self.peek() {
                    Token::Equals => {
                        self.bump();
                        let keycode = self.parse_expr()?;
                        Stmt::KeyCodeDecl { name, keycode }
                    }
                    Token::LBrace => {
                        self.bump();
                        let statements = self.parse_comma_statements();
                        self.expect(Token::RBrace);
                        Stmt::SymbolsDef { name, statements }
                    }
                    other => {
                        self.error(format!("expected '=' or '{{' after key name, found {:?}", other));
                        return None;
                    }
                }
            }
            Token::KeyName(_) => {
                let name = self.expect_key_name()?;
                self.expect(Token::Equals);
                let keycode = self.parse_expr()?;
                Stmt::KeyCodeDecl { name, keycode }
            }
            _ => self.parse_lhs_statement()?,
        };
        self.expect(Token::Semicolon);
        Some(stmt)
    }

    /// `name[index] = expr;`, `element.field = expr;`, `name = expr;`, or a
    /// bare boolean flag statement.
    fn parse_lhs_statement(&mut self) -> Option<Stmt> {
        let lhs = self.parse_expr()?;
        if self.at(&Token::Equals) {
            self.bump();
            let value = self.parse_expr()?;
            if let Expr::FieldRef {
                element: None,
                field,
                index: Some(index),
            } = lhs
            {
                return Some(Stmt::ArrayDecl {
                    name: field,
                    index: *index,
                    value,
                });
            }
            Some(Stmt::VarDecl { lhs, value })
        } else {
            Some(Stmt::Expr(lhs))
        }
    }

    /// Comma-separated entries inside a `key <NAME> { ... }` body: each is
    /// either a `field = value` pair, a bracketed list shorthand (`[ a, A ]`
    /// taken as the `symbols` field of the implicit next group), or a bare
    /// flag.
    fn parse_comma_statements(&mut self) -> Vec<Stmt> {
        let mut out = Vec::new();
        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            if let Some(stmt) = self.parse_lhs_statement() {
                out.push(stmt);
            } else {
                self.bump();
            }
            if self.at(&Token::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    /// `interpret <keysym>;` / `interpret <keysym>+<predicate>;` / a bare
    /// `interpret <predicate>;` (no keysym, matches any symbol).
    fn parse_interpret_head(&mut self) -> Option<(Option<Atom>, Option<InterpPredicate>)> {
        let keysym = match self.peek().clone() {
            Token::Ident(name) => {
                self.bump();
                Some(self.intern(&name))
            }
            _ => None,
        };
        if self.at(&Token::Plus) {
            self.bump();
            let predicate = self.parse_predicate()?;
            Some((keysym, Some(predicate)))
        } else {
            Some((keysym, None))
        }
    }

    fn parse_predicate(&mut self) -> Option<InterpPredicate> {
        let Token::Ident(name) = self.bump() else {
            self.error("expected a predicate name (AnyOf, NoneOf, AllOf, Exactly)");
            return None;
        };
        let kind = match name.to_ascii_lowercase().as_str() {
            "anyofornone" => PredicateKind::AnyOfOrNone,
            "anyof" => PredicateKind::AnyOf,
            "noneof" => PredicateKind::NoneOf,
            "allof" => PredicateKind::AllOf,
            "exactly" => PredicateKind::Exactly,
            other => {
                self.error(format!("unknown predicate {}", other));
                return None;
            }
        };
        self.expect(Token::LParen);
        let mask = self.parse_expr()?;
        self.expect(Token::RParen);
        Some(InterpPredicate { kind, mask })
    }

    fn expect_key_name(&mut self) -> Option<KeyName> {
        match self.bump() {
            Token::KeyName(s) => Some(KeyName::new(&s)),
            other => {
                self.error(format!("expected a <keyname>, found {:?}", other));
                None
            }
        }
    }

    // --- Expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek() {
            Token::Minus => Some(UnaryOp::Negate),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Bang => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let inner = self.parse_unary()?;
            return Some(Expr::Unary(op, Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.bump();
                    let Token::Ident(field_name) = self.bump() else {
                        self.error("expected a field name after '.'");
                        return None;
                    };
                    let field = self.intern(&field_name);
                    let element = match expr {
                        Expr::Ident(e) => Some(e),
                        _ => None,
                    };
                    expr = Expr::FieldRef {
                        element,
                        field,
                        index: None,
                    };
                }
                Token::LBracket => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket);
                    let (element, field) = match expr {
                        Expr::Ident(f) => (None, f),
                        Expr::FieldRef { element, field, .. } => (element, field),
                        _ => {
                            self.error("'[' may only follow an identifier");
                            return None;
                        }
                    };
                    expr = Expr::FieldRef {
                        element,
                        field,
                        index: Some(Box::new(index)),
                    };
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.bump() {
            Token::Integer(i) => Some(Expr::Integer(i)),
            Token::Float(f) => Some(Expr::Float(f)),
            Token::String(s) => Some(Expr::String(s)),
            Token::Ident(name) => {
                let atom = self.intern(&name);
                // A bare `LockMods(modifiers=...)` — as opposed to the
                // bracketed `[ SetMods(...), ... ]` list form — is how a
                // compat `interpret` body and a single per-level symbols
                // action are written; fold it into the same one-element
                // `ActionList` so downstream field handlers don't need to
                // special-case arity.
                if self.at(&Token::LParen) {
                    let call = self.parse_action_call_args(atom)?;
                    Some(Expr::ActionList(vec![call]))
                } else {
                    Some(Expr::Ident(atom))
                }
            }
            Token::Keysym(name) => Some(Expr::Ident(self.intern(&name))),
            Token::KeyName(name) => Some(Expr::Ident(self.intern(&name))),
            Token::LBracket => {
                // An action list (`[ SetMods(...), LatchMods(...) ]`) is
                // distinguished from a keysym list (`[ a, A ]`) by its first
                // entry being `Ident (`; two tokens of lookahead settle it.
                if matches!(self.peek(), Token::Ident(_)) && self.peek2() == Token::LParen {
                    let mut calls = Vec::new();
                    if !self.at(&Token::RBracket) {
                        loop {
                            if let Some(call) = self.parse_action_call() {
                                calls.push(call);
                            }
                            if self.at(&Token::Comma) {
                                self.bump();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RBracket);
                    return Some(Expr::ActionList(calls));
                }
                let mut syms = Vec::new();
                if !self.at(&Token::RBracket) {
                    loop {
                        match self.bump() {
                            Token::Ident(name) | Token::Keysym(name) => syms.push(self.intern(&name)),
                            Token::Integer(i) => syms.push(self.intern(&i.to_string())),
                            other => self.error(format!("expected a keysym, found {:?}", other)),
                        }
                        if self.at(&Token::Comma) {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket);
                Some(Expr::KeysymList(syms))
            }
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen);
                Some(inner)
            }
            other => {
                self.error(format!("expected an expression, found {:?}", other));
                None
            }
        }
    }

    /// `ActionName(field=value, flag, ...)` — used both standalone and
    /// inside an action-list bracket (`[ SetMods(...), LatchMods(...) ]`).
    fn parse_action_call(&mut self) -> Option<ActionCall> {
        let Token::Ident(name) = self.bump() else {
            self.error("expected an action name");
            return None;
        };
        let action = self.intern(&name);
        self.parse_action_call_args(action)
    }

    /// The `(field=value, flag, ...)` tail of an action call, given the
    /// action name has already been consumed (either by [`Self::parse_action_call`]
    /// or by [`Self::parse_primary`] recognizing a bare call in value position).
    fn parse_action_call_args(&mut self, action: Atom) -> Option<ActionCall> {
        self.expect(Token::LParen);
        let mut args = Vec::new();
        if !self.at(&Token::RParen) {
            loop {
                let field_expr = self.parse_postfix()?;
                let field = match field_expr {
                    Expr::Ident(a) => a,
                    _ => {
                        self.error("expected a field name in an action argument");
                        return None;
                    }
                };
                let value = if self.at(&Token::Equals) {
                    self.bump();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                args.push(ActionArg { field, value });
                if self.at(&Token::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen);
        Some(ActionCall { action, args })
    }
}

/// Parse an `include` statement's string payload, e.g.
/// `"evdev+aliases(azerty):2|mykbd"`, into its `file(map):modifier` triple
/// list (spec §4.4). The grammar embeds this whole expression inside one
/// string literal, so it gets its own tiny scanner rather than reusing the
/// token-level parser above.
fn parse_include_string(s: &str, atoms: &mut AtomTable) -> IncludeStmt {
    let mut components = Vec::new();
    let mut rest = s;
    let mut first = true;
    while !rest.is_empty() {
        let operator = if first {
            None
        } else if let Some(stripped) = rest.strip_prefix('|') {
            rest = stripped;
            Some(MergeMode::Augment)
        } else if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped;
            Some(MergeMode::Override)
        } else {
            None
        };
        first = false;

        let end = rest
            .find(|c| c == '+' || c == '|')
            .unwrap_or(rest.len());
        let (component, remainder) = rest.split_at(end);
        rest = remainder;

        let (file_and_map, modifier) = match component.split_once(':') {
            Some((f, m)) => (f, Some(m.to_owned())),
            None => (component, None),
        };
        let (file, map) = match file_and_map.split_once('(') {
            Some((f, m)) => (f.to_owned(), Some(m.trim_end_matches(')').to_owned())),
            None => (file_and_map.to_owned(), None),
        };
        let _ = atoms; // reserved: callers intern file/map lazily once resolved
        components.push(IncludeTriple {
            file,
            map,
            modifier,
            operator,
        });
    }
    IncludeStmt { components }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_bare_section() {
        let mut atoms = AtomTable::new();
        let (file, diags) = parse(
            r#"xkb_keycodes "test" { <ESC> = 9; alias <ALT> = <LALT>; };"#,
            "test.xkb",
            &mut atoms,
        );
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        assert_eq!(file.sections.len(), 1);
        assert_eq!(file.sections[0].kind, SectionKind::Keycodes);
        assert_eq!(file.sections[0].statements.len(), 2);
    }

    #[test]
    fn parses_type_with_map_and_preserve() {
        let mut atoms = AtomTable::new();
        let src = r#"
            xkb_types "test" {
                type "FOUR_LEVEL" {
                    modifiers = Shift+LevelThree;
                    map[Shift] = Level2;
                    map[Shift+LevelThree] = Level4;
                    preserve[Shift+LevelThree] = LevelThree;
                };
            };
        "#;
        let (file, diags) = parse(src, "test.xkb", &mut atoms);
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let Stmt::TypeDef { statements, .. } = &file.sections[0].statements[0] else {
            panic!("expected a type def");
        };
        assert_eq!(statements.len(), 4);
    }

    #[test]
    fn parses_symbols_key_with_action_list() {
        let mut atoms = AtomTable::new();
        let src = r#"
            xkb_symbols "test" {
                key <LCTL> {
                    [ Control_L ],
                    actions[Group1] = [ SetMods(modifiers=Control,clearLocks) ]
                };
            };
        "#;
        let (file, diags) = parse(src, "test.xkb", &mut atoms);
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let Stmt::SymbolsDef { statements, .. } = &file.sections[0].statements[0] else {
            panic!("expected a symbols def");
        };
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn parses_bare_action_call_in_interpret_body() {
        let mut atoms = AtomTable::new();
        let src = r#"
            xkb_compatibility "test" {
                interpret Shift_L+AnyOf(Shift) {
                    action= LatchMods(modifiers=Shift,latchToLock);
                };
            };
        "#;
        let (file, diags) = parse(src, "test.xkb", &mut atoms);
        assert!(diags.is_empty(), "{:?}", diags.diagnostics());
        let Stmt::InterpretDef { statements, .. } = &file.sections[0].statements[0] else {
            panic!("expected an interpret def");
        };
        let Stmt::VarDecl { value, .. } = &statements[0] else {
            panic!("expected a var decl");
        };
        assert!(matches!(value, Expr::ActionList(calls) if calls.len() == 1));
    }

    #[test]
    fn include_string_splits_triples() {
        let mut atoms = AtomTable::new();
        let stmt = parse_include_string("evdev+aliases(azerty):2", &mut atoms);
        assert_eq!(stmt.components.len(), 2);
        assert_eq!(stmt.components[0].file, "evdev");
        assert_eq!(stmt.components[1].file, "aliases");
        assert_eq!(stmt.components[1].map.as_deref(), Some("azerty"));
        assert_eq!(stmt.components[1].modifier.as_deref(), Some("2"));
    }
}
