//! Tolerant parser for embedded interface-definition blocks.
//!
//! Extracts the names that matter for cross-linking: top-level
//! declarations and their linkable members. The grammar is deliberately
//! permissive about types, extended attributes and default values; a
//! block only fails to parse when its overall structure is broken, and
//! such failures are reported per block by the indexing pass.

mod lexer;

use specmill_shared::{Result, SpecmillError};

use lexer::{Token, tokenize};

/// Kinds of top-level declarations that produce index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Interface,
    InterfaceMixin,
    CallbackInterface,
    Callback,
    Dictionary,
    Enum,
    Namespace,
    Typedef,
}

/// Kinds of members that get `interface.member` index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Attribute,
    Operation,
    Const,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub members: Vec<Member>,
    /// Partial declarations parse but are not indexed.
    pub partial: bool,
}

/// Parse one block into its declaration list.
pub fn parse(source: &str) -> Result<Vec<Declaration>> {
    let tokens =
        tokenize(source).map_err(|offset| SpecmillError::parse(format!(
            "unrecognized character at offset {offset}"
        )))?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut declarations = Vec::new();
    while !parser.at_end() {
        parser.skip_extended_attrs();
        if parser.at_end() {
            break;
        }
        declarations.push(parser.declaration()?);
    }
    Ok(declarations)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Ident(name)) => Some(name),
            _ => None,
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(SpecmillError::parse(format!(
                "expected {what}, found {other:?}"
            ))),
        }
    }

    /// Skip a `[ ... ]` extended-attribute list if present.
    fn skip_extended_attrs(&mut self) {
        while self.peek() == Some(&Token::LBracket) {
            self.bump();
            let mut depth = 1usize;
            while depth > 0 {
                match self.bump() {
                    Some(Token::LBracket) => depth += 1,
                    Some(Token::RBracket) => depth -= 1,
                    Some(_) => {}
                    None => return,
                }
            }
        }
    }

    fn declaration(&mut self) -> Result<Declaration> {
        let keyword = self.expect_ident("definition keyword")?;
        let (partial, keyword) = if keyword == "partial" {
            (true, self.expect_ident("definition keyword")?)
        } else {
            (false, keyword)
        };

        let mut decl = match keyword.as_str() {
            "interface" => {
                if self.peek_ident() == Some("mixin") {
                    self.bump();
                    self.named_block(DeclKind::InterfaceMixin, false)?
                } else {
                    self.named_block(DeclKind::Interface, false)?
                }
            }
            "callback" => {
                if self.peek_ident() == Some("interface") {
                    self.bump();
                    self.named_block(DeclKind::CallbackInterface, false)?
                } else {
                    let name = self.expect_ident("callback name")?;
                    self.skip_to_semi();
                    Declaration {
                        kind: DeclKind::Callback,
                        name,
                        members: Vec::new(),
                        partial: false,
                    }
                }
            }
            "dictionary" => self.named_block(DeclKind::Dictionary, true)?,
            "namespace" => self.named_block(DeclKind::Namespace, false)?,
            "enum" => {
                let name = self.expect_ident("enum name")?;
                self.skip_brace_block()?;
                self.eat(&Token::Semi);
                Declaration {
                    kind: DeclKind::Enum,
                    name,
                    members: Vec::new(),
                    partial: false,
                }
            }
            "typedef" => {
                let body = self.take_until_semi();
                let name = last_ident(&body).ok_or_else(|| {
                    SpecmillError::parse("typedef without a name")
                })?;
                Declaration {
                    kind: DeclKind::Typedef,
                    name,
                    members: Vec::new(),
                    partial: false,
                }
            }
            other => {
                return Err(SpecmillError::parse(format!(
                    "unrecognized definition '{other}'"
                )));
            }
        };
        decl.partial = partial;
        Ok(decl)
    }

    /// `Name [: Base] { members };` — the shared shape of interfaces,
    /// mixins, callback interfaces, namespaces and dictionaries.
    fn named_block(&mut self, kind: DeclKind, dictionary: bool) -> Result<Declaration> {
        let name = self.expect_ident("declaration name")?;

        if self.eat(&Token::Colon) {
            self.expect_ident("inherited name")?;
        }

        // Forward-style declaration without a body.
        if self.eat(&Token::Semi) {
            return Ok(Declaration {
                kind,
                name,
                members: Vec::new(),
                partial: false,
            });
        }

        if !self.eat(&Token::LBrace) {
            return Err(SpecmillError::parse(format!(
                "expected body for '{name}'"
            )));
        }

        let mut members = Vec::new();
        loop {
            self.skip_extended_attrs();
            match self.peek() {
                None => {
                    return Err(SpecmillError::parse(format!(
                        "unterminated body for '{name}'"
                    )));
                }
                Some(Token::RBrace) => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    let tokens = self.take_until_semi();
                    if let Some(member) = classify_member(&tokens, dictionary) {
                        members.push(member);
                    }
                }
            }
        }
        self.eat(&Token::Semi);

        Ok(Declaration {
            kind,
            name,
            members,
            partial: false,
        })
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume tokens through the next `;` outside parentheses. The
    /// terminating semicolon is consumed but not returned.
    fn take_until_semi(&mut self) -> Vec<Token> {
        let mut out = Vec::new();
        let mut parens = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Semi if parens == 0 => {
                    self.bump();
                    break;
                }
                Token::LParen => parens += 1,
                Token::RParen => parens = parens.saturating_sub(1),
                Token::RBrace if parens == 0 => break,
                _ => {}
            }
            if let Some(token) = self.bump() {
                out.push(token);
            }
        }
        out
    }

    fn skip_to_semi(&mut self) {
        self.take_until_semi();
    }

    fn skip_brace_block(&mut self) -> Result<()> {
        if !self.eat(&Token::LBrace) {
            return Err(SpecmillError::parse("expected '{'"));
        }
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
                None => return Err(SpecmillError::parse("unterminated '{'")),
            }
        }
        Ok(())
    }
}

/// Operations that exist without a linkable name.
const SPECIAL_OPERATIONS: &[&str] = &[
    "constructor",
    "getter",
    "setter",
    "deleter",
    "iterable",
    "maplike",
    "setlike",
    "includes",
    "stringifier",
];

/// Decide what kind of member a token run describes and pull out its name.
fn classify_member(tokens: &[Token], dictionary: bool) -> Option<Member> {
    if tokens.is_empty() {
        return None;
    }

    let has_ident = |name: &str| {
        tokens
            .iter()
            .any(|t| matches!(t, Token::Ident(i) if i == name))
    };

    if has_ident("attribute") {
        return last_ident(tokens).map(|name| Member {
            kind: MemberKind::Attribute,
            name,
        });
    }

    if matches!(tokens.first(), Some(Token::Ident(kw)) if kw == "const") {
        let name = match tokens.iter().position(|t| *t == Token::Eq) {
            Some(eq) => last_ident(&tokens[..eq]),
            None => last_ident(tokens),
        };
        return name.map(|name| Member {
            kind: MemberKind::Const,
            name,
        });
    }

    if let Some(paren) = tokens.iter().position(|t| *t == Token::LParen) {
        let name = match tokens[..paren].iter().rev().find_map(ident_of) {
            Some(name) => name,
            None => return None,
        };
        if SPECIAL_OPERATIONS.contains(&name.as_str()) {
            return None;
        }
        // Unnamed special form: `getter Type (args)` leaves only the
        // introducing keyword and the type before the parenthesis.
        if matches!(tokens.first(), Some(Token::Ident(kw))
            if SPECIAL_OPERATIONS.contains(&kw.as_str())
                && tokens[..paren].iter().filter(|t| matches!(t, Token::Ident(_))).count() <= 2)
        {
            return None;
        }
        return Some(Member {
            kind: MemberKind::Operation,
            name,
        });
    }

    if dictionary {
        let name = match tokens.iter().position(|t| *t == Token::Eq) {
            Some(eq) => last_ident(&tokens[..eq]),
            None => last_ident(tokens),
        };
        return name.map(|name| Member {
            kind: MemberKind::Field,
            name,
        });
    }

    None
}

fn ident_of(token: &Token) -> Option<String> {
    match token {
        Token::Ident(name) => Some(name.clone()),
        _ => None,
    }
}

fn last_ident(tokens: &[Token]) -> Option<String> {
    tokens.iter().rev().find_map(ident_of)
}
