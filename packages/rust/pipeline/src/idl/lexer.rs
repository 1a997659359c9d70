//! Token stream for embedded interface-definition blocks.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*(?:[^*]|\*[^/])*\*/")]
pub enum Token {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""[^"]*""#)]
    Str,

    #[regex(r"-?[0-9][0-9a-fA-FxX\.eE]*")]
    Number,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("?")]
    Question,
    #[token("...")]
    Ellipsis,
    #[token("-")]
    Minus,
}

/// Tokenize a full block, reporting the byte offset of the first
/// unrecognized character on failure.
pub fn tokenize(source: &str) -> Result<Vec<Token>, usize> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(item) = lexer.next() {
        match item {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(lexer.span().start),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_interface_skeleton() {
        let tokens = tokenize("interface Foo { attribute DOMString bar; };").expect("lex");
        assert_eq!(tokens[0], Token::Ident("interface".into()));
        assert_eq!(tokens[1], Token::Ident("Foo".into()));
        assert_eq!(tokens[2], Token::LBrace);
        assert!(tokens.contains(&Token::Semi));
    }

    #[test]
    fn skips_comments_and_strings() {
        let tokens =
            tokenize("enum Mode { \"open\", /* two */ \"closed\" }; // done").expect("lex");
        assert_eq!(tokens[0], Token::Ident("enum".into()));
        assert_eq!(
            tokens.iter().filter(|t| matches!(t, Token::Str)).count(),
            2
        );
    }

    #[test]
    fn reports_offset_of_bad_character() {
        let err = tokenize("interface £ {}").expect_err("bad char");
        assert_eq!(err, 10);
    }
}
