//! Lexer for Java 8 source.
//!
//! Token definitions are a logos-derived enum; the wrapper below turns the
//! raw byte ranges logos reports into line/column [`Span`]s.

use super::span::{Location, Span};
use crate::common::{Error, Result};
use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // Keywords
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("static")]
    Static,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("abstract")]
    Abstract,
    #[token("final")]
    Final,
    #[token("native")]
    Native,
    #[token("transient")]
    Transient,
    #[token("volatile")]
    Volatile,
    #[token("strictfp")]
    Strictfp,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("enum")]
    Enum,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("throws")]
    Throws,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("instanceof")]
    InstanceOf,
    #[token("void")]
    Void,
    #[token("boolean")]
    Boolean,
    #[token("byte")]
    Byte,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("char")]
    Char,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Assignment operators
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    RemAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token(">>>=")]
    UShrAssign,

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("!")]
    Not,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    UShr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("@")]
    At,

    // Literals; suffix classification happens in the parser
    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?", |lex| lex.slice().to_owned())]
    #[regex(r"0[bB][01_]+[lL]?", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9][0-9_]*[lL]?", |lex| lex.slice().to_owned())]
    IntLit(String),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?[fFdD]?", |lex| lex.slice().to_owned())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fFdD]?", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+[fFdD]?", |lex| lex.slice().to_owned())]
    #[regex(r"[0-9][0-9_]*[fFdD]", |lex| lex.slice().to_owned())]
    FloatLit(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_owned())]
    StringLit(String),

    #[regex(r"'([^'\\\n]|\\.|\\u[0-9a-fA-F]{4})'", |lex| lex.slice().to_owned())]
    CharLit(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

/// A token together with its source span.
pub type SpannedToken = (Token, Span);

/// Tokenize a whole source file.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    // byte offset of the start of each line, for offset -> line/column
    let mut line_starts = vec![0usize];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            line_starts.push(i + 1);
        }
    }
    let locate = |offset: usize| -> Location {
        let line = line_starts.partition_point(|&s| s <= offset);
        let col = offset - line_starts[line - 1] + 1;
        Location::new(line, col, offset)
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(item) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(locate(range.start), locate(range.end));
        match item {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(Error::parse(
                    span,
                    format!("unexpected character `{}`", &source[range.start..range.end]),
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let toks = kinds("class Foo extends Bar");
        assert_eq!(
            toks,
            vec![
                Token::Class,
                Token::Ident("Foo".into()),
                Token::Extends,
                Token::Ident("Bar".into())
            ]
        );
    }

    #[test]
    fn literal_flavors() {
        let toks = kinds("42 0x1F 7L 2.5 1e3 3.0f 'a' \"hi\"");
        assert!(matches!(&toks[0], Token::IntLit(s) if s == "42"));
        assert!(matches!(&toks[1], Token::IntLit(s) if s == "0x1F"));
        assert!(matches!(&toks[2], Token::IntLit(s) if s == "7L"));
        assert!(matches!(&toks[3], Token::FloatLit(s) if s == "2.5"));
        assert!(matches!(&toks[4], Token::FloatLit(s) if s == "1e3"));
        assert!(matches!(&toks[5], Token::FloatLit(s) if s == "3.0f"));
        assert!(matches!(&toks[6], Token::CharLit(s) if s == "'a'"));
        assert!(matches!(&toks[7], Token::StringLit(s) if s == "\"hi\""));
    }

    #[test]
    fn comments_are_skipped() {
        let toks = kinds("int x; // trailing\n/* block\n comment */ int y;");
        assert_eq!(toks.len(), 6);
    }

    #[test]
    fn spans_track_lines() {
        let toks = tokenize("a\n  b").unwrap();
        assert_eq!(toks[0].1.start.line, 1);
        assert_eq!(toks[1].1.start.line, 2);
        assert_eq!(toks[1].1.start.column, 3);
    }

    #[test]
    fn shift_operators() {
        let toks = kinds("a >> b >>> c >>= d");
        assert!(toks.contains(&Token::Shr));
        assert!(toks.contains(&Token::UShr));
        assert!(toks.contains(&Token::ShrAssign));
    }
}
