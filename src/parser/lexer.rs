use logos::Logos;

use super::error::ParseError;
use super::span::{LineIndex, Location};

/// Token types of the source language
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
#[logos(skip "\u{FEFF}")]
pub enum Token {
    // Keywords
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("static")]
    Static,
    #[token("final")]
    Final,
    #[token("abstract")]
    Abstract,
    #[token("native")]
    Native,
    #[token("throws")]
    Throws,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("void")]
    Void,
    #[token("boolean")]
    Boolean,
    #[token("byte")]
    Byte,
    #[token("short")]
    Short,
    #[token("char")]
    Char,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
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
    #[token("assert")]
    Assert,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators
    #[token("=")]
    Assign,
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
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token(":")]
    Colon,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("@")]
    At,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,
    #[regex(r"'([^'\\\n]|\\.)'")]
    CharLiteral,
    #[regex(r"0[xX][0-9a-fA-F]+")]
    HexInteger,
    #[regex(r"[0-9]+")]
    DecimalInteger,
    #[regex(r"[0-9]+[lL]")]
    LongLiteral,

    // Identifiers
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,
}

impl Token {
    /// Check if this token is a modifier
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Token::Public
                | Token::Protected
                | Token::Private
                | Token::Static
                | Token::Final
                | Token::Abstract
                | Token::Native
        )
    }

    /// Check if this token names a primitive type (excluding `void`)
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            Token::Boolean | Token::Byte | Token::Short | Token::Char | Token::Int | Token::Long
        )
    }
}

/// Lexical token with location information
#[derive(Debug, Clone)]
pub struct LexicalToken {
    pub token: Token,
    pub lexeme: String,
    pub location: Location,
}

impl LexicalToken {
    pub fn new(token: Token, lexeme: String, location: Location) -> Self {
        Self { token, lexeme, location }
    }

    pub fn token_type(&self) -> Token {
        self.token
    }

    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

/// Lexer over one source file
pub struct Lexer<'a> {
    source: &'a str,
    lexer: logos::Lexer<'a, Token>,
    lines: LineIndex,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Token::lexer(source),
            lines: LineIndex::new(source),
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<Result<LexicalToken, ParseError>> {
        let token = self.lexer.next()?;
        let span = self.lexer.span();
        let location = self.lines.location(self.source, span.start);
        let lexeme = self.lexer.slice().to_string();
        Some(match token {
            Ok(token) => Ok(LexicalToken::new(token, lexeme, location)),
            Err(()) => Err(ParseError::LexicalError { text: lexeme, location }),
        })
    }

    /// Location just past the last character, used for end-of-input errors
    pub fn end_location(&self) -> Location {
        self.lines.location(self.source, self.source.len())
    }

    /// Get all tokens from the source
    pub fn tokenize(mut self) -> Result<Vec<LexicalToken>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(result) = self.next_token() {
            tokens.push(result?);
        }
        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<LexicalToken, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
