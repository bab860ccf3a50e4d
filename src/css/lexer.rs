//! Лексер CSS на logos.
//!
//! Лексер не падает: любой нераспознанный символ превращается в
//! [`Token::Delim`], как требует прощающая модель разбора CSS.

use logos::Logos;

use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")] // Пропускаем комментарии /* ... */
enum LogosToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

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
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,

    #[regex(r"@-?-?[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice()[1..].to_string())]
    AtKeyword(String),

    // url(...) без кавычек длиннее, чем `url(` как функция
    #[regex(r#"[uU][rR][lL]\([ \t\r\n]*[^)"' \t\r\n]*[ \t\r\n]*\)"#, |lex| {
        let s = lex.slice();
        s[4..s.len() - 1].trim().to_string()
    })]
    Url(String),

    #[regex(r"-?-?[a-zA-Z_][a-zA-Z0-9_-]*\(", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].to_string()
    })]
    Function(String),

    #[regex(r"-?-?[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"#[a-zA-Z0-9_-]+", |lex| lex.slice()[1..].to_string())]
    Hash(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(String),

    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)%", |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<f64>().ok()
    })]
    Percentage(f64),

    #[regex(r"[+-]?([0-9]+(\.[0-9]+)?|\.[0-9]+)[a-zA-Z]+", |lex| split_dimension(lex.slice()))]
    Dimension((f64, String)),
}

/// Снять кавычки и обработать экранирование.
fn unquote(s: &str) -> String {
    let inner = &s[1..s.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn split_dimension(s: &str) -> Option<(f64, String)> {
    let split = s.find(|c: char| c.is_ascii_alphabetic())?;
    let value = s[..split].parse::<f64>().ok()?;
    Some((value, s[split..].to_ascii_lowercase()))
}

/// Лексер CSS.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    /// Создать новый лексер.
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Spanned<Token> {
        match self.logos.next() {
            Some(result) => {
                let span = Span::new(self.logos.span().start, self.logos.span().end);
                let token = match result {
                    Ok(logos_token) => convert_token(logos_token),
                    Err(()) => Token::Delim(self.logos.slice().chars().next().unwrap_or('\u{FFFD}')),
                };
                Spanned::new(token, span)
            }
            None => {
                let pos = self.source.len();
                Spanned::new(Token::Eof, Span::new(pos, pos))
            }
        }
    }

    /// Прочитать весь вход. Последний токен всегда [`Token::Eof`].
    pub fn tokenize(mut self) -> Vec<Spanned<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.value, Token::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Исходный текст.
    pub fn source(&self) -> &'a str {
        self.source
    }
}

/// Конвертировать внутренний токен logos в публичный Token.
fn convert_token(logos_token: LogosToken) -> Token {
    match logos_token {
        LogosToken::Whitespace => Token::Whitespace,
        LogosToken::LBrace => Token::LBrace,
        LogosToken::RBrace => Token::RBrace,
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::LBracket => Token::LBracket,
        LogosToken::RBracket => Token::RBracket,
        LogosToken::Semicolon => Token::Semicolon,
        LogosToken::Colon => Token::Colon,
        LogosToken::Comma => Token::Comma,
        LogosToken::AtKeyword(name) => Token::AtKeyword(name),
        LogosToken::Url(url) => Token::Url(url),
        LogosToken::Function(name) => Token::Function(name),
        LogosToken::Ident(name) => Token::Ident(name),
        LogosToken::Hash(name) => Token::Hash(name),
        LogosToken::String(s) => Token::String(s),
        LogosToken::Number(n) => Token::Number(n),
        LogosToken::Percentage(n) => Token::Percentage(n),
        LogosToken::Dimension((n, unit)) => Token::Dimension(n, unit),
    }
}
