//! Токены и позиции для CSS-лексера.

use serde::{Deserialize, Serialize};

/// Позиция в исходном коде.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Начальная позиция (байт).
    pub start: usize,
    /// Конечная позиция (байт).
    pub end: usize,
}

impl Span {
    /// Создать новый Span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Объединить два Span.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Токен с позицией.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Типы токенов CSS.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Пробельные символы (значимы в селекторах и прелюдиях).
    Whitespace,

    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,

    /// `@name`
    AtKeyword(String),
    /// `name(` - имя функции без скобки.
    Function(String),
    /// `url(...)` без кавычек - содержимое без обёртки.
    Url(String),
    /// Идентификатор, включая `--custom-property`.
    Ident(String),
    /// `#hash`
    Hash(String),
    /// Строковый литерал без кавычек.
    String(String),
    /// Число.
    Number(f64),
    /// Число с процентом.
    Percentage(f64),
    /// Число с единицей.
    Dimension(f64, String),
    /// Любой другой символ (`>`, `+`, `~`, `*`, `.`, `!`, `&`, ...).
    Delim(char),

    /// Конец файла
    Eof,
}

impl Token {
    /// Проверить, является ли токен пробелом.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace)
    }
}
