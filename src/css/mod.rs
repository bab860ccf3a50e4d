//! Разбор CSS для анализатора совместимости.
//!
//! Лексер на logos и рекурсивный спуск. Парсер прощающий: мусор между
//! правилами пропускается, ошибкой считается только оборванное правило.
//!
//! ```text
//! .card { display: grid; &:hover { color: oklch(70% 0.1 200) } }
//! @container sidebar (min-width: 400px) { .title { font-size: 2cqi } }
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::CssParseError;
pub use lexer::Lexer;
pub use parser::{AtRule, Block, ComponentValue, CssNode, Declaration, Parser, StyleRule, Stylesheet};
pub use token::{Span, Spanned, Token};

/// Распарсить таблицу стилей.
pub fn parse_stylesheet(source: &str) -> Result<Stylesheet, CssParseError> {
    Parser::new(source).parse_stylesheet()
}
