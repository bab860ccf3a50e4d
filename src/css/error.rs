//! Ошибки разбора CSS.

use super::token::Span;
use thiserror::Error;

/// Ошибка парсинга таблицы стилей.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CssParseError {
    /// Блок `{` не закрыт до конца ввода.
    #[error("Unclosed block at position {}", span.start)]
    UnclosedBlock { span: Span },

    /// Правило без блока в конце ввода.
    #[error("Unexpected end of input at position {}: {message}", span.start)]
    UnexpectedEof { span: Span, message: String },

    /// Вложенность блоков или значений превысила предел.
    #[error("Nesting deeper than {limit} levels at position {}", span.start)]
    TooDeep { span: Span, limit: usize },
}

impl CssParseError {
    /// Создать ошибку "неожиданный конец".
    pub fn unexpected_eof(span: Span, message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            span,
            message: message.into(),
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::UnclosedBlock { span } => *span,
            Self::UnexpectedEof { span, .. } => *span,
            Self::TooDeep { span, .. } => *span,
        }
    }
}
