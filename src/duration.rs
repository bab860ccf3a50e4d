//! Модуль `duration`
//!
//! Разбор компактных токенов длительности (`500ms`, `2s`, `1m`, `1.5h`)
//! в миллисекунды. Используется при валидации сценария, генерации кода
//! и в настройках сканирования.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Ошибка разбора длительности.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("Empty duration")]
    Empty,

    #[error("Invalid duration '{0}': expected digits followed by an optional unit")]
    NotNumeric(String),

    #[error("Duration '{0}' is out of range")]
    Overflow(String),
}

/// Разобрать токен длительности в миллисекунды.
///
/// Поддерживаемые единицы: `ms`, `s`, `m`, `h`. Число без единицы и число
/// с неизвестной единицей трактуются как миллисекунды.
pub fn parse_duration(token: &str) -> Result<u64, DurationError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DurationError::Empty);
    }

    let split = token
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(token.len());
    let (number, unit) = token.split_at(split);

    if number.is_empty() || number.starts_with('.') || number.matches('.').count() > 1 {
        return Err(DurationError::NotNumeric(token.to_string()));
    }
    let value: f64 = number
        .parse()
        .map_err(|_| DurationError::NotNumeric(token.to_string()))?;

    let factor = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" => 1.0,
        "s" => 1_000.0,
        "m" => 60_000.0,
        "h" => 3_600_000.0,
        other => {
            log::debug!("unknown duration unit '{}' in '{}', treating as milliseconds", other, token);
            1.0
        }
    };

    let millis = (value * factor).round();
    if !millis.is_finite() || millis > u64::MAX as f64 {
        return Err(DurationError::Overflow(token.to_string()));
    }
    Ok(millis as u64)
}

/// Длительность в миллисекундах.
///
/// В сценарии задаётся либо целым числом (миллисекунды), либо токеном.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(pub u64);

impl Millis {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl Serialize for Millis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

struct MillisVisitor;

impl<'de> Visitor<'de> for MillisVisitor {
    type Value = Millis;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration in milliseconds or a token like \"2s\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Millis, E> {
        Ok(Millis(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Millis, E> {
        u64::try_from(v)
            .map(Millis)
            .map_err(|_| E::custom(format!("negative duration {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Millis, E> {
        parse_duration(v).map(Millis).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Millis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MillisVisitor)
    }
}
