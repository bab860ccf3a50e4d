//! Статус Baseline.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Трёхуровневая классификация зрелости поддержки признака.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaselineStatus {
    #[serde(rename = "not-baseline")]
    NotBaseline,
    #[serde(rename = "low")]
    LowBaseline,
    #[serde(rename = "high")]
    HighBaseline,
}

impl BaselineStatus {
    /// Статус из сырого значения `status.baseline` реестра.
    ///
    /// `false` → NotBaseline, `"low"` → LowBaseline, `true` или `"high"` →
    /// HighBaseline; всё остальное не распознаётся.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        match raw {
            Value::Bool(false) => Some(BaselineStatus::NotBaseline),
            Value::Bool(true) => Some(BaselineStatus::HighBaseline),
            Value::String(s) if s == "low" => Some(BaselineStatus::LowBaseline),
            Value::String(s) if s == "high" => Some(BaselineStatus::HighBaseline),
            _ => None,
        }
    }

    /// Строгость статуса: чем выше, тем меньше браузеров поддерживают признак.
    pub fn restrictiveness(self) -> u8 {
        match self {
            BaselineStatus::NotBaseline => 2,
            BaselineStatus::LowBaseline => 1,
            BaselineStatus::HighBaseline => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BaselineStatus::NotBaseline => "not baseline",
            BaselineStatus::LowBaseline => "newly available",
            BaselineStatus::HighBaseline => "widely available",
        }
    }
}

impl fmt::Display for BaselineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
