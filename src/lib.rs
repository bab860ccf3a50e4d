//! # autoscript
//!
//! Компилятор декларативных сценариев автоматизации браузера в программы
//! для Puppeteer, Playwright и Selenium, а также встроенный анализатор
//! совместимости CSS по статусам Baseline.
//!
//! ## Основные модули
//!
//! - [`script`] - Разбор и проверка сценария
//! - [`ir`] - Промежуточное представление (плоский список команд)
//! - [`backends`] - Обработчики команд для каждого бэкенда
//! - [`codegen`] - Синтез текста программы
//! - [`css`] - Лексер и парсер таблиц стилей
//! - [`compat`] - Таблица признаков, анализатор и подсветка
//! - [`config`] - Файл настроек `autoscript.toml`
//!
//! ## Пример использования
//!
//! ```rust,ignore
//! use autoscript::{compile, CompileOptions};
//!
//! let source = "framework: puppeteer\nbrowser: { mode: launch }\nsteps:\n  - goto: https://example.com\n";
//! let program = compile(source, &CompileOptions::default()).unwrap();
//! println!("{}", program.text);
//! ```

// === Компилятор ===
pub mod backends;
pub mod codegen;
pub mod duration;
pub mod error;
pub mod ir;
pub mod script;

// === Анализ совместимости ===
pub mod compat;
pub mod css;

// === Настройки ===
pub mod config;

// === Re-exports для удобства ===
pub use codegen::{synthesize, Program, StepMarker};
pub use config::CompileOptions;
pub use duration::{parse_duration, Millis};
pub use error::{SchemaViolation, ScriptError, ScriptResult};
pub use ir::{generate_ir, Command, Ir, TeardownOp};
pub use script::{Backend, ScriptDoc};

/// Полный конвейер: текст сценария → проверка → IR → программа.
pub fn compile(source: &str, options: &CompileOptions) -> ScriptResult<Program> {
    let script = script::load(source)?;
    let ir = generate_ir(&script)?;
    synthesize(&ir, options)
}
