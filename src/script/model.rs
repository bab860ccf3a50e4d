//! Типизированная модель сценария.
//!
//! Структуры отражают грамматику команд после нормализации сокращённых
//! форм (`goto: "https://..."` → `Goto { url, .. }`). Декодирование
//! выполняется только для документов, прошедших [`super::schema::validate`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::compat::{AnalysisConfig, Availability, Strictness};
use crate::duration::Millis;
use crate::error::SchemaViolation;

/// Поддерживаемый бэкенд автоматизации.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Puppeteer,
    Playwright,
    Selenium,
}

impl Backend {
    /// Все бэкенды в фиксированном порядке.
    pub const ALL: [Backend; 3] = [Backend::Puppeteer, Backend::Playwright, Backend::Selenium];

    /// Тег бэкенда в сценарии.
    pub fn tag(self) -> &'static str {
        match self {
            Backend::Puppeteer => "puppeteer",
            Backend::Playwright => "playwright",
            Backend::Selenium => "selenium",
        }
    }

    /// Найти бэкенд по тегу.
    pub fn from_tag(tag: &str) -> Option<Backend> {
        Backend::ALL.into_iter().find(|b| b.tag() == tag)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Режим подключения к браузеру.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    Launch,
    Connect,
}

/// Размер окна.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Параметры запуска нового экземпляра браузера.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LaunchOptions {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
}

fn default_headless() -> bool {
    true
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            args: Vec::new(),
            viewport: None,
            executable_path: None,
        }
    }
}

/// Параметры подключения к уже запущенному браузеру.
///
/// `ws_url` - непрозрачная строка, компилятор её не разрешает.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConnectOptions {
    pub ws_url: String,
}

/// Секция `browser` как она записана в документе.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserSection {
    pub mode: BrowserMode,
    #[serde(default)]
    pub launch: Option<LaunchOptions>,
    #[serde(default)]
    pub connect: Option<ConnectOptions>,
}

impl BrowserSection {
    /// Разрешить дискриминатор `mode`. Без опций запуска берутся
    /// значения по умолчанию.
    pub fn setup(&self) -> Result<BrowserSetup, SchemaViolation> {
        match (self.mode, &self.launch, &self.connect) {
            (BrowserMode::Launch, launch, None) => Ok(BrowserSetup::Launch(launch.clone().unwrap_or_default())),
            (BrowserMode::Connect, None, Some(connect)) => Ok(BrowserSetup::Connect(connect.clone())),
            _ => Err(SchemaViolation::new("browser", "connection options do not match mode")),
        }
    }
}

/// Конфигурация подключения после разрешения дискриминатора `mode`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BrowserSetup {
    Launch(LaunchOptions),
    Connect(ConnectOptions),
}

impl BrowserSetup {
    pub fn mode(&self) -> BrowserMode {
        match self {
            BrowserSetup::Launch(_) => BrowserMode::Launch,
            BrowserSetup::Connect(_) => BrowserMode::Connect,
        }
    }
}

/// Корень документа сценария.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDoc {
    pub framework: Backend,
    pub browser: BrowserSection,
    /// Пустой `steps:` в YAML даёт `null`, это пустой список.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub steps: Vec<Step>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Step>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Один шаг сценария: объект с единственным ключом.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Goto(Goto),
    Wait(Wait),
    Click(Click),
    Type(TypeText),
    Hover(Hover),
    Press(Press),
    Screenshot(Screenshot),
    Assert(Assert),
    Scan(Scan),
    Scroll(Scroll),
    Close(bool),
}

// === Навигация ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GotoRepr")]
pub struct Goto {
    pub url: String,
    #[serde(rename = "waitUntil", skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<WaitUntil>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Millis>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GotoRepr {
    Url(String),
    #[serde(rename_all = "camelCase")]
    Full {
        url: String,
        #[serde(default)]
        wait_until: Option<WaitUntil>,
        #[serde(default)]
        timeout: Option<Millis>,
    },
}

impl From<GotoRepr> for Goto {
    fn from(repr: GotoRepr) -> Self {
        match repr {
            GotoRepr::Url(url) => Goto {
                url,
                wait_until: None,
                timeout: None,
            },
            GotoRepr::Full {
                url,
                wait_until,
                timeout,
            } => Goto {
                url,
                wait_until,
                timeout,
            },
        }
    }
}

// === Ожидание ===

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Wait {
    Duration {
        duration: Millis,
    },
    Selector {
        selector: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<Millis>,
        visible: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WaitRepr {
    Short(Millis),
    Duration {
        duration: Millis,
    },
    Selector {
        selector: String,
        #[serde(default)]
        timeout: Option<Millis>,
        #[serde(default)]
        visible: bool,
    },
}

impl<'de> Deserialize<'de> for Wait {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WaitRepr::deserialize(deserializer).map(Wait::from)
    }
}

impl From<WaitRepr> for Wait {
    fn from(repr: WaitRepr) -> Self {
        match repr {
            WaitRepr::Short(duration) | WaitRepr::Duration { duration } => Wait::Duration { duration },
            WaitRepr::Selector {
                selector,
                timeout,
                visible,
            } => Wait::Selector {
                selector,
                timeout,
                visible,
            },
        }
    }
}

// === Взаимодействие ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// Цель клика: селектор или координаты.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClickTarget {
    Selector { selector: String },
    Point { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClickRepr", rename_all = "camelCase")]
pub struct Click {
    #[serde(flatten)]
    pub target: ClickTarget,
    pub button: MouseButton,
    pub click_count: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClickRepr {
    Selector(String),
    #[serde(rename_all = "camelCase")]
    Full {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        click_count: Option<u32>,
    },
}

impl TryFrom<ClickRepr> for Click {
    type Error = String;

    fn try_from(repr: ClickRepr) -> Result<Self, Self::Error> {
        match repr {
            ClickRepr::Selector(selector) => Ok(Click {
                target: ClickTarget::Selector { selector },
                button: MouseButton::Left,
                click_count: 1,
            }),
            ClickRepr::Full {
                selector,
                x,
                y,
                button,
                click_count,
            } => {
                let target = match (selector, x, y) {
                    (Some(selector), None, None) => ClickTarget::Selector { selector },
                    (None, Some(x), Some(y)) => ClickTarget::Point { x, y },
                    _ => return Err("click requires either a selector or both x and y".to_string()),
                };
                Ok(Click {
                    target,
                    button,
                    click_count: click_count.unwrap_or(1),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeText {
    pub selector: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Millis>,
    #[serde(default)]
    pub clear: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HoverRepr")]
pub struct Hover {
    pub selector: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HoverRepr {
    Selector(String),
    Full { selector: String },
}

impl From<HoverRepr> for Hover {
    fn from(repr: HoverRepr) -> Self {
        match repr {
            HoverRepr::Selector(selector) | HoverRepr::Full { selector } => Hover { selector },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PressRepr")]
pub struct Press {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PressRepr {
    Key(String),
    Full {
        key: String,
        #[serde(default)]
        selector: Option<String>,
    },
}

impl From<PressRepr> for Press {
    fn from(repr: PressRepr) -> Self {
        match repr {
            PressRepr::Key(key) => Press { key, selector: None },
            PressRepr::Full { key, selector } => Press { key, selector },
        }
    }
}

// === Захват ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScreenshotRepr", rename_all = "camelCase")]
pub struct Screenshot {
    pub path: String,
    pub full_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScreenshotRepr {
    Path(String),
    #[serde(rename_all = "camelCase")]
    Full {
        path: String,
        #[serde(default)]
        full_page: bool,
        #[serde(default)]
        selector: Option<String>,
    },
}

impl From<ScreenshotRepr> for Screenshot {
    fn from(repr: ScreenshotRepr) -> Self {
        match repr {
            ScreenshotRepr::Path(path) => Screenshot {
                path,
                full_page: false,
                selector: None,
            },
            ScreenshotRepr::Full {
                path,
                full_page,
                selector,
            } => Screenshot {
                path,
                full_page,
                selector,
            },
        }
    }
}

// === Проверки ===

/// Политика по умолчанию для `throwOnFail`: остановить программу при
/// первой проваленной проверке.
pub const DEFAULT_THROW_ON_FAIL: bool = true;

/// Шаг `assert`. Все заданные виды проверок вычисляются как конъюнкция.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Assert {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Millis>,
    #[serde(default = "default_throw_on_fail")]
    pub throw_on_fail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_throw_on_fail() -> bool {
    DEFAULT_THROW_ON_FAIL
}

// === Сканирование ===

/// Шаг `scan`: настройки анализа совместимости и пауза после него.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScanRepr", rename_all = "camelCase")]
pub struct Scan {
    pub availability: BTreeSet<Availability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub not_baseline: bool,
    pub strictness: Strictness,
    pub delay: Option<Millis>,
}

impl Scan {
    /// Настройки анализа, которые передаются анализатору.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            include_availability: self.availability.clone(),
            baseline_year_threshold: self.year,
            include_not_baseline: self.not_baseline,
            strictness: self.strictness,
        }
    }
}

impl Default for Scan {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        Scan {
            availability: config.include_availability,
            year: config.baseline_year_threshold,
            not_baseline: config.include_not_baseline,
            strictness: config.strictness,
            delay: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScanRepr {
    Enabled(bool),
    #[serde(rename_all = "camelCase")]
    Full {
        #[serde(default)]
        availability: Option<BTreeSet<Availability>>,
        #[serde(default)]
        year: Option<i32>,
        #[serde(default)]
        not_baseline: Option<bool>,
        #[serde(default)]
        strictness: Option<Strictness>,
        #[serde(default)]
        delay: Option<Millis>,
    },
}

impl From<ScanRepr> for Scan {
    fn from(repr: ScanRepr) -> Self {
        let defaults = Scan::default();
        match repr {
            ScanRepr::Enabled(enabled) => {
                debug_assert!(enabled, "disabled scan steps are rejected before decoding");
                defaults
            }
            ScanRepr::Full {
                availability,
                year,
                not_baseline,
                strictness,
                delay,
            } => Scan {
                availability: availability.unwrap_or(defaults.availability),
                year: year.or(defaults.year),
                not_baseline: not_baseline.unwrap_or(defaults.not_baseline),
                strictness: strictness.unwrap_or(defaults.strictness),
                delay,
            },
        }
    }
}

// === Прокрутка ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollEdge {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

impl ScrollBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollBehavior::Auto => "auto",
            ScrollBehavior::Smooth => "smooth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollTarget {
    Edge(ScrollEdge),
    Selector(String),
    Point { x: f64, y: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScrollRepr")]
pub struct Scroll {
    pub target: ScrollTarget,
    pub behavior: ScrollBehavior,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScrollRepr {
    Edge(ScrollEdge),
    Full {
        #[serde(default)]
        to: Option<ScrollEdge>,
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default)]
        behavior: ScrollBehavior,
    },
}

impl TryFrom<ScrollRepr> for Scroll {
    type Error = String;

    fn try_from(repr: ScrollRepr) -> Result<Self, Self::Error> {
        match repr {
            ScrollRepr::Edge(edge) => Ok(Scroll {
                target: ScrollTarget::Edge(edge),
                behavior: ScrollBehavior::Auto,
            }),
            ScrollRepr::Full {
                to,
                selector,
                x,
                y,
                behavior,
            } => {
                let target = match (to, selector, x, y) {
                    (Some(edge), None, None, None) => ScrollTarget::Edge(edge),
                    (None, Some(selector), None, None) => ScrollTarget::Selector(selector),
                    (None, None, x, y) if x.is_some() || y.is_some() => ScrollTarget::Point {
                        x: x.unwrap_or(0.0),
                        y: y.unwrap_or(0.0),
                    },
                    _ => return Err("scroll requires exactly one of to, selector or x/y".to_string()),
                };
                Ok(Scroll { target, behavior })
            }
        }
    }
}
