//! Обработчики бэкендов.
//!
//! Каждый бэкенд реализует весь набор команд; различается только
//! синтаксис сгенерированного текста. Диспетчеризация - исчерпывающий
//! `match` по [`Command`], так что «команда без обработчика» невозможна.
//! Единственный задокументированный no-op - `wait` нулевой длительности:
//! он одинаков для всех бэкендов и не порождает кода.

pub mod js;
pub mod playwright;
pub mod puppeteer;
pub mod selenium;

use crate::config::CompileOptions;
use crate::ir::{Command, Teardown};
use crate::script::model::{
    Assert, Backend, BrowserSetup, Click, Goto, Hover, Press, Scan, Screenshot, Scroll, TypeText, Wait,
};

pub use js::Runtime;
pub use playwright::Playwright;
pub use puppeteer::Puppeteer;
pub use selenium::Selenium;

/// Генератор кода одного бэкенда.
pub trait BackendHandler {
    fn backend(&self) -> Backend;

    /// Части пролога, специфичные для бэкенда.
    fn runtime(&self) -> Runtime;

    fn browser(&self, setup: &BrowserSetup) -> String;
    fn goto(&self, step: &Goto, options: &CompileOptions) -> String;
    fn wait(&self, step: &Wait, options: &CompileOptions) -> String;
    fn click(&self, step: &Click, options: &CompileOptions) -> String;
    fn type_text(&self, step: &TypeText, options: &CompileOptions) -> String;
    fn hover(&self, step: &Hover, options: &CompileOptions) -> String;
    fn press(&self, step: &Press, options: &CompileOptions) -> String;
    fn screenshot(&self, step: &Screenshot, options: &CompileOptions) -> String;
    fn assert(&self, step: &Assert, options: &CompileOptions) -> String;
    fn scan(&self, step: &Scan) -> String;
    fn scroll(&self, step: &Scroll, options: &CompileOptions) -> String;
    fn teardown(&self, step: &Teardown) -> String;
}

/// Обработчик для бэкенда.
pub fn handler_for(backend: Backend) -> &'static dyn BackendHandler {
    match backend {
        Backend::Puppeteer => &Puppeteer,
        Backend::Playwright => &Playwright,
        Backend::Selenium => &Selenium,
    }
}

/// Текст одной команды. `None` - команда ничего не делает.
pub fn handle(handler: &dyn BackendHandler, command: &Command, options: &CompileOptions) -> Option<String> {
    let text = match command {
        Command::Framework(backend) => js::prologue(*backend, &handler.runtime(), options),
        Command::Browser(setup) => handler.browser(setup),
        Command::Goto(step) => handler.goto(step, options),
        Command::Wait(Wait::Duration { duration }) if duration.is_zero() => return None,
        Command::Wait(step) => handler.wait(step, options),
        Command::Click(step) => handler.click(step, options),
        Command::Type(step) => handler.type_text(step, options),
        Command::Hover(step) => handler.hover(step, options),
        Command::Press(step) => handler.press(step, options),
        Command::Screenshot(step) => handler.screenshot(step, options),
        Command::Assert(step) => handler.assert(step, options),
        Command::Scan(step) => handler.scan(step),
        Command::Scroll(step) => handler.scroll(step, options),
        Command::Teardown(step) => handler.teardown(step),
    };
    Some(text)
}
