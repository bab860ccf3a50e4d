//! Промежуточное представление (IR).
//!
//! Плоская упорядоченная последовательность команд:
//! `framework` → `browser` → шаги в порядке объявления → `close`.
//! Последняя команда всегда синтезируется и описывает освобождение
//! браузера: `close` для запущенного экземпляра, `disconnect` для
//! подключения к чужому.

use serde::Serialize;

use crate::error::ScriptResult;
use crate::script::model::{
    Assert, Backend, BrowserMode, BrowserSetup, Click, Goto, Hover, Press, Scan, ScriptDoc, Screenshot, Scroll, Step,
    TypeText, Wait,
};

/// Способ освободить браузер.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownOp {
    Close,
    Disconnect,
}

impl TeardownOp {
    /// Операция для режима подключения.
    pub fn for_mode(mode: BrowserMode) -> Self {
        match mode {
            BrowserMode::Launch => TeardownOp::Close,
            BrowserMode::Connect => TeardownOp::Disconnect,
        }
    }
}

/// Значение команды `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Teardown {
    pub operation: TeardownOp,
}

/// Команда IR: `{ name, value }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "value", rename_all = "lowercase")]
pub enum Command {
    Framework(Backend),
    Browser(BrowserSetup),
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
    #[serde(rename = "close")]
    Teardown(Teardown),
}

impl Command {
    /// Имя команды.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Framework(_) => "framework",
            Command::Browser(_) => "browser",
            Command::Goto(_) => "goto",
            Command::Wait(_) => "wait",
            Command::Click(_) => "click",
            Command::Type(_) => "type",
            Command::Hover(_) => "hover",
            Command::Press(_) => "press",
            Command::Screenshot(_) => "screenshot",
            Command::Assert(_) => "assert",
            Command::Scan(_) => "scan",
            Command::Scroll(_) => "scroll",
            Command::Teardown(_) => "close",
        }
    }

    fn from_step(step: &Step) -> Option<Command> {
        let command = match step {
            Step::Goto(goto) => Command::Goto(goto.clone()),
            Step::Wait(wait) => Command::Wait(wait.clone()),
            Step::Click(click) => Command::Click(click.clone()),
            Step::Type(text) => Command::Type(text.clone()),
            Step::Hover(hover) => Command::Hover(hover.clone()),
            Step::Press(press) => Command::Press(press.clone()),
            Step::Screenshot(shot) => Command::Screenshot(shot.clone()),
            Step::Assert(assert) => Command::Assert(assert.clone()),
            Step::Scan(scan) => Command::Scan(scan.clone()),
            Step::Scroll(scroll) => Command::Scroll(scroll.clone()),
            // Явный `close` поглощается синтезированной командой.
            Step::Close(_) => return None,
        };
        Some(command)
    }
}

/// IR одного сценария. Никогда не пуст, последняя команда всегда `close`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ir {
    commands: Vec<Command>,
}

impl Ir {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Выбранный бэкенд.
    pub fn backend(&self) -> Option<Backend> {
        self.commands.iter().find_map(|c| match c {
            Command::Framework(backend) => Some(*backend),
            _ => None,
        })
    }

    /// Завершающая команда.
    pub fn teardown(&self) -> Option<&Teardown> {
        match self.commands.last() {
            Some(Command::Teardown(teardown)) => Some(teardown),
            _ => None,
        }
    }

    /// JSON-представление `[{name, value}]`.
    pub fn to_json(&self) -> ScriptResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Построить IR из проверенного документа.
pub fn generate_ir(script: &ScriptDoc) -> ScriptResult<Ir> {
    let setup = script.browser.setup()?;
    let operation = TeardownOp::for_mode(setup.mode());

    let mut commands = Vec::with_capacity(script.steps.len() + 3);
    commands.push(Command::Framework(script.framework));
    commands.push(Command::Browser(setup));
    commands.extend(script.steps.iter().filter_map(Command::from_step));
    commands.push(Command::Teardown(Teardown { operation }));

    log::info!(
        "generated IR: {} commands for {}, teardown {:?}",
        commands.len(),
        script.framework,
        operation
    );
    Ok(Ir { commands })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;

    fn ir_for(source: &str) -> Ir {
        generate_ir(&script::load(source).unwrap()).unwrap()
    }

    #[test]
    fn test_minimal_ir() {
        let ir = ir_for("framework: puppeteer\nbrowser: { mode: launch }\n");
        let names: Vec<&str> = ir.commands().iter().map(Command::name).collect();
        assert_eq!(names, vec!["framework", "browser", "close"]);
        assert_eq!(ir.backend(), Some(Backend::Puppeteer));
        assert_eq!(ir.teardown().unwrap().operation, TeardownOp::Close);
    }

    #[test]
    fn test_steps_keep_order_and_close_is_absorbed() {
        let ir = ir_for(
            "framework: selenium\nbrowser: { mode: connect, connect: { wsUrl: 'ws://x' } }\nsteps:\n  - goto: https://a.test\n  - hover: '#m'\n  - press: Enter\n  - close: true\n",
        );
        let names: Vec<&str> = ir.commands().iter().map(Command::name).collect();
        assert_eq!(names, vec!["framework", "browser", "goto", "hover", "press", "close"]);
        assert_eq!(ir.teardown().unwrap().operation, TeardownOp::Disconnect);
    }

    #[test]
    fn test_ir_json_shape() {
        let ir = ir_for("framework: playwright\nbrowser: { mode: connect, connect: { wsUrl: 'ws://x' } }\nsteps:\n  - goto: https://a.test\n");
        let json: serde_json::Value = serde_json::from_str(&ir.to_json().unwrap()).unwrap();
        assert_eq!(json[0], serde_json::json!({"name": "framework", "value": "playwright"}));
        assert_eq!(json[1]["name"], "browser");
        assert_eq!(json[1]["value"]["mode"], "connect");
        assert_eq!(json[1]["value"]["wsUrl"], "ws://x");
        assert_eq!(json[2]["value"]["url"], "https://a.test");
        assert_eq!(json[3], serde_json::json!({"name": "close", "value": {"operation": "disconnect"}}));
    }
}
