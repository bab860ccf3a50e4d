//! Синтез программы из IR.
//!
//! Обработчик выбирается по первой команде `framework`, которая же
//! выдаёт пролог. Каждая следующая команда оборачивается в блок
//! `{ ... }` с заголовком `// [index] name` и завершается вызовом
//! `__ack(index, "name")`. Вывод детерминирован: один и тот же IR даёт
//! побайтно одинаковый текст.

use serde::Serialize;

use crate::backends::{self, js};
use crate::config::CompileOptions;
use crate::error::{SchemaViolation, ScriptResult};
use crate::ir::{Command, Ir};
use crate::script::model::Backend;

/// Подтверждённый шаг программы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepMarker {
    pub index: usize,
    pub command: &'static str,
}

/// Результат синтеза.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub backend: Backend,
    pub text: String,
    pub markers: Vec<StepMarker>,
    /// Команды, для которых обработчик не выдал кода.
    pub skipped: Vec<StepMarker>,
}

pub fn synthesize(ir: &Ir, options: &CompileOptions) -> ScriptResult<Program> {
    let backend = ir
        .backend()
        .ok_or_else(|| SchemaViolation::new("framework", "IR has no backend selection"))?;
    let handler = backends::handler_for(backend);

    let mut text = String::new();
    let mut markers = Vec::new();
    let mut skipped = Vec::new();

    for (index, command) in ir.commands().iter().enumerate() {
        let marker = StepMarker {
            index,
            command: command.name(),
        };
        let Some(body) = backends::handle(handler, command, options) else {
            log::warn!("[{}] {} produced no code for {}, skipped", index, marker.command, backend);
            skipped.push(marker);
            continue;
        };

        if let Command::Framework(_) = command {
            text.push_str(&body);
        } else {
            text.push_str(&format!("\n// [{}] {}\n{{\n", index, marker.command));
            text.push_str(&js::indent(&body));
            text.push_str("}\n");
        }
        text.push_str(&js::ack(index, marker.command));
        markers.push(marker);
    }

    log::info!(
        "synthesized {} program: {} steps, {} skipped, {} bytes",
        backend,
        markers.len(),
        skipped.len(),
        text.len()
    );
    Ok(Program {
        backend,
        text,
        markers,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::generate_ir;
    use crate::script;

    fn program(source: &str) -> Program {
        let ir = generate_ir(&script::load(source).unwrap()).unwrap();
        synthesize(&ir, &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_blocks_and_acks() {
        let program = program(
            "framework: puppeteer\nbrowser: { mode: launch }\nsteps:\n  - goto: https://a.test\n",
        );
        assert!(program.text.starts_with("// Generated by autoscript for puppeteer"));
        assert!(program.text.contains("\n// [2] goto\n{\n  await page.goto(\"https://a.test\""));
        assert!(program.text.contains("}\n__ack(2, \"goto\");\n"));
        assert!(program.text.ends_with("__ack(3, \"close\");\n"));

        let names: Vec<&str> = program.markers.iter().map(|m| m.command).collect();
        assert_eq!(names, vec!["framework", "browser", "goto", "close"]);
        assert!(program.skipped.is_empty());
    }

    #[test]
    fn test_zero_wait_is_skipped_without_ack() {
        let program = program(
            "framework: playwright\nbrowser: { mode: launch }\nsteps:\n  - wait: 0\n  - wait: 1s\n",
        );
        assert_eq!(program.skipped, vec![StepMarker { index: 2, command: "wait" }]);
        assert!(!program.text.contains("__ack(2,"));
        assert!(program.text.contains("__ack(3, \"wait\");"));
        assert!(program.text.contains("waitForTimeout(1000)"));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let source = "framework: selenium\nbrowser: { mode: connect, connect: { wsUrl: 'ws://x' } }\nsteps:\n  - scan: true\n  - assert: { selector: h1, visible: true }\n";
        assert_eq!(program(source).text, program(source).text);
    }
}
