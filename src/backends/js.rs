//! Общая часть генерируемого JavaScript.
//!
//! Все бэкенды выдают ES-модуль для Node.js. Здесь лежат литералы,
//! общий рантайм (`__ack`, `__sleep`, `__assert`, `__compatScan`) и
//! сборка пролога из частей конкретного бэкенда.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::compat::AnalysisConfig;
use crate::config::CompileOptions;
use crate::duration::Millis;
use crate::script::model::{Assert, Backend, Scan, ScrollBehavior, ScrollEdge, ScrollTarget};

/// Пауза после сканирования, если в шаге она не задана.
pub const DEFAULT_SCAN_DELAY_MS: u64 = 1_000;

/// Части пролога, которые различаются между бэкендами.
#[derive(Debug, Clone, Copy)]
pub struct Runtime {
    /// Строки `import`.
    pub imports: &'static str,
    /// Объявления `let browser; let page;` и т.п.
    pub bindings: &'static str,
    /// `async function __probe(selector, timeout)` → `{ found, text, visible }`.
    pub probe: &'static str,
    /// `__pageEval(fn, arg)`: выполнить функцию в контексте страницы.
    pub page_eval: &'static str,
}

/// Строковый литерал JS.
pub fn lit(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Таймаут шага или значение по умолчанию из конфигурации.
pub fn timeout(step: Option<Millis>, options: &CompileOptions) -> u64 {
    step.unwrap_or(options.compiler.default_timeout).as_u64()
}

/// Сдвинуть каждую непустую строку на два пробела.
pub fn indent(block: &str) -> String {
    let mut out = String::with_capacity(block.len() + 16);
    for line in block.lines() {
        if !line.is_empty() {
            out.push_str("  ");
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Подтверждение выполненного шага.
pub fn ack(index: usize, command: &str) -> String {
    format!("__ack({}, {});\n", index, lit(command))
}

const SHARED_RUNTIME: &str = r#"const __ack = (index, command) => console.log(JSON.stringify({ type: "step", index, command }));
const __sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));

async function __assert(spec) {
  const probe = await __probe(spec.selector, spec.timeout);
  const failures = [];
  if (spec.exists === false) {
    if (probe.found) failures.push("expected element to be absent");
  } else if (!probe.found) {
    failures.push("element not found");
  }
  if (spec.contains !== undefined && !probe.text.includes(spec.contains)) {
    failures.push(`text does not contain ${JSON.stringify(spec.contains)}`);
  }
  if (spec.equals !== undefined && probe.text.trim() !== spec.equals) {
    failures.push(`text is ${JSON.stringify(probe.text.trim())}, expected ${JSON.stringify(spec.equals)}`);
  }
  if (spec.matches !== undefined && !new RegExp(spec.matches).test(probe.text)) {
    failures.push(`text does not match /${spec.matches}/`);
  }
  if (spec.visible !== undefined && probe.visible !== spec.visible) {
    failures.push(spec.visible ? "element is not visible" : "element is visible");
  }
  const ok = failures.length === 0;
  console.log(JSON.stringify({ type: "assert", selector: spec.selector, ok, failures }));
  if (!ok) {
    const message = spec.message ?? `assertion failed for ${spec.selector}: ${failures.join("; ")}`;
    if (spec.throwOnFail) throw new Error(message);
    console.error(message);
  }
}

async function __scrollWindow(target) {
  await __pageEval((t) => {
    const height = document.documentElement.scrollHeight;
    const top = t.edge === "top" ? 0 : t.edge === "bottom" ? height : t.y;
    const left = t.edge ? window.scrollX : t.x;
    window.scrollTo({ top, left, behavior: t.behavior });
  }, target);
}

async function __compatScan(config, framework) {
  const sheets = await __pageEval(async () => {
    const out = [];
    for (const sheet of Array.from(document.styleSheets)) {
      try {
        out.push({ href: sheet.href, text: Array.from(sheet.cssRules).map((r) => r.cssText).join("\n") });
      } catch (e) {
        if (!sheet.href) continue;
        try {
          out.push({ href: sheet.href, text: await (await fetch(sheet.href)).text() });
        } catch (_) {}
      }
    }
    return out;
  });

  const [bin, ...pre] = __ANALYZER.command;
  const args = [...pre, "analyze", "--input", "json", "--format", "plan", "--config", JSON.stringify(config)];
  if (__ANALYZER.registry) args.push("--registry", __ANALYZER.registry);

  let plan;
  try {
    const output = execFileSync(bin, args, { input: JSON.stringify(sheets), encoding: "utf8", maxBuffer: 64 * 1024 * 1024 });
    plan = JSON.parse(output);
  } catch (e) {
    console.error(`compat scan failed: ${e.message}`);
    plan = { report: [], marks: [] };
  }

  for (const mark of plan.marks) {
    try {
      const failures = await __pageEval((m) => {
        const failed = [];
        for (const el of document.querySelectorAll(m.selector)) {
          try {
            el.style.outline = `2px solid ${m.color}`;
            el.setAttribute("title", m.title);
          } catch (e) {
            console.warn(`highlight skipped for element of ${m.selector}: ${e.message}`);
            failed.push(e.message);
          }
        }
        return failed;
      }, mark);
      for (const message of failures ?? []) {
        console.warn(`highlight skipped for element of ${mark.selector}: ${message}`);
      }
    } catch (e) {
      console.warn(`highlight skipped for ${mark.selector}: ${e.message}`);
    }
  }

  console.log(JSON.stringify({ type: "scan", framework, report: plan.report }));
  await __sleep(config.delay ?? 0);
}
"#;

/// Пролог программы: импорты, привязки и общий рантайм.
pub fn prologue(backend: Backend, runtime: &Runtime, options: &CompileOptions) -> String {
    let analyzer = json!({
        "command": options.analyzer.command.split_whitespace().collect::<Vec<_>>(),
        "registry": options.analyzer.registry,
    });

    let mut out = String::new();
    let _ = writeln!(out, "// Generated by autoscript for {}. Do not edit.", backend);
    out.push_str(runtime.imports);
    out.push_str("import { execFileSync } from \"node:child_process\";\n\n");
    let _ = writeln!(out, "const __ANALYZER = {};", analyzer);
    out.push_str(runtime.bindings);
    out.push('\n');
    out.push_str(SHARED_RUNTIME);
    out.push('\n');
    out.push_str(runtime.page_eval);
    out.push('\n');
    out.push_str(runtime.probe);
    out
}

/// Вызов общего `__assert`. Таймаут подставляется всегда.
pub fn assert_call(step: &Assert, options: &CompileOptions) -> String {
    let mut spec = Map::new();
    spec.insert("selector".into(), Value::from(step.selector.as_str()));
    if let Some(exists) = step.exists {
        spec.insert("exists".into(), Value::from(exists));
    }
    if let Some(contains) = &step.contains {
        spec.insert("contains".into(), Value::from(contains.as_str()));
    }
    if let Some(equals) = &step.equals {
        spec.insert("equals".into(), Value::from(equals.as_str()));
    }
    if let Some(matches) = &step.matches {
        spec.insert("matches".into(), Value::from(matches.as_str()));
    }
    if let Some(visible) = step.visible {
        spec.insert("visible".into(), Value::from(visible));
    }
    spec.insert("timeout".into(), Value::from(timeout(step.timeout, options)));
    spec.insert("throwOnFail".into(), Value::from(step.throw_on_fail));
    if let Some(message) = &step.message {
        spec.insert("message".into(), Value::from(message.as_str()));
    }
    format!("await __assert({});\n", Value::Object(spec))
}

/// Настройки сканирования в том виде, в котором их принимает анализатор.
pub fn scan_config(step: &Scan) -> Value {
    let payload = ScanPayload {
        config: step.analysis_config(),
        delay: step.delay.map_or(DEFAULT_SCAN_DELAY_MS, Millis::as_u64),
    };
    json!(payload)
}

#[derive(Serialize)]
struct ScanPayload {
    #[serde(flatten)]
    config: AnalysisConfig,
    delay: u64,
}

/// Единственное место, где программа обращается к анализатору.
pub fn scan_call(step: &Scan, backend: Backend) -> String {
    format!("await __compatScan({}, {});\n", scan_config(step), lit(backend.tag()))
}

/// Прокрутка окна к краю или точке через `__scrollWindow`. Для селектора
/// `None`: его прокручивает сам бэкенд.
pub fn scroll_window_call(target: &ScrollTarget, behavior: ScrollBehavior) -> Option<String> {
    let target = match target {
        ScrollTarget::Edge(edge) => json!({
            "edge": match edge {
                ScrollEdge::Top => "top",
                ScrollEdge::Bottom => "bottom",
            },
            "behavior": behavior.as_str(),
        }),
        ScrollTarget::Point { x, y } => json!({ "x": x, "y": y, "behavior": behavior.as_str() }),
        ScrollTarget::Selector(_) => return None,
    };
    Some(format!("await __scrollWindow({});\n", target))
}
