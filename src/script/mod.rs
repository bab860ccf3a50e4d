//! Модуль сценариев.
//!
//! Сценарий - YAML-документ (JSON тоже допустим) из трёх полей:
//!
//! ```yaml
//! framework: playwright          # puppeteer | playwright | selenium
//! browser:
//!   mode: connect                # launch | connect
//!   connect:
//!     wsUrl: ws://127.0.0.1:9222/devtools/browser/abc
//! steps:
//!   - goto: https://example.com
//!   - assert: { selector: h1, contains: Example }
//!   - scan: { availability: [low], notBaseline: true }
//!   - screenshot: shot.png
//! ```
//!
//! Разбор идёт в два этапа: текст → [`serde_json::Value`] → проверка
//! [`schema::validate`] → типизированный [`ScriptDoc`].

pub mod model;
pub mod schema;

pub use model::{Backend, BrowserMode, BrowserSetup, ScriptDoc, Step};
pub use schema::validate;

use serde_json::Value;

use crate::error::{SchemaViolation, ScriptError, ScriptResult};

/// Разобрать текст сценария в нетипизированный документ.
pub fn parse_document(source: &str) -> ScriptResult<Value> {
    let doc: Value = serde_yml::from_str(source).map_err(|e| ScriptError::Syntax(e.to_string()))?;
    if doc.is_null() {
        return Err(ScriptError::Syntax("script is empty".to_string()));
    }
    Ok(doc)
}

/// Проверить документ и декодировать его в типизированную модель.
pub fn decode(doc: &Value) -> ScriptResult<ScriptDoc> {
    validate(doc)?;
    serde_json::from_value(doc.clone())
        .map_err(|e| ScriptError::Schema(SchemaViolation::new("$", e.to_string())))
}

/// Разобрать, проверить и декодировать текст сценария.
pub fn load(source: &str) -> ScriptResult<ScriptDoc> {
    let doc = parse_document(source)?;
    decode(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::model::{ClickTarget, ScrollTarget, Wait};

    #[test]
    fn test_load_yaml() {
        let source = r#"
framework: playwright
browser:
  mode: launch
  launch:
    headless: false
    viewport: { width: 1280, height: 720 }
steps:
  - goto: https://example.com
  - click: { x: 5, y: 7 }
  - wait: 2s
  - scroll: bottom
"#;
        let script = load(source).unwrap();
        assert_eq!(script.framework, Backend::Playwright);
        assert_eq!(script.browser.mode, BrowserMode::Launch);
        assert_eq!(script.steps.len(), 4);

        match &script.steps[1] {
            Step::Click(click) => assert_eq!(click.target, ClickTarget::Point { x: 5.0, y: 7.0 }),
            other => panic!("Expected click, got {:?}", other),
        }
        match &script.steps[2] {
            Step::Wait(Wait::Duration { duration }) => assert_eq!(duration.as_u64(), 2000),
            other => panic!("Expected wait, got {:?}", other),
        }
        match &script.steps[3] {
            Step::Scroll(scroll) => assert!(matches!(
                scroll.target,
                ScrollTarget::Edge(crate::script::model::ScrollEdge::Bottom)
            )),
            other => panic!("Expected scroll, got {:?}", other),
        }
    }

    #[test]
    fn test_load_json() {
        let source = r#"{"framework": "selenium", "browser": {"mode": "connect", "connect": {"wsUrl": "ws://x"}}, "steps": []}"#;
        let script = load(source).unwrap();
        assert_eq!(script.framework, Backend::Selenium);
        assert_eq!(
            script.browser.connect.map(|c| c.ws_url),
            Some("ws://x".to_string())
        );
    }

    #[test]
    fn test_empty_steps_key() {
        let script = load("framework: puppeteer\nbrowser: { mode: launch }\nsteps:\n").unwrap();
        assert!(script.steps.is_empty());

        let script = load(r#"{"framework": "puppeteer", "browser": {"mode": "launch"}, "steps": null}"#).unwrap();
        assert!(script.steps.is_empty());
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(load("framework: [unclosed"), Err(ScriptError::Syntax(_))));
        assert!(matches!(load(""), Err(ScriptError::Syntax(_))));
    }

    #[test]
    fn test_schema_error_is_fatal() {
        let source = "framework: puppeteer\nbrowser: { mode: launch }\nsteps:\n  - click: {}\n";
        match load(source) {
            Err(ScriptError::Schema(v)) => assert_eq!(v.field, "steps[0].click"),
            other => panic!("Expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_assert_defaults_to_stop_on_fail() {
        let source = "framework: puppeteer\nbrowser: { mode: launch }\nsteps:\n  - assert: { selector: h1, exists: true }\n";
        let script = load(source).unwrap();
        match &script.steps[0] {
            Step::Assert(assert) => assert!(assert.throw_on_fail),
            other => panic!("Expected assert, got {:?}", other),
        }
    }
}
