//! Валидатор схемы сценария.
//!
//! Проверяет разобранный документ против грамматики команд до генерации
//! IR. Ошибка фатальна для всей компиляции и указывает путь к полю.

use serde_json::{Map, Value};

use crate::duration::parse_duration;
use crate::error::SchemaViolation;
use crate::script::model::Backend;

type Check = Result<(), SchemaViolation>;

/// Имена команд, допустимых в `steps`.
pub const STEP_COMMANDS: [&str; 11] = [
    "goto",
    "wait",
    "click",
    "type",
    "hover",
    "press",
    "screenshot",
    "assert",
    "scan",
    "scroll",
    "close",
];

/// Виды проверок шага `assert`.
pub const ASSERTION_KINDS: [&str; 5] = ["exists", "contains", "equals", "matches", "visible"];

/// Проверить документ. Документ не изменяется.
pub fn validate(doc: &Value) -> Check {
    let root = doc
        .as_object()
        .ok_or_else(|| SchemaViolation::new("$", "script must be a mapping"))?;

    for key in root.keys() {
        if !matches!(key.as_str(), "framework" | "browser" | "steps") {
            return Err(SchemaViolation::new(key, "unknown top-level field"));
        }
    }

    check_framework(root.get("framework"))?;

    let browser = root
        .get("browser")
        .ok_or_else(|| SchemaViolation::new("browser", "missing browser configuration"))?;
    check_browser(browser)?;

    match root.get("steps") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(steps)) => check_steps(steps),
        Some(_) => Err(SchemaViolation::new("steps", "must be a list of commands")),
    }
}

fn check_framework(value: Option<&Value>) -> Check {
    let tag = match value {
        None => return Err(SchemaViolation::new("framework", "missing backend selection")),
        Some(Value::String(tag)) => tag,
        Some(_) => return Err(SchemaViolation::new("framework", "must be a string")),
    };
    if Backend::from_tag(tag).is_none() {
        return Err(SchemaViolation::new(
            "framework",
            format!("unknown backend '{}', expected one of puppeteer, playwright, selenium", tag),
        ));
    }
    Ok(())
}

fn check_browser(value: &Value) -> Check {
    let browser = object(value, "browser")?;
    allow_keys(browser, "browser", &["mode", "launch", "connect"])?;

    let mode = match browser.get("mode") {
        Some(Value::String(mode)) => mode.as_str(),
        Some(_) => return Err(SchemaViolation::new("browser.mode", "must be a string")),
        None => return Err(SchemaViolation::new("browser.mode", "missing connection mode")),
    };

    let launch = browser.get("launch").filter(|v| !v.is_null());
    let connect = browser.get("connect").filter(|v| !v.is_null());

    match (mode, launch, connect) {
        (_, Some(_), Some(_)) => Err(SchemaViolation::new(
            "browser",
            "launch and connect are mutually exclusive",
        )),
        ("launch", None, Some(_)) => Err(SchemaViolation::new(
            "browser.connect",
            "connect options given but mode is launch",
        )),
        ("connect", Some(_), None) => Err(SchemaViolation::new(
            "browser.launch",
            "launch options given but mode is connect",
        )),
        ("launch", launch, None) => match launch {
            Some(options) => check_launch(options),
            None => Ok(()),
        },
        ("connect", None, Some(options)) => check_connect(options),
        ("connect", None, None) => Err(SchemaViolation::new(
            "browser.connect",
            "connect mode requires a connection endpoint",
        )),
        (other, _, _) => Err(SchemaViolation::new(
            "browser.mode",
            format!("unknown mode '{}', expected launch or connect", other),
        )),
    }
}

fn check_launch(value: &Value) -> Check {
    let path = "browser.launch";
    let launch = object(value, path)?;
    allow_keys(launch, path, &["headless", "args", "viewport", "executablePath"])?;
    optional_bool(launch, path, "headless")?;
    optional_string(launch, path, "executablePath")?;

    if let Some(args) = launch.get("args") {
        let items = args
            .as_array()
            .ok_or_else(|| SchemaViolation::new(format!("{}.args", path), "must be a list of strings"))?;
        if items.iter().any(|arg| !arg.is_string()) {
            return Err(SchemaViolation::new(format!("{}.args", path), "must be a list of strings"));
        }
    }

    if let Some(viewport) = launch.get("viewport") {
        let vp_path = format!("{}.viewport", path);
        let viewport = object(viewport, &vp_path)?;
        allow_keys(viewport, &vp_path, &["width", "height"])?;
        for key in ["width", "height"] {
            match viewport.get(key) {
                Some(v) if v.as_u64().is_some_and(|n| n > 0 && n <= u32::MAX as u64) => {}
                _ => {
                    return Err(SchemaViolation::new(
                        format!("{}.{}", vp_path, key),
                        "must be a positive integer",
                    ))
                }
            }
        }
    }
    Ok(())
}

fn check_connect(value: &Value) -> Check {
    let path = "browser.connect";
    let connect = object(value, path)?;
    allow_keys(connect, path, &["wsUrl"])?;
    required_string(connect, path, "wsUrl")
}

fn check_steps(steps: &[Value]) -> Check {
    for (index, step) in steps.iter().enumerate() {
        let path = format!("steps[{}]", index);
        let entry = object(step, &path)?;
        if entry.len() != 1 {
            return Err(SchemaViolation::new(
                path,
                format!("a step must have exactly one command key, found {}", entry.len()),
            ));
        }
        let Some((name, payload)) = entry.iter().next() else {
            continue;
        };
        let path = format!("{}.{}", path, name);
        check_step(name, payload, &path)?;

        if name == "close" && index + 1 != steps.len() {
            return Err(SchemaViolation::new(path, "close must be the last step"));
        }
    }
    Ok(())
}

/// Проверить полезную нагрузку одной команды.
pub fn check_step(name: &str, payload: &Value, path: &str) -> Check {
    match name {
        "goto" => check_goto(payload, path),
        "wait" => check_wait(payload, path),
        "click" => check_click(payload, path),
        "type" => check_type(payload, path),
        "hover" => shorthand_or_object(payload, path, "selector", &["selector"]),
        "press" => check_press(payload, path),
        "screenshot" => check_screenshot(payload, path),
        "assert" => check_assert(payload, path),
        "scan" => check_scan(payload, path),
        "scroll" => check_scroll(payload, path),
        "close" => match payload {
            Value::Bool(true) => Ok(()),
            _ => Err(SchemaViolation::new(path, "close takes the value true")),
        },
        other => Err(SchemaViolation::new(
            path,
            format!("unknown command '{}', expected one of {}", other, STEP_COMMANDS.join(", ")),
        )),
    }
}

fn check_goto(payload: &Value, path: &str) -> Check {
    if let Value::String(url) = payload {
        return non_empty(url, path);
    }
    let goto = object(payload, path)?;
    allow_keys(goto, path, &["url", "waitUntil", "timeout"])?;
    required_string(goto, path, "url")?;
    optional_enum(goto, path, "waitUntil", &["load", "domcontentloaded", "networkidle"])?;
    optional_duration(goto, path, "timeout")
}

fn check_wait(payload: &Value, path: &str) -> Check {
    if !payload.is_object() {
        return duration(payload, path);
    }
    let wait = object(payload, path)?;
    allow_keys(wait, path, &["duration", "selector", "timeout", "visible"])?;
    match (wait.contains_key("duration"), wait.contains_key("selector")) {
        (true, true) => Err(SchemaViolation::new(path, "duration and selector are mutually exclusive")),
        (false, false) => Err(SchemaViolation::new(path, "wait requires a duration or a selector")),
        (true, false) => {
            if wait.contains_key("timeout") || wait.contains_key("visible") {
                return Err(SchemaViolation::new(path, "timeout and visible apply only to selector waits"));
            }
            optional_duration(wait, path, "duration")
        }
        (false, true) => {
            required_string(wait, path, "selector")?;
            optional_duration(wait, path, "timeout")?;
            optional_bool(wait, path, "visible")
        }
    }
}

fn check_click(payload: &Value, path: &str) -> Check {
    if let Value::String(selector) = payload {
        return non_empty(selector, path);
    }
    let click = object(payload, path)?;
    allow_keys(click, path, &["selector", "x", "y", "button", "clickCount"])?;

    let has_selector = click.contains_key("selector");
    let has_x = click.contains_key("x");
    let has_y = click.contains_key("y");
    match (has_selector, has_x || has_y) {
        (true, true) => {
            return Err(SchemaViolation::new(path, "selector and coordinates are mutually exclusive"))
        }
        (false, false) => return Err(SchemaViolation::new(path, "click requires a selector or coordinates")),
        (true, false) => required_string(click, path, "selector")?,
        (false, true) => {
            if !(has_x && has_y) {
                return Err(SchemaViolation::new(path, "coordinates require both x and y"));
            }
            number(click, path, "x")?;
            number(click, path, "y")?;
        }
    }
    optional_enum(click, path, "button", &["left", "right", "middle"])?;
    if let Some(count) = click.get("clickCount") {
        if !count.as_u64().is_some_and(|n| (1..=u32::MAX as u64).contains(&n)) {
            return Err(SchemaViolation::new(
                format!("{}.clickCount", path),
                "must be a positive integer",
            ));
        }
    }
    Ok(())
}

fn check_type(payload: &Value, path: &str) -> Check {
    let typed = object(payload, path)?;
    allow_keys(typed, path, &["selector", "text", "delay", "clear"])?;
    required_string(typed, path, "selector")?;
    match typed.get("text") {
        Some(Value::String(_)) => {}
        _ => return Err(SchemaViolation::new(format!("{}.text", path), "must be a string")),
    }
    optional_duration(typed, path, "delay")?;
    optional_bool(typed, path, "clear")
}

fn check_press(payload: &Value, path: &str) -> Check {
    shorthand_or_object(payload, path, "key", &["key", "selector"])?;
    if let Some(press) = payload.as_object() {
        if press.contains_key("selector") {
            required_string(press, path, "selector")?;
        }
    }
    Ok(())
}

fn check_screenshot(payload: &Value, path: &str) -> Check {
    shorthand_or_object(payload, path, "path", &["path", "fullPage", "selector"])?;
    if let Some(shot) = payload.as_object() {
        optional_bool(shot, path, "fullPage")?;
        if shot.contains_key("selector") {
            required_string(shot, path, "selector")?;
        }
    }
    Ok(())
}

fn check_assert(payload: &Value, path: &str) -> Check {
    let assert = object(payload, path)?;
    let mut allowed = vec!["selector", "timeout", "throwOnFail", "message"];
    allowed.extend(ASSERTION_KINDS);
    allow_keys(assert, path, &allowed)?;
    required_string(assert, path, "selector")?;

    if !ASSERTION_KINDS.iter().any(|kind| assert.contains_key(*kind)) {
        return Err(SchemaViolation::new(
            path,
            format!("assert requires at least one of {}", ASSERTION_KINDS.join(", ")),
        ));
    }
    optional_bool(assert, path, "exists")?;
    optional_bool(assert, path, "visible")?;
    for key in ["contains", "equals", "matches", "message"] {
        optional_string(assert, path, key)?;
    }
    optional_duration(assert, path, "timeout")?;
    optional_bool(assert, path, "throwOnFail")
}

fn check_scan(payload: &Value, path: &str) -> Check {
    let scan = match payload {
        Value::Bool(true) => return Ok(()),
        Value::Bool(false) => return Err(SchemaViolation::new(path, "remove the step instead of disabling it")),
        other => object(other, path)?,
    };
    allow_keys(scan, path, &["availability", "year", "notBaseline", "strictness", "delay"])?;

    if let Some(availability) = scan.get("availability") {
        let field = format!("{}.availability", path);
        let items = availability
            .as_array()
            .ok_or_else(|| SchemaViolation::new(&field, "must be a list of low/high"))?;
        for item in items {
            if !matches!(item.as_str(), Some("low") | Some("high")) {
                return Err(SchemaViolation::new(&field, format!("unknown availability {}", item)));
            }
        }
    }
    if let Some(year) = scan.get("year") {
        if !year.as_i64().is_some_and(|y| (1990..=9999).contains(&y)) {
            return Err(SchemaViolation::new(format!("{}.year", path), "must be a four-digit year"));
        }
    }
    optional_bool(scan, path, "notBaseline")?;
    optional_enum(scan, path, "strictness", &["relaxed", "standard", "strict"])?;
    optional_duration(scan, path, "delay")
}

fn check_scroll(payload: &Value, path: &str) -> Check {
    if let Value::String(edge) = payload {
        return match edge.as_str() {
            "top" | "bottom" => Ok(()),
            other => Err(SchemaViolation::new(path, format!("unknown scroll edge '{}'", other))),
        };
    }
    let scroll = object(payload, path)?;
    allow_keys(scroll, path, &["to", "selector", "x", "y", "behavior"])?;

    let targets = [
        scroll.contains_key("to"),
        scroll.contains_key("selector"),
        scroll.contains_key("x") || scroll.contains_key("y"),
    ];
    if targets.iter().filter(|t| **t).count() != 1 {
        return Err(SchemaViolation::new(path, "scroll requires exactly one of to, selector or x/y"));
    }
    optional_enum(scroll, path, "to", &["top", "bottom"])?;
    if scroll.contains_key("selector") {
        required_string(scroll, path, "selector")?;
    }
    for key in ["x", "y"] {
        if scroll.contains_key(key) {
            number(scroll, path, key)?;
        }
    }
    optional_enum(scroll, path, "behavior", &["auto", "smooth"])
}

// === Вспомогательные проверки ===

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, "must be a mapping"))
}

fn allow_keys(map: &Map<String, Value>, path: &str, allowed: &[&str]) -> Check {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SchemaViolation::new(format!("{}.{}", path, key), "unknown field")),
        None => Ok(()),
    }
}

fn shorthand_or_object(payload: &Value, path: &str, key: &str, allowed: &[&str]) -> Check {
    if let Value::String(value) = payload {
        return non_empty(value, path);
    }
    let map = object(payload, path)?;
    allow_keys(map, path, allowed)?;
    required_string(map, path, key)
}

fn non_empty(value: &str, path: &str) -> Check {
    if value.trim().is_empty() {
        return Err(SchemaViolation::new(path, "must not be empty"));
    }
    Ok(())
}

fn required_string(map: &Map<String, Value>, path: &str, key: &str) -> Check {
    let field = format!("{}.{}", path, key);
    match map.get(key) {
        Some(Value::String(s)) => non_empty(s, &field),
        Some(_) => Err(SchemaViolation::new(field, "must be a string")),
        None => Err(SchemaViolation::new(field, "is required")),
    }
}

fn optional_string(map: &Map<String, Value>, path: &str, key: &str) -> Check {
    match map.get(key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(SchemaViolation::new(format!("{}.{}", path, key), "must be a string")),
    }
}

fn optional_bool(map: &Map<String, Value>, path: &str, key: &str) -> Check {
    match map.get(key) {
        None | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(SchemaViolation::new(format!("{}.{}", path, key), "must be true or false")),
    }
}

fn optional_enum(map: &Map<String, Value>, path: &str, key: &str, variants: &[&str]) -> Check {
    match map.get(key) {
        None => Ok(()),
        Some(Value::String(s)) if variants.contains(&s.as_str()) => Ok(()),
        Some(other) => Err(SchemaViolation::new(
            format!("{}.{}", path, key),
            format!("expected one of {}, found {}", variants.join(", "), other),
        )),
    }
}

fn number(map: &Map<String, Value>, path: &str, key: &str) -> Check {
    match map.get(key) {
        Some(Value::Number(_)) => Ok(()),
        _ => Err(SchemaViolation::new(format!("{}.{}", path, key), "must be a number")),
    }
}

fn optional_duration(map: &Map<String, Value>, path: &str, key: &str) -> Check {
    match map.get(key) {
        None => Ok(()),
        Some(value) => duration(value, &format!("{}.{}", path, key)),
    }
}

fn duration(value: &Value, path: &str) -> Check {
    match value {
        Value::Number(n) if n.as_u64().is_some() => Ok(()),
        Value::String(token) => parse_duration(token)
            .map(|_| ())
            .map_err(|e| SchemaViolation::new(path, e.to_string())),
        _ => Err(SchemaViolation::new(
            path,
            "must be milliseconds or a duration like \"2s\"",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(steps: Value) -> Value {
        json!({
            "framework": "puppeteer",
            "browser": { "mode": "launch" },
            "steps": steps,
        })
    }

    fn violation(doc: Value) -> SchemaViolation {
        validate(&doc).expect_err("expected schema violation")
    }

    #[test]
    fn test_minimal_script_is_valid() {
        assert!(validate(&script(json!([]))).is_ok());
    }

    #[test]
    fn test_missing_framework() {
        let err = violation(json!({ "browser": { "mode": "launch" } }));
        assert_eq!(err.field, "framework");
    }

    #[test]
    fn test_unknown_framework() {
        let err = violation(json!({ "framework": "cypress", "browser": { "mode": "launch" } }));
        assert_eq!(err.field, "framework");
        assert!(err.message.contains("cypress"));
    }

    #[test]
    fn test_unknown_top_level_field() {
        let mut doc = script(json!([]));
        doc["extra"] = json!(1);
        assert_eq!(violation(doc).field, "extra");
    }

    #[test]
    fn test_connect_requires_endpoint() {
        let doc = json!({ "framework": "selenium", "browser": { "mode": "connect" } });
        assert_eq!(violation(doc).field, "browser.connect");
    }

    #[test]
    fn test_launch_and_connect_together() {
        let doc = json!({
            "framework": "selenium",
            "browser": { "mode": "connect", "launch": {}, "connect": { "wsUrl": "ws://x" } }
        });
        assert_eq!(violation(doc).field, "browser");
    }

    #[test]
    fn test_mode_mismatch() {
        let doc = json!({
            "framework": "playwright",
            "browser": { "mode": "launch", "connect": { "wsUrl": "ws://x" } }
        });
        assert_eq!(violation(doc).field, "browser.connect");
    }

    #[test]
    fn test_click_needs_target() {
        let err = violation(script(json!([{ "click": { "button": "left" } }])));
        assert_eq!(err.field, "steps[0].click");
    }

    #[test]
    fn test_click_selector_and_coordinates_conflict() {
        let err = violation(script(json!([{ "click": { "selector": "#a", "x": 1, "y": 2 } }])));
        assert!(err.message.contains("mutually exclusive"));
    }

    #[test]
    fn test_click_partial_coordinates() {
        let err = violation(script(json!([{ "click": { "x": 10 } }])));
        assert!(err.message.contains("both x and y"));
    }

    #[test]
    fn test_assert_requires_kind() {
        let err = violation(script(json!([{ "assert": { "selector": "h1" } }])));
        assert_eq!(err.field, "steps[0].assert");
    }

    #[test]
    fn test_unknown_command() {
        let err = violation(script(json!([{ "goto": "https://a.test" }, { "clik": "#b" }])));
        assert_eq!(err.field, "steps[1].clik");
        assert!(err.message.contains("unknown command"));
    }

    #[test]
    fn test_step_with_two_keys() {
        let err = violation(script(json!([{ "goto": "https://a.test", "click": "#b" }])));
        assert_eq!(err.field, "steps[0]");
    }

    #[test]
    fn test_close_must_be_last() {
        let err = violation(script(json!([{ "close": true }, { "goto": "https://a.test" }])));
        assert_eq!(err.field, "steps[0].close");
    }

    #[test]
    fn test_bad_duration() {
        let err = violation(script(json!([{ "wait": "soon" }])));
        assert_eq!(err.field, "steps[0].wait");
    }

    #[test]
    fn test_unknown_payload_field() {
        let err = violation(script(json!([{ "type": { "selector": "#q", "text": "x", "speed": 3 } }])));
        assert_eq!(err.field, "steps[0].type.speed");
    }

    #[test]
    fn test_scan_availability() {
        assert!(validate(&script(json!([{ "scan": { "availability": ["low", "high"] } }]))).is_ok());
        let err = violation(script(json!([{ "scan": { "availability": ["medium"] } }])));
        assert_eq!(err.field, "steps[0].scan.availability");
    }

    #[test]
    fn test_full_vocabulary_is_valid() {
        let doc = script(json!([
            { "goto": { "url": "https://a.test", "waitUntil": "networkidle", "timeout": "10s" } },
            { "wait": { "selector": "#app", "visible": true } },
            { "wait": 250 },
            { "click": { "x": 10, "y": 20, "button": "right" } },
            { "type": { "selector": "#q", "text": "rust", "delay": "50ms", "clear": true } },
            { "hover": "nav a" },
            { "press": { "key": "Enter", "selector": "#q" } },
            { "screenshot": { "path": "a.png", "fullPage": true } },
            { "assert": { "selector": "h1", "contains": "Welcome", "throwOnFail": false } },
            { "scan": true },
            { "scroll": { "selector": "footer", "behavior": "smooth" } },
            { "close": true }
        ]));
        assert!(validate(&doc).is_ok());
    }
}
