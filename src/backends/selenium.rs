//! Бэкенд Selenium WebDriver (Chrome).
//!
//! Подключение к уже запущенному браузеру идёт через `debuggerAddress`:
//! хост и порт берутся из WebSocket-адреса во время выполнения.

use super::js::{self, lit, Runtime};
use super::BackendHandler;
use crate::config::CompileOptions;
use crate::ir::{Teardown, TeardownOp};
use crate::script::model::{
    Assert, Backend, BrowserSetup, Click, ClickTarget, Goto, Hover, MouseButton, Press, Scan, Screenshot, Scroll,
    ScrollTarget, TypeText, Wait, WaitUntil,
};

pub struct Selenium;

const IMPORTS: &str = r#"import webdriver from "selenium-webdriver";
import chrome from "selenium-webdriver/chrome.js";
import { writeFile } from "node:fs/promises";
"#;

const BINDINGS: &str = r#"const { Builder, Button, By, Key, until } = webdriver;
let driver;
"#;

const PROBE: &str = r#"async function __probe(selector, timeout) {
  let element;
  try {
    element = await driver.wait(until.elementLocated(By.css(selector)), timeout);
  } catch (_) {
    return { found: false, text: "", visible: false };
  }
  const text = (await driver.executeScript("return arguments[0].textContent || '';", element)) ?? "";
  return { found: true, text, visible: await element.isDisplayed() };
}
"#;

fn locate(selector: &str, timeout: u64) -> String {
    format!(
        "await driver.wait(until.elementLocated(By.css({})), {})",
        lit(selector),
        timeout
    )
}

/// Выражение для клавиши: константа `Key.*` или строка.
fn key_expr(key: &str) -> String {
    let constant = match key.to_ascii_lowercase().as_str() {
        "enter" => "ENTER",
        "tab" => "TAB",
        "escape" | "esc" => "ESCAPE",
        "backspace" => "BACK_SPACE",
        "delete" => "DELETE",
        "space" | " " => "SPACE",
        "arrowup" => "ARROW_UP",
        "arrowdown" => "ARROW_DOWN",
        "arrowleft" => "ARROW_LEFT",
        "arrowright" => "ARROW_RIGHT",
        "home" => "HOME",
        "end" => "END",
        "pageup" => "PAGE_UP",
        "pagedown" => "PAGE_DOWN",
        "shift" => "SHIFT",
        "control" => "CONTROL",
        "alt" => "ALT",
        "meta" => "META",
        _ => return lit(key),
    };
    format!("Key.{constant}")
}

fn button_name(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "Button.LEFT",
        MouseButton::Right => "Button.RIGHT",
        MouseButton::Middle => "Button.MIDDLE",
    }
}

/// Нажатия кнопки мыши через Actions API; `origin` - выражение начала
/// координат для `move`.
fn actions_click(origin: &str, step: &Click) -> String {
    let button = button_name(step.button);
    format!(
        "const actions = driver.actions({{ async: true }}).move({origin});\n\
         for (let i = 0; i < {}; i++) actions.press({button}).release({button});\n\
         await actions.perform();\n",
        step.click_count
    )
}

impl BackendHandler for Selenium {
    fn backend(&self) -> Backend {
        Backend::Selenium
    }

    fn runtime(&self) -> Runtime {
        Runtime {
            imports: IMPORTS,
            bindings: BINDINGS,
            probe: PROBE,
            page_eval: "const __pageEval = (fn, arg) => driver.executeScript(fn, arg);\n",
        }
    }

    fn browser(&self, setup: &BrowserSetup) -> String {
        let mut out = String::from("const options = new chrome.Options();\n");
        match setup {
            BrowserSetup::Launch(launch) => {
                let mut args: Vec<String> = Vec::new();
                if launch.headless {
                    args.push("--headless=new".to_string());
                }
                if let Some(viewport) = launch.viewport {
                    args.push(format!("--window-size={},{}", viewport.width, viewport.height));
                }
                args.extend(launch.args.iter().cloned());
                if !args.is_empty() {
                    let list: Vec<String> = args.iter().map(|a| lit(a)).collect();
                    out.push_str(&format!("options.addArguments({});\n", list.join(", ")));
                }
                if let Some(path) = &launch.executable_path {
                    out.push_str(&format!("options.setChromeBinaryPath({});\n", lit(path)));
                }
            }
            BrowserSetup::Connect(connect) => {
                out.push_str(&format!(
                    "options.debuggerAddress(new URL({}).host);\n",
                    lit(&connect.ws_url)
                ));
            }
        }
        out.push_str("driver = await new Builder().forBrowser(\"chrome\").setChromeOptions(options).build();\n");
        out
    }

    fn goto(&self, step: &Goto, options: &CompileOptions) -> String {
        let ready = match step.wait_until.unwrap_or(WaitUntil::Load) {
            WaitUntil::DomContentLoaded => "[\"interactive\", \"complete\"]",
            WaitUntil::Load | WaitUntil::NetworkIdle => "[\"complete\"]",
        };
        let timeout = js::timeout(step.timeout, options);
        format!(
            "await driver.manage().setTimeouts({{ pageLoad: {timeout} }});\n\
             await driver.get({});\n\
             await driver.wait(async () => {ready}.includes(await driver.executeScript(\"return document.readyState\")), {timeout});\n",
            lit(&step.url)
        )
    }

    fn wait(&self, step: &Wait, options: &CompileOptions) -> String {
        match step {
            Wait::Duration { duration } => format!("await driver.sleep({});\n", duration.as_u64()),
            Wait::Selector {
                selector,
                timeout,
                visible,
            } => {
                let timeout = js::timeout(*timeout, options);
                let mut out = format!("const el = {};\n", locate(selector, timeout));
                if *visible {
                    out.push_str(&format!("await driver.wait(until.elementIsVisible(el), {timeout});\n"));
                }
                out
            }
        }
    }

    fn click(&self, step: &Click, options: &CompileOptions) -> String {
        match &step.target {
            ClickTarget::Selector { selector } => {
                let mut out = format!("const el = {};\n", locate(selector, options.compiler.default_timeout.as_u64()));
                if step.button == MouseButton::Left && step.click_count == 1 {
                    out.push_str("await el.click();\n");
                } else {
                    out.push_str(&actions_click("{ origin: el }", step));
                }
                out
            }
            ClickTarget::Point { x, y } => actions_click(
                &format!("{{ x: {}, y: {} }}", x.round() as i64, y.round() as i64),
                step,
            ),
        }
    }

    fn type_text(&self, step: &TypeText, options: &CompileOptions) -> String {
        let mut out = format!(
            "const el = {};\n",
            locate(&step.selector, options.compiler.default_timeout.as_u64())
        );
        if step.clear {
            out.push_str("await el.clear();\n");
        }
        match step.delay.filter(|d| !d.is_zero()) {
            Some(delay) => out.push_str(&format!(
                "for (const ch of {}) {{\n  await el.sendKeys(ch);\n  await driver.sleep({});\n}}\n",
                lit(&step.text),
                delay.as_u64()
            )),
            None => out.push_str(&format!("await el.sendKeys({});\n", lit(&step.text))),
        }
        out
    }

    fn hover(&self, step: &Hover, options: &CompileOptions) -> String {
        format!(
            "const el = {};\nawait driver.actions({{ async: true }}).move({{ origin: el }}).perform();\n",
            locate(&step.selector, options.compiler.default_timeout.as_u64())
        )
    }

    fn press(&self, step: &Press, options: &CompileOptions) -> String {
        let key = key_expr(&step.key);
        match &step.selector {
            Some(selector) => format!(
                "const el = {};\nawait el.sendKeys({key});\n",
                locate(selector, options.compiler.default_timeout.as_u64())
            ),
            None => format!("await driver.actions({{ async: true }}).sendKeys({key}).perform();\n"),
        }
    }

    fn screenshot(&self, step: &Screenshot, options: &CompileOptions) -> String {
        let path = lit(&step.path);
        match &step.selector {
            Some(selector) => format!(
                "const el = {};\nawait writeFile({path}, await el.takeScreenshot(), \"base64\");\n",
                locate(selector, options.compiler.default_timeout.as_u64())
            ),
            None => {
                let mut out = String::new();
                if step.full_page {
                    log::warn!("selenium: fullPage ignored for '{}', WebDriver captures the viewport only", step.path);
                    out.push_str("// WebDriver captures the viewport only.\n");
                }
                out.push_str(&format!(
                    "await writeFile({path}, await driver.takeScreenshot(), \"base64\");\n"
                ));
                out
            }
        }
    }

    fn assert(&self, step: &Assert, options: &CompileOptions) -> String {
        js::assert_call(step, options)
    }

    fn scan(&self, step: &Scan) -> String {
        js::scan_call(step, self.backend())
    }

    fn scroll(&self, step: &Scroll, options: &CompileOptions) -> String {
        match &step.target {
            ScrollTarget::Selector(selector) => format!(
                "const el = {};\nawait driver.executeScript(\"arguments[0].scrollIntoView({{ behavior: arguments[1], block: 'center' }});\", el, {});\n",
                locate(selector, options.compiler.default_timeout.as_u64()),
                lit(step.behavior.as_str())
            ),
            target => js::scroll_window_call(target, step.behavior).unwrap_or_default(),
        }
    }

    fn teardown(&self, step: &Teardown) -> String {
        match step.operation {
            TeardownOp::Close => "await driver.quit();\n".to_string(),
            TeardownOp::Disconnect => {
                "// Attached via debuggerAddress: quit() ends the session, the browser keeps running.\nawait driver.quit();\n"
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::model::{ConnectOptions, LaunchOptions, Viewport};

    #[test]
    fn test_connect_uses_debugger_address() {
        let text = Selenium.browser(&BrowserSetup::Connect(ConnectOptions { ws_url: "ws://x".into() }));
        assert!(text.contains("options.debuggerAddress(new URL(\"ws://x\").host);"));
        assert!(text.ends_with("setChromeOptions(options).build();\n"));
    }

    #[test]
    fn test_launch_arguments() {
        let text = Selenium.browser(&BrowserSetup::Launch(LaunchOptions {
            args: vec!["--no-sandbox".into()],
            viewport: Some(Viewport { width: 1024, height: 768 }),
            ..LaunchOptions::default()
        }));
        assert!(text.contains(
            "options.addArguments(\"--headless=new\", \"--window-size=1024,768\", \"--no-sandbox\");"
        ));
    }

    #[test]
    fn test_full_page_screenshot_falls_back_to_viewport() {
        let step = Screenshot {
            path: "page.png".into(),
            full_page: true,
            selector: None,
        };
        let text = Selenium.screenshot(&step, &CompileOptions::default());
        assert_eq!(
            text,
            "// WebDriver captures the viewport only.\nawait writeFile(\"page.png\", await driver.takeScreenshot(), \"base64\");\n"
        );
    }

    #[test]
    fn test_key_expressions() {
        assert_eq!(key_expr("Enter"), "Key.ENTER");
        assert_eq!(key_expr("ArrowDown"), "Key.ARROW_DOWN");
        assert_eq!(key_expr("a"), "\"a\"");
    }

    #[test]
    fn test_right_double_click_uses_actions() {
        let step = Click {
            target: ClickTarget::Selector { selector: ".row".into() },
            button: MouseButton::Right,
            click_count: 2,
        };
        let text = Selenium.click(&step, &CompileOptions::default());
        assert!(text.contains("move({ origin: el })"));
        assert!(text.contains("for (let i = 0; i < 2; i++) actions.press(Button.RIGHT).release(Button.RIGHT);"));
    }
}
