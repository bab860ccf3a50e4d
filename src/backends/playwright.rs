//! Бэкенд Playwright (Chromium).
//!
//! Элементы адресуются через `Locator`; подключение к существующему
//! браузеру идёт через CDP.

use serde_json::{json, Map, Value};

use super::js::{self, lit, Runtime};
use super::BackendHandler;
use crate::config::CompileOptions;
use crate::ir::{Teardown, TeardownOp};
use crate::script::model::{
    Assert, Backend, BrowserSetup, Click, ClickTarget, Goto, Hover, Press, Scan, Screenshot, Scroll, ScrollTarget,
    TypeText, Wait, WaitUntil,
};

pub struct Playwright;

const PROBE: &str = r#"async function __probe(selector, timeout) {
  const locator = page.locator(selector).first();
  try {
    await locator.waitFor({ state: "attached", timeout });
  } catch (_) {
    return { found: false, text: "", visible: false };
  }
  const text = (await locator.textContent()) ?? "";
  return { found: true, text, visible: await locator.isVisible() };
}
"#;

fn locator(selector: &str) -> String {
    format!("page.locator({}).first()", lit(selector))
}

impl BackendHandler for Playwright {
    fn backend(&self) -> Backend {
        Backend::Playwright
    }

    fn runtime(&self) -> Runtime {
        Runtime {
            imports: "import { chromium } from \"playwright\";\n",
            bindings: "let browser;\nlet context;\nlet page;\n",
            probe: PROBE,
            page_eval: "const __pageEval = (fn, arg) => page.evaluate(fn, arg);\n",
        }
    }

    fn browser(&self, setup: &BrowserSetup) -> String {
        match setup {
            BrowserSetup::Launch(launch) => {
                let mut options = json!({ "headless": launch.headless, "args": launch.args });
                if let Some(path) = &launch.executable_path {
                    options["executablePath"] = Value::from(path.as_str());
                }
                let mut context = Map::new();
                if let Some(viewport) = launch.viewport {
                    context.insert(
                        "viewport".into(),
                        json!({ "width": viewport.width, "height": viewport.height }),
                    );
                }
                format!(
                    "browser = await chromium.launch({});\ncontext = await browser.newContext({});\npage = await context.newPage();\n",
                    options,
                    Value::Object(context)
                )
            }
            BrowserSetup::Connect(connect) => format!(
                "browser = await chromium.connectOverCDP({});\n\
                 context = browser.contexts()[0] ?? (await browser.newContext());\n\
                 page = context.pages()[0] ?? (await context.newPage());\n",
                lit(&connect.ws_url)
            ),
        }
    }

    fn goto(&self, step: &Goto, options: &CompileOptions) -> String {
        let wait_until = match step.wait_until.unwrap_or(WaitUntil::Load) {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        };
        format!(
            "await page.goto({}, {{ waitUntil: {}, timeout: {} }});\n",
            lit(&step.url),
            lit(wait_until),
            js::timeout(step.timeout, options)
        )
    }

    fn wait(&self, step: &Wait, options: &CompileOptions) -> String {
        match step {
            Wait::Duration { duration } => format!("await page.waitForTimeout({});\n", duration.as_u64()),
            Wait::Selector {
                selector,
                timeout,
                visible,
            } => format!(
                "await {}.waitFor({{ state: {}, timeout: {} }});\n",
                locator(selector),
                lit(if *visible { "visible" } else { "attached" }),
                js::timeout(*timeout, options)
            ),
        }
    }

    fn click(&self, step: &Click, options: &CompileOptions) -> String {
        let button = lit(step.button.as_str());
        match &step.target {
            ClickTarget::Selector { selector } => format!(
                "await {}.click({{ button: {}, clickCount: {}, timeout: {} }});\n",
                locator(selector),
                button,
                step.click_count,
                options.compiler.default_timeout.as_u64()
            ),
            ClickTarget::Point { x, y } => format!(
                "await page.mouse.click({x}, {y}, {{ button: {button}, clickCount: {} }});\n",
                step.click_count
            ),
        }
    }

    fn type_text(&self, step: &TypeText, options: &CompileOptions) -> String {
        let timeout = options.compiler.default_timeout.as_u64();
        let mut out = format!("const field = {};\n", locator(&step.selector));
        if step.clear {
            out.push_str(&format!("await field.fill(\"\", {{ timeout: {timeout} }});\n"));
        }
        let delay = step.delay.map_or(0, |d| d.as_u64());
        out.push_str(&format!(
            "await field.pressSequentially({}, {{ delay: {delay}, timeout: {timeout} }});\n",
            lit(&step.text)
        ));
        out
    }

    fn hover(&self, step: &Hover, options: &CompileOptions) -> String {
        format!(
            "await {}.hover({{ timeout: {} }});\n",
            locator(&step.selector),
            options.compiler.default_timeout.as_u64()
        )
    }

    fn press(&self, step: &Press, options: &CompileOptions) -> String {
        match &step.selector {
            Some(selector) => format!(
                "await {}.press({}, {{ timeout: {} }});\n",
                locator(selector),
                lit(&step.key),
                options.compiler.default_timeout.as_u64()
            ),
            None => format!("await page.keyboard.press({});\n", lit(&step.key)),
        }
    }

    fn screenshot(&self, step: &Screenshot, options: &CompileOptions) -> String {
        match &step.selector {
            Some(selector) => format!(
                "await {}.screenshot({{ path: {}, timeout: {} }});\n",
                locator(selector),
                lit(&step.path),
                options.compiler.default_timeout.as_u64()
            ),
            None => format!(
                "await page.screenshot({{ path: {}, fullPage: {} }});\n",
                lit(&step.path),
                step.full_page
            ),
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
                "await {}.evaluate((node, behavior) => node.scrollIntoView({{ behavior, block: \"center\" }}), {}, {{ timeout: {} }});\n",
                locator(selector),
                lit(step.behavior.as_str()),
                options.compiler.default_timeout.as_u64()
            ),
            target => js::scroll_window_call(target, step.behavior).unwrap_or_default(),
        }
    }

    fn teardown(&self, step: &Teardown) -> String {
        match step.operation {
            TeardownOp::Close => "await browser.close();\n".to_string(),
            TeardownOp::Disconnect => "// Connected over CDP: close() detaches and leaves the browser running.\nawait browser.close();\n".to_string(),
        }
    }
}
