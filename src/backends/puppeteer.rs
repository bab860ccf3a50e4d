//! Бэкенд Puppeteer.

use serde_json::{json, Value};

use super::js::{self, lit, Runtime};
use super::BackendHandler;
use crate::config::CompileOptions;
use crate::ir::{Teardown, TeardownOp};
use crate::script::model::{
    Assert, Backend, BrowserSetup, Click, ClickTarget, Goto, Hover, Press, Scan, Screenshot, Scroll, ScrollTarget,
    TypeText, Wait, WaitUntil,
};

pub struct Puppeteer;

const PROBE: &str = r#"async function __probe(selector, timeout) {
  let handle = null;
  try {
    handle = await page.waitForSelector(selector, { timeout });
  } catch (_) {}
  if (!handle) return { found: false, text: "", visible: false };
  const text = await handle.evaluate((el) => el.textContent ?? "");
  return { found: true, text, visible: await handle.isVisible() };
}
"#;

fn wait_for(selector: &str, timeout: u64) -> String {
    format!("await page.waitForSelector({}, {{ timeout: {} }})", lit(selector), timeout)
}

impl BackendHandler for Puppeteer {
    fn backend(&self) -> Backend {
        Backend::Puppeteer
    }

    fn runtime(&self) -> Runtime {
        Runtime {
            imports: "import puppeteer from \"puppeteer\";\n",
            bindings: "let browser;\nlet page;\n",
            probe: PROBE,
            page_eval: "const __pageEval = (fn, arg) => page.evaluate(fn, arg);\n",
        }
    }

    fn browser(&self, setup: &BrowserSetup) -> String {
        let open = match setup {
            BrowserSetup::Launch(launch) => {
                let mut options = json!({ "headless": launch.headless, "args": launch.args });
                if let Some(viewport) = launch.viewport {
                    options["defaultViewport"] = json!({ "width": viewport.width, "height": viewport.height });
                }
                if let Some(path) = &launch.executable_path {
                    options["executablePath"] = Value::from(path.as_str());
                }
                format!("browser = await puppeteer.launch({});\n", options)
            }
            BrowserSetup::Connect(connect) => format!(
                "browser = await puppeteer.connect({{ browserWSEndpoint: {} }});\n",
                lit(&connect.ws_url)
            ),
        };
        format!("{open}page = (await browser.pages())[0] ?? (await browser.newPage());\n")
    }

    fn goto(&self, step: &Goto, options: &CompileOptions) -> String {
        let wait_until = match step.wait_until.unwrap_or(WaitUntil::Load) {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle0",
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
            Wait::Duration { duration } => format!("await __sleep({});\n", duration.as_u64()),
            Wait::Selector {
                selector,
                timeout,
                visible,
            } => format!(
                "await page.waitForSelector({}, {{ visible: {}, timeout: {} }});\n",
                lit(selector),
                visible,
                js::timeout(*timeout, options)
            ),
        }
    }

    fn click(&self, step: &Click, options: &CompileOptions) -> String {
        let click_options = format!("{{ button: {}, count: {} }}", lit(step.button.as_str()), step.click_count);
        match &step.target {
            ClickTarget::Selector { selector } => format!(
                "const el = {};\nawait el.click({});\n",
                wait_for(selector, options.compiler.default_timeout.as_u64()),
                click_options
            ),
            ClickTarget::Point { x, y } => format!("await page.mouse.click({x}, {y}, {click_options});\n"),
        }
    }

    fn type_text(&self, step: &TypeText, options: &CompileOptions) -> String {
        let mut out = format!("const el = {};\n", wait_for(&step.selector, options.compiler.default_timeout.as_u64()));
        if step.clear {
            out.push_str("await el.click({ count: 3 });\nawait el.press(\"Backspace\");\n");
        }
        let delay = step.delay.map_or(0, |d| d.as_u64());
        out.push_str(&format!("await el.type({}, {{ delay: {} }});\n", lit(&step.text), delay));
        out
    }

    fn hover(&self, step: &Hover, options: &CompileOptions) -> String {
        format!(
            "const el = {};\nawait el.hover();\n",
            wait_for(&step.selector, options.compiler.default_timeout.as_u64())
        )
    }

    fn press(&self, step: &Press, options: &CompileOptions) -> String {
        match &step.selector {
            Some(selector) => format!(
                "const el = {};\nawait el.press({});\n",
                wait_for(selector, options.compiler.default_timeout.as_u64()),
                lit(&step.key)
            ),
            None => format!("await page.keyboard.press({});\n", lit(&step.key)),
        }
    }

    fn screenshot(&self, step: &Screenshot, options: &CompileOptions) -> String {
        match &step.selector {
            Some(selector) => format!(
                "const el = {};\nawait el.screenshot({{ path: {} }});\n",
                wait_for(selector, options.compiler.default_timeout.as_u64()),
                lit(&step.path)
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
                "const el = {};\nawait el.evaluate((node, behavior) => node.scrollIntoView({{ behavior, block: \"center\" }}), {});\n",
                wait_for(selector, options.compiler.default_timeout.as_u64()),
                lit(step.behavior.as_str())
            ),
            target => js::scroll_window_call(target, step.behavior).unwrap_or_default(),
        }
    }

    fn teardown(&self, step: &Teardown) -> String {
        match step.operation {
            TeardownOp::Close => "await browser.close();\n".to_string(),
            TeardownOp::Disconnect => "await browser.disconnect();\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::Millis;
    use crate::script::model::{ConnectOptions, LaunchOptions, MouseButton, ScrollBehavior, ScrollEdge, Viewport};

    fn options() -> CompileOptions {
        CompileOptions::default()
    }

    #[test]
    fn test_launch_and_connect() {
        let launch = Puppeteer.browser(&BrowserSetup::Launch(LaunchOptions {
            viewport: Some(Viewport { width: 800, height: 600 }),
            ..LaunchOptions::default()
        }));
        assert!(launch.starts_with("browser = await puppeteer.launch({"));
        assert!(launch.contains("\"defaultViewport\""));
        assert!(launch.contains("\"width\":800"));
        assert!(launch.ends_with("page = (await browser.pages())[0] ?? (await browser.newPage());\n"));

        let connect = Puppeteer.browser(&BrowserSetup::Connect(ConnectOptions { ws_url: "ws://x".into() }));
        assert!(connect.contains("puppeteer.connect({ browserWSEndpoint: \"ws://x\" })"));
    }

    #[test]
    fn test_goto_uses_network_idle_alias() {
        let step = Goto {
            url: "https://example.com".into(),
            wait_until: Some(WaitUntil::NetworkIdle),
            timeout: Some(Millis(5000)),
        };
        assert_eq!(
            Puppeteer.goto(&step, &options()),
            "await page.goto(\"https://example.com\", { waitUntil: \"networkidle0\", timeout: 5000 });\n"
        );
    }

    #[test]
    fn test_click_variants() {
        let by_point = Click {
            target: ClickTarget::Point { x: 10.0, y: 20.5 },
            button: MouseButton::Right,
            click_count: 2,
        };
        assert_eq!(
            Puppeteer.click(&by_point, &options()),
            "await page.mouse.click(10, 20.5, { button: \"right\", count: 2 });\n"
        );

        let by_selector = Click {
            target: ClickTarget::Selector { selector: "#go".into() },
            button: MouseButton::Left,
            click_count: 1,
        };
        let text = Puppeteer.click(&by_selector, &options());
        assert!(text.contains("page.waitForSelector(\"#go\", { timeout: 30000 })"));
        assert!(text.contains("await el.click({ button: \"left\", count: 1 });"));
    }

    #[test]
    fn test_scroll_edge_uses_shared_helper() {
        let step = Scroll {
            target: ScrollTarget::Edge(ScrollEdge::Bottom),
            behavior: ScrollBehavior::Smooth,
        };
        assert!(Puppeteer.scroll(&step, &options()).starts_with("await __scrollWindow("));
    }
}
