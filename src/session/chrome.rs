//! Chrome driver over the DevTools protocol
//!
//! Launches one browser process per session through chromiumoxide. Element
//! resolution polls the page until exactly one node matches or the element
//! wait expires; interactability is checked in the page before acting.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;

use super::{Driver, Selection, Session};
use crate::common::config::Config;
use crate::common::{Error, Result, StepError, StepResult};

/// Delay between selector polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a closed browser gets to exit before it is killed
const EXIT_WAIT: Duration = Duration::from_secs(5);

/// Returns an empty string when the element accepts text input
const FILLABLE_PROBE: &str = r#"function() {
    const tag = this.tagName.toLowerCase();
    const textual = tag === 'textarea' || this.isContentEditable || (tag === 'input' &&
        !['button', 'checkbox', 'file', 'hidden', 'image', 'radio', 'reset', 'submit'].includes(this.type));
    if (!textual) return 'not an editable element';
    if (this.disabled) return 'element is disabled';
    if (this.readOnly) return 'element is read-only';
    return '';
}"#;

/// Returns an empty string when the element can receive a click
const CLICKABLE_PROBE: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    if (rect.width === 0 && rect.height === 0) return 'element is not visible';
    if (this.disabled) return 'element is disabled';
    return '';
}"#;

const CLEAR_INPUT: &str = r#"function() {
    this.focus();
    if (this.isContentEditable) { this.textContent = ''; } else { this.value = ''; }
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Chrome/Chromium driver
pub struct ChromeDriver {
    config: Config,
}

impl ChromeDriver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let settings = &self.config.browser;

        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .viewport(None)
            .request_timeout(self.config.timeouts.step())
            .args(settings.args.iter().cloned());

        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.ignore_https_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.arg(format!("--user-agent={}", agent));
        }
        if let Some(executable) = self.config.browser_executable() {
            tracing::debug!("Using browser executable {}", executable.display());
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(Error::BrowserLaunch)
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    fn name(&self) -> &'static str {
        "chrome"
    }

    async fn open(&self) -> Result<Box<dyn Session>> {
        let config = self.browser_config()?;
        let launch_secs = self.config.timeouts.launch_secs;

        let (mut browser, mut handler) =
            tokio::time::timeout(self.config.timeouts.launch(), Browser::launch(config))
                .await
                .map_err(|_| Error::LaunchTimeout(launch_secs))?
                .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the
        // browser's lifetime
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(Error::BrowserLaunch(format!("failed to open page: {}", e)));
            }
        };

        tracing::debug!("Chrome session ready");

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task: Some(handler_task),
            element_wait: self.config.timeouts.element(),
        }))
    }
}

struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    element_wait: Duration,
}

/// Result of the select-option script
#[derive(Debug, Deserialize)]
struct SelectOutcome {
    status: String,
    #[serde(default)]
    matched: String,
    value: String,
    options: Vec<String>,
}

/// A failed selector query (e.g. invalid CSS) matches nothing
fn query_error(selector: &str, error: impl std::fmt::Display) -> StepError {
    tracing::debug!("Query for '{}' failed: {}", selector, error);
    StepError::not_found(selector, 0)
}

impl ChromeSession {
    /// Poll until `selector` matches exactly one element
    async fn resolve(&self, selector: &str) -> StepResult<Element> {
        let deadline = Instant::now() + self.element_wait;

        loop {
            let mut found = self
                .page
                .find_elements(selector)
                .await
                .map_err(|e| query_error(selector, e))?;

            match found.len() {
                1 => return Ok(found.remove(0)),
                0 if Instant::now() < deadline => tokio::time::sleep(POLL_INTERVAL).await,
                n => return Err(StepError::not_found(selector, n)),
            }
        }
    }

    /// Run a probe returning a string; empty means the check passed
    async fn probe(&self, element: &Element, selector: &str, script: &str) -> StepResult<()> {
        let reason = self.call_string(element, selector, script).await?;
        if reason.is_empty() {
            Ok(())
        } else {
            Err(StepError::not_interactable(selector, reason))
        }
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!("Failed to kill browser process: {}", e);
        }
    }

    async fn call_string(&self, element: &Element, selector: &str, script: &str) -> StepResult<String> {
        let returns = element
            .call_js_fn(script, false)
            .await
            .map_err(|e| StepError::not_interactable(selector, e))?;

        Ok(returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default())
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn navigate(&mut self, url: &str) -> StepResult<()> {
        // goto resolves once the requested document has loaded
        self.page
            .goto(url)
            .await
            .map_err(|e| StepError::navigation(url, e))?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> StepResult<()> {
        let element = self.resolve(selector).await?;
        self.probe(&element, selector, FILLABLE_PROBE).await?;

        element
            .call_js_fn(CLEAR_INPUT, false)
            .await
            .map_err(|e| StepError::not_interactable(selector, e))?;
        element
            .type_str(value)
            .await
            .map_err(|e| StepError::not_interactable(selector, e))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> StepResult<()> {
        let element = self.resolve(selector).await?;
        self.probe(&element, selector, CLICKABLE_PROBE).await?;

        element
            .click()
            .await
            .map_err(|e| StepError::not_interactable(selector, e))?;
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> StepResult<Selection> {
        let element = self.resolve(selector).await?;

        let wanted = serde_json::to_string(value)
            .map_err(|e| StepError::not_interactable(selector, e))?;
        let script = format!(
            r#"function() {{
                const wanted = {wanted};
                if (this.tagName.toLowerCase() !== 'select') {{
                    return JSON.stringify({{ status: 'not-select', value: '', options: [] }});
                }}
                const options = Array.from(this.options);
                const values = options.map(o => o.value);
                const match = options.find(o => o.value === wanted || o.label === wanted);
                if (!match) {{
                    return JSON.stringify({{ status: 'missing', value: this.value, options: values }});
                }}
                if (this.disabled || match.disabled) {{
                    return JSON.stringify({{ status: 'disabled', value: this.value, options: values }});
                }}
                this.value = match.value;
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return JSON.stringify({{ status: 'ok', matched: match.value, value: this.value, options: values }});
            }}"#
        );

        let raw = self.call_string(&element, selector, &script).await?;
        let outcome: SelectOutcome = serde_json::from_str(&raw)
            .map_err(|e| StepError::not_interactable(selector, format!("unexpected result: {}", e)))?;

        match outcome.status.as_str() {
            "ok" => Ok(Selection {
                matched: outcome.matched,
                value: outcome.value,
            }),
            "missing" => Err(StepError::InvalidOption {
                selector: selector.to_string(),
                value: value.to_string(),
                available: outcome.options,
            }),
            "disabled" => Err(StepError::not_interactable(selector, "select or option is disabled")),
            _ => Err(StepError::not_interactable(selector, "not a select element")),
        }
    }

    async fn capture(&mut self, path: &Path) -> StepResult<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| StepError::capture(&path.display().to_string(), e))
    }

    async fn close(&mut self) -> Result<()> {
        let requested = self.browser.close().await.map(|_| ());
        let closed = match requested {
            Ok(()) => {
                let exited = tokio::time::timeout(EXIT_WAIT, self.browser.wait()).await;
                match exited {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!("Browser process did not exit cleanly: {}", e),
                    Err(_) => {
                        tracing::warn!("Browser still running {:?} after close, killing it", EXIT_WAIT);
                        self.kill().await;
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.kill().await;
                Err(Error::Session(format!("failed to close browser: {}", e)))
            }
        };

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_query_reports_element_not_found() {
        let err = query_error("div[", "DOMException: not a valid selector");
        assert_eq!(err, StepError::not_found("div[", 0));
        assert_eq!(err.code(), "ELEMENT_NOT_FOUND");
    }

    #[test]
    fn test_select_outcome_carries_matched_option() {
        let outcome: SelectOutcome = serde_json::from_str(
            r#"{"status":"ok","matched":"az","value":"az","options":["az","za"]}"#,
        )
        .unwrap();
        assert_eq!(outcome.matched, "az");

        // error statuses carry no match
        let outcome: SelectOutcome =
            serde_json::from_str(r#"{"status":"missing","value":"az","options":["az"]}"#).unwrap();
        assert!(outcome.matched.is_empty());
    }
}
