//! UI.Vision robot activity.
//!
//! The macro runs inside a browser started with the UI.Vision autorun HTML
//! page. UI.Vision writes a log file when the macro ends; its first line is
//! `Status=OK` on success. The log lines are copied to the KuFlow task so
//! the result is visible in the KuFlow app.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use durable_kuflow::activities::{Activity, ActivityContext, ActivityResult};
use kuflow_rest::models::ProcessItemTaskAppendLogParams;
use kuflow_rest::KuFlowRestClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use url::Url;
use uuid::Uuid;

use super::kuflow_failure;
use crate::config::{has_text, UIVisionConfig};

/// Activity name.
pub const EXECUTE_MACRO: &str = "UIVision_executeUIVisionMacro";

/// First line of a successful UI.Vision log.
pub const STATUS_OK: &str = "Status=OK";

const LOG_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Input of [`EXECUTE_MACRO`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteUIVisionMacroRequest {
    pub process_item_id: Uuid,
}

/// Output of [`EXECUTE_MACRO`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteUIVisionMacroResponse {
    pub log_file: String,
    pub log_lines: usize,
}

#[derive(Error, Debug)]
pub enum UIVisionError {
    #[error("Invalid autorun page '{0}'")]
    InvalidAutorunPage(String),

    #[error("Failed to start UI.Vision: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("UI.Vision macro did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Failed to read UI.Vision log {path}: {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("UI.Vision macro failed: {0}")]
    MacroFailed(String),
}

/// Validated UI.Vision settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UIVisionSettings {
    pub command: String,
    pub log_directory: PathBuf,
    pub auto_run_html: String,
    pub macro_name: String,
    pub close_browser: bool,
    pub close_rpa: bool,
    pub execution_timeout: Duration,
}

impl UIVisionSettings {
    /// Settings from the `uivision` section; command, autorun page and macro
    /// are required.
    pub fn from_config(config: &UIVisionConfig) -> anyhow::Result<Self> {
        let required = |name: &str, value: &Option<String>| -> anyhow::Result<String> {
            match value {
                Some(v) if has_text(Some(v.as_str())) => Ok(v.trim().to_string()),
                _ => anyhow::bail!("uivision.{name} is not configured"),
            }
        };

        Ok(Self {
            command: required("command", &config.command)?,
            log_directory: config.log_directory.clone(),
            auto_run_html: required("auto_run_html", &config.auto_run_html)?,
            macro_name: required("macro", &config.macro_name)?,
            close_browser: config.close_browser,
            close_rpa: config.close_rpa,
            execution_timeout: Duration::from_secs(config.execution_timeout_secs),
        })
    }

    /// Autorun URL that runs the macro and saves its log as `log_file`.
    ///
    /// The autorun page may be given as a URL or as a local file path.
    pub fn autorun_url(&self, log_file: &str) -> Result<Url, UIVisionError> {
        let invalid = || UIVisionError::InvalidAutorunPage(self.auto_run_html.clone());
        let mut url = match Url::parse(&self.auto_run_html) {
            Ok(url) if url.scheme().len() > 1 => url,
            _ => {
                let path = std::path::absolute(&self.auto_run_html).map_err(|_| invalid())?;
                Url::from_file_path(path).map_err(|()| invalid())?
            }
        };

        url.query_pairs_mut()
            .append_pair("macro", &self.macro_name)
            .append_pair("direct", "1")
            .append_pair("closeBrowser", flag(self.close_browser))
            .append_pair("closeRPA", flag(self.close_rpa))
            .append_pair("savelog", log_file);
        Ok(url)
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Parsed UI.Vision log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroLog {
    pub lines: Vec<String>,
}

impl MacroLog {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status() == Some(STATUS_OK)
    }
}

/// Run the macro and wait for its log file.
///
/// The browser may detach from the launched process, so completion is
/// detected by the log file appearing rather than by the process exiting.
/// The process is killed once the log is read or the timeout expires.
pub async fn run_macro(settings: &UIVisionSettings, log_file: &str) -> Result<MacroLog, UIVisionError> {
    let url = settings.autorun_url(log_file)?;
    let log_path = settings.log_directory.join(log_file);

    tracing::info!(command = %settings.command, url = %url, "Launching UI.Vision");
    let mut child = Command::new(&settings.command)
        .arg(url.as_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(UIVisionError::Spawn)?;

    let waited = tokio::time::timeout(settings.execution_timeout, wait_for_log(&log_path)).await;
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "UI.Vision process already exited");
    }

    match waited {
        Ok(result) => result,
        Err(_) => Err(UIVisionError::Timeout(settings.execution_timeout)),
    }
}

async fn wait_for_log(path: &Path) -> Result<MacroLog, UIVisionError> {
    loop {
        match tokio::fs::read_to_string(path).await {
            Ok(text) if !text.trim().is_empty() => return Ok(MacroLog::parse(&text)),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(UIVisionError::ReadLog {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        tokio::time::sleep(LOG_POLL_INTERVAL).await;
    }
}

/// `UIVision_executeUIVisionMacro` activity.
#[derive(Debug, Clone)]
pub struct UIVisionActivity {
    settings: UIVisionSettings,
    client: KuFlowRestClient,
}

impl UIVisionActivity {
    #[must_use]
    pub fn new(settings: UIVisionSettings, client: KuFlowRestClient) -> Self {
        Self { settings, client }
    }

    async fn append_logs(&self, process_item_id: Uuid, log: &MacroLog) -> Result<(), ActivityResult> {
        for line in &log.lines {
            let entry = if log.is_ok() {
                ProcessItemTaskAppendLogParams::info(line.clone())
            } else {
                ProcessItemTaskAppendLogParams::error(line.clone())
            };
            self.client
                .append_process_item_task_log(process_item_id, &entry)
                .await
                .map_err(|e| kuflow_failure(EXECUTE_MACRO, &e))?;
        }
        Ok(())
    }

    async fn call(&self, ctx: &ActivityContext, input: serde_json::Value) -> Result<ActivityResult, ActivityResult> {
        let request: ExecuteUIVisionMacroRequest = ActivityResult::parse_input(input)?;
        let log_file = format!("uivision-{}-{}.txt", request.process_item_id, ctx.attempt);

        if let Err(e) = tokio::fs::create_dir_all(&self.settings.log_directory).await {
            return Err(ActivityResult::failure(
                format!("Cannot create UI.Vision log directory: {e}"),
                true,
            ));
        }

        // Macro runs drive a real browser; repeating a failed run is left to
        // the workflow.
        let log = run_macro(&self.settings, &log_file)
            .await
            .map_err(|e| ActivityResult::non_retryable(e.to_string()))?;

        self.append_logs(request.process_item_id, &log).await?;

        if !log.is_ok() {
            let status = log.status().unwrap_or_default().to_string();
            return Err(ActivityResult::non_retryable(
                UIVisionError::MacroFailed(status).to_string(),
            ));
        }

        Ok(ActivityResult::success(ExecuteUIVisionMacroResponse {
            log_file,
            log_lines: log.lines.len(),
        }))
    }
}

#[async_trait]
impl Activity for UIVisionActivity {
    fn name(&self) -> &'static str {
        EXECUTE_MACRO
    }

    async fn execute(&self, ctx: &ActivityContext, input: serde_json::Value) -> ActivityResult {
        match self.call(ctx, input).await {
            Ok(result) | Err(result) => result,
        }
    }
}
