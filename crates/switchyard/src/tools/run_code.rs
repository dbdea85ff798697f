use std::env;
use std::fmt::{self, Display};
use std::io;
use std::process::Output;
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use switchyard_core::tool::{
    Approval as ToolApproval, Error as ToolError, Tool, ToolResult,
};
use tokio::process::Command;
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The languages [`RunCodeTool`] can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Runs with `python3 -c`.
    Python,
    /// Runs with the user's shell.
    Shell,
}

impl Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => f.write_str("Python"),
            Language::Shell => f.write_str("shell"),
        }
    }
}

/// The input of [`RunCodeTool`].
#[derive(Deserialize, JsonSchema)]
pub struct RunCodeToolParameters {
    #[schemars(description = "The language the code is written in.")]
    language: Language,
    #[schemars(description = "The source code to run.")]
    code: String,
}

/// A tool for running Python or shell snippets on the host.
pub struct RunCodeTool {
    parameter_schema: Value,
    timeout: Duration,
}

impl RunCodeTool {
    /// Creates a new code runner with a one-minute timeout.
    #[inline]
    pub fn new() -> Self {
        RunCodeTool {
            parameter_schema: schema_for!(RunCodeToolParameters).to_value(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long a snippet may run before it's killed.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RunCodeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for RunCodeTool {
    type Input = RunCodeToolParameters;

    fn name(&self) -> &str {
        "run_code"
    }

    fn description(&self) -> &str {
        r#"
Runs a Python or shell snippet on the user's machine.
Use it to check your code before answering. Strings collected from stdout and stderr will be returned as the tool's output, followed by the exit status if the snippet failed."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn make_approval(&self, input: &Self::Input) -> ToolApproval {
        ToolApproval::new(
            &input.code,
            format!("Agent wants to run {} code", input.language),
        )
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: RunCodeToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let limit = self.timeout;
        async move {
            let output = timeout(limit, run_code(input.language, &input.code))
                .await
                .map_err(|_| {
                    ToolError::execution_error()
                        .with_reason(format!("timed out after {limit:?}"))
                })?
                .map_err(|err| {
                    ToolError::execution_error().with_reason(format!("{err}"))
                })?;
            Ok(format_output(&output))
        }
    }
}

#[inline]
fn create_command(language: Language) -> Command {
    let mut command = match language {
        Language::Python => Command::new("python3"),
        Language::Shell => match env::var_os("SHELL") {
            Some(shell) => Command::new(shell),
            None => Command::new("/bin/sh"),
        },
    };
    command.kill_on_drop(true);
    command
}

async fn run_code(language: Language, code: &str) -> Result<Output, io::Error> {
    debug!("running {language} snippet");
    create_command(language).arg("-c").arg(code).output().await
}

fn format_output(output: &Output) -> String {
    let mut result = String::new();
    if !output.stdout.is_empty() {
        result.push_str("==> STDOUT <==\n");
        result.push_str(&String::from_utf8_lossy(&output.stdout));
    }
    if !output.stderr.is_empty() {
        result.push_str("\n==> STDERR <==\n");
        result.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    if !output.status.success() {
        result.push_str("\n==> EXIT STATUS <==\n");
        match output.status.code() {
            Some(code) => result.push_str(&code.to_string()),
            None => result.push_str("killed by signal"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn shell(code: &str) -> RunCodeToolParameters {
        RunCodeToolParameters {
            language: Language::Shell,
            code: code.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_run_shell() {
        let result = RunCodeTool::new().execute(shell("echo 'Hello, World!'")).await;
        assert_eq!(result.unwrap(), "==> STDOUT <==\nHello, World!\n");
    }

    #[tokio::test]
    async fn test_exit_status() {
        let result = RunCodeTool::new().execute(shell("exit 3")).await;
        assert_eq!(result.unwrap(), "\n==> EXIT STATUS <==\n3");
    }

    #[tokio::test]
    async fn test_timeout() {
        let tool = RunCodeTool::new().with_timeout(Duration::from_millis(50));
        let err = tool.execute(shell("sleep 5")).await.unwrap_err();
        assert_eq!(err.kind(), switchyard_core::tool::ErrorKind::ExecutionError);
    }

    #[test]
    fn test_parameters() {
        let input: RunCodeToolParameters =
            serde_json::from_value(json!({ "language": "python", "code": "print(1)" }))
                .unwrap();
        assert_eq!(input.language, Language::Python);

        let approval = RunCodeTool::new().make_approval(&input);
        assert_eq!(approval.what(), "print(1)");
        assert_eq!(approval.justification(), "Agent wants to run Python code");

        let tool = RunCodeTool::new();
        let required = tool.parameter_schema()["required"].as_array().unwrap();
        assert!(required.contains(&json!("language")));
        assert!(required.contains(&json!("code")));
    }
}
