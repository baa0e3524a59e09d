use std::io;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command as TokioCommand;

/// Format expression that prints the env var names of the first container,
/// joined with `;`.
pub const ENV_VAR_NAMES_FORMAT: &str = "value(spec.template.spec.containers[0].env[].name)";

pub const SERVICE_URL_FORMAT: &str = "value(status.url)";

#[derive(Debug, Error)]
pub enum GcloudError {
    #[error("{binary} is not installed or not in PATH")]
    NotInstalled { binary: String },

    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    CommandFailed {
        binary: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{binary} produced non UTF-8 output")]
    Utf8 {
        binary: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Thin wrapper around the `gcloud` CLI.
///
/// `binary` is a command line: the first word is the program, the rest are
/// passed ahead of every invocation (e.g. `gcloud --quiet`).
#[derive(Debug, Clone)]
pub struct Gcloud {
    binary: String,
}

impl Gcloud {
    pub fn new(binary: impl Into<String>) -> Self {
        Gcloud { binary: binary.into() }
    }

    pub async fn check_installed(&self) -> Result<String, GcloudError> {
        self.run(&["--version".to_string()]).await
    }

    /// Runs `gcloud run services describe` and returns trimmed stdout.
    ///
    /// An empty `account` leaves gcloud's active account in place.
    pub async fn describe(
        &self,
        project: &str,
        service: &str,
        region: &str,
        format: &str,
        account: &str,
    ) -> Result<String, GcloudError> {
        let args = describe_args(project, service, region, format, account);
        self.run(&args).await
    }

    /// Names of the environment variables set on the service.
    pub async fn env_vars(
        &self,
        project: &str,
        service: &str,
        region: &str,
    ) -> Result<Vec<String>, GcloudError> {
        let out = self
            .describe(project, service, region, ENV_VAR_NAMES_FORMAT, "")
            .await?;
        Ok(parse_env_var_names(&out))
    }

    pub async fn service_url(
        &self,
        project: &str,
        service: &str,
        region: &str,
    ) -> Result<String, GcloudError> {
        self.describe(project, service, region, SERVICE_URL_FORMAT, "")
            .await
    }

    async fn run(&self, args: &[String]) -> Result<String, GcloudError> {
        tracing::debug!(binary = %self.binary, ?args, "running command");

        let mut words = self.binary.split_whitespace();
        let program = words.next().ok_or_else(|| GcloudError::NotInstalled {
            binary: self.binary.clone(),
        })?;

        let output = TokioCommand::new(program)
            .args(words)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => GcloudError::NotInstalled {
                    binary: self.binary.clone(),
                },
                _ => GcloudError::Spawn {
                    binary: self.binary.clone(),
                    source: e,
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(status = %output.status, %stderr, "command failed");
            return Err(GcloudError::CommandFailed {
                binary: self.binary.clone(),
                status: output.status,
                stderr,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| GcloudError::Utf8 {
            binary: self.binary.clone(),
            source: e,
        })?;
        Ok(stdout.trim().to_string())
    }
}

fn describe_args(
    project: &str,
    service: &str,
    region: &str,
    format: &str,
    account: &str,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "run",
        "services",
        "describe",
        service,
        "--project",
        project,
        "--platform",
        "managed",
        "--region",
        region,
        "--format",
        format,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if !account.is_empty() {
        args.push("--account".to_string());
        args.push(account.to_string());
    }
    args
}

/// Splits gcloud's `;`-joined list output into names.
pub fn parse_env_var_names(out: &str) -> Vec<String> {
    out.trim()
        .split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
