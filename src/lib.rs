pub mod config;
pub mod gcloud;
pub mod repo;
pub mod service_name;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command as TokioCommand;

use crate::config::Settings;
use crate::gcloud::{Gcloud, GcloudError};

pub use crate::repo::{candidate_service_name, repo_name};
pub use crate::service_name::{try_fix_service_name, ServiceName};

#[derive(Parser)]
#[clap(
    name = "cloudshell-open",
    about = "Open a Cloud Run service's source and inspect its deployment",
    long_about = None,
    version,
    after_help = "Tip: Use 'cloudshell-open help <command>' for more information about a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the service name derived from a repository
    #[clap(long_about = "Derives a valid Cloud Run service name from a git URL, a local directory, or a plain name.")]
    ServiceName(ServiceNameArgs),

    /// Describe a deployed service
    #[clap(long_about = "Runs 'gcloud run services describe' and prints the result in the requested format.")]
    Describe(DescribeArgs),

    /// List the environment variables set on a service
    #[clap(long_about = "Prints the name of every environment variable configured on the service's container, one per line.")]
    EnvVars(ServiceArgs),

    /// Open a service's source in your editor
    #[clap(long_about = "Derives the service name from a checkout, looks the service up on Cloud Run, reports its URL and environment, then opens the checkout in your editor.")]
    Open(OpenArgs),

    /// Manage configuration
    #[clap(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View current configuration
    View,
    /// Print the configuration file path
    Path,
    /// Reset configuration to default
    Reset,
}

#[derive(Args)]
pub struct ServiceNameArgs {
    /// Git URL, directory, or name to derive the service name from
    pub source: String,
}

#[derive(Args, Clone, Default)]
pub struct ServiceArgs {
    /// Cloud Run service name
    #[clap(long, help = "Specifies the Cloud Run service")]
    pub service: String,

    /// Google Cloud project
    #[clap(long, help = "Specifies the project; defaults to gcloud.project from config")]
    pub project: Option<String>,

    /// Cloud Run region
    #[clap(long, help = "Specifies the region; defaults to gcloud.region from config")]
    pub region: Option<String>,
}

#[derive(Args)]
pub struct DescribeArgs {
    #[clap(flatten)]
    pub target: ServiceArgs,

    /// gcloud format expression
    #[clap(long, default_value = "json", help = "Specifies the gcloud --format expression")]
    pub format: String,

    /// Account to run gcloud as
    #[clap(long, help = "Specifies the account gcloud should use")]
    pub account: Option<String>,
}

#[derive(Args)]
pub struct OpenArgs {
    /// Checkout to open
    #[clap(default_value = ".")]
    pub directory: PathBuf,

    /// Service name, if it differs from the directory name
    #[clap(long, help = "Overrides the service name derived from the directory")]
    pub service: Option<String>,

    #[clap(long, help = "Specifies the project; defaults to gcloud.project from config")]
    pub project: Option<String>,

    #[clap(long, help = "Specifies the region; defaults to gcloud.region from config")]
    pub region: Option<String>,

    /// Skip launching the editor
    #[clap(long)]
    pub no_editor: bool,
}

pub async fn service_name(args: &ServiceNameArgs) -> Result<()> {
    let service = candidate_service_name(&args.source)
        .ok_or_else(|| anyhow!("Could not derive a repository name from {:?}", args.source))?;
    println!("{}", service);
    Ok(())
}

pub async fn describe(args: &DescribeArgs, settings: &Settings) -> Result<()> {
    let gcloud = Gcloud::new(&settings.gcloud.binary);
    let project = resolve_project(args.target.project.as_deref(), settings)?;
    let region = resolve_region(args.target.region.as_deref(), settings);
    let account = args
        .account
        .as_deref()
        .or(settings.gcloud.account.as_deref())
        .unwrap_or("");

    let out = gcloud
        .describe(&project, &args.target.service, &region, &args.format, account)
        .await
        .with_context(|| format!("Failed to describe service {}", args.target.service))?;

    if args.format == "json" {
        let value: serde_json::Value =
            serde_json::from_str(&out).context("gcloud returned invalid JSON")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", out);
    }
    Ok(())
}

pub async fn env_vars(args: &ServiceArgs, settings: &Settings) -> Result<()> {
    let gcloud = Gcloud::new(&settings.gcloud.binary);
    let project = resolve_project(args.project.as_deref(), settings)?;
    let region = resolve_region(args.region.as_deref(), settings);

    let names = gcloud
        .env_vars(&project, &args.service, &region)
        .await
        .with_context(|| format!("Failed to read env vars of {}", args.service))?;

    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub async fn open(args: &OpenArgs, settings: &Settings) -> Result<()> {
    println!("{}", "Opening Cloud Run service source...".bold().green());

    if !args.directory.is_dir() {
        return Err(anyhow!("Directory not found: {}", args.directory.display()));
    }

    let service = match &args.service {
        Some(name) => name.clone(),
        None => repo::dir_name(&args.directory)
            .map(|name| ServiceName::from_candidate(&name).into_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "Could not derive a service name from {}",
                    args.directory.display()
                )
            })?,
    };
    println!("  {} Service name: {}", "→".bold().blue(), service.yellow());

    let project = resolve_project(args.project.as_deref(), settings)?;
    let region = resolve_region(args.region.as_deref(), settings);

    let gcloud = Gcloud::new(&settings.gcloud.binary);
    gcloud
        .check_installed()
        .await
        .context("The Google Cloud SDK is required. Please install gcloud.")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!("Looking up {} in {} ({})...", service, project, region));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let lookup = gcloud.service_url(&project, &service, &region).await;
    spinner.finish_and_clear();

    match lookup {
        Ok(url) => {
            println!("  {} Deployed at {}", "✓".bold().green(), url.yellow());

            let names = gcloud
                .env_vars(&project, &service, &region)
                .await
                .with_context(|| format!("Failed to read env vars of {}", service))?;
            if names.is_empty() {
                println!("  {} No environment variables set", "ℹ".bold().blue());
            } else {
                println!("  {} Environment variables:", "ℹ".bold().blue());
                for name in names {
                    println!("      {}", name);
                }
            }
        }
        Err(GcloudError::CommandFailed { stderr, .. }) => {
            tracing::debug!(%stderr, "service lookup failed");
            println!(
                "  {} Service {} is not deployed in {} ({})",
                "⚠".bold().yellow(),
                service.yellow(),
                project,
                region
            );
        }
        Err(e) => return Err(e).context("Failed to look up service"),
    }

    if args.no_editor {
        return Ok(());
    }
    launch_editor(&settings.editor(), &args.directory).await
}

pub async fn config_view(settings: &Settings, path: &Path) -> Result<()> {
    println!("{}", "Current configuration:".bold().green());
    println!("  {} File: {}", "ℹ".bold().blue(), path.display());
    println!("{:#?}", settings);
    Ok(())
}

pub async fn config_path(path: &Path) -> Result<()> {
    println!("{}", path.display());
    Ok(())
}

pub async fn config_reset(path: &Path) -> Result<()> {
    println!("{}", "Resetting configuration to default...".bold().yellow());
    crate::config::write_default_config(path).context("Failed to reset configuration")?;
    println!("  {} Configuration reset to default", "✓".bold().green());
    Ok(())
}

/// `--project`, then `gcloud.project` from config, then an interactive prompt.
pub fn resolve_project(arg: Option<&str>, settings: &Settings) -> Result<String> {
    if let Some(project) = arg.or(settings.gcloud.project.as_deref()) {
        return Ok(project.to_string());
    }
    let project: String = dialoguer::Input::new()
        .with_prompt("Google Cloud project")
        .interact_text()
        .context("No project given and none configured")?;
    Ok(project)
}

pub fn resolve_region(arg: Option<&str>, settings: &Settings) -> String {
    arg.unwrap_or(&settings.gcloud.region).to_string()
}

async fn launch_editor(editor: &str, dir: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("No editor configured"))?;

    println!(
        "  {} Opening {} with {}...",
        "→".bold().blue(),
        dir.display(),
        program.yellow()
    );
    tracing::debug!(editor, dir = %dir.display(), "launching editor");

    let status = TokioCommand::new(program)
        .args(parts)
        .arg(dir)
        .status()
        .await
        .with_context(|| format!("Failed to launch editor {}", program))?;

    if status.success() {
        println!("  {} Editor closed", "✓".bold().green());
        Ok(())
    } else {
        Err(anyhow!("Editor {} exited with {}", program, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcloudSettings;

    fn settings(project: Option<&str>) -> Settings {
        Settings {
            gcloud: GcloudSettings {
                binary: "gcloud".into(),
                region: "europe-west1".into(),
                project: project.map(String::from),
                account: None,
            },
            editor: None,
        }
    }

    #[test]
    fn cli_parses_open_defaults() {
        let cli = Cli::parse_from(["cloudshell-open", "open", "--no-editor"]);
        match cli.command {
            Commands::Open(args) => {
                assert_eq!(args.directory, PathBuf::from("."));
                assert!(args.no_editor);
                assert!(args.service.is_none());
            }
            _ => panic!("expected open"),
        }
    }

    #[test]
    fn cli_parses_describe() {
        let cli = Cli::parse_from([
            "cloudshell-open",
            "-v",
            "describe",
            "--service",
            "cloud-run-hello",
            "--format",
            "value(metadata.name)",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Describe(args) => {
                assert_eq!(args.target.service, "cloud-run-hello");
                assert_eq!(args.format, "value(metadata.name)");
                assert!(args.target.project.is_none());
            }
            _ => panic!("expected describe"),
        }
    }

    #[test]
    fn flag_project_overrides_config() {
        let s = settings(Some("from-config"));
        assert_eq!(resolve_project(Some("from-flag"), &s).unwrap(), "from-flag");
        assert_eq!(resolve_project(None, &s).unwrap(), "from-config");
    }

    #[test]
    fn region_falls_back_to_config() {
        let s = settings(None);
        assert_eq!(resolve_region(None, &s), "europe-west1");
        assert_eq!(resolve_region(Some("asia-east1"), &s), "asia-east1");
    }

    #[tokio::test]
    async fn open_rejects_missing_directory() {
        let args = OpenArgs {
            directory: PathBuf::from("/definitely/not/here"),
            service: None,
            project: Some("p".into()),
            region: None,
            no_editor: true,
        };
        assert!(open(&args, &settings(None)).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_fails_when_gcloud_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(Some("p"));
        s.gcloud.binary = "false".into();
        let args = OpenArgs {
            directory: dir.path().to_path_buf(),
            service: Some("svc".into()),
            project: None,
            region: None,
            no_editor: true,
        };
        assert!(open(&args, &s).await.is_err());
    }

    /// Settings whose gcloud is a shell script and whose editor always succeeds.
    #[cfg(unix)]
    fn scripted(dir: &Path, script: &str) -> Settings {
        let path = dir.join("gcloud.sh");
        std::fs::write(&path, script).unwrap();
        let mut s = settings(Some("p"));
        s.gcloud.binary = format!("sh {}", path.display());
        s.editor = Some("true".into());
        s
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_warns_on_missing_service_and_still_opens_editor() {
        let tools = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        let s = scripted(
            tools.path(),
            "case \"$1\" in --version) exit 0;; esac\n\
             echo 'ERROR: Cannot find service' >&2\n\
             exit 1\n",
        );
        let args = OpenArgs {
            directory: checkout.path().to_path_buf(),
            service: None,
            project: None,
            region: Some("r".into()),
            no_editor: false,
        };
        open(&args, &s).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_reads_url_and_env_of_deployed_service() {
        let tools = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        let s = scripted(
            tools.path(),
            "case \"$1\" in --version) exit 0;; esac\n\
             for last; do :; done\n\
             case \"$last\" in\n\
             'value(status.url)') echo https://cloud-run-hello.a.run.app;;\n\
             *) echo 'FOO;BAR';;\n\
             esac\n",
        );
        let args = OpenArgs {
            directory: checkout.path().to_path_buf(),
            service: Some("cloud-run-hello".into()),
            project: None,
            region: None,
            no_editor: false,
        };
        open(&args, &s).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_surfaces_failing_editor() {
        let tools = tempfile::tempdir().unwrap();
        let checkout = tempfile::tempdir().unwrap();
        let mut s = scripted(tools.path(), "exit 0\n");
        s.editor = Some("false".into());
        let args = OpenArgs {
            directory: checkout.path().to_path_buf(),
            service: Some("svc".into()),
            project: None,
            region: None,
            no_editor: false,
        };
        assert!(open(&args, &s).await.is_err());
    }
}
