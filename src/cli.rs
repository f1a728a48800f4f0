use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::config::{Config, RunSettings};
use crate::output;
use crate::providers::{AdoClient, AdoProvider, WebhookClient};
use crate::workflow::{PrevUpdater, UpdateFieldsParams};

#[derive(Parser)]
#[command(name = "prev-updater")]
#[command(
    author,
    version,
    about = "Stamps Azure DevOps work items with the version of the pipeline run that shipped them",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./prev-updater.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log file (defaults to ~/.prev-updater/prev-updater.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the version field of work items linked to the last runs
    Start(StartArgs),

    /// Print the version
    Version,
}

#[derive(Args, Debug, Default)]
struct StartArgs {
    #[arg(short, long, env = "ADO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Azure DevOps base URL [default: https://dev.azure.com/]
    #[arg(short, long)]
    base_url: Option<String>,

    #[arg(short, long)]
    organization: Option<String>,

    #[arg(short, long)]
    project: Option<String>,

    #[arg(short = 'i', long)]
    pipeline_id: Option<u64>,

    /// Repository ID or name, used to resolve the default branch
    #[arg(short, long)]
    repository: Option<String>,

    /// Version field, e.g. Custom.PrevVersion or /fields/Custom.PrevVersion
    #[arg(short, long)]
    field: Option<String>,

    /// Only consider runs whose ref contains this text
    #[arg(long)]
    branch_name: Option<String>,

    /// Endpoint receiving the run summary
    #[arg(long, env = "PREV_UPDATER_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Maximum parallel work item fetches [default: 16]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Timeout for a batch of parallel fetches, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Number of recent runs considered [default: 50]
    #[arg(long)]
    run_window: Option<usize>,

    /// Compute and print changes without writing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

impl StartArgs {
    /// Overlays the flags given on the command line onto `config`.
    fn apply_to(&self, config: &mut Config) {
        let ado = &mut config.ado;
        overlay(&mut ado.token, &self.token);
        if let Some(base_url) = &self.base_url {
            ado.base_url.clone_from(base_url);
        }
        overlay(&mut ado.organization, &self.organization);
        overlay(&mut ado.project, &self.project);
        if self.pipeline_id.is_some() {
            ado.pipeline_id = self.pipeline_id;
        }
        overlay(&mut ado.repository_id, &self.repository);
        overlay(&mut ado.field, &self.field);
        overlay(&mut ado.branch, &self.branch_name);
        overlay(&mut config.webhook.url, &self.webhook_url);

        let fetch = &mut config.fetch;
        if let Some(concurrency) = self.concurrency {
            fetch.concurrency = concurrency;
        }
        if self.timeout_secs.is_some() {
            fetch.timeout_secs = self.timeout_secs;
        }
        if let Some(run_window) = self.run_window {
            fetch.run_window = run_window;
        }
    }
}

fn overlay(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

impl Cli {
    pub fn log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref()
    }

    async fn execute_start(&self, args: &StartArgs) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        args.apply_to(&mut config);
        let settings = RunSettings::resolve(&config)?;

        info!(
            "Updating {} for pipeline {} in {}/{}",
            settings.field, settings.pipeline_id, settings.organization, settings.project
        );

        let client = AdoClient::new(
            &settings.base_url,
            &settings.organization,
            &settings.project,
            settings.token.clone(),
        )?;
        let provider = AdoProvider::new(client, settings.fan_out(), settings.run_window);
        let webhook = settings
            .webhook_url
            .as_deref()
            .map(WebhookClient::new)
            .transpose()?;
        if webhook.is_none() {
            info!("No webhook URL configured, the run summary will not be sent");
        }

        let updater = PrevUpdater::new(provider, webhook, settings.fan_out());
        let params = UpdateFieldsParams {
            pipeline_id: settings.pipeline_id,
            repository_id: settings.repository_id,
            field: settings.field,
            branch_name: settings.branch,
            dry_run: args.dry_run,
        };

        let report = updater
            .update_fields_by_last_runs(&params)
            .await
            .with_context(|| {
                format!(
                    "Failed to update work items of pipeline {}",
                    params.pipeline_id
                )
            })?;

        if let Some(report) = report {
            output::print_report(&report);
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Start(args) => self.execute_start(args).await,
            Commands::Version => {
                println!("prev-updater {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}
