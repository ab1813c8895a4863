use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use drsite_api::{Site, SiteContext, VariableDocument};
use drsite_core::{DocumentPaths, SiteConfig};
use drsite_gcp::{Discovery, GcloudCli, RetryPolicy, TimeoutPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod confirm;
mod pipeline;
mod terraform;
mod workspace;

use confirm::StdinConfirmer;
use pipeline::Pipeline;
use terraform::TerraformCli;
use workspace::{Action, Orchestrator, Outcome, RunOptions, Target};

/// Directory under the root holding config.json and the generated documents
const CONFIG_DIR: &str = "configs";

#[derive(Parser)]
#[command(name = "drsite")]
#[command(version)]
#[command(about = "GCP primary/DR variable file generator and Terraform workspace runner", long_about = None)]
struct Cli {
    /// Terraform root module directory
    #[arg(long, env = "DRSITE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Site configuration file (defaults to <root>/configs/config.json)
    #[arg(long, env = "DRSITE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "DRSITE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[arg(long, env = "DRSITE_GCLOUD", default_value = "gcloud")]
    gcloud: PathBuf,

    #[arg(long, env = "DRSITE_TERRAFORM", default_value = "terraform")]
    terraform: PathBuf,

    /// Seconds allowed for each inventory call
    #[arg(long, env = "DRSITE_DISCOVERY_TIMEOUT", default_value_t = 120)]
    discovery_timeout: u64,

    /// Retries for throttled or unavailable inventory calls
    #[arg(long, env = "DRSITE_DISCOVERY_RETRIES", default_value_t = 3)]
    discovery_retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the primary site and write both variable files
    Generate(ClusterArgs),
    /// Run a Terraform action in the workspace of one site
    Run(RunArgs),
    /// Print the JSON Schema of the variable file
    Schema,
}

#[derive(Args)]
struct ClusterArgs {
    #[arg(long)]
    environment: String,

    #[arg(long)]
    cluster: String,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    cluster: ClusterArgs,

    #[arg(long, value_enum)]
    action: Action,

    #[arg(long, default_value_t = Site::Primary)]
    target_site: Site,

    /// Skip the confirmation prompt of apply and destroy
    #[arg(long)]
    auto_approve: bool,

    /// Pass -reconfigure to init
    #[arg(long)]
    force_reinit: bool,

    /// Regenerate both variable files before running the action
    #[arg(long)]
    refresh_resource_vars: bool,

    /// Use -detailed-exitcode for plan
    #[arg(long)]
    detailed_output: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    let terraform = TerraformCli::new(&cli.terraform, &cli.root);

    // gcloud dies with `run`; a streamed terraform is waited on
    tokio::select! {
        result = run(&cli, &terraform) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, waiting for terraform to exit");
            terraform.settle().await;
            bail!("interrupted")
        }
    }
}

async fn run(cli: &Cli, terraform: &TerraformCli) -> Result<()> {
    match &cli.command {
        Commands::Schema => {
            let schema = schemars::schema_for!(VariableDocument);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Generate(args) => {
            let pipeline = build_pipeline(cli)?;
            let paths = pipeline.generate(&args.environment, &args.cluster).await?;
            println!("{}", paths.primary.display());
            println!("{}", paths.dr.display());
            Ok(())
        }
        Commands::Run(args) => run_action(cli, args, terraform).await,
    }
}

async fn run_action(cli: &Cli, args: &RunArgs, terraform: &TerraformCli) -> Result<()> {
    let pipeline = build_pipeline(cli)?;
    let ClusterArgs {
        environment,
        cluster,
    } = &args.cluster;

    if args.refresh_resource_vars {
        pipeline.generate(environment, cluster).await?;
    }

    let context = SiteContext::new(environment.as_str(), cluster.as_str(), args.target_site);
    let settings = pipeline.config().site_settings(&context)?;
    let paths = DocumentPaths::new(&cli.root.join(CONFIG_DIR), environment, cluster);
    let target = Target::new(&settings, &paths);

    let orchestrator = Orchestrator::new(
        Arc::new(terraform.clone()),
        Arc::new(StdinConfirmer),
    );
    let options = RunOptions {
        auto_approve: args.auto_approve,
        force_reinit: args.force_reinit,
        detailed_output: args.detailed_output,
    };

    let report = orchestrator
        .run(&target, args.action, &options)
        .await
        .with_context(|| format!("terraform {} failed for {}", args.action, context))?;

    match report.outcome {
        Outcome::NoChanges => info!("No changes in {}", report.workspace),
        Outcome::ChangesPending => info!("Changes pending in {}", report.workspace),
        Outcome::Completed => {}
    }
    if !report.stdout.is_empty() {
        print!("{}", report.stdout);
    }
    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let config_dir = cli.root.join(CONFIG_DIR);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.json"));
    let config = SiteConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let gcloud = GcloudCli::new(
        &cli.gcloud,
        TimeoutPolicy {
            call_timeout: Duration::from_secs(cli.discovery_timeout),
        },
    );
    let discovery = Discovery::new(
        Arc::new(gcloud),
        RetryPolicy::with_max_retries(cli.discovery_retries),
    );
    Ok(Pipeline::new(config, config_dir, discovery))
}
