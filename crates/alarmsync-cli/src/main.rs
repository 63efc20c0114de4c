use std::sync::Arc;

use alarmsync_aws::apigateway::ApiGatewayClient;
use alarmsync_aws::cloudwatch::CloudWatchClient;
use alarmsync_aws::tagging::TaggingClient;
use alarmsync_aws::AwsCredentials;
use alarmsync_common::config::SyncConfig;
use alarmsync_common::types::ChangeSet;
use alarmsync_discovery::{build_providers, expand_metric_alarms, DiscoveryClients};
use alarmsync_engine::apply::ApplyExecutor;
use alarmsync_engine::reconcile::build_change_set;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  alarmsync plan <config.toml>                        Compute and print the change set, touch nothing");
    eprintln!("  alarmsync apply <config.toml> [--notify <arn>]...   Apply the change set to CloudWatch");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("alarmsync=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("plan") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("plan requires a <config.toml> argument")
            })?;
            run_plan(config_path).await
        }
        Some("apply") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("apply requires a <config.toml> argument")
            })?;
            let extra_actions = parse_notify_args(&args[3..])?;
            run_apply(config_path, extra_actions).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Err(anyhow::anyhow!("expected a `plan` or `apply` subcommand"))
        }
    }
}

/// Parse repeated `--notify <arn>` pairs following the config path.
fn parse_notify_args(args: &[String]) -> Result<Vec<String>> {
    let mut extra_actions = Vec::new();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        if flag != "--notify" {
            print_usage();
            anyhow::bail!("unexpected argument `{flag}`");
        }
        let arn = iter.next().ok_or_else(|| {
            print_usage();
            anyhow::anyhow!("--notify requires a notification target ARN")
        })?;
        extra_actions.push(arn.clone());
    }
    Ok(extra_actions)
}

struct Session {
    config: SyncConfig,
    cloudwatch: Arc<CloudWatchClient>,
}

/// Load configuration, build the service clients, run discovery and
/// expansion for every rule, and diff against the live inventory.
async fn reconcile(config_path: &str) -> Result<(Session, ChangeSet)> {
    let config = SyncConfig::load(config_path)?;
    let region = config.globals.region.clone();
    let credentials = AwsCredentials::from_env()?;

    tracing::info!(
        region = %region,
        prefix = %config.globals.alarm.alarm_name_prefix,
        rules = config.resources.len(),
        "Starting reconciliation"
    );

    let clients = DiscoveryClients {
        tagging: Arc::new(TaggingClient::new(&region, credentials.clone())?),
        apigateway: Arc::new(ApiGatewayClient::new(&region, credentials.clone())?),
    };
    let cloudwatch = Arc::new(CloudWatchClient::new(&region, credentials)?);

    // Build every provider before issuing any discovery call, so one bad
    // rule fails the run with nothing touched.
    let providers = build_providers(&config, &clients)?;

    let mut params = Vec::new();
    for (rule_name, provider) in &providers {
        let rule = &config.resources[rule_name];
        let expanded = expand_metric_alarms(provider.as_ref(), rule).await?;
        tracing::info!(
            rule = %rule_name,
            kind = provider.kind(),
            alarms = expanded.len(),
            "Expanded resource rule"
        );
        params.extend(expanded);
    }

    let change_set = build_change_set(
        cloudwatch.as_ref(),
        &config.globals.alarm.alarm_name_prefix,
        params,
    )
    .await?;

    Ok((Session { config, cloudwatch }, change_set))
}

async fn run_plan(config_path: &str) -> Result<()> {
    let (_, change_set) = reconcile(config_path).await?;
    print_change_set(&change_set);
    Ok(())
}

async fn run_apply(config_path: &str, extra_actions: Vec<String>) -> Result<()> {
    let (session, change_set) = reconcile(config_path).await?;
    print_change_set(&change_set);

    if change_set.is_noop() {
        tracing::info!("Alarms already in sync, nothing to apply");
        return Ok(());
    }

    let executor = ApplyExecutor::new(
        session.cloudwatch,
        &session.config.globals.alarm,
        session.config.globals.api_call_interval_millis,
        &extra_actions,
    );
    executor.apply(&change_set).await
}

#[allow(clippy::print_stdout)]
fn print_change_set(change_set: &ChangeSet) {
    println!("Alarms to create ({}):", change_set.to_create.len());
    for spec in &change_set.to_create {
        println!("  + {}", spec.alarm_name);
    }
    println!("Alarms to keep ({}):", change_set.to_keep.len());
    for spec in &change_set.to_keep {
        println!("  = {}", spec.alarm_name);
    }
    println!("Alarms to delete ({}):", change_set.to_delete.len());
    for alarm_name in &change_set.to_delete {
        println!("  - {alarm_name}");
    }
}
