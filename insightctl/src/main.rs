use clap::{CommandFactory, Parser};
use figment::Figment;
use figment::providers::{Format, Yaml};
use insightctl::config::{Args, Command};
use insightctl::errors::{ReportError, ReportErrorKind};
use insightctl::search_console::{SearchConsoleOutcome, candidates};
use insightctl::{AccessTokenProvider, Config, DateRange, Insights, ReportSpec, StaticAccessToken, telemetry};
use serde::Serialize;

/// Default Search Console window when no dates are given
const DEFAULT_WINDOW_DAYS: u32 = 28;

/// Load a report spec from a YAML (or JSON) file
fn load_spec(path: &str) -> anyhow::Result<ReportSpec> {
    let contents = std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Failed to read spec file {path}: {e}"))?;
    Ok(Figment::from(Yaml::string(&contents)).extract()?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.log_format)?;

    tracing::debug!("{:?}", args);

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let tokens = StaticAccessToken::new(config.access_token.clone());

    match command {
        Command::Report { property, spec } => {
            let spec = load_spec(&spec)?;
            let insights = Insights::new(&config)?;
            let report = insights.report(&spec, &property, &tokens).await;
            print_json(&report)?;
        }
        Command::SearchConsole {
            site_url,
            start,
            end,
            limit,
        } => {
            let default_range = DateRange::last_days(DEFAULT_WINDOW_DAYS);
            let range = DateRange {
                start: start.or(default_range.start),
                end: end.or(default_range.end),
            };

            let outcome = match tokens.access_token().await {
                Some(token) => {
                    let insights = Insights::new(&config)?;
                    SearchConsoleOutcome::from(insights.search_console(&site_url, &range, limit, &token).await)
                }
                None => SearchConsoleOutcome::Error(ReportError::new(
                    ReportErrorKind::MissingAccessToken,
                    "Set INSIGHTCTL_ACCESS_TOKEN or access_token in the config file.",
                )),
            };
            print_json(&outcome)?;
        }
        Command::Candidates { site_url } => match candidates::site_host(&site_url) {
            Some(host) => print_json(&candidates::candidates(&host))?,
            None => anyhow::bail!("No host found in site URL {site_url:?}"),
        },
    }

    Ok(())
}
