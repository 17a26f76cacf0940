// ABOUTME: CLI binary for the Credence journalistic-quality scorer.
// ABOUTME: Scores URLs or a local HTML file and prints JSON reports, optionally with LLM features.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use credence_scorer::options::DEFAULT_PROVIDER;
use credence_scorer::{Client, LlmExtractor, SiteReport};
use serde_json::{json, Value};
use tracing::warn;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Score web pages for statistics, quotations and citations.
#[derive(Parser, Debug)]
#[command(name = "credence")]
#[command(about = "Score web pages for journalistic-quality signals and print JSON", long_about = None)]
struct Args {
    /// URLs to analyze (fetch mode)
    #[arg()]
    urls: Vec<String>,

    /// HTML file to analyze (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// URL the HTML file came from (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// Also ask a chat model for the six LLM features
    #[arg(long = "llm")]
    llm: bool,

    /// LLM provider and model as <provider>/<model>
    #[arg(long = "provider", default_value = DEFAULT_PROVIDER)]
    provider: String,

    /// Override the LLM provider's base URL
    #[arg(long = "llm-base-url")]
    llm_base_url: Option<String>,

    /// Bearer token for the LLM provider
    #[arg(long = "api-token", env = "CREDENCE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Page fetch timeout in seconds, for both the heuristic and the LLM path
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    /// Include the signal breakdown behind each score
    #[arg(long = "explain")]
    explain: bool,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

/// Outcome for one target, keyed by the URL it was analyzed as.
struct Outcome {
    url: String,
    report: Result<SiteReport, String>,
}

fn init_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish()
        .try_init();
}

fn build_client(args: &Args) -> Client {
    let mut builder = Client::builder().allow_private_networks(args.allow_private_networks);
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

fn build_extractor(args: &Args) -> Result<LlmExtractor> {
    let mut builder = LlmExtractor::builder()
        .provider(&args.provider)
        .allow_private_networks(args.allow_private_networks);
    if let Some(base_url) = &args.llm_base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(token) = &args.api_token {
        builder = builder.api_token(token);
    }
    if let Some(secs) = args.timeout {
        builder = builder.fetch_timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

async fn analyze_file(
    client: &Client,
    extractor: Option<&LlmExtractor>,
    path: &Path,
    url: &str,
) -> Result<SiteReport> {
    let html = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut report = client.analyze_html(&html, url)?;
    if let Some(extractor) = extractor {
        match extractor.extract_from_html(url, &html).await {
            Ok(record) => report.llm_features = Some(record),
            Err(e) => {
                warn!(url, error = %e, "LLM feature extraction failed");
                report.llm_error = Some(e.to_string());
            }
        }
    }
    Ok(report)
}

async fn analyze_url(
    client: &Client,
    extractor: Option<&LlmExtractor>,
    url: &str,
) -> Result<SiteReport> {
    let report = match extractor {
        Some(extractor) => client.analyze_with_features(url, extractor).await?,
        None => client.analyze_report(url).await?,
    };
    Ok(report)
}

fn report_value(report: &SiteReport, explain: bool) -> Result<Value> {
    let mut value = serde_json::to_value(report)?;
    if !explain {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("breakdown");
        }
    }
    Ok(value)
}

/// Shape the output.
///
/// One target that succeeded prints its report on its own; anything else
/// prints an envelope with every outcome and the counts.
fn render(outcomes: &[Outcome], explain: bool) -> Result<Value> {
    if let [Outcome {
        report: Ok(report), ..
    }] = outcomes
    {
        return report_value(report, explain);
    }

    let mut reports = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        reports.push(match &outcome.report {
            Ok(report) => report_value(report, explain)?,
            Err(error) => json!({ "url": outcome.url, "error": error }),
        });
    }
    let analyzed = outcomes.iter().filter(|o| o.report.is_ok()).count();
    Ok(json!({
        "reports": reports,
        "total": outcomes.len(),
        "analyzed": analyzed,
        "failed": outcomes.len() - analyzed
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    if args.html.is_some() && args.url.is_none() {
        eprintln!("error: --url is required when using --html");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.url.is_some() {
        eprintln!("error: --url is only valid with --html; pass URLs as positional arguments");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.urls.is_empty() {
        eprintln!("error: at least one URL is required, or use --html with --url");
        return ExitCode::from(1);
    }

    if args.html.is_some() && !args.urls.is_empty() {
        eprintln!("error: cannot use both --html and positional URLs");
        return ExitCode::from(1);
    }

    let client = build_client(&args);
    let extractor = if args.llm {
        match build_extractor(&args) {
            Ok(extractor) => Some(extractor),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        None
    };

    let mut outcomes = Vec::new();
    match (&args.html, &args.url) {
        (Some(path), Some(url)) => {
            let report = analyze_file(&client, extractor.as_ref(), path, url).await;
            outcomes.push(Outcome {
                url: url.clone(),
                report: report.map_err(|e| format!("{:#}", e)),
            });
        }
        _ => {
            for url in &args.urls {
                let report = analyze_url(&client, extractor.as_ref(), url).await;
                outcomes.push(Outcome {
                    url: url.clone(),
                    report: report.map_err(|e| format!("{:#}", e)),
                });
            }
        }
    }

    for outcome in &outcomes {
        if let Err(e) = &outcome.report {
            eprintln!("error analyzing {}: {}", outcome.url, e);
        }
    }
    let had_error = outcomes.iter().any(|o| o.report.is_err());

    let output = match render(&outcomes, args.explain).and_then(|value| {
        let text = if args.compact {
            serde_json::to_string(&value)?
        } else {
            serde_json::to_string_pretty(&value)?
        };
        Ok(text)
    }) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Some(output_path) = &args.output {
        if let Err(e) = fs::write(output_path, &output) {
            eprintln!("error writing to {:?}: {}", output_path, e);
            return ExitCode::from(1);
        }
    } else {
        println!("{}", output);
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
