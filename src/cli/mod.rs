//! Top-level CLI parsing and command execution.

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::entities::test_match::{self, MatchPolicy, MatchedTest};
use crate::sources::auth::TokenProvider;
use crate::sources::catalog::CatalogClient;
use crate::transform::terms;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "refmatch",
    about = "Normalize pathology test requests and match them against the test catalog",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON instead of Markdown
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match test request strings against the catalog
    #[command(after_help = "\
EXAMPLES:
  refmatch match FBC \"Vit B12/Folate\" EIFT
  refmatch match --org au-lab-01 \"U&E\"")]
    Match {
        /// Test request strings, exactly as written on the referral
        #[arg(value_name = "TERM", required = true)]
        terms: Vec<String>,
        /// Tenant organization code sent with every catalog call
        #[arg(long)]
        org: Option<String>,
        /// Catalog region for batch matching
        #[arg(long)]
        region: Option<String>,
    },
    /// Show how a test request is normalized, without any catalog call
    #[command(after_help = "\
EXAMPLES:
  refmatch normalize \"Vit B12/Folate\"
  refmatch normalize EIFT")]
    Normalize {
        /// Test request string
        #[arg(value_name = "TERM")]
        term: String,
    },
    /// Check catalog and token issuer connectivity
    Health,
    /// Show version
    Version,
}

pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = AppConfig::from_env();

    match cli.command {
        Commands::Match { terms, org, region } => {
            if let Some(org) = org {
                config.organization = org;
            }
            if let Some(region) = region {
                config.region = region;
            }

            let auth = TokenProvider::new(&config.oauth)?;
            let catalog = CatalogClient::new(&config, auth)?;
            let policy = MatchPolicy::default();

            let results = test_match::match_tests(&catalog, &policy, &terms).await;
            info!(
                requested = terms.len(),
                matched = results.len(),
                organization = config.organization.as_str(),
                "test matching complete"
            );

            if cli.json {
                Ok(serde_json::to_string_pretty(&results)?)
            } else {
                Ok(match_markdown(&results))
            }
        }
        Commands::Normalize { term } => {
            let normalized = terms::normalize(&term);
            if cli.json {
                Ok(serde_json::to_string_pretty(&normalized)?)
            } else {
                Ok(normalize_markdown(&term, &normalized))
            }
        }
        Commands::Health => {
            let report = health::check(&config).await?;
            if cli.json {
                Ok(serde_json::to_string_pretty(&report)?)
            } else {
                Ok(report.to_markdown())
            }
        }
        Commands::Version => Ok(format!("refmatch {}", env!("CARGO_PKG_VERSION"))),
    }
}

fn match_markdown(results: &[MatchedTest]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Matched tests ({})\n\n", results.len()));
    if results.is_empty() {
        out.push_str("No matchable terms in the input.\n");
        return out;
    }
    out.push_str("| Original | Matched | Code | Confidence |\n");
    out.push_str("|----------|---------|------|------------|\n");
    for row in results {
        out.push_str(&format!(
            "| {} | {} | {} | {:.2} |\n",
            row.original, row.matched, row.test_id, row.confidence
        ));
    }
    out
}

fn normalize_markdown(term: &str, normalized: &[String]) -> String {
    if normalized.is_empty() {
        return format!("\"{term}\" normalizes to no searchable terms\n");
    }
    let mut out = String::new();
    out.push_str(&format!("\"{term}\" normalizes to:\n"));
    for item in normalized {
        out.push_str(&format!("- {item}\n"));
    }
    out
}
