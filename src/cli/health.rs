use std::time::Instant;

use crate::config::AppConfig;
use crate::error::RefMatchError;
use crate::sources::auth::TokenProvider;
use crate::sources::catalog::CatalogClient;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub upstream: String,
    pub status: String,
    pub latency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affects: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let show_affects = self.rows.iter().any(|row| row.affects.is_some());
        out.push_str("# refmatch Health Check\n\n");
        if show_affects {
            out.push_str("| Upstream | Status | Latency | Affects |\n");
            out.push_str("|----------|--------|---------|---------|\n");
            for row in &self.rows {
                let affects = row.affects.as_deref().unwrap_or("-");
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    row.upstream, row.status, row.latency, affects
                ));
            }
        } else {
            out.push_str("| Upstream | Status | Latency |\n");
            out.push_str("|----------|--------|---------|\n");
            for row in &self.rows {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    row.upstream, row.status, row.latency
                ));
            }
        }
        out.push_str(&format!(
            "\nStatus: {}/{} upstreams healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_catalog(catalog: &CatalogClient) -> HealthRow {
    let start = Instant::now();
    match catalog.search("FBC").await {
        Ok(_) => HealthRow {
            upstream: "Test catalog".into(),
            status: "ok".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
            affects: None,
        },
        Err(err) => HealthRow {
            upstream: "Test catalog".into(),
            status: "error".into(),
            latency: short_reason(&err, start),
            affects: Some("all test matching (results degrade to passthrough)".into()),
        },
    }
}

async fn check_token_issuer(auth: &TokenProvider) -> HealthRow {
    if !auth.is_enabled() {
        return HealthRow {
            upstream: "Token issuer".into(),
            status: "disabled".into(),
            latency: "-".into(),
            affects: None,
        };
    }

    let start = Instant::now();
    match auth.get_token().await {
        Some(_) => HealthRow {
            upstream: "Token issuer".into(),
            status: "ok".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
            affects: None,
        },
        None => HealthRow {
            upstream: "Token issuer".into(),
            status: "error".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
            affects: Some("catalog calls proceed unauthenticated".into()),
        },
    }
}

fn short_reason(err: &RefMatchError, start: Instant) -> String {
    match err {
        RefMatchError::Transport { source, .. } if source.is_timeout() => "timeout".into(),
        RefMatchError::Transport { source, .. } if source.is_connect() => "connect".into(),
        RefMatchError::Api { .. } => format!("{}ms ({err})", start.elapsed().as_millis()),
        _ => "error".into(),
    }
}

/// Probes the configured upstreams and reports per-row status.
///
/// # Errors
///
/// Returns an error only when the shared HTTP client cannot be created.
pub async fn check(config: &AppConfig) -> Result<HealthReport, RefMatchError> {
    let auth = TokenProvider::new(&config.oauth)?;
    let catalog = CatalogClient::new(config, auth.clone())?;

    let (catalog_row, issuer_row) =
        tokio::join!(check_catalog(&catalog), check_token_issuer(&auth));

    let rows = vec![catalog_row, issuer_row];
    let healthy = rows
        .iter()
        .filter(|row| row.status == "ok" || row.status == "disabled")
        .count();
    Ok(HealthReport {
        healthy,
        total: rows.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::{HealthReport, HealthRow};

    #[test]
    fn markdown_shows_affects_column_when_present() {
        let report = HealthReport {
            healthy: 1,
            total: 2,
            rows: vec![
                HealthRow {
                    upstream: "Test catalog".into(),
                    status: "ok".into(),
                    latency: "12ms".into(),
                    affects: None,
                },
                HealthRow {
                    upstream: "Token issuer".into(),
                    status: "error".into(),
                    latency: "30ms".into(),
                    affects: Some("catalog calls proceed unauthenticated".into()),
                },
            ],
        };
        let md = report.to_markdown();
        assert!(md.contains("| Upstream | Status | Latency | Affects |"));
        assert!(md.contains("proceed unauthenticated"));
        assert!(md.contains("1/2 upstreams healthy"));
        assert!(!report.all_healthy());
    }

    #[test]
    fn markdown_omits_affects_column_when_all_healthy() {
        let report = HealthReport {
            healthy: 2,
            total: 2,
            rows: vec![
                HealthRow {
                    upstream: "Test catalog".into(),
                    status: "ok".into(),
                    latency: "12ms".into(),
                    affects: None,
                },
                HealthRow {
                    upstream: "Token issuer".into(),
                    status: "disabled".into(),
                    latency: "-".into(),
                    affects: None,
                },
            ],
        };
        let md = report.to_markdown();
        assert!(md.contains("| Upstream | Status | Latency |"));
        assert!(!md.contains("| Upstream | Status | Latency | Affects |"));
        assert!(report.all_healthy());
    }
}
