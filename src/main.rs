use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use tripfeatures::{pipeline, PipelineConfig, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tripfeatures=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) start the session ────────────────────────────────────────
    let config = PipelineConfig::default();
    info!(
        source = %config.source,
        staging = %config.staging_dir.display(),
        enriched = %config.enriched_dir.display(),
        "configured"
    );
    let session = Session::start(config)?;

    // ─── 3) ingest, then derive features ─────────────────────────────
    let summary = match pipeline::run(&session).await {
        Ok(summary) => summary,
        Err(e) => {
            let kind = e.kind();
            let chain: Vec<String> = anyhow::Error::from(e)
                .chain()
                .map(|c| c.to_string())
                .collect();
            error!(kind, causes = ?chain, "pipeline failed");
            drop(session);
            anyhow::bail!("pipeline failed: {}", chain.join(": "));
        }
    };

    // ─── 4) report ───────────────────────────────────────────────────
    info!(summary = %serde_json::to_string(&summary)?, "run summary");
    drop(session);
    Ok(())
}
