use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use newsclust::audit::Audit;
use newsclust::config::{Cli, Config};
use newsclust::db::Database;
use newsclust::logging;
use newsclust::pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().apply_cli(&cli);

    logging::configure_logging(&config.log_dir, &config.log_filter)?;
    info!(target: newsclust::TARGET_PROCESSOR, "starting processor");

    let db = Arc::new(Database::new(&config.database_path).await?);

    if cli.audit_once {
        let audit = Audit::new(db.clone());
        let evaluations = audit.run_audit(None).await?;
        let params = audit.propose_params(&evaluations).await?;
        info!(
            target: newsclust::TARGET_AUDIT,
            evaluated = evaluations.len(),
            proposed_threshold = params.similarity_threshold,
            "audit-once run complete"
        );
        return Ok(());
    }

    let pipeline = Pipeline::with_database(config, db);
    pipeline.run().await?;

    Ok(())
}
