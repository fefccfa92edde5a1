use clap::{Parser, Subcommand};

use flowpulse_db::RecordFilters;

#[derive(Debug, Parser)]
#[command(name = "flowpulse-cli")]
#[command(about = "FlowPulse command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one full collection pass over all configured sources.
    Collect,
    /// Print the top records by engagement score.
    Top {
        /// Restrict to one platform (video, trend, forum).
        #[arg(long)]
        platform: Option<String>,
        /// Number of records to print.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Print store-wide aggregate statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = flowpulse_core::load_app_config()?;
    let pool_config = flowpulse_db::PoolConfig::from_app_config(&config);
    let pool = flowpulse_db::connect_pool(&config.database_url, pool_config).await?;
    flowpulse_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Collect => collect(pool, &config).await,
        Commands::Top { platform, limit } => top(pool, platform.as_deref(), limit).await,
        Commands::Stats => stats(pool).await,
    }
}

async fn collect(pool: sqlx::PgPool, config: &flowpulse_core::AppConfig) -> anyhow::Result<()> {
    let catalog = flowpulse_core::load_keyword_catalog(&config.keywords_path)?;
    let collector = flowpulse_collector::Collector::from_config(pool, config, catalog)?;

    let report = collector.run("cli").await?;
    println!("run {} finished: {}", report.public_id, report.status.as_str());
    for platform in &report.platforms {
        println!(
            "  {:<6} fetched={} created={} updated={} unchanged={} failed={}",
            platform.platform.as_str(),
            platform.fetched,
            platform.created,
            platform.updated,
            platform.unchanged,
            platform.failed,
        );
        if let Some(error) = &platform.error_message {
            println!("         error: {error}");
        }
    }
    Ok(())
}

async fn top(pool: sqlx::PgPool, platform: Option<&str>, limit: i64) -> anyhow::Result<()> {
    let (rows, total) = flowpulse_db::list_workflow_records(
        &pool,
        RecordFilters {
            platform,
            limit,
            ..RecordFilters::default()
        },
    )
    .await?;

    println!("{total} records total");
    for row in rows {
        println!(
            "{:>7.2}  [{:<5}]  {}",
            row.engagement_score, row.platform, row.title
        );
    }
    Ok(())
}

async fn stats(pool: sqlx::PgPool) -> anyhow::Result<()> {
    let summary = flowpulse_db::stats(&pool).await?;

    println!("total records: {}", summary.total_records);
    for platform in &summary.platforms {
        println!(
            "  {:<6} count={} avg_engagement={:.2}",
            platform.platform,
            platform.count,
            platform.avg_engagement.unwrap_or(0.0),
        );
    }
    match summary.last_run_at {
        Some(at) => println!("last completed run: {at}"),
        None => println!("no completed runs yet"),
    }
    Ok(())
}
