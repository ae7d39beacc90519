use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use ti_core::storage::Store;
use ti_core::{AppConfig, Error, SystemClock, TextGenerator};
use ti_crawler::{CrawlManager, NaverNewsClient};
use ti_inference::{DisabledGenerator, GeminiClient, TokioSleeper};
use ti_report::{
    articles_to_csv, report_filename, BodyFormat, EmailAttachment, Mailer, PipelineOptions,
    ReportPipeline,
};
use ti_storage::{MemoryStore, SqliteStore};
use ti_trend::detector::{analyze_trends, TrendParams};
use ti_trend::keywords::KeywordExtractor;
use ti_web::{AppState, Scheduler};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ti", about = "News trend detection and report generation", version)]
struct Cli {
    /// Storage backend to run against.
    #[arg(long, value_enum, default_value_t = StorageKind::Sqlite)]
    storage: StorageKind,

    /// Database file for the sqlite backend.
    #[arg(long, default_value = "ti.db")]
    db_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Subcommand)]
enum Command {
    /// Collect Naver News search metadata for a keyword.
    Crawl {
        #[arg(long)]
        keyword: String,
        /// Trailing window of days to collect, today included.
        #[arg(long, default_value_t = 15)]
        days: u32,
        #[arg(long, default_value_t = 3)]
        pages_per_day: u32,
    },
    /// Rank surging keywords over the stored articles.
    Analyze {
        #[arg(long, default_value_t = 2)]
        recent_days: i64,
        #[arg(long, default_value_t = 15)]
        total_days: i64,
    },
    /// Run the full report pipeline for a saved profile.
    Report {
        #[arg(long)]
        profile: String,
        /// Recipients; the report is also printed and written to disk.
        #[arg(long, value_delimiter = ',')]
        email: Vec<String>,
    },
    /// Save or replace a search profile.
    SaveProfile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        keyword: String,
        #[arg(long, default_value_t = 15)]
        total_days: u32,
        #[arg(long, default_value_t = 2)]
        recent_days: u32,
        #[arg(long, default_value_t = 3)]
        pages_per_day: u32,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.storage {
        StorageKind::Memory => {
            warn!("memory storage selected, collected data is lost on exit");
            run(Arc::new(MemoryStore::new()), config, cli.command).await
        }
        StorageKind::Sqlite => {
            let store = SqliteStore::open(&cli.db_path)
                .await
                .with_context(|| format!("failed to open {}", cli.db_path))?;
            run(Arc::new(store), config, cli.command).await
        }
    }
}

fn mailer_from(config: &AppConfig) -> anyhow::Result<Option<Arc<Mailer>>> {
    match &config.smtp {
        Some(smtp) => Ok(Some(Arc::new(Mailer::new(smtp)?))),
        None => Ok(None),
    }
}

fn pipeline_from<S: Store + 'static>(
    store: Arc<S>,
    model: Arc<dyn TextGenerator>,
) -> anyhow::Result<Arc<ReportPipeline>> {
    let collector = CrawlManager::new(
        NaverNewsClient::new()?,
        store.clone(),
        Arc::new(SystemClock),
    );
    Ok(Arc::new(
        ReportPipeline::new(
            store,
            model,
            KeywordExtractor::new(),
            Arc::new(SystemClock),
            Arc::new(TokioSleeper),
            PipelineOptions::default(),
        )
        .with_collector(Arc::new(collector)),
    ))
}

async fn run<S: Store + 'static>(
    store: Arc<S>,
    config: AppConfig,
    command: Command,
) -> anyhow::Result<()> {
    let clock = SystemClock;

    match command {
        Command::Crawl {
            keyword,
            days,
            pages_per_day,
        } => {
            let manager =
                CrawlManager::new(NaverNewsClient::new()?, store, Arc::new(SystemClock));
            let stored = manager.crawl_range(&keyword, days, pages_per_day).await?;
            info!(stored, "crawl complete");
        }

        Command::Analyze {
            recent_days,
            total_days,
        } => {
            let articles = store.all_articles().await?;
            let params = TrendParams {
                recent_window_days: recent_days,
                total_window_days: total_days,
                ..TrendParams::default()
            };
            let observations =
                analyze_trends(&articles, &KeywordExtractor::new(), &params, &clock);
            if observations.is_empty() {
                println!("no surging keywords over {} stored articles", articles.len());
            }
            for o in &observations {
                println!(
                    "{}\t최근 {}회\t과거 {}회\t급상승 {}",
                    o.keyword, o.recent_freq, o.past_freq, o.surge
                );
            }
        }

        Command::Report { profile, email } => {
            let profiles = store.list_profiles().await?;
            let profile = profiles
                .into_iter()
                .find(|p| p.name == profile)
                .with_context(|| format!("no profile named {profile}"))?;

            let model: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            )?);
            let pipeline = pipeline_from(store.clone(), model)?;
            let report = pipeline.run(&profile).await?;
            println!("{}", report.formatted);

            let now = chrono::Utc::now();
            let report_path = report_filename("trend_report", "txt", now);
            std::fs::write(&report_path, &report.formatted)
                .with_context(|| format!("failed to write {report_path}"))?;
            let articles = store.all_articles().await?;
            let csv_path = report_filename("news_articles", "csv", now);
            std::fs::write(&csv_path, articles_to_csv(&articles)?)
                .with_context(|| format!("failed to write {csv_path}"))?;
            info!(report = %report_path, articles = %csv_path, "artifacts written");

            if !email.is_empty() {
                let Some(mailer) = mailer_from(&config)? else {
                    anyhow::bail!("email requested but smtp is not configured");
                };
                let attachments = vec![EmailAttachment {
                    data: report.formatted.clone().into_bytes(),
                    filename: report_path,
                    mime_type: "text/plain".to_string(),
                }];
                mailer
                    .send_report(
                        &email,
                        &format!("뉴스 트렌드 분석 보고서 ({})", now.format("%Y-%m-%d")),
                        &report.formatted,
                        BodyFormat::Markdown,
                        attachments,
                    )
                    .await?;
            }
        }

        Command::SaveProfile {
            name,
            keyword,
            total_days,
            recent_days,
            pages_per_day,
        } => {
            let profile = ti_core::SearchProfile {
                name,
                keyword,
                total_window_days: total_days,
                recent_window_days: recent_days,
                max_pages_per_day: pages_per_day,
            };
            store.save_profile(&profile).await?;
            info!(profile = %profile.name, "profile saved");
        }

        Command::Serve { addr } => {
            // a missing key disables the AI surface for the session instead
            // of refusing to serve
            let model: Arc<dyn TextGenerator> = match GeminiClient::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            ) {
                Ok(client) => Arc::new(client),
                Err(Error::Config(reason)) => {
                    warn!(%reason, "AI generation disabled for this session");
                    Arc::new(DisabledGenerator)
                }
                Err(e) => return Err(e.into()),
            };
            let pipeline = pipeline_from(store.clone(), model)?;
            let mailer = mailer_from(&config)?;
            let clock: Arc<dyn ti_core::Clock> = Arc::new(SystemClock);
            let scheduler = Arc::new(Scheduler::new(
                store.clone(),
                pipeline.clone(),
                mailer.clone(),
                clock.clone(),
            ));
            let state = Arc::new(AppState {
                store: store.clone(),
                pipeline,
                crawler: Arc::new(CrawlManager::new(
                    NaverNewsClient::new()?,
                    store,
                    clock.clone(),
                )),
                scheduler,
                mailer,
                extractor: KeywordExtractor::new(),
                clock,
            });
            ti_web::serve(&addr, state).await?;
        }
    }

    Ok(())
}
