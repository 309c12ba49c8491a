use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use duewatch::core::Config;
use duewatch::database::{Database, DatabaseSource};
use duewatch::features::alerts::SourceKind;
use duewatch::features::delivery::{
    DeliveryChannel, DeliveryTracker, LogChannel, TemplateConfig, WebhookChannel,
};
use duewatch::features::reminders::{Evaluator, ReminderScheduler};
use duewatch::features::{get_engine_version, get_features};
use duewatch::stores::ItemSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting duewatch reminder engine v{}", get_engine_version());
    for feature in get_features() {
        info!("  feature {} v{}", feature.name, feature.version);
    }

    let database = Database::new(&config.database_path).await?;
    info!("💾 Database ready at {}", config.database_path);

    // Load reminder templates from config file
    let templates = match config.templates_path.as_deref() {
        Some(path) => match TemplateConfig::load(path) {
            Ok(templates) => {
                info!("📄 Loaded reminder templates from {path}");
                templates
            }
            Err(e) => {
                error!("❌ Failed to load templates from {path}: {e} - using built-ins");
                TemplateConfig::default()
            }
        },
        None => TemplateConfig::default(),
    };

    let channel: Arc<dyn DeliveryChannel> = match config.webhook_url.as_deref() {
        Some(url) => {
            info!("📬 Delivering reminders via webhook");
            Arc::new(WebhookChannel::new(url, config.delivery_timeout)?)
        }
        None => {
            info!("📬 No webhook configured - reminders will only be logged");
            Arc::new(LogChannel)
        }
    };

    let tracker = DeliveryTracker::new(database.clone());

    // Applied items outrank saved ones when both track the same scholarship
    let sources: Vec<Arc<dyn ItemSource>> = vec![
        Arc::new(DatabaseSource::new(database.clone(), SourceKind::Applied)),
        Arc::new(DatabaseSource::new(database.clone(), SourceKind::Saved)),
    ];

    let evaluator = Evaluator::new(
        sources,
        Arc::new(database.clone()),
        Arc::new(database.clone()),
        channel,
    )
    .with_templates(templates)
    .with_tracker(tracker)
    .with_alert_limit(config.alert_limit)
    .with_delivery_timeout(config.delivery_timeout);

    let scheduler = ReminderScheduler::new(evaluator, config.eval_interval)
        .with_startup_jitter(config.startup_jitter)
        .with_utc_offset_minutes(config.utc_offset_minutes)
        .with_sent_retention_days(config.sent_retention_days);

    info!(
        "Evaluating every {:?} (alert limit {}, delivery timeout {:?})",
        config.eval_interval, config.alert_limit, config.delivery_timeout
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
        }
    }

    Ok(())
}
