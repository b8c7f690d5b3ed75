use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use discovery_core::{Keyword, KeywordStates, KeywordStatus};
use discovery_engine::{
    Coordinator, KeywordSource, LogProgressSink, ProxyPool, RunReport, SnapshotStore,
    StateStore, TriggerGate, TriggerSensor, YtDlpSearch,
};
use discovery_logging::{discovery_debug, discovery_info};
use tokio::time::MissedTickBehavior;

use crate::config::PipelineConfig;

fn build_coordinator(config: &PipelineConfig) -> Result<Coordinator> {
    let proxies = ProxyPool::load(&config.paths.proxies, &config.country)?;
    let provider = Arc::new(YtDlpSearch::new(config.yt_dlp_settings(), proxies));
    Ok(Coordinator::new(config.coordinator_config(), provider)
        .with_sink(Arc::new(LogProgressSink::new())))
}

/// One coordinator pass over the keyword source.
pub async fn run_once(config: &PipelineConfig) -> Result<RunReport> {
    let keywords = KeywordSource::new(&config.paths.keywords).read()?;
    discovery_info!("Starting processing for {} keywords", keywords.len());
    let report = build_coordinator(config)?.run(&keywords).await?;
    print_report(&report);
    Ok(report)
}

/// Polls the keyword source and runs the coordinator once per new trigger key
/// until interrupted.
pub async fn watch(config: &PipelineConfig) -> Result<()> {
    let sensor = TriggerSensor::new(&config.paths.keywords, &config.paths.search_states);
    let source = KeywordSource::new(&config.paths.keywords);
    let mut gate = TriggerGate::new();

    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    discovery_info!(
        "Watching {:?} every {}s",
        source.path(),
        config.poll_interval_secs
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                discovery_info!("Interrupted; sensor stopped");
                return Ok(());
            }
        }

        let Some(trigger) = sensor.poll()? else {
            continue;
        };
        if !gate.admit(&trigger) {
            discovery_debug!("Run {} already scheduled", trigger.key);
            continue;
        }
        discovery_info!("Scheduling run {}", trigger.key);
        let keywords = source.read()?;
        let coordinator = build_coordinator(config)?;
        let report = coordinator.run(&keywords).await?;
        print_report(&report);
    }
}

/// Counts of keyword states over the source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSummary {
    pub done: usize,
    pub in_progress: Vec<Keyword>,
    pub unseen: usize,
}

impl StatusSummary {
    pub fn collect(source: &[Keyword], states: &KeywordStates) -> Self {
        let mut summary = Self::default();
        let distinct: BTreeSet<&Keyword> = source.iter().collect();
        for keyword in distinct {
            match states.status(keyword) {
                KeywordStatus::Done => summary.done += 1,
                KeywordStatus::InProgress => summary.in_progress.push(keyword.clone()),
                KeywordStatus::Unseen => summary.unseen += 1,
            }
        }
        summary
    }
}

pub fn status(config: &PipelineConfig) -> Result<()> {
    let source = KeywordSource::new(&config.paths.keywords)
        .read_if_present()?
        .unwrap_or_default();
    let states = StateStore::new(&config.paths.search_states).load()?;
    let rehydrated =
        SnapshotStore::new(&config.paths.url_list, &config.paths.videos_info).load()?;

    let summary = StatusSummary::collect(&source, &states);
    println!("Keywords in source: {}", source.len());
    println!("  done:        {}", summary.done);
    println!("  in progress: {}", summary.in_progress.len());
    println!("  unseen:      {}", summary.unseen);
    for keyword in &summary.in_progress {
        println!("    stalled: {keyword}");
    }
    println!("Urls listed: {}", rehydrated.urls.len());
    println!("Videos: {}", rehydrated.snapshot.videos_count);
    println!(
        "Total duration: {}",
        format_duration(rehydrated.snapshot.total_duration)
    );
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "Processed {} keywords: {} done, {} failed",
        report.dispatched,
        report.completed.len(),
        report.failed.len()
    );
    for keyword in &report.in_progress {
        println!("  still in progress: {keyword}");
    }
    println!(
        "New videos: {} ({})",
        report.new_videos,
        format_duration(report.new_duration)
    );
    println!(
        "Updated total duration: {} across {} videos",
        format_duration(report.total_duration),
        report.videos_count
    );
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!(
        "{} hours, {} minutes, {} seconds",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
