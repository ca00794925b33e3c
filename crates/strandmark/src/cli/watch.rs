//! The `strandmark watch` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use strandmark_core::{
    Collaborators, Config, DirectorySource, FileSink, HttpRegistrar, ImageDecoder, PipelineEvent,
    Registrar, SessionStats, WatchSession,
};
use tokio::sync::broadcast::error::RecvError;

/// Arguments for the `watch` command.
#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Folder to watch (defaults to `watch.source_dir`)
    pub dir: Option<PathBuf>,

    /// Where artifacts are written (defaults to `general.output_dir`)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Constellation grid size
    #[arg(long, value_name = "N")]
    pub grid: Option<u32>,

    /// Post constellations to the configured registry
    #[arg(long)]
    pub register: bool,

    /// Also watch subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Rescan interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,
}

impl WatchArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.dir {
            config.watch.source_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.general.output_dir = output.clone();
        }
        if let Some(grid) = self.grid {
            config.constellation.grid_size = grid;
        }
        if let Some(interval) = self.poll_interval {
            config.watch.poll_interval_ms = interval;
        }
        config.watch.recursive |= self.recursive;
        config.registration.enabled |= self.register;
    }
}

/// Execute the watch command.
pub async fn execute(args: WatchArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let source_dir = config.source_dir();
    if !source_dir.is_dir() {
        anyhow::bail!("Not a directory: {}", source_dir.display());
    }
    let output_dir = config.output_dir();

    let registrar: Option<Arc<dyn Registrar>> = if config.registration.enabled {
        let registrar = HttpRegistrar::new(&config.registration)?;
        tracing::info!("Registering constellations at {}", registrar.endpoint());
        Some(Arc::new(registrar))
    } else {
        None
    };

    let collaborators = Collaborators {
        source: Arc::new(DirectorySource::new(&source_dir, &config.watch)),
        pixels: Arc::new(ImageDecoder::new(config.limits.clone())),
        sink: Arc::new(FileSink::new(&output_dir)),
        registrar,
    };

    let start = Instant::now();
    let mut session = WatchSession::start(&config, collaborators).await?;
    session.enable_polling(Duration::from_millis(config.watch.poll_interval_ms));
    let mut events = session.events();

    eprintln!(
        "  Watching {} -> {}  (Ctrl-C to stop)",
        style(source_dir.display()).cyan(),
        style(output_dir.display()).cyan()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Status display fell behind, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let stats = session.shutdown().await;
    print_summary(&stats, start.elapsed());
    Ok(())
}

fn report(event: &PipelineEvent) {
    match event {
        PipelineEvent::Processed {
            sequence,
            display_name,
            width,
            height,
            total_pixels,
            queue_depth,
            ..
        } => eprintln!(
            "  {} #{} {} ({}x{}, {} pixels, queue {})",
            style("✓").green(),
            sequence,
            display_name,
            width,
            height,
            total_pixels,
            queue_depth
        ),
        PipelineEvent::Failed {
            image_id,
            phase,
            error,
        } => eprintln!(
            "  {} image {} failed while {}: {}",
            style("✗").red(),
            image_id,
            phase,
            error
        ),
        PipelineEvent::Registered { image_id } => eprintln!(
            "  {} image {} registered",
            style("↑").cyan(),
            image_id
        ),
        _ => {}
    }
}

fn print_summary(stats: &SessionStats, elapsed: Duration) {
    eprint!("{}", render_summary(stats, elapsed));
}

fn render_summary(stats: &SessionStats, elapsed: Duration) -> String {
    let mut lines = vec![
        String::new(),
        "  ====================================".to_string(),
        "               Summary".to_string(),
        "  ====================================".to_string(),
        format!("    Persisted:    {:>8}", stats.persisted),
    ];
    if stats.failed > 0 {
        lines.push(format!("    Failed:       {:>8}", stats.failed));
    }
    if stats.queue_depth > 0 {
        lines.push(format!("    Unprocessed:  {:>8}", stats.queue_depth));
    }
    lines.push("  ------------------------------------".to_string());
    lines.push(format!("    Last seen ID: {:>8}", stats.last_seen_id));
    lines.push(format!("    Duration:     {:>7.1}s", elapsed.as_secs_f64()));
    lines.push("  ====================================".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = WatchArgs {
            dir: Some(PathBuf::from("/photos")),
            grid: Some(4),
            register: true,
            ..WatchArgs::default()
        };
        let mut config = Config::default();
        config.watch.recursive = true;
        args.apply(&mut config);

        assert_eq!(config.source_dir(), PathBuf::from("/photos"));
        assert_eq!(config.constellation.grid_size, 4);
        assert!(config.registration.enabled);
        // Flags never switch config settings off
        assert!(config.watch.recursive);
        assert_eq!(config.watch.poll_interval_ms, 2000);
    }

    #[test]
    fn test_summary_counts_only_persisted_images() {
        let stats = SessionStats {
            processed: 5,
            persisted: 3,
            failed: 2,
            last_seen_id: 9,
            queue_depth: 0,
        };
        let summary = render_summary(&stats, Duration::from_millis(1500));

        assert!(summary.contains("Persisted:           3\n"));
        assert!(summary.contains("Failed:              2\n"));
        assert!(!summary.contains("Unprocessed"));
        assert!(summary.contains("Duration:         1.5s\n"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_rejected() {
        let args = WatchArgs {
            dir: Some(PathBuf::from("/nonexistent/strandmark-watch")),
            ..WatchArgs::default()
        };
        let err = execute(args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("Not a directory"));
    }

    #[tokio::test]
    async fn test_invalid_grid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = WatchArgs {
            dir: Some(dir.path().to_path_buf()),
            grid: Some(0),
            ..WatchArgs::default()
        };
        assert!(execute(args, Config::default()).await.is_err());
    }
}
