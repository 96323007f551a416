use clap::Parser;
use harvester_collector::{Collector, CollectorStats, PcapFileSource};
use harvester_domain::CliOverrides;
use tracing::info;

mod bootstrap;
mod consumer;

#[derive(Parser)]
#[command(name = "dns-harvester")]
#[command(version)]
#[command(about = "DNS Harvester - capture-file DNS transaction collector")]
struct Cli {
    /// Pcap or pcapng file to read
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Timeframe window length in milliseconds
    #[arg(short = 't', long)]
    timeframe_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        input: cli.input.clone(),
        timeframe_len_ms: cli.timeframe_ms,
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting DNS Harvester v{}", env!("CARGO_PKG_VERSION"));

    let input = config.capture.input.clone().ok_or_else(|| {
        anyhow::anyhow!("no capture input: pass a FILE argument or set capture.input")
    })?;

    let (tx, rx) = tokio::sync::mpsc::channel(config.collector.output_queue_depth);
    let consumer = tokio::spawn(consumer::run_summary(rx));

    let collector = Collector::new(config.collector.clone(), vec![tx]);
    let stats: CollectorStats = tokio::task::spawn_blocking(move || {
        let mut source = PcapFileSource::open(&input)?;
        let stats = collector.run(&mut source)?;
        info!(
            frames = source.frames_read(),
            skipped = source.frames_skipped(),
            "capture file exhausted"
        );
        Ok::<_, anyhow::Error>(stats)
    })
    .await??;

    consumer.await?;

    info!(%stats, "shutdown complete");
    Ok(())
}
