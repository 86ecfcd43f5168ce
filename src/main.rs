use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use loopcat_player::config::DEFAULT_BLOCK_SIZE;
use loopcat_player::{Player, PlayerConfig, PositionReport, TrackId};

#[derive(Parser)]
#[command(name = "loopcat-play", about = "Play loop tracks in sync, RC-300 style")]
struct Cli {
    /// Audio files, loaded as tracks 1..N
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Play every track once instead of looping
    #[arg(long)]
    no_loop: bool,

    /// Device block size in frames
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG=debug shows every transport call
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = PlayerConfig::default()
        .with_block_size(cli.block_size)
        .with_loop(!cli.no_loop);

    let (report_tx, report_rx) = crossbeam_channel::bounded::<PositionReport>(4);
    let mut player = Player::with_default_device(config).on_position_update(move |report| {
        // Drop reports the printer has not caught up with.
        let _ = report_tx.try_send(report);
    });

    for (index, path) in cli.files.iter().enumerate() {
        let id = TrackId::try_from(index + 1).context("Too many tracks")?;
        player
            .load_track(id, path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }

    player.play_all();
    player.start().context("Failed to start audio output")?;

    let deadline = cli
        .seconds
        .map(|secs| Duration::try_from_secs_f64(secs.max(0.0)))
        .transpose()
        .context("Invalid --seconds")?
        .and_then(|run_for| Instant::now().checked_add(run_for));

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match report_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(report) => {
                print_status(&report);
                if !report.values().any(|t| t.playing) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    println!();

    player.stop();
    Ok(())
}

fn print_status(report: &PositionReport) {
    let line: Vec<String> = report
        .iter()
        .map(|(id, info)| {
            format!(
                "{}{id} {:5.2}/{:5.2}s",
                if info.playing { '>' } else { ' ' },
                info.position_secs,
                info.duration_secs
            )
        })
        .collect();
    print!("\r{}", line.join("  |  "));
    let _ = std::io::stdout().flush();
}
