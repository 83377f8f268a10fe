//! Offline summary of an exported session

use anyhow::{Context, Result};
use imulog_core::datalog::SessionPlayer;
use serde_json::json;

use crate::cli::InspectArgs;

pub fn execute(args: InspectArgs) -> Result<()> {
    let player = SessionPlayer::open(&args.file)
        .with_context(|| format!("Failed to load session {}", args.file.display()))?;
    let summary = player.summary();

    if args.json {
        let report = json!({
            "file": args.file,
            "samples": player.len(),
            "duration_s": player.duration().as_secs_f64(),
            "channels": summary,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", args.file.display());
    println!(
        "  {} samples over {:.3} s",
        player.len(),
        player.duration().as_secs_f64()
    );
    if let (Some(first), Some(last)) = (player.samples().first(), player.samples().last()) {
        println!("  from {} to {}", first.captured_at, last.captured_at);
    }
    if summary.is_empty() {
        return Ok(());
    }

    println!("  {:<8} {:>10} {:>10} {:>10}  units", "channel", "min", "max", "mean");
    for s in summary {
        println!(
            "  {:<8} {:>10.3} {:>10.3} {:>10.3}  {}",
            s.channel.name(),
            s.min,
            s.max,
            s.mean,
            s.channel.units()
        );
    }
    Ok(())
}
