//! `climawatch watch`: print live region metrics until Ctrl+C.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use climawatch_core::{MetricKind, MonitorConfig, RegionSnapshot};

use super::{format_value, is_stale};

/// Run the watch command.
pub fn run(config: MonitorConfig, refresh_secs: f64, json: bool) {
    if config.regions.is_empty() {
        eprintln!("Error: no regions to watch (use --regions or a config file)");
        std::process::exit(1);
    }
    let refresh = Duration::from_secs_f64(refresh_secs.max(0.1));

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    let monitor = super::make_monitor(config);
    let rt = super::make_runtime();
    rt.block_on(monitor.observe_all());

    if !json {
        println!(
            "Watching {} region(s) via '{}', refresh {:.1}s (Ctrl+C to stop)",
            monitor.regions().len(),
            monitor.source_name(),
            refresh.as_secs_f64()
        );
        println!();
    }

    // Metric tasks keep running on the runtime's workers while this loop sleeps.
    while running.load(Ordering::SeqCst) {
        let snapshots = monitor.snapshots();
        if json {
            match serde_json::to_string(&snapshots) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error encoding snapshots: {e}"),
            }
        } else {
            for snapshot in &snapshots {
                println!("{}", render_line(snapshot));
            }
            println!();
        }

        let deadline = Instant::now() + refresh;
        while Instant::now() < deadline && running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    monitor.shutdown();
    if !json {
        println!("Stopped.");
    }
}

/// One line per region: every metric with its trend arrow.
fn render_line(snapshot: &RegionSnapshot) -> String {
    let cells: Vec<String> = MetricKind::ALL
        .iter()
        .filter_map(|&kind| snapshot.metric(kind))
        .map(|m| {
            let stale = if is_stale(m) { " (stale)" } else { "" };
            format!(
                "{} {} {}{stale}",
                m.label,
                format_value(m.kind, m.latest),
                m.trend.arrow()
            )
        })
        .collect();
    format!("  {:<12} {}", snapshot.region, cells.join("   "))
}
