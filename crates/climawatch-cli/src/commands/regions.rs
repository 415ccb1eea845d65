use climawatch_core::{Fluctuation, MetricKind, MonitorConfig};

pub fn run(config: &MonitorConfig) {
    println!("Regions ({}):", config.regions.len());
    for region in &config.regions {
        println!("  {region}");
    }
    println!();

    println!(
        "{:<12} {:<20} {:<5} {:<14} {:<10} {:>6}",
        "Kind", "Label", "Unit", "Accepted", "Step", "Poll"
    );
    println!("{}", "-".repeat(72));
    for kind in MetricKind::ALL {
        let spec = kind.spec();
        let step = match spec.fluctuation {
            Fluctuation::Continuous(m) => format!("±{m}"),
            Fluctuation::Discrete(m) => format!("±{m} (int)"),
        };
        println!(
            "{:<12} {:<20} {:<5} {:<14} {:<10} {:>5}s",
            kind.name(),
            spec.label,
            spec.unit,
            format!("[{}, {}]", spec.domain.0, spec.domain.1),
            step,
            config.poll_interval_secs.secs(kind)
        );
    }
    println!();
    println!(
        "Window: {} samples, tick every {}s, local time UTC{:+}",
        config.window_capacity, config.tick_interval_secs, config.utc_offset_hours
    );
}
