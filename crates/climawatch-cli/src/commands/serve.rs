use climawatch_core::{MetricKind, MonitorConfig};

pub fn run(host: &str, port: u16, config: MonitorConfig) {
    let base = format!("http://{host}:{port}");
    let example_region = config
        .regions
        .first()
        .cloned()
        .unwrap_or_else(|| "Liberia".to_string());

    println!("🌦  Climawatch Server v{}", climawatch_core::VERSION);
    println!("   {base}");
    println!(
        "   {} region(s), window {} samples, tick every {}s",
        config.regions.len(),
        config.window_capacity,
        config.tick_interval_secs
    );
    for kind in MetricKind::ALL {
        println!(
            "   poll {:<12} every {}s",
            kind.name(),
            config.poll_interval_secs.secs(kind)
        );
    }
    println!();
    println!("   Endpoints:");
    println!("     GET    /                   API index (try: curl {base})");
    println!("     GET    /health             Health check");
    println!("     GET    /regions            Latest value and trend per region");
    println!("     GET    /regions/{{region}}   Full 24-sample windows");
    println!("     PUT    /regions/{{region}}   Start observing a region");
    println!("     DELETE /regions/{{region}}   Stop observing a region");
    println!("     POST   /events             Push a metric_update, weather_update or record_change");
    println!();
    println!("   Examples:");
    println!("     curl {base}/regions");
    println!(
        "     curl -X POST {base}/events -H 'content-type: application/json' \\"
    );
    println!(
        "          -d '{{\"event\":\"metric_update\",\"region\":\"{example_region}\",\"kind\":\"uv_index\",\"value\":6.5}}'"
    );
    println!();

    let monitor = super::make_monitor(config);
    let rt = super::make_runtime();
    let result = rt.block_on(async {
        let observed = monitor.observe_all().await;
        log::info!("observing {observed} region(s) via '{}'", monitor.source_name());
        climawatch_server::run_server(monitor.clone(), host, port).await
    });
    monitor.shutdown();

    if let Err(e) = result {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
