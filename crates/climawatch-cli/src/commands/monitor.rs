use climawatch_core::MonitorConfig;

pub fn run(config: MonitorConfig, refresh: f64) {
    if config.regions.is_empty() {
        eprintln!("Error: no regions to monitor (use --regions or a config file)");
        std::process::exit(1);
    }
    let monitor = super::make_monitor(config);
    // Metric tasks run on the runtime's worker threads; the TUI loop stays on this one.
    let rt = super::make_runtime();
    rt.block_on(monitor.observe_all());

    let mut app = crate::tui::app::App::new(monitor.clone(), refresh);
    let result = app.run();
    monitor.shutdown();
    if let Err(e) = result {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
