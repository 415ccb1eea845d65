//! CLI for climawatch: live regional weather metrics in the terminal and over HTTP.

mod commands;
mod tui;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "climawatch")]
#[command(about = "climawatch — rolling weather metrics for every region you watch")]
#[command(version = climawatch_core::VERSION)]
struct Cli {
    /// JSON config file (flags override its values)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server: snapshots, push events, observe/forget
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8070")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Comma-separated regions to observe at startup, or "all"
        #[arg(long)]
        regions: Option<String>,

        /// Seed for reproducible synthetic values
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds between synthetic ticks
        #[arg(long)]
        tick: Option<u64>,
    },

    /// Print live metrics on a refresh loop until Ctrl+C
    Watch {
        /// Comma-separated regions, or "all"
        #[arg(long)]
        regions: Option<String>,

        /// Seconds between printed updates
        #[arg(long, default_value = "5.0", value_parser = commands::parse_refresh)]
        refresh: f64,

        /// Seed for reproducible synthetic values
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds between synthetic ticks
        #[arg(long)]
        tick: Option<u64>,

        /// Emit one JSON line of region snapshots per update
        #[arg(long)]
        json: bool,
    },

    /// Live interactive dashboard (TUI)
    Monitor {
        /// Comma-separated regions, or "all"
        #[arg(long)]
        regions: Option<String>,

        /// Redraw rate in seconds
        #[arg(long, default_value = "1.0", value_parser = commands::parse_refresh)]
        refresh: f64,

        /// Seed for reproducible synthetic values
        #[arg(long)]
        seed: Option<u64>,

        /// Seconds between synthetic ticks
        #[arg(long)]
        tick: Option<u64>,
    },

    /// Print a 24-hour diurnal seed for one metric
    Seed {
        /// Metric kind: temperature, humidity, uv_index
        kind: String,

        /// Value the curve is centred on (default: the kind's default base)
        #[arg(long)]
        base: Option<f64>,

        /// UTC offset in hours used for local time
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<i32>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Write the samples as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured regions and metric kinds
    Regions,
}

fn main() {
    let cli = Cli::parse();

    // The dashboard owns the terminal; log lines would tear it.
    let default_filter = match cli.command {
        Commands::Monitor { .. } => "off",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve {
            port,
            host,
            regions,
            seed,
            tick,
        } => commands::serve::run(
            &host,
            port,
            commands::make_config(
                config_path,
                &commands::Overrides {
                    regions: regions.as_deref(),
                    seed,
                    tick_secs: tick,
                },
            ),
        ),
        Commands::Watch {
            regions,
            refresh,
            seed,
            tick,
            json,
        } => commands::watch::run(
            commands::make_config(
                config_path,
                &commands::Overrides {
                    regions: regions.as_deref(),
                    seed,
                    tick_secs: tick,
                },
            ),
            refresh,
            json,
        ),
        Commands::Monitor {
            regions,
            refresh,
            seed,
            tick,
        } => commands::monitor::run(
            commands::make_config(
                config_path,
                &commands::Overrides {
                    regions: regions.as_deref(),
                    seed,
                    tick_secs: tick,
                },
            ),
            refresh,
        ),
        Commands::Seed {
            kind,
            base,
            utc_offset,
            seed,
            json,
        } => {
            let config = commands::make_config(config_path, &commands::Overrides::default());
            commands::seed::run(
                &kind,
                base,
                utc_offset.unwrap_or(config.utc_offset_hours),
                seed.or(config.seed),
                json,
            )
        }
        Commands::Regions => {
            commands::regions::run(&commands::make_config(
                config_path,
                &commands::Overrides::default(),
            ))
        }
    }
}
