//! `climawatch seed`: show the 24-hour history a fresh window starts with.

use rand::SeedableRng;
use rand::rngs::StdRng;

use climawatch_core::{MetricKind, Sample, diurnal, now_ms};

use super::format_value;

pub fn run(kind: &str, base: Option<f64>, utc_offset_hours: i32, seed: Option<u64>, json: bool) {
    let kind: MetricKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let samples = diurnal::seed(base, kind, now_ms(), utc_offset_hours, &mut rng);

    if json {
        match serde_json::to_string_pretty(&samples) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error encoding samples: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let spec = kind.spec();
    let centre = base.filter(|b| b.is_finite()).unwrap_or(spec.default_base);
    println!(
        "{} around {} (UTC{utc_offset_hours:+})",
        spec.label,
        format_value(kind, Some(centre))
    );
    println!();
    for line in render(&samples, kind, utc_offset_hours) {
        println!("{line}");
    }
}

/// `HH:00  value  bar` rows, oldest first.
fn render(samples: &[Sample], kind: MetricKind, utc_offset_hours: i32) -> Vec<String> {
    let min = samples.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
    let max = samples.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);

    samples
        .iter()
        .map(|s| {
            let hour = diurnal::local_hour(s.timestamp_ms, utc_offset_hours);
            let width = (((s.value - min) / span) * 30.0).round() as usize;
            format!(
                "  {hour:02}:00  {:>9}  {}",
                format_value(kind, Some(s.value)),
                "█".repeat(width + 1)
            )
        })
        .collect()
}
