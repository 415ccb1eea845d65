//! TUI rendering: one region in focus.
//!
//! ┌──────────────────────────────────────────────┐
//! │  🌦 Climawatch   source: simulated   1.0s    │
//! ├─────────────────────┬────────────────────────┤
//! │  Regions            │  Average Temperature   │
//! │  ▸ Liberia  27.4 ↑  │  ╭──────────────────── │
//! │    Nicoya   26.1 →  │  │  ~~~27.4~~~         │
//! │    ...              ├────────────────────────┤
//! │                     │  Humidity              │
//! │                     ├────────────────────────┤
//! │                     │  UV Index              │
//! ├─────────────────────┴────────────────────────┤
//! │  ↑↓ navigate   p: pause   +/-: rate   q: quit │
//! └──────────────────────────────────────────────┘

use super::app::{App, chart_points, y_bounds};
use crate::commands::{format_value, is_stale};
use climawatch_core::{MetricKind, Trend};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_main(f, rows[1], app);
    draw_keys(f, rows[2]);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let paused = if app.is_paused() { "  ⏸ paused" } else { "" };
    let ago = app
        .refreshed_ago()
        .map(|d| format!("  updated {:.0}s ago", d.as_secs_f64()))
        .unwrap_or_default();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" 🌦 Climawatch ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("  source: "),
            Span::styled(app.source_name().to_string(), Style::default().bold().fg(Color::Yellow)),
            Span::styled(
                format!(
                    "  {} regions  {:.1}s{ago}{paused} ",
                    app.snapshots().len(),
                    app.refresh_rate_secs()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &mut App) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    draw_region_list(f, cols[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(cols[1]);

    for (slot, kind) in right.iter().zip(MetricKind::ALL) {
        draw_chart(f, *slot, app, kind);
    }
}

fn trend_color(trend: Trend) -> Color {
    match trend {
        Trend::Increasing => Color::Green,
        Trend::Decreasing => Color::Red,
        Trend::Stable => Color::Gray,
    }
}

fn draw_region_list(f: &mut Frame, area: Rect, app: &mut App) {
    let cursor = app.cursor();
    let items: Vec<Row> = app
        .snapshots()
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let pointer = if i == cursor { "▸" } else { " " };
            let mut cells = vec![pointer.to_string(), region.region.clone()];
            let mut any_stale = false;
            for kind in MetricKind::ALL {
                match region.metric(kind) {
                    Some(m) => {
                        any_stale |= is_stale(m);
                        cells.push(format!(
                            "{} {}",
                            format_value(kind, m.latest),
                            m.trend.arrow()
                        ));
                    }
                    None => cells.push("—".into()),
                }
            }

            let style = if i == cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if any_stale {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new(cells).style(style)
        })
        .collect();

    let table = Table::new(
        items,
        [
            Constraint::Length(2),  // pointer
            Constraint::Length(12), // region
            Constraint::Length(10), // temperature
            Constraint::Length(7),  // humidity
            Constraint::Length(6),  // uv
        ],
    )
    .header(
        Row::new(vec!["", "Region", "Temp", "Hum", "UV"])
            .style(Style::default().bold().fg(Color::Cyan)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Regions "));

    f.render_stateful_widget(table, area, app.table_state_mut());
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App, kind: MetricKind) {
    let spec = kind.spec();
    let Some(metric) = app.selected_metric(kind).filter(|m| !m.samples.is_empty()) else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", spec.label));
        let p = Paragraph::new("No region selected")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let data = chart_points(&metric.samples);
    let (y_min, y_max) = y_bounds(kind, &metric.samples);
    let x_min = data.first().map(|p| p.0).unwrap_or(0.0).min(-1.0);
    let color = trend_color(metric.trend);

    let mut datasets = vec![
        Dataset::default()
            .name(format_value(kind, metric.latest))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&data),
    ];
    // Mark the last authoritative reading if it is still inside the window.
    let anchor: Vec<(f64, f64)> = metric
        .last_authoritative
        .and_then(|a| {
            let newest = metric.samples.last()?.timestamp_ms;
            let oldest = metric.samples.first()?.timestamp_ms;
            (a.timestamp_ms >= oldest).then(|| {
                let age = newest.saturating_sub(a.timestamp_ms) as f64;
                (-age / climawatch_core::diurnal::HOUR_MS as f64, a.value)
            })
        })
        .into_iter()
        .collect();
    if !anchor.is_empty() {
        datasets.push(
            Dataset::default()
                .name("live")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::Yellow))
                .data(&anchor),
        );
    }

    let stale = if is_stale(metric) { "  stale" } else { "" };
    let title = Line::from(vec![
        Span::styled(format!(" {} ", spec.label), Style::default().bold()),
        Span::styled(
            format!("{} {} ", metric.trend.arrow(), metric.trend.label()),
            Style::default().fg(color),
        ),
        Span::styled(stale, Style::default().fg(Color::Yellow)),
    ]);

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(Axis::default().bounds([x_min, 0.0]).labels(vec![
            Line::from(format!("{x_min:.0}h")),
            Line::from("now"),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format!("{y_min:.1}")),
            Line::from(format!("{y_max:.1}")),
        ]));

    f.render_widget(chart, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " ↑↓ navigate   p: pause   r: refresh now   +/-: refresh rate   q: quit",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
