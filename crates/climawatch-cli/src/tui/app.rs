//! TUI application state and event loop.
//!
//! Design: one region in focus. Navigate the list on the left; the right side
//! charts every metric of the selected region. Metric tasks keep running on
//! the tokio runtime, so the UI only reads published snapshots and never
//! blocks a writer.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::TableState;

use climawatch_core::diurnal::HOUR_MS;
use climawatch_core::{MetricKind, MetricSnapshot, Monitor, RegionSnapshot, Sample};

// ---------------------------------------------------------------------------
// Chart helpers
// ---------------------------------------------------------------------------

/// Chart points: x is hours relative to the newest sample (so `0.0` is now).
pub fn chart_points(samples: &[Sample]) -> Vec<(f64, f64)> {
    let Some(last) = samples.last() else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| {
            let age = last.timestamp_ms.saturating_sub(s.timestamp_ms) as f64;
            (-age / HOUR_MS as f64, s.value)
        })
        .collect()
}

/// Y bounds with a little headroom, never past the kind's clamp range.
pub fn y_bounds(kind: MetricKind, samples: &[Sample]) -> (f64, f64) {
    let spec = kind.spec();
    let min_val = samples.iter().map(|s| s.value).fold(f64::INFINITY, f64::min);
    let max_val = samples.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max);
    if !min_val.is_finite() || !max_val.is_finite() {
        return (spec.domain.0.max(spec.min), spec.domain.1.min(spec.max));
    }
    let pad = ((max_val - min_val) * 0.1).max(spec.fluctuation.magnitude());
    ((min_val - pad).max(spec.min), (max_val + pad).min(spec.max))
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    monitor: Arc<Monitor>,
    refresh_rate: Duration,
    cursor: usize,
    running: bool,
    paused: bool,
    snapshots: Vec<RegionSnapshot>,
    refreshed_at: Option<Instant>,
    table_state: TableState,
}

impl App {
    pub fn new(monitor: Arc<Monitor>, refresh_secs: f64) -> Self {
        Self {
            monitor,
            refresh_rate: Duration::from_secs_f64(refresh_secs.clamp(0.1, 10.0)),
            cursor: 0,
            running: true,
            paused: false,
            snapshots: Vec::new(),
            refreshed_at: None,
            table_state: TableState::default().with_selected(Some(0)),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.refresh();
        let mut last_tick = Instant::now();

        while self.running {
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }

            if last_tick.elapsed() >= self.refresh_rate {
                self.refresh();
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    /// Pull fresh snapshots unless the display is frozen.
    fn refresh(&mut self) {
        if self.paused {
            return;
        }
        self.snapshots = self.monitor.snapshots();
        self.refreshed_at = Some(Instant::now());
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let last = self.snapshots.len().saturating_sub(1);
        if self.cursor > last {
            self.cursor = last;
        }
        self.table_state.select(Some(self.cursor));
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.table_state.select(Some(self.cursor));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor < self.snapshots.len().saturating_sub(1) {
                    self.cursor += 1;
                    self.table_state.select(Some(self.cursor));
                }
            }
            KeyCode::Char('p') | KeyCode::Char(' ') => {
                self.paused = !self.paused;
                self.refresh();
            }
            KeyCode::Char('r') => {
                let was_paused = std::mem::replace(&mut self.paused, false);
                self.refresh();
                self.paused = was_paused;
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => {
                let secs = (self.refresh_rate.as_secs_f64() / 2.0).max(0.1);
                self.refresh_rate = Duration::from_secs_f64(secs);
            }
            KeyCode::Char('-') | KeyCode::Char('[') => {
                let secs = (self.refresh_rate.as_secs_f64() * 2.0).min(10.0);
                self.refresh_rate = Duration::from_secs_f64(secs);
            }
            _ => {}
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
    pub fn snapshots(&self) -> &[RegionSnapshot] {
        &self.snapshots
    }
    pub fn selected(&self) -> Option<&RegionSnapshot> {
        self.snapshots.get(self.cursor)
    }
    pub fn selected_metric(&self, kind: MetricKind) -> Option<&MetricSnapshot> {
        self.selected().and_then(|r| r.metric(kind))
    }
    pub fn source_name(&self) -> &str {
        self.monitor.source_name()
    }
    pub fn is_paused(&self) -> bool {
        self.paused
    }
    pub fn refresh_rate_secs(&self) -> f64 {
        self.refresh_rate.as_secs_f64()
    }
    pub fn refreshed_ago(&self) -> Option<Duration> {
        self.refreshed_at.map(|t| t.elapsed())
    }
    pub fn table_state_mut(&mut self) -> &mut TableState {
        &mut self.table_state
    }
}
