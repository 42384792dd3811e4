//! Install progress: throughput sampling and the per-app status line.
//!
//! The download loop is the only writer. It owns a [`ProgressTracker`] and
//! publishes immutable [`ProgressSnapshot`]s on a watch channel; a
//! [`StatusTicker`] task renders the latest one every 250 ms until it is
//! stopped.

use std::collections::VecDeque;
use std::io::{IsTerminal, Write};
use std::time::{Duration, Instant};

use crossterm::style::Stylize;
use crossterm::{cursor, execute, style, terminal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::AppRecord;

/// Number of chunk samples the throughput estimate looks at.
pub const WINDOW_CAPACITY: usize = 50;

const TICK: Duration = Duration::from_millis(250);
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Where an app is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Downloading,
    Integrating,
    Installed,
    Failed,
}

/// Point-in-time view of one app's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub phase: InstallPhase,
    pub written: u64,
    /// 0 when unknown.
    pub total: u64,
    /// Bytes per second over the sample window.
    pub speed: u64,
    /// Seconds left at the current speed, 0 when speed is 0.
    pub eta: u64,
}

impl ProgressSnapshot {
    #[must_use]
    pub const fn starting(total: u64) -> Self {
        Self {
            phase: InstallPhase::Downloading,
            written: 0,
            total,
            speed: 0,
            eta: 0,
        }
    }
}

/// Ring of recent `(chunk size, time)` samples.
#[derive(Debug, Default)]
pub struct ProgressWindow {
    samples: VecDeque<(u64, Instant)>,
}

impl ProgressWindow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY),
        }
    }

    pub fn push(&mut self, bytes: u64, at: Instant) {
        if self.samples.len() == WINDOW_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back((bytes, at));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Bytes per second across the window, or `None` with fewer than two
    /// samples. Spans shorter than a second count as one second.
    #[must_use]
    pub fn speed(&self) -> Option<u64> {
        let (Some((_, first)), Some((_, last))) = (self.samples.front(), self.samples.back())
        else {
            return None;
        };
        if self.samples.len() < 2 {
            return None;
        }
        let total: u64 = self.samples.iter().map(|(bytes, _)| bytes).sum();
        let span = last.duration_since(*first).as_secs_f64().max(1.0);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let speed = (total as f64 / span) as u64;
        Some(speed)
    }
}

/// Seconds to transfer `remaining` bytes at `speed`; 0 when speed is 0.
#[must_use]
pub const fn eta_seconds(remaining: u64, speed: u64) -> u64 {
    if speed == 0 { 0 } else { remaining / speed }
}

/// Writer side of one app's progress.
#[derive(Debug)]
pub struct ProgressTracker {
    window: ProgressWindow,
    snapshot: ProgressSnapshot,
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressTracker {
    /// Creates a tracker for a download of `total` bytes and the receiver a
    /// renderer reads from.
    #[must_use]
    pub fn new(total: u64) -> (Self, watch::Receiver<ProgressSnapshot>) {
        let snapshot = ProgressSnapshot::starting(total);
        let (tx, rx) = watch::channel(snapshot);
        (
            Self {
                window: ProgressWindow::new(),
                snapshot,
                tx,
            },
            rx,
        )
    }

    /// Records a chunk of `bytes` written now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(bytes, Instant::now());
    }

    pub fn record_at(&mut self, bytes: u64, at: Instant) {
        self.window.push(bytes, at);
        self.snapshot.written += bytes;
        if let Some(speed) = self.window.speed() {
            self.snapshot.speed = speed;
            self.snapshot.eta =
                eta_seconds(self.snapshot.total.saturating_sub(self.snapshot.written), speed);
        }
        self.publish();
    }

    pub fn set_phase(&mut self, phase: InstallPhase) {
        self.snapshot.phase = phase;
        self.publish();
    }

    #[must_use]
    pub const fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot);
    }
}

/// Static part of an app's status line.
#[derive(Debug, Clone)]
pub struct StatusLine {
    /// 1-based position in the batch.
    pub position: usize,
    pub count: usize,
    pub id: String,
    pub version: String,
    pub started: Instant,
    pub colored: bool,
}

impl StatusLine {
    #[must_use]
    pub fn new(position: usize, count: usize, app: &AppRecord) -> Self {
        Self {
            position,
            count,
            id: app.id.clone(),
            version: app.version.clone(),
            started: Instant::now(),
            colored: std::io::stdout().is_terminal(),
        }
    }

    /// Renders `snapshot`; `frame` picks the spinner glyph.
    #[must_use]
    pub fn render(&self, snapshot: &ProgressSnapshot, frame: usize) -> String {
        let elapsed = self.started.elapsed().as_secs();
        let glyph = self.glyph(snapshot.phase, frame);
        let head = format!("[{}/{}] {glyph} {} {}", self.position, self.count, self.id, self.version);
        match snapshot.phase {
            InstallPhase::Downloading => {
                let total = if snapshot.total == 0 {
                    "?".to_string()
                } else {
                    format_bytes(snapshot.total)
                };
                format!(
                    "{head} ({} / {total}) ({} / {} @ {}/s)",
                    format_bytes(snapshot.written),
                    format_duration(elapsed),
                    format_duration(snapshot.eta),
                    format_bytes(snapshot.speed),
                )
            }
            _ => format!("{head} ({})", format_duration(elapsed)),
        }
    }

    fn glyph(&self, phase: InstallPhase, frame: usize) -> String {
        let symbol = match phase {
            InstallPhase::Downloading | InstallPhase::Integrating => SPINNER[frame % SPINNER.len()],
            InstallPhase::Installed => "✓",
            InstallPhase::Failed => "!",
        };
        if !self.colored {
            return symbol.to_string();
        }
        match phase {
            InstallPhase::Downloading | InstallPhase::Integrating => symbol.yellow().to_string(),
            InstallPhase::Installed => symbol.green().to_string(),
            InstallPhase::Failed => symbol.red().to_string(),
        }
    }

    /// Prints the final line for `snapshot` and moves to the next line.
    pub fn finish(&self, snapshot: &ProgressSnapshot) {
        let line = self.render(snapshot, 0);
        if self.colored {
            redraw(&line);
            println!();
        } else {
            println!("{line}");
        }
    }
}

/// Background task redrawing a status line until stopped.
pub struct StatusTicker {
    handle: Option<JoinHandle<()>>,
}

impl StatusTicker {
    /// Starts redrawing `line` from `rx`. Does nothing when stdout is not a
    /// terminal.
    #[must_use]
    pub fn start(line: StatusLine, rx: watch::Receiver<ProgressSnapshot>) -> Self {
        if !line.colored {
            return Self { handle: None };
        }
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut frame = 0usize;
            loop {
                interval.tick().await;
                let snapshot = *rx.borrow();
                redraw(&line.render(&snapshot, frame));
                frame = frame.wrapping_add(1);
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stops redrawing. The task is aborted, not awaited.
    pub fn stop(self) {
        if let Some(handle) = self.handle {
            handle.abort();
        }
    }
}

fn redraw(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = execute!(
        stdout,
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine),
        style::Print(line)
    );
    let _ = stdout.flush();
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64;
    if bytes >= GB {
        format!("{:.2} GB", value / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", value / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", value / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// `75` -> `1m15s`.
#[must_use]
pub fn format_duration(secs: u64) -> String {
    match secs {
        s if s >= 3600 => format!("{}h{:02}m", s / 3600, (s % 3600) / 60),
        s if s >= 60 => format!("{}m{:02}s", s / 60, s % 60),
        s => format!("{s}s"),
    }
}
