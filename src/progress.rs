use std::io::{self, Write};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::terminal::{Clear, ClearType};
use serde::Serialize;

use crate::domain::ItemStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub status: ItemStatus,
}

pub trait ProgressSink {
    fn report(&self, update: ProgressUpdate);

    fn phase(&self, _message: &str) {}
}

pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, update: ProgressUpdate) {
        match update.status {
            ItemStatus::Started => {}
            ItemStatus::Error => tracing::warn!(
                "[{}/{}] {} {}",
                update.index,
                update.total,
                update.label,
                update.status
            ),
            _ => tracing::info!(
                "[{}/{}] {} {}",
                update.index,
                update.total,
                update.label,
                update.status
            ),
        }
    }

    fn phase(&self, message: &str) {
        tracing::info!("{message}");
    }
}

const BAR_WIDTH: usize = 40;

pub struct ConsoleProgress;

impl ConsoleProgress {
    fn draw(update: &ProgressUpdate) -> io::Result<()> {
        let mut stderr = io::stderr();
        stderr.queue(MoveToColumn(0))?;
        stderr.queue(Clear(ClearType::CurrentLine))?;
        stderr.write_all(render_bar(update).as_bytes())?;
        if update.index >= update.total && update.status != ItemStatus::Started {
            stderr.write_all(b"\n")?;
        }
        stderr.flush()
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, update: ProgressUpdate) {
        let _ = Self::draw(&update);
    }

    fn phase(&self, message: &str) {
        let _ = writeln!(io::stderr(), "\n=== {message} ===");
    }
}

/// `[####----]  42% ( 430/1025) - label           [ok]`
pub fn render_bar(update: &ProgressUpdate) -> String {
    let ratio = if update.total == 0 {
        1.0
    } else {
        (update.index.min(update.total) as f64) / (update.total as f64)
    };
    let filled = (ratio * BAR_WIDTH as f64) as usize;
    let percent = (ratio * 100.0) as usize;
    format!(
        "[{}{}] {percent:3}% ({:4}/{:4}) - {:<15} [{}]",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        update.index,
        update.total,
        update.label,
        update.status
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_reflects_ratio() {
        let line = render_bar(&ProgressUpdate {
            index: 5,
            total: 10,
            label: "pikachu".to_string(),
            status: ItemStatus::Ok,
        });
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(20), "-".repeat(20))));
        assert!(line.contains(" 50% (   5/  10) - pikachu"));
        assert!(line.ends_with("[ok]"));
    }

    #[test]
    fn bar_handles_empty_total() {
        let line = render_bar(&ProgressUpdate {
            index: 0,
            total: 0,
            label: String::new(),
            status: ItemStatus::Exists,
        });
        assert!(line.contains("100%"));
    }
}
