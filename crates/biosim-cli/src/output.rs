//! JSON-lines output of frames and per-generation rows.
//!
//! The scheduler thread only pushes onto an unbounded channel; a tokio task
//! owns the files and does the writing.

use anyhow::{Context, Result};
use biosim_core::GenerationStats;
use biosim_world::{StepObserver, StepSnapshot};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

#[derive(Debug)]
pub enum Record {
    Frame(StepSnapshot),
    Epoch(GenerationStats),
}

/// Forwards scheduler events to the writer task.
pub struct ChannelObserver {
    tx: UnboundedSender<Record>,
    frames: bool,
    epochs: bool,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<Record>, frames: bool, epochs: bool) -> Self {
        Self { tx, frames, epochs }
    }
}

impl StepObserver for ChannelObserver {
    fn on_step_end(&mut self, snapshot: &StepSnapshot) {
        if self.frames {
            // a closed channel means the writer already failed
            let _ = self.tx.send(Record::Frame(snapshot.clone()));
        }
    }

    fn on_generation_stats(&mut self, stats: &GenerationStats) {
        if self.epochs {
            let _ = self.tx.send(Record::Epoch(stats.clone()));
        }
    }
}

async fn open(path: Option<PathBuf>) -> Result<Option<BufWriter<File>>> {
    match path {
        Some(path) => {
            let file = File::create(&path)
                .await
                .with_context(|| format!("creating {}", path.display()))?;
            Ok(Some(BufWriter::new(file)))
        }
        None => Ok(None),
    }
}

async fn write_line(out: &mut BufWriter<File>, json: String) -> Result<()> {
    out.write_all(json.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}

/// Drain `rx` until every sender is gone.
pub async fn write_records(
    mut rx: UnboundedReceiver<Record>,
    frames_path: Option<PathBuf>,
    epochs_path: Option<PathBuf>,
) -> Result<()> {
    let mut frames = open(frames_path).await?;
    let mut epochs = open(epochs_path).await?;
    let mut written = 0u64;

    while let Some(record) = rx.recv().await {
        match record {
            Record::Frame(snapshot) => {
                if let Some(out) = frames.as_mut() {
                    write_line(out, serde_json::to_string(&snapshot)?).await?;
                    written += 1;
                }
            }
            Record::Epoch(stats) => {
                if let Some(out) = epochs.as_mut() {
                    write_line(out, serde_json::to_string(&stats)?).await?;
                    out.flush().await?;
                    written += 1;
                }
            }
        }
    }

    for out in [frames.as_mut(), epochs.as_mut()].into_iter().flatten() {
        out.flush().await?;
    }
    debug!(records = written, "output writer finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_epoch_rows_written_as_json_lines() {
        let dir = std::env::temp_dir().join(format!("biosim-out-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("epochs.jsonl");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut observer = ChannelObserver::new(tx, false, true);
        for generation in 0..3 {
            observer.on_generation_stats(&GenerationStats {
                generation,
                ..Default::default()
            });
        }
        drop(observer);
        write_records(rx, None, Some(path.clone())).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<GenerationStats> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].generation, 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
