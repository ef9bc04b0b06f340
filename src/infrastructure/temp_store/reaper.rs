//! Background deletion of expired temp artifacts
//!
//! One task owns a delay queue keyed by path. A path is tracked at most
//! once: scheduling it again resets the existing deadline.
//!
//! Writers hold the shared side of `writes` while they (re)schedule and
//! write; deletion takes the exclusive side and then applies any commands
//! that arrived meanwhile, so a path refreshed by an in-flight write is
//! kept.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, RwLock};
use tokio_util::time::delay_queue::{DelayQueue, Key};
use tracing::debug;

#[derive(Debug)]
pub(super) enum ReaperCommand {
    Schedule { path: PathBuf, delay: Duration },
    Cancel { path: PathBuf },
}

#[derive(Default)]
struct Schedule {
    queue: DelayQueue<PathBuf>,
    pending: HashMap<PathBuf, Key>,
}

impl Schedule {
    fn apply(&mut self, command: ReaperCommand) {
        match command {
            ReaperCommand::Schedule { path, delay } => match self.pending.get(&path) {
                Some(key) => self.queue.reset(key, delay),
                None => {
                    let key = self.queue.insert(path.clone(), delay);
                    self.pending.insert(path, key);
                }
            },
            ReaperCommand::Cancel { path } => {
                if let Some(key) = self.pending.remove(&path) {
                    self.queue.remove(&key);
                }
            }
        }
    }
}

pub(super) async fn run_reaper(
    mut commands: mpsc::UnboundedReceiver<ReaperCommand>,
    writes: Arc<RwLock<()>>,
) {
    let mut schedule = Schedule::default();

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(command) => schedule.apply(command),
                None => break,
            },
            Some(expired) = schedule.queue.next(), if !schedule.queue.is_empty() => {
                let path = expired.into_inner();
                schedule.pending.remove(&path);

                let _exclusive = writes.write().await;
                while let Ok(command) = commands.try_recv() {
                    schedule.apply(command);
                }
                if schedule.pending.contains_key(&path) {
                    debug!(path = %path.display(), "Temp artifact refreshed before deletion");
                    continue;
                }
                delete_path(&path).await;
            }
        }
    }

    debug!(pending = schedule.pending.len(), "Temp reaper stopped");
}

async fn delete_path(path: &Path) {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => debug!(path = %path.display(), "Deleted expired temp artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "Failed to delete temp artifact"),
    }
}
