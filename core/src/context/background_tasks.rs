use hashbrown::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::combat_log::CombatEvent;
use crate::encounter::FightProcessor;

const WRITER_QUEUE: usize = 64;

/// Work for a source's writer task.
#[derive(Debug)]
pub enum WriterMessage {
    /// Apply events in order; `done` receives the number of dropped records
    Batch {
        events: Vec<CombatEvent>,
        done: Option<oneshot::Sender<usize>>,
    },
    /// Forget classifier caches and the last timestamp
    Reset,
}

struct SourceWriter {
    sender: mpsc::Sender<WriterMessage>,
    handle: JoinHandle<()>,
}

/// One writer task per record source. Each owns a `FightProcessor` and
/// drains its queue in order.
#[derive(Default)]
pub struct BackgroundTasks {
    writers: HashMap<String, SourceWriter>,
}

impl BackgroundTasks {
    /// Sender for `source`, spawning its writer with `make_processor` on first
    /// use. Must be called from within a tokio runtime.
    pub fn writer(
        &mut self,
        source: &str,
        make_processor: impl FnOnce() -> FightProcessor,
    ) -> mpsc::Sender<WriterMessage> {
        if let Some(writer) = self.writers.get(source)
            && !writer.handle.is_finished()
        {
            return writer.sender.clone();
        }

        let (sender, receiver) = mpsc::channel(WRITER_QUEUE);
        let handle = tokio::spawn(run_writer(source.to_string(), make_processor(), receiver));
        debug!(source = %source, "Writer started");
        self.writers.insert(
            source.to_string(),
            SourceWriter {
                sender: sender.clone(),
                handle,
            },
        );
        sender
    }

    pub fn senders(&self) -> Vec<mpsc::Sender<WriterMessage>> {
        self.writers.values().map(|w| w.sender.clone()).collect()
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.writers.keys().cloned().collect();
        sources.sort();
        sources
    }

    pub async fn abort_all(&mut self) {
        for (source, writer) in self.writers.drain() {
            writer.handle.abort();
            debug!(source = %source, "Writer aborted");
        }
    }
}

async fn run_writer(source: String, mut processor: FightProcessor, mut receiver: mpsc::Receiver<WriterMessage>) {
    while let Some(message) = receiver.recv().await {
        match message {
            WriterMessage::Batch { events, done } => {
                let count = events.len();
                let dropped = processor.process_all(events);
                debug!(source = %source, count, dropped, "Batch applied");
                if let Some(done) = done {
                    let _ = done.send(dropped);
                }
            }
            WriterMessage::Reset => processor.reset(),
        }
    }
    debug!(source = %source, "Writer stopped");
}
