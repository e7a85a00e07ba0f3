//! Timer-driven release of batch schedules.

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time};
use tracing::debug;
use tribe_war_core::protocol::ClientRequest;
use tribe_war_system_flood_fill::BatchSchedule;

/// Releases paced schedules onto the outbound request channel.
///
/// Each schedule runs as its own task: the first batch goes out immediately
/// and every following batch one interval later. Server acknowledgements are
/// never awaited.
#[derive(Debug)]
pub struct BatchPacer {
    requests: UnboundedSender<ClientRequest>,
    tasks: Vec<JoinHandle<()>>,
}

impl BatchPacer {
    /// Creates a pacer feeding `requests`.
    #[must_use]
    pub fn new(requests: UnboundedSender<ClientRequest>) -> Self {
        Self {
            requests,
            tasks: Vec::new(),
        }
    }

    /// Starts releasing `schedule` in the background.
    pub fn start(&mut self, schedule: BatchSchedule) {
        self.tasks.retain(|task| !task.is_finished());
        let requests = self.requests.clone();
        let interval = schedule.interval();
        self.tasks.push(tokio::spawn(async move {
            let mut first = true;
            for request in schedule {
                if !first {
                    time::sleep(interval).await;
                }
                first = false;
                if requests.send(request).is_err() {
                    debug!("request channel closed, abandoning schedule");
                    return;
                }
            }
        }));
    }

    /// Aborts every schedule still in flight.
    pub fn cancel_all(&mut self) {
        let cancelled = self.tasks.len();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!(cancelled, "paced schedules cancelled");
    }

    /// Number of schedules that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for BatchPacer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
