use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn, set_poll_cycle};
use maskbench_core::JobId;
use tokio_util::sync::CancellationToken;

use crate::api::AnnotationApi;
use crate::types::{EngineEvent, WatchOutcome};

/// Observes the remote job status on a fixed interval. Each cycle sleeps
/// first, then queries, so a job that completes instantly is still seen on
/// the first query. The loop ends on a terminal status, on the first failed
/// query, or when the token is cancelled.
pub async fn watch_status(
    api: Arc<dyn AnnotationApi>,
    job: JobId,
    interval: Duration,
    cancel: CancellationToken,
    events: mpsc::Sender<EngineEvent>,
) {
    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                engine_debug!("status watch for job {} cancelled after {} cycles", job, cycle);
                let _ = events.send(EngineEvent::WatchEnded {
                    job,
                    outcome: WatchOutcome::Cancelled,
                });
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        cycle += 1;
        set_poll_cycle(cycle);

        match api.fetch_status(&job).await {
            Ok(report) => {
                let terminal = report.status.is_terminal();
                let _ = events.send(EngineEvent::StatusReported {
                    job: job.clone(),
                    report,
                });
                if terminal {
                    let _ = events.send(EngineEvent::WatchEnded {
                        job,
                        outcome: WatchOutcome::Terminal,
                    });
                    return;
                }
            }
            Err(err) => {
                // The job may still be running server-side; an unreachable
                // status endpoint says nothing about the outcome.
                engine_warn!("status query for job {} failed on cycle {}: {}", job, cycle, err);
                let _ = events.send(EngineEvent::WatchEnded {
                    job,
                    outcome: WatchOutcome::Interrupted(err.into_fault()),
                });
                return;
            }
        }
    }
}
