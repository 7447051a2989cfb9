use crate::client::*;

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunnerSettings {
    /// How many times a request that could not reach the server is sent again.
    pub network_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ImportOutcome {
    Completed { destination: String },
    Failed { message: String, redirect: String },
}

/// One progress bar per import step.
pub struct StepBars {
    _multi: MultiProgress,
    bars: Vec<ProgressBar>,
}

impl StepBars {
    pub fn new(tracker: &ImportJobProgress) -> StepBars {
        StepBars::with_target(tracker, ProgressDrawTarget::stderr())
    }

    pub fn hidden(tracker: &ImportJobProgress) -> StepBars {
        StepBars::with_target(tracker, ProgressDrawTarget::hidden())
    }

    fn with_target(tracker: &ImportJobProgress, target: ProgressDrawTarget) -> StepBars {
        let multi = MultiProgress::with_draw_target(target);
        let style = ProgressStyle::default_bar()
            .template("{prefix:>8} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bars = (1..=tracker.total_steps())
            .map(|step| {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(style.clone());
                pb.set_prefix(format!("step {}", step));
                pb
            })
            .collect();
        let res = StepBars {
            _multi: multi,
            bars,
        };
        res.update(tracker);
        res
    }

    pub fn update(&self, tracker: &ImportJobProgress) {
        for (idx, (pb, sp)) in self.bars.iter().zip(tracker.steps()).enumerate() {
            let step = idx as u32 + 1;
            // Unknown totals show the progress so far.
            pb.set_length(sp.total.unwrap_or(sp.offset));
            pb.set_position(sp.offset);
            if sp.is_done() || step < tracker.current_step() {
                if !pb.is_finished() {
                    pb.finish_with_message("done");
                }
            } else if sp.task_id.is_some() {
                pb.set_message(format!("waiting on task ({} polls)", sp.task_polls));
            } else if step == tracker.current_step() {
                pb.set_message("importing");
            }
        }
    }

    pub fn abandon(&self, message: &str) {
        for pb in self.bars.iter().filter(|pb| !pb.is_finished()) {
            pb.abandon_with_message(message.to_string());
        }
    }
}

/// Sends the requests of the tracker one at a time until the import completes or fails.
///
/// Transport errors are retried according to the settings, by sending the request in flight
/// again. Any other error stops the import and is returned as is: the tracker keeps the offsets
/// reached so far.
pub async fn drive_import<E: ImportEndpoint + ?Sized>(
    endpoint: &E,
    tracker: &mut ImportJobProgress,
    settings: &RunnerSettings,
    bars: &StepBars,
) -> ClientResult<ImportOutcome> {
    let mut action = tracker.start();
    loop {
        let request = match action {
            ImportAction::Send(request) => request,
            ImportAction::SendAfter { delay, request } => {
                debug!("drive_import: waiting {:?} before {:?}", delay, request);
                tokio::time::sleep(delay).await;
                request
            }
            ImportAction::Complete { destination } => {
                bars.update(tracker);
                return Ok(ImportOutcome::Completed { destination });
            }
            ImportAction::Fail { message, redirect } => {
                bars.abandon(&message);
                return Ok(ImportOutcome::Failed { message, redirect });
            }
        };

        let reply = send_with_retries(endpoint, tracker, request, settings).await;
        let reply = match reply {
            Ok(r) => r,
            Err(e) => {
                bars.abandon("interrupted");
                return Err(e);
            }
        };
        action = tracker.on_reply(reply);
        bars.update(tracker);
    }
}

async fn send_with_retries<E: ImportEndpoint + ?Sized>(
    endpoint: &E,
    tracker: &ImportJobProgress,
    mut request: ImportRequest,
    settings: &RunnerSettings,
) -> ClientResult<StepReply> {
    let mut attempts = 0;
    loop {
        match endpoint.send(&request).await {
            Ok(reply) => return Ok(reply),
            Err(e) if e.is_transient() && attempts < settings.network_retries => {
                attempts += 1;
                warn!(
                    "send_with_retries: {:?} failed ({}), attempt {} of {}",
                    request, e, attempts, settings.network_retries
                );
                tokio::time::sleep(settings.retry_delay).await;
                request = match tracker.retry() {
                    Some(ImportAction::Send(r)) => r,
                    _ => request,
                };
            }
            Err(e) => return Err(e),
        }
    }
}
