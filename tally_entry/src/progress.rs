//! Progress tracking of a multi-step batch import.
//!
//! The server imports a batch in a fixed number of steps (5 or 7 depending on the deployment).
//! The client asks the server to process the active step from a given offset, and repeats
//! until the step is done, then moves to the next one. A step may also be handed to a
//! background task, in which case the client polls the task until it resolves.
//!
//! [ImportJobProgress] does no I/O: it tells the caller which request to send next
//! ([ImportAction]) and consumes the server replies ([StepReply]). Requests are strictly
//! sequential: a new request is only emitted once the reply to the previous one was handed in.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TrackerError;

// ********* Wire format ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ReplyStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Error")]
    Error,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Success,
    Failure,
}

/// The result of a background task: a processed count on success, a message on failure.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Count(u64),
    Message(String),
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    #[serde(default)]
    pub result: Option<TaskResult>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

/// Deployments either answer with a plain count or with the status of a background task.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Processed {
    Count(u64),
    Task(TaskStatus),
}

/// A reply from the import step endpoint or from the task poll endpoint.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StepReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub elements_processed: Option<Processed>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl StepReply {
    pub fn count(n: u64) -> StepReply {
        StepReply {
            status: ReplyStatus::Ok,
            elements_processed: Some(Processed::Count(n)),
            error_message: None,
        }
    }

    pub fn task(status: TaskStatus) -> StepReply {
        StepReply {
            status: ReplyStatus::Ok,
            elements_processed: Some(Processed::Task(status)),
            error_message: None,
        }
    }

    pub fn error(message: &str) -> StepReply {
        StepReply {
            status: ReplyStatus::Error,
            elements_processed: None,
            error_message: Some(message.to_string()),
        }
    }
}

// ********* Tracker ***********

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum ImportRequest {
    /// Process the step from this offset.
    Step { offset: u64, step: u32 },
    /// Ask for the status of the background task of a step.
    PollTask { step: u32, task_id: String },
}

impl ImportRequest {
    pub fn step(&self) -> u32 {
        match self {
            ImportRequest::Step { step, .. } => *step,
            ImportRequest::PollTask { step, .. } => *step,
        }
    }
}

/// What the caller must do next.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ImportAction {
    Send(ImportRequest),
    SendAfter {
        delay: Duration,
        request: ImportRequest,
    },
    /// All the steps are done: go to the destination.
    Complete { destination: String },
    /// The import failed: show the message and go to the fallback page.
    Fail { message: String, redirect: String },
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct StepProgress {
    /// Elements processed so far.
    pub offset: u64,
    /// None until the server tells us (or until the step runs dry).
    pub total: Option<u64>,
    pub task_id: Option<String>,
    pub task_polls: u32,
}

impl StepProgress {
    pub fn is_done(&self) -> bool {
        matches!(self.total, Some(t) if self.offset >= t)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TrackerState {
    NotStarted,
    Running,
    AwaitingTask,
    Completed,
    Failed(String),
}

/// Where to go at the end of the import, and how to wait on background tasks.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ImportPlan {
    pub destination: String,
    pub fallback: String,
    pub poll_delay: Duration,
    /// None polls forever.
    pub max_task_polls: Option<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ImportJobProgress {
    plan: ImportPlan,
    steps: Vec<StepProgress>,
    // 1-based. Once finished, one past the last step.
    current_step: u32,
    state: TrackerState,
    in_flight: Option<ImportRequest>,
}

impl ImportJobProgress {
    pub fn new(
        plan: ImportPlan,
        steps: Vec<StepProgress>,
    ) -> Result<ImportJobProgress, TrackerError> {
        if steps.is_empty() {
            return Err(TrackerError::NoSteps);
        }
        for (idx, sp) in steps.iter().enumerate() {
            if let Some(total) = sp.total {
                if sp.offset > total {
                    return Err(TrackerError::OffsetBeyondTotal {
                        step: idx as u32 + 1,
                        offset: sp.offset,
                        total,
                    });
                }
            }
        }
        Ok(ImportJobProgress {
            plan,
            steps,
            current_step: 1,
            state: TrackerState::NotStarted,
            in_flight: None,
        })
    }

    pub fn plan(&self) -> &ImportPlan {
        &self.plan
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// The progress of a step, numbered from 1.
    pub fn step(&self, step: u32) -> Option<&StepProgress> {
        if step == 0 {
            return None;
        }
        self.steps.get((step - 1) as usize)
    }

    pub fn steps(&self) -> &[StepProgress] {
        &self.steps
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn in_flight(&self) -> Option<&ImportRequest> {
        self.in_flight.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, TrackerState::Completed | TrackerState::Failed(_))
    }

    pub fn start(&mut self) -> ImportAction {
        info!(
            "Starting import of {} steps at step {}",
            self.total_steps(),
            self.current_step
        );
        self.next_action()
    }

    /// The request that is still waiting for a reply, to be sent again after a transport error.
    pub fn retry(&self) -> Option<ImportAction> {
        self.in_flight.clone().map(ImportAction::Send)
    }

    /// Hands in the reply to the request in flight.
    pub fn on_reply(&mut self, reply: StepReply) -> ImportAction {
        let request = match self.in_flight.take() {
            Some(r) => r,
            None => {
                return self.fail(format!(
                    "reply received while no request was pending: {:?}",
                    reply
                ))
            }
        };
        debug!("on_reply: {:?} -> {:?}", request, reply);

        if reply.status == ReplyStatus::Error {
            let message = reply
                .error_message
                .unwrap_or_else(|| format!("Import failed at step {}", request.step()));
            return self.fail(message);
        }

        match (request, reply.elements_processed) {
            (ImportRequest::Step { .. }, Some(Processed::Count(n))) => self.record_count(n),
            (ImportRequest::PollTask { .. }, Some(Processed::Count(n))) => self.complete_step(n),
            (_, Some(Processed::Task(ts))) => self.on_task_status(ts),
            (request, None) => self.fail(format!(
                "step {}: reply without elements_processed",
                request.step()
            )),
        }
    }

    fn record_count(&mut self, n: u64) -> ImportAction {
        let step = self.current_step;
        let sp = &mut self.steps[(step - 1) as usize];
        if n == 0 {
            // No new lines were processed: the step is exhausted at the current offset.
            debug!(
                "record_count: step {} processed nothing, total set to {}",
                step, sp.offset
            );
            sp.total = Some(sp.offset);
        } else {
            sp.offset = sp.offset.saturating_add(n);
            if let Some(total) = sp.total {
                if sp.offset > total {
                    warn!(
                        "record_count: step {}: server processed {} elements for a total of {}",
                        step, sp.offset, total
                    );
                    sp.offset = total;
                }
            }
        }
        debug!("record_count: step {}: {}/{:?}", step, sp.offset, sp.total);
        self.next_action()
    }

    fn on_task_status(&mut self, ts: TaskStatus) -> ImportAction {
        let step = self.current_step;
        match ts.status {
            TaskState::Success => match ts.result {
                Some(TaskResult::Count(n)) => self.complete_step(n),
                Some(TaskResult::Message(s)) => match s.trim().parse::<u64>() {
                    Ok(n) => self.complete_step(n),
                    Err(_) => self.fail(format!(
                        "step {}: task succeeded with an unreadable result {:?}",
                        step, s
                    )),
                },
                None => self.fail(format!("step {}: task succeeded without a result", step)),
            },
            TaskState::Failure => {
                let message = match ts.result {
                    Some(TaskResult::Message(s)) => s,
                    Some(TaskResult::Count(n)) => n.to_string(),
                    None => format!("Import task failed at step {}", step),
                };
                self.fail(message)
            }
            TaskState::Pending => {
                if ts.done == Some(true) {
                    return self.fail(format!(
                        "step {}: task reported done while still pending",
                        step
                    ));
                }
                let sp = &mut self.steps[(step - 1) as usize];
                if let Some(task_id) = ts.task_id {
                    sp.task_id = Some(task_id);
                }
                let task_id = match sp.task_id.clone() {
                    Some(t) => t,
                    None => {
                        return self.fail(format!("step {}: pending task without a task id", step))
                    }
                };
                if let Some(max) = self.plan.max_task_polls {
                    if sp.task_polls >= max {
                        let message = format!(
                            "step {}: task {} still pending after {} polls",
                            step, task_id, sp.task_polls
                        );
                        return self.fail(message);
                    }
                }
                sp.task_polls += 1;
                debug!(
                    "on_task_status: step {}: task {} pending, poll #{}",
                    step, task_id, sp.task_polls
                );
                self.state = TrackerState::AwaitingTask;
                let request = ImportRequest::PollTask { step, task_id };
                self.in_flight = Some(request.clone());
                ImportAction::SendAfter {
                    delay: self.plan.poll_delay,
                    request,
                }
            }
        }
    }

    fn complete_step(&mut self, processed: u64) -> ImportAction {
        let step = self.current_step;
        let sp = &mut self.steps[(step - 1) as usize];
        sp.offset = processed;
        sp.total = Some(processed);
        sp.task_id = None;
        info!("Step {}: task done, {} elements processed", step, processed);
        self.current_step += 1;
        self.next_action()
    }

    fn next_action(&mut self) -> ImportAction {
        while self.current_step <= self.total_steps() {
            let step = self.current_step;
            let sp = &self.steps[(step - 1) as usize];
            if !sp.is_done() {
                self.state = TrackerState::Running;
                let request = ImportRequest::Step {
                    offset: sp.offset,
                    step,
                };
                self.in_flight = Some(request.clone());
                return ImportAction::Send(request);
            }
            info!("Step {} done: {} elements", step, sp.offset);
            self.current_step += 1;
        }
        info!("Import done, going to {}", self.plan.destination);
        self.state = TrackerState::Completed;
        self.in_flight = None;
        ImportAction::Complete {
            destination: self.plan.destination.clone(),
        }
    }

    fn fail(&mut self, message: String) -> ImportAction {
        warn!(
            "Import failed at step {}: {}",
            self.current_step, message
        );
        self.state = TrackerState::Failed(message.clone());
        self.in_flight = None;
        ImportAction::Fail {
            message,
            redirect: self.plan.fallback.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn plan() -> ImportPlan {
        ImportPlan {
            destination: "/done".to_string(),
            fallback: "/upload".to_string(),
            poll_delay: Duration::from_secs(30),
            max_task_polls: None,
        }
    }

    fn tracker(totals: &[Option<u64>]) -> ImportJobProgress {
        let steps = totals
            .iter()
            .map(|t| StepProgress {
                total: *t,
                ..StepProgress::default()
            })
            .collect();
        ImportJobProgress::new(plan(), steps).unwrap()
    }

    fn pending(task_id: Option<&str>) -> StepReply {
        StepReply::task(TaskStatus {
            status: TaskState::Pending,
            result: None,
            task_id: task_id.map(|s| s.to_string()),
            done: Some(false),
        })
    }

    fn success(n: u64) -> StepReply {
        StepReply::task(TaskStatus {
            status: TaskState::Success,
            result: Some(TaskResult::Count(n)),
            task_id: None,
            done: Some(true),
        })
    }

    /// Answers every step request with what is left to process.
    fn run_to_end(t: &mut ImportJobProgress) -> (Vec<ImportRequest>, ImportAction) {
        let mut requests = Vec::new();
        let mut action = t.start();
        loop {
            match action {
                ImportAction::Send(ImportRequest::Step { offset, step }) => {
                    requests.push(ImportRequest::Step { offset, step });
                    let total = t.step(step).unwrap().total.unwrap();
                    action = t.on_reply(StepReply::count(total - offset));
                }
                other => return (requests, other),
            }
        }
    }

    #[test]
    fn visits_every_step_once_in_order() {
        init();
        let mut t = tracker(&[Some(10), Some(3), Some(7), Some(1), Some(100)]);
        let (requests, end) = run_to_end(&mut t);
        let steps: Vec<u32> = requests.iter().map(|r| r.step()).collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            end,
            ImportAction::Complete {
                destination: "/done".to_string()
            }
        );
        assert_eq!(t.current_step(), 6);
        assert_eq!(t.state(), &TrackerState::Completed);
        assert!(t.steps().iter().all(|s| s.is_done()));
    }

    #[test]
    fn zero_replies_clamp_totals_and_finish() {
        init();
        let mut t = tracker(&[Some(5); 5]);
        let mut action = t.start();
        let mut seen = Vec::new();
        while let ImportAction::Send(req) = action {
            seen.push(req.step());
            action = t.on_reply(StepReply::count(0));
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert!(matches!(action, ImportAction::Complete { .. }));
        for step in 1..=5 {
            assert_eq!(t.step(step).unwrap().total, Some(0));
            assert_eq!(t.step(step).unwrap().offset, 0);
        }
    }

    #[test]
    fn offset_accumulates_until_total() {
        let mut t = tracker(&[Some(10)]);
        assert_eq!(
            t.start(),
            ImportAction::Send(ImportRequest::Step { offset: 0, step: 1 })
        );
        assert_eq!(
            t.on_reply(StepReply::count(4)),
            ImportAction::Send(ImportRequest::Step { offset: 4, step: 1 })
        );
        assert_eq!(
            t.on_reply(StepReply::count(4)),
            ImportAction::Send(ImportRequest::Step { offset: 8, step: 1 })
        );
        assert!(matches!(
            t.on_reply(StepReply::count(4)),
            ImportAction::Complete { .. }
        ));
        // Overshoot is clamped.
        assert_eq!(t.step(1).unwrap().offset, 10);
    }

    #[test]
    fn huge_counts_saturate() {
        let mut t = tracker(&[None]);
        t.start();
        t.on_reply(StepReply::count(5));
        assert_eq!(
            t.on_reply(StepReply::count(u64::MAX)),
            ImportAction::Send(ImportRequest::Step {
                offset: u64::MAX,
                step: 1
            })
        );
        assert!(matches!(
            t.on_reply(StepReply::count(0)),
            ImportAction::Complete { .. }
        ));
        assert_eq!(t.step(1).unwrap().total, Some(u64::MAX));

        let mut t = tracker(&[Some(10)]);
        t.start();
        t.on_reply(StepReply::count(5));
        assert!(matches!(
            t.on_reply(StepReply::count(u64::MAX)),
            ImportAction::Complete { .. }
        ));
        assert_eq!(t.step(1).unwrap().offset, 10);
    }

    #[test]
    fn unknown_total_runs_until_exhausted() {
        let mut t = tracker(&[None]);
        t.start();
        assert_eq!(
            t.on_reply(StepReply::count(50)),
            ImportAction::Send(ImportRequest::Step {
                offset: 50,
                step: 1
            })
        );
        assert!(matches!(
            t.on_reply(StepReply::count(0)),
            ImportAction::Complete { .. }
        ));
        assert_eq!(t.step(1).unwrap().total, Some(50));
    }

    #[test]
    fn pending_task_is_polled_then_completes_step() {
        init();
        let mut t = tracker(&[Some(1), Some(1)]);
        t.start();
        assert_eq!(
            t.on_reply(pending(Some("T"))),
            ImportAction::SendAfter {
                delay: Duration::from_secs(30),
                request: ImportRequest::PollTask {
                    step: 1,
                    task_id: "T".to_string()
                }
            }
        );
        assert_eq!(t.state(), &TrackerState::AwaitingTask);
        // The next request is for step 2, not a new initial request for step 1.
        assert_eq!(
            t.on_reply(success(42)),
            ImportAction::Send(ImportRequest::Step { offset: 0, step: 2 })
        );
        let s1 = t.step(1).unwrap();
        assert_eq!((s1.offset, s1.total), (42, Some(42)));
        assert_eq!(t.current_step(), 2);
    }

    #[test]
    fn pending_poll_reply_keeps_task_id() {
        let mut t = tracker(&[Some(1)]);
        t.start();
        t.on_reply(pending(Some("T")));
        assert_eq!(
            t.on_reply(pending(None)),
            ImportAction::SendAfter {
                delay: Duration::from_secs(30),
                request: ImportRequest::PollTask {
                    step: 1,
                    task_id: "T".to_string()
                }
            }
        );
        assert_eq!(t.step(1).unwrap().task_polls, 2);
    }

    #[test]
    fn immediate_task_success_completes_step() {
        let mut t = tracker(&[None]);
        t.start();
        assert!(matches!(t.on_reply(success(7)), ImportAction::Complete { .. }));
        assert_eq!(t.step(1).unwrap().total, Some(7));
    }

    #[test]
    fn task_failure_is_fatal() {
        let mut t = tracker(&[Some(1), Some(1)]);
        t.start();
        t.on_reply(pending(Some("T")));
        let reply = StepReply::task(TaskStatus {
            status: TaskState::Failure,
            result: Some(TaskResult::Message("bad ballot file".to_string())),
            task_id: None,
            done: Some(true),
        });
        assert_eq!(
            t.on_reply(reply),
            ImportAction::Fail {
                message: "bad ballot file".to_string(),
                redirect: "/upload".to_string()
            }
        );
        assert!(t.is_finished());
        assert_eq!(t.in_flight(), None);
    }

    #[test]
    fn error_status_is_fatal() {
        let mut t = tracker(&[Some(3)]);
        t.start();
        assert_eq!(
            t.on_reply(StepReply::error("Duplicate center")),
            ImportAction::Fail {
                message: "Duplicate center".to_string(),
                redirect: "/upload".to_string()
            }
        );
        assert_eq!(
            t.state(),
            &TrackerState::Failed("Duplicate center".to_string())
        );
    }

    #[test]
    fn poll_ceiling_fails_the_import() {
        let mut p = plan();
        p.max_task_polls = Some(2);
        let mut t = ImportJobProgress::new(p, vec![StepProgress::default()]).unwrap();
        t.start();
        assert!(matches!(t.on_reply(pending(Some("T"))), ImportAction::SendAfter { .. }));
        assert!(matches!(t.on_reply(pending(None)), ImportAction::SendAfter { .. }));
        assert!(matches!(t.on_reply(pending(None)), ImportAction::Fail { .. }));
    }

    #[test]
    fn retry_resends_the_pending_request() {
        let mut t = tracker(&[Some(10)]);
        t.start();
        t.on_reply(StepReply::count(3));
        assert_eq!(
            t.retry(),
            Some(ImportAction::Send(ImportRequest::Step { offset: 3, step: 1 }))
        );
        // Still the same request after a second failure.
        assert_eq!(
            t.retry(),
            Some(ImportAction::Send(ImportRequest::Step { offset: 3, step: 1 }))
        );
    }

    #[test]
    fn resumes_from_recorded_offsets() {
        let steps = vec![
            StepProgress {
                offset: 5,
                total: Some(5),
                ..StepProgress::default()
            },
            StepProgress {
                offset: 2,
                total: Some(4),
                ..StepProgress::default()
            },
        ];
        let mut t = ImportJobProgress::new(plan(), steps).unwrap();
        assert_eq!(
            t.start(),
            ImportAction::Send(ImportRequest::Step { offset: 2, step: 2 })
        );
    }

    #[test]
    fn invalid_plans_are_rejected() {
        assert_eq!(
            ImportJobProgress::new(plan(), vec![]),
            Err(TrackerError::NoSteps)
        );
        let steps = vec![StepProgress {
            offset: 6,
            total: Some(5),
            ..StepProgress::default()
        }];
        assert_eq!(
            ImportJobProgress::new(plan(), steps),
            Err(TrackerError::OffsetBeyondTotal {
                step: 1,
                offset: 6,
                total: 5
            })
        );
    }

    #[test]
    fn replies_parse_both_protocol_variants() {
        let count: StepReply =
            serde_json::from_str(r#"{"status": "OK", "elements_processed": 12}"#).unwrap();
        assert_eq!(count, StepReply::count(12));

        let task: StepReply = serde_json::from_str(
            r#"{"status": "OK",
                "elements_processed": {"status": "PENDING", "result": null, "task_id": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(task, pending(Some("abc")).with_done(None));

        let err: StepReply =
            serde_json::from_str(r#"{"status": "Error", "error_message": "boom"}"#).unwrap();
        assert_eq!(err, StepReply::error("boom"));

        let failure: StepReply = serde_json::from_str(
            r#"{"status": "OK",
                "elements_processed": {"status": "FAILURE", "result": "no file", "done": true}}"#,
        )
        .unwrap();
        assert!(matches!(
            failure.elements_processed,
            Some(Processed::Task(TaskStatus {
                status: TaskState::Failure,
                result: Some(TaskResult::Message(_)),
                ..
            }))
        ));
    }

    impl StepReply {
        fn with_done(mut self, done: Option<bool>) -> StepReply {
            if let Some(Processed::Task(ts)) = self.elements_processed.as_mut() {
                ts.done = done;
            }
            self
        }
    }
}
