pub use crate::config::*;
use crate::progress::{ImportJobProgress, ImportPlan, StepProgress};

use std::time::Duration;

/// A builder for import trackers.
///
/// The step totals displayed on the import page are optional: a step without a total runs until
/// the server reports that nothing new was processed.
///
/// ```
/// pub use tally_entry::builder::ImportBuilder;
/// # use tally_entry::TrackerError;
/// use tally_entry::{ImportAction, ImportRequest};
///
/// let mut tracker = ImportBuilder::new(5, "/super-administrator", "/data/upload")?
///     .totals(&[120, 40])?
///     .offset(1, 20)?
///     .build()?;
///
/// assert_eq!(
///     tracker.start(),
///     ImportAction::Send(ImportRequest::Step { offset: 20, step: 1 })
/// );
///
/// # Ok::<(), TrackerError>(())
/// ```
pub struct ImportBuilder {
    pub(crate) _plan: ImportPlan,
    pub(crate) _steps: Vec<StepProgress>,
}

impl ImportBuilder {
    pub fn new(
        total_steps: u32,
        destination: &str,
        fallback: &str,
    ) -> Result<ImportBuilder, TrackerError> {
        if total_steps == 0 {
            return Err(TrackerError::NoSteps);
        }
        Ok(ImportBuilder {
            _plan: ImportPlan {
                destination: destination.to_string(),
                fallback: fallback.to_string(),
                poll_delay: DEFAULT_TASK_POLL_DELAY,
                max_task_polls: None,
            },
            _steps: vec![StepProgress::default(); total_steps as usize],
        })
    }

    /// The known totals, starting from the first step.
    pub fn totals(mut self, totals: &[u64]) -> Result<ImportBuilder, TrackerError> {
        if totals.len() > self._steps.len() {
            return Err(TrackerError::TooManyTotals {
                total_steps: self._steps.len() as u32,
                totals: totals.len(),
            });
        }
        for (sp, total) in self._steps.iter_mut().zip(totals) {
            sp.total = Some(*total);
        }
        Ok(self)
    }

    /// Resumes a step from an offset (steps are numbered from 1).
    pub fn offset(mut self, step: u32, offset: u64) -> Result<ImportBuilder, TrackerError> {
        let total_steps = self._steps.len() as u32;
        if step == 0 || step > total_steps {
            return Err(TrackerError::UnknownStep { step, total_steps });
        }
        self._steps[(step - 1) as usize].offset = offset;
        Ok(self)
    }

    pub fn poll_delay(mut self, delay: Duration) -> ImportBuilder {
        self._plan.poll_delay = delay;
        self
    }

    pub fn max_task_polls(mut self, max: Option<u32>) -> ImportBuilder {
        self._plan.max_task_polls = max;
        self
    }

    pub fn build(self) -> Result<ImportJobProgress, TrackerError> {
        ImportJobProgress::new(self._plan, self._steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ImportAction;

    #[test]
    fn totals_are_optional() {
        let t = ImportBuilder::new(3, "/d", "/f")
            .unwrap()
            .totals(&[4])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(t.step(1).unwrap().total, Some(4));
        assert_eq!(t.step(2).unwrap().total, None);
        assert_eq!(t.total_steps(), 3);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(ImportBuilder::new(0, "/d", "/f").is_err());
        assert!(ImportBuilder::new(2, "/d", "/f")
            .unwrap()
            .totals(&[1, 2, 3])
            .is_err());
        assert!(ImportBuilder::new(2, "/d", "/f")
            .unwrap()
            .offset(0, 1)
            .is_err());
        assert!(ImportBuilder::new(2, "/d", "/f")
            .unwrap()
            .totals(&[1])
            .unwrap()
            .offset(1, 2)
            .unwrap()
            .build()
            .is_err());
    }

    #[test]
    fn poll_settings_reach_the_tracker() {
        let mut t = ImportBuilder::new(1, "/d", "/f")
            .unwrap()
            .poll_delay(Duration::ZERO)
            .max_task_polls(Some(0))
            .build()
            .unwrap();
        assert_eq!(t.plan().poll_delay, Duration::ZERO);
        t.start();
        let reply: crate::StepReply = crate::StepReply::task(crate::TaskStatus {
            status: crate::TaskState::Pending,
            result: None,
            task_id: Some("x".to_string()),
            done: None,
        });
        assert!(matches!(t.on_reply(reply), ImportAction::Fail { .. }));
    }
}
