use crate::walk::WalkPoint;

/// Notifications emitted while a render runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressEvent<'a> {
    /// Human readable status for the job `job_id`.
    Status { job_id: &'a str, message: &'a str },
    /// Walk edge `index` is being written, in the walk's original coordinates.
    /// Only sent when plot display is enabled.
    WalkEdge {
        index: usize,
        from: WalkPoint,
        to: WalkPoint,
    },
}

/// Receiver for [`ProgressEvent`]s.
///
/// Reporting is fire-and-forget: implementations cannot fail a render.
/// Any `FnMut(ProgressEvent)` closure is a reporter.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent<'_>) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent<'_>),
{
    fn report(&mut self, event: ProgressEvent<'_>) {
        self(event)
    }
}

/// Reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}

pub(crate) fn status(progress: &mut dyn ProgressReporter, job_id: &str, message: &str) {
    log::info!("{job_id}: {message}");
    progress.report(ProgressEvent::Status { job_id, message });
}
