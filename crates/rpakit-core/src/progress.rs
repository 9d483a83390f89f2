//! Progress callback contract shared by reader and writer (§4.5, §6).
//!
//! Mirrors the shape of `renpak-core::pipeline`'s progress trait: a small
//! set of lifecycle hooks the caller implements, never a channel the core
//! blocks on. Events are strictly ordered and one-way — a collaborator
//! cannot use this to cancel or redirect work.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Decompile,
    Complete,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Decompile => "decompile",
            Stage::Complete => "complete",
        }
    }
}

/// Implemented by callers that want visibility into a long-running
/// `extract_all`/writer pass. `total` is fixed when `phase_start` fires;
/// `current` passed to `task_done` is monotonically non-decreasing within
/// a stage.
pub trait ProgressReport {
    fn phase_start(&mut self, stage: Stage, total: usize);
    fn task_done(&mut self, stage: Stage, current: usize, message: &str);
    fn phase_end(&mut self, stage: Stage);
    fn warning(&mut self, message: &str);
}

/// No-op implementation for callers that don't care.
pub struct NoProgress;

impl ProgressReport for NoProgress {
    fn phase_start(&mut self, _stage: Stage, _total: usize) {}
    fn task_done(&mut self, _stage: Stage, _current: usize, _message: &str) {}
    fn phase_end(&mut self, _stage: Stage) {}
    fn warning(&mut self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressReport for Recorder {
        fn phase_start(&mut self, stage: Stage, total: usize) {
            self.events.push(format!("start:{}:{total}", stage.name()));
        }
        fn task_done(&mut self, stage: Stage, current: usize, message: &str) {
            self.events.push(format!("done:{}:{current}:{message}", stage.name()));
        }
        fn phase_end(&mut self, stage: Stage) {
            self.events.push(format!("end:{}", stage.name()));
        }
        fn warning(&mut self, message: &str) {
            self.events.push(format!("warn:{message}"));
        }
    }

    #[test]
    fn records_events_in_order() {
        let mut r = Recorder::default();
        r.phase_start(Stage::Extract, 2);
        r.task_done(Stage::Extract, 1, "a.txt");
        r.task_done(Stage::Extract, 2, "b.txt");
        r.phase_end(Stage::Extract);
        assert_eq!(
            r.events,
            vec!["start:extract:2", "done:extract:1:a.txt", "done:extract:2:b.txt", "end:extract"]
        );
    }
}
