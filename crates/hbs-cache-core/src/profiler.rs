//! Render profiling hooks.
//!
//! The environment brackets every render with [`Profiler::enter`] and
//! [`Profiler::leave`] through a [`ProfileGuard`], so the span is closed on
//! every exit path, errors included.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// What a profile span covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Root,
    Template,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Root => "root",
            Self::Template => "template",
        };
        f.write_str(s)
    }
}

/// Identity of a profile span: template, kind and label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Profile {
    pub template: String,
    pub kind: ProfileKind,
    pub name: String,
}

impl Profile {
    /// Span covering a whole run, e.g. one CLI invocation.
    pub fn root(label: &str) -> Self {
        Self {
            template: String::new(),
            kind: ProfileKind::Root,
            name: label.to_string(),
        }
    }

    pub fn template(name: &str) -> Self {
        Self {
            template: name.to_string(),
            kind: ProfileKind::Template,
            name: name.to_string(),
        }
    }
}

/// Receives span boundaries.
pub trait Profiler: Send + Sync {
    fn enter(&self, profile: &Profile);
    fn leave(&self, profile: &Profile);
}

/// Calls `enter` on creation and `leave` on drop.
pub struct ProfileGuard<'a> {
    profiler: &'a dyn Profiler,
    profile: Profile,
}

impl<'a> ProfileGuard<'a> {
    pub fn new(profiler: &'a dyn Profiler, profile: Profile) -> Self {
        profiler.enter(&profile);
        Self { profiler, profile }
    }
}

impl Drop for ProfileGuard<'_> {
    fn drop(&mut self) {
        self.profiler.leave(&self.profile);
    }
}

/// Discards all spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn enter(&self, _profile: &Profile) {}
    fn leave(&self, _profile: &Profile) {}
}

/// Logs span durations at debug level.
#[derive(Debug, Default)]
pub struct TracingProfiler {
    open: Mutex<Vec<(Profile, Instant)>>,
}

impl TracingProfiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Profiler for TracingProfiler {
    fn enter(&self, profile: &Profile) {
        tracing::trace!(template = %profile.template, kind = %profile.kind, "enter");
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((profile.clone(), Instant::now()));
    }

    fn leave(&self, profile: &Profile) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = open.iter().rposition(|(p, _)| p == profile) {
            let (_, started) = open.remove(pos);
            tracing::debug!(
                template = %profile.template,
                kind = %profile.kind,
                name = %profile.name,
                elapsed_us = started.elapsed().as_micros() as u64,
                "profile"
            );
        }
    }
}

/// One entry recorded by [`RecordingProfiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    Enter(Profile),
    Leave(Profile, Duration),
}

#[derive(Debug, Default)]
struct Recording {
    events: Vec<ProfileEvent>,
    open: Vec<(Profile, Instant)>,
}

/// Records every enter/leave with durations. Clones share the recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingProfiler {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProfileEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .events
            .clone()
    }

    /// Completed spans with their durations, in completion order.
    pub fn completed(&self) -> Vec<(Profile, Duration)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProfileEvent::Leave(profile, elapsed) => Some((profile, elapsed)),
                ProfileEvent::Enter(_) => None,
            })
            .collect()
    }

    /// Spans entered but not yet left.
    pub fn open_spans(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .open
            .len()
    }
}

impl Profiler for RecordingProfiler {
    fn enter(&self, profile: &Profile) {
        let mut rec = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        rec.events.push(ProfileEvent::Enter(profile.clone()));
        rec.open.push((profile.clone(), Instant::now()));
    }

    fn leave(&self, profile: &Profile) {
        let mut rec = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = match rec.open.iter().rposition(|(p, _)| p == profile) {
            Some(pos) => rec.open.remove(pos).1.elapsed(),
            None => Duration::ZERO,
        };
        rec.events.push(ProfileEvent::Leave(profile.clone(), elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_brackets_scope() {
        let profiler = RecordingProfiler::new();
        {
            let _guard = ProfileGuard::new(&profiler, Profile::template("page"));
            assert_eq!(profiler.open_spans(), 1);
        }
        assert_eq!(profiler.open_spans(), 0);

        let events = profiler.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ProfileEvent::Enter(Profile::template("page")));
        assert!(matches!(&events[1], ProfileEvent::Leave(p, _) if p.name == "page"));
    }

    #[test]
    fn test_guard_leaves_on_early_return() {
        fn fails(profiler: &dyn Profiler) -> Result<(), String> {
            let _guard = ProfileGuard::new(profiler, Profile::template("broken"));
            Err("boom".into())
        }

        let profiler = RecordingProfiler::new();
        assert!(fails(&profiler).is_err());
        assert_eq!(profiler.open_spans(), 0);
        assert_eq!(profiler.completed().len(), 1);
    }

    #[test]
    fn test_nested_spans_close_innermost_first() {
        let profiler = RecordingProfiler::new();
        {
            let _outer = ProfileGuard::new(&profiler, Profile::template("layout"));
            let _inner = ProfileGuard::new(&profiler, Profile::template("body"));
        }
        let completed: Vec<String> = profiler
            .completed()
            .into_iter()
            .map(|(p, _)| p.name)
            .collect();
        assert_eq!(completed, vec!["body", "layout"]);
    }

    #[test]
    fn test_tracing_profiler_tracks_open_spans() {
        let profiler = TracingProfiler::new();
        {
            let _guard = ProfileGuard::new(&profiler, Profile::template("t"));
        }
        assert!(profiler.open.lock().unwrap().is_empty());
    }

    #[test]
    fn test_profile_kind_display() {
        assert_eq!(ProfileKind::Template.to_string(), "template");
        assert_eq!(Profile::template("x").kind, ProfileKind::Template);
    }
}
