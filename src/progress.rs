use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted while building the static site
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// The recent-episode collection is being requested
    FetchingPaths { url: String },

    /// The warm set is known and compared against the manifest
    PathsReady {
        total: usize,
        to_render: usize,
        fresh: usize,
    },

    /// A page is being loaded and rendered
    RenderingPage {
        identity: String,
        /// Index of this page in the render queue
        index: usize,
        total: usize,
    },

    /// A page was written to disk
    PageWritten {
        identity: String,
        path: PathBuf,
        bytes: usize,
    },

    /// A page was left alone because it is still fresh
    PageSkipped { identity: String },

    /// A page could not be rendered
    PageFailed { identity: String, error: String },

    /// A page of an episode no longer in the warm set was removed
    PagePruned { identity: String, path: PathBuf },

    /// Build finished
    BuildCompleted {
        rendered_count: usize,
        fresh_count: usize,
        failed_count: usize,
        pruned_count: usize,
    },
}

/// Trait for reporting progress events during a build.
///
/// Implementations can use this to display spinners, log messages,
/// or collect statistics.
pub trait BuildReporter: Send + Sync {
    fn report(&self, event: BuildEvent);
}

/// A shared reference to a build reporter
pub type SharedBuildReporter = Arc<dyn BuildReporter>;

/// A reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl BuildReporter for NoopReporter {
    fn report(&self, _event: BuildEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedBuildReporter {
        Arc::new(Self)
    }
}
