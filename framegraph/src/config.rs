//! Frame graph configuration.

/// Upper bound on recording threads picked by default.
const DEFAULT_MAX_RECORDING_THREADS: usize = 8;

/// Default limit on passes per frame.
const DEFAULT_MAX_PASSES: usize = 64;

/// Configuration of a [`FrameGraph`](crate::FrameGraph).
///
/// # Example
///
/// ```
/// use framegraph::FrameGraphConfig;
///
/// let config = FrameGraphConfig::new()
///     .with_max_recording_threads(1)
///     .with_debug_labels(false);
/// assert_eq!(config.max_recording_threads, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Maximum number of threads recording command contexts concurrently.
    /// With 1, all passes are recorded into a single context.
    pub max_recording_threads: usize,
    /// Maximum number of passes per frame.
    pub max_passes: usize,
    /// Wrap every pass in a debug label named after it.
    pub debug_labels: bool,
    /// Log the execution plan (order, levels, groups, barriers) at debug level
    /// every frame.
    pub dump_execution_plan: bool,
}

impl FrameGraphConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of recording threads.
    pub fn with_max_recording_threads(mut self, threads: usize) -> Self {
        self.max_recording_threads = threads.max(1);
        self
    }

    /// Set the maximum number of passes per frame.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Enable or disable per-pass debug labels.
    pub fn with_debug_labels(mut self, enabled: bool) -> Self {
        self.debug_labels = enabled;
        self
    }

    /// Enable or disable the per-frame execution plan dump.
    pub fn with_execution_plan_dump(mut self, enabled: bool) -> Self {
        self.dump_execution_plan = enabled;
        self
    }
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(DEFAULT_MAX_RECORDING_THREADS);

        Self {
            max_recording_threads: threads,
            max_passes: DEFAULT_MAX_PASSES,
            debug_labels: true,
            dump_execution_plan: false,
        }
    }
}
