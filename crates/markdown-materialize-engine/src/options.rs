use std::time::Duration;

/// Quiet period after the last schedule call before a reveal fires.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(10);
pub const DEFAULT_HIDDEN_CLASS: &str = "stream-block";
pub const DEFAULT_REVEALED_CLASS: &str = "fade-in";
pub const DEFAULT_ROOT_CLASS: &str = "streaming-markdown-root";
pub const DEFAULT_STYLE_MARKER: &str = "data-streaming-markdown";
pub const DEFAULT_MAX_PENDING: usize = 64;

/// What happens to an element still waiting for its reveal when another
/// block opens inside the quiet period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RevealPolicy {
    /// Only the most recently scheduled element is revealed; earlier ones in
    /// the same burst stay hidden unless scheduled again.
    #[default]
    LastWins,
    /// Every element scheduled in a burst is revealed together. Once more
    /// than `max_pending` are waiting the oldest is revealed immediately.
    Batch { max_pending: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOptions {
    pub quiet_period: Duration,
    pub policy: RevealPolicy,
    /// Added synchronously when a block opens.
    pub hidden_class: String,
    /// Added when the block's reveal fires; the CSS transition keys off it.
    pub revealed_class: String,
    /// Scoping class added to the root container.
    pub root_class: String,
    /// Attribute tagging the injected style sheet.
    pub style_marker: String,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            policy: RevealPolicy::LastWins,
            hidden_class: DEFAULT_HIDDEN_CLASS.to_string(),
            revealed_class: DEFAULT_REVEALED_CLASS.to_string(),
            root_class: DEFAULT_ROOT_CLASS.to_string(),
            style_marker: DEFAULT_STYLE_MARKER.to_string(),
        }
    }
}
