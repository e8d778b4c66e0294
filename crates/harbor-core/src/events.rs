//! Application event bus seam
//!
//! Features publish coarse-grained events (for example `import-finished`)
//! that unrelated parts of the application subscribe to. The bus itself
//! lives in the host application; feature crates only see this trait.

/// A fire-and-forget application event.
#[derive(Debug, Clone, PartialEq)]
pub struct AppEvent {
    /// Stable event name subscribers match on.
    pub name: &'static str,
    /// Structured payload; consumers pick the keys they care about.
    pub payload: serde_json::Value,
}

impl AppEvent {
    pub fn new(name: &'static str, payload: serde_json::Value) -> Self {
        Self { name, payload }
    }
}

/// Sink for application events.
///
/// Emission is fire-and-forget: implementations must not block the caller
/// and failures to deliver are not reported back.
pub trait AppEventSink: Send + Sync {
    fn emit(&self, event: AppEvent);
}
