use serde::Serialize;

/// Broad cause of a failed operation, for callers deciding what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Deployment problem: missing credential or backend not configured
    Configuration,
    /// Upstream service failed; retrying later may succeed
    Upstream,
    /// A collaborator answered with data of the wrong shape
    DataShape,
}
