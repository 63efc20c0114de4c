/// Errors raised while building providers from configuration.
///
/// Both variants are configuration errors surfaced before any discovery
/// call is made.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The configured resource kind has no registered provider.
    #[error("no such resource type: {0}")]
    UnknownResourceKind(String),

    /// The configured name pattern is not a valid regex.
    #[error("invalid resource name pattern `{pattern}`: {source}")]
    InvalidNamePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
