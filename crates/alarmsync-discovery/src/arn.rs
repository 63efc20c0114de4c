//! Short-name extraction from resource ARNs.
//!
//! Each resource kind's ARN embeds the bare name behind a different prefix
//! shape; the three shapes below cover every kind this tool discovers.

use std::sync::LazyLock;

use regex::Regex;

static THROUGH_RESOURCE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^arn:aws:[^:]*:[^:]*:[0-9]*:[^:]*:").expect("hard-coded regex"));
static THROUGH_ACCOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^arn:aws:[^:]*:[^:]*:[0-9]*:").expect("hard-coded regex"));
static THROUGH_LAST_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^arn:aws:[^:]*:[^:]*:[0-9]*:[^:]*/").expect("hard-coded regex"));

/// Which ARN prefix to strip to obtain the resource's short name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArnShape {
    /// Name sits behind a resource-type segment:
    /// `arn:aws:lambda:us-east-1:111111111111:function:orders-fn` → `orders-fn`.
    ThroughResourceType,
    /// Name is the whole resource part:
    /// `arn:aws:sns:us-east-1:111111111111:orders-topic` → `orders-topic`.
    ThroughAccount,
    /// Name follows the last `/`:
    /// `arn:aws:events:us-east-1:111111111111:rule/orders-rule` → `orders-rule`.
    ThroughLastSlash,
}

impl ArnShape {
    pub fn short_name(&self, arn: &str) -> String {
        let pattern = match self {
            ArnShape::ThroughResourceType => &THROUGH_RESOURCE_TYPE,
            ArnShape::ThroughAccount => &THROUGH_ACCOUNT,
            ArnShape::ThroughLastSlash => &THROUGH_LAST_SLASH,
        };
        pattern.replace(arn, "").into_owned()
    }
}
