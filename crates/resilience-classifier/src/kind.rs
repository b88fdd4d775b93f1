use std::time::Duration;

/// Closed nine-value enumeration of failure categories.
///
/// Assigned by inspecting a failure's message and type-name strings; never
/// constructed any other way, so the set is stable across the whole crate
/// graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    Network,
    Authentication,
    RateLimit,
    ServerError,
    ClientError,
    LogicError,
    DataError,
    ResourceExhausted,
    Unknown,
}

impl ErrorKind {
    /// All nine variants, in the order rules are evaluated.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::ServerError,
        ErrorKind::Network,
        ErrorKind::Authentication,
        ErrorKind::RateLimit,
        ErrorKind::ClientError,
        ErrorKind::ResourceExhausted,
        ErrorKind::DataError,
        ErrorKind::LogicError,
        ErrorKind::Unknown,
    ];

    /// Short machine-readable tag, used as a map key and in recorded rows.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::ServerError => "server_error",
            ErrorKind::ClientError => "client_error",
            ErrorKind::LogicError => "logic_error",
            ErrorKind::DataError => "data_error",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a failure of this kind should ever be retried. See the
    /// retryable set in the data model: `{Network, ServerError, RateLimit,
    /// ResourceExhausted, Unknown}`.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::ServerError
                | ErrorKind::RateLimit
                | ErrorKind::ResourceExhausted
                | ErrorKind::Unknown
        )
    }

    /// `RateLimit` enforces a minimum next-delay floor regardless of the
    /// backoff schedule; every other kind leaves the schedule untouched.
    pub fn retry_delay_floor(self) -> Option<Duration> {
        match self {
            ErrorKind::RateLimit => Some(Duration::from_secs(10)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure function over a failure's message and type-name strings.
///
/// Decision order is significant — rules 1 and 6 both match 5xx-style
/// tokens (once numeric, once phrase); this is preserved verbatim per the
/// design notes rather than folded, since the two forms can appear
/// independently in a message.
pub fn classify(message: &str, type_name: &str) -> ErrorKind {
    let msg = message.to_lowercase();
    let ty = type_name.to_lowercase();

    const SERVER_ERROR_TOKENS: &[&str] = &[
        "500",
        "502",
        "503",
        "504",
        "internal server error",
        "bad gateway",
        "service unavailable",
        "gateway timeout",
    ];
    const NETWORK_TOKENS: &[&str] = &["connection", "timeout", "dns", "network", "unreachable"];
    const AUTH_TOKENS: &[&str] = &["auth", "unauthorized", "forbidden", "permission", "api key"];
    const RATE_LIMIT_TOKENS: &[&str] = &["rate limit", "too many requests", "429", "quota"];
    const CLIENT_ERROR_TOKENS: &[&str] = &["400", "404", "422", "bad request", "not found", "invalid"];
    const RESOURCE_TOKENS: &[&str] = &["memory", "disk", "space", "resource"];
    const DATA_ERROR_TYPE_TOKENS: &[&str] = &["parse", "json", "decode", "value", "type"];
    const LOGIC_ERROR_TYPE_TOKENS: &[&str] = &["assert", "attribute", "key", "index"];

    if any_contains(&msg, SERVER_ERROR_TOKENS) {
        return ErrorKind::ServerError;
    }
    if any_contains(&msg, NETWORK_TOKENS) {
        return ErrorKind::Network;
    }
    if any_contains(&msg, AUTH_TOKENS) {
        return ErrorKind::Authentication;
    }
    if any_contains(&msg, RATE_LIMIT_TOKENS) {
        return ErrorKind::RateLimit;
    }
    if any_contains(&msg, CLIENT_ERROR_TOKENS) {
        return ErrorKind::ClientError;
    }
    if any_contains(&msg, RESOURCE_TOKENS) {
        return ErrorKind::ResourceExhausted;
    }
    if any_contains(&ty, DATA_ERROR_TYPE_TOKENS) {
        return ErrorKind::DataError;
    }
    if any_contains(&ty, LOGIC_ERROR_TYPE_TOKENS) {
        return ErrorKind::LogicError;
    }
    ErrorKind::Unknown
}

fn any_contains(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(t))
}
