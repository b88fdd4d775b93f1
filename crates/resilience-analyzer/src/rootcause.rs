use resilience_classifier::ErrorKind;

use crate::failure::RootCause;

/// Fixed table keyed by the modal [`ErrorKind`] of a failure window.
///
/// Confidence values mirror the source analyzer's hand-tuned estimates;
/// they are not derived from any observed data.
pub fn lookup(kind: ErrorKind) -> Option<RootCause> {
    let (cause_tag, description, suggested_action, confidence) = match kind {
        ErrorKind::Network => (
            "network_connectivity",
            "Network connectivity issues or service unreachable",
            "Check network connection, try alternative endpoints, or wait for service recovery",
            0.9,
        ),
        ErrorKind::Authentication => (
            "authentication",
            "Authentication credentials invalid or expired",
            "Verify API key, check permissions, or refresh credentials",
            0.95,
        ),
        ErrorKind::RateLimit => (
            "rate_limiting",
            "API rate limit exceeded",
            "Implement exponential backoff, reduce request rate, or upgrade API plan",
            0.95,
        ),
        ErrorKind::ServerError => (
            "server_issues",
            "Remote server experiencing errors",
            "Wait for server recovery, try alternative providers, or implement fallback",
            0.85,
        ),
        ErrorKind::ClientError => (
            "invalid_request",
            "Request is malformed or invalid",
            "Validate request parameters, check API documentation, or adjust input format",
            0.9,
        ),
        ErrorKind::DataError => (
            "data_validation",
            "Data parsing or validation failed",
            "Verify data format, implement robust parsing, or sanitize inputs",
            0.85,
        ),
        ErrorKind::LogicError => (
            "code_logic",
            "Logic error in implementation",
            "Review code logic, fix algorithm, or adjust business rules",
            0.8,
        ),
        ErrorKind::ResourceExhausted => (
            "resource_limits",
            "System resource limits exceeded",
            "Optimize resource usage, increase limits, or implement batching",
            0.9,
        ),
        ErrorKind::Unknown => return None,
    };

    Some(RootCause {
        cause_tag,
        description,
        suggested_action,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_has_no_root_cause() {
        assert!(lookup(ErrorKind::Unknown).is_none());
    }

    #[test]
    fn network_maps_to_connectivity() {
        let cause = lookup(ErrorKind::Network).unwrap();
        assert_eq!(cause.cause_tag, "network_connectivity");
        assert!((cause.confidence - 0.9).abs() < f64::EPSILON);
    }
}
