use serde_json::{json, Value};

use crate::strategy::{StrategyCandidate, StrategyKind};

const API_PROVIDERS: &[&str] = &["deepseek", "anthropic", "openai"];
const HTTP_TOOLS: &[&str] = &["httpx", "curl", "wget", "requests"];
const QUERY_APPROACHES: &[&str] = &["direct_api", "web_search", "cache_lookup", "fallback_data"];

fn context_cost(context: &Value) -> f64 {
    context.get("cost").and_then(Value::as_f64).unwrap_or(0.01)
}

/// Template-driven variants, gated on whether `operation` contains one of
/// the template's applicable-operation substrings.
pub fn template_variants(operation: &str, context: &Value) -> Vec<StrategyCandidate> {
    let mut out = Vec::new();
    let cost = context_cost(context);

    if ["llm_request", "api_call"].iter().any(|p| operation.contains(p)) {
        for provider in API_PROVIDERS {
            out.push(StrategyCandidate::new(
                format!("provider_{provider}"),
                StrategyKind::ApiProvider,
                format!("Use {} API provider", capitalize(provider)),
                1.0,
                cost,
                json!({ "provider": provider }),
            ));
        }
    }

    if ["http_request", "fetch_url"].iter().any(|p| operation.contains(p)) {
        for tool in HTTP_TOOLS {
            out.push(StrategyCandidate::new(
                format!("http_tool_{tool}"),
                StrategyKind::ToolAlternative,
                format!("Use {tool} for HTTP request"),
                0.9,
                0.0,
                json!({ "tool": tool }),
            ));
        }
    }

    if ["data_retrieval", "search", "query"].iter().any(|p| operation.contains(p)) {
        for approach in QUERY_APPROACHES {
            out.push(StrategyCandidate::new(
                format!("approach_{approach}"),
                StrategyKind::ApproachVariation,
                format!("Use {} approach", approach.replace('_', " ")),
                0.8,
                cost * 0.8,
                json!({ "approach": approach }),
            ));
        }
    }

    out
}

/// Ad-hoc, operation-specific variations not backed by a template.
pub fn custom_variants(operation: &str, context: &Value) -> Vec<StrategyCandidate> {
    let mut out = Vec::new();
    let cost = context_cost(context);

    if operation.contains("http") || operation.contains("fetch") {
        out.push(StrategyCandidate::new(
            "http_with_retry_headers",
            StrategyKind::ParameterVariation,
            "Add retry-friendly headers",
            0.85,
            0.0,
            json!({ "modification": "add_headers" }),
        ));
        out.push(StrategyCandidate::new(
            "http_with_longer_timeout",
            StrategyKind::ParameterVariation,
            "Increase timeout duration",
            0.80,
            0.0,
            json!({ "modification": "increase_timeout" }),
        ));
    }

    if operation.contains("llm") || operation.contains("ai") {
        out.push(StrategyCandidate::new(
            "llm_with_simpler_prompt",
            StrategyKind::ParameterVariation,
            "Simplify prompt for better success rate",
            0.75,
            cost * 0.7,
            json!({ "modification": "simplify_prompt" }),
        ));
    }

    if operation.contains("file") || operation.contains("read") || operation.contains("write") {
        out.push(StrategyCandidate::new(
            "file_with_chunks",
            StrategyKind::ApproachVariation,
            "Process file in chunks",
            0.85,
            0.0,
            json!({ "modification": "chunked_processing" }),
        ));
    }

    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_operation_yields_tool_variants() {
        let variants = template_variants("http_request", &json!({}));
        assert_eq!(variants.len(), HTTP_TOOLS.len());
        assert!(variants.iter().all(|v| v.cost_estimate == 0.0));
    }

    #[test]
    fn unrelated_operation_yields_no_template_variants() {
        assert!(template_variants("database_write", &json!({})).is_empty());
    }

    #[test]
    fn custom_variants_stack_with_matching_substrings() {
        let variants = custom_variants("llm_api_call", &json!({ "cost": 0.02 }));
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name, "llm_with_simpler_prompt");
    }
}
