//! Parsing of the orchestrator's routing reply.

use crate::state::Intent;
use serde::Deserialize;

/// Routing decision as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Orchestration {
    pub intent: Intent,
    #[serde(default)]
    pub processed_query: String,
}

/// Pull the JSON payload out of a reply that may be fenced or wrapped in
/// prose.
fn json_payload(reply: &str) -> &str {
    if let Some(start) = reply.find("```json") {
        let rest = &reply[start + "```json".len()..];
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    if let Some(start) = reply.find("```") {
        let rest = &reply[start + 3..];
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => reply.trim(),
    }
}

/// Parse the orchestrator reply. Unknown intents, missing fields and
/// non-JSON replies are all errors.
pub fn parse_orchestration(reply: &str) -> Result<Orchestration, serde_json::Error> {
    serde_json::from_str(json_payload(reply))
}
