//! Parsing and validation of LLM-produced routing decisions.

use mesh_core::{AgentDescriptor, MeshError, MeshResult, RoutingDecision, RoutingStrategy};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Reasoning recorded when the model supplies none
const DEFAULT_LLM_REASONING: &str = "llm-selected";

/// Loose shape accepted from the model before validation
#[derive(Debug, Deserialize)]
struct RawDecision {
    strategy: String,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    dependencies: Option<HashMap<String, Vec<String>>>,
}

/// Find the first balanced `{...}` object in `s`.
///
/// Braces inside JSON strings (including escaped quotes) are ignored, so
/// prose or a fenced code block around the object is tolerated.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    None
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Parse a model completion into a validated decision.
///
/// The agent list must be non-empty and reference only `candidates`;
/// duplicates are dropped keeping first occurrence. Dependencies, when
/// present, may only mention agents in the decision.
///
/// # Errors
/// Returns [`MeshError::DecisionParse`] describing the first problem found
pub fn parse_decision(
    raw: &str,
    candidates: &[AgentDescriptor],
    max_reasoning_chars: usize,
) -> MeshResult<RoutingDecision> {
    let object = extract_json_object(raw)
        .ok_or_else(|| MeshError::decision_parse("no JSON object in completion"))?;

    let parsed: RawDecision = serde_json::from_str(object)
        .map_err(|e| MeshError::decision_parse(format!("invalid decision JSON: {e}")))?;

    let strategy: RoutingStrategy = parsed.strategy.parse().map_err(MeshError::decision_parse)?;

    let known: HashSet<&str> = candidates.iter().map(|d| d.agent_id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut agents = Vec::with_capacity(parsed.agents.len());
    for agent_id in parsed.agents {
        let agent_id = agent_id.trim().to_string();
        if !known.contains(agent_id.as_str()) {
            return Err(MeshError::decision_parse(format!(
                "agent '{agent_id}' was not among the discovered agents"
            )));
        }
        if seen.insert(agent_id.clone()) {
            agents.push(agent_id);
        }
    }
    if agents.is_empty() {
        return Err(MeshError::decision_parse("decision names no agents"));
    }

    if let Some(dependencies) = &parsed.dependencies {
        for (agent_id, prerequisites) in dependencies {
            if let Some(unknown) = std::iter::once(agent_id)
                .chain(prerequisites)
                .find(|id| !seen.contains(id.as_str()))
            {
                return Err(MeshError::decision_parse(format!(
                    "dependency references agent '{unknown}' outside the decision"
                )));
            }
        }
    }

    let reasoning = parsed
        .reasoning
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_LLM_REASONING.to_string());

    Ok(RoutingDecision {
        strategy,
        agents,
        reasoning: truncate_chars(&reasoning, max_reasoning_chars),
        dependencies: parsed.dependencies,
    })
}
