//! Text renderings of descriptors: the embedding input and the routing prompt block.

use mesh_core::AgentDescriptor;

/// Example queries folded into the embedding text
const EMBEDDED_EXAMPLES: usize = 3;

/// Example queries listed per agent in a routing summary
const SUMMARY_EXAMPLES: usize = 3;

/// Separator between agent blocks in a routing summary
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Text embedded at registration time.
///
/// Name, description, capabilities, domains and the first few example
/// queries, one per line; empty parts are omitted.
#[must_use]
pub fn embedding_text(descriptor: &AgentDescriptor) -> String {
    let mut parts = vec![descriptor.name.clone()];

    if !descriptor.description.is_empty() {
        parts.push(descriptor.description.clone());
    }
    if !descriptor.capabilities.is_empty() {
        parts.push(format!("Capabilities: {}", descriptor.capabilities.join(", ")));
    }
    if !descriptor.domains.is_empty() {
        parts.push(format!("Domains: {}", descriptor.domains.join(", ")));
    }
    parts.extend(
        descriptor
            .example_queries
            .iter()
            .take(EMBEDDED_EXAMPLES)
            .cloned(),
    );

    parts.join("\n")
}

/// One agent block of a routing summary
#[must_use]
pub fn agent_summary(descriptor: &AgentDescriptor) -> String {
    let mut block = format!(
        "Agent: {} (ID: {})\nDescription: {}\nCapabilities: {}",
        descriptor.name,
        descriptor.agent_id,
        descriptor.description,
        descriptor.capabilities.join(", ")
    );

    if !descriptor.example_queries.is_empty() {
        block.push_str("\nExample queries:");
        for query in descriptor.example_queries.iter().take(SUMMARY_EXAMPLES) {
            block.push_str("\n- ");
            block.push_str(query);
        }
    }

    block
}

/// Human-readable summary of `descriptors` for an LLM routing prompt
#[must_use]
pub fn routing_summary(descriptors: &[AgentDescriptor]) -> String {
    descriptors
        .iter()
        .map(agent_summary)
        .collect::<Vec<_>>()
        .join(SUMMARY_SEPARATOR)
}
