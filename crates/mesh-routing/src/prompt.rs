//! Prompt sent to the inference provider for LLM-assisted routing.

use mesh_core::ChatTurn;

const SYSTEM_PROMPT: &str = "You route user queries to specialist agents. \
Choose one strategy:\n\
- SINGLE: one agent can answer the query alone.\n\
- PARALLEL: several agents answer independent parts of the query at the same time.\n\
- SEQUENTIAL: agents must run in order, each building on the previous answers.\n\
Only use agent IDs from the list provided. \
Respond with a single JSON object and nothing else:\n\
{\"strategy\": \"SINGLE|PARALLEL|SEQUENTIAL\", \"agents\": [\"agent_id\", ...], \
\"reasoning\": \"short explanation\", \"dependencies\": {\"agent_id\": [\"prerequisite_id\"]}}\n\
The dependencies field is optional.";

/// Build the routing conversation for `query` over the agents in `summary`
pub fn routing_prompt(query: &str, summary: &str) -> Vec<ChatTurn> {
    vec![
        ChatTurn::system(SYSTEM_PROMPT),
        ChatTurn::user(format!(
            "Available agents:\n\n{summary}\n\nUser query:\n{query}"
        )),
    ]
}
