//! # Mesh Routing
//!
//! Turns a query and its ranked discovery results into a routing decision.
//!
//! - Zero candidates: SINGLE to the configured fallback agent
//! - One candidate: SINGLE to that agent
//! - Several candidates: rule-based top similarity, or LLM-assisted
//!   strategy selection when enabled, degrading to the rule-based choice on
//!   any inference or parse failure

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod parse;
pub mod prompt;

pub use engine::{RoutingEngine, FALLBACK_REASONING, RULE_BASED_REASONING};
pub use parse::{extract_json_object, parse_decision};
pub use prompt::routing_prompt;
