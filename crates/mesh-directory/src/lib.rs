//! # Mesh Directory
//!
//! Liveness-aware agent directory with embedding-based discovery.
//!
//! Agents register a descriptor; the directory embeds a text rendering of it
//! and stores descriptor and vector as two TTL-bounded records. Discovery
//! embeds the query and returns the nearest healthy agents. A
//! [`HeartbeatManager`] keeps a registration alive from the hosting process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod heartbeat;
pub mod similarity;
pub mod store;
pub mod summary;

pub use directory::Directory;
pub use heartbeat::{HeartbeatManager, HeartbeatTarget};
pub use similarity::cosine_similarity;
pub use store::{AgentStore, MemoryAgentStore, ScoredAgent};
pub use summary::{embedding_text, routing_summary, SUMMARY_SEPARATOR};
