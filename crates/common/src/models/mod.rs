//! Request-scoped data model
//!
//! Every type here is a value object: created when a request enters the
//! pipeline and dropped when the response is emitted.

pub mod analysis;
pub mod chat;
pub mod provider;
pub mod retrieval;

pub use analysis::AnalysisType;
pub use chat::{ChatRole, ChatTurn, ParsedAnswer};
pub use provider::{ApiKeys, ProviderKind, ProviderSelection, Task};
pub use retrieval::{Reference, RetrievedChunk};
