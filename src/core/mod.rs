pub mod cache;
pub mod dedup;
pub mod notability;
pub mod orchestrator;

pub use dedup::{DedupConfig, deduplicate, deduplicate_with};
pub use notability::{Heritage, NotabilityFlags, calculate_notability_score};
pub use orchestrator::{Discovery, DiscoveryRequest, Orchestrator, OrchestratorConfig};
