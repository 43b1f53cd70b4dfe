pub mod cache;
pub mod config;
pub mod fallback;
pub mod fastpath;
pub mod memo;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod postprocess;
pub mod tasks;
pub mod tools;

pub use cache::PersistentTtlCache;
pub use config::ServiceConfig;
pub use model::{MediaType, Rating, Recommendation};
pub use orchestrator::{InvalidRequest, MediaCrew, RecommendationRequest};
