pub mod condenser;
pub mod engine;
pub mod generator;
pub mod memory;

pub use engine::{ConversationEngine, EngineResponse};
pub use memory::{ConversationMemory, Speaker, Turn};
