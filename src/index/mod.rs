pub mod retriever;
pub mod vector_index;

pub use retriever::{Passage, Retriever};
pub use vector_index::VectorIndex;
