pub mod claude_llm;
pub mod ollama_llm;
pub mod openai_compatible_llm;
pub mod stateless_llm_interface;

pub use claude_llm::*;
pub use ollama_llm::*;
pub use openai_compatible_llm::*;
pub use stateless_llm_interface::*;
