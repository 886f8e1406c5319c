pub mod agent_factory;
pub mod data_analyst_agent;
pub mod interface;
pub mod report_extractor;
pub mod stateless_llm_factory;

pub mod stateless_llm;

pub use agent_factory::*;
pub use data_analyst_agent::*;
pub use interface::*;
pub use stateless_llm::*;
pub use stateless_llm_factory::*;
