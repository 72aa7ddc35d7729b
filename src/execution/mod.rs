//! Swap execution orchestration

pub mod orchestrator;

pub use orchestrator::ExecutionOrchestrator;
