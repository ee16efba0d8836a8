pub mod classifier;
pub mod features;
pub mod orchestrator;
pub mod reasoning;
