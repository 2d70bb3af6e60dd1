// Resume customization engine.
// Pipeline: tech-stack parsing → project section location → round-robin distribution
// → format-preserving bullet insertion. Every stage is a pure function of its inputs;
// the only shared object is the read-only `EngineConfig`.

pub mod bulk;
pub mod distributor;
pub mod handlers;
pub mod locator;
pub mod processor;
pub mod tech_stack;
pub mod upload;
pub mod writer;
