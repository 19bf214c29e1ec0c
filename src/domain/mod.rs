// Domain layer - Pure types and invariants of the timeline engine
pub mod channel;
pub mod dataset;
pub mod error;
pub mod sample;
pub mod scale;
pub mod viewport;
