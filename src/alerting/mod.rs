pub mod accumulator;

pub use accumulator::{FailureAccumulator, FailureRecord};
