//! Concurrency primitives shared by the pipeline units.
//!
//! Units never share state directly. They talk through bounded queues and observe a single
//! broadcast [`shutdown`] signal. The first failure of a run is captured by [`abort::RunAbort`],
//! which also fires the shutdown signal so every other unit stops at its next suspension point.

pub mod abort;
pub mod shutdown;
