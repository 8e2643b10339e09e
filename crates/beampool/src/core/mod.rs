//! # Worker Pool
//!
//! Fixed-size pool of long-lived decode workers fed from a single FIFO.
//!
//! ## Module Structure
//!
//! * [`handler`] - The [`RequestHandler`](handler::RequestHandler) seam a worker calls
//!   once per request.
//!
//! * [`pool`] - The worker loop and pool spawning. Workers share one dispatch
//!   receiver and one result sender; completion order is unconstrained.
//!
//! * [`worker`] - [`WorkerHandle`](worker::WorkerHandle), the orchestrator's owning
//!   handle used to stop workers unconditionally at the end of a run.
//!
pub mod handler;
pub mod pool;
pub mod worker;
