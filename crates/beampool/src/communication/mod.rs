mod pill;
mod request;
mod response;

pub(crate) use pill::FailureGuard;
pub use request::{Payload, PayloadEntry, Request};
pub use response::{Alignment, Response, WorkerResult};
