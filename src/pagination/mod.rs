//! Interactive table views: the pure session state machine and the Discord controller that drives it.

pub mod controller;
pub mod session;

pub use controller::{attach, build_components};
pub use session::PaginationSession;
