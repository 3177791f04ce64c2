//! HTTP handlers for the SSO service.

mod discourse;
mod health;
mod metrics;
mod router;


pub use discourse::{INBOUND_REJECTED_DETAIL, LOGIN_REJECTED_DETAIL};
pub use router::{create_router, AppState};
