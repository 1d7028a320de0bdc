//! Request dispatch for Keel applications
//!
//! The layer between a router and application code: [`AppService`] adapts a
//! fallible [`Handler`] into a tower `Service`, builds a [`RequestContext`]
//! per request, recovers panics, classifies failures, and routes them through
//! the registered [`recovery`] handlers with guaranteed logging and
//! notification.

mod app;
mod context;
mod handler;
pub mod recovery;

pub use app::{AppService, AppState, AppStateBuilder};
pub use context::{RequestContext, ResponseWriter};
pub use handler::{Handler, HandlerFn, handler_fn};
pub use recovery::RecoveryHandlers;
