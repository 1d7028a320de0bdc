//! Core types for Keel
//!
//! The failure taxonomy shared by every layer: [`AppError`] carries an
//! HTTP-visible classification, [`Failure`] is what handlers return, and
//! [`RequestMeta`] is the request snapshot handed to the notifier.

mod error;
mod meta;

pub use error::{AppError, Failure};
pub use meta::RequestMeta;
