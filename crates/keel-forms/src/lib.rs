//! Form support for Keel
//!
//! Two halves: [`decode`] turns urlencoded payloads into typed structs with a
//! multi-entry error report, and [`fields`] builds HTML form controls carrying
//! Angular-style client validation metadata.

pub mod decode;
pub mod fields;
pub mod validators;

pub use decode::{DecodeEntry, DecodeReport, EntryKind};
pub use fields::{Control, Field, FormError, InputField, InputKind, SelectField, SubmitField, TextAreaField};
pub use validators::Validator;
