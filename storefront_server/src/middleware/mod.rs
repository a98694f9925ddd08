mod admin;
mod signature;

pub use admin::{AdminMiddlewareFactory, AdminMiddlewareService};
pub use signature::{SignatureMiddlewareFactory, SignatureMiddlewareService, SIGNATURE_HEADER};
