#![deny(unsafe_code)]

//! Streaming conversation state engine.
//!
//! This crate owns the ordered message log of one chat session and the
//! single-flight send cycle against a [`ModelService`]: append the user
//! message and an empty model placeholder, consume the service's chunk
//! stream, patch the placeholder on every chunk, then finalize or mark it
//! errored. Presentation is out of scope; consumers read state through
//! [`SessionViewer`] and re-render whenever the revision counter changes.

pub mod error;
pub mod ids;
pub mod log;
pub mod message;
pub mod service;
pub mod session;

pub use error::{LogError, LogResult};
pub use ids::MessageId;
pub use log::MessageLog;
pub use message::{Message, Role};
pub use service::{
    BoxFuture, ModelService, ReplyEvent, ReplyStream, ReplyStreamHandle, ServiceError,
    ServiceResult, ServiceWorker, make_reply_stream,
};
pub use session::{ChatSession, REPLY_ERROR_TEXT, SessionViewer};
