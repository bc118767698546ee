//! Chat platform adapter
//!
//! `RestPlatform` implements the `ChatPlatform` port over the platform's
//! v10 REST API. Wire shapes live in `payload`.

mod payload;
mod rest;

pub use payload::{ChannelBody, MessageBody};
pub use rest::RestPlatform;
