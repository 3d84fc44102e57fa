//! Protocol modules.
//!
//! - `envelope`: the message unit exchanged in both directions.
//! - `text`: one JSON object per text frame.
//!
//! Decoding is panic-free: malformed input is reported as `ClientError`
//! instead of panicking, so a misbehaving server cannot take the client down.

pub mod envelope;
pub mod text;
