//! Decoding for the Slippi (`.slp`) replay container.
//!
//! A replay is a single immutable byte buffer captured during a match. The
//! buffer holds a raw event stream (densely packed, fixed-offset records
//! prefixed by a one-byte command) and, in the current container form, a
//! trailing self-describing metadata region. This crate turns that buffer
//! into typed records without ever copying or mutating it.
//!
//! Corrupt and truncated captures are the norm rather than the exception
//! (crashed consoles, severed transfers), so nothing in here treats a short
//! read as fatal: individual fields decode to `None`, a severed container
//! falls back to scanning whatever bytes remain, and a failed metadata
//! decode yields an empty result.

pub mod events;
pub mod file;
pub mod metadata;
pub mod reader;
pub mod text;
pub mod ubjson;

pub use events::{
    Command, ControllerFix, Event, GameEnd, GameEndMethod, GameStart, Player, PlayerType, PostFrameUpdate,
    PreFrameUpdate, FIRST_FRAME, FIRST_PLAYABLE_FRAME,
};
pub use file::SlpFile;
pub use metadata::{Metadata, PlayerMetadata};
pub use ubjson::UbjsonError;
