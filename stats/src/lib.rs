//! Derives gameplay statistics from Slippi replay buffers.
//!
//! [`Game`] wraps a replay buffer and exposes memoized views over it:
//! starting settings, ordered per-frame player state, session metadata and
//! the derived statistics (stock history, punishes, combos, technique
//! counts, input ratios). Each view is the result of one full pass over
//! the event stream or the assembled frames; the first call to an accessor
//! runs the pass, every later call returns the cached result.
//!
//! The buffer itself is borrowed read-only and never copied, so one buffer
//! can back any number of concurrent sessions.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use slippi_replay::{GameEnd, Metadata, SlpFile};

mod frames;
pub use frames::{FrameData, FrameEntry, PlayerFrames};

mod settings;
pub use settings::GameSettings;

pub mod stats;
pub use stats::{ActionCounts, Combo, Conversion, MoveLanded, OpeningType, Overall, Ratio, Stats, Stock};

/// An analytics session over one replay buffer.
///
/// Derived collections are computed at most once and cached for the life
/// of the session. Each cache sits behind its own `OnceLock`, so racing
/// first calls to the same accessor still settle on a single result;
/// invalidation is dropping the session.
pub struct Game<'a> {
    file: SlpFile<'a>,
    settings: OnceLock<GameSettings>,
    frames: OnceLock<FrameData>,
    stats: OnceLock<Stats>,
    metadata: OnceLock<Metadata>,
}

impl<'a> Game<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            file: SlpFile::new(buf),
            settings: OnceLock::new(),
            frames: OnceLock::new(),
            stats: OnceLock::new(),
            metadata: OnceLock::new(),
        }
    }

    /// Starting configuration: stage, mode flags and the occupied player
    /// slots, with the Zelda/Sheik identity correction applied.
    pub fn settings(&self) -> &GameSettings {
        self.settings.get_or_init(|| settings::extract(&self.file))
    }

    /// Ordered per-frame, per-player state for primary characters.
    pub fn frames(&self) -> &BTreeMap<i32, FrameEntry> {
        &self.frame_data().players
    }

    /// Frames for companion characters (the Ice Climbers partner), keyed
    /// the same way as [`Game::frames`].
    pub fn follower_frames(&self) -> &BTreeMap<i32, FrameEntry> {
        &self.frame_data().followers
    }

    /// The end-of-session record, when the capture ran to completion.
    pub fn game_end(&self) -> Option<&GameEnd> {
        self.frame_data().game_end.as_ref()
    }

    /// Derived statistics. Later passes reference earlier ones, so this
    /// computes, in order: stocks, conversions, combos, action counts,
    /// frame totals, overall summaries.
    pub fn stats(&self) -> &Stats {
        self.stats.get_or_init(|| stats::generate(self))
    }

    /// Session metadata from the container's trailing region; empty when
    /// the region is missing or corrupt.
    pub fn metadata(&self) -> &Metadata {
        self.metadata.get_or_init(|| Metadata::parse(&self.file))
    }

    fn frame_data(&self) -> &FrameData {
        self.frames.get_or_init(|| frames::assemble(&self.file))
    }
}
