//! Statistics passes over the assembled frames.
//!
//! Each pass replays the frames in order and folds them into a freshly
//! built collection; nothing mutates state shared between passes. Pass
//! order matters only for the overall summary, which reads the stock and
//! conversion collections produced before it.

use serde::Serialize;
use slippi_replay::FIRST_PLAYABLE_FRAME;

use crate::Game;

mod common;
pub use common::{MoveLanded, PlayerIndexed, Ratio};

mod stocks;
pub use stocks::Stock;

mod conversions;
pub use conversions::{Conversion, OpeningType};

mod combos;
pub use combos::Combo;

mod actions;
pub use actions::ActionCounts;

mod overall;
pub use overall::Overall;

/// Everything derived from one full statistics run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub last_frame: i32,
    pub playable_frame_count: i32,
    pub stocks: Vec<Stock>,
    pub conversions: Vec<Conversion>,
    pub combos: Vec<Combo>,
    pub action_counts: Vec<ActionCounts>,
    pub overall: Vec<Overall>,
}

pub(crate) fn generate(game: &Game<'_>) -> Stats {
    let stocks = stocks::generate(game);
    let conversions = conversions::generate(game);
    let combos = combos::generate(game);
    let action_counts = actions::generate(game);

    let last_frame = common::last_frame(game);
    let playable_frame_count = last_frame + FIRST_PLAYABLE_FRAME.abs();

    let overall = overall::generate(game, &stocks, &conversions, playable_frame_count);

    tracing::debug!(
        last_frame,
        stocks = stocks.len(),
        conversions = conversions.len(),
        combos = combos.len(),
        "Derived statistics"
    );

    Stats {
        last_frame,
        playable_frame_count,
        stocks,
        conversions,
        combos,
        action_counts,
        overall,
    }
}
