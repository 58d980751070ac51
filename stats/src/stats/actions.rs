//! Technique counting from short animation histories.

use serde::Serialize;

use super::common::{self, states};
use crate::Game;

/// Discrete technique counts for one player.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    pub player_index: u8,
    pub opponent_index: u8,
    pub wavedash_count: u32,
    pub waveland_count: u32,
    pub air_dodge_count: u32,
    pub dash_dance_count: u32,
    pub spot_dodge_count: u32,
    pub roll_count: u32,
}

/// Frame pattern that indicates a dash-dance turnaround was executed.
const DASH_DANCE: [u16; 3] = [states::DASH, states::TURN, states::DASH];

/// How many trailing animation ids we keep. Eight frames is enough to
/// cover a wavedash input chain.
const HISTORY_LEN: usize = 8;

pub(crate) fn generate(game: &Game<'_>) -> Vec<ActionCounts> {
    let frames = game.frames();
    let mut all_counts = Vec::new();

    for indices in common::singles_pairings(game) {
        let mut counts = ActionCounts {
            player_index: indices.player_index,
            opponent_index: indices.opponent_index,
            ..Default::default()
        };
        let mut history: Vec<u16> = Vec::new();

        for entry in frames.values() {
            let Some(current) = common::player_post(entry, indices.player_index).and_then(|post| post.action_state_id)
            else {
                continue;
            };

            let previous = history.last().copied();
            history.push(current);
            if history.len() > HISTORY_LEN {
                history.remove(0);
            }

            if history.ends_with(&DASH_DANCE) {
                counts.dash_dance_count += 1;
            }

            if did_enter(current, previous, is_roll) {
                counts.roll_count += 1;
            }
            if did_enter(current, previous, |state| state == states::SPOT_DODGE) {
                counts.spot_dodge_count += 1;
            }
            if did_enter(current, previous, |state| state == states::AIR_DODGE) {
                counts.air_dodge_count += 1;
            }

            detect_wavedash(&mut counts, &history);
        }

        all_counts.push(counts);
    }

    all_counts
}

fn is_roll(state: u16) -> bool {
    state == states::ROLL_FORWARD || state == states::ROLL_BACKWARD
}

/// A counter only ticks on the frame the player transitions into the
/// animation, not on every frame spent inside it.
fn did_enter(current: u16, previous: Option<u16>, target: impl Fn(u16) -> bool) -> bool {
    target(current) && !previous.is_some_and(|state| target(state))
}

/// Wavedash/waveland detection. A special landing right out of an air
/// dodge (or a controlled jump) is a wavedash when a jump-squat started
/// inside the recent window, otherwise a waveland. An air dodge consumed
/// this way is removed from the standalone air-dodge count.
fn detect_wavedash(counts: &mut ActionCounts, history: &[u16]) {
    let [.., previous, current] = history else {
        return;
    };
    if *current != states::LANDING_FALL_SPECIAL || !is_wavedash_initiation(*previous) {
        return;
    }

    // The air-dodge animation is long. If it's the only thing in the
    // window besides the landing itself, this was a stale air dodge
    // drifting to the ground, not a wavedash input.
    let mut distinct = history.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    let saw_air_dodge = distinct.contains(&states::AIR_DODGE);
    if distinct.len() == 2 && saw_air_dodge {
        return;
    }

    if saw_air_dodge {
        counts.air_dodge_count = counts.air_dodge_count.saturating_sub(1);
    }

    if history.contains(&states::KNEE_BEND) {
        counts.wavedash_count += 1;
    } else {
        counts.waveland_count += 1;
    }
}

fn is_wavedash_initiation(state: u16) -> bool {
    state == states::AIR_DODGE || (states::CONTROLLED_JUMP_START..=states::CONTROLLED_JUMP_END).contains(&state)
}
