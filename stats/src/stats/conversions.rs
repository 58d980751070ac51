//! Punish detection: windows of consecutive damage against an opponent
//! who never made it back to neutral.

use serde::Serialize;

use super::common::{self, timers, MoveLanded};
use crate::Game;

/// How a punish began.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpeningType {
    NeutralWin,
    CounterAttack,
    Trade,
    Poke,
}

/// A punish window: every hit from the opening until the opponent held
/// control long enough to reset, or died.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub moves: Vec<MoveLanded>,
    pub opening_type: OpeningType,
    pub did_kill: bool,
}

pub(crate) fn generate(game: &Game<'_>) -> Vec<Conversion> {
    let frames = game.frames();
    let mut conversions = Vec::new();

    for indices in common::singles_pairings(game) {
        let mut open: Option<Conversion> = None;
        let mut reset_counter: u32 = 0;

        for (&frame, entry) in frames {
            let Some(attacker) = common::player_post(entry, indices.player_index) else {
                continue;
            };
            let Some(victim) = common::player_post(entry, indices.opponent_index) else {
                continue;
            };
            let prev_victim = common::prev_player_post(frames, frame, indices.opponent_index);

            let victim_state = victim.action_state_id.unwrap_or(0);
            let victim_in_control = common::is_in_control(victim_state);
            let took_damage = common::damage_taken(Some(victim), prev_victim) > 0.0;

            if open.is_none() && took_damage && !victim_in_control {
                reset_counter = 0;
                open = Some(Conversion {
                    player_index: indices.player_index,
                    opponent_index: indices.opponent_index,
                    start_frame: frame,
                    end_frame: None,
                    start_percent: prev_victim.and_then(|f| f.percent).unwrap_or(0.0),
                    current_percent: victim.percent.unwrap_or(0.0),
                    end_percent: None,
                    moves: Vec::new(),
                    opening_type: OpeningType::NeutralWin,
                    did_kill: false,
                });
            }

            let Some(conversion) = open.as_mut() else {
                continue;
            };

            if took_damage {
                common::record_hit(&mut conversion.moves, frame, attacker);
                reset_counter = 0;
            }

            let lost_stock = common::did_lose_stock(Some(victim), prev_victim);
            if !lost_stock {
                conversion.current_percent = victim.percent.unwrap_or(0.0);
            }

            // The reset timer only runs while the victim can actually act;
            // tumbling or flying off stage keeps the window open.
            if !took_damage && victim_in_control {
                reset_counter += 1;
            }

            if lost_stock || reset_counter > timers::PUNISH_RESET_FRAMES {
                conversion.did_kill = lost_stock;
                conversion.end_frame = Some(frame);
                conversion.end_percent = Some(prev_victim.and_then(|f| f.percent).unwrap_or(0.0));
                if let Some(done) = open.take() {
                    conversions.push(done);
                }
            }
        }

        // The capture ended mid-punish; report it without an end.
        if let Some(unfinished) = open {
            conversions.push(unfinished);
        }
    }

    classify_openings(game, &mut conversions);

    conversions
}

/// Lookback window, in frames, for deciding whether the victim had just
/// committed to an attack of their own when the punish opened.
const COUNTER_ATTACK_LOOKBACK: i32 = 5;

/// Assigns each punish its opening classification.
///
/// Trades come first: a pair of punishes in opposite directions with
/// overlapping damage windows means both players hit each other. A
/// counter-attack caught the victim mid-commitment. A poke is a lone hit
/// that neither killed nor grew into a string. Everything else won
/// neutral outright.
fn classify_openings(game: &Game<'_>, conversions: &mut [Conversion]) {
    let last_frame = common::last_frame(game);

    let windows: Vec<(u8, i32, i32)> = conversions
        .iter()
        .map(|c| (c.player_index, c.start_frame, c.end_frame.unwrap_or(last_frame)))
        .collect();

    for index in 0..conversions.len() {
        let (owner, start, end) = windows[index];
        let is_trade = windows
            .iter()
            .enumerate()
            .any(|(other, &(other_owner, other_start, other_end))| {
                other != index && other_owner != owner && start <= other_end && other_start <= end
            });

        let conversion = &mut conversions[index];
        conversion.opening_type = if is_trade {
            OpeningType::Trade
        } else if victim_was_attacking(game, conversion) {
            OpeningType::CounterAttack
        } else if conversion.moves.len() <= 1 && !conversion.did_kill {
            OpeningType::Poke
        } else {
            OpeningType::NeutralWin
        };
    }
}

fn victim_was_attacking(game: &Game<'_>, conversion: &Conversion) -> bool {
    let frames = game.frames();

    (1..=COUNTER_ATTACK_LOOKBACK).any(|lag| {
        let Some(frame) = conversion.start_frame.checked_sub(lag) else {
            return false;
        };
        frames
            .get(&frame)
            .and_then(|entry| common::player_post(entry, conversion.opponent_index))
            .and_then(|post| post.action_state_id)
            .is_some_and(common::is_attacking)
    })
}
