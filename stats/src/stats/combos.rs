//! Combo strings: the tightly-timed runs of hits inside a punish.
//!
//! A combo uses a stricter continuity rule than a punish: any stretch
//! where the opponent is actionable counts against the string, so one
//! punish window can fragment into several combos when a follow-up is
//! late or the opponent techs away.

use serde::Serialize;

use super::common::{self, timers, MoveLanded};
use crate::Game;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub moves: Vec<MoveLanded>,
    pub did_kill: bool,
}

pub(crate) fn generate(game: &Game<'_>) -> Vec<Combo> {
    let frames = game.frames();
    let mut combos = Vec::new();

    for indices in common::singles_pairings(game) {
        let mut open: Option<Combo> = None;
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
            let took_damage = common::damage_taken(Some(victim), prev_victim) > 0.0;

            if open.is_none() && took_damage && !common::is_in_control(victim_state) {
                reset_counter = 0;
                open = Some(Combo {
                    player_index: indices.player_index,
                    opponent_index: indices.opponent_index,
                    start_frame: frame,
                    end_frame: None,
                    start_percent: prev_victim.and_then(|f| f.percent).unwrap_or(0.0),
                    current_percent: victim.percent.unwrap_or(0.0),
                    end_percent: None,
                    moves: Vec::new(),
                    did_kill: false,
                });
            }

            let Some(combo) = open.as_mut() else {
                continue;
            };

            if took_damage {
                common::record_hit(&mut combo.moves, frame, attacker);
                reset_counter = 0;
            }

            let lost_stock = common::did_lose_stock(Some(victim), prev_victim);
            if !lost_stock {
                combo.current_percent = victim.percent.unwrap_or(0.0);
            }

            let in_hitstun = common::is_damaged(victim_state) || common::is_grabbed(victim_state);
            let recovering = common::is_teching(victim_state) || common::is_down(victim_state);
            let dying = common::is_dead(victim_state);

            if !took_damage && !in_hitstun && !dying {
                reset_counter += 1;
            }

            // A tech or knockdown buys the attacker a recovery window; an
            // actionable opponent ends the string on the shorter timer.
            let limit = if recovering {
                timers::RECOVERY_RESET_FRAMES
            } else {
                timers::COMBO_STRING_RESET_FRAMES
            };

            if lost_stock || reset_counter > limit {
                combo.did_kill = lost_stock;
                combo.end_frame = Some(frame);
                combo.end_percent = Some(prev_victim.and_then(|f| f.percent).unwrap_or(0.0));
                if let Some(done) = open.take() {
                    combos.push(done);
                }
            }
        }

        if let Some(unfinished) = open {
            combos.push(unfinished);
        }
    }

    combos
}
