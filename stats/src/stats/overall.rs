//! Input counting and the per-player summary ratios.

use serde::Serialize;
use slippi_replay::FIRST_PLAYABLE_FRAME;

use super::common::{self, PlayerIndexed, Ratio};
use super::conversions::{Conversion, OpeningType};
use super::stocks::Stock;
use crate::Game;

/// Button bits beyond the twelve physical digital buttons are console
/// flags, never a player input.
const DIGITAL_BUTTON_MASK: u16 = 0xFFF;

/// Stick deflection past this magnitude leaves the dead zone.
const STICK_REGION_THRESHOLD: f32 = 0.2875;

/// An analog trigger press past this point counts as an actuation.
const TRIGGER_THRESHOLD: f32 = 0.3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum JoystickRegion {
    DeadZone,
    NE,
    SE,
    SW,
    NW,
    N,
    E,
    S,
    W,
}

/// Summary statistics for one player against one opponent.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overall {
    pub player_index: u8,
    pub opponent_index: u8,

    pub input_count: u32,
    pub conversion_count: u32,
    pub total_damage: f32,
    pub kill_count: u32,

    pub successful_conversions: Ratio,
    pub inputs_per_minute: Ratio,
    pub openings_per_kill: Ratio,
    pub damage_per_opening: Ratio,
    pub neutral_win_ratio: Ratio,
    pub counter_hit_ratio: Ratio,
    pub beneficial_trade_ratio: Ratio,
}

pub(crate) fn generate(
    game: &Game<'_>,
    stocks: &[Stock],
    conversions: &[Conversion],
    playable_frame_count: i32,
) -> Vec<Overall> {
    let game_minutes = playable_frame_count as f32 / 3600.0;

    common::singles_pairings(game)
        .into_iter()
        .map(|indices| {
            let input_count = count_inputs(game, indices);

            let conversion_count = conversions.iter().filter(|c| c.player_index == indices.player_index).count();
            let successful_count = conversions
                .iter()
                .filter(|c| c.player_index == indices.player_index && c.moves.len() > 1)
                .count();

            let opponent_stocks: Vec<&Stock> =
                stocks.iter().filter(|s| s.player_index == indices.opponent_index).collect();
            let kill_count = opponent_stocks.iter().filter(|s| s.end_frame.is_some()).count();
            let total_damage: f32 = opponent_stocks.iter().map(|s| s.current_percent).sum();

            Overall {
                player_index: indices.player_index,
                opponent_index: indices.opponent_index,

                input_count,
                conversion_count: conversion_count as u32,
                total_damage,
                kill_count: kill_count as u32,

                successful_conversions: Ratio::new(successful_count as f32, conversion_count as f32),
                inputs_per_minute: Ratio::new(input_count as f32, game_minutes),
                openings_per_kill: Ratio::new(conversion_count as f32, kill_count as f32),
                damage_per_opening: Ratio::new(total_damage, conversion_count as f32),
                neutral_win_ratio: opening_ratio(conversions, indices, OpeningType::NeutralWin),
                counter_hit_ratio: opening_ratio(conversions, indices, OpeningType::CounterAttack),
                beneficial_trade_ratio: beneficial_trade_ratio(conversions, indices),
            }
        })
        .collect()
}

/// How often this player's punishes opened a given way, against the total
/// number of such openings by either player.
fn opening_ratio(conversions: &[Conversion], indices: PlayerIndexed, opening: OpeningType) -> Ratio {
    let player = count_openings(conversions, indices.player_index, opening);
    let opponent = count_openings(conversions, indices.opponent_index, opening);
    Ratio::new(player as f32, (player + opponent) as f32)
}

fn count_openings(conversions: &[Conversion], player_index: u8, opening: OpeningType) -> usize {
    conversions
        .iter()
        .filter(|c| c.player_index == player_index && c.opening_type == opening)
        .count()
}

/// Pairs up simultaneous trades and decides who came out ahead: a kill
/// without a reciprocal kill wins outright, otherwise the higher damage
/// dealt does.
fn beneficial_trade_ratio(conversions: &[Conversion], indices: PlayerIndexed) -> Ratio {
    let player_trades: Vec<&Conversion> = conversions
        .iter()
        .filter(|c| c.player_index == indices.player_index && c.opening_type == OpeningType::Trade)
        .collect();
    let opponent_trades: Vec<&Conversion> = conversions
        .iter()
        .filter(|c| c.player_index == indices.opponent_index && c.opening_type == OpeningType::Trade)
        .collect();

    let beneficial = player_trades
        .iter()
        .zip(opponent_trades.iter())
        .filter(|(player, opponent)| {
            if player.did_kill && !opponent.did_kill {
                return true;
            }
            let player_damage = player.current_percent - player.start_percent;
            let opponent_damage = opponent.current_percent - opponent.start_percent;
            player_damage > opponent_damage
        })
        .count();

    Ratio::new(beneficial as f32, player_trades.len() as f32)
}

/// Counts distinct controller inputs: rising-edge digital buttons, stick
/// and c-stick region changes, and analog trigger actuations. Nothing
/// before the playable boundary counts.
fn count_inputs(game: &Game<'_>, indices: PlayerIndexed) -> u32 {
    let frames = game.frames();
    let mut count: u32 = 0;

    for (&frame, entry) in frames {
        if frame < FIRST_PLAYABLE_FRAME {
            continue;
        }

        let Some(pre) = common::player_pre(entry, indices.player_index) else {
            continue;
        };
        let prev = common::prev_player_pre(frames, frame, indices.player_index);

        let current_buttons = pre.physical_buttons.unwrap_or(0);
        let previous_buttons = prev.and_then(|p| p.physical_buttons).unwrap_or(0);
        let pressed = !previous_buttons & current_buttons & DIGITAL_BUTTON_MASK;
        count += pressed.count_ones();

        // Stick movements count when they land in a new region, but
        // returning to the dead zone isn't an input.
        let stick = joystick_region(pre.joystick_x.unwrap_or(0.0), pre.joystick_y.unwrap_or(0.0));
        let prev_stick = joystick_region(
            prev.and_then(|p| p.joystick_x).unwrap_or(0.0),
            prev.and_then(|p| p.joystick_y).unwrap_or(0.0),
        );
        if stick != prev_stick && stick != JoystickRegion::DeadZone {
            count += 1;
        }

        let c_stick = joystick_region(pre.c_stick_x.unwrap_or(0.0), pre.c_stick_y.unwrap_or(0.0));
        let prev_c_stick = joystick_region(
            prev.and_then(|p| p.c_stick_x).unwrap_or(0.0),
            prev.and_then(|p| p.c_stick_y).unwrap_or(0.0),
        );
        if c_stick != prev_c_stick && c_stick != JoystickRegion::DeadZone {
            count += 1;
        }

        let l_trigger = pre.physical_l_trigger.unwrap_or(0.0);
        let prev_l_trigger = prev.and_then(|p| p.physical_l_trigger).unwrap_or(0.0);
        if prev_l_trigger < TRIGGER_THRESHOLD && l_trigger >= TRIGGER_THRESHOLD {
            count += 1;
        }

        let r_trigger = pre.physical_r_trigger.unwrap_or(0.0);
        let prev_r_trigger = prev.and_then(|p| p.physical_r_trigger).unwrap_or(0.0);
        if prev_r_trigger < TRIGGER_THRESHOLD && r_trigger >= TRIGGER_THRESHOLD {
            count += 1;
        }
    }

    count
}

/// Classifies a stick position into the dead zone or one of eight compass
/// octants. Corners win over cardinal directions.
fn joystick_region(x: f32, y: f32) -> JoystickRegion {
    use JoystickRegion::*;
    let t = STICK_REGION_THRESHOLD;

    if x >= t && y >= t {
        NE
    } else if x >= t && y <= -t {
        SE
    } else if x <= -t && y <= -t {
        SW
    } else if x <= -t && y >= t {
        NW
    } else if y >= t {
        N
    } else if x >= t {
        E
    } else if y <= -t {
        S
    } else if x <= -t {
        W
    } else {
        DeadZone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_mask_popcount_matches_the_pressed_set() {
        let previous: u16 = 0;
        let current: u16 = 0b1011_0000_0000;
        let pressed = !previous & current & DIGITAL_BUTTON_MASK;
        assert_eq!(pressed.count_ones(), 3);

        // Bits above the twelve digital buttons never count.
        let flags: u16 = 0b1010_0000_0000_0000;
        assert_eq!((!previous & flags & DIGITAL_BUTTON_MASK).count_ones(), 0);
    }

    #[test]
    fn held_buttons_do_not_recount() {
        let previous: u16 = 0b0001_0000_0001;
        let current: u16 = 0b0001_0000_0011;
        let pressed = !previous & current & DIGITAL_BUTTON_MASK;
        assert_eq!(pressed.count_ones(), 1);
    }

    #[test]
    fn stick_regions_classify_octants_and_dead_zone() {
        use JoystickRegion::*;

        assert_eq!(joystick_region(0.0, 0.0), DeadZone);
        assert_eq!(joystick_region(0.2, -0.2), DeadZone);
        assert_eq!(joystick_region(1.0, 0.0), E);
        assert_eq!(joystick_region(-1.0, 0.0), W);
        assert_eq!(joystick_region(0.0, 1.0), N);
        assert_eq!(joystick_region(0.0, -1.0), S);
        assert_eq!(joystick_region(0.5, 0.5), NE);
        assert_eq!(joystick_region(0.5, -0.5), SE);
        assert_eq!(joystick_region(-0.5, -0.5), SW);
        assert_eq!(joystick_region(-0.5, 0.5), NW);
    }
}
