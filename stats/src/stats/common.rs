//! Shared plumbing for the statistics passes: action-state predicates,
//! timer constants and frame lookups.

use std::collections::BTreeMap;

use serde::Serialize;
use slippi_replay::{PostFrameUpdate, PreFrameUpdate, FIRST_FRAME};

use crate::{FrameEntry, Game};

/// Engine action-state ids referenced by the passes. Ranges are inclusive
/// unless a predicate says otherwise.
pub(crate) mod states {
    pub const DAMAGE_START: u16 = 0x4B;
    pub const DAMAGE_END: u16 = 0x5B;
    pub const CAPTURE_START: u16 = 0xDF;
    pub const CAPTURE_END: u16 = 0xE8;
    pub const GROUNDED_CONTROL_START: u16 = 0x0E;
    pub const GROUNDED_CONTROL_END: u16 = 0x18;
    pub const SQUAT_START: u16 = 0x27;
    pub const SQUAT_END: u16 = 0x29;
    pub const DOWN_START: u16 = 0xB7;
    pub const DOWN_END: u16 = 0xC6;
    pub const TECH_START: u16 = 0xC7;
    pub const TECH_END: u16 = 0xCC;
    pub const DYING_END: u16 = 0x0A;
    pub const CONTROLLED_JUMP_START: u16 = 0x18;
    pub const CONTROLLED_JUMP_END: u16 = 0x22;
    pub const GROUND_ATTACK_START: u16 = 0x2C;
    pub const GROUND_ATTACK_END: u16 = 0x40;

    pub const ROLL_FORWARD: u16 = 0xE9;
    pub const ROLL_BACKWARD: u16 = 0xEA;
    pub const SPOT_DODGE: u16 = 0xEB;
    pub const AIR_DODGE: u16 = 0xEC;
    pub const KNEE_BEND: u16 = 0x18;
    pub const DASH: u16 = 0x14;
    pub const TURN: u16 = 0x12;
    pub const LANDING_FALL_SPECIAL: u16 = 0x2B;
    pub const GRAB: u16 = 0xD4;
}

/// Reset timers, in frames.
pub(crate) mod timers {
    pub const PUNISH_RESET_FRAMES: u32 = 45;
    pub const RECOVERY_RESET_FRAMES: u32 = 45;
    pub const COMBO_STRING_RESET_FRAMES: u32 = 45;
}

/// A player/opponent pairing for one statistics pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlayerIndexed {
    pub player_index: u8,
    pub opponent_index: u8,
}

/// One hit landed inside a punish or combo.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLanded {
    pub frame: i32,
    pub move_id: u8,
    pub hit_count: u8,
}

/// A count/total pair whose ratio is absent (never zero or NaN) when the
/// total is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Ratio {
    pub count: f32,
    pub total: f32,
    pub ratio: Option<f32>,
}

impl Ratio {
    pub(crate) fn new(count: f32, total: f32) -> Self {
        let ratio = (total != 0.0).then(|| count / total);
        Self { count, total, ratio }
    }
}

pub(crate) fn is_damaged(state: u16) -> bool {
    (states::DAMAGE_START..=states::DAMAGE_END).contains(&state)
}

pub(crate) fn is_grabbed(state: u16) -> bool {
    (states::CAPTURE_START..=states::CAPTURE_END).contains(&state)
}

pub(crate) fn is_teching(state: u16) -> bool {
    (states::TECH_START..=states::TECH_END).contains(&state)
}

pub(crate) fn is_down(state: u16) -> bool {
    (states::DOWN_START..=states::DOWN_END).contains(&state)
}

/// Dying and respawning animations occupy the bottom of the id space.
pub(crate) fn is_dead(state: u16) -> bool {
    state <= states::DYING_END
}

/// Whether the player can act: grounded control, crouching, a ground
/// attack they chose to throw, or holding a grab.
pub(crate) fn is_in_control(state: u16) -> bool {
    let ground = (states::GROUNDED_CONTROL_START..=states::GROUNDED_CONTROL_END).contains(&state);
    let squat = (states::SQUAT_START..=states::SQUAT_END).contains(&state);
    let ground_attack = state > states::GROUND_ATTACK_START && state <= states::GROUND_ATTACK_END;
    ground || squat || ground_attack || state == states::GRAB
}

/// Whether the player is committed to an attack of their own.
pub(crate) fn is_attacking(state: u16) -> bool {
    (states::GROUND_ATTACK_START..=states::GROUND_ATTACK_END).contains(&state) || state == states::GRAB
}

/// A stock was lost when the remaining-stock counter strictly decreased.
/// An absent counter on either side reads as "no change" so truncated
/// frames can't fabricate a death.
pub(crate) fn did_lose_stock(frame: Option<&PostFrameUpdate>, prev: Option<&PostFrameUpdate>) -> bool {
    let (Some(current), Some(previous)) = (
        frame.and_then(|f| f.stocks_remaining),
        prev.and_then(|f| f.stocks_remaining),
    ) else {
        return false;
    };

    current < previous
}

/// Percent gained since the previous frame; absent percents read as zero.
pub(crate) fn damage_taken(frame: Option<&PostFrameUpdate>, prev: Option<&PostFrameUpdate>) -> f32 {
    let percent = frame.and_then(|f| f.percent).unwrap_or(0.0);
    let previous = prev.and_then(|f| f.percent).unwrap_or(0.0);
    percent - previous
}

/// Appends a hit to a move list: a damage tick reporting the same attack
/// id extends the previous hit (multi-hit moves report one id across all
/// of their ticks), a changed id starts a new move.
pub(crate) fn record_hit(moves: &mut Vec<MoveLanded>, frame: i32, attacker: &PostFrameUpdate) {
    let move_id = attacker.last_attack_landed.unwrap_or(0);

    match moves.last_mut() {
        Some(last) if last.move_id == move_id => last.hit_count = last.hit_count.saturating_add(1),
        _ => moves.push(MoveLanded {
            frame,
            move_id,
            hit_count: 1,
        }),
    }
}

/// Pairings are only defined for singles; team or larger matches produce
/// no statistics.
pub(crate) fn singles_pairings(game: &Game<'_>) -> Vec<PlayerIndexed> {
    let players = &game.settings().players;
    if players.len() != 2 {
        return Vec::new();
    }

    vec![
        PlayerIndexed {
            player_index: players[0].player_index,
            opponent_index: players[1].player_index,
        },
        PlayerIndexed {
            player_index: players[1].player_index,
            opponent_index: players[0].player_index,
        },
    ]
}

pub(crate) fn last_frame(game: &Game<'_>) -> i32 {
    game.frames().keys().next_back().copied().unwrap_or(FIRST_FRAME)
}

pub(crate) fn player_post<'a>(entry: &'a FrameEntry, slot: u8) -> Option<&'a PostFrameUpdate> {
    entry.players.get(&slot).and_then(|frames| frames.post.as_ref())
}

pub(crate) fn player_pre<'a>(entry: &'a FrameEntry, slot: u8) -> Option<&'a PreFrameUpdate> {
    entry.players.get(&slot).and_then(|frames| frames.pre.as_ref())
}

pub(crate) fn prev_player_post<'a>(
    frames: &'a BTreeMap<i32, FrameEntry>,
    frame: i32,
    slot: u8,
) -> Option<&'a PostFrameUpdate> {
    frames.get(&frame.checked_sub(1)?).and_then(|entry| player_post(entry, slot))
}

pub(crate) fn prev_player_pre<'a>(
    frames: &'a BTreeMap<i32, FrameEntry>,
    frame: i32,
    slot: u8,
) -> Option<&'a PreFrameUpdate> {
    frames.get(&frame.checked_sub(1)?).and_then(|entry| player_pre(entry, slot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_predicate_covers_the_documented_ranges() {
        assert!(is_in_control(0x0E)); // wait
        assert!(is_in_control(0x14)); // dash
        assert!(is_in_control(0x28)); // squat
        assert!(is_in_control(0x2D)); // jab
        assert!(is_in_control(states::GRAB));

        // The attack range is exclusive at its low end.
        assert!(!is_in_control(states::GROUND_ATTACK_START));
        assert!(!is_in_control(0x4B)); // damage
        assert!(!is_in_control(0xEC)); // air dodge
    }

    #[test]
    fn stock_loss_requires_both_counters() {
        let with = |stocks| PostFrameUpdate {
            stocks_remaining: stocks,
            ..Default::default()
        };

        assert!(did_lose_stock(Some(&with(Some(3))), Some(&with(Some(4)))));
        assert!(!did_lose_stock(Some(&with(Some(4))), Some(&with(Some(4)))));
        assert!(!did_lose_stock(Some(&with(None)), Some(&with(Some(4)))));
        assert!(!did_lose_stock(Some(&with(Some(3))), None));
    }

    #[test]
    fn ratio_is_absent_when_total_is_zero() {
        assert_eq!(Ratio::new(3.0, 4.0).ratio, Some(0.75));
        assert_eq!(Ratio::new(0.0, 0.0).ratio, None);
        assert_eq!(Ratio::new(5.0, 0.0).ratio, None);
    }

    #[test]
    fn absent_ratio_serializes_as_null() {
        let json = serde_json::to_value(Ratio::new(1.0, 0.0)).expect("serializable");
        assert!(json["ratio"].is_null());
    }

    #[test]
    fn repeated_hits_of_one_move_merge() {
        let attacker = |id| PostFrameUpdate {
            last_attack_landed: Some(id),
            ..Default::default()
        };

        let mut moves = Vec::new();
        record_hit(&mut moves, 10, &attacker(15));
        record_hit(&mut moves, 12, &attacker(15));
        record_hit(&mut moves, 20, &attacker(17));

        assert_eq!(moves.len(), 2);
        assert_eq!((moves[0].move_id, moves[0].hit_count), (15, 2));
        assert_eq!((moves[1].move_id, moves[1].hit_count), (17, 1));
        assert_eq!(moves[0].frame, 10);
    }
}
