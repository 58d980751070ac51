//! Typed records for the raw event stream.
//!
//! Each command's payload is a densely packed structure read through fixed
//! field offsets. Offsets below are relative to the start of the record,
//! byte 0 being the command byte itself. Every field is optional: a read
//! past the end of a truncated record yields `None` rather than halting
//! the decode, which lets severed captures still produce partial frames.

use num_enum::TryFromPrimitive;
use serde::Serialize;
use serde_repr::Serialize_repr;

use crate::reader;
use crate::text;

/// The game clock starts counting at this frame index.
pub const FIRST_FRAME: i32 = -123;

/// Players gain control at this frame index; everything before it is the
/// entry countdown.
pub const FIRST_PLAYABLE_FRAME: i32 = -39;

/// Command bytes of the raw event stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    MessageSizes = 0x35,
    GameStart = 0x36,
    PreFrameUpdate = 0x37,
    PostFrameUpdate = 0x38,
    GameEnd = 0x39,
}

/// How a player slot is occupied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive, Serialize_repr)]
#[repr(u8)]
pub enum PlayerType {
    Human = 0,
    Cpu = 1,
    Demo = 2,
    Empty = 3,
}

/// Controller-fix classification advertised in the game-start block.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ControllerFix {
    None,
    #[serde(rename = "UCF")]
    Ucf,
    Dween,
    Mixed,
}

/// How the game ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive, Serialize_repr)]
#[repr(u8)]
pub enum GameEndMethod {
    Inconclusive = 0,
    Time = 1,
    Game = 2,
    Resolved = 3,
    NoContest = 7,
}

/// Starting configuration for one player slot.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub player_index: u8,
    pub port: u8,
    pub character_id: Option<u8>,
    pub character_color: Option<u8>,
    pub start_stocks: Option<u8>,
    #[serde(rename = "type")]
    pub player_type: Option<PlayerType>,
    pub team_id: Option<u8>,
    pub controller_fix: ControllerFix,
    pub nametag: String,
}

/// Decoded game-start record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub is_teams: Option<bool>,
    #[serde(rename = "isPAL")]
    pub is_pal: Option<bool>,
    pub stage_id: Option<u16>,
    pub players: Vec<Player>,
}

/// Controller and position state sampled before the engine runs a frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreFrameUpdate {
    pub frame: Option<i32>,
    pub player_index: Option<u8>,
    pub is_follower: Option<bool>,
    pub seed: Option<u32>,
    pub action_state_id: Option<u16>,
    pub position_x: Option<f32>,
    pub position_y: Option<f32>,
    pub facing_direction: Option<f32>,
    pub joystick_x: Option<f32>,
    pub joystick_y: Option<f32>,
    pub c_stick_x: Option<f32>,
    pub c_stick_y: Option<f32>,
    pub trigger: Option<f32>,
    pub buttons: Option<u32>,
    pub physical_buttons: Option<u16>,
    pub physical_l_trigger: Option<f32>,
    pub physical_r_trigger: Option<f32>,
    pub percent: Option<f32>,
}

/// Player state after the engine ran a frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFrameUpdate {
    pub frame: Option<i32>,
    pub player_index: Option<u8>,
    pub is_follower: Option<bool>,
    pub internal_character_id: Option<u8>,
    pub action_state_id: Option<u16>,
    pub position_x: Option<f32>,
    pub position_y: Option<f32>,
    pub facing_direction: Option<f32>,
    pub percent: Option<f32>,
    pub shield_size: Option<f32>,
    pub last_attack_landed: Option<u8>,
    pub current_combo_count: Option<u8>,
    pub last_hit_by: Option<u8>,
    pub stocks_remaining: Option<u8>,
    pub action_state_counter: Option<f32>,
}

/// Decoded game-end record.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub game_end_method: Option<u8>,
}

impl GameEnd {
    /// The end method as a known variant, when the raw byte is one.
    pub fn method(&self) -> Option<GameEndMethod> {
        self.game_end_method.and_then(|raw| GameEndMethod::try_from(raw).ok())
    }
}

/// One decoded event from the raw stream.
#[derive(Clone, Debug)]
pub enum Event {
    GameStart(GameStart),
    PreFrameUpdate(PreFrameUpdate),
    PostFrameUpdate(PostFrameUpdate),
    GameEnd(GameEnd),
}

/// Decodes a single event record. `record` spans the command byte and its
/// payload. Returns `None` for commands that carry no frame-level record
/// (the message-sizes prefix) and for commands we don't recognize.
pub fn decode_event(command: u8, record: &[u8]) -> Option<Event> {
    match Command::try_from(command).ok()? {
        Command::GameStart => Some(Event::GameStart(decode_game_start(record))),
        Command::PreFrameUpdate => Some(Event::PreFrameUpdate(decode_pre_frame(record))),
        Command::PostFrameUpdate => Some(Event::PostFrameUpdate(decode_post_frame(record))),
        Command::GameEnd => Some(Event::GameEnd(GameEnd {
            game_end_method: reader::read_u8(record, 0x1),
        })),
        Command::MessageSizes => None,
    }
}

fn decode_game_start(record: &[u8]) -> GameStart {
    let players = (0u8..4)
        .map(|slot| {
            let base = 0x65 + slot as usize * 0x24;

            // The UCF block stores a pair of u32 toggles per player; the
            // pair pattern maps onto the known controller-fix builds.
            let fix_base = 0x141 + slot as usize * 0x8;
            let dashback = reader::read_u32(record, fix_base);
            let shield_drop = reader::read_u32(record, fix_base + 0x4);
            let controller_fix = match (dashback, shield_drop) {
                (d, s) if d != s => ControllerFix::Mixed,
                (Some(1), _) => ControllerFix::Ucf,
                (Some(2), _) => ControllerFix::Dween,
                _ => ControllerFix::None,
            };

            let nametag_start = 0x161 + slot as usize * 0x10;
            let nametag_end = (nametag_start + 0x10).min(record.len());
            let nametag = record
                .get(nametag_start..nametag_end)
                .map(text::decode_nametag)
                .unwrap_or_default();

            Player {
                player_index: slot,
                port: slot + 1,
                character_id: reader::read_u8(record, base),
                player_type: reader::read_u8(record, base + 0x1).and_then(|raw| PlayerType::try_from(raw).ok()),
                start_stocks: reader::read_u8(record, base + 0x2),
                character_color: reader::read_u8(record, base + 0x3),
                team_id: reader::read_u8(record, base + 0x9),
                controller_fix,
                nametag,
            }
        })
        .collect();

    GameStart {
        is_teams: reader::read_bool(record, 0xD),
        stage_id: reader::read_u16(record, 0x13),
        is_pal: reader::read_bool(record, 0x1A1),
        players,
    }
}

fn decode_pre_frame(record: &[u8]) -> PreFrameUpdate {
    PreFrameUpdate {
        frame: reader::read_i32(record, 0x1),
        player_index: reader::read_u8(record, 0x5),
        is_follower: reader::read_bool(record, 0x6),
        seed: reader::read_u32(record, 0x7),
        action_state_id: reader::read_u16(record, 0xB),
        position_x: reader::read_f32(record, 0xD),
        position_y: reader::read_f32(record, 0x11),
        facing_direction: reader::read_f32(record, 0x15),
        joystick_x: reader::read_f32(record, 0x19),
        joystick_y: reader::read_f32(record, 0x1D),
        c_stick_x: reader::read_f32(record, 0x21),
        c_stick_y: reader::read_f32(record, 0x25),
        trigger: reader::read_f32(record, 0x29),
        buttons: reader::read_u32(record, 0x2D),
        physical_buttons: reader::read_u16(record, 0x31),
        physical_l_trigger: reader::read_f32(record, 0x33),
        physical_r_trigger: reader::read_f32(record, 0x37),
        percent: reader::read_f32(record, 0x3C),
    }
}

fn decode_post_frame(record: &[u8]) -> PostFrameUpdate {
    PostFrameUpdate {
        frame: reader::read_i32(record, 0x1),
        player_index: reader::read_u8(record, 0x5),
        is_follower: reader::read_bool(record, 0x6),
        internal_character_id: reader::read_u8(record, 0x7),
        action_state_id: reader::read_u16(record, 0x8),
        position_x: reader::read_f32(record, 0xA),
        position_y: reader::read_f32(record, 0xE),
        facing_direction: reader::read_f32(record, 0x12),
        percent: reader::read_f32(record, 0x16),
        shield_size: reader::read_f32(record, 0x1A),
        last_attack_landed: reader::read_u8(record, 0x1E),
        current_combo_count: reader::read_u8(record, 0x1F),
        last_hit_by: reader::read_u8(record, 0x20),
        stocks_remaining: reader::read_u8(record, 0x21),
        action_state_counter: reader::read_f32(record, 0x22),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_frame_record() -> Vec<u8> {
        let mut record = vec![0u8; 0x26];
        record[0] = Command::PostFrameUpdate as u8;
        record[0x1..0x5].copy_from_slice(&150i32.to_be_bytes());
        record[0x5] = 1; // player slot
        record[0x6] = 0; // not a follower
        record[0x7] = 0x07; // internal character
        record[0x8..0xA].copy_from_slice(&0x4Bu16.to_be_bytes());
        record[0x16..0x1A].copy_from_slice(&42.5f32.to_be_bytes());
        record[0x1E] = 15; // last attack landed
        record[0x21] = 3; // stocks remaining
        record
    }

    #[test]
    fn post_frame_fields_decode_from_fixed_offsets() {
        let record = post_frame_record();
        let Some(Event::PostFrameUpdate(post)) = decode_event(record[0], &record) else {
            panic!("expected a post-frame event");
        };

        assert_eq!(post.frame, Some(150));
        assert_eq!(post.player_index, Some(1));
        assert_eq!(post.is_follower, Some(false));
        assert_eq!(post.internal_character_id, Some(0x07));
        assert_eq!(post.action_state_id, Some(0x4B));
        assert_eq!(post.percent, Some(42.5));
        assert_eq!(post.last_attack_landed, Some(15));
        assert_eq!(post.stocks_remaining, Some(3));
    }

    #[test]
    fn truncated_record_yields_absent_trailing_fields() {
        let record = post_frame_record();
        let Some(Event::PostFrameUpdate(post)) = decode_event(record[0], &record[..0x16]) else {
            panic!("expected a post-frame event");
        };

        // Everything before the cut still decodes.
        assert_eq!(post.frame, Some(150));
        assert_eq!(post.action_state_id, Some(0x4B));

        // Everything after it reads as absent.
        assert_eq!(post.percent, None);
        assert_eq!(post.stocks_remaining, None);
        assert_eq!(post.action_state_counter, None);
    }

    #[test]
    fn unknown_command_decodes_to_none() {
        assert!(decode_event(0x10, &[0x10, 0xFF]).is_none());
        assert!(decode_event(Command::MessageSizes as u8, &[0x35, 0x01]).is_none());
    }

    #[test]
    fn game_end_method_maps_known_codes() {
        let end = GameEnd {
            game_end_method: Some(7),
        };
        assert_eq!(end.method(), Some(GameEndMethod::NoContest));

        let unknown = GameEnd {
            game_end_method: Some(99),
        };
        assert_eq!(unknown.method(), None);
    }

    #[test]
    fn game_start_decodes_player_blocks() {
        let mut record = vec![0u8; 0x1A6];
        record[0] = Command::GameStart as u8;
        record[0xD] = 0; // not teams
        record[0x13..0x15].copy_from_slice(&8u16.to_be_bytes());
        record[0x1A1] = 1; // PAL

        for slot in 0..4usize {
            let base = 0x65 + slot * 0x24;
            record[base] = 0x13 + slot as u8; // character
            record[base + 0x1] = if slot < 2 { 0 } else { 3 }; // human or empty
            record[base + 0x2] = 4; // stocks
            record[base + 0x3] = slot as u8; // costume
            record[base + 0x9] = 0; // team
        }

        // Player 1: UCF (dashback == shield drop == 1).
        record[0x141..0x145].copy_from_slice(&1u32.to_be_bytes());
        record[0x145..0x149].copy_from_slice(&1u32.to_be_bytes());
        // Player 2: mixed (dashback != shield drop).
        record[0x149..0x14D].copy_from_slice(&1u32.to_be_bytes());
        record[0x14D..0x151].copy_from_slice(&2u32.to_be_bytes());

        // Player 1 nametag: fullwidth "Ａ" + "1".
        record[0x161] = 0x82;
        record[0x162] = 0x60;
        record[0x163] = 0x31;

        let Some(Event::GameStart(start)) = decode_event(record[0], &record) else {
            panic!("expected a game-start event");
        };

        assert_eq!(start.is_teams, Some(false));
        assert_eq!(start.is_pal, Some(true));
        assert_eq!(start.stage_id, Some(8));
        assert_eq!(start.players.len(), 4);

        let first = &start.players[0];
        assert_eq!(first.port, 1);
        assert_eq!(first.character_id, Some(0x13));
        assert_eq!(first.player_type, Some(PlayerType::Human));
        assert_eq!(first.start_stocks, Some(4));
        assert_eq!(first.controller_fix, ControllerFix::Ucf);
        assert_eq!(first.nametag, "A1");

        assert_eq!(start.players[1].controller_fix, ControllerFix::Mixed);
        assert_eq!(start.players[2].player_type, Some(PlayerType::Empty));
        assert_eq!(start.players[3].controller_fix, ControllerFix::None);
    }
}
