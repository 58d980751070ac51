//! Extracts the starting configuration from the event stream.

use serde::Serialize;
use slippi_replay::{Event, Player, PlayerType, SlpFile, FIRST_FRAME};

/// The settings that describe the starting state of the game: stage, mode
/// flags and the occupied player slots.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub stage_id: u16,
    pub is_teams: bool,
    #[serde(rename = "isPAL")]
    pub is_pal: bool,
    pub players: Vec<Player>,
}

// Zelda and Sheik share one character id in the settings block; only the
// internal id in frame data tells them apart.
const INTERNAL_SHEIK: u8 = 0x07;
const INTERNAL_ZELDA: u8 = 0x13;
const CHARACTER_SHEIK: u8 = 0x13;
const CHARACTER_ZELDA: u8 = 0x12;

pub(crate) fn extract(file: &SlpFile<'_>) -> GameSettings {
    let mut settings = GameSettings::default();

    file.iterate_events(|_, event| {
        match event {
            Some(Event::GameStart(record)) => {
                settings.stage_id = record.stage_id.unwrap_or(0);
                settings.is_teams = record.is_teams.unwrap_or(false);
                settings.is_pal = record.is_pal.unwrap_or(false);
                settings.players = record
                    .players
                    .iter()
                    .filter(|player| player.player_type != Some(PlayerType::Empty))
                    .cloned()
                    .collect();
            },
            Some(Event::PostFrameUpdate(record)) => {
                // The correction only needs the very first frames; once the
                // game clock passes the start boundary we're done scanning.
                match record.frame {
                    Some(frame) if frame <= FIRST_FRAME => {},
                    _ => return true,
                }

                if let (Some(slot), Some(internal)) = (record.player_index, record.internal_character_id) {
                    if let Some(player) = settings.players.iter_mut().find(|player| player.player_index == slot) {
                        match internal {
                            INTERNAL_SHEIK => player.character_id = Some(CHARACTER_SHEIK),
                            INTERNAL_ZELDA => player.character_id = Some(CHARACTER_ZELDA),
                            _ => {},
                        }
                    }
                }
            },
            _ => {},
        }

        false
    });

    settings
}
