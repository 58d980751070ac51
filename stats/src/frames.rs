//! Assembles the raw event stream into ordered per-frame player state.

use std::collections::BTreeMap;

use slippi_replay::{Event, GameEnd, PostFrameUpdate, PreFrameUpdate, SlpFile};

/// Pre- and post-frame records for one player on one frame. Either half
/// can be missing on a truncated capture.
#[derive(Clone, Debug, Default)]
pub struct PlayerFrames {
    pub pre: Option<PreFrameUpdate>,
    pub post: Option<PostFrameUpdate>,
}

/// Every player record observed for a single frame index.
#[derive(Clone, Debug, Default)]
pub struct FrameEntry {
    pub frame: i32,
    pub players: BTreeMap<u8, PlayerFrames>,
}

/// The assembled output of one full pass over the event stream. Frame maps
/// are ordered by frame index, which every statistics pass relies on.
#[derive(Clone, Debug, Default)]
pub struct FrameData {
    pub players: BTreeMap<i32, FrameEntry>,
    pub followers: BTreeMap<i32, FrameEntry>,
    pub game_end: Option<GameEnd>,
}

pub(crate) fn assemble(file: &SlpFile<'_>) -> FrameData {
    let mut data = FrameData::default();

    file.iterate_events(|_, event| {
        match event {
            Some(Event::PreFrameUpdate(record)) => {
                let Some(frame) = record.frame else {
                    // A frame update we can't place means the rest of the
                    // stream can't be trusted either; stop here.
                    tracing::warn!("Frame update without a frame index; stopping frame assembly");
                    return true;
                };
                if let Some(slot) = record.player_index {
                    let follower = record.is_follower.unwrap_or(false);
                    entry_for(&mut data, follower, frame)
                        .players
                        .entry(slot)
                        .or_default()
                        .pre = Some(record.clone());
                }
            },
            Some(Event::PostFrameUpdate(record)) => {
                let Some(frame) = record.frame else {
                    tracing::warn!("Frame update without a frame index; stopping frame assembly");
                    return true;
                };
                if let Some(slot) = record.player_index {
                    let follower = record.is_follower.unwrap_or(false);
                    entry_for(&mut data, follower, frame)
                        .players
                        .entry(slot)
                        .or_default()
                        .post = Some(record.clone());
                }
            },
            Some(Event::GameEnd(record)) => data.game_end = Some(record.clone()),
            _ => {},
        }

        false
    });

    data
}

fn entry_for(data: &mut FrameData, follower: bool, frame: i32) -> &mut FrameEntry {
    let target = if follower { &mut data.followers } else { &mut data.players };
    target.entry(frame).or_insert_with(|| FrameEntry {
        frame,
        ..Default::default()
    })
}
