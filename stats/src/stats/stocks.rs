//! Stock lifecycle tracking.

use serde::Serialize;

use super::common;
use crate::Game;

/// One of a player's lives: opened when the respawn animation ends, closed
/// when the remaining-stock counter drops.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub player_index: u8,
    pub opponent_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f32,
    pub current_percent: f32,
    pub end_percent: Option<f32>,
    pub count: u8,
    pub death_animation: Option<u16>,
}

pub(crate) fn generate(game: &Game<'_>) -> Vec<Stock> {
    let frames = game.frames();
    let mut stocks = Vec::new();

    for indices in common::singles_pairings(game) {
        let mut open: Option<Stock> = None;

        for (&frame, entry) in frames {
            let Some(post) = common::player_post(entry, indices.player_index) else {
                continue;
            };
            let prev = common::prev_player_post(frames, frame, indices.player_index);

            match open.take() {
                None => {
                    // Wait out the dying/respawning animations; the stock
                    // starts once the player is back on the field.
                    if !common::is_dead(post.action_state_id.unwrap_or(0)) {
                        open = Some(Stock {
                            player_index: indices.player_index,
                            opponent_index: indices.opponent_index,
                            start_frame: frame,
                            end_frame: None,
                            start_percent: 0.0,
                            current_percent: 0.0,
                            end_percent: None,
                            count: post.stocks_remaining.unwrap_or(0),
                            death_animation: None,
                        });
                    }
                },
                Some(mut stock) => {
                    if common::did_lose_stock(Some(post), prev) {
                        stock.end_frame = Some(frame);
                        stock.end_percent = Some(prev.and_then(|p| p.percent).unwrap_or(0.0));
                        stock.death_animation = post.action_state_id;
                        stocks.push(stock);
                    } else {
                        stock.current_percent = post.percent.unwrap_or(0.0);
                        open = Some(stock);
                    }
                },
            }
        }

        // A stock still alive when the capture ends is reported without an
        // end frame.
        if let Some(stock) = open {
            stocks.push(stock);
        }
    }

    stocks
}
