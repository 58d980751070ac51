//! Session metadata recovered from the container's trailing region.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::file::SlpFile;
use crate::ubjson::{self, Value};

/// Optional textual session metadata. Every field may be missing: legacy
/// containers have no metadata region at all, and severed captures lose
/// theirs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub start_at: Option<String>,
    pub played_on: Option<String>,
    pub last_frame: Option<i32>,
    pub players: BTreeMap<u8, PlayerMetadata>,
}

/// Per-player play-duration totals, keyed by internal character id. A
/// player shows more than one character only when transforming mid-match.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlayerMetadata {
    pub characters: BTreeMap<u8, i32>,
}

impl Metadata {
    /// Decodes the metadata region of `file`. Returns an empty value when
    /// the region is missing or fails to decode; metadata is best-effort
    /// and never blocks the rest of the replay.
    pub fn parse(file: &SlpFile<'_>) -> Self {
        let Some(bytes) = file.metadata_bytes() else {
            return Self::default();
        };

        match ubjson::decode(bytes) {
            Ok(value) => Self::from_value(&value),
            Err(error) => {
                tracing::warn!(%error, "Failed to decode replay metadata");
                Self::default()
            },
        }
    }

    fn from_value(value: &Value) -> Self {
        let Some(root) = value.as_object() else {
            return Self::default();
        };

        let players = root
            .get("players")
            .and_then(Value::as_object)
            .map(|slots| {
                slots
                    .iter()
                    .filter_map(|(slot, player)| Some((slot.parse::<u8>().ok()?, PlayerMetadata::from_value(player))))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            start_at: root.get("startAt").and_then(Value::as_str).map(str::to_owned),
            played_on: root.get("playedOn").and_then(Value::as_str).map(str::to_owned),
            last_frame: root.get("lastFrame").and_then(Value::as_i64).map(|frame| frame as i32),
            players,
        }
    }

    /// The session start time, when `startAt` is present and well-formed.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.start_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw).ok().map(|time| time.with_timezone(&Utc))
    }
}

impl PlayerMetadata {
    fn from_value(value: &Value) -> Self {
        let characters = value
            .as_object()
            .and_then(|player| player.get("characters"))
            .and_then(Value::as_object)
            .map(|characters| {
                characters
                    .iter()
                    .filter_map(|(id, frames)| Some((id.parse::<u8>().ok()?, frames.as_i64()? as i32)))
                    .collect()
            })
            .unwrap_or_default();

        Self { characters }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn sample() -> Metadata {
        let mut buf = Vec::new();
        buf.push(b'{');
        buf.extend_from_slice(b"U\x07startAt");
        buf.extend_from_slice(b"SU\x142017-12-18T21:14:14Z");
        buf.extend_from_slice(b"U\x08playedOn");
        buf.extend_from_slice(b"SU\x07dolphin");
        buf.extend_from_slice(b"U\x09lastFrame");
        buf.push(b'l');
        buf.extend_from_slice(&3694i32.to_be_bytes());
        buf.extend_from_slice(b"U\x07players");
        buf.extend_from_slice(b"{U\x010{U\x0Acharacters{U\x0218");
        buf.push(b'l');
        buf.extend_from_slice(&5209i32.to_be_bytes());
        buf.extend_from_slice(b"}}}");
        buf.push(b'}');

        Metadata::from_value(&ubjson::decode(&buf).expect("well-formed metadata"))
    }

    #[test]
    fn fields_map_out_of_the_decoded_object() {
        let metadata = sample();

        assert_eq!(metadata.start_at.as_deref(), Some("2017-12-18T21:14:14Z"));
        assert_eq!(metadata.played_on.as_deref(), Some("dolphin"));
        assert_eq!(metadata.last_frame, Some(3694));
        assert_eq!(metadata.players[&0].characters[&18], 5209);
    }

    #[test]
    fn start_time_parses_the_timestamp() {
        let time = sample().start_time().expect("valid RFC 3339 timestamp");

        assert_eq!((time.year(), time.month(), time.day()), (2017, 12, 18));
        assert_eq!((time.hour(), time.minute(), time.second()), (21, 14, 14));
    }

    #[test]
    fn malformed_start_at_yields_no_time() {
        let metadata = Metadata {
            start_at: Some("yesterday-ish".into()),
            ..Default::default()
        };
        assert_eq!(metadata.start_time(), None);
    }
}
