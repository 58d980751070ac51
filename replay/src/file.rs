//! Locates the regions of a replay container and drives the raw event scan.
//!
//! Two container shapes exist in the wild. Legacy captures are nothing but
//! the raw event stream: the first byte is already a game-start command and
//! payload sizes are fixed, built-in constants. Current captures wrap the
//! stream in an outer self-describing object: a 15-byte header (with the
//! raw-region length at offset 11), the raw region, a 10-byte separator
//! (the encoded `metadata` key), the metadata region, and a closing brace.

use std::collections::HashMap;
use std::ops::Range;

use crate::events::{self, Command, Event};
use crate::reader;

/// First byte of the current container form: the opening brace of the
/// outer self-describing object.
const CONTAINER_OPEN: u8 = b'{';
const CONTAINER_CLOSE: u8 = b'}';

/// Offset of the big-endian raw-region length within the current-form header.
const RAW_LENGTH_OFFSET: usize = 11;

/// Where the raw event region starts in the current container form.
const RAW_START: usize = 15;

/// The encoded `metadata` key sitting between the raw region and the
/// metadata value.
const METADATA_SEPARATOR_LEN: usize = 10;

/// A parsed view over a replay buffer: region bounds plus the
/// command-to-payload-size table the scan uses to frame records.
#[derive(Clone, Debug)]
pub struct SlpFile<'a> {
    buf: &'a [u8],
    raw: Range<usize>,
    metadata: Option<Range<usize>>,
    message_sizes: HashMap<u8, u16>,
}

impl<'a> SlpFile<'a> {
    /// Parses region bounds out of `buf`. This never fails: a corrupt or
    /// truncated container degrades to an empty raw region or missing
    /// metadata, and the event scan reports anything left over.
    pub fn new(buf: &'a [u8]) -> Self {
        let raw_start = raw_data_position(buf);
        let raw_len = raw_data_length(buf, raw_start);
        let raw = raw_start..raw_start.saturating_add(raw_len).min(buf.len());

        let metadata = metadata_region(buf, raw_start, raw_len);
        let message_sizes = message_sizes(buf, raw_start);

        Self {
            buf,
            raw,
            metadata,
            message_sizes,
        }
    }

    /// The underlying replay buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Bytes of the self-describing metadata region, when the container has
    /// one and it wasn't severed.
    pub fn metadata_bytes(&self) -> Option<&'a [u8]> {
        self.metadata.clone().and_then(|range| self.buf.get(range))
    }

    /// Scans the raw event region, invoking `visitor` with each command
    /// byte and its decoded record. The visitor returns `true` to stop the
    /// scan early.
    ///
    /// Returns `false` when the scan halts on a command byte with no known
    /// payload size; everything decoded up to that point has already been
    /// delivered. The scan never back-tracks and never re-reads a byte.
    pub fn iterate_events<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(u8, Option<&Event>) -> bool,
    {
        let mut position = self.raw.start;

        while position < self.raw.end {
            let Some(command) = reader::read_u8(self.buf, position) else {
                break;
            };

            let Some(&size) = self.message_sizes.get(&command) else {
                tracing::warn!(command, position, "Unknown command byte; stopping the event scan");
                return false;
            };

            let record_len = size as usize + 1;
            let record_end = position.saturating_add(record_len).min(self.buf.len());
            let record = &self.buf[position..record_end];

            let event = events::decode_event(command, record);
            if visitor(command, event.as_ref()) {
                break;
            }

            position += record_len;
        }

        true
    }
}

/// Legacy captures start directly with the event stream; the current form
/// opens the outer object and puts the raw region at a fixed offset.
fn raw_data_position(buf: &[u8]) -> usize {
    match buf.first() {
        Some(&CONTAINER_OPEN) => RAW_START,
        _ => 0,
    }
}

fn raw_data_length(buf: &[u8], position: usize) -> usize {
    if position == 0 {
        return buf.len();
    }

    // If neither of the final two bytes closes out the outer object, the
    // capture was severed mid-write. Fall back to "rest of the buffer" so
    // partial analysis still works.
    let severed = buf.len() < 2 || {
        let tail = &buf[buf.len() - 2..];
        tail[0] != CONTAINER_CLOSE && tail[1] != CONTAINER_CLOSE
    };
    if severed {
        tracing::warn!("Replay container is severed; scanning the remainder of the buffer as raw data");
        return buf.len().saturating_sub(position);
    }

    reader::read_u32(buf, RAW_LENGTH_OFFSET)
        .map(|len| len as usize)
        .unwrap_or(0)
}

fn metadata_region(buf: &[u8], raw_start: usize, raw_len: usize) -> Option<Range<usize>> {
    if raw_start == 0 {
        // Legacy containers carry no metadata.
        return None;
    }

    let start = raw_start.checked_add(raw_len)?.checked_add(METADATA_SEPARATOR_LEN)?;
    // The final byte closes the outer object and isn't part of the value.
    let end = buf.len().checked_sub(1)?;
    (start < end).then_some(start..end)
}

/// Builds the command-to-payload-size table. Legacy containers use fixed
/// built-in sizes; the current form declares sizes in a message-sizes
/// event prefixing the stream as (command, u16 size) triples.
fn message_sizes(buf: &[u8], position: usize) -> HashMap<u8, u16> {
    if position == 0 {
        return HashMap::from([
            (Command::GameStart as u8, 0x140),
            (Command::PreFrameUpdate as u8, 0x6),
            (Command::PostFrameUpdate as u8, 0x46),
            (Command::GameEnd as u8, 0x1),
        ]);
    }

    let mut sizes = HashMap::new();

    if reader::read_u8(buf, position) != Some(Command::MessageSizes as u8) {
        return sizes;
    }

    let Some(payload_len) = reader::read_u8(buf, position + 1) else {
        return sizes;
    };

    sizes.insert(Command::MessageSizes as u8, payload_len as u16);

    let mut offset = position + 2;
    let end = position + 1 + payload_len as usize;
    while offset + 3 <= end {
        let Some((command, size)) = reader::read_u8(buf, offset).zip(reader::read_u16(buf, offset + 1)) else {
            break;
        };
        sizes.insert(command, size);
        offset += 3;
    }

    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Current-form header: outer object open, encoded `raw` key, array
    /// type/count markers, then the big-endian region length.
    fn current_header(raw_len: u32) -> Vec<u8> {
        let mut header = b"{U\x03raw[$U#l".to_vec();
        header.extend_from_slice(&raw_len.to_be_bytes());
        header
    }

    fn message_sizes_event() -> Vec<u8> {
        // Declares sizes for game-start, pre-frame, post-frame, game-end.
        let mut event = vec![Command::MessageSizes as u8, 1 + 4 * 3];
        for (command, size) in [
            (Command::GameStart as u8, 0x1A5u16),
            (Command::PreFrameUpdate as u8, 0x3F),
            (Command::PostFrameUpdate as u8, 0x25),
            (Command::GameEnd as u8, 0x1),
        ] {
            event.push(command);
            event.extend_from_slice(&size.to_be_bytes());
        }
        event
    }

    fn current_container(events: &[u8]) -> Vec<u8> {
        let mut raw = message_sizes_event();
        raw.extend_from_slice(events);

        let mut buf = current_header(raw.len() as u32);
        buf.extend_from_slice(&raw);
        buf.extend_from_slice(b"U\x08metadata");
        buf.extend_from_slice(b"{U\x08playedOnSU\x07dolphin}");
        buf.push(b'}');
        buf
    }

    #[test]
    fn legacy_container_spans_whole_buffer_with_builtin_sizes() {
        let buf = [Command::GameStart as u8, 0x00, 0x00];
        let file = SlpFile::new(&buf);

        assert_eq!(file.raw, 0..3);
        assert_eq!(file.metadata_bytes(), None);
        assert_eq!(file.message_sizes.get(&(Command::GameStart as u8)), Some(&0x140));
        assert_eq!(file.message_sizes.get(&(Command::PostFrameUpdate as u8)), Some(&0x46));
    }

    #[test]
    fn current_container_reads_declared_sizes_and_metadata() {
        let buf = current_container(&[]);
        let file = SlpFile::new(&buf);

        assert_eq!(file.raw.start, RAW_START);
        assert_eq!(file.message_sizes.get(&(Command::PreFrameUpdate as u8)), Some(&0x3F));
        assert_eq!(file.message_sizes.get(&(Command::GameEnd as u8)), Some(&0x1));

        let metadata = file.metadata_bytes().expect("metadata region present");
        assert_eq!(metadata[0], b'{');
        assert_eq!(*metadata.last().expect("non-empty"), b'}');
    }

    #[test]
    fn severed_container_falls_back_to_rest_of_buffer() {
        let mut buf = current_container(&[]);
        // Chop off the metadata region and terminator mid-write.
        buf.truncate(buf.len() - 8);

        let file = SlpFile::new(&buf);
        assert_eq!(file.raw.end, buf.len());
        assert_eq!(file.metadata_bytes(), None);
    }

    #[test]
    fn scan_stops_and_reports_unknown_commands() {
        let mut events = vec![Command::GameEnd as u8, 0x03];
        events.push(0x7A); // no declared size for this command
        let buf = current_container(&events);

        let mut seen = Vec::new();
        let complete = SlpFile::new(&buf).iterate_events(|command, _| {
            seen.push(command);
            false
        });

        assert!(!complete);
        assert_eq!(seen, vec![Command::MessageSizes as u8, Command::GameEnd as u8]);
    }

    #[test]
    fn visitor_can_stop_the_scan_early() {
        let events = vec![Command::GameEnd as u8, 0x03, Command::GameEnd as u8, 0x03];
        let buf = current_container(&events);

        let mut ends = 0;
        let complete = SlpFile::new(&buf).iterate_events(|command, _| {
            if command == Command::GameEnd as u8 {
                ends += 1;
                return true;
            }
            false
        });

        assert!(complete);
        assert_eq!(ends, 1);
    }
}
