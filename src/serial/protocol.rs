//! Frame codec for the Smock serial protocol.
//!
//! A frame on the wire is one command byte followed by the payload and a
//! terminating sentinel byte. The host never appends the sentinel when
//! writing; the device adds its own framing on the way back.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTINEL: u8 = 0x00;

/// One decoded or outbound protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingCommand,
    AccumulatingPayload,
}

/// Reassembly state owned by the reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderState {
    phase: Phase,
    command: u8,
    payload: Vec<u8>,
}

impl DecoderState {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitingCommand,
            command: 0,
            payload: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::AwaitingCommand
    }

    fn reset(&mut self) {
        self.phase = Phase::AwaitingCommand;
        self.command = 0;
        self.payload.clear();
    }
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding a single byte to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Incomplete,
    Complete(Message),
    /// The partial frame exceeded `max_payload` and was discarded.
    ErrorRecovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    sentinel: u8,
    max_payload: Option<usize>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            max_payload: None,
        }
    }

    pub fn with_sentinel(mut self, sentinel: u8) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Bound the payload length. Overflowing frames are dropped and the
    /// decoder resynchronises on the next byte, which it treats as a command.
    pub fn with_max_payload(mut self, max_payload: Option<usize>) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    pub fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }

    pub fn encode(&self, message: &Message) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + message.payload.len());
        bytes.push(message.command);
        bytes.extend_from_slice(&message.payload);
        bytes
    }

    pub fn decode_byte(&self, state: &mut DecoderState, byte: u8) -> Decoded {
        match state.phase {
            Phase::AwaitingCommand => {
                state.command = byte;
                state.phase = Phase::AccumulatingPayload;
                Decoded::Incomplete
            }
            Phase::AccumulatingPayload if byte == self.sentinel => {
                let message = Message {
                    command: state.command,
                    payload: std::mem::take(&mut state.payload),
                };
                state.reset();
                Decoded::Complete(message)
            }
            Phase::AccumulatingPayload => {
                if let Some(max) = self.max_payload {
                    if state.payload.len() >= max {
                        log::warn!(
                            "Discarding frame 0x{:02X}: payload exceeded {} bytes",
                            state.command,
                            max
                        );
                        state.reset();
                        return Decoded::ErrorRecovered;
                    }
                }
                state.payload.push(byte);
                Decoded::Incomplete
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &FrameCodec, state: &mut DecoderState, bytes: &[u8]) -> Vec<Decoded> {
        bytes.iter().map(|b| codec.decode_byte(state, *b)).collect()
    }

    #[test]
    fn test_encode_has_no_sentinel() {
        let codec = FrameCodec::new();
        let bytes = codec.encode(&Message::new(0x07, b"hi".to_vec()));
        assert_eq!(bytes, vec![0x07, b'h', b'i']);
    }

    #[test]
    fn test_roundtrip_through_decoder() {
        let codec = FrameCodec::new();
        let message = Message::new(0x12, b"Lock screen".to_vec());
        let mut wire = codec.encode(&message);
        wire.push(codec.sentinel());

        let mut state = DecoderState::new();
        let results = decode_all(&codec, &mut state, &wire);
        let (last, rest) = results.split_last().unwrap();
        assert!(rest.iter().all(|d| *d == Decoded::Incomplete));
        assert_eq!(*last, Decoded::Complete(message));
        assert!(state.is_idle());
    }

    #[test]
    fn test_partial_frame_is_kept() {
        let codec = FrameCodec::new();
        let mut state = DecoderState::new();
        decode_all(&codec, &mut state, &[0x01, 0x41, 0x42]);

        assert_eq!(state.phase(), Phase::AccumulatingPayload);
        assert_eq!(state.command(), 0x01);
        assert_eq!(state.payload(), &[0x41, 0x42]);

        let done = codec.decode_byte(&mut state, DEFAULT_SENTINEL);
        assert_eq!(done, Decoded::Complete(Message::new(0x01, vec![0x41, 0x42])));
        assert_eq!(state, DecoderState::new());
    }

    #[test]
    fn test_empty_payload_frame() {
        let codec = FrameCodec::new();
        let mut state = DecoderState::new();
        assert_eq!(codec.decode_byte(&mut state, 0x05), Decoded::Incomplete);
        assert_eq!(
            codec.decode_byte(&mut state, DEFAULT_SENTINEL),
            Decoded::Complete(Message::new(0x05, Vec::new()))
        );
    }

    #[test]
    fn test_sentinel_as_command_byte() {
        // A leading sentinel is taken as the command; framing is not resynchronised.
        let codec = FrameCodec::new();
        let mut state = DecoderState::new();
        let results = decode_all(&codec, &mut state, &[DEFAULT_SENTINEL, 0x02, DEFAULT_SENTINEL]);
        assert_eq!(
            results[2],
            Decoded::Complete(Message::new(DEFAULT_SENTINEL, vec![0x02]))
        );
    }

    #[test]
    fn test_custom_sentinel() {
        let codec = FrameCodec::new().with_sentinel(b'\n');
        let mut state = DecoderState::new();
        let results = decode_all(&codec, &mut state, b"\x03ab\x00c\n");
        assert_eq!(
            results.last().unwrap(),
            &Decoded::Complete(Message::new(0x03, b"ab\x00c".to_vec()))
        );
    }

    #[test]
    fn test_unbounded_payload_by_default() {
        let codec = FrameCodec::new();
        let mut state = DecoderState::new();
        codec.decode_byte(&mut state, 0x01);
        for _ in 0..10_000 {
            assert_eq!(codec.decode_byte(&mut state, 0x41), Decoded::Incomplete);
        }
        assert_eq!(state.payload().len(), 10_000);
    }

    #[test]
    fn test_overflow_discards_and_resyncs() {
        let codec = FrameCodec::new().with_max_payload(Some(2));
        let mut state = DecoderState::new();
        let results = decode_all(&codec, &mut state, &[0x01, 0x41, 0x42, 0x43]);
        assert_eq!(results[3], Decoded::ErrorRecovered);
        assert!(state.is_idle());

        let results = decode_all(&codec, &mut state, &[0x09, 0x44, DEFAULT_SENTINEL]);
        assert_eq!(results[2], Decoded::Complete(Message::new(0x09, vec![0x44])));
    }

    #[test]
    fn test_payload_at_limit_completes() {
        let codec = FrameCodec::new().with_max_payload(Some(2));
        let mut state = DecoderState::new();
        let results = decode_all(&codec, &mut state, &[0x01, 0x41, 0x42, DEFAULT_SENTINEL]);
        assert_eq!(results[3], Decoded::Complete(Message::new(0x01, vec![0x41, 0x42])));
    }
}
