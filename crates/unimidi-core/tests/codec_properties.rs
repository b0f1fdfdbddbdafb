//! Property tests for the message codec and stream parser.

use proptest::collection::vec;
use proptest::prelude::*;
use unimidi_core::{Codec, MessageError, RunningStatusParser};

fn data_byte() -> impl Strategy<Value = u8> {
    0u8..0x80
}

fn channel_message() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        (0x80u8..0xC0, data_byte(), data_byte()).prop_map(|(s, a, b)| vec![s, a, b]),
        (0xE0u8..0xF0, data_byte(), data_byte()).prop_map(|(s, a, b)| vec![s, a, b]),
        (0xC0u8..0xE0, data_byte()).prop_map(|(s, a)| vec![s, a]),
    ]
}

fn valid_message() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        4 => channel_message(),
        1 => vec(data_byte(), 0..256).prop_map(|payload| {
            let mut bytes = vec![0xF0];
            bytes.extend(payload);
            bytes.push(0xF7);
            bytes
        }),
        1 => data_byte().prop_map(|d| vec![0xF1, d]),
        1 => (data_byte(), data_byte()).prop_map(|(a, b)| vec![0xF2, a, b]),
        1 => data_byte().prop_map(|d| vec![0xF3, d]),
        1 => Just(vec![0xF6]),
        1 => prop::sample::select(vec![0xF8u8, 0xFA, 0xFB, 0xFC, 0xFE, 0xFF]).prop_map(|s| vec![s]),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(bytes in valid_message()) {
        for codec in [Codec::default(), Codec::strict()] {
            let msg = codec.encode(&bytes).unwrap();
            prop_assert_eq!(codec.decode(&msg), bytes.clone());
            prop_assert_eq!(codec.encode(msg.as_bytes()).unwrap(), msg);
        }
    }

    #[test]
    fn truncated_sysex_is_rejected(payload in vec(data_byte(), 0..256)) {
        let mut bytes = vec![0xF0];
        bytes.extend(payload);
        prop_assert_eq!(Codec::default().encode(&bytes), Err(MessageError::UnterminatedSysEx));
    }

    #[test]
    fn truncated_channel_message_is_rejected(bytes in channel_message()) {
        let cut = &bytes[..bytes.len() - 1];
        let is_wrong_length = matches!(
            Codec::default().encode(cut),
            Err(MessageError::WrongLength { .. })
        );
        prop_assert!(is_wrong_length);
    }

    #[test]
    fn leading_data_byte_is_rejected(first in data_byte(), rest in vec(any::<u8>(), 0..4)) {
        let mut bytes = vec![first];
        bytes.extend(rest);
        prop_assert_eq!(Codec::default().encode(&bytes), Err(MessageError::MissingStatus(first)));
    }

    #[test]
    fn parser_reproduces_concatenated_stream(messages in vec(valid_message(), 1..16)) {
        let stream: Vec<u8> = messages.iter().flatten().copied().collect();
        let mut parser = RunningStatusParser::default();
        let parsed: Vec<Vec<u8>> = parser
            .parse(&stream)
            .into_iter()
            .map(|r| r.unwrap().into_vec())
            .collect();
        prop_assert_eq!(parsed, messages);
        prop_assert!(!parser.has_pending());
    }
}
