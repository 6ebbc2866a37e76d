//! Property tests for frame classification and transmission helpers

use iec_protocol::{
    classify, post_write_delay, split_chunks, BaudRate, FrameKind, READOUT_TRIGGERS,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn serial_number() -> impl Strategy<Value = String> {
    "[0-9]{8}"
}

fn trigger() -> impl Strategy<Value = (usize, &'static str)> {
    (0usize..READOUT_TRIGGERS.len()).prop_map(|i| (i, READOUT_TRIGGERS[i]))
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            8 => b'!'..=b'~',
            1 => Just(b' '),
            1 => Just(b'\n'),
        ],
        0..7000,
    )
}

// ============================================================================
// Classification
// ============================================================================

mod classification {
    use super::*;

    proptest! {
        #[test]
        fn handshake_round_trip(serial in serial_number()) {
            let frame = format!("/?{}!\r\n", serial);
            prop_assert_eq!(
                classify(frame.as_bytes()),
                FrameKind::StartHandshake { address: serial }
            );
        }

        #[test]
        fn classifier_is_total(frame in prop::collection::vec(any::<u8>(), 0..64)) {
            let kind = classify(&frame);
            prop_assert!(matches!(
                kind,
                FrameKind::Readout { .. }
                    | FrameKind::StartHandshake { .. }
                    | FrameKind::Repeat
                    | FrameKind::Unrecognized
            ), "unexpected frame kind: {:?}", kind);
        }

        #[test]
        fn trigger_beats_handshake(
            serial in serial_number(),
            (code, token) in trigger(),
            trigger_first: bool,
        ) {
            let frame = if trigger_first {
                format!("\x06{}/?{}!\r\n", token, serial)
            } else {
                format!("/?{}!{}\r\n", serial, token)
            };
            prop_assert_eq!(
                classify(frame.as_bytes()),
                FrameKind::Readout { proposed_baud: BaudRate::ALL[code] }
            );
        }

        #[test]
        fn option_select_decodes_baud(code in 0usize..6) {
            let frame = format!("\x060{}0\r\n", code);
            prop_assert_eq!(
                classify(frame.as_bytes()),
                FrameKind::Readout { proposed_baud: BaudRate::ALL[code] }
            );
        }
    }
}

// ============================================================================
// Chunking
// ============================================================================

mod chunking {
    use super::*;

    proptest! {
        #[test]
        fn chunks_never_exceed_threshold(data in payload(), threshold in 1usize..2500) {
            for chunk in split_chunks(&data, threshold) {
                prop_assert!(chunk.len() <= threshold);
                prop_assert!(!chunk.is_empty());
            }
        }

        #[test]
        fn chunks_reassemble_exactly(data in payload()) {
            let chunks = split_chunks(&data, 2000);
            let joined: Vec<u8> = chunks.concat();
            prop_assert_eq!(joined, data);
        }
    }
}

// ============================================================================
// Post-write delay
// ============================================================================

mod delay {
    use super::*;

    fn standard_baud() -> impl Strategy<Value = u32> {
        prop_oneof![
            Just(300u32),
            Just(600),
            Just(1200),
            Just(2400),
            Just(4800),
            Just(9600),
        ]
    }

    proptest! {
        #[test]
        fn grows_with_length(len in 0usize..100_000, extra in 1usize..1000, baud in standard_baud()) {
            let shorter = post_write_delay(len, baud, 7.0, 1.5);
            let longer = post_write_delay(len + extra, baud, 7.0, 1.5);
            prop_assert!(longer > shorter);
        }

        #[test]
        fn shrinks_with_baud(len in 1usize..100_000, baud in 300u32..9600, step in 1u32..9600) {
            let slow = post_write_delay(len, baud, 7.0, 1.5);
            let fast = post_write_delay(len, baud + step, 7.0, 1.5);
            prop_assert!(fast <= slow);
        }
    }
}
