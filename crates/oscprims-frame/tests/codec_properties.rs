use bytes::BytesMut;
use oscprims_frame::{decode, encode, encode_message, Argument, FrameError, Message, ALIGNMENT};
use proptest::prelude::*;

fn arb_address() -> impl Strategy<Value = String> {
    "/[a-z0-9_]{1,8}(/[a-z0-9_]{1,8}){0,4}"
}

fn arb_text() -> impl Strategy<Value = String> {
    // Printable ASCII, so commas and spaces show up inside text arguments.
    "[ -~]{0,12}"
}

fn arb_argument() -> impl Strategy<Value = Argument> {
    prop_oneof![
        any::<i32>().prop_map(Argument::Int),
        (-1.0e9f32..1.0e9f32).prop_map(Argument::Float),
        arb_text().prop_map(Argument::Text),
    ]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (arb_address(), prop::collection::vec(arb_argument(), 0..6))
        .prop_map(|(address, args)| Message::new(address, args))
}

proptest! {
    #[test]
    fn encoded_messages_decode_unchanged(msg in arb_message()) {
        let frame = encode(&msg.address, &msg.type_tags(), &msg.args).unwrap();
        prop_assert_eq!(decode(&frame).unwrap(), msg);
    }

    #[test]
    fn frames_are_aligned(msg in arb_message()) {
        let mut buf = BytesMut::new();
        encode_message(&msg, &mut buf).unwrap();
        prop_assert_eq!(buf.len() % ALIGNMENT, 0);
        prop_assert_eq!(buf.len(), msg.wire_size());
    }

    #[test]
    fn truncated_frames_decode_or_report_malformed(
        msg in arb_message(),
        cut in any::<prop::sample::Index>(),
    ) {
        let frame = encode(&msg.address, &msg.type_tags(), &msg.args).unwrap();
        let cut = cut.index(frame.len());
        match decode(&frame[..cut]) {
            Ok(_) | Err(FrameError::MalformedFrame { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error at cut {}: {}", cut, other),
        }
    }

    #[test]
    fn arbitrary_bytes_decode_or_report_malformed(bytes in prop::collection::vec(any::<u8>(), 0..96)) {
        match decode(&bytes) {
            Ok(_) | Err(FrameError::MalformedFrame { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn addresses_with_tag_delimiter_rejected(head in arb_address(), tail in "[a-z]{0,4}") {
        let address = format!("{head},{tail}");
        prop_assert!(matches!(
            encode(&address, "", &[]),
            Err(FrameError::InvalidArgument(_))
        ));
    }
}
