//! Property-based tests for envelope framing.

use courier_proto::{
    Envelope, Message, MessageId, PushEvent, Request, UserId,
    wire::{LENGTH_PREFIX_SIZE, body_len},
};
use proptest::prelude::*;

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        proptest::option::of(".{0,64}"),
        proptest::option::of("[a-z]{1,16}"),
        any::<u64>(),
    )
        .prop_map(|(id, sender, receiver, text, image, ts)| Message {
            id: MessageId(id),
            sender: UserId(sender),
            receiver: UserId(receiver),
            text,
            image: image.map(|name| format!("mem://images/{name}")),
            created_at_ms: ts,
            updated_at_ms: ts,
        })
}

fn envelope_strategy() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        any::<u64>().prop_map(|id| Envelope::Hello { user: UserId(id) }),
        (any::<u64>(), any::<u64>()).prop_map(|(request_id, peer)| Envelope::Request {
            request_id,
            request: Request::FetchConversation { peer: UserId(peer) },
        }),
        message_strategy().prop_map(|m| Envelope::Event(PushEvent::MessageCreated(m))),
        any::<u64>().prop_map(|id| Envelope::Event(PushEvent::MessageDeleted(MessageId(id)))),
    ]
}

proptest! {
    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        // Must return an error or a value, never panic.
        let _ = Envelope::decode(&bytes);
    }

    #[test]
    fn encode_decode_identity(envelope in envelope_strategy()) {
        let mut buf = Vec::new();
        envelope.encode(&mut buf).unwrap();

        prop_assert_eq!(body_len(&buf).unwrap(), buf.len() - LENGTH_PREFIX_SIZE);
        prop_assert_eq!(Envelope::decode(&buf).unwrap(), envelope);
    }

    #[test]
    fn decode_rejects_any_truncation(envelope in envelope_strategy(), cut in 1usize..8) {
        let mut buf = Vec::new();
        envelope.encode(&mut buf).unwrap();

        let keep = buf.len().saturating_sub(cut);
        prop_assert!(Envelope::decode(&buf[..keep]).is_err());
    }
}
