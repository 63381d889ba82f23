//! Property tests: hostile or garbled input must never panic the parsing
//! path, and recognizable lines keep parsing when wrapped in noise.

use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

use perch_irc::{parse_line, EventKind, LineCodec};

proptest! {
    #[test]
    fn parse_line_never_panics(line in "\\PC*", nick in "[A-Za-z][A-Za-z0-9_]{0,15}") {
        let _ = parse_line(&line, &nick);
    }

    #[test]
    fn parse_line_never_panics_on_colon_soup(
        parts in proptest::collection::vec("[:@!# ]{0,3}[a-zA-Z0-9]{0,8}", 0..8)
    ) {
        let line = parts.join(" ");
        let _ = parse_line(&line, "perch");
    }

    #[test]
    fn codec_never_panics_and_consumes_terminated_input(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&bytes[..]);
        buf.extend_from_slice(b"\r\n");
        let mut lines = 0usize;
        while let Ok(Some(_)) = codec.decode(&mut buf) {
            lines += 1;
        }
        // Terminated input always yields at least one line, and nothing
        // past the last terminator is consumed.
        prop_assert!(lines >= 1);
        prop_assert!(!buf.iter().any(|&b| b == b'\n'));
    }

    #[test]
    fn privmsg_text_survives_arbitrary_payload(text in "[^\r\n\0]{1,64}") {
        let line = format!(":alice!a@host PRIVMSG #lab :{text}");
        match parse_line(&line, "perch") {
            Some(EventKind::Privmsg { nick, target, text: parsed }) => {
                prop_assert_eq!(nick, "alice");
                prop_assert_eq!(target, "#lab");
                prop_assert_eq!(parsed, text);
            }
            other => prop_assert!(false, "expected Privmsg, got {:?}", other),
        }
    }

    #[test]
    fn mode_deltas_never_panic(
        modestring in "[+\\-ovbkl]{0,10}",
        nicks in proptest::collection::vec("[a-z]{1,8}", 0..4)
    ) {
        let line = format!(":oper!o@host MODE #lab {modestring} {}", nicks.join(" "));
        let _ = parse_line(&line, "perch");
    }
}
