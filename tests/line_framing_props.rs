// tests/line_framing_props.rs

use proptest::prelude::*;

use capture::capture::LineFramer;

// Lines with no terminator bytes of their own, plus a choice of `\n` or
// `\r\n` as the ending for each.
fn lines_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
    proptest::collection::vec(("[a-zA-Z0-9 ,.éß世]{0,24}", any::<bool>()), 0..40)
}

fn encode(lines: &[(String, bool)], tail: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (line, crlf) in lines {
        bytes.extend_from_slice(line.as_bytes());
        if *crlf {
            bytes.push(b'\r');
        }
        bytes.push(b'\n');
    }
    bytes.extend_from_slice(tail.as_bytes());
    bytes
}

// Cut `bytes` at the given (unsorted, possibly repeated) offsets.
fn split_at_offsets(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut offsets: Vec<usize> = cuts
        .iter()
        .map(|c| if bytes.is_empty() { 0 } else { c % (bytes.len() + 1) })
        .collect();
    offsets.sort_unstable();

    let mut chunks = Vec::new();
    let mut start = 0;
    for end in offsets {
        chunks.push(bytes[start..end].to_vec());
        start = end;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

proptest! {
    #[test]
    fn chunking_never_changes_the_framed_lines(
        lines in lines_strategy(),
        tail in "[a-z]{0,8}",
        cuts in proptest::collection::vec(any::<usize>(), 0..30),
    ) {
        let bytes = encode(&lines, &tail);

        let mut framer = LineFramer::new();
        let mut framed = Vec::new();
        for chunk in split_at_offsets(&bytes, &cuts) {
            framed.extend(framer.push(&chunk));
        }

        let expected: Vec<String> = lines.iter().map(|(l, _)| l.clone()).collect();
        prop_assert_eq!(framed, expected);
        prop_assert_eq!(framer.residual(), tail.as_bytes());

        let last = framer.finish();
        if tail.is_empty() {
            prop_assert_eq!(last, None);
        } else {
            prop_assert_eq!(last, Some(tail.clone()));
        }
        prop_assert!(framer.residual().is_empty());
    }

    #[test]
    fn mixed_terminators_frame_the_same_under_any_chunking(
        bytes in proptest::collection::vec(
            prop_oneof![
                Just(b'a'),
                Just(b'\n'),
                Just(b'\r'),
                Just(b'\0'),
                Just(0xE2u8),
                Just(0x80u8),
                Just(0xA9u8),
            ],
            0..512,
        ),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let mut whole = LineFramer::new();
        let mut expected = whole.push(&bytes);
        expected.extend(whole.end_of_input());

        let mut framer = LineFramer::new();
        let mut framed = Vec::new();
        for chunk in split_at_offsets(&bytes, &cuts) {
            framed.extend(framer.push(&chunk));
        }
        framed.extend(framer.end_of_input());

        prop_assert_eq!(framed, expected);
        prop_assert_eq!(framer.residual(), whole.residual());
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        bytes in proptest::collection::vec(any::<u8>(), 0..2048),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let mut framer = LineFramer::new();
        for chunk in split_at_offsets(&bytes, &cuts) {
            framer.push(&chunk);
        }
        framer.end_of_input();
        framer.finish();
        prop_assert!(framer.residual().is_empty());
    }
}
