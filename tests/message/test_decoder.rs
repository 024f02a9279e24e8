//! Unit tests for the NDJSON stream decoder
//!
//! Tests line framing across arbitrary chunk boundaries and the handling of
//! malformed, blank and oversized lines

use std::io;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};

use text2sql_agent::message::ByteStream;
use text2sql_agent::{AgentError, AgentEvent, DecodePolicy, NdjsonDecoder, decode_stream};

fn body(chunks: &[&'static [u8]]) -> ByteStream {
    let chunks: Vec<_> = chunks
        .iter()
        .map(|c| Ok::<_, io::Error>(Bytes::from_static(c)))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

async fn collect(
    chunks: &[&'static [u8]],
    decoder: NdjsonDecoder<AgentEvent>,
) -> Vec<Result<AgentEvent, AgentError>> {
    decode_stream(body(chunks), decoder).collect().await
}

fn delta(iteration: u32, section: &str, text: &str) -> AgentEvent {
    AgentEvent::SectionDelta {
        iteration,
        section: section.to_string(),
        delta: text.to_string(),
    }
}

const TWO_EVENTS: &str = concat!(
    r#"{"event":"section_delta","iteration":1,"section":"reasoning","delta":"Find né"}"#,
    "\n",
    r#"{"event":"error","message":"boom"}"#,
    "\n"
);

#[tokio::test]
async fn test_events_independent_of_chunk_boundaries() {
    let expected = vec![
        delta(1, "reasoning", "Find né"),
        AgentEvent::Error {
            message: Some("boom".to_string()),
        },
    ];

    // Every split point, including ones inside the multi-byte character
    let bytes = TWO_EVENTS.as_bytes();
    for split in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(split);
        let events: Vec<_> = collect(&[head, tail], NdjsonDecoder::default())
            .await
            .into_iter()
            .map(|e| e.expect("decode"))
            .collect();
        assert_eq!(events, expected, "split at byte {split}");
    }
}

#[tokio::test]
async fn test_byte_at_a_time() {
    let chunks: Vec<&'static [u8]> = TWO_EVENTS.as_bytes().chunks(1).collect();
    let events = collect(&chunks, NdjsonDecoder::default()).await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_blank_lines_and_crlf() {
    let events = collect(
        &[b"\n\r\n   \n{\"event\":\"token\",\"token\":\"a\"}\r\n\n{\"event\":\"token\",\"token\":\"b\"}\n"],
        NdjsonDecoder::default(),
    )
    .await;

    let tokens: Vec<_> = events
        .into_iter()
        .map(|e| match e.expect("decode") {
            AgentEvent::Token { token, .. } => token,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(tokens, vec!["a", "b"]);
}

#[tokio::test]
async fn test_final_line_without_newline() {
    let events = collect(
        &[br#"{"event":"token","token":"a"}"#, b"\n", br#"{"event":"completed"}"#],
        NdjsonDecoder::default(),
    )
    .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[1].as_ref().expect("decode"),
        AgentEvent::Completed { .. }
    ));
}

#[tokio::test]
async fn test_lenient_skips_malformed_lines() {
    let events = collect(
        &[
            b"not json\n",
            b"[1,2,3]\n",
            b"{\"no_event\":true}\n",
            b"{\"event\":\"mystery\"}\n",
            b"{\"event\":\"section_delta\",\"iteration\":1}\n",
            b"{\"event\":\"token\",\"token\":\"ok\"}\n",
        ],
        NdjsonDecoder::default(),
    )
    .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].as_ref().expect("decode"),
        AgentEvent::Token { token, .. } if token == "ok"
    ));
}

#[test]
fn test_dropped_counter() {
    let mut decoder = NdjsonDecoder::<AgentEvent>::default();
    let mut buf = BytesMut::from(&b"garbage\n{\"event\":\"token\",\"token\":\"x\"}\n{oops\n"[..]);

    let first = decoder.decode(&mut buf).expect("decode");
    assert!(matches!(first, Some(AgentEvent::Token { .. })));
    assert_eq!(decoder.dropped(), 1);

    assert!(decoder.decode(&mut buf).expect("decode").is_none());
    assert_eq!(decoder.dropped(), 2);
    assert!(buf.is_empty());
}

#[test]
fn test_partial_line_waits_for_more_bytes() {
    let mut decoder = NdjsonDecoder::<AgentEvent>::default();
    let mut buf = BytesMut::from(&b"{\"event\":\"tok"[..]);
    assert!(decoder.decode(&mut buf).expect("decode").is_none());
    assert_eq!(decoder.dropped(), 0);

    buf.extend_from_slice(b"en\",\"token\":\"t\"}\n");
    assert!(matches!(
        decoder.decode(&mut buf).expect("decode"),
        Some(AgentEvent::Token { .. })
    ));
}

#[tokio::test]
async fn test_strict_fails_on_malformed_line() {
    let events = collect(
        &[b"{\"event\":\"token\",\"token\":\"a\"}\nnot json\n"],
        NdjsonDecoder::new(1024, DecodePolicy::Strict),
    )
    .await;

    assert!(events[0].is_ok());
    match &events[1] {
        Err(AgentError::MessageParse { line, .. }) => {
            assert_eq!(line.as_deref(), Some("not json"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_line_is_skipped() {
    let long = format!(
        "{{\"event\":\"token\",\"token\":\"{}\"}}\n",
        "x".repeat(200)
    );
    let long: &'static str = Box::leak(long.into_boxed_str());
    let (a, b) = long.as_bytes().split_at(100);

    let events = collect(
        &[a, b, b"{\"event\":\"token\",\"token\":\"short\"}\n"],
        NdjsonDecoder::new(64, DecodePolicy::Lenient),
    )
    .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].as_ref().expect("decode"),
        AgentEvent::Token { token, .. } if token == "short"
    ));
}

#[tokio::test]
async fn test_oversized_line_strict() {
    let events = collect(
        &[b"{\"event\":\"token\",\"token\":\"0123456789012345678901234567890123456789\"}\n"],
        NdjsonDecoder::new(16, DecodePolicy::Strict),
    )
    .await;

    assert!(matches!(
        events.first(),
        Some(Err(AgentError::MessageParse { .. }))
    ));
}

#[tokio::test]
async fn test_body_error_surfaces_as_io() {
    let body: ByteStream = Box::pin(futures::stream::iter(vec![
        Ok(Bytes::from_static(b"{\"event\":\"token\",\"token\":\"a\"}\n")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
    ]));

    let events: Vec<_> = decode_stream::<AgentEvent>(body, NdjsonDecoder::default())
        .collect()
        .await;

    assert!(events[0].is_ok());
    assert!(matches!(events[1], Err(AgentError::Io(_))));
}

#[tokio::test]
async fn test_framed_over_async_read() {
    let reader = tokio_test::io::Builder::new()
        .read(b"{\"event\":\"phase\",\"phase\":\"thin")
        .read(b"king\",\"iteration\":1}\n{\"event\":\"comp")
        .read(b"leted\"}\n")
        .build();

    let events: Vec<_> = FramedRead::new(reader, NdjsonDecoder::<AgentEvent>::default())
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_ref().unwrap().iteration(), Some(1));
    assert!(events[1].as_ref().unwrap().is_terminal());
}
