// [tests/mirror/libs/infra_agent_client/sse_decoder.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL DECODIFICADOR SSE
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: FRAMING data:, FRAGMENTACIÓN Y COMENTARIOS
 * =================================================================
 */

use netronome_infra_agent_client::SseFrameDecoder;

#[test]
fn single_event_payload_is_extracted() {
    let mut decoder = SseFrameDecoder::new();
    let payloads = decoder.push_chunk(b"data: {\"index\":1}\n\n");
    assert_eq!(payloads, vec!["{\"index\":1}".to_string()]);
}

#[test]
fn chunk_fragmentation_does_not_break_events() {
    // El transporte TCP puede partir la trama en cualquier byte.
    let mut decoder = SseFrameDecoder::new();

    assert!(decoder.push_chunk(b"da").is_empty());
    assert!(decoder.push_chunk(b"ta: {\"ind").is_empty());
    assert!(decoder.push_chunk(b"ex\":7}\n").is_empty());

    let payloads = decoder.push_chunk(b"\n");
    assert_eq!(payloads, vec!["{\"index\":7}".to_string()]);
}

#[test]
fn keep_alive_comments_and_foreign_fields_are_ignored() {
    let mut decoder = SseFrameDecoder::new();
    let payloads = decoder.push_chunk(
        b": keep-alive\nevent: live-data\nid: 99\nretry: 3000\ndata: {\"seconds\":5}\n\n",
    );
    assert_eq!(payloads, vec!["{\"seconds\":5}".to_string()]);
}

#[test]
fn multi_line_data_joins_with_newline() {
    let mut decoder = SseFrameDecoder::new();
    let payloads = decoder.push_chunk(b"data: first\ndata: second\n\n");
    assert_eq!(payloads, vec!["first\nsecond".to_string()]);
}

#[test]
fn crlf_line_endings_are_tolerated() {
    let mut decoder = SseFrameDecoder::new();
    let payloads = decoder.push_chunk(b"data: {\"index\":3}\r\n\r\n");
    assert_eq!(payloads, vec!["{\"index\":3}".to_string()]);
}

#[test]
fn blank_lines_without_pending_data_produce_nothing() {
    let mut decoder = SseFrameDecoder::new();
    assert!(decoder.push_chunk(b"\n\n\n").is_empty());
}

#[test]
fn consecutive_events_in_one_chunk_arrive_in_order() {
    let mut decoder = SseFrameDecoder::new();
    let payloads = decoder.push_chunk(b"data: one\n\ndata: two\n\ndata: three\n\n");
    assert_eq!(
        payloads,
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    );
}
