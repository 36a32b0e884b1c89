use chat_stream::{LineDecoder, StreamLine};

fn parse_all(body: &str) -> Vec<StreamLine> {
    let mut decoder = LineDecoder::default();
    decoder.push(body.as_bytes());
    let mut lines = drain(&mut decoder);
    lines.extend(decoder.finish());
    lines
}

fn drain(decoder: &mut LineDecoder) -> Vec<StreamLine> {
    std::iter::from_fn(|| decoder.next_line())
        .map(|line| line.expect("line within limit"))
        .collect()
}

#[test]
fn classify_recognizes_data_done_and_raw_lines() {
    let lines = parse_all(concat!(
        "data: {\"content\":\"hel\"}\n",
        "\n",
        "   \n",
        "data: [DONE]\n",
        "{\"error\":{\"code\":\"x\"}}\n",
    ));

    assert_eq!(
        lines,
        vec![
            StreamLine::Data(" {\"content\":\"hel\"}".to_owned()),
            StreamLine::Done,
            StreamLine::Raw("{\"error\":{\"code\":\"x\"}}".to_owned()),
        ]
    );
}

#[test]
fn surrounding_whitespace_is_trimmed_before_classification() {
    assert_eq!(
        StreamLine::classify("   data: [DONE]  \r"),
        Some(StreamLine::Done)
    );
    assert_eq!(
        StreamLine::classify("\tdata:{}\t"),
        Some(StreamLine::Data("{}".to_owned()))
    );
    assert_eq!(StreamLine::classify(" \t "), None);
}

#[test]
fn done_requires_the_exact_literal() {
    assert_eq!(
        StreamLine::classify("data:[DONE]"),
        Some(StreamLine::Data("[DONE]".to_owned()))
    );
    assert_eq!(
        StreamLine::classify("[DONE]"),
        Some(StreamLine::Raw("[DONE]".to_owned()))
    );
}

#[test]
fn prefix_match_is_case_sensitive() {
    assert_eq!(
        StreamLine::classify("DATA: {}"),
        Some(StreamLine::Raw("DATA: {}".to_owned()))
    );
}

#[test]
fn byte_at_a_time_feeding_matches_one_shot_parse() {
    let body = "data: {\"content\":\"a\"}\nboom\ndata: {\"content\":\"b\"}\ndata: [DONE]\n";

    let mut decoder = LineDecoder::default();
    let mut lines = Vec::new();
    for byte in body.as_bytes() {
        decoder.push(std::slice::from_ref(byte));
        lines.extend(drain(&mut decoder));
    }
    lines.extend(decoder.finish());

    assert_eq!(lines, parse_all(body));
    assert_eq!(lines.len(), 4);
}
