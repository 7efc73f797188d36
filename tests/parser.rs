use perft_bisect::perft::{parse_lines, parse_text, PerftParser, PerftResult};
use perft_bisect::{BisectError, ProtocolFault};
use pretty_assertions::assert_eq;

const STOCKFISH_DIVIDE: &str = "\
a2a3: 380
b2b3: 420
g1f3: 440

Nodes searched: 1240
";

#[test]
fn parses_moves_and_nodes_searched_total() {
    let parsed = parse_text(STOCKFISH_DIVIDE);
    assert!(parsed.terminated);
    assert_eq!(parsed.result, PerftResult::from_counts([("a2a3", 380), ("b2b3", 420), ("g1f3", 440)]));
}

#[test]
fn total_phrasing_is_accepted_and_not_taken_as_a_move() {
    let parsed = parse_text("e2e4: 20\nd2d4: 19\nTotal: 39\n");
    assert!(parsed.terminated);
    assert_eq!(parsed.result.total, 39);
    assert_eq!(parsed.clone().into_result("A").unwrap().total, 39);
    assert_eq!(parsed.result.move_counts.len(), 2);
    assert!(!parsed.result.move_counts.contains_key("Total"));
}

#[test]
fn error_and_malformed_lines_are_ignored() {
    let text = "info string Error: bad: 3\nid name x\nfoo:bar:1\ne2e4: many\n\n  d2d4 :  7  \nNodes searched: 7\n";
    let parsed = parse_text(text);
    assert_eq!(parsed.result.move_counts.into_iter().collect::<Vec<_>>(), vec![("d2d4".to_string(), 7)]);
}

#[test]
fn unparsable_total_is_zero_but_terminates() {
    let parsed = parse_text("e2e4: 1\nNodes searched: lots\n");
    assert!(parsed.terminated);
    assert_eq!(parsed.result.total, 0);
    assert_eq!(parsed.result.count("e2e4"), 1);
}

#[test]
fn stream_end_without_marker_is_unterminated() {
    let parsed = parse_text("e2e4: 20\nd2d4: 20\n");
    assert!(!parsed.terminated);
    assert_eq!(parsed.result.total, 0);
    assert_eq!(parsed.result.move_counts.len(), 2);
    let err = parsed.into_result("B").unwrap_err();
    assert!(err.is_tooling_fault());
    assert!(matches!(err, BisectError::Protocol(ProtocolFault::Unterminated { ref engine }) if engine == "B"));
}

#[test]
fn stops_at_marker_without_consuming_further_lines() {
    let lines = vec!["e2e4: 1", "Nodes searched: 1", "readyok", "d2d4: 1"];
    let mut iter = lines.into_iter();
    let parsed = parse_lines(iter.by_ref());
    assert_eq!(parsed.result.total, 1);
    assert_eq!(iter.next(), Some("readyok"));
}

#[test]
fn incremental_parser_ignores_lines_after_completion() {
    let mut p = PerftParser::new();
    assert!(!p.feed("a2a3: 1"));
    assert!(p.feed("Nodes searched: 1"));
    assert!(p.feed("b2b3: 1"));
    assert!(p.is_done());
    assert_eq!(p.finish().result.move_counts.len(), 1);
}

#[test]
fn reparsing_is_idempotent() {
    let first = parse_text(STOCKFISH_DIVIDE);
    let second = parse_text(STOCKFISH_DIVIDE);
    assert_eq!(first, second);
    let rendered = first.result.to_divide_text();
    assert_eq!(parse_text(&rendered).result, first.result);
}
