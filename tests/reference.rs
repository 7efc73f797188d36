use cozy_chess::{Color, Square};
use perft_bisect::bisect::SessionOutcome;
use perft_bisect::positions::{GameState, KIWIPETE_FEN, STARTPOS_FEN};
use perft_bisect::reference::{divide, perft, ReferenceBoard, ReferenceEngine, ReferenceOptions};
use perft_bisect::{run_session, BisectError, ProtocolFault};
use pretty_assertions::assert_eq;

#[test]
fn divide_total_is_bulk_perft_and_sum_of_moves() {
    for fen in [STARTPOS_FEN, KIWIPETE_FEN] {
        let pos = ReferenceBoard::from_fen(fen).expect("valid fen");
        for depth in 1..=3 {
            let d = divide(&pos, depth, &ReferenceOptions::default());
            assert_eq!(d.total, perft(pos.board(), depth), "{fen} depth {depth}");
            assert_eq!(d.total, d.move_counts.values().sum::<u64>());
        }
    }
    assert_eq!(divide(&ReferenceBoard::startpos(), 3, &ReferenceOptions::default()).total, 8902);
}

#[test]
fn divide_at_depth_zero_counts_the_position_itself() {
    let d = divide(&ReferenceBoard::startpos(), 0, &ReferenceOptions::default());
    assert_eq!(d.total, 1);
    assert!(d.move_counts.is_empty());
}

#[test]
fn kiwipete_divide_uses_standard_castling_tokens() {
    let pos = ReferenceBoard::from_fen(KIWIPETE_FEN).expect("valid fen");
    let d1 = divide(&pos, 1, &ReferenceOptions::default());
    assert_eq!(d1.total, 48);
    assert!(d1.move_counts.contains_key("e1g1"));
    assert!(d1.move_counts.contains_key("e1c1"));
    assert!(!d1.move_counts.contains_key("e1h1"));
    assert_eq!(divide(&pos, 2, &ReferenceOptions::default()).total, 2039);
}

#[test]
fn threaded_divide_matches_serial() {
    let pos = ReferenceBoard::from_fen(KIWIPETE_FEN).expect("valid fen");
    let serial = divide(&pos, 2, &ReferenceOptions::default());
    let opts = ReferenceOptions { threads: 4, ..ReferenceOptions::default() };
    assert_eq!(divide(&pos, 2, &opts), serial);
}

#[test]
fn game_state_replays_onto_its_root() {
    let state = GameState::new(KIWIPETE_FEN).extended("e1g1").extended("h3g2");
    let pos = ReferenceBoard::from_state(&state).expect("legal chain");
    assert_eq!(pos.board().side_to_move(), Color::White);
    // castling token moved the king to g1, not onto the rook
    assert_eq!(pos.board().king(Color::White), Square::G1);
    assert_eq!(divide(&pos, 1, &ReferenceOptions::default()).total, perft(pos.board(), 1));
}

#[test]
fn game_state_with_illegal_move_is_rejected() {
    let state = GameState::with_moves(STARTPOS_FEN, vec!["e2e4".to_string(), "e2e4".to_string()]);
    let err = ReferenceBoard::from_state(&state).unwrap_err();
    assert!(err.contains("e2e4"), "{err}");
}

#[test]
fn hidden_move_disappears_at_every_ply() {
    let pos = ReferenceBoard::startpos();
    let hidden = divide(&pos, 2, &ReferenceOptions::hiding(["e7e5"]));
    assert_eq!(hidden.total, 380);
    assert!(hidden.move_counts.values().all(|&n| n == 19));
}

#[test]
fn in_process_bisection_finds_hidden_reply() {
    let mut a = ReferenceEngine::new("reference", ReferenceOptions::default());
    let mut b = ReferenceEngine::new("buggy", ReferenceOptions::hiding(["e7e5"]));
    let outcome = run_session(&mut a, &mut b, STARTPOS_FEN, 2).unwrap();
    let SessionOutcome::Divergence(report) = outcome else { panic!("expected divergence") };
    assert_eq!(report.move_chain, vec!["a2a3", "e7e5"]);
    assert_eq!((report.trail[0].total_a, report.trail[0].total_b), (400, 380));
    assert_eq!((report.trail[1].total_a, report.trail[1].total_b), (20, 19));
    assert_eq!((a.requests(), b.requests()), (2, 2));
    assert_eq!((a.terminations(), b.terminations()), (1, 1));
}

#[test]
fn identical_generators_agree() {
    let mut a = ReferenceEngine::new("a", ReferenceOptions::default());
    let mut b = ReferenceEngine::new("b", ReferenceOptions::default());
    let outcome = run_session(&mut a, &mut b, KIWIPETE_FEN, 2).unwrap();
    assert_eq!(outcome, SessionOutcome::NoDivergence { depth: 2, total: 2039 });
}

#[test]
fn missing_root_move_followed_deeper_hits_agreement_fault() {
    // e1c1 is absent for B only at the root; one ply further down both agree again
    let mut a = ReferenceEngine::new("a", ReferenceOptions::default());
    let mut b = ReferenceEngine::new("b", ReferenceOptions::hiding(["e1c1"]));
    let err = run_session(&mut a, &mut b, KIWIPETE_FEN, 2).unwrap_err();
    match err {
        BisectError::Protocol(ProtocolFault::UnexpectedAgreement { depth, chain, .. }) => {
            assert_eq!(depth, 1);
            assert_eq!(chain, vec!["e1c1"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}
