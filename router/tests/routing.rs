mod common;

use common::{SLOT_X, chain, config, obstacle, slot_design};
use eda_common::geom::point::approx_eq;
use eda_router::verify;
use eda_router::{CancelToken, RouteFailure, RouterError, route, route_with_cancel};

#[test]
fn straight_connection_is_legal() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    let summary = route(&mut d.layout, &config()).unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.segments_routed, 1);
    assert!((summary.wire_length - 30.0).abs() < 1e-6);
    let top = d.layout.top_cell().unwrap();
    assert!(top.unrouted.is_empty());
    assert!(verify::run(&d.layout).unwrap().is_clean());
}

#[test]
fn detours_around_an_obstruction() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    obstacle(&mut d.layout, 0, 10.0, -10.0, 20.0, 10.0);
    let summary = route(&mut d.layout, &config()).unwrap();

    assert!(summary.is_complete(), "{:?}", summary.errors.entries());
    let top = d.layout.top_cell().unwrap();
    assert!(top.unrouted.is_empty());
    // the obstruction spans the search area on metal 1, so the route climbs
    assert!(top.wires.iter().any(|w| w.layer > 0));
    assert!(top.wires.iter().all(|w| w.net == d.net));

    let report = verify::run(&d.layout).unwrap();
    assert!(report.is_clean(), "{:?}", report);
}

#[test]
fn routing_is_deterministic() {
    let mut first = chain(&[(0.0, 0.0), (30.0, 0.0), (15.0, 20.0)]);
    obstacle(&mut first.layout, 0, 10.0, -10.0, 20.0, 10.0);
    let mut second = chain(&[(0.0, 0.0), (30.0, 0.0), (15.0, 20.0)]);
    obstacle(&mut second.layout, 0, 10.0, -10.0, 20.0, 10.0);

    let a = route(&mut first.layout, &config()).unwrap();
    let b = route(&mut second.layout, &config()).unwrap();
    assert_eq!(a.segments_routed, b.segments_routed);
    assert_eq!(
        first.layout.top_cell().unwrap().wires,
        second.layout.top_cell().unwrap().wires
    );
}

#[test]
fn blocked_port_fails_only_its_segment() {
    let mut d = chain(&[(0.0, 0.0), (20.0, 0.0), (100.0, 0.0)]);
    obstacle(&mut d.layout, 0, 96.0, -4.0, 104.0, 4.0);
    let summary = route(&mut d.layout, &config()).unwrap();

    assert_eq!(summary.segments_total, 2);
    assert_eq!(summary.segments_routed, 1);
    assert_eq!(summary.failed_nets, vec!["sig".to_string()]);
    assert_eq!(summary.errors.len(), 1);
    let entry = &summary.errors.entries()[0];
    assert_eq!(entry.net.as_deref(), Some("sig"));
    assert!(!entry.shapes.is_empty());

    // the routed pair loses its placeholder, the blocked one keeps it
    let top = d.layout.top_cell().unwrap();
    assert_eq!(top.unrouted.len(), 1);
    assert_eq!(top.unrouted[0].head, d.pins[1]);
    assert_eq!(top.unrouted[0].tail, d.pins[2]);
}

#[test]
fn cancelled_run_leaves_the_layout_untouched() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = route_with_cancel(&mut d.layout, &config(), &cancel).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.nets_attempted, 0);
    let top = d.layout.top_cell().unwrap();
    assert!(top.wires.is_empty());
    assert_eq!(top.unrouted.len(), 1);
}

#[test]
fn lone_terminal_is_reported() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    // a placeholder looping back to one port leaves a single terminal
    let top = d.layout.top_cell_mut().unwrap();
    top.unrouted[0].tail = top.unrouted[0].head;
    let summary = route(&mut d.layout, &config()).unwrap();

    assert_eq!(summary.failed_nets.len(), 1);
    assert_eq!(
        summary.errors.entries()[0].message,
        RouteFailure::NoValidTerminals(1).to_string()
    );
}

#[test]
fn unknown_strategy_is_rejected() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    let mut cfg = config();
    cfg.routing.strategy = "maze".to_string();
    let err = route(&mut d.layout, &cfg).unwrap_err();
    assert!(matches!(err, RouterError::UnknownStrategy(name) if name == "maze"));
}

#[test]
fn parallel_directions_match_sequential() {
    let mut seq = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    obstacle(&mut seq.layout, 0, 10.0, -10.0, 20.0, 10.0);
    let mut par = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    obstacle(&mut par.layout, 0, 10.0, -10.0, 20.0, 10.0);

    route(&mut seq.layout, &config()).unwrap();
    let mut cfg = config();
    cfg.routing.parallel_directions = true;
    route(&mut par.layout, &cfg).unwrap();
    assert_eq!(
        seq.layout.top_cell().unwrap().wires,
        par.layout.top_cell().unwrap().wires
    );
}

#[test]
fn shorter_reverse_route_is_kept() {
    // searching from (0, 0) overshoots the slot and backs up; from
    // (100, 40) the first jump stops right above it
    let mut d = slot_design();
    let summary = route(&mut d.layout, &config()).unwrap();

    assert!(summary.is_complete(), "{:?}", summary.errors.entries());
    assert!((summary.wire_length - 140.0).abs() < 1e-6);
    let top = d.layout.top_cell().unwrap();
    assert!(top.unrouted.is_empty());
    assert!(top.wires.iter().any(|w| {
        approx_eq(w.head_point.x, SLOT_X)
            && approx_eq(w.tail_point.x, SLOT_X)
            && approx_eq((w.head_point.y - w.tail_point.y).abs(), 40.0)
    }));
    let report = verify::run(&d.layout).unwrap();
    assert!(report.is_clean(), "{:?}", report);
}

#[test]
fn step_limit_fails_only_the_segment() {
    let mut d = chain(&[(0.0, 0.0), (30.0, 0.0)]);
    obstacle(&mut d.layout, 0, 10.0, -10.0, 20.0, 10.0);
    let mut cfg = config();
    cfg.routing.complexity_limit = 1;
    let summary = route(&mut d.layout, &cfg).unwrap();

    assert_eq!(summary.segments_routed, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(
        summary.errors.entries()[0].message,
        RouteFailure::SearchTooComplex { limit: 1 }.to_string()
    );
    let top = d.layout.top_cell().unwrap();
    assert!(top.wires.is_empty());
    assert_eq!(top.unrouted.len(), 1);
    assert_eq!((top.unrouted[0].head, top.unrouted[0].tail), (d.pins[0], d.pins[1]));
}
