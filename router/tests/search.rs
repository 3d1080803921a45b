mod common;

use common::{SLOT_WALLS, SLOT_X, single_metal};
use eda_common::geom::point::{Point, approx_eq};
use eda_common::geom::rect::Rect;
use eda_common::util::config::RoutingConfig;
use eda_common::util::generator::demo_technology;
use eda_router::algo::wavefront::{Endpoint, SearchResult, Segment, Wavefront};
use eda_router::blockage::{BlockageIndex, BlockageNet};
use eda_router::context::RoutingContext;

const NET: BlockageNet = BlockageNet(1);

fn segment(ctx: &RoutingContext, from: (f64, f64, usize), to: (f64, f64, usize)) -> Segment {
    Segment {
        from: Endpoint {
            point: Point::new(from.0, from.1),
            layer: from.2,
        },
        to: Endpoint {
            point: Point::new(to.0, to.1),
            layer: to.2,
        },
        net: NET,
        widths: ctx.widths_for(0.0),
    }
}

fn wall(index: &mut BlockageIndex, layer: usize, x0: f64, y0: f64, x1: f64, y1: f64) {
    index.add_metal(
        layer,
        Rect::new(Point::new(x0, y0), Point::new(x1, y1)),
        BlockageNet::UNCONNECTED,
    );
}

#[test]
fn open_run_is_a_single_jump() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let index = BlockageIndex::new(ctx.num_metals());
    let seg = segment(&ctx, (0.0, 0.0, 0), (1000.0, 0.0, 0));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(200_000);

    assert!(outcome.expansions <= 3);
    let SearchResult::Found(path) = outcome.result else {
        panic!("expected a path, got {:?}", outcome.result);
    };
    assert_eq!(path.vertices().len(), 2);
    assert!((path.length() - 1000.0).abs() < 1e-6);
}

#[test]
fn coincident_ends_need_no_search() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let index = BlockageIndex::new(ctx.num_metals());
    let seg = segment(&ctx, (5.0, 5.0, 1), (5.0, 5.0, 1));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(10);
    assert_eq!(outcome.expansions, 0);
    assert!(matches!(outcome.result, SearchResult::Found(_)));
}

#[test]
fn layer_change_in_place_uses_a_via() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let index = BlockageIndex::new(ctx.num_metals());
    let seg = segment(&ctx, (0.0, 0.0, 0), (0.0, 0.0, 1));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(100);

    let SearchResult::Found(path) = outcome.result else {
        panic!("expected a path");
    };
    let last = path.last().unwrap();
    assert_eq!(last.layer, 1);
    assert!(last.via.is_some());
    assert!((path.length() - 10.0).abs() < 1e-6);
}

#[test]
fn foreign_cut_blocks_the_only_via_site() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let mut index = BlockageIndex::new(ctx.num_metals());
    // cut spacing 2 plus cut size 1 keeps cuts 3 apart
    index.add_cut(0, Point::new(1.0, 0.0), BlockageNet(7));
    let seg = segment(&ctx, (0.0, 0.0, 0), (0.0, 0.0, 1));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(100);
    assert_eq!(outcome.result, SearchResult::Exhausted);
}

#[test]
fn step_limit_reports_too_complex() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let mut index = BlockageIndex::new(ctx.num_metals());
    wall(&mut index, 0, 10.0, -10.0, 20.0, 10.0);
    let seg = segment(&ctx, (0.0, 0.0, 0), (30.0, 0.0, 0));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(1);
    assert_eq!(outcome.result, SearchResult::TooComplex);
    assert_eq!(outcome.expansions, 2);
}

#[test]
fn sealed_off_target_exhausts_the_queue() {
    let ctx = RoutingContext::new(single_metal(), &RoutingConfig::default()).unwrap();
    let mut index = BlockageIndex::new(1);
    wall(&mut index, 0, 10.0, -100.0, 20.0, 100.0);
    let seg = segment(&ctx, (0.0, 0.0, 0), (30.0, 0.0, 0));
    let outcome = Wavefront::new(&ctx, &index, &seg).search(200_000);
    assert_eq!(outcome.result, SearchResult::Exhausted);
}

fn length_of(result: &SearchResult) -> f64 {
    match result {
        SearchResult::Found(path) => path.length(),
        _ => f64::INFINITY,
    }
}

#[test]
fn slot_is_only_a_jump_stop_from_the_far_end() {
    let ctx = RoutingContext::new(single_metal(), &RoutingConfig::default()).unwrap();
    let mut index = BlockageIndex::new(1);
    for (x0, y0, x1, y1) in SLOT_WALLS {
        wall(&mut index, 0, x0, y0, x1, y1);
    }
    let seg = segment(&ctx, (0.0, 0.0, 0), (100.0, 40.0, 0));
    let forward = Wavefront::new(&ctx, &index, &seg).search(200_000);
    let reversed = seg.reversed();
    let backward = Wavefront::new(&ctx, &index, &reversed).search(200_000);

    // jumps out of (0, 0) skip x = 7 and have to back up into the slot
    let SearchResult::Found(path) = &backward.result else {
        panic!("expected a path, got {:?}", backward.result);
    };
    assert!((path.length() - 140.0).abs() < 1e-6);
    assert!(path.vertices().iter().any(|v| approx_eq(v.point.x, SLOT_X)));
    assert!(length_of(&forward.result) > path.length());
}

#[test]
fn same_net_gap_blocks_a_via_until_filled() {
    let ctx = RoutingContext::new(demo_technology(), &RoutingConfig::default()).unwrap();
    let seg = segment(&ctx, (0.0, 0.0, 0), (0.0, 0.0, 1));
    // the via's metal-1 square is [-1, 1]; this pad faces it one unit away
    let pad = Rect::new(Point::new(2.0, -1.0), Point::new(4.0, 1.0));

    let mut index = BlockageIndex::new(ctx.num_metals());
    index.add_metal(0, pad, NET);
    let outcome = Wavefront::new(&ctx, &index, &seg).search(100);
    assert_eq!(outcome.result, SearchResult::Exhausted);

    // filler covering only half the facing span
    index.add_metal(0, Rect::new(Point::new(0.0, -1.0), Point::new(3.0, 0.0)), NET);
    let outcome = Wavefront::new(&ctx, &index, &seg).search(100);
    assert_eq!(outcome.result, SearchResult::Exhausted);

    index.add_metal(0, Rect::new(Point::new(0.0, -1.0), Point::new(3.0, 1.0)), NET);
    let outcome = Wavefront::new(&ctx, &index, &seg).search(100);
    let SearchResult::Found(path) = outcome.result else {
        panic!("expected a path, got {:?}", outcome.result);
    };
    assert!(path.last().unwrap().via.is_some());
}
