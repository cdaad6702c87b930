use crate::geometry::Rect;

#[test]
fn new_normalizes_corner_order() {
    let r = Rect::new(10, 20, 2, 4);
    assert_eq!(r, Rect::new(2, 4, 10, 20));
    assert!(r.x1 <= r.x2 && r.y1 <= r.y2);
}

#[test]
fn from_quad_uses_first_and_third_points() {
    let quad = [(3, 4), (20, 4), (20, 12), (3, 12)];
    assert_eq!(Rect::from_quad(quad), Rect::new(3, 4, 20, 12));
}

#[test]
fn center_and_dimensions() {
    let r = Rect::new(0, 0, 10, 20);
    assert_eq!(r.width(), 10);
    assert_eq!(r.height(), 20);
    assert_eq!(r.center(), (5, 10));
}

#[test]
fn contains_is_inclusive_of_edges() {
    let r = Rect::new(5, 5, 10, 10);
    assert!(r.contains(5, 5));
    assert!(r.contains(10, 10));
    assert!(r.contains(7, 8));
    assert!(!r.contains(4, 7));
    assert!(!r.contains(7, 11));
}

#[test]
fn expand_clamps_low_edges_at_zero() {
    let r = Rect::new(2, 3, 10, 10).expand(5);
    assert_eq!(r, Rect::new(0, 0, 15, 15));
}

#[test]
fn clamp_to_bounds_high_edges() {
    let r = Rect::new(90, 90, 120, 130).clamp_to(100, 100);
    assert_eq!(r, Rect::new(90, 90, 100, 100));
}

#[test]
fn translate_moves_both_corners() {
    let r = Rect::new(1, 2, 3, 4).translate(10, 20);
    assert_eq!(r, Rect::new(11, 22, 13, 24));
}
