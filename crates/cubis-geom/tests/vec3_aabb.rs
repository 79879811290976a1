use cubis_geom::{Aabb, Vec3};
use proptest::prelude::*;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-5
}

#[test]
fn vec3_ops() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(-4.0, 5.0, -6.0);
    assert_eq!(a + b, Vec3::new(-3.0, 7.0, -3.0));
    assert_eq!((a + b) - a, b);
    assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
    assert_eq!(a.min(b), Vec3::new(-4.0, 2.0, -6.0));
    assert_eq!(a.max(b), Vec3::new(1.0, 5.0, 3.0));
    assert!(approx_eq(a.dot(b), -4.0 + 10.0 - 18.0));
}

#[test]
fn cross_of_axes_is_third_axis() {
    let x = Vec3::new(1.0, 0.0, 0.0);
    let y = Vec3::new(0.0, 1.0, 0.0);
    assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn empty_aabb_grows_on_include() {
    let mut bb = Aabb::EMPTY;
    assert!(bb.is_empty());
    bb.include(Vec3::new(1.0, 2.0, 3.0));
    assert!(!bb.is_empty());
    assert_eq!(bb.min, bb.max);
    bb.include(Vec3::new(-1.0, 4.0, 0.0));
    assert_eq!(bb.min, Vec3::new(-1.0, 2.0, 0.0));
    assert_eq!(bb.max, Vec3::new(1.0, 4.0, 3.0));
    assert_eq!(bb.center(), Vec3::new(0.0, 3.0, 1.5));
}

#[test]
fn center_half_box_contains_its_center() {
    let c = Vec3::new(8.0, 8.0, 8.0);
    let bb = Aabb::from_center_half(c, 8.0);
    assert!(bb.contains(c));
    assert!(bb.contains(Vec3::ZERO));
    assert!(!bb.contains(Vec3::new(16.5, 0.0, 0.0)));
    assert_eq!(bb.extent(), Vec3::splat(16.0));
}

proptest! {
    #[test]
    fn included_points_are_contained(pts in prop::collection::vec((-1e3f32..1e3, -1e3f32..1e3, -1e3f32..1e3), 1..16)) {
        let mut bb = Aabb::EMPTY;
        for &(x, y, z) in &pts {
            bb.include(Vec3::new(x, y, z));
        }
        for &(x, y, z) in &pts {
            prop_assert!(bb.contains(Vec3::new(x, y, z)));
        }
        prop_assert!(bb.intersects(&bb));
    }
}
