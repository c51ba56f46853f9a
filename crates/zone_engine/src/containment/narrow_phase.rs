//! Narrow-phase overlap tests between placed convex shapes
//!
//! Box-box uses the separating axis test over the 15 candidate axes,
//! sphere cases use closest points, and any pairing involving a hull falls
//! back to a boolean GJK on the Minkowski difference. Touching shapes count
//! as overlapping.

use crate::foundation::math::{abs_matrix, Frame, Vec3, EPSILON};
use crate::geometry::{Shape, Volume};

const GJK_MAX_ITERATIONS: usize = 64;

/// Borrowed shape with its world placement
#[derive(Debug, Clone, Copy)]
pub struct ConvexRef<'a> {
    /// World placement
    pub frame: &'a Frame,
    /// Local-space shape
    pub shape: &'a Shape,
}

impl<'a> ConvexRef<'a> {
    /// Pair a shape with its frame
    pub fn new(frame: &'a Frame, shape: &'a Shape) -> Self {
        Self { frame, shape }
    }

    /// World-space centre
    pub fn center(&self) -> Vec3 {
        self.frame.position
    }

    /// Farthest world point along a world direction
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.frame.inverse_transform_vector(direction);
        self.frame.transform_point(self.shape.support_local(local))
    }
}

impl<'a> From<&'a Volume> for ConvexRef<'a> {
    fn from(volume: &'a Volume) -> Self {
        Self::new(&volume.frame, &volume.shape)
    }
}

/// Whether two placed shapes share at least one point
pub fn overlaps(a: ConvexRef<'_>, b: ConvexRef<'_>) -> bool {
    match (a.shape, b.shape) {
        (Shape::Ball { radius: ra }, Shape::Ball { radius: rb }) => {
            let reach = ra + rb;
            (a.center() - b.center()).norm_squared() <= reach * reach
        }
        (Shape::Ball { radius }, Shape::Cuboid { half_extents }) => {
            sphere_box(a.center(), *radius, b.frame, *half_extents)
        }
        (Shape::Cuboid { half_extents }, Shape::Ball { radius }) => {
            sphere_box(b.center(), *radius, a.frame, *half_extents)
        }
        (Shape::Cuboid { half_extents: ha }, Shape::Cuboid { half_extents: hb }) => {
            box_box(a.frame, *ha, b.frame, *hb)
        }
        _ => gjk_intersects(&a, &b),
    }
}

/// Whether a world point lies inside an oriented box
pub fn box_contains_point(frame: &Frame, half_extents: Vec3, point: Vec3) -> bool {
    let local = frame.inverse_transform_point(point);
    local.x.abs() <= half_extents.x + EPSILON
        && local.y.abs() <= half_extents.y + EPSILON
        && local.z.abs() <= half_extents.z + EPSILON
}

fn sphere_box(center: Vec3, radius: f32, frame: &Frame, half_extents: Vec3) -> bool {
    let local = frame.inverse_transform_point(center);
    let closest = local.zip_map(&half_extents, |p, h| p.clamp(-h, h));
    (local - closest).norm_squared() <= radius * radius
}

/// Separating axis test for two oriented boxes
fn box_box(a: &Frame, ha: Vec3, b: &Frame, hb: Vec3) -> bool {
    let basis_a = a.basis();
    // r[(i, j)] = A_i · B_j
    let r = basis_a.transpose() * b.basis();
    // Epsilon keeps near-parallel edge pairs from producing a false separating axis
    let abs_r = abs_matrix(&r).add_scalar(EPSILON);
    let t = basis_a.transpose() * (b.position - a.position);

    for i in 0..3 {
        let ra = ha[i];
        let rb = hb[0] * abs_r[(i, 0)] + hb[1] * abs_r[(i, 1)] + hb[2] * abs_r[(i, 2)];
        if t[i].abs() > ra + rb {
            return false;
        }
    }

    for j in 0..3 {
        let ra = ha[0] * abs_r[(0, j)] + ha[1] * abs_r[(1, j)] + ha[2] * abs_r[(2, j)];
        let rb = hb[j];
        let distance = t[0] * r[(0, j)] + t[1] * r[(1, j)] + t[2] * r[(2, j)];
        if distance.abs() > ra + rb {
            return false;
        }
    }

    for i in 0..3 {
        let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
        for j in 0..3 {
            let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
            let ra = ha[i1] * abs_r[(i2, j)] + ha[i2] * abs_r[(i1, j)];
            let rb = hb[j1] * abs_r[(i, j2)] + hb[j2] * abs_r[(i, j1)];
            let distance = t[i2] * r[(i1, j)] - t[i1] * r[(i2, j)];
            if distance.abs() > ra + rb {
                return false;
            }
        }
    }

    true
}

/// Simplex with the newest point first
struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Simplex {
    fn new() -> Self {
        Self {
            points: [Vec3::zeros(); 4],
            len: 0,
        }
    }

    fn push_front(&mut self, point: Vec3) {
        self.points = [point, self.points[0], self.points[1], self.points[2]];
        self.len = (self.len + 1).min(4);
    }

    fn set(&mut self, points: &[Vec3]) {
        self.points[..points.len()].copy_from_slice(points);
        self.len = points.len();
    }

    /// Reduce to the feature nearest the origin and pick the next search
    /// direction; true once the origin is enclosed
    fn evolve(&mut self, direction: &mut Vec3) -> bool {
        match self.len {
            2 => self.line(direction),
            3 => self.triangle(direction),
            4 => self.tetrahedron(direction),
            _ => false,
        }
    }

    fn line(&mut self, direction: &mut Vec3) -> bool {
        let [a, b, ..] = self.points;
        let ab = b - a;
        let ao = -a;
        if ab.dot(&ao) > 0.0 {
            *direction = ab.cross(&ao).cross(&ab);
        } else {
            self.set(&[a]);
            *direction = ao;
        }
        false
    }

    fn triangle(&mut self, direction: &mut Vec3) -> bool {
        let [a, b, c, _] = self.points;
        let ab = b - a;
        let ac = c - a;
        let ao = -a;
        let abc = ab.cross(&ac);

        if abc.cross(&ac).dot(&ao) > 0.0 {
            if ac.dot(&ao) > 0.0 {
                self.set(&[a, c]);
                *direction = ac.cross(&ao).cross(&ac);
            } else {
                self.set(&[a, b]);
                return self.line(direction);
            }
        } else if ab.cross(&abc).dot(&ao) > 0.0 {
            self.set(&[a, b]);
            return self.line(direction);
        } else if abc.dot(&ao) > 0.0 {
            *direction = abc;
        } else {
            self.set(&[a, c, b]);
            *direction = -abc;
        }
        false
    }

    fn tetrahedron(&mut self, direction: &mut Vec3) -> bool {
        let [a, b, c, d] = self.points;
        let ab = b - a;
        let ac = c - a;
        let ad = d - a;
        let ao = -a;

        if ab.cross(&ac).dot(&ao) > 0.0 {
            self.set(&[a, b, c]);
            return self.triangle(direction);
        }
        if ac.cross(&ad).dot(&ao) > 0.0 {
            self.set(&[a, c, d]);
            return self.triangle(direction);
        }
        if ad.cross(&ab).dot(&ao) > 0.0 {
            self.set(&[a, d, b]);
            return self.triangle(direction);
        }
        true
    }
}

/// Boolean GJK on the Minkowski difference `a - b`
fn gjk_intersects(a: &ConvexRef<'_>, b: &ConvexRef<'_>) -> bool {
    let support = |direction: Vec3| a.support(direction) - b.support(-direction);

    let mut direction = a.center() - b.center();
    if direction.norm_squared() <= f32::EPSILON {
        direction = Vec3::x();
    }

    let mut simplex = Simplex::new();
    let first = support(direction);
    simplex.push_front(first);
    direction = -first;

    for _ in 0..GJK_MAX_ITERATIONS {
        // Origin lies on the current simplex
        if direction.norm_squared() <= EPSILON * EPSILON {
            return true;
        }
        let point = support(direction);
        if point.dot(&direction) < 0.0 {
            return false;
        }
        simplex.push_front(point);
        if simplex.evolve(&mut direction) {
            return true;
        }
    }

    // Still oscillating on the boundary: shapes are touching within tolerance
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;

    fn hull_cube(size: f32) -> Shape {
        let h = size / 2.0;
        let mut vertices = Vec::new();
        for x in [-h, h] {
            for y in [-h, h] {
                for z in [-h, h] {
                    vertices.push(Vec3::new(x, y, z));
                }
            }
        }
        Shape::hull(vertices).unwrap()
    }

    #[test]
    fn test_box_box_axis_aligned() {
        let a = Frame::at(0.0, 0.0, 0.0);
        let near = Frame::at(1.9, 0.0, 0.0);
        let far = Frame::at(2.1, 0.0, 0.0);
        let h = Vec3::new(1.0, 1.0, 1.0);
        assert!(box_box(&a, h, &near, h));
        assert!(!box_box(&a, h, &far, h));
    }

    #[test]
    fn test_box_box_rotated_edge_case() {
        // A box rotated 45° about Z reaches sqrt(2) along X
        let a = Frame::at(0.0, 0.0, 0.0);
        let rotated = Frame::from_position_rotation(
            Vec3::new(2.3, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4),
        );
        let h = Vec3::new(1.0, 1.0, 1.0);
        assert!(box_box(&a, h, &rotated, h));
        let moved = Frame { position: Vec3::new(2.5, 0.0, 0.0), ..rotated };
        assert!(!box_box(&a, h, &moved, h));
    }

    #[test]
    fn test_sphere_box_corner() {
        let frame = Frame::identity();
        let h = Vec3::new(1.0, 1.0, 1.0);
        // Corner at (1,1,1); distance from (2,2,2) is sqrt(3)
        assert!(sphere_box(Vec3::new(2.0, 2.0, 2.0), 1.8, &frame, h));
        assert!(!sphere_box(Vec3::new(2.0, 2.0, 2.0), 1.7, &frame, h));
    }

    #[test]
    fn test_gjk_hull_against_box_and_ball() {
        let hull = hull_cube(2.0);
        let cube = Shape::cuboid(Vec3::new(2.0, 2.0, 2.0));
        let ball = Shape::ball(0.5);
        let origin = Frame::identity();

        let touching = Frame::at(1.9, 0.3, -0.2);
        let apart = Frame::at(2.2, 0.0, 0.0);
        assert!(overlaps(ConvexRef::new(&origin, &hull), ConvexRef::new(&touching, &cube)));
        assert!(!overlaps(ConvexRef::new(&origin, &hull), ConvexRef::new(&apart, &cube)));

        let ball_in = Frame::at(1.3, 0.0, 0.0);
        let ball_out = Frame::at(1.7, 0.0, 0.0);
        assert!(overlaps(ConvexRef::new(&origin, &hull), ConvexRef::new(&ball_in, &ball)));
        assert!(!overlaps(ConvexRef::new(&origin, &hull), ConvexRef::new(&ball_out, &ball)));
    }

    #[test]
    fn test_gjk_contained_and_concentric() {
        let big = hull_cube(10.0);
        let small = hull_cube(1.0);
        let origin = Frame::identity();
        let offset = Frame::at(2.0, -1.0, 3.0);
        assert!(overlaps(ConvexRef::new(&origin, &big), ConvexRef::new(&origin, &small)));
        assert!(overlaps(ConvexRef::new(&origin, &big), ConvexRef::new(&offset, &small)));
    }

    #[test]
    fn test_gjk_agrees_with_sat_for_boxes() {
        let hull = hull_cube(2.0);
        let cube = Shape::cuboid(Vec3::new(2.0, 2.0, 2.0));
        let origin = Frame::identity();
        for step in 0..40 {
            let x = step as f32 * 0.1;
            let frame = Frame::from_position_rotation(
                Vec3::new(x, 0.4, 0.0),
                Quat::from_axis_angle(&Vec3::y_axis(), 0.3),
            );
            let sat = box_box(&origin, Vec3::new(1.0, 1.0, 1.0), &frame, Vec3::new(1.0, 1.0, 1.0));
            let gjk = gjk_intersects(&ConvexRef::new(&origin, &hull), &ConvexRef::new(&frame, &cube));
            // Allow disagreement only right at the contact distance
            let contact = 1.0 + 0.3_f32.cos() + 0.3_f32.sin();
            if (x - contact).abs() > 0.05 {
                assert_eq!(sat, gjk, "x = {x}");
            }
        }
    }
}
