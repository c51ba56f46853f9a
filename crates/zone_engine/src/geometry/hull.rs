//! Convex hulls built from a vertex cloud
//!
//! Supporting planes are found once at construction by testing every vertex
//! triple; hulls are small (tens of vertices) so the cubic search is paid
//! only when geometry is captured, never during evaluation.

use serde::{Deserialize, Serialize};

use crate::error::{ZoneError, ZoneResult};
use crate::foundation::math::Vec3;

/// Upper bound on hull vertices accepted at construction
pub const MAX_HULL_VERTICES: usize = 64;

/// Oriented plane `normal · p = offset`, normal pointing out of the hull
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HullPlane {
    /// Outward unit normal
    pub normal: Vec3,
    /// Signed distance of the plane from the local origin
    pub offset: f32,
}

impl HullPlane {
    /// Signed distance of a point from the plane, positive outside
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) - self.offset
    }
}

/// Convex polyhedron in local space
///
/// Serialized as its vertex list; deserializing rebuilds and validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec3>", into = "Vec<Vec3>")]
pub struct ConvexHull {
    vertices: Vec<Vec3>,
    planes: Vec<HullPlane>,
    volume: f32,
    tolerance: f32,
}

impl ConvexHull {
    /// Build a hull from local-space vertices
    ///
    /// Interior vertices are allowed and ignored. Fails when fewer than four
    /// vertices are given, when they are all coplanar, or when any is not finite.
    pub fn new(vertices: Vec<Vec3>) -> ZoneResult<Self> {
        if vertices.len() < 4 {
            return Err(ZoneError::InvalidGeometry(format!(
                "convex hull needs at least 4 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.len() > MAX_HULL_VERTICES {
            return Err(ZoneError::InvalidGeometry(format!(
                "convex hull accepts at most {MAX_HULL_VERTICES} vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(ZoneError::InvalidGeometry("convex hull vertex is not finite".to_string()));
        }

        let scale = vertices.iter().map(|v| v.amax()).fold(0.0_f32, f32::max).max(1.0);
        let tolerance = 1.0e-4 * scale;
        let planes = supporting_planes(&vertices, tolerance);
        if planes.len() < 4 {
            return Err(ZoneError::InvalidGeometry("convex hull vertices are coplanar".to_string()));
        }

        let volume = enclosed_volume(&vertices, &planes, tolerance);
        if volume <= tolerance * tolerance {
            return Err(ZoneError::InvalidGeometry("convex hull has no volume".to_string()));
        }

        Ok(Self {
            vertices,
            planes,
            volume,
            tolerance,
        })
    }

    /// Vertices as supplied
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Outward supporting planes
    pub fn planes(&self) -> &[HullPlane] {
        &self.planes
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Local point inside or on the surface
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) <= self.tolerance)
    }

    /// Farthest vertex along `direction`
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.vertices[0];
        let mut best_dot = best.dot(&direction);
        for vertex in &self.vertices[1..] {
            let d = vertex.dot(&direction);
            if d > best_dot {
                best_dot = d;
                best = *vertex;
            }
        }
        best
    }

    /// Half extents of the local bounding box around the origin
    pub fn local_half_extents(&self) -> Vec3 {
        self.vertices
            .iter()
            .fold(Vec3::zeros(), |acc, v| acc.sup(&v.abs()))
    }
}

impl TryFrom<Vec<Vec3>> for ConvexHull {
    type Error = ZoneError;

    fn try_from(vertices: Vec<Vec3>) -> ZoneResult<Self> {
        Self::new(vertices)
    }
}

impl From<ConvexHull> for Vec<Vec3> {
    fn from(hull: ConvexHull) -> Self {
        hull.vertices
    }
}

fn supporting_planes(vertices: &[Vec3], tolerance: f32) -> Vec<HullPlane> {
    let mut planes: Vec<HullPlane> = Vec::new();
    let n = vertices.len();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let normal = (vertices[j] - vertices[i]).cross(&(vertices[k] - vertices[i]));
                let length = normal.norm();
                if length <= tolerance * tolerance {
                    continue;
                }
                let normal = normal / length;
                let offset = normal.dot(&vertices[i]);

                let mut above = false;
                let mut below = false;
                for vertex in vertices {
                    let s = normal.dot(vertex) - offset;
                    if s > tolerance {
                        above = true;
                    } else if s < -tolerance {
                        below = true;
                    }
                }

                let plane = match (above, below) {
                    (false, true) => HullPlane { normal, offset },
                    (true, false) => HullPlane { normal: -normal, offset: -offset },
                    // Straddling triple, or all points coplanar
                    _ => continue,
                };

                let duplicate = planes.iter().any(|p| {
                    (p.normal - plane.normal).norm() < 1.0e-4 && (p.offset - plane.offset).abs() < tolerance
                });
                if !duplicate {
                    planes.push(plane);
                }
            }
        }
    }

    planes
}

/// Sum of pyramids from the vertex centroid to each face polygon
fn enclosed_volume(vertices: &[Vec3], planes: &[HullPlane], tolerance: f32) -> f32 {
    let interior = vertices.iter().sum::<Vec3>() / vertices.len() as f32;
    let mut volume = 0.0;

    for plane in planes {
        let mut face: Vec<Vec3> = vertices
            .iter()
            .copied()
            .filter(|v| plane.signed_distance(*v).abs() <= tolerance)
            .collect();
        if face.len() < 3 {
            continue;
        }

        let centre = face.iter().sum::<Vec3>() / face.len() as f32;
        let u = (face[0] - centre).normalize();
        let w = plane.normal.cross(&u);
        face.sort_by(|a, b| {
            let da = a - centre;
            let db = b - centre;
            let angle_a = da.dot(&w).atan2(da.dot(&u));
            let angle_b = db.dot(&w).atan2(db.dot(&u));
            angle_a.total_cmp(&angle_b)
        });

        let mut area = 0.0;
        for (index, a) in face.iter().enumerate() {
            let b = face[(index + 1) % face.len()];
            area += (a - centre).cross(&(b - centre)).dot(&plane.normal) * 0.5;
        }

        let height = -plane.signed_distance(interior);
        volume += area.abs() * height / 3.0;
    }

    volume
}
