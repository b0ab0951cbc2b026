use serde::{Deserialize, Serialize};

use crate::errors::SetupError;

/// All geometry in the engine lives in 3D micrometer space.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Normalizes the vector in place, or zeroes it when its length vanishes.
///
/// Degenerate (zero-length) directions are a defined state of the shape model
/// and must not produce NaNs, hence this helper instead of plain
/// [normalize](nalgebra::Vector3::normalize).
pub fn unit_or_zero(v: &mut Vector3) {
    let len = v.norm();
    if len > 0.0 {
        *v /= len;
    } else {
        *v = Vector3::zeros();
    }
}

/// Axis-aligned bounding box of an agent's published geometry.
///
/// The box is cached alongside the geometry and is the only information the
/// broad-phase neighbor discovery looks at.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct AxisAlignedBoundingBox {
    /// Corner with the smallest coordinates.
    pub min_corner: Vector3,
    /// Corner with the largest coordinates.
    pub max_corner: Vector3,
}

impl AxisAlignedBoundingBox {
    /// An inside-out box which any point or sphere will expand.
    pub fn empty() -> Self {
        AxisAlignedBoundingBox {
            min_corner: Vector3::from_element(f64::INFINITY),
            max_corner: Vector3::from_element(f64::NEG_INFINITY),
        }
    }

    /// Grows the box to contain the sphere given by `centre` and `radius`.
    pub fn expand_by_sphere(&mut self, centre: &Vector3, radius: f64) {
        for d in 0..3 {
            self.min_corner[d] = self.min_corner[d].min(centre[d] - radius);
            self.max_corner[d] = self.max_corner[d].max(centre[d] + radius);
        }
    }

    /// Squared minimum distance between this box and `other`, zero when the
    /// boxes overlap.
    ///
    /// This is a lower bound on the true distance between the geometries
    /// inside the boxes and is intentionally cheap; callers that need the
    /// exact distance must examine the geometries themselves.
    pub fn min_squared_distance(&self, other: &AxisAlignedBoundingBox) -> f64 {
        let mut dist_sq = 0.0;
        for d in 0..3 {
            let lo = self.min_corner[d].max(other.min_corner[d]);
            let hi = self.max_corner[d].min(other.max_corner[d]);
            if lo > hi {
                dist_sq += (lo - hi) * (lo - hi);
            }
        }
        dist_sq
    }
}

/// Geometry of one agent as an ordered collection of spheres.
///
/// The engine double-buffers this type: forces act on an agent's future
/// geometry while neighbors only ever observe the published copy.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Spheres {
    /// Sphere centres, in the same order as [radii](Spheres::radii).
    pub centres: Vec<Vector3>,
    /// Sphere radii, in the same order as [centres](Spheres::centres).
    pub radii: Vec<f64>,
}

impl Spheres {
    /// Creates the collection, rejecting mismatched centre/radius counts.
    pub fn new(centres: Vec<Vector3>, radii: Vec<f64>) -> Result<Self, SetupError> {
        if centres.len() != radii.len() {
            return Err(SetupError(format!(
                "got {} centres but {} radii",
                centres.len(),
                radii.len()
            )));
        }
        Ok(Spheres { centres, radii })
    }

    /// Number of spheres in the collection.
    pub fn len(&self) -> usize {
        self.centres.len()
    }

    /// True when the collection holds no spheres.
    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }

    /// Recomputes the axis-aligned bounding box of all spheres.
    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        let mut aabb = AxisAlignedBoundingBox::empty();
        for (centre, radius) in self.centres.iter().zip(self.radii.iter()) {
            aabb.expand_by_sphere(centre, *radius);
        }
        aabb
    }

    /// Exact narrow-phase test against another collection: for every sphere
    /// of this collection (zero-radius spheres are skipped), the nearest
    /// sphere of `other` is determined by surface-to-surface distance and one
    /// [ProximityPair] is appended to `pairs`.
    ///
    /// The pair's distance is negative when the two surfaces penetrate each
    /// other; its witness points then lie past one another, which callers
    /// converting pairs into forces have to account for.
    pub fn closest_surface_pairs_into(&self, other: &Spheres, pairs: &mut Vec<ProximityPair>) {
        for (local_hint, (centre, radius)) in
            self.centres.iter().zip(self.radii.iter()).enumerate()
        {
            if *radius == 0.0 {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for (other_hint, (other_centre, other_radius)) in
                other.centres.iter().zip(other.radii.iter()).enumerate()
            {
                if *other_radius == 0.0 {
                    continue;
                }
                let distance = (centre - other_centre).norm() - radius - other_radius;
                if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                    best = Some((other_hint, distance));
                }
            }
            if let Some((other_hint, distance)) = best {
                let mut direction = other.centres[other_hint] - centre;
                unit_or_zero(&mut direction);
                pairs.push(ProximityPair {
                    local_pos: centre + *radius * direction,
                    other_pos: other.centres[other_hint] - other.radii[other_hint] * direction,
                    distance,
                    local_hint,
                });
            }
        }
    }
}

/// Witness of the closest approach between one sphere of an agent and the
/// nearest sphere of another agent.
#[derive(Clone, Debug, PartialEq)]
pub struct ProximityPair {
    /// Point on the local sphere's surface closest to the other agent.
    pub local_pos: Vector3,
    /// Point on the other sphere's surface closest to the local sphere.
    pub other_pos: Vector3,
    /// Surface-to-surface distance, negative when penetrating.
    pub distance: f64,
    /// Index of the local sphere this pair belongs to.
    pub local_hint: usize,
}

/// Category of a force, used by agents to decide how a force is treated when
/// geometry changes are committed and in diagnostics.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ForceKind {
    /// Willing motion of the agent itself.
    Drive,
    /// Contact force from penetrating another agent.
    Body,
    /// Distance-dependent repulsion from a close but not touching agent.
    Repulsive,
    /// Environmental damping, acts against the current velocity.
    Friction,
    /// Shape-consistency force pulling a sphere towards its rigid target.
    SphereToSphere,
}

/// One force request on one sphere of an agent.
///
/// Forces are transient: agents accumulate them during a force-building phase
/// and consume the whole list in the following commit, they are never carried
/// across simulation steps.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Force {
    /// Direction and magnitude of the force.
    pub vector: Vector3,
    /// World-space point where the force applies.
    pub base: Vector3,
    /// Index of the sphere (within the owning agent) the force acts on.
    pub hint: usize,
    /// What this force represents.
    pub kind: ForceKind,
}

impl Force {
    /// Bundles the force components into the value object.
    pub fn new(vector: Vector3, base: Vector3, hint: usize, kind: ForceKind) -> Self {
        Force {
            vector,
            base,
            hint,
            kind,
        }
    }
}
