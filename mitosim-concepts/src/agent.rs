use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, ConsistencyError};
use crate::geometry::{AxisAlignedBoundingBox, Spheres};

/// Identity of an agent within one simulation run.
pub type AgentId = usize;

/// Read-only projection of an agent as other agents are allowed to see it.
///
/// A shadow agent carries the published geometry of either a local agent or
/// an agent owned by a different locality boundary; it accepts no forces and
/// is never mutated by the scheduler. It is typically valid for the last
/// completed geometry commit.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ShadowAgent {
    /// Identity of the projected agent.
    pub id: AgentId,
    /// Free-form type designation; agents may restrict which types they
    /// interact with.
    pub agent_type: String,
    /// The published geometry.
    pub geometry: Spheres,
    /// Bounding box cached from [geometry](ShadowAgent::geometry).
    pub aabb: AxisAlignedBoundingBox,
}

impl ShadowAgent {
    /// Creates the projection and caches the geometry's bounding box.
    pub fn new(id: AgentId, agent_type: impl Into<String>, geometry: Spheres) -> Self {
        let aabb = geometry.aabb();
        ShadowAgent {
            id,
            agent_type: agent_type.into(),
            geometry,
            aabb,
        }
    }
}

/// Broad-phase neighbor discovery as seen by an agent.
///
/// Implemented by the engine over the population published at the last
/// neighbor-sync point. The returned agents are candidates only: the bound is
/// a box-to-box lower bound, so callers must prune with exact geometry tests.
pub trait NeighborLookup {
    /// Every agent (local or shadow, excluding the caller itself) whose
    /// bounding box lies closer than `max_distance` to `from_aabb`.
    fn get_nearby_agents(
        &self,
        from_id: AgentId,
        from_aabb: &AxisAlignedBoundingBox,
        max_distance: f64,
    ) -> Vec<&ShadowAgent>;
}

/// Capabilities every simulated agent offers to the scheduler.
///
/// The scheduler calls these methods in a fixed per-step order: internal
/// force building, internal commit + publish, neighbor sync, external force
/// collection, external commit + publish. Force-building methods must not change the
/// published geometry; the two adjust methods together with
/// [publish_geometry](Agent::publish_geometry) are the only mutation points
/// the outside world can observe.
pub trait Agent: Send {
    /// The agent's identity, unique among local agents.
    fn id(&self) -> AgentId;

    /// The agent's type designation.
    fn agent_type(&self) -> &str;

    /// The agent's local clock, monotonically non-decreasing and kept in
    /// sync with the global time by
    /// [advance_and_build_int_forces](Agent::advance_and_build_int_forces).
    fn local_time(&self) -> f64;

    /// Snapshot of the published geometry for neighbor discovery and export.
    fn shadow(&self) -> ShadowAgent;

    /// Develops the agent up to (at least) `future_time` and translates the
    /// development into forces on the future geometry. Must not touch the
    /// published geometry.
    fn advance_and_build_int_forces(&mut self, future_time: f64) -> Result<(), ConsistencyError>;

    /// Materializes the accumulated internal forces into the future geometry.
    fn adjust_geometry_by_int_forces(&mut self);

    /// Reacts to the surrounding population by creating external forces.
    /// Must not touch any geometry.
    fn collect_ext_forces(&mut self, neighbors: &dyn NeighborLookup) -> Result<(), CalcError>;

    /// Materializes the accumulated external forces into the future geometry.
    fn adjust_geometry_by_ext_forces(&mut self);

    /// Copies the future geometry into the published one and refreshes the
    /// cached bounding box. Triggered by the scheduler, never by the agent.
    fn publish_geometry(&mut self);

    /// Hands over agents this one decided to spawn. Collected by the
    /// scheduler at the neighbor-sync boundary only, so freshly spawned
    /// agents never appear mid-phase.
    fn drain_spawned(&mut self) -> Vec<Box<dyn Agent>> {
        Vec::new()
    }

    /// True once the agent asks to be removed; honored at the neighbor-sync
    /// boundary only.
    fn marked_dead(&self) -> bool {
        false
    }
}
