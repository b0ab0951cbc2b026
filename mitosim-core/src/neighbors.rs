//! Broad-phase neighbor discovery over published agent snapshots

use mitosim_concepts::{AgentId, AxisAlignedBoundingBox, NeighborLookup, ShadowAgent};

/// The population as published at the last synchronization point.
///
/// The view separates agents owned by this simulation (`locals`) from agents
/// projected in from beyond the locality boundary (`shadows`). It is rebuilt
/// by the scheduler whenever geometry is published or the population changes
/// and is only ever read in between, so worker threads may query it
/// concurrently.
#[derive(Clone, Debug, Default)]
pub struct PopulationView {
    /// Snapshots of the agents owned by this simulation.
    locals: Vec<ShadowAgent>,
    /// Snapshots projected in from beyond the locality boundary.
    shadows: Vec<ShadowAgent>,
}

impl PopulationView {
    /// Assembles the view from freshly published snapshots.
    pub fn new(locals: Vec<ShadowAgent>, shadows: Vec<ShadowAgent>) -> Self {
        PopulationView { locals, shadows }
    }

    /// Number of agents owned by this simulation.
    pub fn n_locals(&self) -> usize {
        self.locals.len()
    }

    /// Number of agents projected in from beyond the locality boundary.
    pub fn n_shadows(&self) -> usize {
        self.shadows.len()
    }

    /// Snapshots of all local agents, for export.
    pub fn locals(&self) -> &[ShadowAgent] {
        &self.locals
    }
}

impl NeighborLookup for PopulationView {
    fn get_nearby_agents(
        &self,
        from_id: AgentId,
        from_aabb: &AxisAlignedBoundingBox,
        max_distance: f64,
    ) -> Vec<&ShadowAgent> {
        let max_distance_squared = max_distance * max_distance;
        let close_enough = |candidate: &&ShadowAgent| {
            candidate.aabb.min_squared_distance(from_aabb) < max_distance_squared
        };
        self.locals
            .iter()
            // the caller must not discover itself, shadows never carry its id
            .filter(|candidate| candidate.id != from_id)
            .filter(close_enough)
            .chain(self.shadows.iter().filter(close_enough))
            .collect()
    }
}

#[cfg(test)]
mod test_population_view {
    use super::*;
    use mitosim_concepts::{Spheres, Vector3};

    fn snapshot(id: AgentId, x: f64, radius: f64) -> ShadowAgent {
        let geometry = Spheres::new(vec![Vector3::new(x, 0.0, 0.0)], vec![radius]).unwrap();
        ShadowAgent::new(id, "nucleus", geometry)
    }

    #[test]
    fn caller_is_excluded_among_locals() {
        let me = snapshot(7, 0.0, 1.0);
        let view = PopulationView::new(vec![me.clone(), snapshot(8, 1.0, 1.0)], vec![]);
        let nearby = view.get_nearby_agents(7, &me.aabb, 10.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, 8);
    }

    #[test]
    fn shadow_with_same_id_is_still_reported() {
        let me = snapshot(7, 0.0, 1.0);
        let view = PopulationView::new(vec![me.clone()], vec![snapshot(7, 1.0, 1.0)]);
        let nearby = view.get_nearby_agents(7, &me.aabb, 10.0);
        assert_eq!(nearby.len(), 1);
    }

    #[test]
    fn distance_threshold_is_strict() {
        let me = snapshot(0, 0.0, 1.0);
        // box gap between [-1, 1] and [4, 6] is exactly 3
        let view = PopulationView::new(vec![me.clone(), snapshot(1, 5.0, 1.0)], vec![]);
        assert!(view.get_nearby_agents(0, &me.aabb, 3.0).is_empty());
        assert_eq!(view.get_nearby_agents(0, &me.aabb, 3.1).len(), 1);
    }

    #[test]
    fn locals_come_before_shadows() {
        let me = snapshot(0, 0.0, 1.0);
        let view = PopulationView::new(
            vec![me.clone(), snapshot(1, 1.0, 1.0)],
            vec![snapshot(2, 2.0, 1.0)],
        );
        let nearby = view.get_nearby_agents(0, &me.aabb, 10.0);
        let ids: Vec<_> = nearby.iter().map(|agent| agent.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn overlapping_boxes_are_always_nearby() {
        let me = snapshot(0, 0.0, 2.0);
        let view = PopulationView::new(vec![me.clone(), snapshot(1, 1.0, 2.0)], vec![]);
        assert_eq!(view.get_nearby_agents(0, &me.aabb, 1e-9).len(), 1);
    }
}
