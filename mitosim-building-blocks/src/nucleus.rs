//! The rigid multi-sphere nucleus model

use mitosim_concepts::{
    unit_or_zero, Agent, AgentId, AxisAlignedBoundingBox, CalcError, CellCycle, ConsistencyError,
    CycleHooks, CyclePhase, Force, ForceKind, NeighborLookup, ProximityPair, SetupError,
    ShadowAgent, Spheres, Vector3,
};
use serde::{Deserialize, Serialize};

/// Scalar constants steering all forces a [RigidNucleusAgent] creates.
///
/// The defaults reproduce the TRAgen-style contact model: a constant contact
/// force once surfaces touch which grows linearly past a calm penetration
/// depth, an exponential repulsion while surfaces are merely close, and stiff
/// shape-restoring forces with a small tolerated mis-position.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct NucleusForceConfig {
    /// Scale of the shape-restoring (sphere to sphere) forces.
    pub stiffness: f64,
    /// Mis-position tolerated without creating shape-restoring forces.
    pub calm_distance: f64,
    /// Base magnitude of the contact body force.
    pub overlap_level: f64,
    /// Growth of the body force per unit of penetration past the calm depth.
    pub overlap_scale: f64,
    /// Penetration depth up to which the body force stays at its base level.
    pub overlap_depth: f64,
    /// Decay length of the exponential repulsion.
    pub repulsion_scale: f64,
    /// Surface distance beyond which no repulsion is created.
    pub repulsion_cutoff: f64,
    /// Time over which a sphere loses its momentum to the environment.
    pub persistence_time: f64,
    /// Agents further away than this (measured between bounding boxes) are
    /// not even inspected.
    pub ignore_distance: f64,
}

impl Default for NucleusForceConfig {
    fn default() -> Self {
        NucleusForceConfig {
            stiffness: 0.4,
            calm_distance: 0.1,
            overlap_level: 0.1,
            overlap_scale: 0.2,
            overlap_depth: 0.5,
            repulsion_scale: 0.6,
            repulsion_cutoff: 3.0,
            persistence_time: 2.0,
            ignore_distance: 10.0,
        }
    }
}

/// Cycle-driven development of the nucleus size.
///
/// The nucleus grows linearly over G1 until its volume has doubled (radius
/// scale cube root of two) and keeps that size through the remaining phases;
/// actual division is left to the surrounding application.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InterphaseGrowth {
    /// Radius scale reached when G1 closes.
    grown_scale: f64,
    /// Current radius scale relative to the geometry at birth.
    scale: f64,
}

impl InterphaseGrowth {
    /// Growth towards the given radius scale over G1.
    pub fn new(grown_scale: f64) -> Self {
        InterphaseGrowth {
            grown_scale,
            scale: 1.0,
        }
    }

    /// Current radius scale relative to the geometry at birth.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl CycleHooks for InterphaseGrowth {
    fn run_phase(&mut self, phase: CyclePhase, progress: f64) {
        if phase == CyclePhase::G1 {
            self.scale = 1.0 + (self.grown_scale - 1.0) * progress;
        }
    }

    fn close_phase(&mut self, phase: CyclePhase) {
        if phase == CyclePhase::G1 {
            self.scale = self.grown_scale;
        }
    }
}

/// A nucleus whose shape is spheres constrained to a rigid mutual arrangement.
///
/// The arrangement is remembered relative to two anchor spheres (indices 0
/// and 1): the distance between the anchors, and for every further sphere its
/// coordinates in the local frame spanned by the anchor axis, a caller-given
/// basal plane normal and their cross product. Whenever the live geometry
/// drifts from this remembered configuration, restoring forces pull it back,
/// and every restoring force is answered by opposite forces distributed over
/// the spheres currently overlapping its target (so the shape correction does
/// not translate the whole nucleus).
///
/// Coincident anchors degenerate the local frame to zero axes; this is a
/// defined state which simply stops producing forces along the degenerate
/// directions.
pub struct RigidNucleusAgent {
    /// Identity within the simulation.
    id: AgentId,
    /// Free-form type designation.
    agent_type: String,
    /// This agent's own clock, kept at or ahead of the global time.
    local_time: f64,
    /// Fixed time increment of the enclosing simulation.
    incr_time: f64,

    /// Geometry the forces act upon.
    future: Spheres,
    /// Geometry the rest of the world observes.
    published: Spheres,
    /// Bounding box of the published geometry.
    aabb: AxisAlignedBoundingBox,
    /// Radii at birth, the base of the cycle-driven growth.
    initial_radii: Vec<f64>,
    /// Per-sphere velocities, persistent across steps.
    velocities: Vec<Vector3>,
    /// Per-sphere masses of the force-to-acceleration conversion.
    weights: Vec<f64>,
    /// Forces accumulated since the last commit.
    forces: Vec<Force>,
    /// Per-sphere force accumulator, reused every commit.
    accels: Vec<Vector3>,

    /// The wanted distance between the two anchor spheres.
    centre_distance: f64,
    /// The wanted positions of all but the anchor spheres, in local coords.
    spheres_local_coords: Vec<Vector3>,
    /// The given second axis of the local frame, expected unit length.
    basal_plane_normal: Vector3,
    /// Unit vector anchor 0 to anchor 1, zero when the anchors coincide.
    centre_axis: Vector3,
    /// Cross product of the anchor axis and the basal plane normal.
    aux_3rd_axis: Vector3,
    /// Current deviations of the extra spheres from their wanted positions.
    offs: Vec<Vector3>,
    /// Scratch buffer for the reaction-force redistribution.
    overlaps: Vec<f64>,
    /// Scratch buffer for the narrow-phase pairs against one neighbor.
    pairs: Vec<ProximityPair>,

    /// Velocity the nucleus willingly strives for, zero when passive.
    desired_velocity: Vector3,
    /// Scalar constants of all force laws.
    config: NucleusForceConfig,
    /// The cell cycle of this nucleus.
    cycle: CellCycle,
    /// Model the cycle drives through its hooks.
    growth: InterphaseGrowth,
}

impl RigidNucleusAgent {
    /// Creates the agent, remembers the rigid configuration of `shape` and
    /// starts its cell cycle at `current_time`.
    ///
    /// Rejects shapes with fewer than the two anchor spheres and non-positive
    /// time increments.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AgentId,
        agent_type: impl Into<String>,
        shape: Spheres,
        basal_plane_normal: Vector3,
        current_time: f64,
        incr_time: f64,
        config: NucleusForceConfig,
        cycle: CellCycle,
    ) -> Result<Self, SetupError> {
        if shape.len() < 2 {
            return Err(SetupError(
                "cannot construct a rigid nucleus with less than two spheres".to_owned(),
            ));
        }
        if incr_time <= 0.0 {
            return Err(SetupError(format!(
                "the time increment must be positive, got {incr_time}"
            )));
        }
        let n_spheres = shape.len();
        let aabb = shape.aabb();
        let centre_distance = (shape.centres[1] - shape.centres[0]).norm();
        let mut agent = RigidNucleusAgent {
            id,
            agent_type: agent_type.into(),
            local_time: current_time,
            incr_time,
            initial_radii: shape.radii.clone(),
            published: shape.clone(),
            future: shape,
            aabb,
            velocities: vec![Vector3::zeros(); n_spheres],
            weights: vec![1.0; n_spheres],
            forces: Vec::new(),
            accels: vec![Vector3::zeros(); n_spheres],
            centre_distance,
            spheres_local_coords: vec![Vector3::zeros(); n_spheres - 2],
            basal_plane_normal,
            centre_axis: Vector3::zeros(),
            aux_3rd_axis: Vector3::zeros(),
            offs: vec![Vector3::zeros(); n_spheres - 2],
            overlaps: vec![0.0; n_spheres],
            pairs: Vec::new(),
            desired_velocity: Vector3::zeros(),
            config,
            cycle,
            growth: InterphaseGrowth::new(2.0_f64.cbrt()),
        };
        agent.define_spheres_local_coords();
        agent
            .cycle
            .start_cycling(current_time, &mut agent.growth)?;
        agent.cycle.report_phase_durations();
        Ok(agent)
    }

    /// Replaces the growth model driven by the cell cycle.
    pub fn with_growth(mut self, growth: InterphaseGrowth) -> Self {
        self.growth = growth;
        self
    }

    /// Sets the velocity this nucleus willingly strives for.
    pub fn set_desired_velocity(&mut self, velocity: Vector3) {
        self.desired_velocity = velocity;
    }

    /// The geometry as the rest of the world currently observes it.
    pub fn geometry(&self) -> &Spheres {
        &self.published
    }

    /// The geometry the pending forces act upon.
    pub fn future_geometry(&self) -> &Spheres {
        &self.future
    }

    /// The forces accumulated since the last commit.
    pub fn pending_forces(&self) -> &[Force] {
        &self.forces
    }

    /// The cell cycle driving this nucleus.
    pub fn cycle(&self) -> &CellCycle {
        &self.cycle
    }

    /// Recomputes the anchor axis and the derived third axis, both unit
    /// length or zero when degenerate.
    fn update_aux_axes(&mut self) {
        self.centre_axis = self.future.centres[1] - self.future.centres[0];
        unit_or_zero(&mut self.centre_axis);
        self.aux_3rd_axis = self.centre_axis.cross(&self.basal_plane_normal);
        unit_or_zero(&mut self.aux_3rd_axis);
        if self.centre_axis == Vector3::zeros() {
            tracing::debug!(agent = self.id, "anchor spheres coincide, local frame is degenerate");
        }
    }

    /// Projects the extra spheres onto the current local frame and remembers
    /// the result as the rigid configuration.
    fn define_spheres_local_coords(&mut self) {
        self.update_aux_axes();
        for i in 2..self.future.len() {
            let offset = self.future.centres[i] - self.future.centres[0];
            self.spheres_local_coords[i - 2] = Vector3::new(
                offset.dot(&self.centre_axis),
                offset.dot(&self.basal_plane_normal),
                offset.dot(&self.aux_3rd_axis),
            );
        }
    }

    /// Rebuilds the local frame from the current anchors and computes, per
    /// extra sphere, the vector from its actual to its wanted position.
    fn recompute_deviation(&mut self) {
        self.update_aux_axes();
        for i in 2..self.future.len() {
            let local = self.spheres_local_coords[i - 2];
            let expected = self.future.centres[0]
                + local.x * self.centre_axis
                + local.y * self.basal_plane_normal
                + local.z * self.aux_3rd_axis;
            self.offs[i - 2] = expected - self.future.centres[i];
        }
    }

    /// Translates deviations from the rigid configuration into forces.
    fn build_internal_forces(&mut self) {
        // willing motion acts rigidly on the full nucleus
        if self.desired_velocity != Vector3::zeros() {
            for i in 0..self.future.len() {
                self.forces.push(Force::new(
                    (self.weights[i] / self.config.persistence_time) * self.desired_velocity,
                    self.future.centres[i],
                    i,
                    ForceKind::Drive,
                ));
            }
        }

        // restore the recorded anchor separation
        let separation = (self.future.centres[1] - self.future.centres[0]).norm();
        let diff = separation - self.centre_distance;
        if diff.abs() > self.config.calm_distance {
            self.update_aux_axes();
            let vector = diff * self.config.stiffness * self.centre_axis;
            let on_first = Force::new(
                vector,
                self.future.centres[0],
                0,
                ForceKind::SphereToSphere,
            );
            self.distribute_counter_forces(&on_first);
            self.forces.push(on_first);
            let on_second = Force::new(
                -vector,
                self.future.centres[1],
                1,
                ForceKind::SphereToSphere,
            );
            self.distribute_counter_forces(&on_second);
            self.forces.push(on_second);
        }

        // pull drifted extra spheres back to their wanted positions
        self.recompute_deviation();
        let calm_squared = self.config.calm_distance * self.config.calm_distance;
        for i in 2..self.future.len() {
            let drift = self.offs[i - 2];
            if drift.norm_squared() > calm_squared {
                let force = Force::new(
                    self.config.stiffness * drift,
                    self.future.centres[i],
                    i,
                    ForceKind::SphereToSphere,
                );
                self.distribute_counter_forces(&force);
                self.forces.push(force);
            }
        }
    }

    /// Answers `source` with opposite forces spread over the spheres that
    /// currently overlap its target, weighted by how much they overlap; the
    /// reactions sum to exactly the negated source. With nothing overlapping
    /// the source stands alone.
    fn distribute_counter_forces(&mut self, source: &Force) {
        let target = source.hint;
        let mut total = 0.0;
        for i in 0..self.future.len() {
            self.overlaps[i] = 0.0;
            if i == target {
                continue;
            }
            let overlap = self.future.radii[i] + self.future.radii[target]
                - (self.future.centres[i] - self.future.centres[target]).norm();
            if overlap > 0.0 {
                self.overlaps[i] = overlap;
                total += overlap;
            }
        }
        if total <= 0.0 {
            return;
        }
        for i in 0..self.future.len() {
            if self.overlaps[i] > 0.0 {
                self.forces.push(Force::new(
                    source.vector * (-self.overlaps[i] / total),
                    self.future.centres[i],
                    i,
                    ForceKind::SphereToSphere,
                ));
            }
        }
    }

    /// Turns one narrow-phase pair into a repulsive or body force.
    fn convert_pair_to_force(&mut self, pair: &ProximityPair) {
        if pair.distance > 0.0 {
            if pair.distance < self.config.repulsion_cutoff {
                let mut direction = pair.local_pos - pair.other_pos;
                unit_or_zero(&mut direction);
                let magnitude = self.config.overlap_level
                    * (-pair.distance / self.config.repulsion_scale).exp();
                self.forces.push(Force::new(
                    magnitude * direction,
                    self.future.centres[pair.local_hint],
                    pair.local_hint,
                    ForceKind::Repulsive,
                ));
            }
        } else {
            // in collision the witness points lie past one another, so the
            // direction away from the other agent flips
            let mut direction = pair.other_pos - pair.local_pos;
            unit_or_zero(&mut direction);
            let mut magnitude = self.config.overlap_level;
            if -pair.distance > self.config.overlap_depth {
                magnitude += self.config.overlap_scale * (-pair.distance - self.config.overlap_depth);
            }
            self.forces.push(Force::new(
                magnitude * direction,
                self.future.centres[pair.local_hint],
                pair.local_hint,
                ForceKind::Body,
            ));
        }
    }

    /// One overall force per sphere, then acceleration, velocity and
    /// displacement; the pending forces are consumed.
    fn apply_forces_and_integrate(&mut self) {
        for accel in self.accels.iter_mut() {
            *accel = Vector3::zeros();
        }
        for force in self.forces.iter() {
            self.accels[force.hint] += force.vector;
        }
        for i in 0..self.future.len() {
            self.accels[i] /= self.weights[i];
            self.velocities[i] += self.incr_time * self.accels[i];
            let displacement = self.incr_time * self.velocities[i];
            self.future.centres[i] += displacement;
        }
        self.forces.clear();
    }
}

impl Agent for RigidNucleusAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn local_time(&self) -> f64 {
        self.local_time
    }

    fn shadow(&self) -> ShadowAgent {
        ShadowAgent::new(self.id, self.agent_type.clone(), self.published.clone())
    }

    fn advance_and_build_int_forces(&mut self, future_time: f64) -> Result<(), ConsistencyError> {
        while self.local_time < future_time {
            self.local_time += self.incr_time;
            self.cycle
                .trigger_cycle_methods(self.local_time, &mut self.growth)?;
        }
        // the cycle develops the radii, directly on the future geometry
        let scale = self.growth.scale();
        for (radius, initial) in self.future.radii.iter_mut().zip(self.initial_radii.iter()) {
            *radius = initial * scale;
        }
        self.build_internal_forces();
        Ok(())
    }

    fn adjust_geometry_by_int_forces(&mut self) {
        self.apply_forces_and_integrate();
    }

    fn collect_ext_forces(&mut self, neighbors: &dyn NeighborLookup) -> Result<(), CalcError> {
        // damping by the environment, independent of other agents
        for i in 0..self.future.len() {
            if self.velocities[i] != Vector3::zeros() {
                self.forces.push(Force::new(
                    (-self.weights[i] / self.config.persistence_time) * self.velocities[i],
                    self.future.centres[i],
                    i,
                    ForceKind::Friction,
                ));
            }
        }

        let nearby = neighbors.get_nearby_agents(self.id, &self.aabb, self.config.ignore_distance);
        tracing::trace!(agent = self.id, nearby = nearby.len(), "inspecting nearby agents");
        let mut pairs = std::mem::take(&mut self.pairs);
        for other in nearby {
            pairs.clear();
            self.published
                .closest_surface_pairs_into(&other.geometry, &mut pairs);
            for pair in pairs.iter() {
                self.convert_pair_to_force(pair);
            }
        }
        self.pairs = pairs;
        Ok(())
    }

    fn adjust_geometry_by_ext_forces(&mut self) {
        self.apply_forces_and_integrate();
    }

    fn publish_geometry(&mut self) {
        self.published = self.future.clone();
        self.aabb = self.published.aabb();
    }
}

#[cfg(test)]
mod test_rigid_nucleus {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn two_anchor_shape() -> Spheres {
        Spheres::new(
            vec![Vector3::zeros(), Vector3::new(3.0, 0.0, 0.0)],
            vec![1.0, 1.0],
        )
        .unwrap()
    }

    fn nucleus(shape: Spheres) -> RigidNucleusAgent {
        RigidNucleusAgent::new(
            1,
            "nucleus",
            shape,
            Vector3::new(0.0, 1.0, 0.0),
            0.0,
            0.1,
            NucleusForceConfig::default(),
            CellCycle::new(1440.0),
        )
        .unwrap()
    }

    struct NoNeighbors;

    impl NeighborLookup for NoNeighbors {
        fn get_nearby_agents(
            &self,
            _from_id: AgentId,
            _from_aabb: &AxisAlignedBoundingBox,
            _max_distance: f64,
        ) -> Vec<&ShadowAgent> {
            Vec::new()
        }
    }

    struct FixedLookup(Vec<ShadowAgent>);

    impl NeighborLookup for FixedLookup {
        fn get_nearby_agents(
            &self,
            from_id: AgentId,
            _from_aabb: &AxisAlignedBoundingBox,
            _max_distance: f64,
        ) -> Vec<&ShadowAgent> {
            self.0.iter().filter(|agent| agent.id != from_id).collect()
        }
    }

    #[test]
    fn fewer_than_two_spheres_is_rejected() {
        let shape = Spheres::new(vec![Vector3::zeros()], vec![1.0]).unwrap();
        assert!(RigidNucleusAgent::new(
            1,
            "nucleus",
            shape,
            Vector3::new(0.0, 1.0, 0.0),
            0.0,
            0.1,
            NucleusForceConfig::default(),
            CellCycle::new(1440.0),
        )
        .is_err());
    }

    #[test]
    fn resting_shape_emits_no_forces() {
        let shape = Spheres::new(
            vec![
                Vector3::zeros(),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(1.5, 1.0, 0.0),
            ],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        let mut agent = nucleus(shape);
        agent.build_internal_forces();
        assert!(agent.pending_forces().is_empty());
    }

    #[test]
    fn stretched_anchors_get_opposite_restoring_forces() {
        let mut agent = nucleus(two_anchor_shape());
        agent.future.centres[1].x = 3.2;
        agent.build_internal_forces();

        let forces = agent.pending_forces();
        assert_eq!(forces.len(), 2);
        // separation grew by 0.2, each anchor is pulled with 0.2 * stiffness
        assert_abs_diff_eq!(forces[0].vector.x, 0.2 * 0.4, epsilon = 1e-12);
        assert_eq!(forces[0].hint, 0);
        assert_abs_diff_eq!(forces[1].vector.x, -0.2 * 0.4, epsilon = 1e-12);
        assert_eq!(forces[1].hint, 1);
        assert_abs_diff_eq!(forces[0].vector.y, 0.0);
        assert_abs_diff_eq!(forces[0].vector.z, 0.0);
    }

    #[test]
    fn drift_within_tolerance_is_calm() {
        let mut agent = nucleus(two_anchor_shape());
        agent.future.centres[1].x = 3.05;
        agent.build_internal_forces();
        assert!(agent.pending_forces().is_empty());
    }

    #[test]
    fn redistributed_reactions_cancel_the_source() {
        let shape = Spheres::new(
            vec![
                Vector3::zeros(),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(0.5, 0.0, 0.0),
            ],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        let mut agent = nucleus(shape);
        agent.future.centres[2].y = 0.3;
        agent.build_internal_forces();

        let forces = agent.pending_forces();
        // the drifted sphere overlaps anchor 0 only: one reaction force
        assert_eq!(forces.len(), 2);
        let total: Vector3 = forces.iter().map(|force| force.vector).sum();
        assert_abs_diff_eq!(total.norm(), 0.0, epsilon = 1e-12);
        let on_drifted = forces
            .iter()
            .find(|force| force.hint == 2)
            .expect("no restoring force on the drifted sphere");
        assert_abs_diff_eq!(on_drifted.vector.y, -0.3 * 0.4, epsilon = 1e-12);
    }

    #[test]
    fn force_stands_alone_without_overlaps() {
        let shape = Spheres::new(
            vec![
                Vector3::zeros(),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(1.5, 5.0, 0.0),
            ],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        let mut agent = nucleus(shape);
        agent.future.centres[2].y = 5.3;
        agent.build_internal_forces();
        assert_eq!(agent.pending_forces().len(), 1);
        assert_eq!(agent.pending_forces()[0].hint, 2);
    }

    #[test]
    fn coincident_anchors_produce_finite_forces() {
        let shape = Spheres::new(
            vec![
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::new(1.0, 0.0, 0.0),
            ],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        let mut agent = nucleus(shape);
        agent.build_internal_forces();
        for force in agent.pending_forces() {
            assert!(force.vector.iter().all(|component| component.is_finite()));
        }
    }

    #[test]
    fn moving_spheres_feel_friction() {
        let mut agent = nucleus(two_anchor_shape());
        agent.velocities[0] = Vector3::new(1.0, 0.0, 0.0);
        agent.collect_ext_forces(&NoNeighbors).unwrap();

        let forces = agent.pending_forces();
        assert_eq!(forces.len(), 1);
        assert_eq!(forces[0].kind, ForceKind::Friction);
        // weight 1 over persistence time 2 against unit velocity
        assert_abs_diff_eq!(forces[0].vector.x, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn close_neighbor_repels() {
        let mut agent = nucleus(two_anchor_shape());
        let other = ShadowAgent::new(
            2,
            "nucleus",
            Spheres::new(vec![Vector3::new(5.5, 0.0, 0.0)], vec![1.0]).unwrap(),
        );
        agent.collect_ext_forces(&FixedLookup(vec![other])).unwrap();

        let repulsive: Vec<_> = agent
            .pending_forces()
            .iter()
            .filter(|force| force.kind == ForceKind::Repulsive)
            .collect();
        // anchor 0 is beyond the repulsion cutoff, anchor 1 is 0.5 away
        assert_eq!(repulsive.len(), 1);
        assert_eq!(repulsive[0].hint, 1);
        assert_abs_diff_eq!(
            repulsive[0].vector.x,
            -0.1 * (-0.5_f64 / 0.6).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn penetrating_neighbor_pushes_back() {
        let mut agent = nucleus(two_anchor_shape());
        let other = ShadowAgent::new(
            2,
            "nucleus",
            Spheres::new(vec![Vector3::new(4.2, 0.0, 0.0)], vec![1.0]).unwrap(),
        );
        agent.collect_ext_forces(&FixedLookup(vec![other])).unwrap();

        let body: Vec<_> = agent
            .pending_forces()
            .iter()
            .filter(|force| force.kind == ForceKind::Body)
            .collect();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].hint, 1);
        // penetration 0.8 exceeds the calm depth 0.5 by 0.3
        assert_abs_diff_eq!(body[0].vector.x, -(0.1 + 0.2 * 0.3), epsilon = 1e-12);
    }

    #[test]
    fn forces_integrate_into_motion() {
        let mut agent = nucleus(two_anchor_shape());
        agent.future.centres[1].x = 3.2;
        agent.build_internal_forces();
        agent.adjust_geometry_by_int_forces();

        // anchor 0 accelerated towards anchor 1
        let expected_velocity = 0.1 * 0.2 * 0.4;
        assert_abs_diff_eq!(agent.velocities[0].x, expected_velocity, epsilon = 1e-12);
        assert_abs_diff_eq!(
            agent.future.centres[0].x,
            0.1 * expected_velocity,
            epsilon = 1e-12
        );
        assert!(agent.pending_forces().is_empty());

        // the published geometry only moves on publish
        assert_abs_diff_eq!(agent.geometry().centres[0].x, 0.0);
        agent.publish_geometry();
        assert_abs_diff_eq!(
            agent.geometry().centres[0].x,
            0.1 * expected_velocity,
            epsilon = 1e-12
        );
    }

    #[test]
    fn cycle_growth_develops_the_radii() {
        let mut agent = RigidNucleusAgent::new(
            1,
            "nucleus",
            two_anchor_shape(),
            Vector3::new(0.0, 1.0, 0.0),
            0.0,
            1.0,
            NucleusForceConfig::default(),
            CellCycle::new(100.0),
        )
        .unwrap();

        // half way through G1 (50.0 long) the radii are half grown
        agent.advance_and_build_int_forces(24.9).unwrap();
        assert_abs_diff_eq!(agent.local_time(), 25.0);
        let half_grown = 1.0 + (2.0_f64.cbrt() - 1.0) * 0.5;
        assert_abs_diff_eq!(agent.future_geometry().radii[0], half_grown, epsilon = 1e-12);
        // neighbors keep seeing the unmodified radii until the next commit
        assert_abs_diff_eq!(agent.geometry().radii[0], 1.0);

        // far beyond G1 the nucleus is fully grown
        agent.advance_and_build_int_forces(80.0).unwrap();
        assert_abs_diff_eq!(
            agent.future_geometry().radii[0],
            2.0_f64.cbrt(),
            epsilon = 1e-12
        );
        assert_eq!(agent.cycle().phase(), CyclePhase::G2);
    }

    #[test]
    fn desired_velocity_drives_every_sphere() {
        let mut agent = nucleus(two_anchor_shape());
        agent.set_desired_velocity(Vector3::new(2.0, 0.0, 0.0));
        agent.build_internal_forces();

        let drives: Vec<_> = agent
            .pending_forces()
            .iter()
            .filter(|force| force.kind == ForceKind::Drive)
            .collect();
        assert_eq!(drives.len(), 2);
        for drive in drives {
            assert_abs_diff_eq!(drive.vector.x, 2.0 / 2.0, epsilon = 1e-12);
        }
    }
}
