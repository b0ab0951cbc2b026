//! The per-step schedule which drives all agents of a simulation

use std::sync::Mutex;

use mitosim_concepts::{Agent, ConsistencyError, IndexError, SetupError, ShadowAgent, TimeError};

use crate::errors::SimulationError;
use crate::neighbors::PopulationView;
use crate::parallel::visit_every_object;
use crate::time::{FixedStepClock, TimeEvent};

/// Receives finished frames at exposure boundaries.
///
/// The sink receives the initial population as frame zero before the first
/// step and is afterwards invoked after the step which triggered the
/// exposure has committed, never concurrently with a force phase.
pub trait RenderSink {
    /// Renders the population as committed at `time` into frame number
    /// `frame` (counted from zero).
    fn render_next_frame(
        &mut self,
        frame: u64,
        time: f64,
        population: &[ShadowAgent],
    ) -> Result<(), SimulationError>;
}

/// Discards every frame.
pub struct NullSink;

impl RenderSink for NullSink {
    fn render_next_frame(
        &mut self,
        _frame: u64,
        _time: f64,
        _population: &[ShadowAgent],
    ) -> Result<(), SimulationError> {
        Ok(())
    }
}

/// Supplies snapshots of agents living beyond the locality boundary.
///
/// Queried once per synchronization point; the returned snapshots are treated
/// as frozen for the remainder of the step.
pub trait ShadowPopulationProvider {
    /// Snapshots of all external agents as of the given time.
    fn shadow_agents(&mut self, time: f64) -> Vec<ShadowAgent>;
}

/// A locality boundary beyond which nothing lives.
pub struct NoShadows;

impl ShadowPopulationProvider for NoShadows {
    fn shadow_agents(&mut self, _time: f64) -> Vec<ShadowAgent> {
        Vec::new()
    }
}

/// Owns a population of agents and advances it in fixed time steps.
///
/// Every step runs two force phases, each fanned out over the worker pool and
/// joined before the next phase begins:
///
/// 1. every agent develops itself towards the step's future target and builds
///    its internal forces,
/// 2. internal forces are committed and the result published,
/// 3. the neighbor sync: queued population changes (spawned and dying agents)
///    are applied, the shadow population is fetched and the view rebuilt,
/// 4. every agent observes the just-synced population and builds its external
///    forces,
/// 5. external forces are committed and the result published, and the sync
///    repeats so exports and the next step start from the final population.
///
/// Only then does the clock advance, and a frame is rendered if the step
/// crossed an exposure boundary; the initial population is rendered as frame
/// zero before the first step. A fatal error aborts the run between these
/// stages, so the geometry published by the last completed commit stays
/// intact.
pub struct Simulation<R, P> {
    /// The population owned by this simulation.
    agents: Vec<Box<dyn Agent>>,
    /// External snapshots as of the last synchronization point.
    shadows: Vec<ShadowAgent>,
    /// Published snapshots of locals and shadows for neighbor queries.
    view: PopulationView,
    /// The clock advancing the run, mutated at the end of a step only.
    clock: FixedStepClock<f64>,
    /// Fixed-size worker pool all phases fan out over.
    pool: rayon::ThreadPool,
    /// Receives finished frames.
    render_sink: R,
    /// Supplies the external snapshots.
    shadow_provider: P,
    /// Whether [execute](Simulation::execute) shows a progress bar.
    show_progress: bool,
}

impl<R, P> Simulation<R, P>
where
    R: RenderSink,
    P: ShadowPopulationProvider,
{
    /// Creates the simulation with a worker pool of the given fixed size.
    pub fn new(
        clock: FixedStepClock<f64>,
        n_workers: usize,
        render_sink: R,
        shadow_provider: P,
    ) -> Result<Self, SimulationError> {
        if n_workers == 0 {
            return Err(SetupError("at least one worker is required".to_owned()).into());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .build()?;
        Ok(Simulation {
            agents: Vec::new(),
            shadows: Vec::new(),
            view: PopulationView::default(),
            clock,
            pool,
            render_sink,
            shadow_provider,
            show_progress: false,
        })
    }

    /// Toggles the progress bar over simulation steps.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Inserts an agent before or between runs, rejecting duplicate ids.
    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> Result<(), SimulationError> {
        self.insert_agent_checked(agent)
    }

    /// Current absolute simulation time.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// The population owned by this simulation.
    pub fn agents(&self) -> &[Box<dyn Agent>] {
        &self.agents
    }

    /// The population view as of the last synchronization point.
    pub fn population(&self) -> &PopulationView {
        &self.view
    }

    /// Runs the simulation until the clock reaches its stop time.
    pub fn execute(&mut self) -> Result<(), SimulationError> {
        self.initialize_population();
        self.render_sink
            .render_next_frame(0, self.clock.time(), self.view.locals())?;
        let mut bar = match self.show_progress {
            true => Some(self.clock.initialize_bar()?),
            false => None,
        };
        while !self.clock.finished() {
            let future_time = self.clock.future_target();
            tracing::info!(
                time = self.clock.time(),
                locals = self.view.n_locals(),
                shadows = self.view.n_shadows(),
                "simulation round"
            );

            self.run_internal_phase(future_time)?;
            self.check_local_clocks(future_time)?;
            self.commit_internal();
            self.update_and_publish_agents(future_time)?;

            self.run_external_phase()?;
            self.commit_external();
            self.update_and_publish_agents(future_time)?;

            let next = self
                .clock
                .advance()?
                .ok_or_else(|| TimeError("the clock ended in the middle of a round".to_owned()))?;
            if next.event == Some(TimeEvent::Exposure) {
                let frame = self.clock.frames_exposed() - 1;
                self.render_sink
                    .render_next_frame(frame, next.time, self.view.locals())?;
            }
            if let Some(bar) = bar.as_mut() {
                self.clock.update_bar(bar)?;
            }
        }
        Ok(())
    }

    /// Publishes all initial geometries and assembles the first view.
    fn initialize_population(&mut self) {
        visit_every_object(&self.pool, self.agents.iter_mut(), |agent| {
            agent.publish_geometry();
        });
        self.shadows = self.shadow_provider.shadow_agents(self.clock.time());
        self.refresh_view();
    }

    fn run_internal_phase(&mut self, future_time: f64) -> Result<(), SimulationError> {
        let failures = Mutex::new(Vec::new());
        visit_every_object(&self.pool, self.agents.iter_mut(), |agent| {
            if let Err(err) = agent.advance_and_build_int_forces(future_time) {
                if let Ok(mut list) = failures.lock() {
                    list.push(SimulationError::from(err));
                }
            }
        });
        first_failure(failures)
    }

    /// Every agent must have caught up with the round's target by now.
    fn check_local_clocks(&self, future_time: f64) -> Result<(), SimulationError> {
        for agent in self.agents.iter() {
            if agent.local_time() < future_time {
                return Err(ConsistencyError(format!(
                    "agent {} stayed behind at local time {} while the round targets {}",
                    agent.id(),
                    agent.local_time(),
                    future_time
                ))
                .into());
            }
        }
        Ok(())
    }

    fn commit_internal(&mut self) {
        visit_every_object(&self.pool, self.agents.iter_mut(), |agent| {
            agent.adjust_geometry_by_int_forces();
            agent.publish_geometry();
        });
    }

    fn run_external_phase(&mut self) -> Result<(), SimulationError> {
        let failures = Mutex::new(Vec::new());
        let view = &self.view;
        visit_every_object(&self.pool, self.agents.iter_mut(), |agent| {
            if let Err(err) = agent.collect_ext_forces(view) {
                if let Ok(mut list) = failures.lock() {
                    list.push(SimulationError::from(err));
                }
            }
        });
        first_failure(failures)
    }

    fn commit_external(&mut self) {
        visit_every_object(&self.pool, self.agents.iter_mut(), |agent| {
            agent.adjust_geometry_by_ext_forces();
            agent.publish_geometry();
        });
    }

    /// The neighbor sync: dying agents leave, spawned agents enter, the
    /// shadow population is fetched and the view rebuilt. Runs between the
    /// internal commit and the external phase, so population changes queued
    /// while building internal forces already take part in the same step's
    /// external phase, and again after the external commit so exports and the
    /// following step start from the final population.
    fn update_and_publish_agents(&mut self, time: f64) -> Result<(), SimulationError> {
        self.agents.retain(|agent| !agent.marked_dead());
        let mut spawned = Vec::new();
        for agent in self.agents.iter_mut() {
            spawned.append(&mut agent.drain_spawned());
        }
        for child in spawned {
            self.insert_agent_checked(child)?;
        }
        self.shadows = self.shadow_provider.shadow_agents(time);
        self.refresh_view();
        Ok(())
    }

    fn insert_agent_checked(&mut self, agent: Box<dyn Agent>) -> Result<(), SimulationError> {
        if self.agents.iter().any(|known| known.id() == agent.id()) {
            return Err(IndexError(format!(
                "an agent with id {} is already part of the population",
                agent.id()
            ))
            .into());
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Rebuilds the population view from the published geometries.
    fn refresh_view(&mut self) {
        let locals = self.agents.iter().map(|agent| agent.shadow()).collect();
        self.view = PopulationView::new(locals, self.shadows.clone());
    }
}

/// Surfaces the first failure a worker reported during a parallel phase.
fn first_failure(failures: Mutex<Vec<SimulationError>>) -> Result<(), SimulationError> {
    match failures.into_inner() {
        Ok(mut list) => match list.drain(..).next() {
            Some(err) => Err(err),
            None => Ok(()),
        },
        Err(_) => {
            Err(ConsistencyError("a worker panicked while reporting a failure".to_owned()).into())
        }
    }
}
