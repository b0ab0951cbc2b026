use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::errors::{ConsistencyError, SetupError};

/// The phases of a normal cell cycle in their fixed order.
///
/// A cycle is created in [NewBorn](CyclePhase::NewBorn), explicitly started
/// into [G1](CyclePhase::G1) and then progresses strictly sequentially until
/// it rests in [RestInPeace](CyclePhase::RestInPeace); there is no branching
/// and no going back.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CyclePhase {
    /// Pre-phase before the cycle was started.
    NewBorn,
    /// First growth phase.
    G1,
    /// DNA synthesis.
    S,
    /// Second growth phase.
    G2,
    /// Chromatin condenses.
    Prophase,
    /// Chromosomes align.
    Metaphase,
    /// Chromatids separate.
    Anaphase,
    /// Nuclear envelopes reform.
    Telophase,
    /// The cell body divides.
    Cytokinesis,
    /// Terminal state, no further transitions occur.
    RestInPeace,
}

/// Number of active (timed) phases of the cycle.
pub const NUM_CYCLE_PHASES: usize = 8;

impl CyclePhase {
    /// Index into the phase-duration table, `None` for the untimed
    /// [NewBorn](CyclePhase::NewBorn) and [RestInPeace](CyclePhase::RestInPeace)
    /// states.
    pub fn duration_index(&self) -> Option<usize> {
        match self {
            CyclePhase::G1 => Some(0),
            CyclePhase::S => Some(1),
            CyclePhase::G2 => Some(2),
            CyclePhase::Prophase => Some(3),
            CyclePhase::Metaphase => Some(4),
            CyclePhase::Anaphase => Some(5),
            CyclePhase::Telophase => Some(6),
            CyclePhase::Cytokinesis => Some(7),
            CyclePhase::NewBorn | CyclePhase::RestInPeace => None,
        }
    }

    /// The phase following this one.
    pub fn next(&self) -> CyclePhase {
        match self {
            CyclePhase::NewBorn => CyclePhase::G1,
            CyclePhase::G1 => CyclePhase::S,
            CyclePhase::S => CyclePhase::G2,
            CyclePhase::G2 => CyclePhase::Prophase,
            CyclePhase::Prophase => CyclePhase::Metaphase,
            CyclePhase::Metaphase => CyclePhase::Anaphase,
            CyclePhase::Anaphase => CyclePhase::Telophase,
            CyclePhase::Telophase => CyclePhase::Cytokinesis,
            CyclePhase::Cytokinesis | CyclePhase::RestInPeace => CyclePhase::RestInPeace,
        }
    }
}

/// Hooks through which a cell cycle drives the owning agent's model.
///
/// Every phase exposes an entry hook, a run hook carrying the progress ratio
/// within `(0, 1]`, and a close hook. [CellCycle] guarantees that the hooks
/// of consecutive phases fire in the correct order even when a single
/// [trigger_cycle_methods](CellCycle::trigger_cycle_methods) call spans
/// several phase boundaries, and that no run hook is ever invoked with zero
/// progress.
#[allow(unused_variables)]
pub trait CycleHooks {
    /// The cycle moved into `phase`.
    fn enter_phase(&mut self, phase: CyclePhase) {}

    /// `phase` should develop up to the given progress ratio within `(0, 1]`.
    fn run_phase(&mut self, phase: CyclePhase, progress: f64) {}

    /// `phase` is complete; its run hook has already seen progress `1.0`.
    fn close_phase(&mut self, phase: CyclePhase) {}
}

/// Governs proper cycling through a normal cell cycle.
///
/// Instantiate with the desired full cycle duration (optionally randomized
/// per instance), call [start_cycling](CellCycle::start_cycling) with the
/// birth time, then keep calling
/// [trigger_cycle_methods](CellCycle::trigger_cycle_methods) with the current
/// global time; the machine converts elapsed time into the hook calls of
/// [CycleHooks] in the correct order. All durations are in minutes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CellCycle {
    /// The (informative) full cycle duration.
    full_cycle_duration: f64,
    /// Durations of the individual phases, filled in on start.
    phase_durations: [f64; NUM_CYCLE_PHASES],
    /// The phase currently being processed.
    cur_phase: CyclePhase,
    /// Global time at which the current phase started.
    last_phase_change_time: f64,
    /// Global time of the last successfully processed trigger call; an exact
    /// repeat of this timestamp is a guaranteed no-op.
    last_trigger_time: f64,
}

/// Gaussian spread applied by default when randomizing cycle durations.
pub const DEFAULT_CYCLE_SPREAD_FACTOR: f64 = 0.17;

impl CellCycle {
    /// A cycle of exactly the given full duration.
    pub fn new(full_cycle_duration: f64) -> Self {
        CellCycle {
            full_cycle_duration,
            phase_durations: [0.0; NUM_CYCLE_PHASES],
            cur_phase: CyclePhase::NewBorn,
            last_phase_change_time: -1.0,
            last_trigger_time: f64::NEG_INFINITY,
        }
    }

    /// A cycle whose duration is drawn from
    /// `Normal(reference_duration, spread_factor * reference_duration)`, so
    /// that sibling cells do not divide in lock-step.
    pub fn randomized(
        reference_duration: f64,
        spread_factor: f64,
        rng: &mut impl Rng,
    ) -> Result<Self, SetupError> {
        let distribution = Normal::new(reference_duration, spread_factor * reference_duration)
            .map_err(|e| SetupError(format!("invalid cycle duration distribution: {e}")))?;
        let duration = distribution.sample(rng);
        if duration <= 0.0 {
            return Err(SetupError(format!(
                "randomized cycle duration {duration} is not positive \
                (reference {reference_duration}, spread {spread_factor})"
            )));
        }
        Ok(Self::new(duration))
    }

    /// A cycle with a caller-defined slicing of `full_cycle_duration`.
    ///
    /// Durations must be non-negative and sum to the full duration.
    pub fn with_phase_durations(
        full_cycle_duration: f64,
        phase_durations: [f64; NUM_CYCLE_PHASES],
    ) -> Result<Self, SetupError> {
        if phase_durations.iter().any(|d| *d < 0.0) {
            return Err(SetupError(format!(
                "negative phase duration in {phase_durations:?}"
            )));
        }
        let total: f64 = phase_durations.iter().sum();
        if (total - full_cycle_duration).abs() > 1e-6 * full_cycle_duration.max(1.0) {
            return Err(SetupError(format!(
                "phase durations sum to {total} instead of {full_cycle_duration}"
            )));
        }
        let mut cycle = Self::new(full_cycle_duration);
        cycle.phase_durations = phase_durations;
        Ok(cycle)
    }

    /// The standard pie-slicing of a full cycle duration into the eight
    /// phases; the slices sum to exactly the input.
    pub fn standard_phase_durations(full_cycle_duration: f64) -> [f64; NUM_CYCLE_PHASES] {
        [
            0.5 * full_cycle_duration,     // G1
            0.3 * full_cycle_duration,     // S
            0.15 * full_cycle_duration,    // G2
            0.0125 * full_cycle_duration,  // Prophase
            0.0285 * full_cycle_duration,  // Metaphase
            0.0025 * full_cycle_duration,  // Anaphase
            0.00325 * full_cycle_duration, // Telophase
            0.00325 * full_cycle_duration, // Cytokinesis
        ]
    }

    /// The phase currently being processed.
    pub fn phase(&self) -> CyclePhase {
        self.cur_phase
    }

    /// The full cycle duration this instance was created with.
    pub fn full_cycle_duration(&self) -> f64 {
        self.full_cycle_duration
    }

    /// Duration of one phase, zero for the untimed pre- and terminal states.
    pub fn phase_duration(&self, phase: CyclePhase) -> f64 {
        phase
            .duration_index()
            .map(|i| self.phase_durations[i])
            .unwrap_or(0.0)
    }

    /// Logs the internal duration table.
    pub fn report_phase_durations(&self) {
        tracing::debug!(
            full_cycle_duration_min = self.full_cycle_duration,
            phase_durations_min = ?self.phase_durations,
            "cell cycle durations"
        );
    }

    /// Starts the cycling: slices the phase durations (unless a custom
    /// slicing was supplied), anchors the phase-change timestamp at
    /// `current_time` and enters [G1](CyclePhase::G1) through its entry hook.
    ///
    /// Errors when the cycle was already started.
    pub fn start_cycling(
        &mut self,
        current_time: f64,
        hooks: &mut dyn CycleHooks,
    ) -> Result<(), ConsistencyError> {
        if self.cur_phase != CyclePhase::NewBorn {
            return Err(ConsistencyError(
                "re-initializing an already initialized cell cycle".into(),
            ));
        }

        if self.phase_durations.iter().all(|d| *d == 0.0) {
            self.phase_durations = Self::standard_phase_durations(self.full_cycle_duration);
        }

        self.last_phase_change_time = current_time;
        self.cur_phase = CyclePhase::G1;
        hooks.enter_phase(self.cur_phase);
        Ok(())
    }

    /// Converts elapsed global time into hook calls, in the correct order,
    /// until the cycle has caught up with `current_time`.
    ///
    /// A phase whose remaining portion fits entirely before `current_time`
    /// sees run(1.0) and its close hook, the phase-change timestamp advances
    /// by that phase's full duration (not by the wall time elapsed) and the
    /// next phase is entered; the computation then repeats against the same
    /// `current_time`, which lets one call span several phase boundaries.
    /// Zero-duration phases report progress `0` on an exact timestamp repeat
    /// and otherwise `copysign(1, elapsed)`, so they are still detected as
    /// crossed without dividing by zero. Calling the method twice with the
    /// identical timestamp is idempotent; the second call is a silent no-op.
    ///
    /// Errors when the cycle was never started, or when time moved backwards
    /// relative to the last phase change (a fatal consistency violation).
    pub fn trigger_cycle_methods(
        &mut self,
        current_time: f64,
        hooks: &mut dyn CycleHooks,
    ) -> Result<(), ConsistencyError> {
        if self.cur_phase == CyclePhase::NewBorn {
            return Err(ConsistencyError(
                "cell cycle not yet initialized; was start_cycling called?".into(),
            ));
        }

        // beyond the cell cycle, do nothing
        if self.cur_phase == CyclePhase::RestInPeace {
            return Ok(());
        }

        // exact timestamp repeats are idempotent
        if current_time == self.last_trigger_time {
            return Ok(());
        }

        self.advance_phases(current_time, hooks)?;
        self.last_trigger_time = current_time;
        Ok(())
    }

    /// The catch-up loop of
    /// [trigger_cycle_methods](CellCycle::trigger_cycle_methods).
    fn advance_phases(
        &mut self,
        current_time: f64,
        hooks: &mut dyn CycleHooks,
    ) -> Result<(), ConsistencyError> {
        loop {
            let index = self.cur_phase.duration_index().ok_or_else(|| {
                ConsistencyError(format!("unknown cycle state {:?}", self.cur_phase))
            })?;
            let duration = self.phase_durations[index];
            let elapsed = current_time - self.last_phase_change_time;

            let progress = if duration != 0.0 {
                elapsed / duration
            } else if elapsed == 0.0 {
                // same prevention from re-running with zero progress as for
                // a normal phase
                0.0
            } else {
                // +1 marks the empty phase as crossed, -1 trips the sanity
                // check below
                1.0_f64.copysign(elapsed)
            };
            tracing::trace!(phase = ?self.cur_phase, progress, "cycle progress");

            if progress < 0.0 {
                return Err(ConsistencyError(format!(
                    "last phase change ({}) is ahead of the given time ({}), \
                    or a phase duration is negative",
                    self.last_phase_change_time, current_time
                )));
            } else if progress == 0.0 {
                // no progress required at all, skip this call
                return Ok(());
            } else if progress < 1.0 {
                hooks.run_phase(self.cur_phase, progress);
                return Ok(());
            }

            // got over a phase boundary: finish to 1.0, close, advance, open
            hooks.run_phase(self.cur_phase, 1.0);
            hooks.close_phase(self.cur_phase);
            self.last_phase_change_time += duration;
            self.cur_phase = self.cur_phase.next();
            if self.cur_phase == CyclePhase::RestInPeace {
                return Ok(());
            }
            hooks.enter_phase(self.cur_phase);
            // the timestamp may still be whole phases behind current_time,
            // in which case the loop fires the next phase as well
        }
    }
}
