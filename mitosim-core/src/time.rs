//! Controls how the simulation time is advanced

use kdam::BarExt;
use serde::{Deserialize, Serialize};

use mitosim_concepts::TimeError;

/// Absolute margin by which the development target of a step stays short of
/// the full increment, so that an agent developed "up to" the target never
/// overshoots the step boundary.
pub const STEP_TARGET_SLACK: f64 = 1e-4;

/// A [TimeEvent] describes that a certain action is to be executed after the next iteration step.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum TimeEvent {
    /// The accumulated time has crossed the next exposure boundary and a new
    /// frame is to be rendered.
    Exposure,
}

/// Represents the next time point which is returned by the [FixedStepClock::advance] method.
///
/// It is important to note that the absolute time value $t$ is not meant to be used
/// in updating steps but rather for annotating exported results correctly.
#[derive(Clone, Debug)]
pub struct NextTimePoint<F> {
    /// Time increment $dt$
    pub increment: F,
    /// Time value $t$
    pub time: F,
    /// Current iteration
    pub iteration: usize,
    /// Event at this iteration, or None
    pub event: Option<TimeEvent>,
}

/// Time stepping with a fixed time length and a fixed exposure period
///
/// This clock increments the time variable by the same length every step and
/// reports an [Exposure](TimeEvent::Exposure) event whenever the step it is
/// about to take crosses the next multiple of the exposure period. The check
/// happens before the step, so a frame announced by the clock always shows
/// geometry committed by the step that triggered it. Frame zero is the
/// initial state, exported by the caller before the first step; the frame
/// counter therefore starts at one.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FixedStepClock<F> {
    // The stepsize which was fixed
    dt: F,
    t0: F,
    slack: F,
    exposure_period: F,
    current_time: F,
    current_iteration: usize,
    maximum_iterations: usize,
    frames_exposed: u64,
}

impl<F> FixedStepClock<F>
where
    F: num::Float + num::FromPrimitive,
{
    /// Construct the clock from initial time, increment, stop time and
    /// exposure period.
    pub fn new(t0: F, dt: F, t_max: F, exposure_period: F) -> Result<Self, TimeError> {
        let slack = F::from_f64(STEP_TARGET_SLACK).ok_or(TimeError(format!(
            "Could not represent the step target slack in type {}",
            std::any::type_name::<F>()
        )))?;
        if dt <= slack {
            return Err(TimeError(
                "The time increment must be larger than the step target slack".to_owned(),
            ));
        }
        if exposure_period <= F::zero() {
            return Err(TimeError(
                "The exposure period must be positive".to_owned(),
            ));
        }
        if t_max <= t0 {
            return Err(TimeError(
                "Invalid time configuration! Stopping time point is before starting time point."
                    .to_owned(),
            ));
        }
        let maximum_iterations = ((t_max - t0) / dt).round().to_usize().ok_or(TimeError(
            "An error in casting of float type to usize occurred".to_owned(),
        ))?;
        Ok(Self {
            dt,
            t0,
            slack,
            exposure_period,
            current_time: t0,
            current_iteration: 0,
            maximum_iterations,
            // frame 0 shows the initial state and is never announced here
            frames_exposed: 1,
        })
    }

    /// The time value agents are asked to develop up to during the next step.
    pub fn future_target(&self) -> F {
        self.current_time + self.dt - self.slack
    }

    /// Current absolute time value.
    pub fn time(&self) -> F {
        self.current_time
    }

    /// The fixed time increment.
    pub fn increment(&self) -> F {
        self.dt
    }

    /// Number of steps taken so far.
    pub fn iteration(&self) -> usize {
        self.current_iteration
    }

    /// Number of frames exposed so far, counting the initial frame.
    pub fn frames_exposed(&self) -> u64 {
        self.frames_exposed
    }

    /// True once the stop time has been reached.
    pub fn finished(&self) -> bool {
        self.current_iteration >= self.maximum_iterations
    }

    /// Advances the clock to the next time point, or returns None once the
    /// stop time has been reached.
    pub fn advance(&mut self) -> Result<Option<NextTimePoint<F>>, TimeError> {
        if self.current_iteration >= self.maximum_iterations {
            return Ok(None);
        }
        let frame_boundary = F::from_u64(self.frames_exposed).ok_or(TimeError(
            "Error when casting from u64 to floating point value".to_owned(),
        ))? * self.exposure_period;
        let exposure_due = self.current_time + self.dt >= frame_boundary;

        self.current_iteration += 1;
        self.current_time = F::from_usize(self.current_iteration).ok_or(TimeError(
            "Error when casting from usize to floating point value".to_owned(),
        ))? * self.dt
            + self.t0;

        let event = if exposure_due {
            self.frames_exposed += 1;
            Some(TimeEvent::Exposure)
        } else {
            None
        };
        Ok(Some(NextTimePoint {
            increment: self.dt,
            time: self.current_time,
            iteration: self.current_iteration,
            event,
        }))
    }

    /// Creates a bar that tracks the simulation progress
    pub fn initialize_bar(&self) -> Result<kdam::Bar, TimeError> {
        let bar_format = "\
        {desc}{percentage:3.0}%|{animation}| \
        {count}/{total} \
        [{elapsed}, \
        {rate:.2}{unit}/s{postfix}]";
        Ok(kdam::BarBuilder::default()
            .total(self.maximum_iterations)
            .bar_format(bar_format)
            .dynamic_ncols(true)
            .build()?)
    }

    /// Update a given bar to show the current simulation state
    pub fn update_bar(&self, bar: &mut kdam::Bar) -> Result<(), std::io::Error> {
        let _ = bar.update(1)?;
        Ok(())
    }
}
