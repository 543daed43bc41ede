//! Benchmark scenarios: configuration plus a scripted disturbance list.
//!
//! Five canonical scenarios for regression testing:
//! 1. **Hanging settle**: kite hangs 15 m below raised handles and settles
//! 2. **Symmetric pull**: both handles pulled back equally
//! 3. **Left pull**: only the left handle pulled back
//! 4. **Ground rest**: slack lines, kite drops onto the ground
//! 5. **Gust recovery**: force spike plus corrupted inputs

use serde::{Deserialize, Serialize};

use kitesim_math::Vec3;
use kitesim_solver::config::KiteConfig;
use kitesim_solver::constraints::HandlePositions;
use kitesim_solver::geometry::KiteGeometry;
use kitesim_solver::simulation::FrameInputs;
use kitesim_types::constants::DEFAULT_DT;
use kitesim_types::{KiteResult, Side};

/// Which benchmark scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    /// Kite hanging on its lines under gravity.
    HangingSettle,
    /// Both handles pulled back by the same amount.
    SymmetricPull,
    /// Only the left handle pulled back.
    LeftPull,
    /// Kite dropped onto the ground with slack lines.
    GroundRest,
    /// Force spike and non-finite input injection.
    GustRecovery,
}

impl ScenarioKind {
    /// Returns all scenario kinds.
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::HangingSettle,
            ScenarioKind::SymmetricPull,
            ScenarioKind::LeftPull,
            ScenarioKind::GroundRest,
            ScenarioKind::GustRecovery,
        ]
    }

    /// Returns a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::HangingSettle => "hanging_settle",
            ScenarioKind::SymmetricPull => "symmetric_pull",
            ScenarioKind::LeftPull => "left_pull",
            ScenarioKind::GroundRest => "ground_rest",
            ScenarioKind::GustRecovery => "gust_recovery",
        }
    }

    /// Looks a scenario up by [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.name() == name)
    }
}

/// A scripted change to the frame inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disturbance {
    /// From `step` on, the handles are offset by `left` and `right`.
    Pull { step: u32, left: Vec3, right: Vec3 },
    /// Extra force during `steps` steps starting at `start`.
    Gust { start: u32, steps: u32, force: Vec3 },
    /// Non-finite aerodynamic force on one step.
    CorruptForce { step: u32 },
    /// Non-finite handle position on one step.
    CorruptHandle { step: u32, side: Side },
}

/// A fully specified benchmark scenario.
pub struct Scenario {
    /// Scenario type.
    pub kind: ScenarioKind,
    /// Physics configuration.
    pub config: KiteConfig,
    /// Number of timesteps to simulate.
    pub timesteps: u32,
    /// Timestep size (seconds).
    pub dt: f32,
    /// Scripted input changes.
    pub disturbances: Vec<Disturbance>,
}

/// Handles 20 m up, 15 m lines, both control points exactly one line
/// length below their handles.
fn hanging_config() -> KiteResult<KiteConfig> {
    let mut config = KiteConfig::default();
    config.lines.length = 15.0;
    config.lines.handle_left = [-0.2, 20.0, 0.0];
    config.lines.handle_right = [0.2, 20.0, 0.0];
    let geometry = KiteGeometry::from_config(&config.geometry, &config.bridles)?;
    let control = geometry.control_point(Side::Left);
    config.initial.position = [0.0, 20.0 - config.lines.length - control.y, -control.z];
    Ok(config)
}

impl Scenario {
    /// Builds a scenario by kind.
    pub fn from_kind(kind: ScenarioKind) -> KiteResult<Self> {
        match kind {
            ScenarioKind::HangingSettle => Self::hanging_settle(),
            ScenarioKind::SymmetricPull => Self::symmetric_pull(),
            ScenarioKind::LeftPull => Self::left_pull(),
            ScenarioKind::GroundRest => Self::ground_rest(),
            ScenarioKind::GustRecovery => Self::gust_recovery(),
        }
    }

    /// Create the hanging settle scenario.
    ///
    /// 12 seconds at 60fps, long enough for the swing to die out.
    pub fn hanging_settle() -> KiteResult<Self> {
        Ok(Self {
            kind: ScenarioKind::HangingSettle,
            config: hanging_config()?,
            timesteps: 720,
            dt: DEFAULT_DT,
            disturbances: Vec::new(),
        })
    }

    /// Create the symmetric pull scenario.
    ///
    /// Both handles move 10 cm away from the kite on the first frame.
    pub fn symmetric_pull() -> KiteResult<Self> {
        let back = Vec3::new(0.0, 0.1, 0.0);
        Ok(Self {
            kind: ScenarioKind::SymmetricPull,
            config: hanging_config()?,
            timesteps: 120,
            dt: DEFAULT_DT,
            disturbances: vec![Disturbance::Pull {
                step: 0,
                left: back,
                right: back,
            }],
        })
    }

    /// Create the left pull scenario.
    ///
    /// Only the left handle moves 10 cm away from the kite.
    pub fn left_pull() -> KiteResult<Self> {
        Ok(Self {
            kind: ScenarioKind::LeftPull,
            config: hanging_config()?,
            timesteps: 120,
            dt: DEFAULT_DT,
            disturbances: vec![Disturbance::Pull {
                step: 0,
                left: Vec3::new(0.0, 0.1, 0.0),
                right: Vec3::ZERO,
            }],
        })
    }

    /// Create the ground rest scenario.
    ///
    /// Lines are far longer than the handle distance, so only the ground
    /// acts. The kite starts with its lowest hull point 0.5 m up.
    pub fn ground_rest() -> KiteResult<Self> {
        let mut config = KiteConfig::default();
        config.lines.length = 30.0;
        config.initial.position = [0.0, 0.75, -10.0];
        Ok(Self {
            kind: ScenarioKind::GroundRest,
            config,
            timesteps: 180,
            dt: DEFAULT_DT,
            disturbances: Vec::new(),
        })
    }

    /// Create the gust recovery scenario.
    ///
    /// A 900 N gust for 10 frames, then a non-finite force and a
    /// non-finite handle.
    pub fn gust_recovery() -> KiteResult<Self> {
        Ok(Self {
            kind: ScenarioKind::GustRecovery,
            config: hanging_config()?,
            timesteps: 360,
            dt: DEFAULT_DT,
            disturbances: vec![
                Disturbance::Gust {
                    start: 60,
                    steps: 10,
                    force: Vec3::new(0.0, 0.0, -900.0),
                },
                Disturbance::CorruptForce { step: 120 },
                Disturbance::CorruptHandle {
                    step: 121,
                    side: Side::Left,
                },
            ],
        })
    }

    /// Frame inputs for `step` given the configured handle positions.
    pub fn inputs_at(&self, step: u32, base: HandlePositions) -> FrameInputs {
        let mut handles = base;
        let mut force = Vec3::ZERO;
        for disturbance in &self.disturbances {
            match *disturbance {
                Disturbance::Pull { step: from, left, right } if step >= from => {
                    handles.left += left;
                    handles.right += right;
                }
                Disturbance::Gust { start, steps, force: f }
                    if step >= start && step < start + steps =>
                {
                    force += f;
                }
                Disturbance::CorruptForce { step: at } if step == at => {
                    force = Vec3::splat(f32::NAN);
                }
                Disturbance::CorruptHandle { step: at, side } if step == at => match side {
                    Side::Left => handles.left = Vec3::splat(f32::NAN),
                    Side::Right => handles.right = Vec3::splat(f32::NAN),
                },
                _ => {}
            }
        }
        FrameInputs::still(handles).with_force(force)
    }

    /// First step at which the handles are pulled, if any.
    pub fn pull_step(&self) -> Option<u32> {
        self.disturbances
            .iter()
            .filter_map(|d| match d {
                Disturbance::Pull { step, .. } => Some(*step),
                _ => None,
            })
            .min()
    }
}
