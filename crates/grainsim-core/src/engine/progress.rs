use std::fmt;

/// Non-fatal stability warnings raised by the time-step diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advisory {
    /// Particles may travel more than a tenth of the skin per step.
    SkinFraction { step: u64, travel: f64, limit: f64 },
    /// The time step exceeds the configured fraction of the Courant time.
    CourantFraction { step: u64, fraction: f64, limit: f64 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SkinFraction { travel, limit, .. } => write!(
                f,
                "time step too large or skin too small - particles may travel a relative distance of {:.6} per time-step, but 0.1 * skin is {:.6}",
                travel, limit
            ),
            Advisory::CourantFraction { fraction, .. } => {
                write!(f, "time-step is {:.6} % of courant time", fraction * 100.0)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
    Advisory(Advisory),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
