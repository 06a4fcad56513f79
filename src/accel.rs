use crate::settings::{Carry, Curve, Settings};

/// Accelerated deltas are clamped to the i8 range before truncation so the
/// output always fits a boot-protocol style relative report.
const DELTA_MIN: f64 = i8::MIN as f64;
const DELTA_MAX: f64 = i8::MAX as f64;

/// Number of distinct i8 values along one axis of the [SensitivityTable].
const TABLE_SPAN: usize = 256;

/// Result of one tick through the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accelerated {
    pub dx: i32,
    pub dy: i32,
    pub carry: Carry,
}

impl Curve {
    /// Sensitivity for pre-scaled, clipped deltas.
    pub fn sensitivity(self, dx: f64, dy: f64, settings: &Settings) -> f64 {
        self.sensitivity_at((dx * dx + dy * dy).sqrt(), settings)
    }

    /// Sensitivity for a velocity magnitude.
    pub fn sensitivity_at(self, velocity: f64, settings: &Settings) -> f64 {
        let change = (velocity - settings.offset).max(0.0);
        let growth = growth(settings.accel_rate, change, settings.power);
        match self {
            Curve::Quake => {
                let bounded = (settings.base + growth).min(settings.upper_bound);
                bounded / settings.game_sens
            }
            Curve::Power => growth,
        }
    }
}

/// `(rate * change)^(power - 1)`, defined as 0 when there is no change so a
/// resting mouse never picks up `0^0` or `0^-n` artefacts.
fn growth(rate: f64, change: f64, power: f64) -> f64 {
    if change <= 0.0 {
        return 0.0;
    }
    (rate * change).powf(power - 1.0)
}

fn clip_delta(delta: f64, limit: u32) -> f64 {
    if limit == 0 {
        return delta;
    }
    let limit = f64::from(limit);
    delta.clamp(-limit, limit)
}

/// Clamp into the finite range, mapping NaN to zero.
fn finite(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(f64::MIN, f64::MAX)
}

fn limit_delta(delta: f64) -> f64 {
    if delta.is_nan() {
        return 0.0;
    }
    delta.clamp(DELTA_MIN, DELTA_MAX)
}

/// Sensitivity the configured curve assigns to one raw report's deltas,
/// after pre-scaling and overflow clipping.
pub fn sensitivity(raw_dx: i32, raw_dy: i32, settings: &Settings) -> f64 {
    let pre_dx = clip_delta(f64::from(raw_dx) * settings.pre_scalar_x, settings.overflow_limit);
    let pre_dy = clip_delta(f64::from(raw_dy) * settings.pre_scalar_y, settings.overflow_limit);
    finite(settings.curve.sensitivity(pre_dx, pre_dy, settings))
}

/// Run one tick through the engine, returning integer deltas and the carry
/// to feed into the next tick.
pub fn accelerate(raw_dx: i32, raw_dy: i32, settings: &Settings, carry: Carry) -> Accelerated {
    let sens = sensitivity(raw_dx, raw_dy, settings);
    apply(sens, raw_dx, raw_dy, settings, carry)
}

fn apply(sens: f64, raw_dx: i32, raw_dy: i32, settings: &Settings, carry: Carry) -> Accelerated {
    let post_dx = f64::from(raw_dx) * sens * settings.post_scalar_x;
    let post_dy = f64::from(raw_dy) * sens * settings.post_scalar_y;

    let accum_dx = limit_delta(post_dx + carry.dx);
    let accum_dy = limit_delta(post_dy + carry.dy);

    // Truncate rather than round, otherwise slow motion jitters.
    let trim_dx = accum_dx.trunc();
    let trim_dy = accum_dy.trunc();

    Accelerated {
        dx: trim_dx as i32,
        dy: trim_dy as i32,
        carry: Carry {
            dx: accum_dx - trim_dx,
            dy: accum_dy - trim_dy,
        },
    }
}

/// Sensitivity precomputed for every pair of i8 raw deltas.
pub struct SensitivityTable {
    values: Vec<f64>,
}

impl SensitivityTable {
    pub fn build(settings: &Settings) -> Self {
        let mut values = Vec::with_capacity(TABLE_SPAN * TABLE_SPAN);
        for dx in i8::MIN..=i8::MAX {
            for dy in i8::MIN..=i8::MAX {
                values.push(sensitivity(i32::from(dx), i32::from(dy), settings));
            }
        }
        log::debug!("Precomputed {} sensitivity values", values.len());
        Self { values }
    }

    /// Returns `None` when either delta falls outside the i8 range.
    pub fn lookup(&self, dx: i32, dy: i32) -> Option<f64> {
        let dx = i8::try_from(dx).ok()?;
        let dy = i8::try_from(dy).ok()?;
        let row = (i16::from(dx) - i16::from(i8::MIN)) as usize;
        let col = (i16::from(dy) - i16::from(i8::MIN)) as usize;
        self.values.get(row * TABLE_SPAN + col).copied()
    }
}

/// Owns the session's [Settings] and threads the carry from tick to tick.
pub struct Accelerator {
    settings: Settings,
    table: Option<SensitivityTable>,
}

impl Accelerator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            table: None,
        }
    }

    /// Like [Accelerator::new], but evaluates the curve once up front.
    pub fn precomputed(settings: Settings) -> Self {
        let table = SensitivityTable::build(&settings);
        Self {
            settings,
            table: Some(table),
        }
    }

    #[cfg(test)]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn accelerate(&mut self, raw_dx: i32, raw_dy: i32) -> (i32, i32) {
        let carry = self.settings.carry;
        let out = match self.table.as_ref().and_then(|t| t.lookup(raw_dx, raw_dy)) {
            Some(sens) => apply(sens, raw_dx, raw_dy, &self.settings, carry),
            None => accelerate(raw_dx, raw_dy, &self.settings, carry),
        };
        self.settings.carry = out.carry;
        (out.dx, out.dy)
    }
}

/// `(velocity, sensitivity)` samples over `0..25` in steps of 0.1, ignoring
/// the pre/post scalars.
pub fn curve_points(settings: &Settings) -> impl Iterator<Item = (f64, f64)> + '_ {
    (0..250).map(move |step| {
        let velocity = f64::from(step) * 0.1;
        (velocity, finite(settings.curve.sensitivity_at(velocity, settings)))
    })
}
