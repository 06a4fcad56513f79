use std::fmt;

/// Acceleration curve variants. Each maps a clipped velocity to a
/// sensitivity multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    /// `(base + (rate * change)^(power - 1)) / game_sens`, capped at `upper_bound`.
    #[default]
    Quake,
    /// `(rate * change)^(power - 1)` with no base, bound or game sens.
    Power,
}

impl Curve {
    /// Names accepted for the `accel` config key.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quake" | "quake_accel" => Some(Curve::Quake),
            "pow" | "pow_accel" => Some(Curve::Power),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Curve::Quake => "quake",
            Curve::Power => "pow",
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-unit motion dropped by truncation on the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Carry {
    pub dx: f64,
    pub dy: f64,
}

/// All tunable acceleration parameters for one driver session, plus the
/// carry that links consecutive ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub curve: Curve,
    /// Per-axis cap on pre-scaled motion used for velocity. 0 disables it.
    pub overflow_limit: u32,
    pub base: f64,
    /// Velocity below which no acceleration is applied.
    pub offset: f64,
    pub upper_bound: f64,
    pub accel_rate: f64,
    pub power: f64,
    /// In-game sensitivity, divided out of the result.
    pub game_sens: f64,
    pub pre_scalar_x: f64,
    pub pre_scalar_y: f64,
    pub post_scalar_x: f64,
    pub post_scalar_y: f64,
    pub carry: Carry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            curve: Curve::Quake,
            overflow_limit: 10,
            base: 1.0,
            offset: 0.0,
            upper_bound: 8.0,
            accel_rate: 2.0,
            power: 2.0,
            game_sens: 1.0,
            pre_scalar_x: 1.0,
            pre_scalar_y: 1.0,
            post_scalar_x: 1.0,
            post_scalar_y: 1.0,
            carry: Carry::default(),
        }
    }
}

impl Settings {
    /// Log every effective setting at info level.
    pub fn log_summary(&self) {
        log::info!("Accel settings:");
        log::info!("  accel={}", self.curve);
        log::info!("  overflow_lim={}", self.overflow_limit);
        log::info!("  base={:.4}", self.base);
        log::info!("  offset={:.4}", self.offset);
        log::info!("  upper_bound={:.4}", self.upper_bound);
        log::info!("  accel_rate={:.4}", self.accel_rate);
        log::info!("  power={:.4}", self.power);
        log::info!("  game_sens={:.4}", self.game_sens);
        log::info!("  pre_scalar_x={:.4}", self.pre_scalar_x);
        log::info!("  pre_scalar_y={:.4}", self.pre_scalar_y);
        log::info!("  post_scalar_x={:.4}", self.post_scalar_x);
        log::info!("  post_scalar_y={:.4}", self.post_scalar_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_names_resolve() {
        assert_eq!(Curve::from_name("quake"), Some(Curve::Quake));
        assert_eq!(Curve::from_name("quake_accel"), Some(Curve::Quake));
        assert_eq!(Curve::from_name("pow"), Some(Curve::Power));
        assert_eq!(Curve::from_name("pow_accel"), Some(Curve::Power));
        assert_eq!(Curve::from_name("linear"), None);
    }

    #[test]
    fn canonical_name_round_trips() {
        for curve in [Curve::Quake, Curve::Power] {
            assert_eq!(Curve::from_name(curve.name()), Some(curve));
        }
    }

    #[test]
    fn defaults_start_with_no_carry() {
        let settings = Settings::default();
        assert_eq!(settings.curve, Curve::Quake);
        assert_eq!(settings.carry, Carry::default());
    }
}
