use std::io;
use std::path::{Path, PathBuf};

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use thiserror::Error;

use crate::mouse::DeviceId;
use crate::settings::{Curve, Settings};

/// Linux USB mouse acceleration driver.
/// Reads raw HID reports from your mouse, applies an acceleration curve and
/// re-emits the result through a virtual uinput mouse.
#[derive(Parser, Debug)]
#[command(name = "hidaccel")]
pub struct Config {
    /// Acceleration settings file (key=value per line). Defaults are used when omitted.
    pub settings: Option<PathBuf>,

    /// Specific mouse as hex VENDOR:PRODUCT (e.g. 046d:c077)
    #[arg(short, long, value_parser = parse_device_id)]
    pub device: Option<DeviceId>,

    /// HID report length in bytes (1-64). Detected from the first report when omitted.
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=64))]
    pub report_size: Option<usize>,

    /// Do not grab the mouse's evdev node (the desktop keeps seeing raw motion too)
    #[arg(long, default_value_t = false)]
    pub no_grab: bool,

    /// Precompute sensitivity for every 8-bit delta pair at startup
    #[arg(long, default_value_t = false)]
    pub precompute: bool,

    /// Print velocity/sensitivity pairs for the loaded settings and exit
    #[arg(long, default_value_t = false)]
    pub print_curve: bool,
}

fn parse_device_id(s: &str) -> Result<DeviceId, String> {
    let (vendor, product) = s
        .split_once(':')
        .ok_or_else(|| format!("expected VENDOR:PRODUCT, got '{s}'"))?;
    let hex = |v: &str| u16::from_str_radix(v.trim_start_matches("0x"), 16);
    Ok(DeviceId {
        vendor: hex(vendor).map_err(|e| format!("bad vendor id '{vendor}': {e}"))?,
        product: hex(product).map_err(|e| format!("bad product id '{product}': {e}"))?,
    })
}

/// Errors loading an acceleration settings file. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read settings: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: expected key=value")]
    MissingEquals { line: usize },
    #[error("line {line}: unknown setting '{key}'")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: invalid value '{value}' for '{key}'")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
    #[error("line {line}: unknown accel curve '{name}'")]
    UnknownCurve { line: usize, name: String },
}

impl ConfigError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Io(e) => e.raw_os_error().unwrap_or(1),
            _ => 1,
        }
    }
}

/// Load settings from `path` on top of whatever `settings` already holds.
///
/// Lines are applied in order; on error the lines before the bad one stay
/// applied.
pub fn load_settings(settings: &mut Settings, path: &Path) -> Result<(), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    apply_settings(settings, &content)
}

pub fn apply_settings(settings: &mut Settings, content: &str) -> Result<(), ConfigError> {
    for (idx, raw) in content.lines().enumerate() {
        let line = clean_line(raw);
        if line.is_empty() {
            continue;
        }
        assign(settings, &line, idx + 1)?;
    }
    Ok(())
}

/// Lowercase, drop everything after `#` and strip all whitespace.
fn clean_line(line: &str) -> String {
    let line = line.split('#').next().unwrap_or_default();
    line.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn assign(settings: &mut Settings, line: &str, line_no: usize) -> Result<(), ConfigError> {
    let (key, value) = line
        .split_once('=')
        .ok_or(ConfigError::MissingEquals { line: line_no })?;

    let invalid = || ConfigError::InvalidValue {
        line: line_no,
        key: key.to_string(),
        value: value.to_string(),
    };
    let number = || -> Result<f64, ConfigError> {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(invalid)
    };

    match key {
        "base" => settings.base = number()?,
        "offset" => settings.offset = number()?,
        "upper_bound" => settings.upper_bound = number()?,
        "accel_rate" => settings.accel_rate = number()?,
        "power" => settings.power = number()?,
        "game_sens" => settings.game_sens = number()?,
        "overflow_lim" => settings.overflow_limit = value.parse().map_err(|_| invalid())?,
        "pre_scalar_x" => settings.pre_scalar_x = number()?,
        "pre_scalar_y" => settings.pre_scalar_y = number()?,
        "post_scalar_x" => settings.post_scalar_x = number()?,
        "post_scalar_y" => settings.post_scalar_y = number()?,
        "accel" => {
            settings.curve = Curve::from_name(value).ok_or_else(|| ConfigError::UnknownCurve {
                line: line_no,
                name: value.to_string(),
            })?
        }
        _ => {
            return Err(ConfigError::UnknownKey {
                line: line_no,
                key: key.to_string(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn applies_every_known_key() {
        let mut settings = Settings::default();
        let content = "\
base=1.5
offset=4
upper_bound=90
accel_rate=1.04
power=2.5
game_sens=2
overflow_lim=20
pre_scalar_x=0.5
pre_scalar_y=0.25
post_scalar_x=3
post_scalar_y=4
accel=pow
";
        apply_settings(&mut settings, content).unwrap();
        assert_eq!(settings.base, 1.5);
        assert_eq!(settings.offset, 4.0);
        assert_eq!(settings.upper_bound, 90.0);
        assert_eq!(settings.accel_rate, 1.04);
        assert_eq!(settings.power, 2.5);
        assert_eq!(settings.game_sens, 2.0);
        assert_eq!(settings.overflow_limit, 20);
        assert_eq!(settings.pre_scalar_x, 0.5);
        assert_eq!(settings.pre_scalar_y, 0.25);
        assert_eq!(settings.post_scalar_x, 3.0);
        assert_eq!(settings.post_scalar_y, 4.0);
        assert_eq!(settings.curve, Curve::Power);
    }

    #[test]
    fn accepts_every_curve_alias() {
        for (name, curve) in [
            ("quake", Curve::Quake),
            ("QUAKE_ACCEL", Curve::Quake),
            ("pow", Curve::Power),
            ("Pow_Accel", Curve::Power),
        ] {
            let mut settings = Settings {
                curve: if curve == Curve::Quake {
                    Curve::Power
                } else {
                    Curve::Quake
                },
                ..Settings::default()
            };
            apply_settings(&mut settings, &format!("accel={name}")).unwrap();
            assert_eq!(settings.curve, curve, "{name}");
        }
    }

    #[test]
    fn ignores_case_whitespace_and_comments() {
        let mut settings = Settings::default();
        let content = "# header comment\n\n  BASE = 2.0   # trailing\n\tOff set=3\n   \n";
        apply_settings(&mut settings, content).unwrap();
        assert_eq!(settings.base, 2.0);
        assert_eq!(settings.offset, 3.0);
    }

    #[test]
    fn unknown_key_keeps_earlier_lines_only() {
        let mut settings = Settings::default();
        let content = "base=3\nspeed=9\npower=7\n";
        let err = apply_settings(&mut settings, content).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { line: 2, ref key } if key == "speed"));
        assert_eq!(settings.base, 3.0);
        assert_eq!(settings.power, Settings::default().power);
    }

    #[test]
    fn line_without_equals_fails() {
        let mut settings = Settings::default();
        let err = apply_settings(&mut settings, "offset=1\nbase 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEquals { line: 2 }));
        assert_eq!(settings.offset, 1.0);
    }

    #[test]
    fn rejects_bad_values() {
        for content in ["base=fast", "power=nan", "game_sens=inf", "overflow_lim=-1"] {
            let mut settings = Settings::default();
            let err = apply_settings(&mut settings, content).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { line: 1, .. }), "{content}");
        }
    }

    #[test]
    fn rejects_unknown_curve() {
        let mut settings = Settings::default();
        let err = apply_settings(&mut settings, "accel=linear").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCurve { ref name, .. } if name == "linear"));
        assert_eq!(settings.curve, Curve::Quake);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "accel=pow").unwrap();
        writeln!(file, "accel_rate=0.5 # slower").unwrap();
        let mut settings = Settings::default();
        load_settings(&mut settings, file.path()).unwrap();
        assert_eq!(settings.curve, Curve::Power);
        assert_eq!(settings.accel_rate, 0.5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        let err = load_settings(&mut settings, &dir.path().join("nope.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn parses_device_ids() {
        let id = parse_device_id("046d:C077").unwrap();
        assert_eq!(
            id,
            DeviceId {
                vendor: 0x046d,
                product: 0xc077,
            }
        );
        assert!(parse_device_id("046d").is_err());
        assert!(parse_device_id("zz:01").is_err());
    }

    #[test]
    fn cli_parses_flags() {
        let config = Config::parse_from([
            "hidaccel",
            "accel.cfg",
            "--device",
            "1234:abcd",
            "--report-size",
            "6",
            "--precompute",
        ]);
        assert_eq!(config.settings, Some(PathBuf::from("accel.cfg")));
        assert_eq!(
            config.device,
            Some(DeviceId {
                vendor: 0x1234,
                product: 0xabcd,
            })
        );
        assert_eq!(config.report_size, Some(6));
        assert!(config.precompute);
        assert!(!config.no_grab);
        assert!(!config.print_curve);
    }

    #[test]
    fn report_size_must_fit_read_buffer() {
        for size in ["0", "65", "1000"] {
            assert!(
                Config::try_parse_from(["hidaccel", "--report-size", size]).is_err(),
                "{size}"
            );
        }
        for (size, expected) in [("1", 1), ("64", 64)] {
            let config = Config::try_parse_from(["hidaccel", "--report-size", size]).unwrap();
            assert_eq!(config.report_size, Some(expected));
        }
    }
}
