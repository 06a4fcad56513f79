//! Decoding of raw HID mouse reports.
//!
//! Two layouts are supported, picked from the report length:
//!
//! ```text
//! 4 bytes: [buttons, dx:i8, dy:i8, wheel:i8]
//! 6 bytes: [buttons, dx_lo, dx_sign, dy_lo, dy_sign, wheel:i8]
//! ```
//!
//! In the 6 byte layout a zero sign byte means the low byte is an unsigned
//! magnitude, any other value means the low byte is two's complement.

/// Mouse buttons tracked by the driver, in emit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
    Middle,
    Side,
    Extra,
}

impl Button {
    pub const ALL: [Button; 5] = [
        Button::Left,
        Button::Right,
        Button::Middle,
        Button::Side,
        Button::Extra,
    ];

    const fn bit(self) -> u8 {
        match self {
            Button::Left => 0x01,
            Button::Right => 0x02,
            Button::Middle => 0x04,
            Button::Side => 0x08,
            Button::Extra => 0x10,
        }
    }
}

/// Set of concurrently pressed buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(u8);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);

    #[cfg(test)]
    pub fn from_buttons(buttons: &[Button]) -> Self {
        Self(buttons.iter().fold(0, |mask, b| mask | b.bit()))
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    #[cfg(test)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Button Code Table: report index -> pressed buttons.
const BUTTON_CODES: [Buttons; 32] = {
    let mut table = [Buttons::NONE; 32];
    let mut idx = 0;
    while idx < table.len() {
        table[idx] = Buttons(idx as u8);
        idx += 1;
    }
    table
};

/// Look up the button set for a report's button byte.
pub fn button_code(code: u8) -> Option<Buttons> {
    BUTTON_CODES.get(usize::from(code)).copied()
}

/// One report's worth of decoded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSample {
    pub buttons: Buttons,
    pub scroll: i32,
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// Signed dx/dy bytes.
    Compact,
    /// (magnitude, sign) byte pair per axis.
    Signed,
}

impl ReportLayout {
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            4 => Some(ReportLayout::Compact),
            6 => Some(ReportLayout::Signed),
            _ => None,
        }
    }
}

fn signed_delta(low: u8, sign: u8) -> i32 {
    if sign == 0 {
        i32::from(low)
    } else {
        i32::from(low as i8)
    }
}

/// Decode a raw report. Never fails: unsupported lengths and button codes
/// outside the table produce an empty sample so the device stream keeps
/// flowing.
pub fn decode(buf: &[u8]) -> InputSample {
    let Some(layout) = ReportLayout::from_len(buf.len()) else {
        return InputSample::default();
    };
    let Some(buttons) = button_code(buf[0]) else {
        return InputSample::default();
    };

    let (dx, dy) = match layout {
        ReportLayout::Compact => (i32::from(buf[1] as i8), i32::from(buf[2] as i8)),
        ReportLayout::Signed => (signed_delta(buf[1], buf[2]), signed_delta(buf[3], buf[4])),
    };

    InputSample {
        buttons,
        scroll: i32::from(buf[buf.len() - 1] as i8),
        dx,
        dy,
    }
}
