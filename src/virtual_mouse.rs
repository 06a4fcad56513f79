use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key, RelativeAxisType};
use std::io;

use crate::driver::EventSink;
use crate::emit::OutputEvent;
use crate::mouse::DeviceId;
use crate::report::Button;

pub struct VirtualMouse {
    device: VirtualDevice,
}

impl VirtualMouse {
    /// Register a uinput mouse carrying the physical mouse's ids.
    pub fn new(id: DeviceId) -> io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for button in Button::ALL {
            keys.insert(key_for(button));
        }

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()?
            .name("hidaccel Mouse")
            .input_id(InputId::new(BusType::BUS_USB, id.vendor, id.product, 1))
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;

        log::info!("Created virtual mouse for {}", id);
        Ok(Self { device })
    }
}

fn key_for(button: Button) -> Key {
    match button {
        Button::Left => Key::BTN_LEFT,
        Button::Right => Key::BTN_RIGHT,
        Button::Middle => Key::BTN_MIDDLE,
        Button::Side => Key::BTN_SIDE,
        Button::Extra => Key::BTN_EXTRA,
    }
}

/// Translate one output event. The sync marker has no translation here since
/// [VirtualDevice::emit] terminates every batch with `SYN_REPORT` itself.
fn to_input_event(event: &OutputEvent) -> Option<InputEvent> {
    let ev = match *event {
        OutputEvent::Button { button, pressed } => {
            InputEvent::new(EventType::KEY, key_for(button).code(), i32::from(pressed))
        }
        OutputEvent::Wheel(v) => {
            InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_WHEEL.0, v)
        }
        OutputEvent::RelX(v) => InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, v),
        OutputEvent::RelY(v) => InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, v),
        OutputEvent::Sync => return None,
    };
    Some(ev)
}

impl EventSink for VirtualMouse {
    fn emit(&mut self, events: &[OutputEvent]) -> io::Result<()> {
        let batch: Vec<InputEvent> = events.iter().filter_map(to_input_event).collect();
        self.device.emit(&batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_map_to_mouse_keys() {
        let ev = to_input_event(&OutputEvent::Button {
            button: Button::Side,
            pressed: true,
        })
        .unwrap();
        assert_eq!(ev.event_type(), EventType::KEY);
        assert_eq!(ev.code(), Key::BTN_SIDE.code());
        assert_eq!(ev.value(), 1);
    }

    #[test]
    fn motion_maps_to_relative_axes() {
        let ev = to_input_event(&OutputEvent::RelY(-12)).unwrap();
        assert_eq!(ev.event_type(), EventType::RELATIVE);
        assert_eq!(ev.code(), RelativeAxisType::REL_Y.0);
        assert_eq!(ev.value(), -12);

        let ev = to_input_event(&OutputEvent::Wheel(1)).unwrap();
        assert_eq!(ev.code(), RelativeAxisType::REL_WHEEL.0);
    }

    #[test]
    fn sync_is_left_to_the_device() {
        assert!(to_input_event(&OutputEvent::Sync).is_none());
    }
}
