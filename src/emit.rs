use crate::report::{Button, InputSample};

/// Output events for one tick, in the order they must reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Button { button: Button, pressed: bool },
    Wheel(i32),
    RelX(i32),
    RelY(i32),
    Sync,
}

/// Build the event batch for an already accelerated sample.
///
/// Every tracked button is reported each tick (level driven), followed by
/// the wheel and any nonzero motion, and terminated by exactly one
/// [OutputEvent::Sync].
pub fn events_for(sample: &InputSample) -> Vec<OutputEvent> {
    let mut events = Vec::with_capacity(Button::ALL.len() + 4);
    events.extend(Button::ALL.iter().map(|&button| OutputEvent::Button {
        button,
        pressed: sample.buttons.contains(button),
    }));
    if sample.scroll != 0 {
        events.push(OutputEvent::Wheel(sample.scroll));
    }
    if sample.dx != 0 {
        events.push(OutputEvent::RelX(sample.dx));
    }
    if sample.dy != 0 {
        events.push(OutputEvent::RelY(sample.dy));
    }
    events.push(OutputEvent::Sync);
    events
}
