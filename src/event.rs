//! Observing execution.
//!
//! The [Emulator](crate::emulator::Emulator) publishes an [Event] for every visible state change
//! to the listeners registered with
//! [add_listener](crate::emulator::Emulator::add_listener). Any `Fn(&Event)` closure is a
//! listener, and [EventLog] records events for later inspection.

use std::cell::RefCell;
use std::rc::Rc;

use crate::storage::Word;

/// A state change caused by an executed instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A memory cell was written.
    MemoryChange {
        address: u16,
        data: Word,
    },

    /// A register was written, either by an instruction or by an addressing side effect.
    RegisterChange {
        register: u16,
        data: Word,
    },

    /// `PRNT` sent a value to the output device.
    Output {
        data: Word,
    },

    /// `SCAN` received a value from the input device.
    Input {
        data: Word,
    },

    /// A jump, call or return moved the program counter.
    ControlTransfer {
        /// Address of the transferring instruction.
        from: u16,
        to: i64,
    },

    /// `EOP` was executed.
    Halt,
}

pub trait EventListener {
    fn event(&mut self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event),
{
    fn event(&mut self, event: &Event) {
        self(event)
    }
}

/// Listener that keeps every event it receives. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    /// Returns the recorded events and clears the log.
    pub fn take(&self) -> Vec<Event> {
        self.events.replace(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventListener for EventLog {
    fn event(&mut self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[derive(Default)]
pub(crate) struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> EventDispatcher {
        EventDispatcher::default()
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    /// Sends the event built by `event` to every listener. Nothing is built without listeners.
    pub fn dispatch_with<F>(&mut self, event: F)
    where
        F: FnOnce() -> Event,
    {
        if self.listeners.is_empty() {
            return;
        }

        let event = event();

        for listener in self.listeners.iter_mut() {
            listener.event(&event);
        }
    }

    pub fn dispatch(&mut self, event: Event) {
        self.dispatch_with(|| event)
    }
}

#[test]
fn test_event_log_is_shared() {
    let log = EventLog::new();
    let mut dispatcher = EventDispatcher::new();

    dispatcher.add_listener(log.clone());
    dispatcher.dispatch(Event::Halt);
    dispatcher.dispatch(Event::Output { data: Word::Int(3) });

    assert_eq!(log.len(), 2);
    assert_eq!(log.take(), vec![Event::Halt, Event::Output { data: Word::Int(3) }]);
    assert!(log.is_empty());
}

#[test]
fn test_dispatch_without_listeners_builds_nothing() {
    let mut dispatcher = EventDispatcher::new();

    dispatcher.dispatch_with(|| panic!("event built without listeners"));
}
