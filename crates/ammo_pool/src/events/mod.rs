//! Event system following Game Engine Architecture Ch 16.8
//! Key principles:
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration system (only notify interested handlers)
//! - Queued delivery, drained once per simulation step
//!
//! Pools publish their lifecycle here. Nothing in the pool core depends on an
//! event being observed. Arguments are typed fields rather than a key-value
//! map so that sending an event never allocates once the queues have grown.

use std::collections::HashMap;

use crate::entity::DeactivationReason;
use crate::pool::{EntityHandle, PoolName};

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Acquire found no available entity
    PoolExhausted,
    /// An entity was handed out
    ObjectActivated,
    /// An entity went back to the available set
    ObjectDeactivated,
}

/// Pool lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Timestamp when event was created (seconds of simulated time)
    pub timestamp: f64,
    pool: PoolName,
    handle: Option<EntityHandle>,
    reason: Option<DeactivationReason>,
}

impl Event {
    /// Create a new event for a pool
    pub fn new(event_type: EventType, timestamp: f64, pool: PoolName) -> Self {
        Self {
            event_type,
            timestamp,
            pool,
            handle: None,
            reason: None,
        }
    }

    /// Attach the entity handle (builder pattern)
    pub fn with_handle(mut self, handle: EntityHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Attach the deactivation reason (builder pattern)
    pub fn with_reason(mut self, reason: DeactivationReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Name of the pool that raised the event
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Handle of the entity involved, if any
    pub fn handle(&self) -> Option<EntityHandle> {
        self.handle
    }

    /// Why the entity was deactivated, for `ObjectDeactivated`
    pub fn reason(&self) -> Option<DeactivationReason> {
        self.reason
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool,
{
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
pub struct EventSystem {
    immediate_queue: Vec<Event>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
    current_time: f64,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self {
            immediate_queue: Vec::new(),
            handlers: HashMap::new(),
            current_time: 0.0,
        }
    }

    /// Reserve room for `additional` immediate events
    pub fn reserve(&mut self, additional: usize) {
        self.immediate_queue.reserve(additional);
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Current time used to stamp new events
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Send event for immediate handling this frame
    pub fn send(&mut self, event: Event) {
        self.immediate_queue.push(event);
    }

    /// Number of events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.immediate_queue.len()
    }

    /// Dispatch all pending events in send order
    pub fn dispatch(&mut self) {
        // Keep the queue's buffer for reuse
        let mut immediate = std::mem::take(&mut self.immediate_queue);
        for event in immediate.drain(..) {
            self.dispatch_event(&event);
        }
        self.immediate_queue = immediate;
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    // Event consumed, stop forwarding
                    break;
                }
            }
        }
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("immediate_queue", &self.immediate_queue.len())
            .field("handler_types", &self.handlers.len())
            .field("current_time", &self.current_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(system: &mut EventSystem, event_type: EventType, consume: bool) -> Rc<RefCell<Vec<Event>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        system.register_handler(
            event_type,
            Box::new(move |event: &Event| {
                sink.borrow_mut().push(event.clone());
                consume
            }),
        );
        seen
    }

    #[test]
    fn test_immediate_dispatch() {
        let mut system = EventSystem::new();
        let seen = recorder(&mut system, EventType::ObjectActivated, false);

        let handle = EntityHandle::new(PoolId(0), 4);
        system.send(Event::new(EventType::ObjectActivated, 0.0, "bullets".into()).with_handle(handle));
        assert_eq!(system.pending(), 1);
        system.dispatch();

        assert_eq!(system.pending(), 0);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].pool(), "bullets");
        assert_eq!(seen[0].handle(), Some(handle));
    }

    #[test]
    fn test_unregistered_type_is_dropped() {
        let mut system = EventSystem::new();
        let seen = recorder(&mut system, EventType::ObjectActivated, false);
        system.send(Event::new(EventType::PoolExhausted, 0.0, "bullets".into()));
        system.dispatch();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_dispatch_keeps_send_order_and_queue_buffer() {
        let mut system = EventSystem::new();
        system.reserve(8);
        let seen = recorder(&mut system, EventType::ObjectActivated, false);

        system.update_time(2.5);
        for slot in 0..3 {
            let event = Event::new(EventType::ObjectActivated, system.current_time(), "bullets".into())
                .with_handle(EntityHandle::new(PoolId(0), slot));
            system.send(event);
        }
        system.dispatch();

        let slots: Vec<u32> = seen.borrow().iter().filter_map(|e| e.handle()).map(|h| h.slot()).collect();
        assert_eq!(slots, vec![0, 1, 2]);
        assert!(seen.borrow().iter().all(|e| (e.timestamp - 2.5).abs() < f64::EPSILON));
        assert_eq!(system.pending(), 0);
        assert!(system.immediate_queue.capacity() >= 8);
    }

    #[test]
    fn test_event_consumption() {
        let mut system = EventSystem::new();

        // First handler consumes
        let first = recorder(&mut system, EventType::ObjectDeactivated, true);
        // Second handler should not receive
        let second = recorder(&mut system, EventType::ObjectDeactivated, false);

        let event = Event::new(EventType::ObjectDeactivated, 0.0, "bullets".into())
            .with_reason(DeactivationReason::Timeout);
        system.send(event);
        system.dispatch();

        assert_eq!(first.borrow().len(), 1);
        assert_eq!(first.borrow()[0].reason(), Some(DeactivationReason::Timeout));
        assert!(second.borrow().is_empty());
    }
}
