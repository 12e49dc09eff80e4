use super::{EventError, GameEvent, Topic, TopicPayload};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Opaque subscription handle; never reused within an engine's lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionToken(u64);

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Return type accepted from event handlers.
///
/// Handlers either return nothing or a `Result` whose error is logged and
/// counted as a handler failure.
///
/// A closure whose body only panics has no inferable return type; give it an
/// explicit `-> ()` or use a named `fn` handler.
pub trait HandlerOutcome {
    fn into_outcome(self) -> Result<(), String>;
}

impl HandlerOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> HandlerOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

enum Handler {
    Typed(Box<dyn FnMut(&GameEvent) -> Result<(), String>>),
    Dynamic(Box<dyn FnMut(&Value) -> Result<(), String>>),
}

struct Slot {
    topic: Topic,
    handler: Handler,
}

/// In-process publish/subscribe used during a tick.
///
/// Dispatch is synchronous and follows subscription order. A handler that
/// returns an error or panics is isolated: the remaining handlers still run.
pub struct EventBus {
    /// Handler arena indexed by token
    slots: Vec<Option<Slot>>,

    /// Subscription order per topic
    by_topic: BTreeMap<Topic, Vec<usize>>,

    /// Set while a rollback replays
    suppressed: bool,

    /// Handler failures since creation
    failures: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            by_topic: BTreeMap::new(),
            suppressed: false,
            failures: 0,
        }
    }

    /// Subscribe to the topic bound to payload type `P`
    pub fn subscribe<P, F, R>(&mut self, mut handler: F) -> SubscriptionToken
    where
        P: TopicPayload,
        F: FnMut(&P) -> R + 'static,
        R: HandlerOutcome,
    {
        let typed = move |event: &GameEvent| match P::from_event(event) {
            Some(payload) => handler(payload).into_outcome(),
            None => Ok(()),
        };
        self.insert(P::TOPIC, Handler::Typed(Box::new(typed)))
    }

    /// Subscribe to a topic with an untyped JSON payload
    pub fn subscribe_dynamic<F, R>(&mut self, topic: Topic, mut handler: F) -> SubscriptionToken
    where
        F: FnMut(&Value) -> R + 'static,
        R: HandlerOutcome,
    {
        let dynamic = move |payload: &Value| handler(payload).into_outcome();
        self.insert(topic, Handler::Dynamic(Box::new(dynamic)))
    }

    fn insert(&mut self, topic: Topic, handler: Handler) -> SubscriptionToken {
        let index = self.slots.len();
        self.slots.push(Some(Slot { topic, handler }));
        self.by_topic.entry(topic).or_default().push(index);
        SubscriptionToken(index as u64)
    }

    /// Remove a subscription. Returns false when the token is unknown or
    /// already removed.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let index = token.0 as usize;
        let Some(slot) = self.slots.get_mut(index).and_then(Option::take) else {
            return false;
        };

        if let Some(indices) = self.by_topic.get_mut(&slot.topic) {
            indices.retain(|&i| i != index);
        }
        true
    }

    /// Dispatch an event to every subscriber of its topic.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn emit(&mut self, event: &GameEvent) -> usize {
        if self.suppressed {
            return 0;
        }

        let topic = event.topic();
        let Some(indices) = self.by_topic.get(&topic) else {
            return 0;
        };

        let mut json: Option<Value> = None;
        let mut delivered = 0;

        for &index in indices {
            let Some(slot) = self.slots.get_mut(index).and_then(Option::as_mut) else {
                continue;
            };

            let result = match &mut slot.handler {
                Handler::Typed(handler) => invoke(|| handler(event)),
                Handler::Dynamic(handler) => {
                    if json.is_none() {
                        match event.payload_json() {
                            Ok(value) => json = Some(value),
                            Err(e) => {
                                warn!(topic = %topic, error = %e, "Failed to serialize event payload");
                                continue;
                            }
                        }
                    }
                    match json.as_ref() {
                        Some(payload) => invoke(|| handler(payload)),
                        None => continue,
                    }
                }
            };

            match result {
                Ok(()) => delivered += 1,
                Err(error) => {
                    self.failures += 1;
                    warn!(topic = %topic, token = index, error = %error, "Event handler failed");
                }
            }
        }

        delivered
    }

    /// Shape-check a JSON payload against the topic's schema and dispatch it
    pub fn emit_json(&mut self, topic: &str, payload: Value) -> Result<usize, EventError> {
        let topic: Topic = topic.parse()?;
        let event = GameEvent::from_json(topic, payload)?;
        Ok(self.emit(&event))
    }

    /// Enable or disable dispatch; returns the previous setting
    pub fn set_suppressed(&mut self, suppressed: bool) -> bool {
        std::mem::replace(&mut self.suppressed, suppressed)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Active subscriptions on a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.by_topic.get(&topic).map_or(0, Vec::len)
    }

    /// Handler failures (errors and panics) since creation
    pub fn failure_count(&self) -> u64 {
        self.failures
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.slots.iter().flatten().count())
            .field("suppressed", &self.suppressed)
            .field("failures", &self.failures)
            .finish()
    }
}

fn invoke<F>(call: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), String>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}
