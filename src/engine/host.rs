use std::collections::VecDeque;

use crate::foundation::core::Surface;

/// Host event families the engine subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostEventKind {
    /// Per-frame callback.
    Frame,
    /// Surface size or pixel ratio changed.
    Resize,
    /// Page/window visibility changed.
    Visibility,
}

/// One event delivered by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostEvent {
    /// Time to render a frame.
    Frame,
    /// New surface geometry.
    Resize(Surface),
    /// `true` when the host became visible.
    VisibilityChanged(bool),
}

impl HostEvent {
    /// Family this event belongs to.
    pub fn kind(&self) -> HostEventKind {
        match self {
            Self::Frame => HostEventKind::Frame,
            Self::Resize(_) => HostEventKind::Resize,
            Self::VisibilityChanged(_) => HostEventKind::Visibility,
        }
    }
}

/// Handle returned by [`Host::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Host-assigned id.
    pub id: u64,
    /// Subscribed family.
    pub kind: HostEventKind,
}

/// The embedding environment: a drawing surface plus an event source.
pub trait Host {
    /// Current surface geometry.
    fn surface(&self) -> Surface;

    /// Whether the host is currently visible.
    fn is_visible(&self) -> bool {
        true
    }

    /// Start delivering `kind` events.
    fn subscribe(&mut self, kind: HostEventKind) -> Subscription;

    /// Stop delivering events for `sub`.
    fn unsubscribe(&mut self, sub: Subscription);

    /// Next pending event for an active subscription, if any.
    fn poll_event(&mut self) -> Option<HostEvent> {
        None
    }
}

/// In-process host for tests, offline evaluation and the CLI.
///
/// Events are queued with [`HeadlessHost::emit`]; only events with an active subscription are
/// handed out by [`Host::poll_event`].
#[derive(Debug)]
pub struct HeadlessHost {
    surface: Surface,
    visible: bool,
    next_id: u64,
    active: Vec<Subscription>,
    queue: VecDeque<HostEvent>,
}

impl HeadlessHost {
    /// Visible host with the given surface.
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            visible: true,
            next_id: 1,
            active: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Queue an event. Resize and visibility events also update the host's own state.
    pub fn emit(&mut self, event: HostEvent) {
        match event {
            HostEvent::Resize(s) => self.surface = s,
            HostEvent::VisibilityChanged(v) => self.visible = v,
            HostEvent::Frame => {}
        }
        self.queue.push_back(event);
    }

    /// Active subscriptions.
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.active
    }

    fn is_subscribed(&self, kind: HostEventKind) -> bool {
        self.active.iter().any(|s| s.kind == kind)
    }
}

impl Host for HeadlessHost {
    fn surface(&self) -> Surface {
        self.surface
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn subscribe(&mut self, kind: HostEventKind) -> Subscription {
        let sub = Subscription {
            id: self.next_id,
            kind,
        };
        self.next_id += 1;
        self.active.push(sub);
        sub
    }

    fn unsubscribe(&mut self, sub: Subscription) {
        self.active.retain(|s| *s != sub);
    }

    fn poll_event(&mut self) -> Option<HostEvent> {
        while let Some(event) = self.queue.pop_front() {
            if self.is_subscribed(event.kind()) {
                return Some(event);
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/host.rs"]
mod tests;
