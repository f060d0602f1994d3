/// Transition de l'état de présentation, diffusée aux abonnés.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationEvent {
    /// The page left the top.
    Scrolled,
    /// The page is back at the top.
    NotScrolled,
    /// The debug chrome collapsed (happens once per session).
    DebugHidden,
}

/// État de présentation global de la page.
///
/// Replaces ad hoc class toggling on a shared document body: the host owns
/// one instance, feeds it scroll positions, and components subscribe to the
/// transitions instead of reading global state.
///
/// # Example
/// ```
/// use cupi_core::presentation::{PresentationEvent, PresentationState};
/// let mut state = PresentationState::default();
/// let rx = state.subscribe();
/// state.on_scroll(12.0);
/// assert!(state.scrolled());
/// assert_eq!(rx.try_recv().ok(), Some(PresentationEvent::Scrolled));
/// ```
#[derive(Debug, Default)]
pub struct PresentationState {
    scrolled: bool,
    scrolled_once: bool,
    debug_hidden: bool,
    subscribers: Vec<flume::Sender<PresentationEvent>>,
}

impl PresentationState {
    /// Register a subscriber. Dropped receivers are pruned on the next broadcast.
    pub fn subscribe(&mut self) -> flume::Receiver<PresentationEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Feed the current scroll offset.
    ///
    /// The first time the page leaves the top, `scrolled_once` latches and the
    /// host is expected to call [`hide_debug`](Self::hide_debug) after its
    /// collapse delay.
    pub fn on_scroll(&mut self, scroll_y: f32) {
        let scrolled = scroll_y > 0.0;
        if scrolled == self.scrolled {
            return;
        }
        self.scrolled = scrolled;
        if scrolled {
            self.scrolled_once = true;
            self.broadcast(PresentationEvent::Scrolled);
        } else {
            self.broadcast(PresentationEvent::NotScrolled);
        }
    }

    /// Page navigation: jump back to the top.
    pub fn reset_scroll(&mut self) {
        self.on_scroll(0.0);
    }

    /// Collapse the debug chrome. Latches for the session.
    pub fn hide_debug(&mut self) {
        if self.debug_hidden {
            return;
        }
        self.debug_hidden = true;
        self.broadcast(PresentationEvent::DebugHidden);
    }

    /// `true` while the page is scrolled away from the top.
    #[must_use]
    pub fn scrolled(&self) -> bool {
        self.scrolled
    }

    /// `true` once the page has been scrolled at least once.
    #[must_use]
    pub fn scrolled_once(&self) -> bool {
        self.scrolled_once
    }

    /// `true` after the debug chrome collapsed.
    #[must_use]
    pub fn debug_hidden(&self) -> bool {
        self.debug_hidden
    }

    fn broadcast(&mut self, event: PresentationEvent) {
        log::debug!("presentation: {event:?}");
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_scroll_positions_do_not_rebroadcast() {
        let mut state = PresentationState::default();
        let rx = state.subscribe();
        state.on_scroll(5.0);
        state.on_scroll(50.0);
        state.reset_scroll();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![PresentationEvent::Scrolled, PresentationEvent::NotScrolled]
        );
        assert!(state.scrolled_once());
    }

    #[test]
    fn debug_hidden_latches() {
        let mut state = PresentationState::default();
        let rx = state.subscribe();
        state.hide_debug();
        state.hide_debug();
        assert_eq!(rx.try_iter().count(), 1);
        assert!(state.debug_hidden());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut state = PresentationState::default();
        drop(state.subscribe());
        state.on_scroll(1.0);
        assert!(state.subscribers.is_empty());
    }
}
