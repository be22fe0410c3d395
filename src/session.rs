//! In-process session
//!
//! Wraps a [`Display`] in one coarse lock so that requests from any number
//! of connections are serialized into turns. After every turn the queued
//! events are flushed to per-client unbounded links, so the server never
//! waits on a slow client.

use crate::config::TetherConfig;
use crate::display::Display;
use crate::model::EventFanout;
use crate::protocol::{ClientId, Event, ProtocolError, Request, ResourceHandle};
use crate::window::{WindowEvent, WindowRequest};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events delivered to one client, tagged with their target resource
pub type ClientLink = mpsc::UnboundedReceiver<(ResourceHandle, Event)>;

struct Inner {
    display: Display,
    links: HashMap<ClientId, mpsc::UnboundedSender<(ResourceHandle, Event)>>,
}

impl Inner {
    fn flush(&mut self) {
        for (client, events) in self.display.take_all_events() {
            let Some(link) = self.links.get(&client) else {
                continue;
            };
            for event in events {
                if link.send(event).is_err() {
                    debug!("Link to {} closed, dropping events", client);
                    break;
                }
            }
        }
    }

    fn disconnect(&mut self, client: ClientId) {
        self.display.disconnect(client);
        self.links.remove(&client);
        // Other clients may have been notified about the teardown
        self.flush();
    }
}

/// Shared handle to a display
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    event_queue_capacity: usize,
}

impl Session {
    pub fn new(config: &TetherConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                display: Display::new(config),
                links: HashMap::new(),
            })),
            event_queue_capacity: config.session.event_queue_capacity,
        }
    }

    /// Queue size for window event subscribers
    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
    }

    /// Open a connection and return the receiving end of its event link
    pub fn connect(&self) -> (ClientId, ClientLink) {
        let mut inner = self.inner.lock();
        let client = inner.display.connect();
        let (tx, rx) = mpsc::unbounded_channel();
        inner.links.insert(client, tx);
        (client, rx)
    }

    pub fn disconnect(&self, client: ClientId) {
        self.inner.lock().disconnect(client);
    }

    /// Dispatch one request as one turn.
    ///
    /// A fatal error is delivered to the client and then ends its
    /// connection.
    pub fn submit(
        &self,
        client: ClientId,
        request: Request,
    ) -> Result<Option<ResourceHandle>, ProtocolError> {
        let mut inner = self.inner.lock();
        let result = inner.display.dispatch(client, request);
        inner.flush();

        if let Err(err) = &result {
            if err.is_fatal() {
                warn!("Closing {} after fatal error: {}", client, err);
                inner.disconnect(client);
            }
        }
        result
    }

    /// Run server-side code as one turn, then flush its events
    pub fn with_display<R>(&self, f: impl FnOnce(&mut Display) -> R) -> R {
        let mut inner = self.inner.lock();
        let result = f(&mut inner.display);
        inner.flush();
        result
    }

    /// Feed requests from a model into the session until the model's sender
    /// is dropped. Returns the number of requests submitted.
    pub async fn forward_window_requests(
        &self,
        client: ClientId,
        manager: ResourceHandle,
        mut requests: mpsc::UnboundedReceiver<WindowRequest>,
    ) -> usize {
        let mut forwarded = 0;
        while let Some(request) = requests.recv().await {
            match self.submit(client, Request::WindowManagement { manager, request }) {
                Ok(_) => forwarded += 1,
                Err(err) => debug!("Window request from {} rejected: {}", client, err),
            }
        }
        forwarded
    }
}

/// Publish the window events arriving on a client link until it closes.
///
/// Other events on the link are skipped. Returns the number of events
/// published.
pub async fn forward_window_events(
    link: &mut ClientLink,
    fanout: &mut EventFanout<WindowEvent>,
) -> usize {
    let mut forwarded = 0;
    while let Some((target, event)) = link.recv().await {
        match event {
            Event::Window(event) => {
                fanout.publish(event).await;
                forwarded += 1;
            }
            other => trace!("Skipping {:?} for {}", other, target),
        }
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{GlobalName, Interface};

    fn drain(link: &mut ClientLink) -> Vec<(ResourceHandle, Event)> {
        let mut events = Vec::new();
        while let Ok(event) = link.try_recv() {
            events.push(event);
        }
        events
    }

    fn seat_global(session: &Session) -> GlobalName {
        session
            .with_display(|display| display.global_of(Interface::Seat))
            .unwrap()
    }

    #[test]
    fn test_events_are_flushed_after_each_turn() {
        let session = Session::new(&TetherConfig::default());
        let (client, mut link) = session.connect();
        let seat = seat_global(&session);

        let handle = session
            .submit(client, Request::Bind { name: seat, version: 3 })
            .unwrap()
            .unwrap();

        let events = drain(&mut link);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(target, _)| *target == handle));
    }

    #[test]
    fn test_fatal_error_closes_connection() {
        let mut config = TetherConfig::default();
        config.registry.max_resources_per_client = 1;
        let session = Session::new(&config);
        let (client, mut link) = session.connect();
        let seat = seat_global(&session);
        let compositor = session
            .with_display(|display| display.global_of(Interface::Compositor))
            .unwrap();

        session
            .submit(client, Request::Bind { name: seat, version: 3 })
            .unwrap();
        let err = session
            .submit(client, Request::Bind { name: compositor, version: 4 })
            .unwrap_err();

        assert!(err.is_fatal());
        let events = drain(&mut link);
        assert_eq!(
            events.last(),
            Some(&(ResourceHandle::display(client), Event::NoMemory))
        );
        assert!(!session.with_display(|display| display.is_connected(client)));
        // The link is closed once the connection is gone
        assert!(matches!(
            link.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
