//! Headless session run
//!
//! Drives a [`Session`] through the whole object lifecycle without a
//! socket: clients bind the seat at different versions, the seat gains a
//! capability, one client builds a synchronized subsurface tree, and a model
//! client mirrors the window list and asks to minimize a window.

use crate::model::{EventFanout, Role, RoleValue, WindowModel};
use crate::protocol::{
    ClientId, CompositorRequest, Event, EventSink, Interface, Request, ResourceHandle,
    SubcompositorRequest, SubsurfaceRequest, SurfaceRequest,
};
use crate::seat::{Capability, SeatEvent, SEAT_MAX_VERSION};
use crate::session::{forward_window_events, ClientLink, Session};
use crate::surface::{BufferRef, Rect};
use crate::window::{WindowEvent, WindowManagement, WindowRequest, WindowState};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::mpsc;

/// What a headless run observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeadlessSummary {
    pub clients: usize,
    pub seat_bindings: usize,
    /// Capability updates received after the seat gained touch
    pub capability_updates: usize,
    /// Name events received across all bindings
    pub name_events: usize,
    /// Surfaces made visible by the root commit
    pub surfaces_applied: usize,
    pub model_rows: usize,
    pub minimized_rows: usize,
    pub window_requests: usize,
}

/// Run the scenario on `session` with `clients` seat clients and `windows`
/// server windows
pub async fn run(session: &Session, clients: usize, windows: usize) -> Result<HeadlessSummary> {
    let mut summary = HeadlessSummary {
        clients,
        ..Default::default()
    };

    let seat = session
        .with_display(|display| display.global_of(Interface::Seat))
        .context("No seat global advertised")?;

    let mut connections = Vec::with_capacity(clients);
    for index in 0..clients {
        let (client, link) = session.connect();
        let version = (index as u32 % SEAT_MAX_VERSION) + 1;
        session.submit(client, Request::Bind { name: seat, version })?;
        connections.push((client, link));
    }
    summary.seat_bindings =
        session.with_display(|display| display.seat(seat).map_or(0, |s| s.bindings().len()));

    for (_, link) in connections.iter_mut() {
        summary.name_events += count_seat_events(link).1;
    }
    session.with_display(|display| display.set_seat_capability(seat, Capability::Touch, true));
    for (_, link) in connections.iter_mut() {
        summary.capability_updates += count_seat_events(link).0;
    }
    info!(
        "🪑 {} seat bindings, {} capability updates",
        summary.seat_bindings, summary.capability_updates
    );

    if let Some((client, _)) = connections.first() {
        summary.surfaces_applied = build_surface_tree(session, *client)?;
        info!("🧱 Root commit applied {} surfaces", summary.surfaces_applied);
    }

    mirror_windows(session, windows, &mut summary).await?;

    for (client, _) in connections {
        session.disconnect(client);
    }
    Ok(summary)
}

/// Count (capability, name) events waiting on a link
fn count_seat_events(link: &mut ClientLink) -> (usize, usize) {
    let mut counts = (0, 0);
    while let Ok((_, event)) = link.try_recv() {
        match event {
            Event::Seat(SeatEvent::Capabilities(_)) => counts.0 += 1,
            Event::Seat(SeatEvent::Name(_)) => counts.1 += 1,
            _ => {}
        }
    }
    counts
}

fn bind(session: &Session, client: ClientId, interface: Interface, version: u32) -> Result<ResourceHandle> {
    let name = session
        .with_display(|display| display.global_of(interface))
        .with_context(|| format!("No {} global advertised", interface.name()))?;
    session
        .submit(client, Request::Bind { name, version })?
        .with_context(|| format!("Binding {} created no resource", interface.name()))
}

fn created(result: Option<ResourceHandle>) -> Result<ResourceHandle> {
    result.context("Request created no resource")
}

/// Build a root with two synchronized children, commit them, then commit
/// the root. Returns the number of surfaces the root commit applied.
fn build_surface_tree(session: &Session, client: ClientId) -> Result<usize> {
    let compositor = bind(session, client, Interface::Compositor, 4)?;
    let subcompositor = bind(session, client, Interface::Subcompositor, 1)?;

    let create_surface = || -> Result<ResourceHandle> {
        created(session.submit(
            client,
            Request::Compositor {
                compositor,
                request: CompositorRequest::CreateSurface,
            },
        )?)
    };
    let root = create_surface()?;
    let mut children = Vec::new();
    for offset in [10, 20] {
        let surface = create_surface()?;
        let subsurface = created(session.submit(
            client,
            Request::Subcompositor {
                subcompositor,
                request: SubcompositorRequest::GetSubsurface {
                    surface,
                    parent: root,
                },
            },
        )?)?;
        session.submit(
            client,
            Request::Subsurface {
                subsurface,
                request: SubsurfaceRequest::SetPosition {
                    x: offset,
                    y: offset,
                },
            },
        )?;
        children.push((surface, subsurface));
    }

    for (index, (surface, _)) in children.iter().enumerate() {
        let buffer = BufferRef {
            id: index as u32 + 1,
            width: 32,
            height: 32,
        };
        for request in [
            SurfaceRequest::Attach(Some(buffer)),
            SurfaceRequest::Damage(Rect::new(0, 0, 32, 32)),
            SurfaceRequest::Commit,
        ] {
            session.submit(
                client,
                Request::Surface {
                    surface: *surface,
                    request,
                },
            )?;
        }
    }

    // Children are synchronized: nothing is visible until the root commits
    session.with_display(|display| display.take_applied());
    session.submit(
        client,
        Request::Surface {
            surface: root,
            request: SurfaceRequest::Commit,
        },
    )?;
    let applied = session.with_display(|display| display.take_applied());
    debug!("Root commit applied {:?}", applied);
    Ok(applied.len())
}

/// Compositor policy for client window requests. Returns true if the
/// window changed.
pub fn apply_window_request(
    windows: &mut WindowManagement,
    request: WindowRequest,
    out: &mut dyn EventSink,
) -> bool {
    match request {
        WindowRequest::Activate(id) => windows.set_state(id, WindowState::ACTIVE, true, out),
        WindowRequest::Close(id) => windows.remove_window(id, out),
        WindowRequest::SetVirtualDesktop(id, desktop) => {
            windows.set_virtual_desktop(id, desktop, out)
        }
        WindowRequest::SetMinimized(id, on) => windows.set_state(id, WindowState::MINIMIZED, on, out),
        WindowRequest::SetMaximized(id, on) => windows.set_state(id, WindowState::MAXIMIZED, on, out),
        WindowRequest::SetShaded(id, on) => windows.set_state(id, WindowState::SHADED, on, out),
        // Interactive operations need a pointer grab
        WindowRequest::Move(_) | WindowRequest::Resize(_) => false,
    }
}

async fn receive(model: &mut WindowModel, events: &mut mpsc::Receiver<WindowEvent>, count: usize) {
    for _ in 0..count {
        match events.recv().await {
            Some(event) => model.handle_event(event),
            None => break,
        }
    }
}

async fn mirror_windows(session: &Session, windows: usize, summary: &mut HeadlessSummary) -> Result<()> {
    let (client, mut link) = session.connect();
    let manager = bind(session, client, Interface::WindowManagement, 1)?;

    let mut fanout = EventFanout::new();
    let mut model_events = fanout.subscribe(session.event_queue_capacity());
    let forwarder =
        tokio::spawn(async move { forward_window_events(&mut link, &mut fanout).await });

    let (requests_tx, mut requests_rx) = mpsc::unbounded_channel();
    let mut model = WindowModel::new(requests_tx);

    let flags = WindowState::MINIMIZABLE
        | WindowState::MAXIMIZABLE
        | WindowState::MOVABLE
        | WindowState::RESIZABLE;
    session.with_display(|display| {
        display.with_windows(|global, out| {
            for index in 0..windows {
                let id = global.create_window(out);
                global.set_title(id, &format!("Window {}", index + 1), out);
                global.set_app_id(id, "org.tether.headless", out);
                global.set_state(id, flags, true, out);
            }
        })
    });
    // Created, title, app id and state for every window
    receive(&mut model, &mut model_events, windows * 4).await;
    info!("🪟 Model mirrors {} windows", model.row_count());

    model.request_toggle_minimized(0);
    while let Ok(request) = requests_rx.try_recv() {
        session.submit(client, Request::WindowManagement { manager, request })?;
    }
    let changed = session.with_display(|display| {
        let requests = display.take_window_requests();
        summary.window_requests = requests.len();
        display.with_windows(|global, out| {
            requests
                .into_iter()
                .filter(|queued| apply_window_request(global, queued.request, out))
                .count()
        })
    });
    receive(&mut model, &mut model_events, changed).await;

    summary.model_rows = model.row_count();
    summary.minimized_rows = (0..model.row_count() as i32)
        .filter(|row| model.data(*row, Role::IsMinimized) == Some(RoleValue::Bool(true)))
        .count();

    session.disconnect(client);
    let forwarded = forwarder.await.context("Window event forwarder panicked")?;
    debug!("Forwarded {} window events", forwarded);
    Ok(())
}
