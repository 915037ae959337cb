use std::io::Write;
use std::os::unix::net::UnixStream;

use super::*;
use crate::wayland::{
    interfaces::wl_shm::format::{ARGB8888, XRGB8888},
    testing::{requests, sent, Event, Request},
    ObjectId,
};

const REGISTRY: u32 = 2;
const COMPOSITOR: u32 = 3;
const WM_BASE: u32 = 4;
const SHM: u32 = 5;
const SURFACE: u32 = 6;
const XDG_SURFACE: u32 = 7;
const TOPLEVEL: u32 = 8;

fn window() -> (Window, UnixStream) {
    let (ours, theirs) = UnixStream::pair().unwrap();
    theirs.set_nonblocking(true).unwrap();
    let window = Window::new(Connection::from_fd(ours.into()), WindowConfig::default()).unwrap();
    (window, theirs)
}

fn feed(window: &mut Window, events: &[Event]) -> Result<(), Error> {
    let bytes: Vec<u8> = events.iter().flat_map(Event::bytes).collect();
    let consumed = window.dispatch(&bytes)?;
    assert_eq!(consumed, bytes.len());
    Ok(())
}

fn global(name: u32, interface: &str, version: u32) -> Event {
    Event::new(REGISTRY, 0)
        .u32(name)
        .string(interface)
        .u32(version)
}

fn assert_ops(requests: &[Request], expected: &[(u32, u16)]) {
    let ops: Vec<(u32, u16)> = requests
        .iter()
        .map(|r| (r.header.object_id, r.header.opcode))
        .collect();
    assert_eq!(ops, expected);
}

/// A window with its globals bound and everything it sent so far drained
fn bound_window() -> (Window, UnixStream) {
    let (mut window, mut peer) = window();
    feed(
        &mut window,
        &[
            global(1, "wl_compositor", 6),
            global(2, "xdg_wm_base", 6),
            global(3, "wl_shm", 1),
        ],
    )
    .unwrap();
    sent(&mut peer);
    (window, peer)
}

/// A window that is configured and about to present its first buffer
fn configured_window() -> (Window, UnixStream) {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    feed(
        &mut window,
        &[
            Event::new(TOPLEVEL, 0).i32(320).i32(240).array(&[]),
            Event::new(XDG_SURFACE, 0).u32(1),
        ],
    )
    .unwrap();
    sent(&mut peer);
    (window, peer)
}

#[test]
fn new_window_asks_for_registry() {
    let (window, mut peer) = window();
    let requests = requests(&mut peer);
    assert_ops(&requests, &[(1, 1)]);
    assert_eq!(requests[0].args().read_u32().unwrap(), REGISTRY);
    assert_eq!(window.stage(), Stage::None);
}

#[test]
fn binds_announced_compositor() {
    let (mut window, mut peer) = window();
    sent(&mut peer);

    feed(&mut window, &[global(7, "wl_compositor", 4)]).unwrap();

    let requests = requests(&mut peer);
    assert_ops(&requests, &[(REGISTRY, 0)]);
    let mut args = requests[0].args();
    assert_eq!(args.read_u32().unwrap(), 7);
    assert_eq!(args.read_string().unwrap(), "wl_compositor");
    assert_eq!(args.read_u32().unwrap(), 4);
    assert_eq!(args.read_u32().unwrap(), 3);
    assert_eq!(
        window.objects().get(WlDynObj::Compositor),
        ObjectId::from_raw(3)
    );
}

#[test]
fn binds_each_global_once() {
    let (mut window, mut peer) = window();
    sent(&mut peer);

    feed(
        &mut window,
        &[
            global(1, "wl_seat", 9),
            global(2, "xdg_wm_base", 9),
            global(3, "wl_output", 4),
            global(4, "wl_output", 4),
            global(5, "zwlr_layer_shell_v1", 4),
        ],
    )
    .unwrap();

    let requests = requests(&mut peer);
    assert_eq!(requests.len(), 2);

    let mut args = requests[0].args();
    assert_eq!(args.read_u32().unwrap(), 2);
    assert_eq!(args.read_string().unwrap(), "xdg_wm_base");
    // we do not know about anything newer
    assert_eq!(args.read_u32().unwrap(), 6);

    let mut args = requests[1].args();
    assert_eq!(args.read_u32().unwrap(), 3);
    assert_eq!(args.read_string().unwrap(), "wl_output");

    assert!(window.objects().get(WlDynObj::Output).is_some());
}

#[test]
fn configure_before_globals_changes_nothing() {
    let (mut window, mut peer) = window();
    sent(&mut peer);

    feed(
        &mut window,
        &[
            Event::new(TOPLEVEL, 0).i32(800).i32(600).array(&[]),
            Event::new(XDG_SURFACE, 0).u32(42),
            Event::new(11, 0).u32(1234),
        ],
    )
    .unwrap();
    window.set_up().unwrap();

    assert_eq!(window.stage(), Stage::None);
    assert_eq!(window.size(), (640, 480, 2560));
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn surface_chain_needs_both_globals() {
    let (mut window, mut peer) = window();
    feed(&mut window, &[global(1, "wl_compositor", 6)]).unwrap();
    sent(&mut peer);
    window.set_up().unwrap();
    assert_eq!(window.stage(), Stage::None);
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn creates_surface_chain_once() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    assert_eq!(window.stage(), Stage::SurfaceChainCreated);

    let requests = requests(&mut peer);
    assert_ops(
        &requests,
        &[
            (COMPOSITOR, 0),
            (WM_BASE, 2),
            (XDG_SURFACE, 1),
            (TOPLEVEL, 2),
            (TOPLEVEL, 3),
            (SURFACE, 6),
        ],
    );
    assert_eq!(requests[0].args().read_u32().unwrap(), SURFACE);
    let mut args = requests[1].args();
    assert_eq!(args.read_u32().unwrap(), XDG_SURFACE);
    assert_eq!(args.read_u32().unwrap(), SURFACE);
    assert_eq!(requests[2].args().read_u32().unwrap(), TOPLEVEL);
    assert_eq!(requests[3].args().read_string().unwrap(), "rawland");

    // nothing changed, so nothing happens
    window.set_up().unwrap();
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn acks_configure() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    sent(&mut peer);

    feed(&mut window, &[Event::new(XDG_SURFACE, 0).u32(42)]).unwrap();

    let requests = requests(&mut peer);
    assert_ops(&requests, &[(XDG_SURFACE, 4)]);
    assert_eq!(requests[0].args().read_u32().unwrap(), 42);
    assert_eq!(window.stage(), Stage::ConfigureAcked);
}

#[test]
fn toplevel_configure_only_records_size() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    sent(&mut peer);

    feed(
        &mut window,
        &[Event::new(TOPLEVEL, 0)
            .i32(800)
            .i32(600)
            .array(&[1, 0, 0, 0, 4, 0, 0, 0])],
    )
    .unwrap();

    assert_eq!(window.size(), (800, 600, 3200));
    assert!(sent(&mut peer).is_empty());
    assert_eq!(window.stage(), Stage::SurfaceChainCreated);
}

#[test]
fn zero_size_keeps_the_default() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    feed(
        &mut window,
        &[Event::new(TOPLEVEL, 0).i32(0).i32(0).array(&[])],
    )
    .unwrap();
    sent(&mut peer);
    assert_eq!(window.size(), (640, 480, 2560));
}

#[test]
fn unallocatable_size_is_ignored() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    sent(&mut peer);
    feed(
        &mut window,
        &[
            Event::new(TOPLEVEL, 0).i32(i32::MAX).i32(10).array(&[]),
            Event::new(TOPLEVEL, 0).i32(40000).i32(40000).array(&[]),
            Event::new(XDG_SURFACE, 0).u32(5),
        ],
    )
    .unwrap();
    assert_eq!(window.size(), (640, 480, 2560));
    assert_eq!(window.stage(), Stage::ConfigureAcked);
}

#[test]
fn presents_first_buffer() {
    let (mut window, mut peer) = configured_window();
    window.set_up().unwrap();
    assert_eq!(window.stage(), Stage::BufferAttached);

    let pool = 9;
    let buffer = 10;
    let callback = 11;
    let requests = requests(&mut peer);
    assert_ops(
        &requests,
        &[
            (SHM, 0),
            (pool, 0),
            (pool, 1),
            (SURFACE, 1),
            (SURFACE, 2),
            (SURFACE, 3),
            (SURFACE, 6),
        ],
    );

    let mut args = requests[0].args();
    assert_eq!(args.read_u32().unwrap(), pool);
    assert_eq!(args.read_i32().unwrap(), 320 * 4 * 240);

    let mut args = requests[1].args();
    assert_eq!(args.read_u32().unwrap(), buffer);
    assert_eq!(args.read_i32().unwrap(), 0);
    assert_eq!(args.read_i32().unwrap(), 320);
    assert_eq!(args.read_i32().unwrap(), 240);
    assert_eq!(args.read_i32().unwrap(), 320 * 4);
    assert_eq!(args.read_u32().unwrap(), XRGB8888);

    let mut args = requests[3].args();
    assert_eq!(args.read_u32().unwrap(), buffer);
    assert_eq!(args.read_i32().unwrap(), 0);
    assert_eq!(args.read_i32().unwrap(), 0);

    let mut args = requests[4].args();
    for expected in [0, 0, 320, 240] {
        assert_eq!(args.read_i32().unwrap(), expected);
    }
    assert_eq!(requests[5].args().read_u32().unwrap(), callback);

    let pixels = window.pixels().unwrap();
    assert_eq!(pixels.len(), 320 * 240 * 4);
    assert!(pixels
        .chunks_exact(4)
        .all(|p| u32::from_le_bytes(p.try_into().unwrap()) == 0xFF00_0000));

    // only ever one pool per configure
    window.set_up().unwrap();
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn waits_for_shm() {
    let (mut window, mut peer) = window();
    feed(
        &mut window,
        &[global(1, "wl_compositor", 6), global(2, "xdg_wm_base", 6)],
    )
    .unwrap();
    window.set_up().unwrap();
    feed(&mut window, &[Event::new(6, 0).u32(1)]).unwrap();
    sent(&mut peer);

    window.set_up().unwrap();
    assert_eq!(window.stage(), Stage::ConfigureAcked);
    assert!(sent(&mut peer).is_empty());

    feed(&mut window, &[global(3, "wl_shm", 1)]).unwrap();
    window.set_up().unwrap();
    assert_eq!(window.stage(), Stage::BufferAttached);
}

#[test]
fn frame_callback_presents_next_frame() {
    let (mut window, mut peer) = configured_window();
    window.set_up().unwrap();
    sent(&mut peer);

    feed(&mut window, &[Event::new(11, 0).u32(16)]).unwrap();

    let (callback, pool, buffer) = (12, 13, 14);
    let requests = requests(&mut peer);
    assert_ops(
        &requests,
        &[
            (SURFACE, 3),
            (SHM, 0),
            (pool, 0),
            (pool, 1),
            (SURFACE, 1),
            (SURFACE, 2),
            (SURFACE, 6),
            // the buffer of the first frame
            (10, 0),
        ],
    );
    assert_eq!(requests[0].args().read_u32().unwrap(), callback);
    assert_eq!(requests[2].args().read_u32().unwrap(), buffer);

    // one shade lighter than the first frame
    let pixels = window.pixels().unwrap();
    assert_eq!(
        u32::from_le_bytes(pixels[..4].try_into().unwrap()),
        0xFF01_0101
    );

    // the old callback is no longer ours
    feed(&mut window, &[Event::new(11, 0).u32(32)]).unwrap();
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn resize_applies_on_next_frame() {
    let (mut window, mut peer) = configured_window();
    window.set_up().unwrap();
    feed(
        &mut window,
        &[
            Event::new(TOPLEVEL, 0).i32(100).i32(50).array(&[]),
            Event::new(XDG_SURFACE, 0).u32(2),
        ],
    )
    .unwrap();
    sent(&mut peer);

    feed(&mut window, &[Event::new(11, 0).u32(16)]).unwrap();
    let requests = requests(&mut peer);
    let mut args = requests[1].args();
    args.read_u32().unwrap();
    assert_eq!(args.read_i32().unwrap(), 100 * 4 * 50);
    assert_eq!(window.pixels().unwrap().len(), 100 * 4 * 50);
    assert_eq!(window.stage(), Stage::BufferAttached);
}

#[test]
fn answers_ping() {
    let (mut window, mut peer) = bound_window();
    feed(&mut window, &[Event::new(WM_BASE, 0).u32(99)]).unwrap();
    let requests = requests(&mut peer);
    assert_ops(&requests, &[(WM_BASE, 3)]);
    assert_eq!(requests[0].args().read_u32().unwrap(), 99);
}

#[test]
fn records_shm_formats() {
    let (mut window, _peer) = bound_window();
    feed(
        &mut window,
        &[
            Event::new(SHM, 0).u32(ARGB8888),
            Event::new(SHM, 0).u32(XRGB8888),
            Event::new(SHM, 0).u32(XRGB8888),
        ],
    )
    .unwrap();
    assert_eq!(window.shm_formats(), [ARGB8888, XRGB8888]);
}

#[test]
fn protocol_error_stops_dispatch() {
    let (mut window, mut peer) = window();
    sent(&mut peer);

    let events = [
        Event::new(1, 0).u32(REGISTRY).u32(3).string("invalid method"),
        global(1, "wl_compositor", 4),
    ];
    let err = feed(&mut window, &events).unwrap_err();

    match err {
        Error::Protocol {
            object_id,
            interface,
            code,
            message,
        } => {
            assert_eq!(object_id, REGISTRY);
            assert_eq!(interface, "wl_registry");
            assert_eq!(code, 3);
            assert_eq!(message, "invalid method");
        }
        e => panic!("expected a protocol error, got {e:?}"),
    }
    assert!(sent(&mut peer).is_empty());
    assert_eq!(window.objects().get(WlDynObj::Compositor), None);
}

#[test]
fn partial_messages_wait_for_the_rest() {
    let (mut window, mut peer) = window();
    sent(&mut peer);

    let bytes = global(7, "wl_compositor", 4).bytes();
    for split in [3, 8, 12, bytes.len() - 4] {
        let (mut window, _) = self::window();
        assert_eq!(window.dispatch(&bytes[..split]).unwrap(), 0);
        assert_eq!(window.objects().get(WlDynObj::Compositor), None);
    }

    let mut two = bytes.clone();
    two.extend_from_slice(&bytes[..10]);
    assert_eq!(window.dispatch(&two).unwrap(), bytes.len());
    assert!(window.objects().get(WlDynObj::Compositor).is_some());
    assert_eq!(requests(&mut peer).len(), 1);
}

#[test]
fn impossible_sizes_are_fatal() {
    for size in [0u32, 4, 13] {
        let (mut window, _) = window();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&REGISTRY.to_le_bytes());
        bytes.extend_from_slice(&(size << 16).to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            window.dispatch(&bytes),
            Err(Error::Framing { .. })
        ));
    }
}

#[test]
fn unknown_opcodes_are_skipped() {
    let (mut window, mut peer) = window();
    sent(&mut peer);
    feed(
        &mut window,
        &[
            Event::new(REGISTRY, 7).u32(1).u32(2).u32(3),
            Event::new(1, 9).string("from the future"),
            global(1, "wl_compositor", 4),
        ],
    )
    .unwrap();
    assert_eq!(requests(&mut peer).len(), 1);
}

#[test]
fn delete_id_forgets_object() {
    let (mut window, _peer) = bound_window();
    let shm = ObjectId::from_raw(SHM).unwrap();
    feed(&mut window, &[Event::new(1, 1).u32(SHM)]).unwrap();
    assert_eq!(window.objects().lookup(shm), None);
    // events for it are now ignored
    feed(&mut window, &[Event::new(SHM, 0).u32(XRGB8888)]).unwrap();
    assert!(window.shm_formats().is_empty());
}

#[test]
fn close_marks_window_closed() {
    let (mut window, _peer) = bound_window();
    window.set_up().unwrap();
    assert!(!window.is_closed());
    feed(&mut window, &[Event::new(TOPLEVEL, 1)]).unwrap();
    assert!(window.is_closed());
}

#[test]
fn run_until_closed() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    sent(&mut peer);

    peer.write_all(&Event::new(TOPLEVEL, 1).bytes()).unwrap();
    window.run().unwrap();
    assert!(window.is_closed());
    assert!(sent(&mut peer).is_empty());
}

#[test]
fn run_reports_hangup() {
    let (mut window, peer) = window();
    drop(peer);
    assert!(matches!(window.run(), Err(Error::ConnectionClosed)));
}

#[test]
fn tear_down_destroys_roles_first() {
    let (mut window, mut peer) = bound_window();
    window.set_up().unwrap();
    sent(&mut peer);
    window.destroy();
    assert_ops(
        &requests(&mut peer),
        &[(TOPLEVEL, 0), (XDG_SURFACE, 0), (SURFACE, 0)],
    );
}
