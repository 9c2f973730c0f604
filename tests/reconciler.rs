//! End-to-end reconciler scenarios against the simulated native platform

use std::cell::Cell;
use std::rc::Rc;

use winwm::config::{PlatformConfig, ReconcilerConfig};
use winwm::platform::sim::NativeCall;
use winwm::platform::{ColormapId, MenuHandle, NativeEvent, NativePlatform, SimulatedPlatform};
use winwm::shared::{Point, Rect, Size};
use winwm::wm::client_flags::{LifecycleState, StateHint};
use winwm::wm::command;
use winwm::wm::decorations::DecorationStyle;
use winwm::wm::geometry_spec::GeometrySpec;
use winwm::wm::{EventReply, GeometryManager, ToolkitEvent, ToplevelOptions, WindowId, WindowManager};
use winwm::WmError;

type Wm = WindowManager<SimulatedPlatform>;

fn manager_with(platform: PlatformConfig) -> Wm {
    WindowManager::new(SimulatedPlatform::new(platform), ReconcilerConfig::default())
}

fn manager() -> Wm {
    manager_with(PlatformConfig::default())
}

fn add_toplevel(wm: &mut Wm, id: WindowId, path: &str) {
    let options = ToplevelOptions {
        req_size: Some(Size::new(200, 100)),
        ..Default::default()
    };
    wm.register_toplevel(id, path, options).unwrap();
}

/// Registered, mapped and settled, with the call log cleared
fn mapped(wm: &mut Wm, id: WindowId, path: &str) {
    add_toplevel(wm, id, path);
    wm.map_window(id).unwrap();
    wm.run_idle();
    wm.platform_mut().clear_calls();
    wm.take_toolkit_events();
}

fn frame_rects(wm: &Wm) -> Vec<Rect> {
    wm.platform()
        .calls()
        .iter()
        .filter_map(|call| match call {
            NativeCall::SetFrameRect { rect, .. } => Some(*rect),
            _ => None,
        })
        .collect()
}

#[test]
fn reconcile_twice_issues_one_move() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.request_geometry(1, "300x200+10+10").unwrap();

    wm.reconcile(1);
    wm.reconcile(1);
    assert_eq!(wm.platform().frame_rect_calls(), 1);
    assert!(!wm.is_scheduled(1));
    assert_eq!(wm.run_idle(), 0);
}

#[test]
fn simple_move_resize() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.request_geometry(1, "300x200+10+10").unwrap();
    wm.run_idle();

    // Resizable frame: 4px sizing border and a 19px caption
    assert_eq!(frame_rects(&wm), vec![Rect::new(10, 10, 308, 227)]);

    wm.on_structure_changed(1, Point::new(10, 10), Size::new(300, 200), StateHint::Normal);
    let record = wm.record(1).unwrap();
    assert!(record.pending.is_empty(), "pending {:?}", record.pending);
    assert_eq!(record.state, LifecycleState::Normal);
    assert!(!wm.is_scheduled(1));
}

#[test]
fn negative_offsets_measure_from_far_edges() {
    for (x, y) in [(0, 0), (30, 40), (500, 700)] {
        let mut wm = manager();
        mapped(&mut wm, 1, ".t");
        wm.request_geometry(1, &format!("300x200-{x}-{y}")).unwrap();
        wm.run_idle();

        let expected = Rect::new(1280 - x - 308, 1024 - y - 227, 308, 227);
        assert_eq!(frame_rects(&wm), vec![expected]);
        assert_eq!(wm.geometry_string(1).unwrap(), format!("300x200-{x}-{y}"));
    }
}

#[test]
fn geometry_strings_survive_parse_and_print() {
    for text in ["300x200+10+10", "1x1-0-0", "640x480+-5-7", "20x30", "+0+0", "-15+15"] {
        let spec: GeometrySpec = text.parse().unwrap();
        assert_eq!(spec.to_string(), text);
    }
    assert!(matches!("=".parse::<GeometrySpec>(), Ok(spec) if spec.size.is_none() && spec.position.is_none()));
    assert!(matches!("10x10+5".parse::<GeometrySpec>(), Err(WmError::BadGeometry(_))));
}

#[test]
fn grid_round_trip_keeps_units() {
    for (base, inc, units) in [(1, 1, 7), (5, 20, 3), (10, 6, 12), (2, 9, 2)] {
        let mut wm = manager();
        mapped(&mut wm, 1, ".t");
        wm.set_grid(1, 1, base, base, inc, inc).unwrap();
        wm.request_geometry(1, &format!("{units}x{units}")).unwrap();
        wm.run_idle();

        wm.unset_grid(1, 1).unwrap();
        wm.run_idle();
        wm.set_grid(1, 1, base, base, inc, inc).unwrap();
        assert_eq!(
            wm.record(1).unwrap().requested_size,
            Some(Size::new(units, units)),
            "base {base} inc {inc}"
        );
    }
}

#[test]
fn gridding_then_ungridding() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.set_grid(1, 1, 5, 5, 20, 20).unwrap();
    assert_eq!(wm.record(1).unwrap().requested_size, None);

    wm.request_geometry(1, "3x3").unwrap();
    wm.run_idle();
    // 200x100 natural size is 5x5 units; two units fewer at 20px each
    assert_eq!(wm.record(1).unwrap().applied_client, Size::new(160, 60));
    assert_eq!(wm.geometry_string(1).unwrap().split('+').next(), Some("3x3"));

    wm.platform_mut().clear_calls();
    wm.unset_grid(1, 1).unwrap();
    wm.run_idle();
    let record = wm.record(1).unwrap();
    assert_eq!(record.increments(), Size::new(1, 1));
    assert_eq!(record.requested_size, Some(Size::new(160, 60)));
    assert_eq!(wm.platform().frame_rect_calls(), 0);
}

#[test]
fn request_from_inside_a_configure_callback_is_honored() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");

    let fired = Rc::new(Cell::new(false));
    let seen = Rc::clone(&fired);
    wm.set_event_hook(Box::new(move |wm: &mut Wm, event: &ToolkitEvent| {
        if matches!(event, ToolkitEvent::Configure { window: 1, .. }) && !seen.get() {
            seen.set(true);
            wm.request_geometry(1, "+50+60").unwrap();
        }
    }));

    wm.request_geometry(1, "300x200+10+10").unwrap();
    wm.run_idle();

    assert!(fired.get());
    let rects = frame_rects(&wm);
    assert_eq!(rects.first(), Some(&Rect::new(10, 10, 308, 227)));
    assert_eq!(rects.last(), Some(&Rect::new(50, 60, 308, 227)));
    let frame = wm.record(1).unwrap().frame.unwrap();
    assert_eq!(wm.platform().frame_rect(frame).map(|r| r.position()), Some(Point::new(50, 60)));
    assert!(!wm.is_scheduled(1));
}

#[test]
fn lifecycle_requests_follow_the_transition_table() {
    #[derive(Debug, Clone, Copy)]
    enum Kind {
        Plain,
        Override,
        Transient,
    }
    let legal = |kind: Kind, target: LifecycleState| match (kind, target) {
        (Kind::Override, LifecycleState::Iconic | LifecycleState::Zoomed) => false,
        (Kind::Transient, LifecycleState::Iconic) => false,
        _ => true,
    };

    for kind in [Kind::Plain, Kind::Override, Kind::Transient] {
        for from in LifecycleState::REQUESTABLE {
            for target in LifecycleState::REQUESTABLE {
                let mut wm = manager();
                mapped(&mut wm, 1, ".master");
                mapped(&mut wm, 2, ".w");
                wm.set_lifecycle_state(2, from).unwrap();
                match kind {
                    Kind::Plain => {}
                    Kind::Override => wm.set_override_redirect(2, true).unwrap(),
                    Kind::Transient => wm.set_master(2, Some(1)).unwrap(),
                }
                assert_eq!(wm.lifecycle_state(2).unwrap(), from);

                let result = wm.set_lifecycle_state(2, target);
                let context = format!("{kind:?}: {from} -> {target} gave {result:?}");
                assert_eq!(result.is_ok(), legal(kind, target), "{context}");
                let expected = if result.is_ok() { target } else { from };
                assert_eq!(wm.lifecycle_state(2).unwrap(), expected, "{context}");
            }
        }
    }
}

#[test]
fn iconic_window_defers_geometry_until_restored() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.set_lifecycle_state(1, LifecycleState::Iconic).unwrap();
    wm.platform_mut().clear_calls();

    wm.request_geometry(1, "400x300").unwrap();
    wm.run_idle();
    assert_eq!(wm.platform().frame_rect_calls(), 0);
    assert_eq!(wm.record(1).unwrap().requested_size, Some(Size::new(400, 300)));

    wm.set_lifecycle_state(1, LifecycleState::Normal).unwrap();
    wm.run_idle();
    assert_eq!(wm.platform().frame_rect_calls(), 1);
    assert_eq!(wm.record(1).unwrap().applied_client, Size::new(400, 300));
}

#[test]
fn zoomed_window_defers_geometry_until_restored() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.set_lifecycle_state(1, LifecycleState::Zoomed).unwrap();
    wm.run_idle();
    wm.platform_mut().clear_calls();

    wm.request_geometry(1, "400x300").unwrap();
    wm.run_idle();
    assert_eq!(wm.platform().frame_rect_calls(), 0);
    assert!(!wm.is_scheduled(1));

    wm.set_lifecycle_state(1, LifecycleState::Normal).unwrap();
    assert!(wm.is_scheduled(1));
    wm.run_idle();
    let record = wm.record(1).unwrap();
    assert_eq!(record.state, LifecycleState::Normal);
    assert_eq!(record.applied_client, Size::new(400, 300));
    assert!(record.pending.is_empty(), "pending {:?}", record.pending);
    assert_eq!(wm.platform().frame_rect_calls(), 1);
}

#[test]
fn destroying_a_master_frees_its_transients() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".a");
    mapped(&mut wm, 2, ".b");
    wm.set_master(2, Some(1)).unwrap();
    wm.run_idle();
    let dialog_frame = wm.record(2).unwrap().frame;
    assert_eq!(
        wm.record(2).unwrap().applied_style.map(|s| s.class),
        Some(DecorationStyle::TransientDialog)
    );

    wm.destroy_toplevel(1).unwrap();
    assert_eq!(wm.record(2).unwrap().master, None);
    assert!(wm.is_scheduled(2));
    wm.run_idle();

    let record = wm.record(2).unwrap();
    assert_eq!(record.applied_style.map(|s| s.class), Some(DecorationStyle::NormalToplevel));
    assert_ne!(record.frame, dialog_frame);
    assert_eq!(record.state, LifecycleState::Normal);
}

#[test]
fn menu_wrap_retry_stops_when_os_refuses_growth() {
    let mut platform = PlatformConfig::default();
    platform.menu_wrap_width = 400;
    let mut wm = manager_with(platform);
    let options = ToplevelOptions {
        req_size: Some(Size::new(300, 200)),
        ..Default::default()
    };
    wm.register_toplevel(1, ".t", options).unwrap();
    wm.set_menu(1, Some(MenuHandle(7))).unwrap();
    wm.map_window(1).unwrap();
    wm.run_idle();

    // Frame with menu: 200 + 4 + 19 + 19 + 4; the OS won't go taller
    wm.platform_mut().config_mut().max_frame_height = 246;
    wm.platform_mut().clear_calls();
    wm.request_geometry(1, "+0+0").unwrap();
    wm.run_idle();

    assert_eq!(wm.platform().frame_rect_calls(), 2);
    assert_eq!(wm.record(1).unwrap().applied_client, Size::new(300, 181));
    assert!(!wm.is_scheduled(1));
}

#[test]
fn close_without_handler_destroys_and_with_handler_runs_script() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".a");
    mapped(&mut wm, 2, ".b");
    command::execute(&mut wm, &["protocol", ".b", "WM_DELETE_WINDOW", "ask_user"]).unwrap();

    let frame_a = wm.record(1).unwrap().frame.unwrap();
    let frame_b = wm.record(2).unwrap().frame.unwrap();
    wm.platform_mut().inject(NativeEvent::Close { frame: frame_a });
    wm.platform_mut().inject(NativeEvent::Close { frame: frame_b });
    wm.dispatch_sent_events();

    assert!(wm.record(1).is_none());
    assert!(!wm.platform().frame_exists(frame_a));
    assert!(wm.record(2).is_some());
    let events = wm.take_toolkit_events();
    assert!(events.contains(&ToolkitEvent::Destroy { window: 1 }));
    assert!(events.contains(&ToolkitEvent::Command {
        window: 2,
        script: "ask_user".into()
    }));
}

#[test]
fn huge_gridded_request_is_clamped_to_the_screen() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.set_grid(1, 1, 0, 0, 1000, 1000).unwrap();
    wm.request_geometry(1, "5000000x10").unwrap();
    wm.run_idle();

    // OS tracking maximum less the resizable frame
    assert_eq!(wm.record(1).unwrap().applied_client, Size::new(1284, 1009));
    assert_eq!(wm.platform().frame_rect_calls(), 1);
}

#[test]
fn foreground_palette_is_the_toplevels_own() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.set_window_colormap(1, ColormapId(9));
    wm.set_window_colormap(10, ColormapId(5));
    wm.set_window_colormap(11, ColormapId(6));
    wm.add_to_colormap_windows(1, 10).unwrap();
    wm.add_to_colormap_windows(1, 11).unwrap();
    assert_eq!(wm.colormap_windows(1).unwrap(), vec![10, 11, 1]);

    let frame = wm.record(1).unwrap().frame.unwrap();
    let reply = wm.handle_native_event(NativeEvent::QueryNewPalette { frame });
    assert_eq!(reply, EventReply::PaletteRealized(true));
    let realized: Vec<_> = wm
        .platform()
        .calls()
        .iter()
        .filter_map(|call| match call {
            NativeCall::RealizePalette { colormap, background, .. } => Some((*colormap, *background)),
            _ => None,
        })
        .collect();
    assert_eq!(
        realized,
        vec![(ColormapId(9), false), (ColormapId(5), true), (ColormapId(6), true)]
    );
}

#[test]
fn destroy_cancels_queued_pass() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    wm.request_geometry(1, "300x200").unwrap();
    assert!(wm.is_scheduled(1));

    wm.destroy_toplevel(1).unwrap();
    assert!(!wm.is_scheduled(1));
    assert_eq!(wm.run_idle(), 0);
    assert_eq!(wm.platform().frame_rect_calls(), 0);
}

#[test]
fn external_destroy_is_a_lifecycle_event() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    let frame = wm.record(1).unwrap().frame.unwrap();
    wm.platform_mut().inject(NativeEvent::Destroyed { frame });
    wm.dispatch_sent_events();

    assert!(wm.record(1).is_none());
    assert!(wm.lookup(".t").is_err());
    assert_eq!(wm.take_toolkit_events(), vec![ToolkitEvent::Destroy { window: 1 }]);
}

#[test]
fn user_resize_is_kept_by_later_passes() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    let frame = wm.record(1).unwrap().frame.unwrap();

    wm.platform_mut().user_place(frame, Rect::new(100, 100, 408, 327));
    wm.dispatch_sent_events();
    assert_eq!(wm.record(1).unwrap().requested_size, Some(Size::new(400, 300)));

    // New natural content size does not undo the user's resize
    wm.requested_geometry_changed(1, Size::new(250, 150));
    wm.run_idle();
    assert_eq!(wm.record(1).unwrap().applied_client, Size::new(400, 300));
    assert_eq!(wm.geometry_string(1).unwrap(), "400x300+100+100");
}

#[test]
fn command_errors_leave_records_untouched() {
    let mut wm = manager();
    mapped(&mut wm, 1, ".t");
    let before = wm.snapshot(1).unwrap();

    assert!(matches!(
        command::execute(&mut wm, &["geometry", ".t", "300x"]),
        Err(WmError::BadGeometry(_))
    ));
    assert!(matches!(
        command::execute(&mut wm, &["frobnicate", ".t"]),
        Err(WmError::UnknownSubcommand { .. })
    ));
    assert!(matches!(
        command::execute(&mut wm, &["grid", ".t", "1", "2"]),
        Err(WmError::WrongArgs(_))
    ));
    assert!(matches!(
        command::execute(&mut wm, &["aspect", ".t", "1", "0", "1", "1"]),
        Err(WmError::InvalidValue(_))
    ));

    let after = wm.snapshot(1).unwrap();
    assert_eq!(
        serde_json::to_value(&before).unwrap(),
        serde_json::to_value(&after).unwrap()
    );
    assert!(!wm.is_scheduled(1));
    assert_eq!(after.pending, 0);
}
