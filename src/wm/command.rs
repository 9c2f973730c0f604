//! Command Module
//!
//! The `wm` textual command surface. Subcommands are resolved through a
//! static dispatch table (exact name or unique prefix), argument counts are
//! checked against the table before anything is touched, and each
//! subcommand maps onto one request-side operation of the window manager.

use std::rc::Rc;

use crate::platform::NativePlatform;
use crate::shared::Point;
use crate::wm::client_flags::{FocusModel, LifecycleState, Source};
use crate::wm::error::{WmError, WmResult};
use crate::wm::hints::{AspectConstraints, Resizable};
use crate::wm::protocols::ProtocolCallback;
use crate::wm::record::Attributes;
use crate::wm::{ToolkitEvent, WindowId, WindowManager};

/// `wm` subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Aspect,
    Client,
    ColormapWindows,
    Command,
    Deiconify,
    FocusModel,
    Frame,
    Geometry,
    Grid,
    Group,
    IconBitmap,
    Iconify,
    IconMask,
    IconName,
    IconPosition,
    IconWindow,
    MaxSize,
    MinSize,
    OverrideRedirect,
    PositionFrom,
    Protocol,
    Resizable,
    SizeFrom,
    State,
    Title,
    Tracing,
    Transient,
    Withdraw,
}

/// One dispatch-table entry
#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub sub: Subcommand,
    /// Accepted argument counts after the subcommand name
    pub arities: &'static [usize],
    pub usage: &'static str,
}

/// Sorted by name
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "aspect", sub: Subcommand::Aspect, arities: &[1, 5], usage: "aspect window ?minNumer minDenom maxNumer maxDenom?" },
    CommandSpec { name: "client", sub: Subcommand::Client, arities: &[1, 2], usage: "client window ?name?" },
    CommandSpec { name: "colormapwindows", sub: Subcommand::ColormapWindows, arities: &[1, 2], usage: "colormapwindows window ?windowList?" },
    CommandSpec { name: "command", sub: Subcommand::Command, arities: &[1, 2], usage: "command window ?value?" },
    CommandSpec { name: "deiconify", sub: Subcommand::Deiconify, arities: &[1], usage: "deiconify window" },
    CommandSpec { name: "focusmodel", sub: Subcommand::FocusModel, arities: &[1, 2], usage: "focusmodel window ?active|passive?" },
    CommandSpec { name: "frame", sub: Subcommand::Frame, arities: &[1], usage: "frame window" },
    CommandSpec { name: "geometry", sub: Subcommand::Geometry, arities: &[1, 2], usage: "geometry window ?newGeometry?" },
    CommandSpec { name: "grid", sub: Subcommand::Grid, arities: &[1, 5], usage: "grid window ?baseWidth baseHeight widthInc heightInc?" },
    CommandSpec { name: "group", sub: Subcommand::Group, arities: &[1, 2], usage: "group window ?pathName?" },
    CommandSpec { name: "iconbitmap", sub: Subcommand::IconBitmap, arities: &[1, 2], usage: "iconbitmap window ?bitmap?" },
    CommandSpec { name: "iconify", sub: Subcommand::Iconify, arities: &[1], usage: "iconify window" },
    CommandSpec { name: "iconmask", sub: Subcommand::IconMask, arities: &[1, 2], usage: "iconmask window ?bitmap?" },
    CommandSpec { name: "iconname", sub: Subcommand::IconName, arities: &[1, 2], usage: "iconname window ?newName?" },
    CommandSpec { name: "iconposition", sub: Subcommand::IconPosition, arities: &[1, 3], usage: "iconposition window ?x y?" },
    CommandSpec { name: "iconwindow", sub: Subcommand::IconWindow, arities: &[1, 2], usage: "iconwindow window ?pathName?" },
    CommandSpec { name: "maxsize", sub: Subcommand::MaxSize, arities: &[1, 3], usage: "maxsize window ?width height?" },
    CommandSpec { name: "minsize", sub: Subcommand::MinSize, arities: &[1, 3], usage: "minsize window ?width height?" },
    CommandSpec { name: "overrideredirect", sub: Subcommand::OverrideRedirect, arities: &[1, 2], usage: "overrideredirect window ?boolean?" },
    CommandSpec { name: "positionfrom", sub: Subcommand::PositionFrom, arities: &[1, 2], usage: "positionfrom window ?user|program?" },
    CommandSpec { name: "protocol", sub: Subcommand::Protocol, arities: &[1, 2, 3], usage: "protocol window ?name? ?command?" },
    CommandSpec { name: "resizable", sub: Subcommand::Resizable, arities: &[1, 3], usage: "resizable window ?width height?" },
    CommandSpec { name: "sizefrom", sub: Subcommand::SizeFrom, arities: &[1, 2], usage: "sizefrom window ?user|program?" },
    CommandSpec { name: "state", sub: Subcommand::State, arities: &[1, 2], usage: "state window ?state?" },
    CommandSpec { name: "title", sub: Subcommand::Title, arities: &[1, 2], usage: "title window ?newTitle?" },
    CommandSpec { name: "tracing", sub: Subcommand::Tracing, arities: &[0, 1], usage: "tracing ?boolean?" },
    CommandSpec { name: "transient", sub: Subcommand::Transient, arities: &[1, 2], usage: "transient window ?master?" },
    CommandSpec { name: "withdraw", sub: Subcommand::Withdraw, arities: &[1], usage: "withdraw window" },
];

impl Subcommand {
    /// Resolve a subcommand by exact name or unique prefix
    pub fn lookup(name: &str) -> WmResult<&'static CommandSpec> {
        if let Some(spec) = COMMANDS.iter().find(|spec| spec.name == name) {
            return Ok(spec);
        }
        let mut matches = COMMANDS
            .iter()
            .filter(|spec| !name.is_empty() && spec.name.starts_with(name));
        match (matches.next(), matches.next()) {
            (Some(spec), None) => Ok(spec),
            (Some(_), Some(_)) => Err(WmError::AmbiguousSubcommand {
                option: name.to_string(),
                choices: choices(),
            }),
            (None, _) if name.is_empty() => Err(WmError::AmbiguousSubcommand {
                option: String::new(),
                choices: choices(),
            }),
            (None, _) => Err(WmError::UnknownSubcommand {
                option: name.to_string(),
                choices: choices(),
            }),
        }
    }
}

fn choices() -> String {
    let names: Vec<&str> = COMMANDS.iter().map(|spec| spec.name).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        Some((last, _)) => (*last).to_string(),
        None => String::new(),
    }
}

/// Run `wm <subcommand> ...`. `args` excludes the leading `wm`.
pub fn execute<P: NativePlatform + 'static>(wm: &mut WindowManager<P>, args: &[&str]) -> WmResult<String> {
    let Some((&name, rest)) = args.split_first() else {
        return Err(WmError::WrongArgs("option window ?arg ...?".to_string()));
    };
    let spec = Subcommand::lookup(name)?;
    if !spec.arities.contains(&rest.len()) {
        return Err(WmError::WrongArgs(spec.usage.to_string()));
    }

    if spec.sub == Subcommand::Tracing {
        return match rest {
            [] => Ok(bool_result(wm.tracing())),
            [value] => {
                wm.set_tracing(parse_bool(value)?);
                Ok(String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        };
    }

    let id = wm.lookup(rest[0])?;
    let values = &rest[1..];
    match spec.sub {
        Subcommand::Aspect => aspect(wm, id, values),
        Subcommand::Client => text_attribute(wm, id, values, |a| &mut a.client_machine),
        Subcommand::ColormapWindows => colormap_windows(wm, id, values),
        Subcommand::Command => command(wm, id, values),
        Subcommand::Deiconify => set_state(wm, id, LifecycleState::Normal),
        Subcommand::FocusModel => focus_model(wm, id, values),
        Subcommand::Frame => frame(wm, id),
        Subcommand::Geometry => match values {
            [] => wm.geometry_string(id),
            [spec] => wm.request_geometry(id, spec).map(|_| String::new()),
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::Grid => grid(wm, id, values),
        Subcommand::Group => match values {
            [] => Ok(name_of(wm, wm.get(id)?.attributes.group_leader)),
            [leader] => {
                let leader = optional_window(wm, leader)?;
                wm.set_group(id, leader).map(|_| String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::IconBitmap => text_attribute(wm, id, values, |a| &mut a.icon_bitmap),
        Subcommand::Iconify => set_state(wm, id, LifecycleState::Iconic),
        Subcommand::IconMask => text_attribute(wm, id, values, |a| &mut a.icon_mask),
        Subcommand::IconName => text_attribute(wm, id, values, |a| &mut a.icon_name),
        Subcommand::IconPosition => icon_position(wm, id, values),
        Subcommand::IconWindow => match values {
            [] => Ok(name_of(wm, wm.get(id)?.icon)),
            [icon] => {
                let icon = optional_window(wm, icon)?;
                wm.set_icon_window(id, icon).map(|_| String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::MaxSize => match values {
            [] => max_size(wm, id),
            [width, height] => wm
                .set_max_size(id, parse_int(width)?, parse_int(height)?)
                .map(|_| String::new()),
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::MinSize => match values {
            [] => {
                let constraints = wm.get(id)?.constraints;
                Ok(format!("{} {}", constraints.min_width, constraints.min_height))
            }
            [width, height] => wm
                .set_min_size(id, parse_int(width)?, parse_int(height)?)
                .map(|_| String::new()),
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::OverrideRedirect => match values {
            [] => Ok(bool_result(wm.get(id)?.is_override_redirect())),
            [value] => {
                let on = parse_bool(value)?;
                wm.set_override_redirect(id, on).map(|_| String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::PositionFrom => source(wm, id, values, |a| &mut a.position_source),
        Subcommand::Protocol => protocol(wm, id, values),
        Subcommand::Resizable => match values {
            [] => {
                let resizable = wm.get(id)?.resizable;
                Ok(format!("{} {}", bool_result(resizable.width), bool_result(resizable.height)))
            }
            [width, height] => {
                let resizable = Resizable {
                    width: parse_bool(width)?,
                    height: parse_bool(height)?,
                };
                wm.set_resizable(id, resizable).map(|_| String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::SizeFrom => source(wm, id, values, |a| &mut a.size_source),
        Subcommand::State => match values {
            [] => Ok(wm.lifecycle_state(id)?.name().to_string()),
            [state] => {
                let target = LifecycleState::from_name(state).ok_or_else(|| {
                    WmError::InvalidValue(format!(
                        "bad argument \"{state}\": must be normal, iconic, withdrawn, or zoomed"
                    ))
                })?;
                set_state(wm, id, target)
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::Title => match values {
            [] => wm.title(id),
            [title] => wm.set_title(id, title).map(|_| String::new()),
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::Transient => match values {
            [] => Ok(name_of(wm, wm.get(id)?.master)),
            [master] => {
                let master = optional_window(wm, master)?;
                wm.set_master(id, master).map(|_| String::new())
            }
            _ => Err(WmError::WrongArgs(spec.usage.to_string())),
        },
        Subcommand::Withdraw => set_state(wm, id, LifecycleState::Withdrawn),
        Subcommand::Tracing => Ok(String::new()),
    }
}

fn set_state<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, target: LifecycleState) -> WmResult<String> {
    wm.set_lifecycle_state(id, target).map(|_| String::new())
}

fn aspect<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    match values {
        [] => Ok(match wm.get(id)?.aspect {
            Some(a) => format!("{} {} {} {}", a.min_numer, a.min_denom, a.max_numer, a.max_denom),
            None => String::new(),
        }),
        _ if values.iter().all(|v| v.is_empty()) => wm.set_aspect(id, None).map(|_| String::new()),
        [min_numer, min_denom, max_numer, max_denom] => {
            let aspect = AspectConstraints {
                min_numer: parse_int(min_numer)?,
                min_denom: parse_int(min_denom)?,
                max_numer: parse_int(max_numer)?,
                max_denom: parse_int(max_denom)?,
            };
            wm.set_aspect(id, Some(aspect)).map(|_| String::new())
        }
        _ => Err(WmError::WrongArgs("aspect window ?minNumer minDenom maxNumer maxDenom?".to_string())),
    }
}

fn text_attribute<P: NativePlatform>(
    wm: &mut WindowManager<P>,
    id: WindowId,
    values: &[&str],
    field: impl Fn(&mut Attributes) -> &mut Option<String>,
) -> WmResult<String> {
    let attributes = wm.attributes_mut(id)?;
    let slot = field(attributes);
    match values {
        [] => Ok(slot.clone().unwrap_or_default()),
        [value] => {
            *slot = (!value.is_empty()).then(|| value.to_string());
            Ok(String::new())
        }
        _ => Err(WmError::InvalidValue("too many values".to_string())),
    }
}

fn source<P: NativePlatform>(
    wm: &mut WindowManager<P>,
    id: WindowId,
    values: &[&str],
    field: impl Fn(&mut Attributes) -> &mut Option<Source>,
) -> WmResult<String> {
    let slot = field(wm.attributes_mut(id)?);
    match values {
        [] => Ok(slot.map(|s| s.name().to_string()).unwrap_or_default()),
        [""] => {
            *slot = None;
            Ok(String::new())
        }
        [value] => {
            let parsed = Source::from_name(value).ok_or_else(|| {
                WmError::InvalidValue(format!("bad argument \"{value}\": must be program or user"))
            })?;
            *slot = Some(parsed);
            Ok(String::new())
        }
        _ => Err(WmError::InvalidValue("too many values".to_string())),
    }
}

fn focus_model<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    let attributes = wm.attributes_mut(id)?;
    match values {
        [] => Ok(attributes.focus_model.name().to_string()),
        [value] => {
            attributes.focus_model = FocusModel::from_name(value).ok_or_else(|| {
                WmError::InvalidValue(format!("bad argument \"{value}\": must be active or passive"))
            })?;
            Ok(String::new())
        }
        _ => Err(WmError::WrongArgs("focusmodel window ?active|passive?".to_string())),
    }
}

fn command<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    match values {
        [] => Ok(wm
            .get(id)?
            .attributes
            .command
            .as_ref()
            .map(|argv| tcl_list(argv))
            .unwrap_or_default()),
        [value] => {
            let argv = split_list(value)?;
            wm.attributes_mut(id)?.command = (!argv.is_empty()).then_some(argv);
            Ok(String::new())
        }
        _ => Err(WmError::WrongArgs("command window ?value?".to_string())),
    }
}

fn frame<P: NativePlatform>(wm: &WindowManager<P>, id: WindowId) -> WmResult<String> {
    let record = wm.get(id)?;
    Ok(record
        .frame
        .or(record.container)
        .map(|handle| format!("0x{:x}", handle.0))
        .unwrap_or_default())
}

fn grid<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    let current = wm.get(id)?.grid;
    // The toplevel itself is the controller; a gridded descendant keeps control
    let controller = id;
    match values {
        [] => Ok(match current {
            Some(g) => format!("{} {} {} {}", g.base_width, g.base_height, g.width_inc, g.height_inc),
            None => String::new(),
        }),
        _ if values.iter().all(|v| v.is_empty()) => wm.unset_grid(id, controller).map(|_| String::new()),
        [base_width, base_height, width_inc, height_inc] => wm
            .set_grid(
                id,
                controller,
                parse_int(base_width)?,
                parse_int(base_height)?,
                parse_int(width_inc)?,
                parse_int(height_inc)?,
            )
            .map(|_| String::new()),
        _ => Err(WmError::WrongArgs("grid window ?baseWidth baseHeight widthInc heightInc?".to_string())),
    }
}

fn icon_position<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    match values {
        [] => Ok(wm
            .get(id)?
            .attributes
            .icon_position
            .map(|p| format!("{} {}", p.x, p.y))
            .unwrap_or_default()),
        ["", ""] => {
            wm.attributes_mut(id)?.icon_position = None;
            Ok(String::new())
        }
        [x, y] => {
            let position = Point::new(parse_int(x)?, parse_int(y)?);
            wm.attributes_mut(id)?.icon_position = Some(position);
            Ok(String::new())
        }
        _ => Err(WmError::WrongArgs("iconposition window ?x y?".to_string())),
    }
}

/// Configured maximum, with unset axes reported as the OS limit
fn max_size<P: NativePlatform>(wm: &WindowManager<P>, id: WindowId) -> WmResult<String> {
    let record = wm.get(id)?;
    let (metrics, insets) = wm.metrics_and_insets(record);
    let pixels = record.max_size_pixels(&metrics, insets);
    let limit = match &record.grid {
        Some(grid) => grid.size_to_units(record.req_size, pixels),
        None => pixels,
    };
    let width = match record.constraints.max_width {
        0 => limit.width,
        explicit => explicit,
    };
    let height = match record.constraints.max_height {
        0 => limit.height,
        explicit => explicit,
    };
    Ok(format!("{width} {height}"))
}

fn colormap_windows<P: NativePlatform>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    match values {
        [] => {
            let names: Vec<String> = wm
                .colormap_windows(id)?
                .into_iter()
                .map(|window| wm.path_of(window))
                .collect();
            Ok(tcl_list(&names))
        }
        [list] => {
            let windows = split_list(list)?
                .iter()
                .map(|name| window_ref(wm, name))
                .collect::<WmResult<Vec<WindowId>>>()?;
            wm.set_colormap_windows(id, &windows).map(|_| String::new())
        }
        _ => Err(WmError::WrongArgs("colormapwindows window ?windowList?".to_string())),
    }
}

fn protocol<P: NativePlatform + 'static>(wm: &mut WindowManager<P>, id: WindowId, values: &[&str]) -> WmResult<String> {
    match values {
        [] => Ok(tcl_list(&wm.protocols(id)?)),
        [name] => Ok(wm.protocol_script(id, name)?.unwrap_or_default()),
        [name, ""] => wm.unregister_protocol(id, name).map(|_| String::new()),
        [name, script] => {
            let text = script.to_string();
            let callback: ProtocolCallback<P> = Rc::new(move |wm: &mut WindowManager<P>, window: WindowId| -> anyhow::Result<()> {
                wm.emit(ToolkitEvent::Command {
                    window,
                    script: text.clone(),
                });
                Ok(())
            });
            wm.register_protocol(id, name, script, callback).map(|_| String::new())
        }
        _ => Err(WmError::WrongArgs("protocol window ?name? ?command?".to_string())),
    }
}

/// Path of a toplevel, or an empty string
fn name_of<P: NativePlatform>(wm: &WindowManager<P>, window: Option<WindowId>) -> String {
    window.map(|w| wm.path_of(w)).unwrap_or_default()
}

/// Empty means "none"; anything else must name a toplevel
fn optional_window<P: NativePlatform>(wm: &WindowManager<P>, name: &str) -> WmResult<Option<WindowId>> {
    if name.is_empty() {
        Ok(None)
    } else {
        wm.lookup(name).map(Some)
    }
}

/// A toplevel path, or `#<id>` for any other toolkit window
fn window_ref<P: NativePlatform>(wm: &WindowManager<P>, name: &str) -> WmResult<WindowId> {
    if let Ok(id) = wm.lookup(name) {
        return Ok(id);
    }
    name.strip_prefix('#')
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| WmError::UnknownWindow(name.to_string()))
}

fn parse_int(value: &str) -> WmResult<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| WmError::InvalidValue(format!("expected integer but got \"{value}\"")))
}

/// Tcl boolean: 1/0, true/false, yes/no, on/off (unique prefixes allowed)
pub fn parse_bool(value: &str) -> WmResult<bool> {
    let lower = value.trim().to_ascii_lowercase();
    let is = |word: &str, min: usize| lower.len() >= min && word.starts_with(lower.as_str());
    if let Ok(n) = lower.parse::<i64>() {
        return Ok(n != 0);
    }
    if is("true", 1) || is("yes", 1) || is("on", 2) {
        Ok(true)
    } else if is("false", 1) || is("no", 1) || is("off", 2) {
        Ok(false)
    } else {
        Err(WmError::InvalidValue(format!("expected boolean value but got \"{value}\"")))
    }
}

fn bool_result(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Format words as a Tcl list, bracing empty words and words with spaces
pub fn tcl_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| {
            let item = item.as_ref();
            if item.is_empty() || item.chars().any(|c| c.is_whitespace() || c == '{' || c == '}' || c == '"') {
                format!("{{{item}}}")
            } else {
                item.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a Tcl list into words, honoring `{...}` (nested) and `"..."` grouping
pub fn split_list(text: &str) -> WmResult<Vec<String>> {
    let mut words = Vec::new();
    let mut chars = text.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut word = String::new();
        match first {
            '{' => {
                chars.next();
                let mut depth = 1;
                loop {
                    match chars.next() {
                        Some('{') => {
                            depth += 1;
                            word.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            word.push('}');
                        }
                        Some(c) => word.push(c),
                        None => return Err(WmError::InvalidValue("unmatched open brace in list".to_string())),
                    }
                }
            }
            '"' => {
                chars.next();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => word.push(c),
                        None => return Err(WmError::InvalidValue("unmatched open quote in list".to_string())),
                    }
                }
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
            }
        }
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlatformConfig, ReconcilerConfig};
    use crate::platform::SimulatedPlatform;
    use crate::shared::Size;
    use crate::wm::ToplevelOptions;
    use crate::wm::protocols::WM_DELETE_WINDOW;

    fn manager() -> WindowManager<SimulatedPlatform> {
        let mut wm = WindowManager::new(
            SimulatedPlatform::new(PlatformConfig::default()),
            ReconcilerConfig::default(),
        );
        let options = ToplevelOptions {
            req_size: Some(Size::new(200, 100)),
            ..Default::default()
        };
        wm.register_toplevel(1, ".", options).unwrap();
        wm.register_toplevel(2, ".dlg", options).unwrap();
        wm
    }

    fn run(wm: &mut WindowManager<SimulatedPlatform>, line: &str) -> WmResult<String> {
        let words = split_list(line).unwrap();
        let args: Vec<&str> = words.iter().map(String::as_str).collect();
        execute(wm, &args)
    }

    #[test]
    fn test_prefix_lookup() {
        assert_eq!(Subcommand::lookup("geom").unwrap().sub, Subcommand::Geometry);
        assert_eq!(Subcommand::lookup("iconw").unwrap().sub, Subcommand::IconWindow);
        assert!(matches!(
            Subcommand::lookup("icon"),
            Err(WmError::AmbiguousSubcommand { .. })
        ));
        let err = Subcommand::lookup("bogus").unwrap_err();
        assert!(err.to_string().starts_with("bad option \"bogus\": must be aspect, client,"));
        assert!(err.to_string().ends_with("transient, or withdraw"));
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in COMMANDS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} before {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_wrong_arg_count_changes_nothing() {
        let mut wm = manager();
        let err = run(&mut wm, "minsize . 10").unwrap_err();
        assert_eq!(err.to_string(), "wrong # args: should be \"wm minsize window ?width height?\"");
        assert_eq!(run(&mut wm, "minsize .").unwrap(), "1 1");
        assert!(matches!(run(&mut wm, "title .nope"), Err(WmError::UnknownWindow(_))));
    }

    #[test]
    fn test_geometry_and_state() {
        let mut wm = manager();
        run(&mut wm, "geometry . 300x200+10+10").unwrap();
        assert_eq!(run(&mut wm, "geometry .").unwrap(), "300x200+10+10");
        assert_eq!(run(&mut wm, "state .").unwrap(), "normal");

        run(&mut wm, "iconify .").unwrap();
        assert_eq!(run(&mut wm, "state .").unwrap(), "iconic");
        assert!(run(&mut wm, "state . bogus").is_err());
        run(&mut wm, "state . withdrawn").unwrap();
        assert_eq!(run(&mut wm, "state .").unwrap(), "withdrawn");
    }

    #[test]
    fn test_grid_set_query_and_clear() {
        let mut wm = manager();
        run(&mut wm, "grid . 10 5 6 10").unwrap();
        assert_eq!(run(&mut wm, "grid .").unwrap(), "10 5 6 10");
        assert!(run(&mut wm, "grid . 10 5 0 10").is_err());
        run(&mut wm, "grid . {} {} {} {}").unwrap();
        assert_eq!(run(&mut wm, "grid .").unwrap(), "");

        // A descendant that grids the toplevel owns it against `wm grid`
        let id = wm.lookup(".").unwrap();
        wm.set_grid(id, 50, 1, 1, 8, 16).unwrap();
        run(&mut wm, "grid . 3 3 2 2").unwrap();
        assert_eq!(run(&mut wm, "grid .").unwrap(), "1 1 8 16");
        run(&mut wm, "grid . {} {} {} {}").unwrap();
        assert_eq!(run(&mut wm, "grid .").unwrap(), "1 1 8 16");
        wm.unset_grid(id, 50).unwrap();
        assert_eq!(run(&mut wm, "grid .").unwrap(), "");
    }

    #[test]
    fn test_aspect_validation() {
        let mut wm = manager();
        assert!(run(&mut wm, "aspect . 0 1 1 1").is_err());
        assert!(run(&mut wm, "aspect . 3 1 1 1").is_err());
        run(&mut wm, "aspect . 1 2 2 1").unwrap();
        assert_eq!(run(&mut wm, "aspect .").unwrap(), "1 2 2 1");
        run(&mut wm, "aspect . {} {} {} {}").unwrap();
        assert_eq!(run(&mut wm, "aspect .").unwrap(), "");
    }

    #[test]
    fn test_transient_group_and_icon_window() {
        let mut wm = manager();
        run(&mut wm, "transient .dlg .").unwrap();
        assert_eq!(run(&mut wm, "transient .dlg").unwrap(), ".");
        run(&mut wm, "transient .dlg {}").unwrap();
        assert_eq!(run(&mut wm, "transient .dlg").unwrap(), "");

        assert!(run(&mut wm, "group . .").is_err());
        run(&mut wm, "group .dlg .").unwrap();
        assert_eq!(run(&mut wm, "group .dlg").unwrap(), ".");

        run(&mut wm, "iconwindow . .dlg").unwrap();
        assert_eq!(run(&mut wm, "iconwindow .").unwrap(), ".dlg");
        let err = run(&mut wm, "deiconify .dlg").unwrap_err();
        assert_eq!(err.to_string(), "can't deiconify \".dlg\": it is an icon for \".\"");
    }

    #[test]
    fn test_attributes() {
        let mut wm = manager();
        run(&mut wm, "title . {My App}").unwrap();
        assert_eq!(run(&mut wm, "title .").unwrap(), "My App");
        run(&mut wm, "iconname . app").unwrap();
        assert_eq!(run(&mut wm, "iconname .").unwrap(), "app");
        run(&mut wm, "client . host1").unwrap();
        assert_eq!(run(&mut wm, "client .").unwrap(), "host1");
        run(&mut wm, "command . {vim {my file}}").unwrap();
        assert_eq!(run(&mut wm, "command .").unwrap(), "vim {my file}");
        run(&mut wm, "focusmodel . act").unwrap();
        assert_eq!(run(&mut wm, "focusmodel .").unwrap(), "active");
        run(&mut wm, "positionfrom . p").unwrap();
        assert_eq!(run(&mut wm, "positionfrom .").unwrap(), "program");
        assert!(run(&mut wm, "sizefrom . nobody").is_err());
        run(&mut wm, "iconposition . 5 6").unwrap();
        assert_eq!(run(&mut wm, "iconposition .").unwrap(), "5 6");
        run(&mut wm, "resizable . 0 yes").unwrap();
        assert_eq!(run(&mut wm, "resizable .").unwrap(), "0 1");
        run(&mut wm, "overrideredirect .dlg true").unwrap();
        assert_eq!(run(&mut wm, "overrideredirect .dlg").unwrap(), "1");
    }

    #[test]
    fn test_maxsize_reports_os_limit_until_set() {
        let mut wm = manager();
        // 1292x1036 tracking limit less the resizable frame (8x27)
        assert_eq!(run(&mut wm, "maxsize .").unwrap(), "1284 1009");
        run(&mut wm, "maxsize . 400 300").unwrap();
        assert_eq!(run(&mut wm, "maxsize .").unwrap(), "400 300");
    }

    #[test]
    fn test_protocol_script_becomes_command_event() {
        let mut wm = manager();
        run(&mut wm, "protocol . WM_DELETE_WINDOW {confirm_quit}").unwrap();
        assert_eq!(run(&mut wm, "protocol .").unwrap(), "WM_DELETE_WINDOW");
        assert_eq!(run(&mut wm, "protocol . WM_DELETE_WINDOW").unwrap(), "confirm_quit");

        wm.on_protocol_message(1, WM_DELETE_WINDOW);
        assert!(wm.take_toolkit_events().contains(&ToolkitEvent::Command {
            window: 1,
            script: "confirm_quit".into()
        }));
        assert!(wm.record(1).is_some());

        run(&mut wm, "protocol . WM_DELETE_WINDOW {}").unwrap();
        assert_eq!(run(&mut wm, "protocol .").unwrap(), "");
    }

    #[test]
    fn test_frame_and_colormapwindows() {
        let mut wm = manager();
        assert_eq!(run(&mut wm, "frame .").unwrap(), "");
        wm.map_window(1).unwrap();
        let frame = wm.record(1).unwrap().frame.unwrap();
        assert_eq!(run(&mut wm, "frame .").unwrap(), format!("0x{:x}", frame.0));

        run(&mut wm, "colormapwindows . {#12 .dlg}").unwrap();
        assert_eq!(run(&mut wm, "colormapwindows .").unwrap(), "#12 .dlg");
        assert!(run(&mut wm, "colormapwindows . .missing").is_err());
    }

    #[test]
    fn test_tracing_toggle() {
        let mut wm = manager();
        assert_eq!(run(&mut wm, "tracing").unwrap(), "0");
        run(&mut wm, "tracing on").unwrap();
        assert!(wm.tracing());
        assert!(run(&mut wm, "tracing maybe").is_err());
    }

    #[test]
    fn test_list_splitting() {
        assert_eq!(split_list("a {b c} \"d e\" {}").unwrap(), vec!["a", "b c", "d e", ""]);
        assert_eq!(split_list("{a {b}}").unwrap(), vec!["a {b}"]);
        assert!(split_list("{open").is_err());
        assert_eq!(tcl_list(&["x", "", "y z"]), "x {} {y z}");
    }
}
