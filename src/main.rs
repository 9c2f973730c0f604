//! winwm
//!
//! Scripted `wm` shell. Drives the toplevel reconciler against the
//! simulated native window system, one command per line, running the idle
//! queue after every line the way a toolkit event loop would.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use winwm::config::Config;
use winwm::platform::{
    ColormapId, MenuHandle, NativeEvent, NativeHandle, NativePlatform, ShowCommand, SimulatedPlatform,
};
use winwm::shared::{Rect, Size};
use winwm::wm::command::{self, split_list};
use winwm::wm::stacking::StackRelation;
use winwm::wm::{GeometryManager, ToolkitEvent, ToplevelOptions, WindowId, WindowManager};

/// Protocol scripts may trigger further scripts; stop runaway chains
const MAX_SCRIPT_DEPTH: usize = 8;

/// Command-line options
struct Args {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Args {
            config: None,
            script: None,
        };
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = iter.next().context("--config needs a path")?;
                    args.config = Some(PathBuf::from(path));
                }
                _ if arg.starts_with('-') => bail!("unknown option {arg}"),
                _ => args.script = Some(PathBuf::from(arg)),
            }
        }
        Ok(args)
    }
}

enum Flow {
    Continue,
    Exit,
}

/// Shell state: the reconciler plus toplevel id allocation
struct Shell {
    wm: WindowManager<SimulatedPlatform>,
    next_id: WindowId,
}

impl Shell {
    fn new(config: Config) -> Self {
        let platform = SimulatedPlatform::new(config.platform);
        Self {
            wm: WindowManager::new(platform, config.reconciler),
            next_id: 1,
        }
    }

    /// Evaluate one line (commands separated by `;`), then let the idle
    /// queue run and report what the toolkit would see
    fn eval(&mut self, line: &str, depth: usize) -> Flow {
        if line.trim_start().starts_with('#') {
            return Flow::Continue;
        }
        for part in split_commands(line) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match self.run_command(part) {
                Ok(Some(output)) if !output.is_empty() => println!("{output}"),
                Ok(Some(_)) => {}
                Ok(None) => return Flow::Exit,
                Err(err) => {
                    println!("error: {err:#}");
                    debug!("Command {:?} failed: {:#}", part, err);
                }
            }
        }
        self.settle(depth);
        Flow::Continue
    }

    /// Returns `None` when the shell should exit
    fn run_command(&mut self, line: &str) -> Result<Option<String>> {
        let words = split_list(line)?;
        let args: Vec<&str> = words.iter().map(String::as_str).collect();
        let Some((&name, rest)) = args.split_first() else {
            return Ok(Some(String::new()));
        };

        let output = match (name, rest) {
            ("exit", _) => return Ok(None),
            ("wm", rest) => command::execute(&mut self.wm, rest)?,
            ("toplevel", [path, options @ ..]) => self.toplevel(path, options)?,
            ("destroy", [path]) => {
                let id = self.wm.lookup(path)?;
                self.wm.destroy_toplevel(id)?;
                String::new()
            }
            ("map", [path]) => {
                let id = self.wm.lookup(path)?;
                self.wm.map_window(id)?;
                String::new()
            }
            ("unmap", [path]) => {
                let id = self.wm.lookup(path)?;
                self.wm.unmap_window(id)?;
                String::new()
            }
            ("reqsize", [path, width, height]) => {
                let id = self.wm.lookup(path)?;
                let size = Size::new(parse_int(width)?, parse_int(height)?);
                self.wm.requested_geometry_changed(id, size);
                String::new()
            }
            ("menu", [path, rest @ ..]) => {
                let id = self.wm.lookup(path)?;
                let menu = match rest {
                    [] => None,
                    [handle] => Some(MenuHandle(parse_handle(handle)?)),
                    _ => bail!("usage: menu path ?handle?"),
                };
                self.wm.set_menu(id, menu)?;
                String::new()
            }
            ("colormap", [path, window, colormap]) => {
                let id = self.wm.lookup(path)?;
                let window = self.window_ref(window)?;
                let colormap = ColormapId(parse_handle(colormap)? as u32);
                self.wm.set_window_colormap(window, colormap);
                if colormap == ColormapId::DEFAULT {
                    self.wm.remove_from_colormap_windows(id, window)?;
                } else {
                    self.wm.add_to_colormap_windows(id, window)?;
                }
                String::new()
            }
            ("raise", [path, rest @ ..]) => self.restack(path, StackRelation::Above, rest)?,
            ("lower", [path, rest @ ..]) => self.restack(path, StackRelation::Below, rest)?,
            ("event", [kind, path, rest @ ..]) => self.native_event(kind, path, rest)?,
            ("update", []) => {
                let passes = self.wm.run_idle();
                passes.to_string()
            }
            ("dump", []) => {
                let snapshots = self
                    .wm
                    .windows()
                    .into_iter()
                    .map(|id| self.wm.snapshot(id))
                    .collect::<Result<Vec<_>, _>>()?;
                serde_json::to_string_pretty(&snapshots)?
            }
            ("dump", [path]) => {
                let id = self.wm.lookup(path)?;
                serde_json::to_string_pretty(&self.wm.snapshot(id)?)?
            }
            ("stackorder", []) => {
                let names: Vec<String> = self
                    .wm
                    .stacking_order()
                    .iter()
                    .filter_map(|&id| self.wm.record(id).map(|r| r.path.clone()))
                    .collect();
                command::tcl_list(&names)
            }
            _ => bail!("invalid command \"{line}\""),
        };
        Ok(Some(output))
    }

    /// `toplevel path ?-override? ?-use handle? ?-size WxH?`
    fn toplevel(&mut self, path: &str, options: &[&str]) -> Result<String> {
        let mut toplevel = ToplevelOptions::default();
        let mut iter = options.iter();
        while let Some(&option) = iter.next() {
            match option {
                "-override" => toplevel.override_redirect = true,
                "-use" => {
                    let handle = iter.next().context("-use needs a container handle")?;
                    toplevel.embedded_in = Some(NativeHandle(parse_handle(handle)?));
                }
                "-size" => {
                    let size = iter.next().context("-size needs WxH")?;
                    let (width, height) = size.split_once('x').context("-size needs WxH")?;
                    toplevel.req_size = Some(Size::new(parse_int(width)?, parse_int(height)?));
                }
                other => bail!("unknown toplevel option \"{other}\""),
            }
        }

        let id = self.next_id;
        self.wm.register_toplevel(id, path, toplevel)?;
        self.next_id += 1;
        Ok(path.to_string())
    }

    fn restack(&mut self, path: &str, relation: StackRelation, rest: &[&str]) -> Result<String> {
        let id = self.wm.lookup(path)?;
        let other = match rest {
            [] => None,
            [other] => Some(self.wm.lookup(other)?),
            _ => bail!("usage: raise|lower path ?other?"),
        };
        self.wm.restack(id, relation, other)?;
        Ok(String::new())
    }

    /// Simulate something the user or the OS did to a frame
    fn native_event(&mut self, kind: &str, path: &str, rest: &[&str]) -> Result<String> {
        let id = self.wm.lookup(path)?;
        let frame = self
            .wm
            .record(id)
            .and_then(|record| record.frame)
            .with_context(|| format!("\"{path}\" has no native frame"))?;

        match (kind, rest) {
            ("configure", [x, y, width, height]) => {
                let platform = self.wm.platform();
                let current = platform.frame_rect(frame).context("frame is gone")?;
                let client = platform.client_size(frame).context("frame is gone")?;
                let rect = Rect::new(
                    parse_int(x)?,
                    parse_int(y)?,
                    parse_int(width)? + current.width - client.width,
                    parse_int(height)? + current.height - client.height,
                );
                self.wm.platform_mut().user_place(frame, rect);
            }
            ("iconify", []) => self.wm.platform_mut().user_show(frame, ShowCommand::Minimize),
            ("zoom", []) => self.wm.platform_mut().user_show(frame, ShowCommand::Maximize),
            ("restore", []) => self.wm.platform_mut().user_show(frame, ShowCommand::ShowNormal),
            ("close", []) => self.wm.platform_mut().inject(NativeEvent::Close { frame }),
            ("activate", []) => self
                .wm
                .platform_mut()
                .inject(NativeEvent::Activate { frame, active: true }),
            ("destroy", []) => self.wm.platform_mut().inject(NativeEvent::Destroyed { frame }),
            ("protocol", [protocol]) => self.wm.platform_mut().inject(NativeEvent::Protocol {
                frame,
                protocol: protocol.to_string(),
            }),
            _ => bail!("usage: event configure|iconify|zoom|restore|close|activate|destroy|protocol path ?args?"),
        }
        self.wm.dispatch_sent_events();
        Ok(String::new())
    }

    fn window_ref(&self, name: &str) -> Result<WindowId> {
        if let Ok(id) = self.wm.lookup(name) {
            return Ok(id);
        }
        name.strip_prefix('#')
            .and_then(|digits| digits.parse().ok())
            .with_context(|| format!("bad window path name \"{name}\""))
    }

    /// Run deferred passes, print toolkit events, and evaluate protocol scripts
    fn settle(&mut self, depth: usize) {
        self.wm.run_idle();
        for message in self.wm.take_background_errors() {
            println!("background error: {message}");
        }
        for event in self.wm.take_toolkit_events() {
            match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!("Failed to serialize {:?}: {}", event, err),
            }
            if let ToolkitEvent::Command { script, .. } = event {
                if depth >= MAX_SCRIPT_DEPTH {
                    error!("Protocol script nesting too deep; dropping {:?}", script);
                    continue;
                }
                // Exit requests from scripts are not honored mid-dispatch
                let _ = self.eval(&script, depth + 1);
            }
        }
    }
}

/// Split a line at `;` separators outside braces and quotes
fn split_commands(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    let mut chars = line.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' if depth == 0 => quoted = !quoted,
            '{' if !quoted => depth += 1,
            '}' if !quoted => depth = depth.saturating_sub(1),
            ';' if depth == 0 && !quoted => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}

fn parse_int(value: &str) -> Result<i32> {
    value
        .parse()
        .with_context(|| format!("expected integer but got \"{value}\""))
}

/// Decimal or `0x` hexadecimal handle
fn parse_handle(value: &str) -> Result<u64> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
    .with_context(|| format!("bad handle \"{value}\""))
}

async fn run_lines<R: AsyncBufRead + Unpin>(shell: &mut Shell, reader: R) -> Result<()> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        if let Flow::Exit = shell.eval(&line, 0) {
            info!("exit requested");
            break;
        }
    }
    Ok(())
}

/// Read commands from the script file, or stdin when there is none
async fn run_session(shell: &mut Shell, script: Option<&Path>) -> Result<()> {
    match script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {path:?}"))?;
            run_lines(shell, BufReader::new(file)).await
        }
        None => run_lines(shell, BufReader::new(tokio::io::stdin())).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "winwm=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting winwm shell");

    let args = Args::parse()?;
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut shell = Shell::new(config);

    tokio::select! {
        result = run_session(&mut shell, args.script.as_deref()) => {
            if let Err(e) = result {
                error!("Shell error: {:#}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
