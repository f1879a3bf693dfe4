// Copyright 2026 The MuTate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Probe
//!
//! Runs device selection with the requirements MuTate would use and prints the outcome.  Flags
//! override the device config.  With `--window` a surface is created first so that presentation
//! support takes part in queue selection.

use std::{ffi::CString, path::PathBuf};

use ash::vk;
use clap::Parser;
use log::LevelFilter;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::Window,
};

use mutate_vulkan::{
    config::{self, ConfigError},
    context::{VkContext, VkInstance},
    identity::AdapterId,
    requirements::RequirementSet,
    select::{fatal, SelectError, Selector},
    util::ApiVersion,
};

#[derive(Parser, Debug)]
struct Args {
    /// Device config to read instead of the usual lookup
    #[arg(long)]
    config: Option<PathBuf>,
    /// Try this adapter first
    #[arg(long, value_name = "UUID")]
    prefer: Option<AdapterId>,
    /// Lowest acceptable device API, such as 1.3
    #[arg(long, value_name = "VERSION", value_parser = parse_api_version)]
    min_api: Option<ApiVersion>,
    /// Device extension every candidate must have
    #[arg(long = "require-ext", value_name = "NAME")]
    require_ext: Vec<String>,
    /// Device extension to enable when present
    #[arg(long = "optional-ext", value_name = "NAME")]
    optional_ext: Vec<String>,
    /// Print the ranked adapters and stop
    #[arg(long)]
    list: bool,
    /// Enable the Khronos validation layer
    #[arg(long)]
    validation: bool,
    /// Select against a window surface
    #[arg(short = 'w', long)]
    window: bool,
    /// More logging.  Repeat for more.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Warnings by default, each `-v` one level louder.  `RUST_LOG` still wins.
fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn parse_api_version(s: &str) -> Result<ApiVersion, String> {
    ApiVersion::parse(s).ok_or_else(|| format!("expected major.minor[.patch], got {s:?}"))
}

#[derive(thiserror::Error, Debug)]
enum ProbeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error("extension name {0:?} contains a NUL")]
    ExtensionName(String),
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("window handle: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
}

fn requirements(args: &Args) -> Result<RequirementSet, ProbeError> {
    let mut reqs = config::load(args.config.as_deref())?.requirements()?;
    if let Some(version) = args.min_api {
        reqs.set_min_api_version(version.0);
    }
    if args.prefer.is_some() {
        reqs.set_preferred(args.prefer);
    }
    for name in &args.require_ext {
        reqs.require_extension(&extension_name(name)?)?;
    }
    for name in &args.optional_ext {
        reqs.request_extension(&extension_name(name)?)?;
    }
    Ok(reqs)
}

fn extension_name(name: &str) -> Result<CString, ProbeError> {
    CString::new(name).map_err(|_| ProbeError::ExtensionName(name.to_owned()))
}

fn list(reqs: &RequirementSet, validation: bool) -> Result<(), ProbeError> {
    let instance = VkInstance::new(reqs.min_api_version(), validation, &[])?;
    let candidates = {
        let runtime = instance.runtime();
        Selector::new(&runtime, reqs).candidates()
    };
    instance.destroy();
    for (i, c) in candidates?.iter().enumerate() {
        println!("[{i}] {c}");
    }
    Ok(())
}

fn report(context: &VkContext) {
    let probe = &context.probe;
    println!("adapter: {} {}", context.adapter_id, probe.properties.name);
    println!("api: {}", ApiVersion(probe.properties.api_version));
    println!("subgroup size: {}", probe.properties.subgroup_size);
    println!("extensions:");
    for e in &probe.extensions {
        println!("  {}", e.to_string_lossy());
    }
    println!("features: {}", probe.features);
    println!("queues:");
    for a in probe.queues.assignments() {
        println!(
            "  {:<8} family {} index {} priority {:.1}",
            a.role, a.family, a.index, a.priority
        );
    }
}

/// Opens one window, selects against its surface, reports and leaves.
struct App {
    args: Args,
    reqs: RequirementSet,
    window: Option<Window>,
    outcome: Result<(), ProbeError>,
}

impl App {
    fn probe(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ProbeError> {
        let attrs = Window::default_attributes()
            .with_title("µTate probe")
            .with_visible(false);
        let window = self.window.insert(event_loop.create_window(attrs)?);
        let display = window.display_handle()?.as_raw();
        let handle = window.window_handle()?.as_raw();

        let instance = VkInstance::for_display(
            self.reqs.min_api_version(),
            self.args.validation,
            display,
        )?;
        // SAFETY the window outlives the context, which is destroyed below.
        let surface = match unsafe { instance.create_surface(display, handle) } {
            Ok(surface) => surface,
            Err(e) => {
                instance.destroy();
                return Err(e.into());
            }
        };
        let context = match VkContext::new(instance, Some(surface), &mut self.reqs) {
            Ok(context) => context,
            Err(e) => fatal(&e),
        };
        report(&context);
        context.destroy();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.outcome = self.probe(event_loop);
        }
        event_loop.exit();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
        }
    }
}

fn main() -> Result<(), ProbeError> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(log_level(args.verbose))
        .parse_default_env()
        .init();

    let mut reqs = requirements(&args)?;
    if args.list {
        return list(&reqs, args.validation);
    }

    if !args.window {
        let context = match VkContext::headless(&mut reqs, args.validation) {
            Ok(context) => context,
            Err(e) => fatal(&e),
        };
        report(&context);
        context.destroy();
        return Ok(());
    }

    reqs.require_extension(vk::KHR_SWAPCHAIN_NAME)?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = App {
        args,
        reqs,
        window: None,
        outcome: Ok(()),
    };
    event_loop.run_app(&mut app)?;
    app.outcome
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "mutate-probe",
            "--min-api",
            "1.2",
            "--require-ext",
            "VK_KHR_swapchain",
            "--require-ext",
            "VK_KHR_present_wait",
            "--prefer",
            "86800000-0000-8000-F000-A05600000000",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.min_api, Some(ApiVersion(vk::API_VERSION_1_2)));
        assert_eq!(args.require_ext.len(), 2);
        assert!(args.prefer.is_some_and(|id| id.is_synthetic()));
        assert_eq!(log_level(args.verbose), LevelFilter::Debug);

        assert!(Args::try_parse_from(["mutate-probe", "--min-api", "three"]).is_err());
        assert!(Args::try_parse_from(["mutate-probe", "--prefer", "nope"]).is_err());
    }
}
