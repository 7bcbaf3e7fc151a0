//! Command-line flags. Hand-parsed `--key=value` pairs; anything not starting
//! with `--` is a model to open, optionally labelled as `path=label`.
//!
//! Paths may contain `=` themselves: an argument naming an existing file is
//! always taken whole, and the text after the last `=` is only a label when
//! it holds no path separator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corelib::{PitchClamp, ViewerConfig, ViewerOptions, WheelTarget};
use platform::{RunConfig, ViewerSpec};

/// Models opened when none are given on the command line.
const SHOWCASE_MODELS: [(&str, &str); 2] = [
    ("./static/obj/dancer-skelcf-skeleton.obj", "SKEL Skeleton"),
    ("./static/obj/dancer-skelcf-skin.obj", "SKEL Skin"),
];

pub fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

pub fn parse_show_fps_arg(args: &[String]) -> bool {
    // --show-fps[=on|off], off by default
    for arg in args {
        if arg == "--show-fps" {
            return true;
        }
        if let Some(val) = arg.strip_prefix("--show-fps=") {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

pub fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(800).max(1);
    let hh = h.unwrap_or(600).max(1);
    (ww, hh)
}

fn parse_f32_flag(args: &[String], prefix: &str) -> Result<Option<f32>> {
    let mut value = None;
    for arg in args {
        if let Some(v) = arg.strip_prefix(prefix) {
            let parsed = v
                .parse::<f32>()
                .with_context(|| format!("Invalid number for {prefix} '{v}'"))?;
            value = Some(parsed);
        }
    }
    Ok(value)
}

/// Viewer policies shared by every viewer opened from this command line.
pub fn parse_viewer_config(args: &[String]) -> Result<ViewerConfig> {
    let options = ViewerOptions {
        scale: parse_f32_flag(args, "--scale=")?,
        camera_distance: parse_f32_flag(args, "--camera-distance=")?,
        use_fixed_scale: args.iter().any(|a| a == "--auto-fit").then_some(false),
    };

    let mut config = ViewerConfig::from_options(&options);
    if args.iter().any(|a| a == "--clamp-pitch") {
        config = config.with_pitch_clamp(PitchClamp::Clamped);
    }
    for arg in args {
        if let Some(v) = arg.strip_prefix("--wheel=") {
            let target = match v.to_ascii_lowercase().as_str() {
                "distance" | "zoom" => WheelTarget::Distance,
                "scale" => WheelTarget::Scale,
                other => anyhow::bail!("Unknown wheel target '{other}' (expected distance|scale)"),
            };
            config = config.with_wheel_target(target);
        }
    }

    config.validate()?;
    Ok(config)
}

fn spec_from_arg(arg: &str, config: ViewerConfig) -> ViewerSpec {
    let (path, label) = match arg.rsplit_once('=') {
        _ if Path::new(arg).is_file() => (arg, None),
        Some((path, label))
            if !path.is_empty() && !label.is_empty() && !label.contains(['/', '\\']) =>
        {
            (path, Some(label.to_string()))
        }
        _ => (arg, None),
    };
    let path = PathBuf::from(path);
    let label = label.unwrap_or_else(|| default_label(&path));
    ViewerSpec {
        label,
        path,
        config,
    }
}

fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Build the full run configuration from `args` (program name excluded).
pub fn parse_run_config(args: &[String]) -> Result<RunConfig> {
    let config = parse_viewer_config(args)?;
    let mut viewers: Vec<ViewerSpec> = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(|a| spec_from_arg(a, config))
        .collect();
    if viewers.is_empty() {
        viewers = SHOWCASE_MODELS
            .iter()
            .map(|(path, label)| ViewerSpec {
                label: (*label).to_string(),
                path: PathBuf::from(path),
                config,
            })
            .collect();
    }

    let (width, height) = parse_size_args(args);
    Ok(RunConfig {
        backends: parse_backend_arg(args),
        show_fps: parse_show_fps_arg(args),
        width,
        height,
        viewers,
    })
}
