// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing video devices
//! - Streaming a filtered input to the virtual camera
//! - Filtering a single image

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use vcam_filter::backends::camera::{InputSource, V4l2Capture, load_image_as_frame};
use vcam_filter::backends::virtual_camera::{VirtualCameraStreamer, probe_video_nodes};
use vcam_filter::constants::capture::IMAGE_FRAME_INTERVAL;
use vcam_filter::media::{Frame, Size};
use vcam_filter::preview::{FilterPreview, RenderBackend, SoftwareBackend, WgpuBackend};
use vcam_filter::{Config, FilterKind, FilterPipeline, FilterState, Resolution};

/// Command line overrides for `stream`
pub struct StreamOptions {
    pub input: Option<String>,
    pub device: Option<String>,
    pub filter: Option<FilterKind>,
    pub strength: Option<f32>,
    pub resolution: Option<Resolution>,
    pub frames: Option<u64>,
}

/// List `/dev/video*` nodes
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let nodes = probe_video_nodes();
    if nodes.is_empty() {
        println!("No video devices found.");
        return Ok(());
    }

    println!("Video devices:");
    println!();
    for node in &nodes {
        let mut roles = Vec::new();
        if node.capture {
            roles.push("capture");
        }
        if node.output {
            roles.push("output");
        }
        let marker = if node.is_loopback() { "  [virtual camera]" } else { "" };
        println!(
            "  {}  {} ({}) [{}]{}",
            node.path,
            node.card,
            node.driver,
            roles.join(", "),
            marker
        );
    }

    if !nodes.iter().any(|n| n.is_loopback()) {
        println!();
        println!("No v4l2loopback device found. Load one with:");
        println!("  sudo modprobe v4l2loopback video_nr=42 card_label=\"vcam-filter\" exclusive_caps=1");
    }
    Ok(())
}

/// Stream a filtered input to the virtual camera until Ctrl+C
pub fn stream(config: Config, options: StreamOptions) -> Result<(), Box<dyn std::error::Error>> {
    let filter = filter_from(&config, options.filter, options.strength);
    let forced = options.resolution.or(config.forced_resolution);

    let mut streamer = VirtualCameraStreamer::with_default_device();
    streamer.set_device_path(options.device.as_deref().unwrap_or(&config.device_path));
    streamer.set_forced_resolution(forced.map(|r| r.size()));
    streamer.set_error_observer(|e| eprintln!("Virtual camera: {}", e));
    streamer.set_enabled(config.output_enabled);

    println!("Output: {}", streamer.device_path());
    if let Some(resolution) = forced {
        println!("Resolution: {}", resolution);
    }
    println!("Filter: {} ({:.2})", filter.kind(), filter.strength());

    let mut pipeline = FilterPipeline::new(select_backend(), streamer, Size::default());
    pipeline.preview_mut().set_filter(filter);
    pipeline
        .preview_mut()
        .set_error_observer(|e| eprintln!("Render: {}", e));

    let input = options
        .input
        .or(config.capture_device.clone())
        .unwrap_or_else(|| "/dev/video0".to_string());
    let mut source = open_source(&input, config.capture_resolution)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!();
    println!("Streaming... (press Ctrl+C to stop)");

    let output_wanted = config.output_enabled;
    while !stop_flag.load(Ordering::SeqCst) {
        if options
            .frames
            .is_some_and(|limit| pipeline.frames_forwarded() >= limit)
        {
            break;
        }

        let frame = source.next_frame()?;
        if let Err(e) = pipeline.push_frame(&frame) {
            warn!(error = %e, "Dropped input frame");
        }

        if output_wanted && !pipeline.streamer().is_enabled() {
            error!(
                path = %pipeline.streamer().device_path(),
                frames = pipeline.frames_forwarded(),
                "Virtual camera output stopped, giving up"
            );
            return Err("virtual camera output stopped".into());
        }

        print!("\rFrames: {}", pipeline.frames_forwarded());
        std::io::Write::flush(&mut std::io::stdout())?;
    }
    println!();
    info!(frames = pipeline.frames_forwarded(), "Streaming stopped");

    Ok(())
}

/// Filter one image and write it as PNG
pub fn snapshot(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    filter: Option<FilterKind>,
    strength: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(input)?;

    let mut preview = FilterPreview::new(select_backend());
    preview.set_filter(filter_from(config, filter, strength));
    preview.on_context_ready();
    preview.upload_frame(&frame)?;
    let processed = preview
        .render(Size::default())
        .ok_or("rendering the processed frame failed")?;

    let output_path = match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(format!("vcam_{}.png", timestamp))
        }
    };

    save_png(&processed, &output_path)?;
    println!("Saved: {}", output_path.display());
    Ok(())
}

/// Config defaults with command line overrides applied
fn filter_from(config: &Config, kind: Option<FilterKind>, strength: Option<f32>) -> FilterState {
    FilterState::new(
        kind.unwrap_or(config.default_filter),
        strength.unwrap_or(config.default_strength),
    )
}

/// GPU compositor, or the CPU one when no adapter is usable
fn select_backend() -> Box<dyn RenderBackend> {
    match WgpuBackend::new() {
        Ok(backend) => {
            info!(adapter = %backend.device_info().adapter_name, "Using GPU compositor");
            Box::new(backend)
        }
        Err(e) => {
            warn!(error = %e, "GPU unavailable, using software compositor");
            Box::new(SoftwareBackend::new())
        }
    }
}

enum Source {
    Image(Frame),
    Device(V4l2Capture),
}

impl Source {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        match self {
            Source::Image(frame) => {
                std::thread::sleep(IMAGE_FRAME_INTERVAL);
                Ok(frame.clone())
            }
            Source::Device(capture) => Ok(capture.next_frame()?),
        }
    }
}

fn open_source(input: &str, resolution: Resolution) -> Result<Source, Box<dyn std::error::Error>> {
    match InputSource::parse(input) {
        InputSource::Image(path) => {
            println!("Input: image {}", path);
            Ok(Source::Image(load_image_as_frame(Path::new(&path))?))
        }
        InputSource::Device(path) => {
            let capture = V4l2Capture::open(&path, resolution.width, resolution.height)?;
            let (width, height) = capture.resolution();
            println!("Input: {} ({}x{} {:?})", path, width, height, capture.pixel_format());
            Ok(Source::Device(capture))
        }
    }
}

fn save_png(frame: &Frame, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
        .ok_or("processed frame does not match its dimensions")?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
