mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Receiver;

use facewatch_core::capture::domain::capture_session::CaptureSession;
use facewatch_core::capture::domain::device_id::DeviceId;
use facewatch_core::capture::infrastructure::ffmpeg_camera::FfmpegCameraBackend;
use facewatch_core::capture::infrastructure::image_file_reader::ImageFileReader;
use facewatch_core::detection::domain::detection_error::LoadError;
use facewatch_core::detection::domain::detector_profile::ProfileId;
use facewatch_core::detection::domain::detector_registry::DetectorRegistry;
use facewatch_core::detection::infrastructure::haar_cascade::HaarCascadeLoader;
use facewatch_core::pipeline::display_sink::ChannelDisplaySink;
use facewatch_core::pipeline::frame_pipeline::{FramePipeline, PipelineOutput};
use facewatch_core::pipeline::infrastructure::polling_loop::{PollingLoop, StopReason};
use facewatch_core::pipeline::pipeline_config::ControllerConfig;
use facewatch_core::pipeline::pipeline_controller::{ControllerError, PipelineController};
use facewatch_core::pipeline::pipeline_logger::StatsPipelineLogger;
use facewatch_core::shared::constants::IMAGE_EXTENSIONS;

/// Haar cascade object detection on cameras, streams and still images.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Settings file (JSON). Defaults to the per-user settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List numbered capture devices that can be opened.
    Devices,

    /// Detect on a camera, device node, video file or stream.
    Live {
        /// Camera index.
        #[arg(long, conflicts_with = "source")]
        device: Option<u32>,

        /// Device node, video file or stream URL.
        #[arg(long)]
        source: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Detect on a still image.
    Image {
        /// Input image file.
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Built-in profile: face, eye, smile, upperbody, fullbody, profileface.
    #[arg(long)]
    profile: Option<String>,

    /// Custom cascade XML. Activates the custom profile.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Pyramid step of the custom profile (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Neighbour threshold of the custom profile.
    #[arg(long)]
    min_neighbors: Option<i32>,

    /// Smallest window of the custom profile, as WxH.
    #[arg(long, value_parser = parse_dims::<i32>)]
    min_size: Option<(i32, i32)>,

    /// Milliseconds between ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Display box the annotated frame is fitted into, as WxH.
    #[arg(long = "box", value_parser = parse_dims::<u32>)]
    display_box: Option<(u32, u32)>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<usize>,

    /// Directory receiving the annotated preview image.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl RunArgs {
    fn has_tuning(&self) -> bool {
        self.scale_factor.is_some() || self.min_neighbors.is_some() || self.min_size.is_some()
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Devices => run_devices(&config),
        Command::Live {
            device,
            source,
            run,
        } => {
            validate(&run)?;
            apply_overrides(&mut config, &run);
            let source = match (device, source) {
                (_, Some(path)) => DeviceId::Path(path),
                (Some(index), None) => DeviceId::Index(index),
                (None, None) => DeviceId::Index(0),
            };
            run_live(&config, source, &run)
        }
        Command::Image { path, run } => {
            validate(&run)?;
            apply_overrides(&mut config, &run);
            run_image(&config, &path, &run)
        }
    }
}

fn run_devices(config: &ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backend = FfmpegCameraBackend::new(config.capture_size, config.capture_fps);
    let devices = CaptureSession::enumerate(&backend, config.max_probed_devices);
    if devices.is_empty() {
        println!("No capture devices found");
    }
    for device in devices {
        println!("{device}");
    }
    Ok(())
}

fn run_live(
    config: &ControllerConfig,
    source: DeviceId,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (sink, outputs) = ChannelDisplaySink::new();
    let dropped = sink.dropped_counter();
    let mut controller = build_controller(config, sink)?;
    configure_detection(&mut controller, config, args)?;

    match &source {
        DeviceId::Path(path) if is_image(path) => controller.load_file(path)?,
        _ => controller.start_live(source)?,
    }

    let preview = args.output_dir.as_ref().map(|dir| dir.join("live.png"));
    let consumer = spawn_consumer(outputs, preview, false);

    let polling =
        PollingLoop::new(Arc::new(AtomicBool::new(false))).with_max_ticks(args.max_ticks);
    if let Err(e) = ctrlc::set_handler(interrupt_handler(polling.cancel_flag())) {
        log::warn!("Failed to install Ctrl+C handler: {e}");
    }
    let summary = polling.run(&mut controller);
    if summary.stop_reason == StopReason::Cancelled {
        log::info!("Interrupted");
    }
    controller.stop();
    controller.summary();
    let lost = match summary.stop_reason {
        StopReason::WentIdle => controller.last_error().map(str::to_string),
        _ => None,
    };
    drop(controller);

    let shown = consumer.join().map_err(|_| "preview thread panicked")?;
    log::info!(
        "{} ticks, {} published, {} skipped, {shown} displayed, {} dropped",
        summary.ticks,
        summary.published,
        summary.skipped,
        dropped.load(Ordering::Relaxed)
    );

    match lost {
        Some(reason) => Err(reason.into()),
        None => Ok(()),
    }
}

fn run_image(
    config: &ControllerConfig,
    path: &Path,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let ticks = args.max_ticks.unwrap_or(1);
    let (sink, outputs) = ChannelDisplaySink::with_capacity(ticks);
    let mut controller = build_controller(config, sink)?;
    configure_detection(&mut controller, config, args)?;
    controller.load_file(path)?;

    let preview = args.output_dir.as_ref().map(|dir| {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        dir.join(format!("{stem}_detections.png"))
    });
    let consumer = spawn_consumer(outputs, preview.clone(), true);

    let polling = PollingLoop::new(Arc::new(AtomicBool::new(false))).with_max_ticks(Some(ticks));
    polling.run(&mut controller);
    controller.summary();
    drop(controller);

    consumer.join().map_err(|_| "preview thread panicked")?;
    if let Some(preview) = preview {
        log::info!("Output written to {}", preview.display());
    }
    Ok(())
}

fn build_controller(
    config: &ControllerConfig,
    sink: ChannelDisplaySink,
) -> Result<PipelineController, Box<dyn std::error::Error>> {
    log::info!("Resolving bundled face cascade");
    let loader = HaarCascadeLoader::new(config.resource_locations());
    let registry = DetectorRegistry::new(Box::new(loader))?;
    let pipeline = FramePipeline::new(
        config.display_box,
        Box::new(sink),
        Box::new(StatsPipelineLogger::default()),
    );
    let backend = FfmpegCameraBackend::new(config.capture_size, config.capture_fps);

    Ok(PipelineController::new(
        Box::new(backend),
        Box::new(ImageFileReader::new()),
        registry,
        pipeline,
        config,
    ))
}

fn configure_detection(
    controller: &mut PipelineController,
    config: &ControllerConfig,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(params) = &config.custom_params {
        controller.set_parameters(
            ProfileId::Custom.as_str(),
            params.scale_factor,
            params.min_neighbors,
            params.min_size,
        )?;
    }

    if let Some(cascade) = &args.cascade {
        if let Some(name) = controller.load_custom(Some(cascade))? {
            log::info!("Using custom cascade {name}");
        }
    } else {
        let name = args.profile.as_deref().unwrap_or(&config.default_profile);
        match controller.switch_profile(name) {
            Ok(display_name) => log::info!("Using {display_name} profile"),
            Err(ControllerError::Load(e @ LoadError::FallbackApplied { .. })) => {
                log::warn!("{e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if args.has_tuning() {
        let current = controller.registry().params(ProfileId::Custom);
        let (min_w, min_h) = current.min_size();
        controller.set_parameters(
            ProfileId::Custom.as_str(),
            args.scale_factor.unwrap_or(current.scale_factor()),
            args.min_neighbors
                .unwrap_or(i32::try_from(current.min_neighbors()).unwrap_or(i32::MAX)),
            args.min_size.unwrap_or((
                i32::try_from(min_w).unwrap_or(i32::MAX),
                i32::try_from(min_h).unwrap_or(i32::MAX),
            )),
        )?;
    }
    Ok(())
}

/// Raises the polling loop's cancel flag from the signal handler.
fn interrupt_handler(cancel: Arc<AtomicBool>) -> impl Fn() + Send + 'static {
    move || cancel.store(true, Ordering::SeqCst)
}

/// Drains the display channel until every sender is gone, returning how
/// many outputs arrived.
fn spawn_consumer(
    outputs: Receiver<PipelineOutput>,
    preview: Option<PathBuf>,
    print_boxes: bool,
) -> JoinHandle<usize> {
    thread::spawn(move || {
        let mut shown = 0;
        for output in outputs.iter() {
            shown += 1;
            log::debug!(
                "Frame {}: {} detection(s)",
                output.frame_index,
                output.detection_count
            );
            if print_boxes {
                println!("{} detection(s)", output.detection_count);
                for d in &output.detections {
                    println!("  x={} y={} w={} h={}", d.x, d.y, d.width, d.height);
                }
            }
            if let Some(path) = &preview {
                if let Err(e) = output.image.save(path) {
                    log::warn!("Failed to write {}: {e}", path.display());
                }
            }
        }
        shown
    })
}

fn apply_overrides(config: &mut ControllerConfig, args: &RunArgs) {
    if let Some(ms) = args.interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(display_box) = args.display_box {
        config.display_box = display_box;
    }
}

fn validate(args: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.cascade.is_some() && args.profile.is_some() {
        return Err("--cascade and --profile are mutually exclusive".into());
    }
    if args.has_tuning() && args.cascade.is_none() {
        return Err("Tuning flags only apply to a custom cascade (--cascade)".into());
    }
    if let Some(cascade) = &args.cascade {
        if !cascade.exists() {
            return Err(format!("Cascade file not found: {}", cascade.display()).into());
        }
    }
    if let Some(dir) = &args.output_dir {
        if !dir.is_dir() {
            return Err(format!("Output directory not found: {}", dir.display()).into());
        }
    }
    if args.max_ticks == Some(0) {
        return Err("--max-ticks must be at least 1".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Parses `WxH`.
fn parse_dims<T: FromStr>(s: &str) -> Result<(T, T), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse().map_err(|_| format!("bad width in '{s}'"))?;
    let h = h.trim().parse().map_err(|_| format!("bad height in '{s}'"))?;
    Ok((w, h))
}
