use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use wasapi_core::audioclient::{wave_format_tag_name, BufferFlags, WaveFormatExtensible, WAVE_FORMAT_EXTENSIBLE_CB_SIZE};
use wasapi_core::com::{ComRuntime, ConcurrencyModel};
use wasapi_core::mmdevice::{DeviceState, EDataFlow};
use wasapi_loopback::{
    AudioPacket, CaptureConfig, CaptureStream, ChannelLevels, DeviceEnumerator, EndpointKind, StopHandle,
};

#[derive(Parser, Debug)]
#[command(name = "wasapi-loopback", version, about = "List audio endpoints and capture what they play or record.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List audio endpoints
    List(ListArgs),
    /// Capture from the default render endpoint (loopback) or a capture endpoint
    Capture(CaptureArgs),
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Print the listing as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    /// Which endpoints to list
    #[arg(long, value_enum, default_value_t = FlowArg::All)]
    flow: FlowArg,

    /// Include disabled, unplugged and absent endpoints
    #[arg(long, action = clap::ArgAction::SetTrue)]
    all_states: bool,
}

#[derive(clap::Args, Debug)]
struct CaptureArgs {
    /// Endpoint id (defaults to the default console endpoint)
    #[arg(long, value_name = "ID")]
    device: Option<String>,

    /// Capture from a microphone instead of loopback
    #[arg(long, action = clap::ArgAction::SetTrue)]
    mic: bool,

    /// Stop after this many seconds instead of waiting for Enter (Ctrl+C still stops early)
    #[arg(long, value_name = "SECONDS")]
    seconds: Option<f64>,

    /// Print every frame's samples instead of a level meter
    #[arg(long, action = clap::ArgAction::SetTrue)]
    print_samples: bool,

    /// Read capture settings from a JSON file; flags override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the capture summary as JSON
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FlowArg {
    Render,
    Capture,
    All,
}

impl From<FlowArg> for EDataFlow {
    fn from(flow: FlowArg) -> Self {
        match flow {
            FlowArg::Render => EDataFlow::Render,
            FlowArg::Capture => EDataFlow::Capture,
            FlowArg::All => EDataFlow::All,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::List(args) => list(args),
        Command::Capture(args) => capture(args),
    }
}

fn list(args: ListArgs) -> anyhow::Result<()> {
    let _com = ComRuntime::initialize(ConcurrencyModel::MultiThreaded).context("COM initialization failed")?;
    let enumerator = DeviceEnumerator::new().context("failed to create the device enumerator")?;
    let state = if args.all_states { DeviceState::ALL } else { DeviceState::ACTIVE };
    let devices = enumerator
        .list(args.flow.into(), state)
        .context("failed to enumerate endpoints")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    println!("Device Counts: {}", devices.len());
    for device in &devices {
        println!("{}", device);
    }
    Ok(())
}

fn capture_config(args: &CaptureArgs) -> anyhow::Result<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            CaptureConfig::from_json(&text)?
        }
        None => CaptureConfig::default(),
    };
    if args.device.is_some() {
        config.device_id = args.device.clone();
    }
    if args.mic {
        config.endpoint = EndpointKind::Capture;
    }
    if args.seconds.is_some() {
        config.max_duration_secs = args.seconds;
    }
    if let Err(e) = config.validate() {
        bail!("invalid capture settings: {}", e);
    }
    Ok(config)
}

fn capture(args: CaptureArgs) -> anyhow::Result<()> {
    let config = capture_config(&args)?;
    let timed = config.max_duration_secs.is_some();
    let stream = CaptureStream::new(config)?;

    let callback = if args.print_samples {
        sample_printer()
    } else {
        level_meter()
    };
    let format = stream.start(callback).context("failed to start capture")?;
    print!("{}", describe_format(&format));

    stop_on_ctrl_c(stream.stop_handle())?;
    if timed {
        println!("Capturing; press Ctrl+C to stop early.");
    } else {
        println!("Capturing; press Enter or Ctrl+C to stop.");
        stop_on_enter(stream.stop_handle())?;
    }
    let summary = stream.wait()?;
    println!("Exit Capture");

    if let Some(summary) = summary {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "Captured {:.2} s ({} packets, {} silent, {} discontinuities)",
                summary.audio_secs(),
                summary.packets,
                summary.silent_packets,
                summary.discontinuities
            );
        }
    }
    Ok(())
}

/// Requests a stop on Ctrl+C. The listener thread lives until the process exits.
fn stop_on_ctrl_c(stop: StopHandle) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the signal runtime")?;
    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || match runtime.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => {
                log::info!("Ctrl+C received; stopping capture");
                stop.request_stop();
            }
            Err(e) => log::warn!("Failed to listen for Ctrl+C: {}", e),
        })
        .context("failed to spawn the Ctrl+C listener")?;
    Ok(())
}

fn stop_on_enter(stop: StopHandle) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            if let Err(e) = io::stdin().lock().read_line(&mut line) {
                log::warn!("Failed to read stdin: {}", e);
            }
            stop.request_stop();
        })
        .context("failed to spawn the stdin listener")?;
    Ok(())
}

/// Prints `CH0: ...\tCH1: ...` per frame of non-silent packets.
fn sample_printer() -> wasapi_loopback::PacketCallback {
    Box::new(|packet: &AudioPacket<'_>| {
        if packet.flags.contains(BufferFlags::SILENT) {
            return;
        }
        let mut out = io::stdout().lock();
        for frame in packet.samples.chunks(packet.channels.max(1) as usize) {
            let mut line = String::new();
            for (channel, sample) in frame.iter().enumerate() {
                let _ = write!(line, "CH{}: {:.6}\t", channel, sample);
            }
            let _ = writeln!(out, "{}", line);
        }
    })
}

/// Prints per-channel RMS and peak roughly once per second of audio.
fn level_meter() -> wasapi_loopback::PacketCallback {
    let mut pending: Vec<f32> = Vec::new();
    let mut pending_frames = 0u64;
    Box::new(move |packet: &AudioPacket<'_>| {
        pending.extend_from_slice(packet.samples);
        pending_frames += packet.frames as u64;
        if pending_frames < packet.sample_rate as u64 {
            return;
        }
        let levels = ChannelLevels::measure(&pending, packet.channels);
        let mut line = format!("{} ", packet.captured_at.format("%H:%M:%S%.3f"));
        for (channel, (rms, peak)) in levels.rms.iter().zip(&levels.peak).enumerate() {
            let _ = write!(line, " CH{}: rms {:.4} peak {:.4}", channel, rms, peak);
        }
        println!("{}", line);
        pending.clear();
        pending_frames = 0;
    })
}

fn describe_format(format: &WaveFormatExtensible) -> String {
    let wf = format.format();
    let mut text = String::new();
    let tag_name = wave_format_tag_name(wf.format_tag()).unwrap_or("unknown");
    let _ = writeln!(text, "FormatTag:\t {} ({})", wf.format_tag(), tag_name);
    let _ = writeln!(text, "Channels:\t {}", wf.channels());
    let _ = writeln!(text, "SamplesPerSec:\t {}", wf.samples_per_sec());
    let _ = writeln!(text, "AvgBytesPerSec:\t {}", wf.avg_bytes_per_sec());
    let _ = writeln!(text, "BlockAlign:\t {}", wf.block_align());
    let _ = writeln!(text, "BitsPerSample:\t {}", wf.bits_per_sample());
    let _ = writeln!(text, "CbSize:\t\t {}", wf.cb_size());
    if wf.cb_size() == WAVE_FORMAT_EXTENSIBLE_CB_SIZE {
        let _ = writeln!(text, "Samples:\t {}", format.samples());
        let _ = writeln!(text, "ChannelMask:\t 0x{:08X}", format.channel_mask());
        let _ = writeln!(text, "SubFormat:\t {}", format.sub_format_tag());
    }
    text
}
