use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use vidsift::{
    DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY, FfmpegLogLevel, FrameSampler, FrameSource,
    ProgressCallback, ProgressInfo, SampleError, SampleOptions, SamplingPolicy, VideoSource,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidsift sample input.mp4 --out frames\n  vidsift sample input.mp4 --out frames --count 12 --policy interval --progress\n  vidsift plan 70 --count 7\n  vidsift probe input.mp4 --json\n  vidsift completions zsh > _vidsift";

#[derive(Debug, Parser)]
#[command(
    name = "vidsift",
    version,
    about = "Sample representative still frames from videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging on stderr.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    ffmpeg_log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample frames into an output directory.
    #[command(
        about = "Sample frames as numbered JPEGs",
        after_help = "Examples:\n  vidsift sample input.mp4 --out frames\n  vidsift sample input.mp4 --out frames --count 5 --max-dimension 720 --json"
    )]
    Sample {
        /// Input video path.
        input: PathBuf,
        /// Output directory (created if missing).
        #[arg(long)]
        out: PathBuf,
        /// Number of frames to sample.
        #[arg(long, default_value_t = DEFAULT_FRAME_COUNT)]
        count: u64,
        /// Position policy: even | interval.
        #[arg(long, default_value_t = SamplingPolicy::EvenSpacing)]
        policy: SamplingPolicy,
        /// JPEG quality (1-100).
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,
        /// Downscale so the longest edge is at most this many pixels.
        #[arg(long)]
        max_dimension: Option<u32>,
        /// Print the written frames as JSON.
        #[arg(long)]
        json: bool,
        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Print the positions a run would decode, without opening any video.
    #[command(
        about = "Show selected frame positions",
        after_help = "Examples:\n  vidsift plan 70\n  vidsift plan 20 --count 7 --policy interval"
    )]
    Plan {
        /// Total number of frames in the video.
        total: u64,
        #[arg(long, default_value_t = DEFAULT_FRAME_COUNT)]
        count: u64,
        #[arg(long, default_value_t = SamplingPolicy::EvenSpacing)]
        policy: SamplingPolicy,
    },

    /// Print video stream properties.
    #[command(about = "Print video properties", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.attempted);
        if !info.saved {
            self.bar.set_message(format!("skipped frame {}", info.position));
        }
    }
}

fn init_logging(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if global.verbose {
        EnvFilter::new("vidsift=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init()
        .map_err(|error| error.to_string())?;

    if let Some(level) = global.ffmpeg_log_level {
        vidsift::set_ffmpeg_log_level(level);
    }
    Ok(())
}

fn format_positions(positions: &[u64]) -> String {
    positions
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    match cli.command {
        Commands::Sample {
            input,
            out,
            count,
            policy,
            quality,
            max_dimension,
            json,
            progress,
        } => {
            let mut options = SampleOptions::new()
                .with_count(count)
                .with_policy(policy)
                .with_jpeg_quality(quality)
                .with_max_dimension(max_dimension);

            let progress_bar = if progress {
                let bar = ProgressBar::new(count);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                bar.set_style(style.progress_chars("##-"));
                options = options.with_progress(Arc::new(BarProgress { bar: bar.clone() }));
                Some(bar)
            } else {
                None
            };

            let mut source = open_for_sampling(&input, count)?;
            let total = source.frame_count()?;
            if let Some(bar) = &progress_bar {
                bar.set_length(policy.positions(total, count).len() as u64);
            }

            let frames = FrameSampler::new(options).sample_source(&mut source, &out)?;
            drop(source);

            if let Some(bar) = &progress_bar {
                bar.finish_and_clear();
            }

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "total_frames": total,
                    "policy": policy.to_string(),
                    "frames": frames.iter().map(|frame| json!({
                        "index": frame.index,
                        "position": frame.position,
                        "path": frame.path.display().to_string(),
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for frame in &frames {
                    println!(
                        "{} {} {}",
                        format!("frame {:>3}", frame.position).dimmed(),
                        "->".dimmed(),
                        frame.path.display()
                    );
                }
                let requested = count.min(total) as usize;
                let summary = format!(
                    "Sampled {}/{} frame(s) into {}",
                    frames.len(),
                    requested,
                    out.display()
                );
                if frames.len() < requested {
                    println!("{}", summary.yellow().bold());
                } else {
                    println!("{}", summary.green().bold());
                }
            }
        }
        Commands::Plan {
            total,
            count,
            policy,
        } => {
            let positions = policy.positions(total, count);
            println!(
                "{} {} of {} frames ({})",
                "plan".cyan().bold(),
                positions.len(),
                total,
                policy
            );
            println!("{}", format_positions(&positions));
        }
        Commands::Probe { input, json } => {
            let source = VideoSource::open(&input)?;
            let info = source.info();
            if json {
                let payload = json!({
                    "path": input.display().to_string(),
                    "format": info.format,
                    "codec": info.codec,
                    "width": info.width,
                    "height": info.height,
                    "fps": info.frames_per_second,
                    "frame_count": info.frame_count,
                    "duration_seconds": info.duration.as_secs_f64(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", info.format);
                println!("Duration: {:?}", info.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    info.width, info.height, info.frames_per_second, info.codec,
                );
                println!("Frames: {}", info.frame_count);
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidsift", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Reject a zero count before touching the file.
fn open_for_sampling(input: &Path, count: u64) -> Result<VideoSource, SampleError> {
    if count == 0 {
        return Err(SampleError::InvalidFrameCount);
    }
    VideoSource::open(input)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use std::path::Path;

    use super::{Cli, Commands, format_positions, open_for_sampling};
    use vidsift::{SampleError, SamplingPolicy};

    #[test]
    fn sample_defaults() {
        let cli = Cli::try_parse_from(["vidsift", "sample", "in.mp4", "--out", "frames"]).unwrap();
        match cli.command {
            Commands::Sample {
                count,
                policy,
                quality,
                max_dimension,
                ..
            } => {
                assert_eq!(count, 7);
                assert_eq!(policy, SamplingPolicy::EvenSpacing);
                assert_eq!(quality, 90);
                assert_eq!(max_dimension, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn plan_accepts_policy_aliases() {
        let cli =
            Cli::try_parse_from(["vidsift", "plan", "20", "--policy", "interval"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plan {
                total: 20,
                policy: SamplingPolicy::FixedInterval,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["vidsift", "plan", "20", "--policy", "random"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vidsift",
            "probe",
            "in.mp4",
            "--verbose",
            "--ffmpeg-log-level",
            "quiet",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert!(cli.global.ffmpeg_log_level.is_some());
    }

    #[test]
    fn positions_are_comma_separated() {
        assert_eq!(format_positions(&[0, 10, 20]), "0, 10, 20");
        assert_eq!(format_positions(&[]), "");
    }

    #[test]
    fn command_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn zero_count_is_rejected_before_opening() {
        let result = open_for_sampling(Path::new("no-such-video.mp4"), 0);
        assert!(matches!(result, Err(SampleError::InvalidFrameCount)));

        let result = open_for_sampling(Path::new("no-such-video.mp4"), 1);
        assert!(matches!(result, Err(SampleError::UnreadableSource { .. })));
    }
}
