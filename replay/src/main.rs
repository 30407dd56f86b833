use anyhow::Context;
use clap::Parser;
use generator::profile::{build_mission, MissionConfig};
use source::framing::read_frames;
use std::fs;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod source;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Replay PD0 recordings through the DVL dead-reckoning core")]
struct Args {
    /// PD0 recording to replay
    #[arg(long)]
    input: Option<PathBuf>,
    /// Generate a synthetic mission of this many ensembles instead of reading a file
    #[arg(long)]
    synthetic: Option<usize>,
    /// Write the synthetic mission to this path as a PD0 recording
    #[arg(long)]
    save_synthetic: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Water-profile bin used for velocity
    #[arg(long, default_value_t = 0)]
    velocity_bin: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Feed ensembles through the streaming session instead of the batch constructor
    #[arg(long, default_value_t = false)]
    stream: bool,
    /// Print the full result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.velocity_bin,
            args.synthetic.unwrap_or(MissionConfig::default().ensembles),
            args.seed,
        )
    };

    let frames = match (&args.input, args.synthetic) {
        (Some(path), _) => {
            let split = read_frames(path)?;
            if split.skipped_bytes > 0 {
                log::warn!(
                    "skipped {} bytes outside ensemble frames in {}",
                    split.skipped_bytes,
                    path.display()
                );
            }
            split.frames
        }
        (None, count) => {
            if let Some(count) = count {
                workflow_config.mission.ensembles = count;
            }
            let frames = build_mission(&workflow_config.mission)
                .context("building synthetic mission")?;
            if let Some(path) = &args.save_synthetic {
                fs::write(path, frames.concat())
                    .with_context(|| format!("writing synthetic mission {}", path.display()))?;
            }
            frames
        }
    };
    workflow_config.navigation.expected_ensembles = Some(frames.len());

    let runner = Runner::new(workflow_config);
    let result = if args.stream {
        runner.execute_streaming(frames)?
    } else {
        runner.execute(&frames)
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("serialising replay result")?;
        println!("{}", json);
    } else {
        let position = result.summary.final_position.unwrap_or_default();
        println!(
            "Replay -> ensembles {}, rejected {}, valid velocity {:.1}%, path {:.1} m, final ({:.1}, {:.1}, {:.1})",
            result.summary.count,
            result.report.failed,
            result.summary.valid_velocity_fraction * 100.0,
            result.summary.path_length,
            position.x,
            position.y,
            position.z
        );
        if let Some(sequence) = result.report.halted_at {
            println!("Integration halted at buffer {}", sequence);
        }
    }

    Ok(())
}
