use std::path::PathBuf;

use angletrack_rs::integration::{ButterworthLowPass, WindSpeedEstimator};
use angletrack_rs::{
    ImageSequence, OverlayOptions, SensorConfig, SensorPipeline, TrackerSession, render_overlay,
};
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "angletrack", about = "Contactless pendulum angle sensor", version)]
struct Cli {
    /// Directory of frames to process, in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Print each valid angle (degrees) as a raw float.
    #[arg(long)]
    output_angle: bool,

    /// Print each valid reading converted to wind speed (m/s).
    #[arg(long, requires = "side")]
    output_windspeed: bool,

    /// Tunnel side whose calibration is used for wind speed.
    #[arg(long, value_enum)]
    side: Option<Side>,

    /// Frame rate of the sequence, used by the wind speed filter.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Wind arrow length in pixels per m/s.
    #[arg(long, default_value_t = 10.0)]
    arrow_scale: f64,

    /// Do not write annotated frames.
    #[arg(long)]
    no_ui: bool,

    /// Where annotated frames and masks are written.
    #[arg(long, default_value = "overlay")]
    overlay_dir: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = SensorConfig::load(&cli.config)?;

    let mut speed = match (cli.output_windspeed, cli.side) {
        (true, Some(side)) => {
            let model = config.wind_speed_model(side.as_str())?;
            let filter = config
                .butterworth_filter
                .map(|f| ButterworthLowPass::from_settings(&f, cli.fps))
                .transpose()?;
            Some(WindSpeedEstimator::new(model, filter))
        }
        _ => None,
    };

    let mut session = TrackerSession::new(config.detection);
    session.start(config.session_config())?;

    if !cli.no_ui {
        std::fs::create_dir_all(&cli.overlay_dir)?;
    }

    let source = ImageSequence::open(&cli.frames)?;
    let mut pipeline = SensorPipeline::new(source, session);

    let mut write_error = None;
    let processed = pipeline.run(|report| {
        let reading = report.diagnostics.reading;

        if cli.output_angle {
            if let Some(angle) = reading.value() {
                println!("{angle:.2}");
            }
        }

        // Advanced on every frame so the filter runs at the sequence rate.
        let wind_speed = speed
            .as_mut()
            .and_then(|estimator| estimator.update(reading))
            .filter(|_| reading.valid);
        if let Some(v) = wind_speed {
            println!("{v:.2}");
        }

        if !cli.no_ui {
            let options = OverlayOptions {
                wind_speed,
                arrow_scale: cli.arrow_scale,
                fps: Some(cli.fps),
            };
            let annotated = render_overlay(&report.frame, &report.diagnostics, &options);
            let frame_path = cli.overlay_dir.join(format!("frame_{:05}.png", report.index));
            let mask_path = cli.overlay_dir.join(format!("mask_{:05}.png", report.index));
            if let Err(e) = annotated
                .save(&frame_path)
                .and_then(|_| report.diagnostics.mask.to_gray_image().save(&mask_path))
            {
                write_error = Some(e);
                return false;
            }
        }

        true
    })?;

    if let Some(e) = write_error {
        return Err(e.into());
    }

    log::info!("processed {processed} frames");
    Ok(())
}
