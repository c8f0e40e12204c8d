mod output;
mod source;

use std::path::PathBuf;

use camera_motion_common::config::Config;
use camera_motion_detector::{CancelFlag, MovementClassifier};
use tracing::{error, info, warn};

const USAGE: &str = "usage: camera-motion <INPUT> [--config PATH] [--json]";

#[derive(Debug, PartialEq)]
struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    json: bool,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut input = None;
        let mut config = None;
        let mut json = false;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    config = Some(PathBuf::from(path));
                }
                flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
                _ if input.is_none() => input = Some(PathBuf::from(&arg)),
                _ => return Err(format!("unexpected argument {arg}")),
            }
        }
        let input = input.ok_or("missing INPUT")?;
        Ok(Self {
            input,
            config,
            json,
        })
    }
}

#[tokio::main]
async fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        input = %args.input.display(),
        diff_threshold = config.detection.diff_threshold,
        match_threshold = config.detection.match_threshold,
        min_matches = config.detection.min_matches,
        workers = config.runtime.workers,
        "starting camera-motion"
    );

    let classifier = match MovementClassifier::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid detection settings");
            std::process::exit(1);
        }
    };

    let frames = match source::load_frames(&args.input, &config.input).await {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "failed to decode input");
            std::process::exit(1);
        }
    };

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let report = match tokio::task::spawn_blocking(move || {
        classifier.analyze_with_cancel(&frames, &cancel)
    })
    .await
    {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            error!(error = %e, "detection failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "detection task panicked");
            std::process::exit(1);
        }
    };

    if args.json {
        match output::render_json(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "failed to serialize report");
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", output::render_text(&report));
    }
}
