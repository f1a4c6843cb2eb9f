#[cfg(not(feature = "streaming"))]
fn main() {
    eprintln!(
        "The clipstream CLI requires the \"streaming\" feature. Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
mod cli {
    use std::env;
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{bail, Context, Result};
    use clipstream::clip::ClipOptions;
    use clipstream::{AudioManager, Backend, PlaybackConfig, Playable, StreamedClip, LOOP_FOREVER};
    use tracing_subscriber::EnvFilter;

    const USAGE: &str = "Usage:\n  clipstream [--loops <n>|--forever] [--config <file.json>] <file.wav>\n\nFlags:\n  --loops <n>       Play the file n times (default 1)\n  --forever         Loop until interrupted\n  --config <file>   JSON tunables: {\"concurrency\": 16, \"buffer_size\": 4096}\n  -h, --help        Show this help\n\nLogging is controlled through RUST_LOG (default: info).\n";

    #[derive(Debug, Default)]
    struct CliArgs {
        file_path: Option<PathBuf>,
        config_path: Option<PathBuf>,
        loops: Option<i32>,
        show_help: bool,
    }

    fn parse_args() -> Result<CliArgs> {
        let mut parsed = CliArgs::default();
        let mut args = env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" => parsed.show_help = true,
                "--forever" => parsed.loops = Some(LOOP_FOREVER),
                "--loops" => {
                    let value = args.next().context("--loops requires an argument")?;
                    parsed.loops = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid loop count '{value}'"))?,
                    );
                }
                "--config" => {
                    let value = args.next().context("--config requires an argument")?;
                    parsed.config_path = Some(PathBuf::from(value));
                }
                _ if arg.starts_with('-') => bail!("unknown flag '{arg}'\n\n{USAGE}"),
                _ => parsed.file_path = Some(PathBuf::from(arg)),
            }
        }

        Ok(parsed)
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();

        let args = parse_args()?;
        if args.show_help {
            print!("{USAGE}");
            return Ok(());
        }
        let Some(path) = args.file_path else {
            bail!("no input file\n\n{USAGE}");
        };

        let config = match &args.config_path {
            Some(config_path) => PlaybackConfig::load(config_path)
                .with_context(|| format!("failed to load {}", config_path.display()))?,
            None => PlaybackConfig::default(),
        };

        let options = ClipOptions::from_config(&config).loops(args.loops.unwrap_or(1));
        let clip = Arc::new(StreamedClip::with_options(
            path,
            Backend::default_output(),
            options,
        )?);

        let manager = AudioManager::new(&config)?;
        tracing::info!(clip = %clip, loops = clip.loops(), "playing");
        manager.play(Arc::clone(&clip))?;

        clip.wait_until_finished();
        manager.shutdown();
        Ok(())
    }
}

#[cfg(feature = "streaming")]
fn main() -> anyhow::Result<()> {
    cli::run()
}
