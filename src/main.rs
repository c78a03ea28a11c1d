//! playbae command-line player

use anyhow::{Context, Result};
use playbae::cli::{CliArgs, USAGE};
use playbae::config::{Command, PlayerConfig};
use playbae::console::{Console, Verbosity};
use playbae::engine::{Mixer, PcmMixer};
use playbae::platform::{self, AccountingAllocator};
use playbae::playback::{InterruptSignal, PlayRequest, Player, SinkMode};
use playbae::PlaybaeError;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[global_allocator]
static ALLOCATOR: AccountingAllocator = AccountingAllocator;

/// Pause before tearing the mixer down.
const FINAL_WAIT_MICROS: u64 = 160_000;

fn init_tracing(verbosity: Verbosity) {
    let default_filter = match verbosity {
        Verbosity::Quiet => "playbae=error",
        Verbosity::Normal => "playbae=warn",
        Verbosity::Verbose => "playbae=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let args = match CliArgs::parse_from(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("playbae:  {err}");
            return ExitCode::from(1);
        }
    };
    init_tracing(args.config.verbosity);

    let console = Console::stdout(args.config.verbosity);
    console.line(format_args!(
        "playbae {} ({}), built-in PCM engine",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    ));
    if let Some(path) = &args.config_file {
        debug!("defaults loaded from {}", path.display());
    }
    for notice in &args.notices {
        console.line(notice);
    }
    if let Some(info) = args.info {
        console.raw(&info.text());
        return ExitCode::SUCCESS;
    }

    let interrupt = Arc::new(InterruptSignal::new());
    let handler_signal = Arc::clone(&interrupt);
    if let Err(err) = ctrlc::set_handler(move || handler_signal.raise()) {
        warn!("interrupt handler not installed: {err}");
    }

    match run(&args.config, &console, &interrupt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("{err:#}");
            let code = err
                .downcast_ref::<PlaybaeError>()
                .map(PlaybaeError::result_code)
                .unwrap_or(playbae::EngineError::PARAM_ERR.code());
            console.line(format_args!("playbae:  BAE Error #{code}"));
            ExitCode::from(1)
        }
    }
}

fn run(config: &PlayerConfig, console: &Console, interrupt: &InterruptSignal) -> Result<()> {
    let settings = config.mixer_settings();
    console.detail(format_args!(
        "Allocating mixer with {} voices for RMF/Midi playback\nand {} voices for PCM playback at {} sample rate",
        settings.voices.sequence_voices, settings.voices.pcm_voices, settings.sample_rate
    ));

    let mut mixer = match PcmMixer::open(settings) {
        Ok(mixer) => mixer,
        Err(err) => {
            console.line(format_args!("playbae:  Couldn't open mixer ({err})"));
            return Err(PlaybaeError::from(err)).context("opening mixer");
        }
    };
    console.detail(format_args!(
        "BAE memory used during idle prior to SetBankToFile: {} bytes\n",
        platform::size_used()
    ));

    if let Some(bank) = &config.bank {
        console.line(format_args!("Using bank '{}'", bank.display()));
        if let Err(err) = mixer.add_bank_from_file(bank) {
            console.line(format_args!(
                "Error {} loading patch bank {}",
                err.code(),
                bank.display()
            ));
            return Err(PlaybaeError::from(err)).context("loading patch bank");
        }
        console.detail(format_args!(
            "BAE memory used during idle after SetBankToFile: {} bytes\n",
            platform::size_used()
        ));
    } else {
        debug!("no patch bank given; sequences cannot be rendered");
    }

    let mut params = config.playback.clone();
    params.mixer = settings;
    params.sink = SinkMode::Device;
    if let Some(output) = &config.output_file {
        match mixer.start_output_to_file(output) {
            Ok(()) => {
                params.sink = SinkMode::File;
                console.line(format_args!("Writing to file {}", output.display()));
            }
            Err(err) => console.line(format_args!(
                "Error {} accessing file for write: {}",
                err.code(),
                output.display()
            )),
        }
    }

    let mut player = Player::new(config.policy.clone(), console, interrupt);
    let mute_channels = config.mute_channels.as_deref();
    let played = match &config.command {
        None => Ok(false),
        Some(Command::PlayFile(path)) => player
            .play_file(&mut mixer, path, config.reverb, mute_channels, &params)
            .map(|_| true),
        Some(command @ Command::Play {
            kind,
            file_type,
            path,
        }) => {
            if let Some(text) = command.announcement() {
                console.line(text);
            }
            let request = PlayRequest {
                kind: *kind,
                path,
                file_type: *file_type,
                reverb: config.reverb,
                mute_channels,
            };
            player
                .play(&mut mixer, &request, &params)
                .map(|_| true)
                .map_err(PlaybaeError::from)
        }
    };

    if mixer.is_writing_to_file() {
        if let Err(err) = mixer.stop_output_to_file() {
            warn!("output file not finalized: {err}");
        }
    }
    if !played.context("playing")? {
        console.raw(USAGE);
    }

    debug!(
        used = platform::size_used(),
        peak = platform::peak_size_used(),
        "memory at exit"
    );
    platform::sleep_for(FINAL_WAIT_MICROS);
    Ok(())
}
