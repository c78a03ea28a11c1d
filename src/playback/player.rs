//! Session setup around the scheduler
//!
//! Creates, loads, configures and starts one session, hands it to the
//! [`Scheduler`], then drops it. Any failure before the poll loop is printed
//! with its engine code and returned without polling.

use super::channels::apply_mute_list;
use super::volume::{to_display, to_engine};
use super::{InterruptSignal, PlaybackParameters, PlaybackReport, Scheduler, SchedulerPolicy};
use crate::console::Console;
use crate::engine::{EngineError, FileType, Mixer, ReverbType, Session, SessionKind};
use crate::filetype::{self, SniffError};
use crate::platform::{self, Sleeper, ThreadSleeper};
use crate::{PlaybaeError, Result};
use std::path::Path;
use tracing::{debug, warn};

/// What to play and with which sequence options.
#[derive(Debug, Clone, Copy)]
pub struct PlayRequest<'p> {
    /// Session kind to create
    pub kind: SessionKind,
    /// File to load
    pub path: &'p Path,
    /// Container type handed to the loader
    pub file_type: FileType,
    /// Default reverb for sequence sessions
    pub reverb: ReverbType,
    /// Comma-separated 1-based channels to mute (sequences only)
    pub mute_channels: Option<&'p str>,
}

impl<'p> PlayRequest<'p> {
    /// Request with default reverb and no muted channels.
    pub fn new(kind: SessionKind, path: &'p Path, file_type: FileType) -> Self {
        PlayRequest {
            kind,
            path,
            file_type,
            reverb: ReverbType::default(),
            mute_channels: None,
        }
    }

    /// Word used for the file in "couldn't open" messages.
    fn file_label(&self) -> &'static str {
        match self.kind {
            SessionKind::Sample | SessionKind::Stream => "sound",
            SessionKind::Song => "Midi",
            SessionKind::Rmf => "RMF",
        }
    }

    fn start_label(&self) -> &'static str {
        if self.kind.is_sequence() {
            "song"
        } else {
            "sound"
        }
    }
}

/// Plays requests one at a time through a [`Scheduler`].
pub struct Player<'a, S: Sleeper = ThreadSleeper> {
    scheduler: Scheduler<'a, S>,
    console: &'a Console,
}

impl<'a> Player<'a, ThreadSleeper> {
    /// Player that paces playback in real time.
    pub fn new(policy: SchedulerPolicy, console: &'a Console, interrupt: &'a InterruptSignal) -> Self {
        Player {
            scheduler: Scheduler::new(policy, console, interrupt),
            console,
        }
    }
}

impl<'a, S: Sleeper> Player<'a, S> {
    /// Player over an existing scheduler.
    pub fn with_scheduler(scheduler: Scheduler<'a, S>) -> Self {
        let console = scheduler.console();
        Player { scheduler, console }
    }

    /// The scheduler sessions are driven by.
    pub fn scheduler(&self) -> &Scheduler<'a, S> {
        &self.scheduler
    }

    /// Create, set up and drive one session.
    pub fn play(
        &mut self,
        mixer: &mut dyn Mixer,
        request: &PlayRequest<'_>,
        params: &PlaybackParameters,
    ) -> std::result::Result<PlaybackReport, EngineError> {
        let result = self.play_session(mixer, request, params);
        if request.kind.is_sequence() {
            self.console.line("");
        }
        result
    }

    fn play_session(
        &mut self,
        mixer: &mut dyn Mixer,
        request: &PlayRequest<'_>,
        params: &PlaybackParameters,
    ) -> std::result::Result<PlaybackReport, EngineError> {
        let mut session = mixer.new_session(request.kind).map_err(|err| {
            debug!("session allocation failed: {err}");
            EngineError::MEMORY_ERR
        })?;

        if let Err(err) = session.load(request.path, request.file_type) {
            self.console.line(format_args!(
                "playbae:  Couldn't open {} file '{}' ({err})",
                request.file_label(),
                request.path.display()
            ));
            return Err(err);
        }

        session.set_volume(to_engine(params.volume_percent));
        if let Err(err) = session.start() {
            self.console.line(format_args!(
                "playbae:  Couldn't start {} ({err})",
                request.start_label()
            ));
            return Err(err);
        }

        if request.kind.is_sequence() {
            self.configure_sequence(mixer, session.as_mut(), request, params);
        } else if let Some(rate) = session.sample_rate() {
            debug!("source sample rate {rate} Hz");
        }
        if let Some(text) = session.describe() {
            self.console.detail(text);
        }

        self.console.line(format_args!(
            "Master {} volume set to {}%",
            request.kind.noun(),
            to_display(session.volume())
        ));
        if request.kind.is_sequence() {
            if params.loop_count > 0 {
                self.console
                    .line(format_args!("Will loop song {} times", params.loop_count));
            }
            if params.time_limit_secs > 0 {
                self.console.line(format_args!(
                    "Max Play Duration: {} seconds",
                    params.time_limit_secs
                ));
            }
        }

        debug!(
            used = platform::size_used(),
            peak = platform::peak_size_used(),
            "memory before playback"
        );
        self.console.detail(format_args!(
            "BAE memory used for everything {} bytes\n",
            platform::size_used()
        ));

        Ok(self.scheduler.drive(mixer, session.as_mut(), params))
    }

    fn configure_sequence(
        &self,
        mixer: &mut dyn Mixer,
        session: &mut dyn Session,
        request: &PlayRequest<'_>,
        params: &PlaybackParameters,
    ) {
        mixer.set_default_reverb(request.reverb);
        self.console
            .line(format_args!("Reverb Type set to {}", request.reverb.id()));

        if let Some(list) = request.mute_channels.filter(|l| !l.is_empty()) {
            if let Err(err) = apply_mute_list(session, list, self.console) {
                warn!("muting channels failed: {err}");
            }
        }
        if let Err(err) = session.set_loops(params.loop_count) {
            warn!("setting loop count failed: {err}");
        }
    }

    /// Sniff `path`, announce it and play it with the matching session kind.
    pub fn play_file(
        &mut self,
        mixer: &mut dyn Mixer,
        path: &Path,
        reverb: ReverbType,
        mute_channels: Option<&str>,
        params: &PlaybackParameters,
    ) -> Result<PlaybackReport> {
        let file_type = filetype::sniff(path).map_err(|err| match err {
            SniffError::Access(source) => PlaybaeError::File(source),
            SniffError::Unrecognized { path } => PlaybaeError::UnrecognizedFile(path),
        })?;
        self.console
            .line(format_args!("Playing {file_type} {}", path.display()));

        let request = PlayRequest {
            kind: filetype::session_kind_for(file_type),
            path,
            file_type,
            reverb,
            mute_channels,
        };
        Ok(self.play(mixer, &request, params)?)
    }
}
