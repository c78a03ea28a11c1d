//! Poll-loop properties checked against scripted sessions.

use parking_lot::Mutex;
use playbae::console::{Console, Verbosity};
use playbae::engine::{
    BankToken, CompletionNotice, EngineError, EngineResult, EngineVolume, FileType, Mixer,
    ReverbType, Session, SessionKind,
};
use playbae::platform::{self, Sleeper, ThreadSleeper};
use playbae::playback::volume::to_engine;
use playbae::playback::{
    InterruptSignal, PlayRequest, PlaybackParameters, Player, Scheduler, SchedulerPolicy,
    SessionPhase, SinkMode, StopReason,
};
use std::path::Path;
use std::sync::Arc;

/// Calls observed by a scripted session.
#[derive(Debug, Default)]
struct CallLog {
    stops: Vec<(u64, bool)>,
    volumes: Vec<EngineVolume>,
    loops: Vec<u32>,
    muted: Vec<u8>,
    started: bool,
    reverb: Option<ReverbType>,
}

/// Position advances by `step` each poll; finishes on its own after
/// `done_after` polls, or `drain_polls` polls after a stop.
struct Scripted {
    kind: SessionKind,
    step: u64,
    done_after: u64,
    drain_polls: u64,
    polls: Mutex<u64>,
    stopped_at: Option<u64>,
    raise_on: Vec<u64>,
    interrupt: Option<Arc<InterruptSignal>>,
    log: Arc<Mutex<CallLog>>,
    volume: EngineVolume,
}

impl Scripted {
    fn new(kind: SessionKind, step: u64, done_after: u64) -> Self {
        Scripted {
            kind,
            step,
            done_after,
            drain_polls: 3,
            polls: Mutex::new(0),
            stopped_at: None,
            raise_on: Vec::new(),
            interrupt: None,
            log: Arc::new(Mutex::new(CallLog::default())),
            volume: EngineVolume::UNITY,
        }
    }

    fn polls(&self) -> u64 {
        *self.polls.lock()
    }
}

impl Session for Scripted {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    fn load(&mut self, _: &Path, _: FileType) -> EngineResult<()> {
        Ok(())
    }

    fn start(&mut self) -> EngineResult<()> {
        self.log.lock().started = true;
        Ok(())
    }

    fn stop(&mut self, fade: bool) {
        let polls = self.polls();
        self.log.lock().stops.push((polls, fade));
        self.stopped_at.get_or_insert(polls);
    }

    fn is_done(&self) -> bool {
        let polls = {
            let mut polls = self.polls.lock();
            *polls += 1;
            *polls
        };
        if let Some(interrupt) = &self.interrupt {
            if self.raise_on.contains(&polls) {
                interrupt.raise();
            }
        }
        match self.stopped_at {
            Some(at) => polls > at + self.drain_polls,
            None => polls >= self.done_after,
        }
    }

    fn position(&self) -> u64 {
        self.polls() * self.step
    }

    fn set_volume(&mut self, volume: EngineVolume) {
        self.volume = volume;
        self.log.lock().volumes.push(volume);
    }

    fn volume(&self) -> EngineVolume {
        self.volume
    }

    fn set_loops(&mut self, loops: u32) -> EngineResult<()> {
        self.log.lock().loops.push(loops);
        Ok(())
    }

    fn mute_channel(&mut self, channel: u8) -> EngineResult<()> {
        self.log.lock().muted.push(channel);
        Ok(())
    }

    fn sample_rate(&self) -> Option<u32> {
        match self.kind {
            SessionKind::Sample | SessionKind::Stream => Some(1000),
            _ => None,
        }
    }

    fn take_completion(&mut self) -> Option<CompletionNotice> {
        None
    }
}

/// Records servicing calls; hands out one prepared session.
#[derive(Default)]
struct FakeMixer {
    prepared: Option<Scripted>,
    stream_services: Vec<u64>,
    file_services: u32,
    log: Arc<Mutex<CallLog>>,
}

impl Mixer for FakeMixer {
    fn new_session(&mut self, _: SessionKind) -> EngineResult<Box<dyn Session>> {
        let session = self.prepared.take().ok_or(EngineError::MEMORY_ERR)?;
        self.log = Arc::clone(&session.log);
        Ok(Box::new(session))
    }

    fn service_streams(&mut self) {
        self.stream_services.push(platform::now());
    }

    fn service_output_to_file(&mut self) -> EngineResult<()> {
        self.file_services += 1;
        Ok(())
    }

    fn set_default_reverb(&mut self, reverb: ReverbType) {
        self.log.lock().reverb = Some(reverb);
    }

    fn add_bank_from_file(&mut self, _: &Path) -> EngineResult<BankToken> {
        Ok(BankToken(1))
    }

    fn start_output_to_file(&mut self, _: &Path) -> EngineResult<()> {
        Ok(())
    }

    fn stop_output_to_file(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn is_writing_to_file(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct Recorder(Vec<u64>);

impl Sleeper for Recorder {
    fn sleep_micros(&mut self, micros: u64) {
        self.0.push(micros);
    }
}

fn params(time_limit_secs: u32) -> PlaybackParameters {
    PlaybackParameters {
        time_limit_secs,
        ..PlaybackParameters::default()
    }
}

#[test]
fn test_second_interrupt_while_draining_is_ignored() {
    let interrupt = Arc::new(InterruptSignal::new());
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    let mut session = Scripted::new(SessionKind::Song, 1_000, 1_000);
    session.drain_polls = 10;
    session.raise_on = vec![5, 7, 9];
    session.interrupt = Some(Arc::clone(&interrupt));
    let mut mixer = FakeMixer::default();

    let report = scheduler.drive(&mut mixer, &mut session, &params(0));

    assert_eq!(report.stop_requests, 1);
    assert_eq!(report.stop_reason, Some(StopReason::Interrupted));
    // raised during poll 5, observed at the top of iteration 6
    assert_eq!(report.stop_iteration, Some(6));
    assert_eq!(session.log.lock().stops, vec![(5, true)]);
    assert_eq!(report.final_phase, SessionPhase::Finished);
    assert_eq!(
        buffer.contents().matches("Stop requested... please wait for data flush...").count(),
        1
    );
}

#[test]
fn test_sequence_time_limit_margin_is_exact() {
    let interrupt = InterruptSignal::new();
    let (console, _) = Console::capture(Verbosity::Quiet);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    // 250 ms per poll: 9250 ms at poll 37 is not past the margin, 9500 ms at poll 38 is
    let mut session = Scripted::new(SessionKind::Song, 250_000, 10_000);
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &params(10));

    assert_eq!(report.stop_reason, Some(StopReason::TimeLimit));
    assert_eq!(report.stop_iteration, Some(38));
    assert_eq!(report.stop_requests, 1);
    assert_eq!(session.log.lock().stops, vec![(38, true)]);
}

#[test]
fn test_pcm_time_limit_has_no_margin() {
    let interrupt = InterruptSignal::new();
    let (console, _) = Console::capture(Verbosity::Quiet);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    // 250 frames at 1 kHz per poll: 9.75 s at poll 39, 10 s at poll 40
    let mut session = Scripted::new(SessionKind::Sample, 250, 10_000);
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &params(10));

    assert_eq!(report.stop_iteration, Some(40));
    assert_eq!(report.stop_requests, 1);
}

#[test]
fn test_stream_ignores_time_limit() {
    let interrupt = InterruptSignal::new();
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    let mut session = Scripted::new(SessionKind::Stream, 1_000, 50);
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &params(1));

    assert_eq!(report.stop_requests, 0);
    assert_eq!(report.iterations, 50);
    assert_eq!(report.display_lines, 0);
    assert!(buffer.contents().is_empty());
}

#[test]
fn test_display_throttle_per_sink() {
    let interrupt = InterruptSignal::new();
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    // positions start past one second so every due line is printed
    let mut session = Scripted::new(SessionKind::Song, 2_000_000, 100);
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &params(0));
    assert_eq!(report.iterations, 100);
    assert_eq!(report.display_lines, 10);
    assert_eq!(buffer.contents().matches('\r').count(), 10);

    let mut session = Scripted::new(SessionKind::Rmf, 2_000_000, 250);
    let to_file = PlaybackParameters {
        sink: SinkMode::File,
        ..params(0)
    };
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &to_file);
    assert_eq!(report.display_lines, 2);

    let mut session = Scripted::new(SessionKind::Sample, 2_000, 30);
    let report = scheduler.drive(&mut FakeMixer::default(), &mut session, &params(0));
    assert_eq!(report.display_lines, 30);
}

#[test]
fn test_file_sink_does_not_sleep() {
    let interrupt = InterruptSignal::new();
    let (console, _) = Console::capture(Verbosity::Quiet);
    let mut scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());

    let mut mixer = FakeMixer::default();
    let mut session = Scripted::new(SessionKind::Song, 1_000, 40);
    let to_file = PlaybackParameters {
        sink: SinkMode::File,
        ..params(0)
    };
    scheduler.drive(&mut mixer, &mut session, &to_file);

    assert!(scheduler.sleeper().0.is_empty());
    // one render per idle, including the single trailing drain
    assert_eq!(mixer.file_services, 40);
    assert!(mixer.stream_services.is_empty());
}

#[test]
fn test_device_sink_paces_in_real_time() {
    let interrupt = InterruptSignal::new();
    let (console, _) = Console::capture(Verbosity::Quiet);
    let policy = SchedulerPolicy {
        drain_micros: 24_000,
        ..SchedulerPolicy::default()
    };
    let mut scheduler = Scheduler::with_sleeper(policy, &console, &interrupt, ThreadSleeper);

    let mut mixer = FakeMixer::default();
    let mut session = Scripted::new(SessionKind::Sample, 10, 6);
    let started = platform::now();
    scheduler.drive(&mut mixer, &mut session, &params(0));

    assert_eq!(mixer.stream_services.len(), 6);
    let mut previous = started;
    for &at in &mixer.stream_services[..5] {
        assert!(at - previous >= 12_000, "serviced after {} us", at - previous);
        previous = at;
    }
}

#[test]
fn test_one_shot_plays_to_completion_with_single_drain() {
    let interrupt = InterruptSignal::new();
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
    let mut player = Player::with_scheduler(scheduler);

    let mut mixer = FakeMixer {
        prepared: Some(Scripted::new(SessionKind::Sample, 100, 8)),
        ..FakeMixer::default()
    };
    let params = PlaybackParameters {
        volume_percent: 50,
        ..PlaybackParameters::default()
    };
    let request = PlayRequest::new(SessionKind::Sample, Path::new("tone.wav"), FileType::Wave);
    let report = player.play(&mut mixer, &request, &params).unwrap();

    assert_eq!(report.iterations, 8);
    assert_eq!(report.stop_requests, 0);
    let sleeps = &player.scheduler().sleeper().0;
    // seven 12 ms poll increments, then 75 for the single 900 ms drain
    assert_eq!(sleeps.len(), 7 + 75);

    let log = mixer.log.lock();
    assert!(log.started);
    assert_eq!(log.volumes, vec![to_engine(50)]);
    assert!(log.loops.is_empty());
    assert!(buffer.contents().contains("Master sound volume set to 50%\n"));
}

#[test]
fn test_looping_song_without_limit_never_stops_for_time() {
    let interrupt = InterruptSignal::new();
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
    let mut player = Player::with_scheduler(scheduler);

    let mut mixer = FakeMixer {
        prepared: Some(Scripted::new(SessionKind::Song, 500_000, 400)),
        ..FakeMixer::default()
    };
    let params = PlaybackParameters {
        loop_count: 2,
        ..PlaybackParameters::default()
    };
    let request = PlayRequest {
        mute_channels: Some("1,10,16,0,abc"),
        reverb: ReverbType::Cavern,
        ..PlayRequest::new(SessionKind::Song, Path::new("song.mid"), FileType::Midi)
    };
    let report = player.play(&mut mixer, &request, &params).unwrap();

    assert_eq!(report.stop_requests, 0);
    assert_eq!(report.iterations, 400);
    let log = mixer.log.lock();
    assert_eq!(log.loops, vec![2]);
    assert_eq!(log.muted, vec![0, 9, 15]);
    assert_eq!(log.reverb, Some(ReverbType::Cavern));

    let output = buffer.contents();
    assert!(output.contains("Reverb Type set to 5\n"));
    assert!(output.contains("Invalid MIDI channel specified: abc\n"));
    assert!(output.contains("Will loop song 2 times\n"));
    assert!(!output.contains("Max Play Duration"));
    assert!(output.ends_with('\n'));
}

#[test]
fn test_setup_failures_skip_polling() {
    let interrupt = InterruptSignal::new();
    let (console, buffer) = Console::capture(Verbosity::Normal);
    let scheduler =
        Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
    let mut player = Player::with_scheduler(scheduler);

    // no session prepared: allocation fails
    let mut mixer = FakeMixer::default();
    let request = PlayRequest::new(SessionKind::Sample, Path::new("a.wav"), FileType::Wave);
    let err = player
        .play(&mut mixer, &request, &PlaybackParameters::default())
        .unwrap_err();
    assert_eq!(err, EngineError::MEMORY_ERR);
    assert!(player.scheduler().sleeper().0.is_empty());
    assert!(buffer.contents().is_empty());
}
