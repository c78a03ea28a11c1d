//! The poll loop

use super::{
    InterruptSignal, PlaybackParameters, PlaybackReport, PositionDisplayThrottle, SchedulerPolicy,
    SessionPhase, SessionProfile, SinkMode, StopReason,
};
use crate::console::Console;
use crate::engine::{Mixer, Session};
use crate::platform::{Sleeper, ThreadSleeper};
use tracing::{debug, warn};

/// Drives one session at a time to completion.
pub struct Scheduler<'a, S: Sleeper = ThreadSleeper> {
    policy: SchedulerPolicy,
    console: &'a Console,
    interrupt: &'a InterruptSignal,
    sleeper: S,
}

impl<'a> Scheduler<'a, ThreadSleeper> {
    /// Scheduler that sleeps on the calling thread.
    pub fn new(policy: SchedulerPolicy, console: &'a Console, interrupt: &'a InterruptSignal) -> Self {
        Self::with_sleeper(policy, console, interrupt, ThreadSleeper)
    }
}

impl<'a, S: Sleeper> Scheduler<'a, S> {
    /// Scheduler with a custom wait primitive.
    pub fn with_sleeper(
        policy: SchedulerPolicy,
        console: &'a Console,
        interrupt: &'a InterruptSignal,
        sleeper: S,
    ) -> Self {
        Scheduler {
            policy,
            console,
            interrupt,
            sleeper,
        }
    }

    /// The wait primitive.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Console the scheduler prints to.
    pub fn console(&self) -> &'a Console {
        self.console
    }

    /// Poll an already started `session` until the engine reports it done,
    /// then drain once.
    pub fn drive(
        &mut self,
        mixer: &mut dyn Mixer,
        session: &mut dyn Session,
        params: &PlaybackParameters,
    ) -> PlaybackReport {
        let kind = session.kind();
        let profile = SessionProfile::select(kind, params.sink, &self.policy);
        let sample_rate = session.sample_rate();
        let mut throttle = PositionDisplayThrottle::new(profile.display_divisor);
        let mut report = PlaybackReport::default();
        let mut phase = SessionPhase::Running;
        debug!(?kind, ?profile, "session running");

        loop {
            report.iterations += 1;

            if self.interrupt.take() && phase == SessionPhase::Running {
                self.console
                    .line("Stop requested... please wait for data flush...");
                phase = self.request_stop(session, params, StopReason::Interrupted, &mut report);
            }

            // completion strictly before position
            let done = session.is_done();
            let position_ms = profile.unit.to_millis(session.position(), sample_rate);
            report.last_position_ms = position_ms;

            if throttle.tick() {
                if let Some(line) = profile.display.format(position_ms) {
                    self.console.status(line);
                    report.display_lines += 1;
                }
            }

            if phase == SessionPhase::Running
                && profile.time_limit.exceeded(position_ms, params.time_limit_secs)
            {
                phase = self.request_stop(session, params, StopReason::TimeLimit, &mut report);
            }

            if let Some(notice) = session.take_completion() {
                debug!(
                    position = notice.position,
                    stopped = notice.stopped,
                    at_micros = notice.at_micros,
                    "session completion"
                );
            }

            if done {
                phase = SessionPhase::Finished;
                break;
            }
            self.idle(mixer, params.sink, self.policy.poll_interval_micros, &mut report);
        }

        self.idle(mixer, params.sink, self.policy.drain_micros, &mut report);
        report.final_phase = phase;
        debug!(
            iterations = report.iterations,
            stops = report.stop_requests,
            "session finished"
        );
        report
    }

    fn request_stop(
        &mut self,
        session: &mut dyn Session,
        params: &PlaybackParameters,
        reason: StopReason,
        report: &mut PlaybackReport,
    ) -> SessionPhase {
        debug!(?reason, fade = params.fade_on_stop, "stop requested");
        session.stop(params.fade_on_stop);
        report.stop_requests += 1;
        report.stop_reason = Some(reason);
        report.stop_iteration = Some(report.iterations);
        SessionPhase::Draining
    }

    /// Give the engine time: one file render on a file sink, otherwise
    /// `interval` worth of sleep increments followed by stream servicing.
    fn idle(
        &mut self,
        mixer: &mut dyn Mixer,
        sink: SinkMode,
        interval_micros: u64,
        report: &mut PlaybackReport,
    ) {
        match sink {
            SinkMode::File => {
                if let Err(err) = mixer.service_output_to_file() {
                    if report.service_errors == 0 {
                        warn!("file output servicing failed: {err}");
                    }
                    report.service_errors += 1;
                }
            }
            SinkMode::Device => {
                let increment = self.policy.sleep_increment_micros;
                if increment == 0 || interval_micros < increment {
                    // shorter than one increment: wait it out in one go
                    if interval_micros > 0 {
                        self.sleeper.sleep_micros(interval_micros);
                    }
                } else {
                    for _ in 0..interval_micros / increment {
                        self.sleeper.sleep_micros(increment);
                    }
                }
                mixer.service_streams();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Verbosity;
    use crate::engine::{
        BankToken, EngineResult, EngineVolume, FileType, ReverbType, SessionKind,
    };
    use std::path::Path;

    /// Reports done after `done_after` polls; position advances by `step` per poll.
    struct Countdown {
        kind: SessionKind,
        polls: u64,
        done_after: u64,
        step: u64,
        stops: Vec<bool>,
    }

    impl Session for Countdown {
        fn kind(&self) -> SessionKind {
            self.kind
        }
        fn load(&mut self, _: &Path, _: FileType) -> EngineResult<()> {
            Ok(())
        }
        fn start(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn stop(&mut self, fade: bool) {
            self.stops.push(fade);
        }
        fn is_done(&self) -> bool {
            self.polls >= self.done_after
        }
        fn position(&self) -> u64 {
            self.polls * self.step
        }
        fn set_volume(&mut self, _: EngineVolume) {}
        fn volume(&self) -> EngineVolume {
            EngineVolume::UNITY
        }
        fn set_loops(&mut self, _: u32) -> EngineResult<()> {
            Ok(())
        }
        fn mute_channel(&mut self, _: u8) -> EngineResult<()> {
            Ok(())
        }
        fn sample_rate(&self) -> Option<u32> {
            Some(1000)
        }
        fn take_completion(&mut self) -> Option<crate::engine::CompletionNotice> {
            // one poll per completion check
            self.polls += 1;
            None
        }
    }

    #[derive(Default)]
    struct CountingMixer {
        file_services: u32,
        stream_services: u32,
    }

    impl Mixer for CountingMixer {
        fn new_session(&mut self, _: SessionKind) -> EngineResult<Box<dyn Session>> {
            Err(crate::engine::EngineError::MEMORY_ERR)
        }
        fn service_streams(&mut self) {
            self.stream_services += 1;
        }
        fn service_output_to_file(&mut self) -> EngineResult<()> {
            self.file_services += 1;
            Ok(())
        }
        fn set_default_reverb(&mut self, _: ReverbType) {}
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

    fn countdown(done_after: u64) -> Countdown {
        Countdown {
            kind: SessionKind::Sample,
            polls: 0,
            done_after,
            step: 10,
            stops: Vec::new(),
        }
    }

    #[test]
    fn test_natural_completion_device_sink() {
        let (console, _) = Console::capture(Verbosity::Quiet);
        let interrupt = InterruptSignal::new();
        let mut scheduler =
            Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
        let mut mixer = CountingMixer::default();
        let mut session = countdown(3);

        let report = scheduler.drive(&mut mixer, &mut session, &PlaybackParameters::default());
        assert_eq!(report.iterations, 4);
        assert_eq!(report.stop_requests, 0);
        assert_eq!(report.final_phase, SessionPhase::Finished);
        // 3 polls of one 12 ms increment, then 75 for the drain
        assert_eq!(scheduler.sleeper().0.len(), 3 + 75);
        assert!(scheduler.sleeper().0.iter().all(|&m| m == 12_000));
        assert_eq!(mixer.stream_services, 4);
        assert_eq!(mixer.file_services, 0);
    }

    #[test]
    fn test_file_sink_never_sleeps() {
        let (console, _) = Console::capture(Verbosity::Quiet);
        let interrupt = InterruptSignal::new();
        let mut scheduler =
            Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
        let mut mixer = CountingMixer::default();
        let mut session = countdown(5);
        let params = PlaybackParameters {
            sink: SinkMode::File,
            ..PlaybackParameters::default()
        };

        scheduler.drive(&mut mixer, &mut session, &params);
        assert!(scheduler.sleeper().0.is_empty());
        assert_eq!(mixer.file_services, 6);
    }

    #[test]
    fn test_short_poll_interval_still_waits() {
        let (console, _) = Console::capture(Verbosity::Quiet);
        let interrupt = InterruptSignal::new();
        let policy = SchedulerPolicy {
            poll_interval_micros: 5_000,
            drain_micros: 0,
            ..SchedulerPolicy::default()
        };
        let mut scheduler =
            Scheduler::with_sleeper(policy, &console, &interrupt, Recorder::default());
        let mut mixer = CountingMixer::default();
        let mut session = countdown(3);

        scheduler.drive(&mut mixer, &mut session, &PlaybackParameters::default());
        assert_eq!(scheduler.sleeper().0, vec![5_000; 3]);
        assert_eq!(mixer.stream_services, 4);
    }

    #[test]
    fn test_interrupt_prints_notice_and_stops_once() {
        let (console, buffer) = Console::capture(Verbosity::Normal);
        let interrupt = InterruptSignal::new();
        interrupt.raise();
        let mut scheduler =
            Scheduler::with_sleeper(SchedulerPolicy::default(), &console, &interrupt, Recorder::default());
        let mut mixer = CountingMixer::default();
        let mut session = countdown(2);
        let params = PlaybackParameters {
            fade_on_stop: false,
            ..PlaybackParameters::default()
        };

        let report = scheduler.drive(&mut mixer, &mut session, &params);
        assert_eq!(session.stops, vec![false]);
        assert_eq!(report.stop_reason, Some(StopReason::Interrupted));
        assert!(buffer
            .contents()
            .starts_with("Stop requested... please wait for data flush...\n"));
        assert!(!interrupt.is_pending());
    }
}
