//! Mute-channel lists
//!
//! Lists are comma separated, 1-based, valid from 1 to 16. The engine takes
//! 0-based channels. Bad entries are reported and skipped.

use crate::console::Console;
use crate::engine::{EngineResult, Session};

/// Highest 1-based channel number.
pub const MAX_CHANNEL: u8 = 16;

/// Outcome of parsing (and applying) a mute list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteReport {
    /// 0-based channels muted, in list order
    pub muted: Vec<u8>,
    /// Entries rejected as non-numeric or out of range
    pub skipped: Vec<String>,
}

/// One list entry as a 0-based channel, if valid.
fn parse_entry(token: &str) -> Option<u8> {
    match token.trim().parse::<u8>() {
        Ok(channel) if (1..=MAX_CHANNEL).contains(&channel) => Some(channel - 1),
        _ => None,
    }
}

/// Non-empty entries of a comma separated list, each with its parsed channel.
fn entries(list: &str) -> impl Iterator<Item = (&str, Option<u8>)> {
    list.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| (t, parse_entry(t)))
}

/// Split a list into valid 0-based channels and rejected entries.
pub fn parse_mute_list(list: &str) -> MuteReport {
    let mut report = MuteReport::default();
    for (token, channel) in entries(list) {
        match channel {
            Some(channel) => report.muted.push(channel),
            None => report.skipped.push(token.to_string()),
        }
    }
    report
}

/// Mute every valid entry of `list` on `session`, announcing each.
///
/// An engine failure stops the walk and is returned; invalid entries never do.
pub fn apply_mute_list(
    session: &mut dyn Session,
    list: &str,
    console: &Console,
) -> EngineResult<MuteReport> {
    let mut report = MuteReport::default();
    for (token, channel) in entries(list) {
        match channel {
            Some(channel) => {
                session.mute_channel(channel)?;
                console.line(format_args!("Muting midi channel {}", channel + 1));
                report.muted.push(channel);
            }
            None => {
                console.line(format_args!("Invalid MIDI channel specified: {token}"));
                report.skipped.push(token.to_string());
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Verbosity;
    use crate::engine::{EngineVolume, FileType, SessionKind};
    use std::path::Path;

    #[test]
    fn test_valid_list() {
        let report = parse_mute_list("1,10,16");
        assert_eq!(report.muted, vec![0, 9, 15]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let report = parse_mute_list("0,17,abc");
        assert!(report.muted.is_empty());
        assert_eq!(report.skipped, vec!["0", "17", "abc"]);
    }

    #[test]
    fn test_mixed_and_empty_entries() {
        let report = parse_mute_list(" 2 ,,x,3,");
        assert_eq!(report.muted, vec![1, 2]);
        assert_eq!(report.skipped, vec!["x"]);
        assert_eq!(parse_mute_list(""), MuteReport::default());
    }

    /// Records the channels it is asked to mute.
    #[derive(Default)]
    struct Muted(Vec<u8>);

    impl Session for Muted {
        fn kind(&self) -> SessionKind {
            SessionKind::Song
        }
        fn load(&mut self, _: &Path, _: FileType) -> EngineResult<()> {
            Ok(())
        }
        fn start(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn stop(&mut self, _: bool) {}
        fn is_done(&self) -> bool {
            true
        }
        fn position(&self) -> u64 {
            0
        }
        fn set_volume(&mut self, _: EngineVolume) {}
        fn volume(&self) -> EngineVolume {
            EngineVolume::UNITY
        }
        fn set_loops(&mut self, _: u32) -> EngineResult<()> {
            Ok(())
        }
        fn mute_channel(&mut self, channel: u8) -> EngineResult<()> {
            self.0.push(channel);
            Ok(())
        }
        fn sample_rate(&self) -> Option<u32> {
            None
        }
    }

    #[test]
    fn test_apply_matches_parse() {
        let list = " 2 ,,x,16,0,";
        let (console, buffer) = Console::capture(Verbosity::Normal);
        let mut session = Muted::default();

        let report = apply_mute_list(&mut session, list, &console).unwrap();
        assert_eq!(report, parse_mute_list(list));
        assert_eq!(session.0, vec![1, 15]);
        assert_eq!(
            buffer.contents(),
            "Muting midi channel 2\n\
             Invalid MIDI channel specified: x\n\
             Muting midi channel 16\n\
             Invalid MIDI channel specified: 0\n"
        );
    }
}
