//! Command-line flags
//!
//! Single-dash flags in the player's traditional style (`-mr 22050`,
//! `-nf`). Each flag is looked up anywhere on the line; the first occurrence
//! wins. A `-cfg` JSON file seeds the configuration before the flags are
//! applied on top.

use crate::config::{Command, PlayerConfig};
use crate::console::Verbosity;
use crate::engine::{FileType, ReverbType, SessionKind};
use crate::{PlaybaeError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Main usage text (`-h`).
pub const USAGE: &str = "\
USAGE:  playbae  -p  {patches.hsb}
                 -f  {Play a file (MIDI, RMF, WAV or AIFF}
                 -o  {write output to file}
                 -mr {mixer sample rate ie. 11025}
                 -l  {# of times to loop}
                 -v  {max volume (in percent, overdrive allowed) (default: 100)}
                 -t  {max length in seconds to play midi (0 = forever)}
                 -mc {MIDI/RMF Channels to mute, 1-16, comma separated (example: 1,10,16)}
                 -rv {set default reverb type}
                 -rl {display reverb definitions}
                 -nf {disable fade-out when stopping via time limit or CTRL-C}
                 -q  {quiet mode}
                 -d  {verbose (debug) mode}
                 -h  {displays this message then exits}
                 -x  {displays additional lesser-used options}
";

/// Lesser-used flags (`-x`).
pub const EXTRA_USAGE: &str = "\
 Additional flags:
                 -2p {use 2-point Interpolation rather than default of Linear}
                 -mv {max voices (default: 64)}
                 -sw {Stream a WAV file}
                 -sa {Stream a AIF file}
                 -w  {Play a WAV file}
                 -a  {Play a AIF file}
                 -r  {Play a RMF file}
                 -m  {Play a MID file}
                 -cfg {load defaults from a JSON file}
";

/// Reverb table printed by `-rl`.
pub fn reverb_list() -> String {
    let mut text = String::from("Valid Reverb Types for -rv command:\n");
    for reverb in ReverbType::ALL {
        text.push_str(&format!("   {:<16}{}\n", reverb.id(), reverb.name()));
    }
    text
}

/// Informational requests that print and exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoRequest {
    /// `-rl`
    ReverbList,
    /// `-h`
    Usage,
    /// `-x`
    ExtraUsage,
}

impl InfoRequest {
    /// Text to print.
    pub fn text(&self) -> String {
        match self {
            InfoRequest::ReverbList => reverb_list(),
            InfoRequest::Usage => USAGE.to_string(),
            InfoRequest::ExtraUsage => EXTRA_USAGE.to_string(),
        }
    }
}

/// Parsed command line.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Effective configuration
    pub config: PlayerConfig,
    /// Defaults file, if one was given
    pub config_file: Option<PathBuf>,
    /// Print-and-exit request, if any
    pub info: Option<InfoRequest>,
    /// Clamping notices to show the user
    pub notices: Vec<String>,
}

/// Explicit play flags in precedence order, after the positional file and `-f`.
const PLAY_FLAGS: [(&str, SessionKind, FileType); 6] = [
    ("-a", SessionKind::Sample, FileType::Aiff),
    ("-sa", SessionKind::Stream, FileType::Aiff),
    ("-w", SessionKind::Sample, FileType::Wave),
    ("-sw", SessionKind::Stream, FileType::Wave),
    ("-r", SessionKind::Rmf, FileType::Rmf),
    ("-m", SessionKind::Song, FileType::Midi),
];

struct ArgList<'a> {
    args: &'a [String],
}

impl<'a> ArgList<'a> {
    fn has(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    fn value(&self, flag: &str) -> Result<Option<&'a str>> {
        match self.args.iter().position(|arg| arg == flag) {
            None => Ok(None),
            Some(index) => self
                .args
                .get(index + 1)
                .map(|value| Some(value.as_str()))
                .ok_or_else(|| PlaybaeError::ConfigError(format!("{flag} requires a value"))),
        }
    }

    fn number<T: FromStr>(&self, flag: &str) -> Result<Option<T>> {
        self.value(flag)?
            .map(|text| {
                text.trim().parse::<T>().map_err(|_| {
                    PlaybaeError::ConfigError(format!("invalid value for {flag}: {text}"))
                })
            })
            .transpose()
    }
}

impl CliArgs {
    /// Parse the process arguments (program name excluded).
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let list = ArgList { args: &args };

        let config_file = list.value("-cfg")?.map(PathBuf::from);
        let mut config = match &config_file {
            Some(path) => PlayerConfig::load_json(path)?,
            None => PlayerConfig::default(),
        };
        let mut notices = config.validate();

        if list.has("-q") {
            config.verbosity = Verbosity::Quiet;
        }
        if list.has("-d") {
            config.verbosity = Verbosity::Verbose;
        }

        let info = if list.has("-rl") {
            Some(InfoRequest::ReverbList)
        } else if list.has("-h") {
            Some(InfoRequest::Usage)
        } else if list.has("-x") {
            Some(InfoRequest::ExtraUsage)
        } else {
            None
        };

        if let Some(voices) = list.number::<i64>("-mv")? {
            notices.extend(config.set_max_voices(voices));
        }
        if let Some(rate) = list.number::<u32>("-mr")? {
            notices.extend(config.set_sample_rate(rate));
        }
        if let Some(loops) = list.number::<u32>("-l")? {
            config.playback.loop_count = loops;
        }
        if let Some(channels) = list.value("-mc")? {
            config.mute_channels = Some(channels.to_string());
        }
        if let Some(volume) = list.number::<u32>("-v")? {
            notices.extend(config.set_volume(volume));
        }
        if let Some(limit) = list.number::<u32>("-t")? {
            config.playback.time_limit_secs = limit;
        }
        if list.has("-nf") {
            config.playback.fade_on_stop = false;
        }
        if list.has("-2p") {
            config.set_two_point();
        }
        if let Some(reverb) = list.number::<i64>("-rv")? {
            notices.extend(config.set_reverb(reverb));
        }
        if let Some(bank) = list.value("-p")? {
            config.bank = Some(PathBuf::from(bank));
        }
        if let Some(output) = list.value("-o")? {
            config.set_output_file(Some(PathBuf::from(output)));
        }

        if let Some(command) = Self::command(&list)? {
            config.command = Some(command);
        }

        Ok(CliArgs {
            config,
            config_file,
            info,
            notices,
        })
    }

    fn command(list: &ArgList<'_>) -> Result<Option<Command>> {
        if let Some(first) = list.args.first().filter(|arg| !arg.starts_with('-')) {
            return Ok(Some(Command::PlayFile(PathBuf::from(first))));
        }
        if let Some(path) = list.value("-f")? {
            return Ok(Some(Command::PlayFile(PathBuf::from(path))));
        }
        for (flag, kind, file_type) in PLAY_FLAGS {
            if let Some(path) = list.value(flag)? {
                return Ok(Some(Command::Play {
                    kind,
                    file_type,
                    path: PathBuf::from(path),
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Interpolation;
    use crate::playback::SinkMode;

    fn parse(line: &str) -> CliArgs {
        CliArgs::parse_from(line.split_whitespace()).unwrap()
    }

    #[test]
    fn test_positional_file() {
        let args = parse("song.mid -v 50 -t 30 -l 2");
        assert_eq!(args.config.command, Some(Command::PlayFile("song.mid".into())));
        assert_eq!(args.config.playback.volume_percent, 50);
        assert_eq!(args.config.playback.time_limit_secs, 30);
        assert_eq!(args.config.playback.loop_count, 2);
        assert!(args.info.is_none());
    }

    #[test]
    fn test_command_precedence() {
        let args = parse("-m a.mid -w b.wav -f c.rmf");
        assert_eq!(args.config.command, Some(Command::PlayFile("c.rmf".into())));

        let args = parse("-m a.mid -sw b.wav");
        assert_eq!(
            args.config.command,
            Some(Command::Play {
                kind: SessionKind::Stream,
                file_type: FileType::Wave,
                path: "b.wav".into(),
            })
        );
        assert!(parse("-q").config.command.is_none());
    }

    #[test]
    fn test_flags() {
        let args = parse("-nf -2p -mr 22050 -mv 16 -rv 3 -mc 1,10 -o out.wav -p bank.hsb -d");
        let config = &args.config;
        assert!(!config.playback.fade_on_stop);
        assert_eq!(config.playback.mixer.interpolation, Interpolation::TwoPoint);
        assert_eq!(config.playback.mixer.sample_rate, 22_050);
        assert_eq!(config.max_voices, 16);
        assert_eq!(config.reverb, ReverbType::Garage);
        assert_eq!(config.mute_channels.as_deref(), Some("1,10"));
        assert_eq!(config.playback.sink, SinkMode::File);
        assert_eq!(config.bank, Some(PathBuf::from("bank.hsb")));
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(args.notices.is_empty());
    }

    #[test]
    fn test_clamp_notices() {
        let args = parse("-mv 2 -v 900 -rv 40");
        assert_eq!(args.notices.len(), 3);
        assert_eq!(args.config.playback.volume_percent, 500);
        assert_eq!(args.config.reverb, ReverbType::EarlyReflections);
    }

    #[test]
    fn test_info_requests() {
        assert_eq!(parse("-h").info, Some(InfoRequest::Usage));
        assert_eq!(parse("-x -h").info, Some(InfoRequest::Usage));
        assert_eq!(parse("-rl -h").info, Some(InfoRequest::ReverbList));
        let list = reverb_list();
        assert!(list.contains("   8               Early reflections (variable verb)\n"));
        assert_eq!(list.lines().count(), 13);
    }

    #[test]
    fn test_bad_values() {
        assert!(CliArgs::parse_from(["-v"]).is_err());
        assert!(CliArgs::parse_from(["-t", "soon"]).is_err());
    }

    #[test]
    fn test_config_file_is_overlaid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, r#"{"playback": {"volume_percent": 80, "loop_count": 3}}"#).unwrap();

        let args = CliArgs::parse_from(["-cfg", path.to_str().unwrap(), "-l", "1"]).unwrap();
        assert_eq!(args.config.playback.volume_percent, 80);
        assert_eq!(args.config.playback.loop_count, 1);
        assert_eq!(args.config_file, Some(path));
    }
}
