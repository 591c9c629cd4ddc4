//! Interactive console commands
//!
//! Each input line maps to one [`ConsoleCommand`]; playback commands become
//! intents on a [`PlaybackHandle`].

use crate::display::{format_queue, format_status};
use cadence_playback::{GainConfig, GainMode, PreAmp, RepeatMode};
use cadence_service::PlaybackHandle;
use thiserror::Error;

/// Console help text
pub const HELP: &str = "\
commands:
  p, toggle              play / pause
  pause | resume | stop
  n, next | b, prev
  skip <n>               jump to queue entry n
  seek <seconds>
  repeat [off|all|one]   set or cycle repeat mode
  shuffle [on|off]       set or toggle shuffle
  remove <n> | move <from> <to> | clear
  gain <track|album|dynamic> [pre-amp dB]
  s, status | q, queue
  help | quit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Toggle,
    Pause,
    Resume,
    Stop,
    Next,
    Prev,
    SkipTo(usize),
    Seek(u64),
    Repeat(Option<RepeatMode>),
    Shuffle(Option<bool>),
    Remove(usize),
    Move(usize, usize),
    Clear,
    Gain(GainMode, f64),
    Status,
    Queue,
    Help,
    Quit,
}

/// Why a console line was rejected
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("invalid value '{0}'")]
    InvalidValue(String),
}

/// Parse a repeat mode name
pub fn parse_repeat_mode(value: &str) -> Result<RepeatMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "off" | "none" => Ok(RepeatMode::Off),
        "all" => Ok(RepeatMode::All),
        "one" | "track" => Ok(RepeatMode::One),
        other => Err(format!("unknown repeat mode '{}'", other)),
    }
}

fn parse_gain_mode(value: &str) -> Option<GainMode> {
    match value.to_ascii_lowercase().as_str() {
        "track" => Some(GainMode::Track),
        "album" => Some(GainMode::Album),
        "dynamic" => Some(GainMode::Dynamic),
        _ => None,
    }
}

fn number<T: std::str::FromStr>(
    arg: Option<&str>,
    command: &'static str,
    expected: &'static str,
) -> Result<T, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument { command, expected })?;
    arg.parse()
        .map_err(|_| ParseError::InvalidValue(arg.to_string()))
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let first = words.next();

    let parsed = match command.to_ascii_lowercase().as_str() {
        "p" | "toggle" | "play" => ConsoleCommand::Toggle,
        "pause" => ConsoleCommand::Pause,
        "resume" => ConsoleCommand::Resume,
        "stop" => ConsoleCommand::Stop,
        "n" | "next" => ConsoleCommand::Next,
        "b" | "prev" | "previous" => ConsoleCommand::Prev,
        "skip" => ConsoleCommand::SkipTo(number(first, "skip", "a queue position")?),
        "seek" => {
            let secs: f64 = number(first, "seek", "a position in seconds")?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(ParseError::InvalidValue(secs.to_string()));
            }
            ConsoleCommand::Seek((secs * 1000.0).round() as u64)
        }
        "repeat" => ConsoleCommand::Repeat(
            first
                .map(|v| parse_repeat_mode(v).map_err(|_| ParseError::InvalidValue(v.to_string())))
                .transpose()?,
        ),
        "shuffle" => ConsoleCommand::Shuffle(match first {
            None => None,
            Some("on") => Some(true),
            Some("off") => Some(false),
            Some(other) => return Err(ParseError::InvalidValue(other.to_string())),
        }),
        "remove" => ConsoleCommand::Remove(number(first, "remove", "a queue position")?),
        "move" => ConsoleCommand::Move(
            number(first, "move", "two queue positions")?,
            number(words.next(), "move", "two queue positions")?,
        ),
        "clear" => ConsoleCommand::Clear,
        "gain" => {
            let mode = first.ok_or(ParseError::MissingArgument {
                command: "gain",
                expected: "a mode",
            })?;
            let mode =
                parse_gain_mode(mode).ok_or_else(|| ParseError::InvalidValue(mode.to_string()))?;
            let pre_amp = match words.next() {
                Some(db) => db
                    .parse()
                    .map_err(|_| ParseError::InvalidValue(db.to_string()))?,
                None => 0.0,
            };
            ConsoleCommand::Gain(mode, pre_amp)
        }
        "s" | "status" => ConsoleCommand::Status,
        "q" | "queue" => ConsoleCommand::Queue,
        "h" | "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(parsed))
}

/// What the console loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Print(String),
    Quit,
}

/// Apply a command through the playback handle
pub fn execute(handle: &PlaybackHandle, command: ConsoleCommand) -> anyhow::Result<Flow> {
    match command {
        ConsoleCommand::Toggle => handle.toggle_playing()?,
        ConsoleCommand::Pause => handle.pause()?,
        ConsoleCommand::Resume => handle.resume()?,
        ConsoleCommand::Stop => handle.stop()?,
        ConsoleCommand::Next => handle.next()?,
        ConsoleCommand::Prev => handle.prev()?,
        ConsoleCommand::SkipTo(position) => handle.skip_to(position)?,
        ConsoleCommand::Seek(position_ms) => handle.seek_to(position_ms)?,
        ConsoleCommand::Repeat(Some(mode)) => handle.set_repeat_mode(mode)?,
        ConsoleCommand::Repeat(None) => handle.cycle_repeat_mode()?,
        ConsoleCommand::Shuffle(Some(on)) => handle.set_shuffled(on)?,
        ConsoleCommand::Shuffle(None) => {
            let shuffled = handle.snapshot()?.shuffled;
            handle.set_shuffled(!shuffled)?;
        }
        ConsoleCommand::Remove(position) => handle.remove(position)?,
        ConsoleCommand::Move(from, to) => handle.move_item(from, to)?,
        ConsoleCommand::Clear => handle.clear_queue()?,
        ConsoleCommand::Gain(mode, pre_amp_db) => {
            let current = handle.session()?.gain;
            let pre_amp = PreAmp::new(pre_amp_db, current.pre_amp.without_tags_db);
            let config = GainConfig::new(mode, pre_amp)
                .with_prevent_clipping(current.prevent_clipping);
            handle.set_gain_config(config)?;
        }
        ConsoleCommand::Status => return Ok(Flow::Print(format_status(&*handle.snapshot()?))),
        ConsoleCommand::Queue => return Ok(Flow::Print(format_queue(&*handle.snapshot()?))),
        ConsoleCommand::Help => return Ok(Flow::Print(HELP.to_string())),
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_commands() {
        assert_eq!(parse_line("p"), Ok(Some(ConsoleCommand::Toggle)));
        assert_eq!(parse_line("  NEXT  "), Ok(Some(ConsoleCommand::Next)));
        assert_eq!(parse_line("b"), Ok(Some(ConsoleCommand::Prev)));
        assert_eq!(parse_line(""), Ok(None));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(parse_line("seek 1.5"), Ok(Some(ConsoleCommand::Seek(1500))));
        assert_eq!(parse_line("skip 3"), Ok(Some(ConsoleCommand::SkipTo(3))));
        assert_eq!(parse_line("move 4 0"), Ok(Some(ConsoleCommand::Move(4, 0))));
        assert_eq!(
            parse_line("repeat one"),
            Ok(Some(ConsoleCommand::Repeat(Some(RepeatMode::One))))
        );
        assert_eq!(parse_line("repeat"), Ok(Some(ConsoleCommand::Repeat(None))));
        assert_eq!(
            parse_line("shuffle off"),
            Ok(Some(ConsoleCommand::Shuffle(Some(false))))
        );
        assert_eq!(
            parse_line("gain album -2.5"),
            Ok(Some(ConsoleCommand::Gain(GainMode::Album, -2.5)))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse_line("dance"),
            Err(ParseError::Unknown("dance".to_string()))
        );
        assert_eq!(
            parse_line("skip"),
            Err(ParseError::MissingArgument {
                command: "skip",
                expected: "a queue position",
            })
        );
        assert_eq!(
            parse_line("seek -4"),
            Err(ParseError::InvalidValue("-4".to_string()))
        );
        assert_eq!(
            parse_line("repeat sometimes"),
            Err(ParseError::InvalidValue("sometimes".to_string()))
        );
    }

    #[test]
    fn repeat_mode_names() {
        assert_eq!(parse_repeat_mode("ALL"), Ok(RepeatMode::All));
        assert_eq!(parse_repeat_mode("track"), Ok(RepeatMode::One));
        assert!(parse_repeat_mode("loop").is_err());
    }
}
