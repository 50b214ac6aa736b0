// Console - Line commands controlling a running pattern engine

use crate::sequencer::{GridShape, PatternEngine, TrackWindow};
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  start               start playback (first bar plays the templates)
  stop                stop playback
  bpm N               set the tempo (applies at the next bar)
  on ID | off ID      enable / disable a track from the next bar
  toggle ID I         flip tick I of a track's next bar
  show [ID]           print the rolling window of one or all tracks
  tick                print the tick counter
  help                this text
  quit                stop and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Bpm(f32),
    Enable(String),
    Disable(String),
    Toggle { track: String, index: usize },
    Show(Option<String>),
    Tick,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = words.collect();

        let expect_args = |count: usize| {
            if args.len() == count {
                Ok(())
            } else {
                Err(format!("'{}' takes {} argument(s)", name, count))
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "start" | "play" => expect_args(0).map(|_| ConsoleCommand::Start),
            "stop" => expect_args(0).map(|_| ConsoleCommand::Stop),
            "bpm" | "tempo" => {
                expect_args(1)?;
                args[0]
                    .parse::<f32>()
                    .map(ConsoleCommand::Bpm)
                    .map_err(|_| format!("invalid tempo '{}'", args[0]))
            }
            "on" => expect_args(1).map(|_| ConsoleCommand::Enable(args[0].to_string())),
            "off" => expect_args(1).map(|_| ConsoleCommand::Disable(args[0].to_string())),
            "toggle" => {
                expect_args(2)?;
                let index = args[1]
                    .parse::<usize>()
                    .map_err(|_| format!("invalid tick index '{}'", args[1]))?;
                Ok(ConsoleCommand::Toggle {
                    track: args[0].to_string(),
                    index,
                })
            }
            "show" => match args.as_slice() {
                [] => Ok(ConsoleCommand::Show(None)),
                [id] => Ok(ConsoleCommand::Show(Some(id.to_string()))),
                _ => Err("'show' takes at most 1 argument".to_string()),
            },
            "tick" => expect_args(0).map(|_| ConsoleCommand::Tick),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

/// Apply a command; returns the text to print
pub fn execute(engine: &PatternEngine, command: &ConsoleCommand) -> String {
    match command {
        ConsoleCommand::Start => match engine.start() {
            Ok(()) => format!("playing at {:.1} BPM", engine.active_bpm()),
            Err(e) => format!("cannot start: {}", e),
        },
        ConsoleCommand::Stop => {
            engine.stop();
            format!("stopped at tick {}", engine.current_tick())
        }
        ConsoleCommand::Bpm(bpm) => {
            let stored = engine.set_bpm(*bpm);
            if engine.is_running() {
                format!("tempo {:.1} BPM from the next bar", stored)
            } else {
                format!("tempo {:.1} BPM", stored)
            }
        }
        ConsoleCommand::Enable(id) | ConsoleCommand::Disable(id) => {
            let enable = matches!(command, ConsoleCommand::Enable(_));
            if engine.set_enabled(id, enable) {
                format!("{} {} from the next bar", id, if enable { "on" } else { "off" })
            } else {
                format!("unknown track '{}'", id)
            }
        }
        ConsoleCommand::Toggle { track, index } => {
            if engine.toggle_next_bar_tick(track, *index) {
                format!("{} tick {} toggled in the next bar", track, index)
            } else if engine.is_enabled(track) {
                format!("tick {} is outside the {}-tick bar", index, engine.grid_shape().grid_len())
            } else if engine.track_ids().contains(&track.as_str()) {
                format!("{} is off: tick {} toggled in its pattern", track, index)
            } else {
                format!("unknown track '{}'", track)
            }
        }
        ConsoleCommand::Show(Some(id)) => {
            if engine.track_ids().contains(&id.as_str()) {
                format_window(id, &engine.window_for_instrument(id), engine.grid_shape())
            } else {
                format!("unknown track '{}'", id)
            }
        }
        ConsoleCommand::Show(None) => format_grid(engine),
        ConsoleCommand::Tick => {
            let tick = engine.current_tick();
            let shape = engine.grid_shape();
            format!(
                "tick {} (bar {}, step {})",
                tick,
                shape.bar_index(tick) + 1,
                shape.tick_in_bar(tick) + 1
            )
        }
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => {
            engine.stop();
            "bye".to_string()
        }
    }
}

/// Every track's window, one line each
pub fn format_grid(engine: &PatternEngine) -> String {
    let shape = engine.grid_shape();
    let ids = engine.track_ids();
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format_window(id, &engine.window_for_instrument(id), shape));
    }
    out
}

/// `kick    x... x... x... x... > x... x... x... x...`
///
/// Left of `>` the last bar's worth of ticks, right of it what plays next.
pub fn format_window(id: &str, window: &TrackWindow, shape: GridShape) -> String {
    let per_beat = shape.ticks_per_beat() as usize;
    let mut out = format!("{:<8}", id);

    for (i, &hit) in window.ticks.iter().enumerate() {
        if i == window.center_index {
            out.push_str(" > ");
        } else if i > 0 && i % per_beat == 0 {
            out.push(' ');
        }
        out.push(if hit { 'x' } else { '.' });
    }
    if window.ticks.is_empty() {
        out.push_str("(no data)");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::CaptureSink;
    use crate::kit::KitConfig;
    use std::sync::Arc;

    fn engine() -> PatternEngine {
        let sink = Arc::new(CaptureSink::new(44100.0));
        KitConfig::default().build_engine(sink, Some(3)).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Start));
        assert_eq!("BPM 140".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Bpm(140.0)));
        assert_eq!(
            "toggle kick 3".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Toggle {
                track: "kick".to_string(),
                index: 3
            })
        );
        assert_eq!("show".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Show(None)));
        assert_eq!(
            "show  snare ".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Show(Some("snare".to_string())))
        );
        assert_eq!("q".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ConsoleCommand>().is_err());
        assert!("bpm fast".parse::<ConsoleCommand>().is_err());
        assert!("toggle kick".parse::<ConsoleCommand>().is_err());
        assert!("toggle kick -1".parse::<ConsoleCommand>().is_err());
        assert!("dance".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_format_window_marks_cursor() {
        let shape = GridShape::new(2, 2).unwrap();
        let window = TrackWindow {
            ticks: vec![true, false, false, false, true, false, true, false],
            center_index: 4,
        };
        assert_eq!(format_window("kick", &window, shape), "kick    x. .. > x. x.");
    }

    #[test]
    fn test_execute_edits() {
        let engine = engine();

        let out = execute(&engine, &ConsoleCommand::Toggle {
            track: "kick".to_string(),
            index: 1,
        });
        assert!(out.contains("toggled in the next bar"));
        let template = engine.template_for_instrument("kick").unwrap();
        assert!(template.get(1).unwrap());

        let out = execute(&engine, &ConsoleCommand::Disable("snare".to_string()));
        assert_eq!(out, "snare off from the next bar");
        assert!(!engine.is_enabled("snare"));

        let out = execute(&engine, &ConsoleCommand::Enable("cowbell".to_string()));
        assert_eq!(out, "unknown track 'cowbell'");

        let out = execute(&engine, &ConsoleCommand::Bpm(999.0));
        assert_eq!(out, "tempo 300.0 BPM");
    }

    #[test]
    fn test_show_all_tracks() {
        let engine = engine();
        let grid = format_grid(&engine);
        assert_eq!(grid.lines().count(), 3);
        assert!(grid.starts_with("kick"));
    }
}
