//! pianofall - A terminal MIDI player with a falling-note piano roll.
//!
//! Plays a Standard MIDI File through a SoundFont piano while notes fall
//! onto an 88-key keyboard drawn in the terminal.
//!
//! # Usage
//!
//! ```bash
//! pianofall song.mid --soundfont piano.sf2
//! pianofall song.mid --info          # Print the parsed timeline and exit
//! ```

use pianofall::app::App;
use pianofall::config::PlayerConfig;
use pianofall::midi::Timeline;
use pianofall::ui;

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};

/// Command-line options for the application.
#[derive(Debug, Default)]
struct CliOptions {
    /// The MIDI file to play.
    midi_file: Option<PathBuf>,
    /// Path to a SoundFont file.
    soundfont: Option<PathBuf>,
    /// Initial speed multiplier, overriding the config.
    speed: Option<f64>,
    /// Initial master volume, overriding the config.
    volume: Option<f64>,
    /// JSON config file.
    config: Option<PathBuf>,
    /// Print the timeline summary instead of playing.
    info: bool,
    /// With `--info`, print every note as JSON.
    json: bool,
}

fn print_usage(program: &str) {
    eprintln!("pianofall - Terminal MIDI player");
    eprintln!();
    eprintln!("Usage: {} <FILE.mid> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -sf, --soundfont PATH  SoundFont file (.sf2) used for playback");
    eprintln!("  --speed X              Initial speed multiplier (0.25-3.0)");
    eprintln!("  --volume V             Initial master volume (0.0-2.0)");
    eprintln!("  -c, --config PATH      JSON config file");
    eprintln!("  --info                 Print the parsed timeline and exit");
    eprintln!("  --json                 With --info, print the notes as JSON");
    eprintln!("  -h, --help             Print this help message");
}

impl CliOptions {
    /// Parses command-line arguments (without the program name).
    ///
    /// A `.sf2` positional argument is taken as the SoundFont; any other
    /// positional argument is the MIDI file.
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--soundfont" | "-sf" => {
                    options.soundfont = Some(PathBuf::from(required(&mut args, &arg)?));
                }
                "--speed" => {
                    let value = required(&mut args, &arg)?;
                    options.speed = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid --speed value: {}", value))?,
                    );
                }
                "--volume" => {
                    let value = required(&mut args, &arg)?;
                    options.volume = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid --volume value: {}", value))?,
                    );
                }
                "--config" | "-c" => {
                    options.config = Some(PathBuf::from(required(&mut args, &arg)?));
                }
                "--info" => options.info = true,
                "--json" => options.json = true,
                other if other.starts_with('-') => bail!("Unknown option: {}", other),
                other if other.ends_with(".sf2") => {
                    options.soundfont = Some(PathBuf::from(other));
                }
                other => {
                    if options.midi_file.is_some() {
                        bail!("Only one MIDI file can be played at a time");
                    }
                    options.midi_file = Some(PathBuf::from(other));
                }
            }
        }

        Ok(options)
    }

    /// Loads the config file (or defaults) and applies command-line overrides.
    fn player_config(&self) -> Result<PlayerConfig> {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::load(path)?,
            None => PlayerConfig::default(),
        };
        if let Some(speed) = self.speed {
            config.speed = config.clamp_speed(speed);
        }
        if let Some(volume) = self.volume {
            config.volume = volume.clamp(0.0, 2.0);
        }
        Ok(config)
    }
}

/// Takes the value following a flag.
fn required<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} requires an argument", flag))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "pianofall".into());
    if args.iter().skip(1).any(|a| a == "--help" || a == "-h") {
        print_usage(&program);
        return Ok(());
    }

    let cli = match CliOptions::parse(args.into_iter().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };
    let Some(midi_file) = cli.midi_file.clone() else {
        print_usage(&program);
        std::process::exit(1);
    };

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.player_config().context("Failed to load configuration")?;

    if cli.info {
        return print_info(&midi_file, cli.json);
    }

    if let Some(sf_path) = &cli.soundfont {
        if !sf_path.exists() {
            eprintln!(
                "Warning: Specified soundfont not found: {}",
                sf_path.display()
            );
        }
    }

    let mut app = App::new(midi_file, cli.soundfont.clone(), config);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    // Handle any errors from the main loop
    result
}

/// Prints what the parser made of a file, without audio or terminal UI.
fn print_info(path: &Path, json: bool) -> Result<()> {
    let timeline = Timeline::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    if json {
        let text =
            serde_json::to_string_pretty(&timeline).context("Failed to serialize timeline")?;
        println!("{}", text);
        return Ok(());
    }

    println!("File:      {}", path.display());
    if let Some(header) = timeline.header() {
        println!("Format:    {}", header.format);
        println!("Tracks:    {}", header.track_count);
        println!("Division:  {} ticks/quarter", header.ticks_per_quarter);
    }
    if let Some(tempo_map) = timeline.tempo_map() {
        println!(
            "Tempo:     {:.1} BPM at start, {} tempo entries",
            tempo_map.bpm_at(0),
            tempo_map.len()
        );
    }
    println!("Notes:     {}", timeline.len());
    println!("Duration:  {}", ui::format_time(timeline.total_duration()));
    if let (Some(low), Some(high)) = (
        timeline.notes().iter().map(|n| n.pitch).min(),
        timeline.notes().iter().map(|n| n.pitch).max(),
    ) {
        println!(
            "Range:     {} - {}",
            pianofall::midi::note_to_name(low),
            pianofall::midi::note_to_name(high)
        );
    }
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Fire due scheduler and visual ticks
        app.update();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Block for input only until the next tick is due
        if event::poll(app.poll_timeout())? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press && handle_key(app, key.code, key.modifiers) {
                    return Ok(());
                }
            }
        }
    }
}

/// Handles a key press.
///
/// # Returns
///
/// true if the application should quit.
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    let seek_step = app.config().seek_step_seconds;
    let speed_step = app.config().speed_step;
    let volume_step = app.config().volume_step;

    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char(' ') => app.toggle_playback(),
        KeyCode::Char('s') => app.stop(),
        KeyCode::Char('r') => app.restart(),
        KeyCode::Left => app.seek_by(-seek_step),
        KeyCode::Right => app.seek_by(seek_step),
        KeyCode::Char('+') | KeyCode::Char('=') => app.change_speed(speed_step),
        KeyCode::Char('-') | KeyCode::Char('_') => app.change_speed(-speed_step),
        KeyCode::Char(']') => app.change_volume(volume_step),
        KeyCode::Char('[') => app.change_volume(-volume_step),
        KeyCode::Char('o') => {
            app.load_midi();
        }
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_all_options() {
        let cli = parse(&[
            "song.mid",
            "--soundfont",
            "piano.sf2",
            "--speed",
            "1.5",
            "--volume",
            "0.8",
            "--info",
        ])
        .unwrap();
        assert_eq!(cli.midi_file, Some(PathBuf::from("song.mid")));
        assert_eq!(cli.soundfont, Some(PathBuf::from("piano.sf2")));
        assert_eq!(cli.speed, Some(1.5));
        assert_eq!(cli.volume, Some(0.8));
        assert!(cli.info);
        assert!(!cli.json);
    }

    #[test]
    fn test_positional_soundfont() {
        let cli = parse(&["piano.sf2", "song.mid"]).unwrap();
        assert_eq!(cli.soundfont, Some(PathBuf::from("piano.sf2")));
        assert_eq!(cli.midi_file, Some(PathBuf::from("song.mid")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["song.mid", "--speed"]).is_err());
        assert!(parse(&["song.mid", "--speed", "fast"]).is_err());
        assert!(parse(&["song.mid", "--bogus"]).is_err());
        assert!(parse(&["a.mid", "b.mid"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&["song.mid", "--speed", "10", "--volume", "0.5"]).unwrap();
        let config = cli.player_config().unwrap();
        assert_eq!(config.speed, 3.0);
        assert_eq!(config.volume, 0.5);
        assert_eq!(config.seek_step_seconds, 5.0);
    }
}
