use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::io::{BufWriter, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod audio;
mod config;
mod display;
mod entity;
mod math;
mod shapes;

use audio::SoundManager;
use display::{CELL, FireworksDisplay};

fn print_usage() {
    eprintln!("nightsky - Unattended fireworks display for the terminal");
    eprintln!();
    eprintln!("Usage: nightsky [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --interval SECS  Seconds between autonomous launches (default: 4)");
    eprintln!("  --sounds DIR     Directory with optional launch/explode/crackle");
    eprintln!("                   samples (mp3 or wav); missing files fall back");
    eprintln!("                   to synthesized sound (default: sounds)");
    eprintln!("  --muted          Start with audio muted");
    eprintln!();
    eprintln!("Controls:");
    eprintln!("  Enter/l  launch now          Space  pause/resume");
    eprintln!("  m        mute/unmute         c      random/custom color");
    eprintln!("  h/H      custom hue -/+      d/D    burst duration -/+");
    eprintln!("  s/S      particle size -/+   f/F    flicker density -/+");
    eprintln!();
    eprintln!("Press 'q', ESC, or Ctrl+C to exit");
}

struct Options {
    interval: f32,
    sounds_dir: PathBuf,
    muted: bool,
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options {
        interval: 4.0,
        sounds_dir: PathBuf::from("sounds"),
        muted: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--interval" => {
                if i + 1 >= args.len() {
                    eprintln!("--interval requires a value in seconds");
                    std::process::exit(1);
                }
                match args[i + 1].parse::<f32>() {
                    Ok(secs) if secs > 0.0 => options.interval = secs,
                    _ => {
                        eprintln!("Invalid interval: {}", args[i + 1]);
                        std::process::exit(1);
                    }
                }
                i += 2;
            }
            "--sounds" => {
                if i + 1 >= args.len() {
                    eprintln!("--sounds requires a directory path");
                    std::process::exit(1);
                }
                options.sounds_dir = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--muted" => {
                options.muted = true;
                i += 1;
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return None;
            }
            arg => {
                eprintln!("Unknown option: {arg}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    Some(options)
}

fn run(options: Options) -> std::io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    let mut audio = SoundManager::new();
    audio.load_samples(&options.sounds_dir);
    audio.set_muted(options.muted);

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

    let (cols, rows) = terminal::size()?;
    let mut display = FireworksDisplay::new(
        cols as f32 * CELL,
        rows as f32 * 2.0 * CELL,
        options.interval,
        audio,
    );

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;
    const FIXED_DT: f32 = 1.0 / 60.0;

    loop {
        if event::poll(Duration::from_millis(1))? {
            match event::read()? {
                Event::Key(key_event) => match key_event.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('c')
                        if key_event.modifiers.contains(event::KeyModifiers::CONTROL) =>
                    {
                        break;
                    }
                    KeyCode::Char(' ') => {
                        let running = display.is_running();
                        display.set_running(!running);
                    }
                    KeyCode::Char('m') => display.toggle_mute(),
                    KeyCode::Enter | KeyCode::Char('l') => display.trigger_launch(),
                    KeyCode::Char('c') => display.config.toggle_hue_mode(),
                    KeyCode::Char('h') => display.config.adjust_hue(-10.0),
                    KeyCode::Char('H') => display.config.adjust_hue(10.0),
                    KeyCode::Char('d') => display.config.adjust_duration(-0.1),
                    KeyCode::Char('D') => display.config.adjust_duration(0.1),
                    KeyCode::Char('s') => display.config.adjust_size(-0.1),
                    KeyCode::Char('S') => display.config.adjust_size(0.1),
                    KeyCode::Char('f') => display.config.adjust_flicker(-0.05),
                    KeyCode::Char('F') => display.config.adjust_flicker(0.05),
                    _ => {}
                },
                Event::Resize(cols, rows) => {
                    display.resize(cols as f32 * CELL, rows as f32 * 2.0 * CELL);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {}
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            display.update(FIXED_DT);
            accumulator -= FIXED_DT;
        }

        display.render(&mut stdout)?;
    }

    execute!(stdout, Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    Ok(())
}

fn main() -> std::io::Result<()> {
    match parse_args() {
        Some(options) => run(options),
        None => Ok(()),
    }
}
