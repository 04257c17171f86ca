//! concert CLI: play a stream or file and control it from stdin.
//!
//! Commands:
//!   concert play <locator> [flags]   Play, then read control commands
//!   concert probe <url>              Run the reachability gate on a URL
//!   concert info <file>              Print the track read from file tags
//!
//! Play flags: --title T --duration S --thumbnail U --playedby P --config FILE

use std::io::{BufRead, Write};
use std::path::Path;

use concert_core::effects::http::HttpProbe;
use concert_core::effects::tags;
use concert_core::models::track::file_path;
use concert_core::{Controller, ControllerConfig, LocatorKind, Reachability, Retry, Track};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return;
    }

    match args[0].as_str() {
        "play" => cmd_play(&args[1..]),
        "probe" => cmd_probe(&args[1..]),
        "info" => cmd_info(&args[1..]),
        other => {
            eprintln!("unknown command: {}", other);
            print_usage();
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PlayArgs {
    locator: String,
    title: Option<String>,
    duration: Option<u64>,
    thumbnail: Option<String>,
    playedby: Option<String>,
    config: Option<String>,
}

fn parse_play_args(args: &[String]) -> Result<PlayArgs, String> {
    let mut parsed = PlayArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = || iter.next().cloned().ok_or(format!("missing value for {}", arg));
        match arg.as_str() {
            "--title" => parsed.title = Some(value()?),
            "--duration" => {
                let raw = value()?;
                parsed.duration = Some(raw.parse().map_err(|_| format!("bad duration: {}", raw))?);
            }
            "--thumbnail" => parsed.thumbnail = Some(value()?),
            "--playedby" => parsed.playedby = Some(value()?),
            "--config" => parsed.config = Some(value()?),
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
            locator if parsed.locator.is_empty() => parsed.locator = locator.to_string(),
            extra => return Err(format!("unexpected argument: {}", extra)),
        }
    }
    if parsed.locator.is_empty() {
        return Err("usage: concert play <locator> [flags]".into());
    }
    Ok(parsed)
}

/// Tags fill whatever the flags leave out for local files.
fn build_track(args: &PlayArgs) -> Track {
    let playedby = args.playedby.clone().unwrap_or_default();
    let local = Path::new(file_path(&args.locator));
    let base = match LocatorKind::of(&args.locator) {
        LocatorKind::File if local.is_file() => Track {
            stream: args.locator.clone(),
            ..tags::read_track(local, &playedby)
        },
        _ => Track::new(args.locator.clone(), args.locator.clone(), 0).with_playedby(playedby),
    };
    Track {
        title: args.title.clone().unwrap_or(base.title),
        duration: args.duration.unwrap_or(base.duration),
        thumbnail: args.thumbnail.clone().unwrap_or(base.thumbnail),
        ..base
    }
}

fn load_config(path: Option<&str>) -> ControllerConfig {
    let loaded = match path {
        Some(p) => ControllerConfig::load(p),
        None => ControllerConfig::from_env(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("config error: {}", e);
        std::process::exit(1);
    })
}

fn cmd_play(args: &[String]) {
    let args = match parse_play_args(args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    let controller = Controller::new(load_config(args.config.as_deref()));
    let track = build_track(&args);

    print_json(&controller.play(&track).to_value());
    repl(&controller);
}

/// Read control commands from stdin until `quit` or EOF.
fn repl(controller: &Controller) {
    let stdin = std::io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => {}
            (Some("quit" | "exit"), _) => break,
            (Some("pause"), _) => print_json(&controller.pause().to_value()),
            (Some("stop"), _) => print_json(&to_json(&controller.stop())),
            (Some("status"), _) => {
                let state = controller.cur_state();
                print_json(&to_json(&state));
                if let (Some(title), Some(pos)) = (state.current_track(), state.current_time()) {
                    print_progress(title, pos.max(0) as u64, state.duration().max(0) as u64 * 1000, state.volume);
                }
            }
            (Some("volume"), Some(v)) => match v.parse::<i32>() {
                Ok(v) => print_json(&to_json(&controller.set_volume(v))),
                Err(_) => eprintln!("usage: volume <n>"),
            },
            (Some("seek"), Some(p)) => match p.parse::<f64>() {
                Ok(p) => print_json(&controller.set_time(p).to_value()),
                Err(_) => eprintln!("usage: seek <0..1>"),
            },
            (Some("play"), Some(locator)) => {
                let track = build_track(&PlayArgs {
                    locator: locator.to_string(),
                    ..PlayArgs::default()
                });
                print_json(&controller.play(&track).to_value());
            }
            (Some(other), _) => eprintln!("unknown command: {} (pause, stop, status, volume, seek, play, quit)", other),
        }
        prompt();
    }
    controller.stop();
}

fn cmd_probe(args: &[String]) {
    let Some(url) = args.first() else {
        eprintln!("usage: concert probe <url>");
        return;
    };
    let config = load_config(None);
    let probe = HttpProbe::new();
    let timeout = config.network_attempt_timeout();
    let outcome = Retry::new(config.max_network_pings)
        .deadline(config.network_deadline())
        .run(|_| probe.ping(url, timeout));

    if outcome.succeeded() {
        println!("reachable: {} ({} attempt(s))", url, outcome.attempts());
    } else {
        println!("unreachable: {} ({} attempt(s))", url, outcome.attempts());
        std::process::exit(2);
    }
}

fn cmd_info(args: &[String]) {
    let Some(file) = args.first() else {
        eprintln!("usage: concert info <file>");
        return;
    };
    let path = Path::new(file);
    if !path.is_file() {
        eprintln!("not a file: {}", file);
        return;
    }
    print_json(&to_json(&tags::read_track(path, "")));
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("failed to encode status: {}", e),
    }
}

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}

fn print_progress(title: &str, pos_ms: u64, dur_ms: u64, vol: i32) {
    let bar_width = 30;
    let filled = if dur_ms > 0 {
        (((pos_ms as f64 / dur_ms as f64) * bar_width as f64) as usize).min(bar_width)
    } else {
        0
    };
    println!(
        "  {}  [{}{}] {} / {}  vol: {}%",
        title,
        "=".repeat(filled),
        " ".repeat(bar_width - filled),
        fmt_time(pos_ms),
        fmt_time(dur_ms),
        vol,
    );
}

fn fmt_time(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_usage() {
    println!("concert - stream player");
    println!();
    println!("usage: concert <command> [args]");
    println!();
    println!("commands:");
    println!("  play <locator> [flags]   Play a URL or file, then read commands from stdin");
    println!("  probe <url>              Check that a stream answers");
    println!("  info <file>              Show the track read from a file's tags");
    println!();
    println!("play flags:");
    println!("  --title T  --duration S  --thumbnail U  --playedby P  --config FILE");
    println!();
    println!("stdin commands: pause, stop, status, volume <n>, seek <0..1>, play <locator>, quit");
}
