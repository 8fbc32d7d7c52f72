// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, Level};

use scoreplay::archive::{Archive, ImportOptions};
use scoreplay::config::Settings;
use scoreplay::model::{display_name, part_name_from_path, Score, ScoreDraft, ScoreId};
use scoreplay::notice::NoticeBoard;
use scoreplay::playback::{format_time, PlaybackController, PlaybackMode, TrackLoader};
use scoreplay::storage::{JsonPersistence, LocalFileStorage, ScoreStore, StorageError};

fn print_usage() {
    println!("scoreplay - Sheet-music library and multi-part player");
    println!();
    println!("Usage: scoreplay [--config <FILE>] [--verbose] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --list                          List scores by last opened");
    println!("  --add <NAME> <MIX> <FILES>...   Add a score: full mix, then PDF and audio parts");
    println!("  --delete <SCORE>                Delete a score and its files");
    println!("  --export <SCORE> [DIR]          Write a score bundle (default: current dir)");
    println!("  --import <BUNDLE>               Add a score from a bundle");
    println!("  --play <SCORE>                  Open a score in the interactive player");
    println!("  --help                          Show this help message");
    println!();
    println!("SCORE is a list number or a score id. A blank NAME (\"\") uses the first PDF part name.");
}

fn print_session_help() {
    println!("Commands:");
    println!("  play | stop | toggle     Transport");
    println!("  loop                     Start looping from the loop start, or stop looping");
    println!("  seek <TIME>              Jump to TIME (seconds or mm:ss)");
    println!("  rate <R>                 Playback rate 0.5 - 1.5");
    println!("  range <START> <END>      Loop region");
    println!("  part <N> on|off          Switch a part for the next start");
    println!("  all on|off               Switch every part");
    println!("  parts | status           Show parts or transport");
    println!("  quit                     Close the player");
}

/// Application state shared by every command
struct App {
    settings: Settings,
    storage: LocalFileStorage,
    store: ScoreStore,
    archive: Archive,
}

impl App {
    fn open(settings: Settings) -> Result<Self> {
        let root = settings.storage.root.clone();
        let storage = LocalFileStorage::open(&root)
            .with_context(|| format!("Failed to open storage at {:?}", root))?;
        let persistence = JsonPersistence::new(settings.storage.library_path(), &root);
        let store = ScoreStore::open(Box::new(persistence), settings.storage.save_policy)
            .context("Failed to load the score library")?;
        let archive = Archive::new(root.join(".staging"));
        Ok(Self {
            settings,
            storage,
            store,
            archive,
        })
    }

    /// Find a score by 1-based list number or by id
    fn find(&self, key: &str) -> Result<Score> {
        let found = match key.parse::<usize>() {
            Ok(n) if n >= 1 => self.store.scores().get(n - 1),
            _ => ScoreId::parse(key).and_then(|id| self.store.get(id)),
        };
        found
            .cloned()
            .ok_or_else(|| anyhow!("No score matches '{}'", key))
    }

    fn list(&self) {
        if self.store.is_empty() {
            println!("No scores yet. Add one with --add or --import.");
            return;
        }
        let number = |score: &Score| {
            self.store
                .scores()
                .iter()
                .position(|s| s.id == score.id)
                .map(|i| i + 1)
                .unwrap_or(0)
        };
        for (group, scores) in self.store.grouped_by_recency(Utc::now()) {
            println!("{}", group.label());
            for score in scores {
                println!(
                    "  {:>3}. {}  ({} PDF, {} audio{})  {}",
                    number(score),
                    score.name,
                    score.pdf_parts.len(),
                    score.mp3_parts.len(),
                    if score.full_mix.is_some() { ", full mix" } else { "" },
                    score.id
                );
            }
        }
    }

    fn add(&mut self, name: &str, mix: &Path, files: &[PathBuf]) -> Result<String> {
        let mut draft = ScoreDraft::new(name);
        let assembled = attach_files(&mut draft, &self.storage, mix, files)
            .map_err(anyhow::Error::from)
            .and_then(|()| draft.validate().map_err(anyhow::Error::from));
        if let Err(e) = assembled {
            // Nothing will refer to the copies
            draft.discard_files(&self.storage);
            return Err(e);
        }

        let score = draft.build()?;
        let message = format!("Added '{}'", score.name);
        self.store.append(score)?;
        self.store.save()?;
        Ok(message)
    }

    fn delete(&mut self, key: &str) -> Result<String> {
        let score = self.find(key)?;
        self.store.delete_score(score.id, &self.storage)?;
        self.store.save()?;
        Ok(format!("Deleted '{}'", score.name))
    }

    fn export(&self, key: &str, out_dir: &Path) -> Result<String> {
        let score = self.find(key)?;
        let bundle = self.archive.export_score(&score, out_dir)?;
        Ok(format!("Exported '{}' to {}", score.name, bundle.display()))
    }

    fn import(&mut self, bundle: &Path) -> Result<String> {
        let score = self
            .archive
            .import_bundle(bundle, &self.storage, ImportOptions::default())?;
        let message = format!("Imported '{}'", score.name);
        self.store.append(score)?;
        self.store.save()?;
        Ok(message)
    }

    async fn play(&mut self, key: &str) -> Result<()> {
        let score = self.find(key)?;
        self.store.mark_opened(score.id, Utc::now())?;

        let loader = track_loader();
        let mut player =
            PlaybackController::open(&score, loader.as_ref(), self.settings.playback.clone());
        let mut notices = NoticeBoard::from_settings(&self.settings.notices);

        println!("{} ({})", score.name, format_time(player.duration()));
        print_parts(&player);
        println!("Type 'help' for commands.");

        let mut interval = tokio::time::interval(player.poll_interval());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut last_mode = player.mode();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    player.tick();
                    if player.mode() != last_mode && player.mode() == PlaybackMode::Stopped {
                        println!("Stopped at {}", format_time(player.position()));
                    }
                    last_mode = player.mode();
                    notices.expire(Instant::now());
                    self.store.flush_due(Instant::now())?;
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read command")? else {
                        break;
                    };
                    match session_command(&mut player, line.trim()) {
                        Ok(SessionStep::Continue) => {}
                        Ok(SessionStep::Quit) => break,
                        Err(e) => {
                            notices.failure(e.to_string());
                            if let Some(notice) = notices.visible_at(Instant::now()) {
                                println!("{}", notice);
                            }
                        }
                    }
                    last_mode = player.mode();
                }
            }
        }

        player.close();
        self.store.save()?;
        Ok(())
    }
}

/// Full mix first, then each file as a PDF or audio part by extension
fn attach_files(
    draft: &mut ScoreDraft,
    storage: &LocalFileStorage,
    mix: &Path,
    files: &[PathBuf],
) -> Result<(), StorageError> {
    draft.attach_full_mix(storage, mix)?;
    for file in files {
        let is_pdf = file
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        let part_name = part_name_from_path(file);
        if is_pdf {
            draft.attach_pdf(storage, file, &part_name)?;
        } else {
            draft.attach_mp3(storage, file, &part_name)?;
        }
    }
    Ok(())
}

#[cfg(feature = "device-output")]
fn track_loader() -> Box<dyn TrackLoader> {
    Box::new(scoreplay::audio::DeviceTrackLoader)
}

#[cfg(not(feature = "device-output"))]
fn track_loader() -> Box<dyn TrackLoader> {
    Box::new(scoreplay::audio::SilentTrackLoader::new())
}

enum SessionStep {
    Continue,
    Quit,
}

fn session_command(player: &mut PlaybackController, line: &str) -> Result<SessionStep> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Ok(SessionStep::Continue);
    };

    match command {
        "play" => {
            if !player.play() {
                bail!("Nothing to play: enable a part first");
            }
        }
        "stop" => {
            player.stop();
        }
        "toggle" => {
            if !player.toggle_play() {
                bail!("Nothing to play: enable a part first");
            }
        }
        "loop" => {
            let was_looping = player.mode() == PlaybackMode::Looping;
            if !player.toggle_loop() && !was_looping {
                bail!("Nothing to loop: enable a part first");
            }
        }
        "seek" => {
            let t = parse_time(args.first().copied().unwrap_or(""))?;
            if !player.seek(t) {
                bail!("{} is outside 00:00 - {}", format_time(t), format_time(player.duration()));
            }
        }
        "rate" => {
            let r: f64 = args
                .first()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("Usage: rate <R>"))?;
            println!("Rate {:.1}x", player.set_rate(r));
        }
        "range" => {
            let (Some(start), Some(end)) = (args.first(), args.get(1)) else {
                bail!("Usage: range <START> <END>");
            };
            player.set_loop_region(parse_time(start)?, parse_time(end)?);
            println!(
                "Loop {} - {}",
                format_time(player.loop_start()),
                format_time(player.loop_end())
            );
        }
        "part" => {
            let index: usize = args
                .first()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| anyhow!("Usage: part <N> on|off"))?;
            let enabled = parse_switch(args.get(1).copied())?;
            let id = player
                .tracks()
                .parts()
                .get(index.wrapping_sub(1))
                .map(|slot| slot.id())
                .ok_or_else(|| anyhow!("No part {}", index))?;
            player.set_part_enabled(id, enabled);
            print_parts(player);
        }
        "all" => {
            player.set_all_parts_enabled(parse_switch(args.first().copied())?);
            print_parts(player);
        }
        "parts" => print_parts(player),
        "status" => {
            let snap = player.snapshot();
            println!(
                "{:?} {} / {}  rate {:.1}x  loop {} - {}",
                snap.mode,
                format_time(snap.position),
                format_time(snap.duration),
                snap.rate,
                format_time(snap.loop_start),
                format_time(snap.loop_end)
            );
        }
        "help" => print_session_help(),
        "quit" | "exit" => return Ok(SessionStep::Quit),
        other => bail!("Unknown command: {}", other),
    }
    Ok(SessionStep::Continue)
}

fn print_parts(player: &PlaybackController) {
    for (i, slot) in player.tracks().parts().iter().enumerate() {
        let stem = slot
            .file()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "  {}. [{}] {} ({}){}",
            i + 1,
            if slot.is_enabled() { "x" } else { " " },
            slot.name(),
            display_name(&stem),
            if slot.is_loaded() { "" } else { "  unavailable" }
        );
    }
}

fn parse_switch(word: Option<&str>) -> Result<bool> {
    match word {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("Expected on or off"),
    }
}

/// Seconds from `90`, `90.5` or `1:30`
fn parse_time(text: &str) -> Result<f64> {
    let parsed = match text.split_once(':') {
        Some((m, s)) => m
            .parse::<u64>()
            .ok()
            .zip(s.parse::<f64>().ok())
            .map(|(m, s)| m as f64 * 60.0 + s),
        None => text.parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| anyhow!("Invalid time: '{}'", text))
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path = Settings::default_path();
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if pos + 1 >= args.len() {
            eprintln!("Error: --config requires a file");
            std::process::exit(1);
        }
        config_path = PathBuf::from(args.remove(pos + 1));
        args.remove(pos);
    }
    let verbose = match args.iter().position(|a| a == "--verbose" || a == "-v") {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    };

    let settings = Settings::load_or_default(&config_path)?;
    let level = if verbose {
        Level::DEBUG
    } else {
        settings.logging.level()?
    };
    init_logging(level);
    debug!("Settings from {:?}", config_path);

    let Some(command) = args.first().cloned() else {
        println!("scoreplay - Sheet-music library and multi-part player");
        println!("Run with --help for usage information");
        return Ok(());
    };
    if command == "--help" || command == "-h" {
        print_usage();
        return Ok(());
    }

    let mut app = App::open(settings)?;
    let mut notices = NoticeBoard::from_settings(&app.settings.notices);

    let outcome = match command.as_str() {
        "--list" => {
            app.list();
            return Ok(());
        }
        "--play" => {
            let key = require(&args, 1, "--play requires a score")?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start runtime")?;
            return runtime.block_on(app.play(&key));
        }
        "--add" => {
            if args.len() < 4 {
                Err(anyhow!("--add requires a name, a full mix, and at least one PDF and one audio part"))
            } else {
                let files: Vec<PathBuf> = args[3..].iter().map(PathBuf::from).collect();
                app.add(&args[1], Path::new(&args[2]), &files)
            }
        }
        "--delete" => require(&args, 1, "--delete requires a score").and_then(|key| app.delete(&key)),
        "--export" => require(&args, 1, "--export requires a score").and_then(|key| {
            let out_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            app.export(&key, &out_dir)
        }),
        "--import" => require(&args, 1, "--import requires a bundle file")
            .and_then(|bundle| app.import(Path::new(&bundle))),
        other => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    let failed = outcome.is_err();
    match outcome {
        Ok(message) => notices.success(message),
        Err(e) => notices.failure(format!("{:#}", e)),
    }
    if let Some(notice) = notices.visible_at(Instant::now()) {
        println!("{}", notice);
    }
    if failed {
        drop(app);
        std::process::exit(1);
    }
    Ok(())
}

fn require(args: &[String], index: usize, message: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow!(message.to_string()))
}
