use std::path::PathBuf;
use std::time::Instant;

use rpakit_core::header::Family;
use rpakit_core::progress::{ProgressReport, Stage};
use rpakit_core::writer::WriterOptions;
use rpakit_core::{ArchiveReader, ArchiveWriter, RpaError};

// --- CLI progress reporter ---

struct CliProgress {
    start: Instant,
    total: usize,
}

impl CliProgress {
    fn new() -> Self {
        Self { start: Instant::now(), total: 0 }
    }

    fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl ProgressReport for CliProgress {
    fn phase_start(&mut self, stage: Stage, total: usize) {
        self.total = total;
        eprintln!("[{:7.1}s] === {} ({total}) ===", self.elapsed(), stage.name());
    }

    fn task_done(&mut self, stage: Stage, current: usize, message: &str) {
        eprintln!("  [{:7.1}s] {}/{} {}  {message}", self.elapsed(), current, self.total, stage.name());
    }

    fn phase_end(&mut self, stage: Stage) {
        eprintln!("[{:7.1}s] === {} done ===", self.elapsed(), stage.name());
    }

    fn warning(&mut self, message: &str) {
        eprintln!("  [{:7.1}s] WARN: {message}", self.elapsed());
    }
}

// --- Argument parsing ---

enum Command {
    List { archive: PathBuf },
    Extract { archive: PathBuf, dest: PathBuf },
    Create { dest: PathBuf, src_dir: PathBuf, version: Family, marker: bool, force: bool },
}

fn usage(prog: &str) -> String {
    format!(
        "Usage:\n  \
         {prog} list <archive.rpa>\n  \
         {prog} extract <archive.rpa> <dest_dir>\n  \
         {prog} create <output.rpa> <src_dir> [--version 1|2|3|3.2|4] [--marker] [--force]"
    )
}

fn parse_version(tok: &str) -> Result<Family, String> {
    match tok {
        "1" => Ok(Family::V1),
        "2" => Ok(Family::V2),
        "3" => Ok(Family::V3),
        "3.2" => Ok(Family::V3_2),
        "4" => Ok(Family::V4),
        other => Err(format!("unrecognised --version {other:?}")),
    }
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("rpakit").to_string();
    let rest = &args[1..];

    match rest.first().map(String::as_str) {
        Some("list") => {
            let archive = rest.get(1).ok_or_else(|| usage(&prog))?;
            Ok(Command::List { archive: PathBuf::from(archive) })
        }
        Some("extract") => {
            let archive = rest.get(1).ok_or_else(|| usage(&prog))?;
            let dest = rest.get(2).ok_or_else(|| usage(&prog))?;
            Ok(Command::Extract { archive: PathBuf::from(archive), dest: PathBuf::from(dest) })
        }
        Some("create") => {
            let dest = rest.get(1).ok_or_else(|| usage(&prog))?;
            let src_dir = rest.get(2).ok_or_else(|| usage(&prog))?;
            let mut version = Family::V3;
            let mut marker = false;
            let mut force = false;
            let mut i = 3;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--version" => {
                        i += 1;
                        let tok = rest.get(i).ok_or("--version needs an argument")?;
                        version = parse_version(tok)?;
                    }
                    "--marker" => marker = true,
                    "--force" => force = true,
                    other => return Err(format!("unknown flag: {other}")),
                }
                i += 1;
            }
            Ok(Command::Create { dest: PathBuf::from(dest), src_dir: PathBuf::from(src_dir), version, marker, force })
        }
        _ => Err(usage(&prog)),
    }
}

fn run(command: Command) -> Result<(), RpaError> {
    match command {
        Command::List { archive } => {
            let reader = ArchiveReader::open(&archive)?;
            for path in reader.list_paths()? {
                println!("{path}");
            }
            Ok(())
        }
        Command::Extract { archive, dest } => {
            let reader = ArchiveReader::open(&archive)?;
            let mut progress = CliProgress::new();
            let summary = reader.extract_all(&dest, None, &mut progress)?;
            eprintln!("extracted {} member(s), {} failure(s)", summary.extracted, summary.failures.len());
            Ok(())
        }
        Command::Create { dest, src_dir, version, marker, force } => {
            let options = WriterOptions { version, marker, force, ..WriterOptions::default() };
            ArchiveWriter::create_from_dir(&dest, &src_dir, &options)
        }
    }
}

fn main() {
    let command = match parse_args() {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(64);
        }
    };

    if let Err(err) = run(command) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}
