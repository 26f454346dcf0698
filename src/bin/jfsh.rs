//! jfsh - interactive shell over an in-memory jumbo file system.
//!
//! Usage:
//!   jfsh                      # 1024-block disk, commands from stdin
//!   jfsh -b 64 -vv < script   # tiny disk, trace logging

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use jumbo::{BlockDevice, FileSystem, RamDisk, BLOCK_SIZE};
use log::{LevelFilter, Log, Metadata, Record};

#[derive(Parser)]
#[command(name = "jfsh")]
#[command(about = "Interactive shell for the jumbo file system")]
struct Args {
    /// Number of blocks on the in-memory disk
    #[arg(short, long, default_value_t = 1024)]
    blocks: usize,

    /// Name the disk is mounted under
    #[arg(short, long, default_value = "DISK")]
    label: String,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

const HELP: &str = "\
commands:
  mkdir <name>         create a directory
  cd [name]            enter a directory, or the root without a name
  ls                   list the current directory
  rmdir <name>         remove an empty directory
  touch <name>         create an empty file
  rm <name>            remove a file
  stat <name>          show entry details
  write <name> <text>  append text to a file
  cat <name>           print a file
  tree                 print the whole hierarchy
  df                   show free blocks
  exit                 unmount and quit";

fn main() {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    let disk = match RamDisk::try_new(args.blocks) {
        Ok(disk) => Arc::new(disk),
        Err(e) => {
            eprintln!("jfsh: --blocks: {}", e);
            std::process::exit(2);
        }
    };
    let mut fs = match FileSystem::mount(disk, &args.label) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("jfsh: mount failed: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("{}> ", fs.current_dir());
        if let Err(e) = stdout.flush() {
            eprintln!("jfsh: {}", e);
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("jfsh: {}", e);
                break;
            }
        }
        let line = line.trim_end_matches(['\n', '\r']);
        match run(&mut fs, line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io() => eprintln!("jfsh: device error: {}", e),
            Err(e) => println!("error: {}", e),
        }
    }

    if let Err(e) = fs.unmount() {
        eprintln!("jfsh: unmount failed: {}", e);
        std::process::exit(1);
    }
}

/// Runs one command line. Returns `Ok(false)` when the shell should exit.
fn run<D: BlockDevice>(fs: &mut FileSystem<D>, line: &str) -> jumbo::Result<bool> {
    let line = line.trim_start();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let arg = rest.trim();
    match cmd {
        "" => {}
        "mkdir" => fs.mkdir(arg)?,
        "cd" => fs.chdir((!arg.is_empty()).then_some(arg))?,
        "ls" => {
            let listing = fs.ls()?;
            for dir in &listing.directories {
                println!("{}/", dir);
            }
            for file in &listing.files {
                println!("{}", file);
            }
        }
        "rmdir" => fs.rmdir(arg)?,
        "touch" => fs.creat(arg)?,
        "rm" => fs.remove(arg)?,
        "stat" => {
            let stat = fs.stat(arg)?;
            if stat.is_dir() {
                println!("{}: directory, block {}", stat.name, stat.block_num);
            } else {
                println!(
                    "{}: file, block {}, {} bytes in {} blocks",
                    stat.name, stat.block_num, stat.file_size, stat.num_data_blocks
                );
            }
        }
        "write" => {
            let (name, text) = rest.trim_start().split_once(' ').unwrap_or((arg, ""));
            fs.write(name, text.as_bytes())?;
        }
        "cat" => {
            let mut buf = vec![0u8; fs.stat(arg)?.file_size as usize];
            let n = fs.read(arg, &mut buf)?;
            println!("{}", String::from_utf8_lossy(&buf[..n]));
        }
        "tree" => print!("{}", fs.tree()?),
        "df" => {
            let free = fs.free_blocks();
            println!("{} free blocks ({} bytes)", free, free * BLOCK_SIZE);
        }
        "help" => println!("{}", HELP),
        "exit" | "quit" => return Ok(false),
        other => println!("unknown command {:?}, try `help`", other),
    }
    Ok(true)
}
