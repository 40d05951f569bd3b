//! Mock Device Binary
//!
//! Writes a synthetic copy of a flight controller's storage to disk so the
//! CLI can be exercised without hardware, including the edge cases the
//! catalog has to cope with.
//!
//! Run with: `cargo run --bin simulate -- --root ./mock_device`
//! then:     `cargo run -- --address ./mock_device list`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Parser;

use flightlog_fetcher::app::layout::RemoteLayout;
use flightlog_fetcher::constants::logs;

/// Generate a mock device tree
#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Write a mock flight controller storage tree")]
struct SimulationArgs {
    /// Directory standing in for the device root
    #[arg(short, long, default_value = "./mock_device")]
    root: PathBuf,

    /// Number of past days holding logs
    #[arg(long, default_value_t = 3)]
    days: i64,

    /// Logs written per day
    #[arg(long, default_value_t = 3)]
    logs_per_day: usize,

    /// Largest generated log in KiB
    #[arg(long, default_value_t = 512)]
    max_kib: usize,

    /// Seed for reproducible trees
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the malformed and future entries
    #[arg(long)]
    no_edge_cases: bool,
}

/// Counts of what was written
#[derive(Debug, Default)]
struct SimulationStats {
    plain: usize,
    encrypted: usize,
    keyless: usize,
    edge_cases: usize,
}

struct MockDevice {
    rng: fastrand::Rng,
    max_bytes: usize,
    log_root: PathBuf,
    stats: SimulationStats,
}

impl MockDevice {
    fn new(root: &Path, layout: &RemoteLayout, args: &SimulationArgs) -> Self {
        let storage = root.join(layout.storage_root.trim_start_matches('/'));
        Self {
            rng: args.seed.map(fastrand::Rng::with_seed).unwrap_or_else(fastrand::Rng::new),
            max_bytes: args.max_kib.max(1) * 1024,
            log_root: storage.join(&layout.log_dir),
            stats: SimulationStats::default(),
        }
    }

    fn random_time(&mut self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.rng.u32(0..24), self.rng.u32(0..60), self.rng.u32(0..60))
            .unwrap_or(NaiveTime::MIN)
    }

    fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        std::iter::repeat_with(|| self.rng.u8(..)).take(len).collect()
    }

    fn write(&mut self, dir: &Path, name: &str, len: usize) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let data = self.random_bytes(len);
        let path = dir.join(name);
        fs::write(&path, data).with_context(|| format!("writing {}", path.display()))
    }

    fn write_log(&mut self, date: NaiveDate, encrypted: bool, with_key: bool) -> Result<()> {
        let dir = self.log_root.join(date.format(logs::DATE_FORMAT).to_string());
        let stem = self.random_time().format(logs::TIME_FORMAT).to_string();
        let size = self.rng.usize(1024..=self.max_bytes.max(1024));

        if !encrypted {
            self.stats.plain += 1;
            return self.write(&dir, &format!("{}.{}", stem, logs::PLAIN_EXTENSION), size);
        }

        self.write(&dir, &format!("{}.{}", stem, logs::ENCRYPTED_EXTENSION), size)?;
        if with_key {
            self.stats.encrypted += 1;
            self.write(&dir, &format!("{}.{}", stem, logs::KEY_EXTENSION), 256)
        } else {
            self.stats.keyless += 1;
            Ok(())
        }
    }

    fn write_edge_cases(&mut self, today: NaiveDate) -> Result<()> {
        let valid_date = (today - Duration::days(1)).format(logs::DATE_FORMAT).to_string();

        let future = (today + Duration::days(30)).format(logs::DATE_FORMAT).to_string();

        // Not a calendar date
        let invalid_dir = self.log_root.join("2024-13-45");
        self.write(&invalid_dir, "10_00_00.ulg", 2048)?;
        // After today
        let future_dir = self.log_root.join(future);
        self.write(&future_dir, "10_00_00.ulg", 2048)?;
        // Bad time stem and a non-log file
        let dir = self.log_root.join(valid_date);
        self.write(&dir, "25_61_00.ulg", 2048)?;
        self.write(&dir, "notes.txt", 64)?;

        self.stats.edge_cases += 4;
        Ok(())
    }
}

fn write_config_file(root: &Path, layout: &RemoteLayout) -> Result<PathBuf> {
    let dir = root
        .join(layout.storage_root.trim_start_matches('/'))
        .join(&layout.config_dir);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(&layout.config_file);
    fs::write(&path, "# [ env: indoor ]\n").with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn main() -> Result<()> {
    let args = SimulationArgs::parse();
    let layout = RemoteLayout::default();
    let today = Local::now().date_naive();

    let mut device = MockDevice::new(&args.root, &layout, &args);

    for day in 1..=args.days.max(0) {
        let date = today - Duration::days(day);
        for index in 0..args.logs_per_day {
            let encrypted = index % 2 == 1;
            device.write_log(date, encrypted, true)?;
        }
    }

    // Most recent log is encrypted with its key missing
    device.write_log(today, true, false)?;

    if !args.no_edge_cases {
        device.write_edge_cases(today)?;
    }

    let config_path = write_config_file(&args.root, &layout)?;

    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("resolving {}", args.root.display()))?;
    let stats = &device.stats;
    println!("Mock device written to {}", root.display());
    println!("  plain logs:          {}", stats.plain);
    println!("  encrypted with key:  {}", stats.encrypted);
    println!("  encrypted, no key:   {}", stats.keyless);
    println!("  edge cases:          {}", stats.edge_cases);
    println!("  config file:         {}", config_path.display());
    println!();
    println!("Try: flightlog_fetcher --address {} list", root.display());

    Ok(())
}
