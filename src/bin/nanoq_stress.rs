//! nanoq Stress Binary
//!
//! Satu producer thread push 0..count, satu consumer thread pop dan
//! memverifikasi urutan. Gagal (exit non-zero) kalau ada elemen yang hilang,
//! duplikat, atau tertukar.
//!
//! Usage:
//!   cargo run --release --features cli --bin nanoq_stress -- [OPTIONS]

use std::hint::spin_loop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use nanoq::core::{check_cache_line, Storage, CACHE_LINE_SIZE};
use nanoq::{Consumer, Producer, RingBuffer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StorageKind {
    Heap,
    Mmap,
}

#[derive(Parser, Debug)]
#[command(name = "nanoq_stress", about = "SPSC ring buffer stress test")]
struct Cli {
    /// Jumlah slot (queue menampung capacity - 1)
    #[arg(short, long, default_value_t = 1024)]
    capacity: usize,
    /// Jumlah elemen yang di-push
    #[arg(short = 'n', long, default_value_t = 10_000_000)]
    count: u64,
    #[arg(short, long, value_enum, default_value_t = StorageKind::Heap)]
    storage: StorageKind,
    #[arg(short, long)]
    verbose: bool,
}

/// Hasil satu run
struct StressReport {
    count: u64,
    elapsed: Duration,
    producer_spins: u64,
    consumer_spins: u64,
}

impl StressReport {
    fn print(&self) {
        let per_op = self.elapsed.as_nanos() as f64 / self.count as f64;
        info!(
            count = self.count,
            elapsed_ms = self.elapsed.as_millis() as u64,
            ns_per_op = %format!("{per_op:.2}"),
            mops = %format!("{:.2}", self.count as f64 / self.elapsed.as_secs_f64() / 1_000_000.0),
            producer_spins = self.producer_spins,
            consumer_spins = self.consumer_spins,
            "stress run complete"
        );
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "nanoq=debug" } else { "nanoq=info,nanoq_stress=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

/// Push 0..count. Berhenti lebih awal kalau `stop` diset consumer.
/// Return jumlah spin karena queue penuh.
fn produce<S>(tx: &mut Producer<'_, u64, S>, count: u64, stop: &AtomicBool) -> u64
where
    S: Storage<u64>,
{
    let mut spins = 0u64;
    for i in 0..count {
        // Overflow di sini bukan error: producer lebih cepat dari consumer
        let mut value = i;
        while let Err(rejected) = tx.push_back(value) {
            if stop.load(Ordering::Relaxed) {
                return spins;
            }
            value = rejected.into_inner();
            spins += 1;
            spin_loop();
        }
    }
    spins
}

/// Pop dan verifikasi urutan 0..count. Return jumlah spin karena queue kosong.
fn consume<S: Storage<u64>>(rx: &mut Consumer<'_, u64, S>, count: u64) -> Result<u64> {
    let mut spins = 0u64;
    let mut expected = 0u64;
    while expected < count {
        match rx.take_front() {
            Ok(v) if v == expected => expected += 1,
            Ok(v) => bail!("order violation: expected {expected}, got {v}"),
            Err(_) => {
                spins += 1;
                spin_loop();
            }
        }
    }
    if !rx.is_empty() {
        bail!("queue not empty after consuming {count} elements");
    }
    Ok(spins)
}

/// Jalankan producer dan consumer di thread terpisah
fn run<S>(mut queue: RingBuffer<u64, S>, count: u64) -> Result<StressReport>
where
    S: Storage<u64> + Send,
{
    let (mut tx, mut rx) = queue.split();
    let stop = AtomicBool::new(false);
    let start = Instant::now();

    let (producer_spins, consumer_spins) = thread::scope(|s| {
        let stop = &stop;
        let producer = thread::Builder::new()
            .name("producer".into())
            .spawn_scoped(s, move || produce(&mut tx, count, stop))
            .context("failed to spawn producer thread")?;

        let consumer = thread::Builder::new()
            .name("consumer".into())
            .spawn_scoped(s, move || {
                let result = consume(&mut rx, count);
                if result.is_err() {
                    stop.store(true, Ordering::Relaxed);
                }
                result
            })
            .map_err(|e| {
                stop.store(true, Ordering::Relaxed);
                e
            })
            .context("failed to spawn consumer thread")?;

        // Consumer dulu: kalau gagal, producer baru bisa keluar setelah stop diset
        let consumer = consumer.join().map_err(|_| {
            stop.store(true, Ordering::Relaxed);
            anyhow::anyhow!("consumer thread panicked")
        })?;
        let producer_spins = producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
        anyhow::Ok((producer_spins, consumer?))
    })?;

    Ok(StressReport {
        count,
        elapsed: start.elapsed(),
        producer_spins,
        consumer_spins,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.capacity < 2 {
        bail!("capacity must be at least 2, got {}", cli.capacity);
    }
    if !check_cache_line() {
        warn!(padding = CACHE_LINE_SIZE, "results may include false-sharing effects");
    }

    info!(
        capacity = cli.capacity,
        count = cli.count,
        storage = ?cli.storage,
        "starting SPSC stress run"
    );

    let report = match cli.storage {
        StorageKind::Heap => run(RingBuffer::with_capacity(cli.capacity), cli.count)?,
        StorageKind::Mmap => run(
            RingBuffer::mmap_anonymous(cli.capacity).context("failed to map queue storage")?,
            cli.count,
        )?,
    };

    report.print();
    Ok(())
}
