//! uscall - Latency PoC
//!
//! Ukur biaya operasi dasar tanpa network:
//! - Allocate / reset slice (heap dan mmap)
//! - Derive child view
//! - Satu iterasi loop (begin → callback → end)
//!
//! Dengan `--backend stack` (feature `fstack`), iterasi dijalankan oleh
//! `ff_run` dan overhead begin/end per tick dicetak berkala.
//!
//! Usage:
//!   cargo run --release -- [--capacity BYTES] [--storage heap|mapped]
//!   cargo run --release --features fstack -- --backend stack --conf f-stack.conf

use std::hint::black_box;
use std::io;
use std::process;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use uscall::hook::{loop_step, HandleRegistry, LoopParams};
use uscall::network;
use uscall::{BackendKind, Config, Slice, SliceBuf, StorageKind, Tool};

const ITERATIONS: usize = 1_000_000;
#[cfg_attr(not(feature = "fstack"), allow(dead_code))]
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

fn main() {
    let mut config = Config::default();
    if let Err(e) = config.apply_env() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    let config = match config.with_args(Tool::Latency, std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{}", Config::usage(Tool::Latency));
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", Config::usage(Tool::Latency));
            process::exit(1);
        }
    };

    let default_filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    println!("🚀 uscall - Latency PoC");
    println!("=======================\n");

    if config.backend == BackendKind::Stack {
        if let Err(e) = run_stack_mode(&config) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    let result = benchmark_allocate(config.storage, config.slice_capacity)
        .and_then(|_| benchmark_reset(config.storage, config.slice_capacity))
        .and_then(|_| benchmark_child(config.slice_capacity));

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    benchmark_loop_step();

    println!("\n✅ All benchmarks complete!");
    println!("\nTo start echo server: cargo run --release --bin uscall_echo -- --bind 0.0.0.0:8090");
}

/// Overhead begin → callback → end per tick di dalam `ff_run`
///
/// Tidak kembali selama F-Stack berjalan.
#[cfg(feature = "fstack")]
fn run_stack_mode(config: &Config) -> io::Result<()> {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use uscall::hook::run_stack_loop;
    use uscall::network::FStackBackend;
    use uscall::Backend;

    let mut stack = FStackBackend::init(&config.stack_args(Tool::Latency.program()))?;
    let backend = network::open_backend(config.backend)?;

    println!("📊 Stack Loop ({})", backend.name());
    println!("-------------------");

    let started = Instant::now();
    let tick_start = Arc::new(AtomicU64::new(0));

    let mut registry = HandleRegistry::new();
    let mut params = LoopParams::default();

    let begin_mark = tick_start.clone();
    params.bind_begin(&mut registry, move || {
        begin_mark.store(started.elapsed().as_nanos() as u64, Ordering::Relaxed);
        0
    });
    params.bind_proc(&mut registry, || 0);

    let mut ticks = 0usize;
    let mut total_ns = 0u128;
    let mut last_report = Instant::now();
    params.bind_end(&mut registry, move || {
        let now = started.elapsed().as_nanos() as u64;
        total_ns += now.saturating_sub(tick_start.load(Ordering::Relaxed)) as u128;
        ticks += 1;

        if last_report.elapsed() >= REPORT_INTERVAL {
            report("stack tick", ticks, total_ns);
            ticks = 0;
            total_ns = 0;
            last_report = Instant::now();
        }
        0
    });

    run_stack_loop(&params, &mut registry, &mut stack);
    params.unbind_all(&mut registry);
    Ok(())
}

/// Tanpa feature `fstack`: laporkan bahwa backend stack tidak tersedia
#[cfg(not(feature = "fstack"))]
fn run_stack_mode(config: &Config) -> io::Result<()> {
    network::open_backend(config.backend).map(|_| ())
}

fn report(name: &str, iterations: usize, elapsed_ns: u128) {
    let ns = elapsed_ns as f64 / iterations as f64;
    println!("  {:<16} {:.2} ns/op ({:.3} μs/op)", name, ns, ns / 1000.0);
}

fn benchmark_allocate(kind: StorageKind, capacity: u32) -> uscall::Result<()> {
    println!("📊 Slice Allocate ({:?}, {} bytes)", kind, capacity);
    println!("---------------------------------");

    // mmap jauh lebih mahal, jangan sampai demo terlalu lama
    let iterations = match kind {
        StorageKind::Heap => ITERATIONS,
        StorageKind::Mapped => ITERATIONS / 100,
    };

    let start = Instant::now();
    for _ in 0..iterations {
        let slice = Slice::allocate_with(kind, capacity)?;
        black_box(&slice);
    }
    report("allocate+drop", iterations, start.elapsed().as_nanos());

    let mut slot = Some(Slice::allocate_with(kind, capacity)?);
    uscall::release(&mut slot);
    uscall::release(&mut slot);
    println!("  Double release:  ok\n");

    Ok(())
}

fn benchmark_reset(kind: StorageKind, capacity: u32) -> uscall::Result<()> {
    println!("📊 Slice Reset (zero-fill {} bytes)", capacity);
    println!("----------------------------------");

    let mut slice = Slice::allocate_with(kind, capacity)?;

    let start = Instant::now();
    for i in 0..ITERATIONS {
        slice.set_len((i as u32) % capacity.saturating_add(1));
        slice.reset();
        black_box(&slice);
    }
    report("reset", ITERATIONS, start.elapsed().as_nanos());

    let throughput_gb =
        (ITERATIONS as f64 * capacity as f64) / start.elapsed().as_secs_f64() / 1_000_000_000.0;
    println!("  Throughput:      {:.2} GB/s\n", throughput_gb);

    Ok(())
}

fn benchmark_child(capacity: u32) -> uscall::Result<()> {
    println!("📊 Child View");
    println!("-------------");

    let parent = Slice::allocate(capacity)?;
    let half = capacity / 2;

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let offset = (i as u32) % (half + 1);
        let child = parent.child(black_box(offset), black_box(half))?;
        black_box(child.capacity());
    }
    report("derive child", ITERATIONS, start.elapsed().as_nanos());

    let child = parent.child(half, half)?;
    println!(
        "  Child({}, {}):  len={} capacity={}\n",
        half,
        half,
        child.len(),
        child.capacity()
    );

    Ok(())
}

fn benchmark_loop_step() {
    println!("📊 Loop Step (begin → callback → end)");
    println!("-------------------------------------");

    let mut registry = HandleRegistry::new();
    let mut params = LoopParams::default();

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let _ = black_box(loop_step(&params, &mut registry));
    }
    report("empty handles", ITERATIONS, start.elapsed().as_nanos());

    params.bind_begin(&mut registry, || 0);
    params.bind_end(&mut registry, || 0);
    params.bind_proc(&mut registry, || 0);

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let _ = black_box(loop_step(&params, &mut registry));
    }
    report("bound handles", ITERATIONS, start.elapsed().as_nanos());

    params.unbind_all(&mut registry);
}
