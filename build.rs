//! Link setup for the userspace stack backend.
//!
//! Only active with `--features fstack`. Library search path comes from
//! `FF_PATH` (F-Stack install prefix) and falls back to `/usr/local`.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=FF_PATH");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_FSTACK");

    if env::var_os("CARGO_FEATURE_FSTACK").is_none() {
        return;
    }

    let prefix = env::var("FF_PATH").unwrap_or_else(|_| "/usr/local".to_string());
    println!("cargo:rustc-link-search=native={}/lib", prefix);

    // DPDK drivers register themselves from constructors, so the archives
    // must be linked whole or the ports never show up.
    println!("cargo:rustc-link-arg=-Wl,--whole-archive");
    println!("cargo:rustc-link-arg=-ldpdk");
    println!("cargo:rustc-link-arg=-lfstack");
    println!("cargo:rustc-link-arg=-Wl,--no-whole-archive");

    for lib in ["rt", "m", "dl", "crypto", "pthread", "numa"] {
        println!("cargo:rustc-link-lib={}", lib);
    }
}
