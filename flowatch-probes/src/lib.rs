//! eBPF probes for flowatch
//!
//! The actual XDP program lives in `src/main.rs` and is cross-compiled to
//! the BPF target by the userspace crate's build script. This library target
//! exists so that crate can declare a dependency on the package and get
//! correct cache invalidation.

#![no_std]
