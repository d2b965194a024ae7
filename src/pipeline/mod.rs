//! Pipeline stages for image-path conversion.
//!
//! Each submodule implements exactly one step and is a pure function of its
//! inputs, so each is tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! text ──▶ scan ──▶ classify ──▶ rewrite ──▶ (engine splices)
//!          (refs)   (Local?)     (new path)
//! ```
//!
//! 1. [`scan`]:     lazily yield image references, skipping code regions
//! 2. [`classify`]: `Local` vs `External` (URLs, data URIs, converted paths)
//! 3. [`rewrite`]:  flatten to `prefix/filename[.ext]`

mod fence;

pub mod classify;
pub mod rewrite;
pub mod scan;
