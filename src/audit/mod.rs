//! Audit: BLAKE3 output hashes, the JSONL run log and drift detection.

pub mod drift;
pub mod eventlog;
pub mod hasher;
