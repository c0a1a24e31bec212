//! Activity logging: append-only JSONL audit trail.

pub mod jsonl;
