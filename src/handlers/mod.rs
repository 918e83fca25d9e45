// handlers/mod.rs - 3-tier handler layout
//
// Public (no token) → Protected (tenant JWT) → Elevated (root JWT)
//
// Every tier except the bare health checks runs behind tenant resolution.

pub mod elevated; // /api/root/*
pub mod extract;
pub mod protected; // /api/*
pub mod public; // /, /health, catalog reads, register, login

pub use extract::{JsonBody, RecordId};
