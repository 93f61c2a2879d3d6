//! Urbanite — rear parking-assist controller.
//!
//! A single momentary button arms the system, an ultrasonic range finder
//! measures the distance to the nearest rearward obstacle, and an RGB
//! indicator renders a colour gradient over it. Four cooperating state
//! machines do the work:
//!
//! ```text
//!                    ┌───────────────────────────┐
//!                    │        Urbanite (master)   │
//!                    │  arms leaves · pause ·     │
//!                    │  emergency · sleep         │
//!                    └──────┬───────┬───────┬─────┘
//!                           │ owns  │       │
//!                   ┌───────▼──┐ ┌──▼─────┐ ┌▼────────┐
//!                   │ Button   │ │ Ultra- │ │ Display │
//!                   │ debounce │ │ sound  │ │ colour  │
//!                   └────┬─────┘ └──┬─────┘ └┬────────┘
//!                        │ port mirrors (ISR-written)
//!                   ─────▼──────────▼─────────▼─────────
//! ```
//!
//! The main loop fires each machine once per iteration; interrupt handlers
//! mutate the hardware mirrors the guards read. Everything above the port
//! boundary is hardware-agnostic, which is what the test suite exercises.

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod fsm;
pub mod port;
