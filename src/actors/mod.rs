//! Actor-based monitoring tasks
//!
//! Each monitoring concern runs as an independent async task owning its own
//! state, controlled through an mpsc command channel and joined by the
//! orchestrator on shutdown.
//!
//! ```text
//!            ┌──────────────────┐
//!            │ supervisor::     │
//!            │ Monitor (start)  │
//!            └────────┬─────────┘
//!                     │ spawns
//!        ┌────────────┼────────────────┐
//!        │            │                │
//! ┌──────▼──────┐ ┌───▼─────────┐ ┌────▼───────────┐
//! │ LogTail-1   │ │ LogTail-N   │ │ Resource-      │
//! │ (auth.log)  │ │ (f2b.log)   │ │ SamplerActor   │
//! └──────┬──────┘ └───┬─────────┘ └────┬───────────┘
//!        │            │                │
//!        └────────────┴───────┬────────┘
//!                             │
//!                   ┌─────────▼──────────┐
//!                   │  AlertDispatcher   │ (category fan-out)
//!                   └────────────────────┘
//! ```
//!
//! - **LogTailActor**: keeps a `tail -f` subprocess alive per log file and
//!   feeds matching lines to the dispatcher
//! - **ResourceSamplerActor**: samples CPU/RAM/disk on an interval and runs
//!   the threshold state machine

pub mod messages;
pub mod sampler;
pub mod tail;
