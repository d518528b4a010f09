// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod concurrency;
pub mod events;
pub mod factory;
pub mod multi;
pub mod runner;

pub use concurrency::{ConcurrencyProvider, Ticket};
pub use events::{status_channel, StatusEvent, StatusReceiver, StatusSender};
pub use factory::RunnerFactory;
pub use multi::MultiTreeRunner;
pub use runner::{RunnerPhase, TreeRunner};
