// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod entry;
pub mod hosting;
pub mod pool_registry;

pub use entry::{EntryUpdate, FieldUpdate, HostedEntry};
pub use hosting::HostingRegistrar;
pub use pool_registry::PoolRegistry;
