// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chains;
pub mod settings;

pub use chains::{ChainConfig, ChainRegistry};
pub use settings::MarketConfig;
