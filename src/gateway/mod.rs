// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod attestation;
pub mod inference;
pub mod verification;

pub use attestation::{extract_attestations, AttestationReport, AttestationStage};
pub use inference::{Generation, InferenceClient};
pub use verification::{hashes_match, ModelVerifier, VerificationGateway};
