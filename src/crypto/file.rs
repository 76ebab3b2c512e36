//! Sealing whole files into JSON envelopes

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::vault::{open_with_password, seal_with_password, SealedPayload};

/// Encrypt `input` and write the sealed envelope to `output` as JSON
pub fn seal_file(input: &Path, output: &Path, password: &str) -> Result<()> {
    let plaintext =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let sealed = seal_with_password(password, &plaintext)?;
    let encoded = serde_json::to_vec_pretty(&sealed)?;
    fs::write(output, encoded).with_context(|| format!("Failed to write {}", output.display()))
}

/// Open the envelope at `input` and write the plaintext to `output`.
/// Nothing is written if the password or envelope is wrong.
pub fn unseal_file(input: &Path, output: &Path, password: &str) -> Result<()> {
    let raw = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let sealed: SealedPayload =
        serde_json::from_slice(&raw).context("Input is not a sealed envelope")?;
    let plaintext = open_with_password(password, &sealed)?;
    fs::write(output, plaintext).with_context(|| format!("Failed to write {}", output.display()))
}
