//! Decrypt a ciphertext block a peer produced with the device public key

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use peerlink_common::logging::Logger;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::show::open_identity;

pub struct DecryptCommand {
    config_dir: PathBuf,
    logger: Arc<Logger>,
}

impl DecryptCommand {
    pub fn new(config_dir: PathBuf, logger: Arc<Logger>) -> Self {
        Self { config_dir, logger }
    }

    /// Decrypt `input` and write the plaintext to `output`, or to `out` when
    /// no output file is given.
    pub fn run(
        &self,
        input: &Path,
        output: Option<&Path>,
        base64: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let identity = open_identity(&self.config_dir, &self.logger)?;

        let raw = std::fs::read(input).with_context(|| format!("Failed to read {input:?}"))?;
        let ciphertext = if base64 {
            decode_base64(&raw).with_context(|| format!("{input:?} is not valid base64"))?
        } else {
            raw
        };

        let plaintext = identity
            .decrypt(&ciphertext)
            .with_context(|| format!("Failed to decrypt {input:?}"))?;

        match output {
            Some(path) => {
                std::fs::write(path, &plaintext)
                    .with_context(|| format!("Failed to write {path:?}"))?;
                self.logger.info_args(format_args!(
                    "Wrote {} bytes to {}",
                    plaintext.len(),
                    path.display()
                ));
            }
            None => out.write_all(&plaintext)?,
        }
        Ok(())
    }
}

fn decode_base64(text: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_ignores_line_breaks() {
        assert_eq!(decode_base64(b"aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(decode_base64(b"not base64!").is_err());
    }
}
