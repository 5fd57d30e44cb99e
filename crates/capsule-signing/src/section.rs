//! Named sections that carry signing material inside a package.

use std::collections::HashMap;

use crate::error::SigningError;

/// Section holding the armored public key of the signer.
pub const PUBKEY_SECTION: &str = ".sig_key";
/// Section holding the armored detached signature over the content digest.
pub const SIGNATURE_SECTION: &str = ".sha256_sig";

/// Read and write access to a package's named sections.
///
/// `section` returns `Ok(None)` when the section does not exist at all;
/// an existing but empty section is `Ok(Some(vec![]))`. `embed` writes
/// armored text into a pre-reserved section and fails when the section
/// is absent or too small.
pub trait SectionStore {
    fn section(&self, name: &str) -> Result<Option<Vec<u8>>, SigningError>;

    fn embed(&mut self, name: &str, text: &str) -> Result<(), SigningError>;
}

/// In-memory section store used by tests.
#[derive(Debug, Default)]
pub struct MemorySections {
    sections: HashMap<String, Vec<u8>>,
}

impl MemorySections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a section of `size` zero bytes.
    pub fn reserve(&mut self, name: &str, size: usize) {
        self.sections.insert(name.to_string(), vec![0; size]);
    }
}

impl SectionStore for MemorySections {
    fn section(&self, name: &str) -> Result<Option<Vec<u8>>, SigningError> {
        Ok(self.sections.get(name).cloned())
    }

    fn embed(&mut self, name: &str, text: &str) -> Result<(), SigningError> {
        let slot = self
            .sections
            .get_mut(name)
            .ok_or_else(|| SigningError::Embed {
                section: name.to_string(),
                reason: "section not present".into(),
            })?;
        if text.len() > slot.len() {
            return Err(SigningError::Embed {
                section: name.to_string(),
                reason: format!(
                    "payload of {} bytes exceeds reserved {} bytes",
                    text.len(),
                    slot.len()
                ),
            });
        }
        slot[..text.len()].copy_from_slice(text.as_bytes());
        slot[text.len()..].fill(0);
        Ok(())
    }
}
