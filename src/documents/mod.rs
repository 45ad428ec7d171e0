pub mod nda;
pub mod pdf;
pub mod safe;
pub mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::auth::tokens;
use crate::models::{Nda, TermSheet, User};
use safe::SafeParties;

/// Renders the legal documents and keeps archived copies under
/// `<upload_dir>/documents`. Archived files are never served directly.
pub struct DocumentStore {
    root: PathBuf,
    app_name: String,
    nda_text: String,
    nda_hash: String,
}

impl DocumentStore {
    pub fn new(upload_dir: &Path, app_name: &str) -> Self {
        let vars = HashMap::from([("app_name", app_name.to_string())]);
        let nda_text = template::render(nda::NDA_TEMPLATE, &vars);
        let nda_hash = tokens::hash(&nda_text);

        Self {
            root: upload_dir.join("documents"),
            app_name: app_name.to_string(),
            nda_text,
            nda_hash,
        }
    }

    /// The agreement text investors sign, with the platform name filled in.
    pub fn nda_text(&self) -> &str {
        &self.nda_text
    }

    /// SHA-256 of [`Self::nda_text`], stored with every signature.
    pub fn nda_hash(&self) -> &str {
        &self.nda_hash
    }

    pub fn nda_version(&self) -> &'static str {
        nda::NDA_VERSION
    }

    pub async fn nda_pdf(&self, nda: &Nda, investor: &User) -> Result<Vec<u8>, String> {
        let (app_name, text) = (self.app_name.clone(), self.nda_text.clone());
        let (nda, investor) = (nda.clone(), investor.clone());
        tokio::task::spawn_blocking(move || nda::render(&app_name, &text, &nda, &investor))
            .await
            .map_err(|e| format!("NDA render task failed: {e}"))?
    }

    pub async fn safe_pdf(&self, sheet: &TermSheet, parties: SafeParties) -> Result<Vec<u8>, String> {
        let app_name = self.app_name.clone();
        let sheet = sheet.clone();
        tokio::task::spawn_blocking(move || safe::render(&app_name, &sheet, &parties))
            .await
            .map_err(|e| format!("SAFE render task failed: {e}"))?
    }

    /// Archive a signed NDA. Returns the stored path.
    pub async fn archive_nda(&self, nda: &Nda, bytes: &[u8]) -> Result<String, String> {
        let name = format!("nda_{}_{}.pdf", short_id(&nda.id), Utc::now().format("%Y%m%d"));
        self.write("ndas", &name, bytes).await
    }

    pub async fn archive_safe(&self, sheet: &TermSheet, bytes: &[u8]) -> Result<String, String> {
        let name = format!("safe_{}_{}.pdf", short_id(&sheet.id), Utc::now().format("%Y%m%d"));
        self.write("termsheets", &name, bytes).await
    }

    async fn write(&self, kind: &str, name: &str, bytes: &[u8]) -> Result<String, String> {
        let dir = self.root.join(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nda_text_carries_app_name_and_stable_hash() {
        let store = DocumentStore::new(Path::new("/tmp/unused"), "AngelHub");
        assert!(store.nda_text().contains("AngelHub Platform (\"Disclosing Party\")"));
        assert!(!store.nda_text().contains("{{"));
        assert_eq!(store.nda_hash(), tokens::hash(store.nda_text()));

        let other = DocumentStore::new(Path::new("/tmp/unused"), "Other");
        assert_ne!(store.nda_hash(), other.nda_hash());
    }
}
