//! Documents uploaded into a session for retrieval.

use std::cell::RefCell;

use tracing::{error, info};

use crate::api::{DocumentBackend, FileUpload};
use crate::errors::{AppError, Result};
use crate::models::{Notice, SessionDocument};
use crate::notices::Notifier;

pub struct DocumentShelf {
    documents: RefCell<Vec<SessionDocument>>,
    notifier: Notifier,
}

impl DocumentShelf {
    pub fn new(notifier: Notifier) -> Self {
        Self { documents: RefCell::new(Vec::new()), notifier }
    }

    pub fn documents(&self) -> Vec<SessionDocument> {
        self.documents.borrow().clone()
    }

    /// Documents the agent currently searches.
    pub fn active_count(&self) -> usize {
        self.documents.borrow().iter().filter(|d| d.is_active).count()
    }

    pub async fn refresh<B>(&self, backend: &B, user_id: &str, session_id: &str) -> Result<usize>
    where
        B: DocumentBackend + ?Sized,
    {
        match backend.session_documents(user_id, session_id).await {
            Ok(documents) => {
                let count = documents.len();
                *self.documents.borrow_mut() = documents;
                Ok(count)
            }
            Err(e) => {
                error!("Failed to load documents: {e}");
                self.notifier.push(Notice::error("Error loading documents", &e));
                Err(e)
            }
        }
    }

    /// Uploads one file into the session and reloads the shelf.
    pub async fn upload<B>(&self, backend: &B, user_id: &str, session_id: &str, file: FileUpload) -> Result<()>
    where
        B: DocumentBackend + ?Sized,
    {
        if file.bytes.is_empty() {
            return Err(AppError::empty_field("file"));
        }
        let filename = file.filename.clone();
        if let Err(e) = backend.upload_document(user_id, session_id, file).await {
            error!("Upload of {filename} failed: {e}");
            self.notifier.push(Notice::error("Upload failed", &e));
            return Err(e);
        }
        info!("Uploaded {filename} into {session_id}");
        self.notifier.push(Notice::success("Upload complete", format!("{filename} was added to this chat")));
        // a failed reload already raised its own notice
        let _ = self.refresh(backend, user_id, session_id).await;
        Ok(())
    }

    /// Flips a document's active flag. The local copy changes only once the
    /// server has accepted.
    pub async fn toggle<B>(&self, backend: &B, user_id: &str, document_id: &str) -> Result<bool>
    where
        B: DocumentBackend + ?Sized,
    {
        let (filename, active) = self
            .documents
            .borrow()
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| (d.filename.clone(), !d.is_active))
            .ok_or_else(|| AppError::decode("document shelf", format!("unknown document {document_id}")))?;

        if let Err(e) = backend.toggle_document(user_id, document_id, active).await {
            error!("Failed to toggle document {document_id}: {e}");
            self.notifier.push(Notice::error("Could not update document status", &e));
            return Err(e);
        }
        if let Some(doc) = self.documents.borrow_mut().iter_mut().find(|d| d.id == document_id) {
            doc.is_active = active;
        }
        let (title, verb) = if active {
            ("Document activated", "now")
        } else {
            ("Document deactivated", "no longer")
        };
        self.notifier.push(Notice::success(title, format!("{filename} will {verb} be searched")));
        Ok(active)
    }
}
