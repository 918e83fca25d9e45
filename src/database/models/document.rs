use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

use super::{clear_reference, finish, require_if_present, text_enum, Case, User, Validate};
use crate::database::scope::{ScopedEntity, TenantId};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Active,
    Deleted,
}

text_enum!(DocumentStatus, "document status", {
    Active => "active",
    Deleted => "deleted",
});

/// Stored file. The binary content never appears in JSON responses; it is
/// served raw by the download endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub case_id: Option<Uuid>,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Hex sha256 of the content
    pub checksum: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded upload, ready to store
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub case_id: Option<Uuid>,
    pub file_name: String,
    pub mime_type: String,
    pub description: Option<String>,
    pub content: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
}

/// Metadata-only update; content is immutable once uploaded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub case_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub description: Option<String>,
}

impl Validate for DocumentPatch {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_if_present(&mut errors, "file_name", self.file_name.as_ref());
        finish(errors)
    }
}

pub fn checksum(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// File names end up inside a Content-Disposition header
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

impl ScopedEntity for Document {
    type Create = NewDocument;
    type Update = DocumentPatch;

    const LABEL: &'static str = "Document";

    fn on_parent_deleted(&mut self, parent: &str, id: Uuid) -> bool {
        if parent == Case::LABEL {
            clear_reference(&mut self.case_id, id);
        } else if parent == User::LABEL {
            clear_reference(&mut self.uploaded_by, id);
        }
        false
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(tenant: TenantId, input: NewDocument) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            case_id: input.case_id,
            file_name: sanitize_file_name(&input.file_name),
            mime_type: input.mime_type,
            size_bytes: input.content.len() as i64,
            checksum: checksum(&input.content),
            description: input.description,
            status: DocumentStatus::Active,
            content: input.content,
            uploaded_by: input.uploaded_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: DocumentPatch) {
        if input.case_id.is_some() {
            self.case_id = input.case_id;
        }
        if let Some(file_name) = input.file_name {
            self.file_name = sanitize_file_name(&file_name);
        }
        if input.description.is_some() {
            self.description = input.description;
        }
        self.updated_at = Utc::now();
    }

    fn is_deleted(&self) -> bool {
        self.status == DocumentStatus::Deleted
    }

    fn mark_deleted(&mut self) -> bool {
        self.status = DocumentStatus::Deleted;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_names_cannot_break_headers() {
        assert_eq!(sanitize_file_name("demanda \"final\".pdf"), "demanda _final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("  "), "document");
    }

    #[test]
    fn content_is_not_serialized() {
        let doc = Document::build(
            TenantId::from(Uuid::new_v4()),
            NewDocument {
                case_id: None,
                file_name: "poder.pdf".into(),
                mime_type: "application/pdf".into(),
                description: None,
                content: vec![1, 2, 3],
                uploaded_by: None,
            },
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["size_bytes"], 3);
    }
}
