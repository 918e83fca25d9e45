pub mod activity;
pub mod case;
pub mod catalog;
pub mod creditor;
pub mod document;
pub mod event;
pub mod lawyer;
pub mod tenant;
pub mod user;

pub use activity::{Activity, ActivityKind, ActivityPatch, NewActivity};
pub use case::{Case, CasePatch, CaseStatus, NewCase};
pub use catalog::{Lookup, LookupCategory, NewLookup, NewRole, Province, Role};
pub use creditor::{Creditor, CreditorPatch, NewCreditor};
pub use document::{Document, DocumentPatch, DocumentStatus, NewDocument};
pub use event::{Event, EventPatch, NewEvent};
pub use lawyer::{Lawyer, LawyerPatch, NewLawyer};
pub use tenant::{NewTenant, Tenant, TenantStatus, TenantUpdate};
pub use user::{NewUser, User, UserPatch};

use crate::error::FieldErrors;

/// Unknown value for a text-backed enum column
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Input checks performed before anything touches storage
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Enum stored as TEXT: string conversions for SQL binding and row decoding
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::database::models::UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::database::models::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::database::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

/// Record a "required" error when the trimmed value is empty
pub(crate) fn require(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "This field is required".to_string());
    }
}

/// Same as [`require`] for optional patch fields: only checked when present
pub(crate) fn require_if_present(errors: &mut FieldErrors, field: &str, value: Option<&String>) {
    if let Some(value) = value {
        require(errors, field, value);
    }
}

/// Minimal shape check: one '@', non-empty local part, dotted domain
pub(crate) fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.insert(field.to_string(), "This field is required".to_string());
        return;
    }
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        errors.insert(field.to_string(), "Invalid email address".to_string());
    }
}

/// `ON DELETE SET NULL` for a nullable reference
pub(crate) fn clear_reference(reference: &mut Option<uuid::Uuid>, id: uuid::Uuid) {
    if *reference == Some(id) {
        *reference = None;
    }
}

pub(crate) fn finish(errors: FieldErrors) -> Result<(), FieldErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, "a", "ana@bufete.es");
        check_email(&mut errors, "b", "ana@bufete");
        check_email(&mut errors, "c", "@bufete.es");
        check_email(&mut errors, "d", "");
        assert!(!errors.contains_key("a"));
        assert_eq!(errors["b"], "Invalid email address");
        assert_eq!(errors["c"], "Invalid email address");
        assert_eq!(errors["d"], "This field is required");
    }

    #[test]
    fn text_enums_round_trip_through_strings() {
        for status in CaseStatus::ALL {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), *status);
        }
        let err = "pending".parse::<CaseStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown case status 'pending'");
    }
}
