//! Global lookup data shared by every tenant: roles, provinces and the
//! "maestro" table of products, guarantees and process types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{finish, require, text_enum, Validate};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupCategory {
    Product,
    Guarantee,
    ProcessType,
}

text_enum!(LookupCategory, "lookup category", {
    Product => "product",
    Guarantee => "guarantee",
    ProcessType => "process_type",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lookup {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub category: LookupCategory,
    pub code: String,
    pub label: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLookup {
    pub category: LookupCategory,
    pub code: String,
    pub label: String,
}

impl Validate for NewLookup {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "code", &self.code);
        require(&mut errors, "label", &self.label);
        finish(errors)
    }
}

impl NewLookup {
    pub fn into_lookup(self) -> Lookup {
        Lookup {
            id: Uuid::new_v4(),
            category: self.category,
            code: self.code.trim().to_ascii_uppercase(),
            label: self.label.trim().to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for NewRole {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "name", &self.name);
        if !self
            .name
            .trim()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            errors.insert(
                "name".to_string(),
                "Role names use lowercase letters, digits and underscores".to_string(),
            );
        }
        finish(errors)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Province {
    pub code: String,
    pub name: String,
}

/// Built-in roles. `root` is the platform operator role, never granted over HTTP.
pub const ROLE_ROOT: &str = "root";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_LAWYER: &str = "lawyer";
pub const ROLE_ASSISTANT: &str = "assistant";

pub const BUILTIN_ROLES: &[(&str, &str)] = &[
    (ROLE_ROOT, "Platform operator"),
    (ROLE_ADMIN, "Firm administrator"),
    (ROLE_LAWYER, "Lawyer"),
    (ROLE_ASSISTANT, "Paralegal or office assistant"),
];

/// Lookup rows present on a fresh install
pub const DEFAULT_LOOKUPS: &[(LookupCategory, &str, &str)] = &[
    (LookupCategory::Product, "PRESTAMO_PERSONAL", "Préstamo personal"),
    (LookupCategory::Product, "PRESTAMO_HIPOTECARIO", "Préstamo hipotecario"),
    (LookupCategory::Product, "TARJETA_CREDITO", "Tarjeta de crédito"),
    (LookupCategory::Guarantee, "PERSONAL", "Garantía personal"),
    (LookupCategory::Guarantee, "HIPOTECARIA", "Garantía hipotecaria"),
    (LookupCategory::Guarantee, "AVAL", "Aval"),
    (LookupCategory::ProcessType, "MONITORIO", "Proceso monitorio"),
    (LookupCategory::ProcessType, "EJECUCION_HIPOTECARIA", "Ejecución hipotecaria"),
    (LookupCategory::ProcessType, "ORDINARIO", "Juicio ordinario"),
    (LookupCategory::ProcessType, "VERBAL", "Juicio verbal"),
];

/// Spanish provinces by INE code
pub const PROVINCES: &[(&str, &str)] = &[
    ("01", "Araba/Álava"),
    ("02", "Albacete"),
    ("03", "Alicante/Alacant"),
    ("04", "Almería"),
    ("05", "Ávila"),
    ("06", "Badajoz"),
    ("07", "Illes Balears"),
    ("08", "Barcelona"),
    ("09", "Burgos"),
    ("10", "Cáceres"),
    ("11", "Cádiz"),
    ("12", "Castellón/Castelló"),
    ("13", "Ciudad Real"),
    ("14", "Córdoba"),
    ("15", "A Coruña"),
    ("16", "Cuenca"),
    ("17", "Girona"),
    ("18", "Granada"),
    ("19", "Guadalajara"),
    ("20", "Gipuzkoa"),
    ("21", "Huelva"),
    ("22", "Huesca"),
    ("23", "Jaén"),
    ("24", "León"),
    ("25", "Lleida"),
    ("26", "La Rioja"),
    ("27", "Lugo"),
    ("28", "Madrid"),
    ("29", "Málaga"),
    ("30", "Murcia"),
    ("31", "Navarra"),
    ("32", "Ourense"),
    ("33", "Asturias"),
    ("34", "Palencia"),
    ("35", "Las Palmas"),
    ("36", "Pontevedra"),
    ("37", "Salamanca"),
    ("38", "Santa Cruz de Tenerife"),
    ("39", "Cantabria"),
    ("40", "Segovia"),
    ("41", "Sevilla"),
    ("42", "Soria"),
    ("43", "Tarragona"),
    ("44", "Teruel"),
    ("45", "Toledo"),
    ("46", "Valencia/València"),
    ("47", "Valladolid"),
    ("48", "Bizkaia"),
    ("49", "Zamora"),
    ("50", "Zaragoza"),
    ("51", "Ceuta"),
    ("52", "Melilla"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn province_codes_are_sequential() {
        assert_eq!(PROVINCES.len(), 52);
        for (i, (code, _)) in PROVINCES.iter().enumerate() {
            assert_eq!(code.parse::<usize>().unwrap(), i + 1);
        }
    }

    #[test]
    fn role_names_are_restricted() {
        let bad = NewRole { name: "Jefe de Área".into(), description: None };
        assert!(bad.validate().is_err());
        let good = NewRole { name: "billing_clerk".into(), description: None };
        assert!(good.validate().is_ok());
    }
}
