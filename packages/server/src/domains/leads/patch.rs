//! Single-field patches.
//!
//! The set of patchable fields is closed: every accepted name maps to one
//! [`LeadField`] with a fixed value kind. Identity and audit columns are not
//! in the table and are reported as unknown.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::models::{is_description_placeholder, Lead};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid value for {field}: expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("lead not found: {0}")]
    NotFound(Uuid),

    /// The remote lead surface refused the patch.
    #[error("patch rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("lead store unavailable: {0}")]
    Unavailable(String),
}

impl PatchError {
    /// True when sending the same patch again cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            PatchError::UnknownField(_) | PatchError::TypeMismatch { .. } => true,
            PatchError::Rejected { status, .. } => (400..500).contains(status),
            PatchError::NotFound(_) | PatchError::Unavailable(_) => false,
        }
    }
}

impl From<sqlx::Error> for PatchError {
    fn from(e: sqlx::Error) -> Self {
        PatchError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    /// `YYYY-MM-DD`
    Date,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "number",
            FieldKind::Bool => "boolean",
            FieldKind::Date => "date string (YYYY-MM-DD)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    BusinessName,
    RegisteredName,
    FoundationDate,
    Address,
    City,
    State,
    Country,
    ZipCode,
    Owner,
    Phone,
    Whatsapp,
    Website,
    Email,
    Instagram,
    Facebook,
    TikTok,
    CompanyRegistrationId,
    Categories,
    Rating,
    UserRatingsTotal,
    PriceLevel,
    BusinessStatus,
    Vicinity,
    PermanentlyClosed,
    Description,
    PrimaryActivity,
    Category,
    Radius,
    Source,
}

/// (field, wire name, column name, kind)
const FIELD_TABLE: &[(LeadField, &str, &str, FieldKind)] = &[
    (LeadField::BusinessName, "BusinessName", "business_name", FieldKind::Text),
    (LeadField::RegisteredName, "RegisteredName", "registered_name", FieldKind::Text),
    (LeadField::FoundationDate, "FoundationDate", "foundation_date", FieldKind::Date),
    (LeadField::Address, "Address", "address", FieldKind::Text),
    (LeadField::City, "City", "city", FieldKind::Text),
    (LeadField::State, "State", "state", FieldKind::Text),
    (LeadField::Country, "Country", "country", FieldKind::Text),
    (LeadField::ZipCode, "ZIPCode", "zip_code", FieldKind::Text),
    (LeadField::Owner, "Owner", "owner", FieldKind::Text),
    (LeadField::Phone, "Phone", "phone", FieldKind::Text),
    (LeadField::Whatsapp, "Whatsapp", "whatsapp", FieldKind::Text),
    (LeadField::Website, "Website", "website", FieldKind::Text),
    (LeadField::Email, "Email", "email", FieldKind::Text),
    (LeadField::Instagram, "Instagram", "instagram", FieldKind::Text),
    (LeadField::Facebook, "Facebook", "facebook", FieldKind::Text),
    (LeadField::TikTok, "TikTok", "tiktok", FieldKind::Text),
    (LeadField::CompanyRegistrationId, "CompanyRegistrationID", "company_registration_id", FieldKind::Text),
    (LeadField::Categories, "Categories", "categories", FieldKind::Text),
    (LeadField::Rating, "Rating", "rating", FieldKind::Float),
    (LeadField::UserRatingsTotal, "UserRatingsTotal", "user_ratings_total", FieldKind::Integer),
    (LeadField::PriceLevel, "PriceLevel", "price_level", FieldKind::Integer),
    (LeadField::BusinessStatus, "BusinessStatus", "business_status", FieldKind::Text),
    (LeadField::Vicinity, "Vicinity", "vicinity", FieldKind::Text),
    (LeadField::PermanentlyClosed, "PermanentlyClosed", "permanently_closed", FieldKind::Bool),
    (LeadField::Description, "Description", "description", FieldKind::Text),
    (LeadField::PrimaryActivity, "PrimaryActivity", "primary_activity", FieldKind::Text),
    (LeadField::Category, "Category", "category", FieldKind::Text),
    (LeadField::Radius, "Radius", "radius", FieldKind::Integer),
    (LeadField::Source, "Source", "source", FieldKind::Text),
];

impl LeadField {
    /// Resolve a wire (`RegisteredName`) or column (`registered_name`) name.
    pub fn parse(name: &str) -> Result<Self, PatchError> {
        FIELD_TABLE
            .iter()
            .find(|(_, wire, column, _)| *wire == name || *column == name)
            .map(|(field, ..)| *field)
            .ok_or_else(|| PatchError::UnknownField(name.to_string()))
    }

    fn entry(self) -> &'static (LeadField, &'static str, &'static str, FieldKind) {
        FIELD_TABLE
            .iter()
            .find(|(field, ..)| *field == self)
            .unwrap_or(&FIELD_TABLE[0])
    }

    pub fn wire_name(self) -> &'static str {
        self.entry().1
    }

    /// Column name; only ever comes from the static table.
    pub fn column(self) -> &'static str {
        self.entry().2
    }

    pub fn kind(self) -> FieldKind {
        self.entry().3
    }
}

/// A value already checked against a field's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i32),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl FieldValue {
    /// Validate a JSON value against the field's kind.
    pub fn coerce(field: LeadField, value: &Value) -> Result<Self, PatchError> {
        let kind = field.kind();
        let mismatch = || PatchError::TypeMismatch {
            field: field.wire_name().to_string(),
            expected: kind.expected(),
        };

        match kind {
            FieldKind::Text => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(mismatch),
            FieldKind::Integer => {
                let n = match value.as_i64() {
                    Some(n) => n,
                    None => value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                        .ok_or_else(mismatch)?,
                };
                i32::try_from(n).map(FieldValue::Integer).map_err(|_| mismatch())
            }
            FieldKind::Float => value.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
            FieldKind::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
            FieldKind::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(FieldValue::Date)
                .ok_or_else(mismatch),
        }
    }
}

/// Description merge: append on a new line, never write the placeholder.
///
/// Returns `None` when the incoming text must be ignored.
pub fn merge_description(existing: &str, incoming: &str) -> Option<String> {
    if incoming.trim().is_empty() || is_description_placeholder(incoming) {
        return None;
    }
    if existing.is_empty() {
        Some(incoming.to_string())
    } else {
        Some(format!("{}\n{}", existing, incoming))
    }
}

impl Lead {
    /// Apply a validated value in place. Returns `false` when nothing changed
    /// (a description patch carrying the placeholder).
    pub fn apply_patch(&mut self, field: LeadField, value: FieldValue) -> Result<bool, PatchError> {
        use FieldValue::*;
        use LeadField as F;

        match (field, value) {
            (F::Description, Text(v)) => match merge_description(&self.description, &v) {
                Some(merged) => self.description = merged,
                None => return Ok(false),
            },
            (F::BusinessName, Text(v)) => self.business_name = v,
            (F::RegisteredName, Text(v)) => self.registered_name = v,
            (F::Address, Text(v)) => self.address = v,
            (F::City, Text(v)) => self.city = v,
            (F::State, Text(v)) => self.state = v,
            (F::Country, Text(v)) => self.country = v,
            (F::ZipCode, Text(v)) => self.zip_code = v,
            (F::Owner, Text(v)) => self.owner = v,
            (F::Phone, Text(v)) => self.phone = v,
            (F::Whatsapp, Text(v)) => self.whatsapp = v,
            (F::Website, Text(v)) => self.website = v,
            (F::Email, Text(v)) => self.email = v,
            (F::Instagram, Text(v)) => self.instagram = v,
            (F::Facebook, Text(v)) => self.facebook = v,
            (F::TikTok, Text(v)) => self.tiktok = v,
            (F::CompanyRegistrationId, Text(v)) => self.company_registration_id = v,
            (F::Categories, Text(v)) => self.categories = v,
            (F::BusinessStatus, Text(v)) => self.business_status = v,
            (F::Vicinity, Text(v)) => self.vicinity = v,
            (F::PrimaryActivity, Text(v)) => self.primary_activity = v,
            (F::Category, Text(v)) => self.category = v,
            (F::Source, Text(v)) => self.source = v,
            (F::FoundationDate, Date(d)) => self.foundation_date = Some(d),
            (F::Rating, Float(v)) => self.rating = v,
            (F::UserRatingsTotal, Integer(v)) => self.user_ratings_total = v,
            (F::PriceLevel, Integer(v)) => self.price_level = v,
            (F::Radius, Integer(v)) => self.radius = v,
            (F::PermanentlyClosed, Bool(v)) => self.permanently_closed = v,
            (field, _) => {
                return Err(PatchError::TypeMismatch {
                    field: field.wire_name().to_string(),
                    expected: field.kind().expected(),
                })
            }
        }
        Ok(true)
    }

    /// Current value of a field, for writing a single column back.
    /// `None` only for an unset foundation date.
    pub fn field_value(&self, field: LeadField) -> Option<FieldValue> {
        use FieldValue::*;
        use LeadField as F;

        let value = match field {
            F::BusinessName => Text(self.business_name.clone()),
            F::RegisteredName => Text(self.registered_name.clone()),
            F::FoundationDate => return self.foundation_date.map(Date),
            F::Address => Text(self.address.clone()),
            F::City => Text(self.city.clone()),
            F::State => Text(self.state.clone()),
            F::Country => Text(self.country.clone()),
            F::ZipCode => Text(self.zip_code.clone()),
            F::Owner => Text(self.owner.clone()),
            F::Phone => Text(self.phone.clone()),
            F::Whatsapp => Text(self.whatsapp.clone()),
            F::Website => Text(self.website.clone()),
            F::Email => Text(self.email.clone()),
            F::Instagram => Text(self.instagram.clone()),
            F::Facebook => Text(self.facebook.clone()),
            F::TikTok => Text(self.tiktok.clone()),
            F::CompanyRegistrationId => Text(self.company_registration_id.clone()),
            F::Categories => Text(self.categories.clone()),
            F::Rating => Float(self.rating),
            F::UserRatingsTotal => Integer(self.user_ratings_total),
            F::PriceLevel => Integer(self.price_level),
            F::BusinessStatus => Text(self.business_status.clone()),
            F::Vicinity => Text(self.vicinity.clone()),
            F::PermanentlyClosed => Bool(self.permanently_closed),
            F::Description => Text(self.description.clone()),
            F::PrimaryActivity => Text(self.primary_activity.clone()),
            F::Category => Text(self.category.clone()),
            F::Radius => Integer(self.radius),
            F::Source => Text(self.source.clone()),
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::leads::models::NewLead;
    use serde_json::json;

    fn lead() -> Lead {
        Lead::from_new(
            NewLead {
                external_id: "p1".to_string(),
                business_name: "Padaria".to_string(),
                ..Default::default()
            },
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_parse_accepts_wire_and_column_names() {
        assert_eq!(LeadField::parse("RegisteredName").unwrap(), LeadField::RegisteredName);
        assert_eq!(LeadField::parse("registered_name").unwrap(), LeadField::RegisteredName);
        assert_eq!(
            LeadField::parse("CompanyRegistrationID").unwrap(),
            LeadField::CompanyRegistrationId
        );
        assert_eq!(LeadField::parse("ZIPCode").unwrap(), LeadField::ZipCode);
    }

    #[test]
    fn test_identity_fields_are_unknown() {
        for name in ["id", "ID", "external_id", "GoogleId", "created_at", "UpdatedAt", "published_at", "Nope"] {
            assert!(
                matches!(LeadField::parse(name), Err(PatchError::UnknownField(_))),
                "{name} should not be patchable"
            );
        }
    }

    #[test]
    fn test_coerce_checks_kind() {
        assert_eq!(
            FieldValue::coerce(LeadField::Rating, &json!(4.5)).unwrap(),
            FieldValue::Float(4.5)
        );
        assert_eq!(
            FieldValue::coerce(LeadField::PriceLevel, &json!(2.0)).unwrap(),
            FieldValue::Integer(2)
        );
        assert!(matches!(
            FieldValue::coerce(LeadField::PriceLevel, &json!(2.5)),
            Err(PatchError::TypeMismatch { .. })
        ));
        assert!(matches!(
            FieldValue::coerce(LeadField::Owner, &json!(12)),
            Err(PatchError::TypeMismatch { .. })
        ));
        assert!(matches!(
            FieldValue::coerce(LeadField::PermanentlyClosed, &json!("yes")),
            Err(PatchError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_coerce_date_requires_iso_format() {
        assert_eq!(
            FieldValue::coerce(LeadField::FoundationDate, &json!("2001-03-15")).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2001, 3, 15).unwrap())
        );
        assert!(matches!(
            FieldValue::coerce(LeadField::FoundationDate, &json!("15/03/2001")),
            Err(PatchError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_description_appends_with_newline() {
        let mut lead = lead();
        lead.apply_patch(LeadField::Description, FieldValue::Text("A".into()))
            .unwrap();
        lead.apply_patch(LeadField::Description, FieldValue::Text("B".into()))
            .unwrap();
        assert_eq!(lead.description, "A\nB");
    }

    #[test]
    fn test_description_placeholder_is_noop() {
        let mut lead = lead();
        lead.description = "A".to_string();

        let changed = lead
            .apply_patch(
                LeadField::Description,
                FieldValue::Text(" No Description Available ".into()),
            )
            .unwrap();

        assert!(!changed);
        assert_eq!(lead.description, "A");
    }

    #[test]
    fn test_description_mentioning_placeholder_is_appended() {
        let mut lead = lead();
        lead.description = "A".to_string();
        let text = "Family bakery. No description available on the old site.";

        let changed = lead
            .apply_patch(LeadField::Description, FieldValue::Text(text.into()))
            .unwrap();

        assert!(changed);
        assert_eq!(lead.description, format!("A\n{}", text));
    }

    #[test]
    fn test_other_fields_overwrite() {
        let mut lead = lead();
        lead.apply_patch(LeadField::Website, FieldValue::Text("https://a".into()))
            .unwrap();
        lead.apply_patch(LeadField::Website, FieldValue::Text("https://b".into()))
            .unwrap();
        assert_eq!(lead.website, "https://b");
        assert_eq!(
            lead.field_value(LeadField::Website),
            Some(FieldValue::Text("https://b".into()))
        );
    }

    #[test]
    fn test_every_field_round_trips_through_table() {
        for (field, wire, column, _) in FIELD_TABLE {
            assert_eq!(LeadField::parse(wire).unwrap(), *field);
            assert_eq!(LeadField::parse(column).unwrap(), *field);
            assert_eq!(field.column(), *column);
        }
    }
}
