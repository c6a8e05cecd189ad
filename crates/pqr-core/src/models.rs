//! Data models for PQR records
//!
//! Defines the core data structures: `PqrRecord`, `Comment`, and `PqrStatus`.
//! Records are persisted as one JSON array; field names on the wire keep the
//! original camelCase Spanish names so existing data stays readable.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Workflow status of a record
///
/// Transitions are unconstrained: an editor may set any status at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PqrStatus {
    #[default]
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "En Proceso")]
    InProgress,
    #[serde(rename = "Autorizado")]
    Authorized,
    #[serde(rename = "Rechazado")]
    Rejected,
}

impl PqrStatus {
    pub const ALL: [PqrStatus; 4] = [
        PqrStatus::Pending,
        PqrStatus::InProgress,
        PqrStatus::Authorized,
        PqrStatus::Rejected,
    ];

    /// Label shown to operators and stored on disk
    pub fn label(&self) -> &'static str {
        match self {
            PqrStatus::Pending => "Pendiente",
            PqrStatus::InProgress => "En Proceso",
            PqrStatus::Authorized => "Autorizado",
            PqrStatus::Rejected => "Rechazado",
        }
    }
}

impl fmt::Display for PqrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PqrStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "pendiente" | "pending" => Ok(PqrStatus::Pending),
            "en proceso" | "in progress" => Ok(PqrStatus::InProgress),
            "autorizado" | "authorized" => Ok(PqrStatus::Authorized),
            "rechazado" | "rejected" => Ok(PqrStatus::Rejected),
            _ => Err(format!(
                "Unknown status '{}'. Valid: Pendiente, En Proceso, Autorizado, Rechazado",
                s
            )),
        }
    }
}

/// A comment in a record's chronological trace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique within the owning record
    pub id: String,
    pub text: String,
    /// Author email
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a comment stamped with the current time
    pub fn new(text: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: format!("comment-{}", Uuid::new_v4()),
            text: text.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }
}

/// A file selected when the record was filed.
///
/// Held in memory only; attachments are never written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub size: u64,
}

impl Attachment {
    /// File name component, or the whole path if it has none
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Validation failure for a draft record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),
}

/// A claim/complaint record
///
/// A record with an empty `id` is a draft; the store assigns the id on
/// creation and it never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PqrRecord {
    /// `PQR-0001` style identifier
    #[serde(default)]
    pub id: String,

    // ---- descriptive fields, filled in at creation ----
    #[serde(rename = "pedido")]
    pub order: String,
    #[serde(rename = "despacho")]
    pub dispatch: String,
    #[serde(rename = "transportador")]
    pub carrier: String,
    #[serde(rename = "guia")]
    pub waybill: String,
    pub item: String,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "oc")]
    pub purchase_order: String,
    #[serde(rename = "descripcionItem")]
    pub item_description: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "lineaNegocio")]
    pub business_line: String,
    #[serde(rename = "tipoPQR")]
    pub claim_type: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    // ---- workflow fields, edited during handling ----
    #[serde(rename = "estado", default)]
    pub status: PqrStatus,
    #[serde(
        rename = "autorizadoPor",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub authorized_by: Option<String>,
    #[serde(
        rename = "fechaAutorizacion",
        default,
        deserialize_with = "lenient::date",
        skip_serializing_if = "Option::is_none"
    )]
    pub authorization_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "ocReemplazo",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub replacement_po: Option<String>,
    #[serde(
        rename = "despachoReemplazo",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub replacement_dispatch: Option<String>,
    #[serde(
        rename = "guiaRecoleccion",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub pickup_waybill: Option<String>,
    #[serde(
        rename = "valorDeclarado",
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub declared_value: Option<f64>,
    #[serde(
        rename = "valorFlete",
        default,
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub freight_value: Option<f64>,
    #[serde(
        rename = "fechaNC",
        default,
        deserialize_with = "lenient::date",
        skip_serializing_if = "Option::is_none"
    )]
    pub credit_note_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "doc",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub document: Option<String>,
    #[serde(
        rename = "ocSalvamento",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub salvage_po: Option<String>,
    #[serde(
        rename = "estadoMercancia",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub merchandise_condition: Option<String>,
    #[serde(
        rename = "fisico",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub physical: Option<String>,
    #[serde(
        rename = "guiaSalvamento",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub salvage_waybill: Option<String>,
    #[serde(
        rename = "estadoFinal",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_status: Option<String>,

    /// Append-only trace, oldest first
    #[serde(default, deserialize_with = "lenient::list")]
    pub comments: Vec<Comment>,

    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

impl PqrRecord {
    /// Start a draft filed by `created_by`
    ///
    /// Status starts as `Pendiente`; declared and freight values start at
    /// zero, matching what the intake form records.
    pub fn draft(created_by: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            order: String::new(),
            dispatch: String::new(),
            carrier: String::new(),
            waybill: String::new(),
            item: String::new(),
            quantity: 0,
            purchase_order: String::new(),
            item_description: String::new(),
            description: String::new(),
            business_line: String::new(),
            claim_type: String::new(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            status: PqrStatus::Pending,
            authorized_by: None,
            authorization_date: None,
            replacement_po: None,
            replacement_dispatch: None,
            pickup_waybill: None,
            declared_value: Some(0.0),
            freight_value: Some(0.0),
            credit_note_date: None,
            document: None,
            salvage_po: None,
            merchandise_condition: None,
            physical: None,
            salvage_waybill: None,
            final_status: None,
            comments: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Check the fields the intake form requires
    ///
    /// The store never calls this; callers validate before `create`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required: [(&'static str, &str); 11] = [
            ("email", &self.created_by),
            ("pedido", &self.order),
            ("despacho", &self.dispatch),
            ("transportador", &self.carrier),
            ("guia", &self.waybill),
            ("item", &self.item),
            ("oc", &self.purchase_order),
            ("descripcionItem", &self.item_description),
            ("descripcion", &self.description),
            ("lineaNegocio", &self.business_line),
            ("tipoPQR", &self.claim_type),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }

        if !looks_like_email(&self.created_by) {
            return Err(ValidationError::InvalidEmail(self.created_by.clone()));
        }

        Ok(())
    }

    /// Append a comment to the trace and return a copy of it
    pub fn add_comment(
        &mut self,
        text: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<Comment, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::MissingField("text"));
        }
        let comment = Comment::new(text, author);
        self.comments.push(comment.clone());
        Ok(comment)
    }

    /// Attach a file selected at filing time
    pub fn attach(&mut self, path: impl Into<PathBuf>, size: u64) {
        self.attachments.push(Attachment {
            path: path.into(),
            size,
        });
    }

    /// Whether `term` (already lowercased) occurs in a searchable field
    ///
    /// Searchable fields are the id, order, carrier and purchase order.
    pub fn matches_term(&self, lowered_term: &str) -> bool {
        [
            &self.id,
            &self.order,
            &self.carrier,
            &self.purchase_order,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(lowered_term))
    }
}

/// Readers for workflow values saved loosely by the web intake screens
///
/// Its edit form stored every input as typed: amounts as strings, cleared
/// inputs as `""`. These accept that alongside the canonical form.
mod lenient {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    /// Blank text is absent
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
    }

    /// A number, a numeric string, `""` or null
    pub fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<NumberOrText>::deserialize(d)? {
            None => Ok(None),
            Some(NumberOrText::Number(n)) => Ok(Some(n)),
            Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(NumberOrText::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid amount '{}'", s))),
        }
    }

    /// RFC 3339, a bare `YYYY-MM-DD` (midnight UTC), `""` or null
    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(s) = text(d)? else {
            return Ok(None);
        };
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|dt| Some(dt.and_utc()))
            .ok_or_else(|| D::Error::custom(format!("invalid date '{}'", s)))
    }

    /// Null is an empty list
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }
}

/// Minimal shape check: something@something
fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filled_draft() -> PqrRecord {
        let mut draft = PqrRecord::draft("jdoe@example.com");
        draft.order = "ORD-1".to_string();
        draft.dispatch = "DSP-1".to_string();
        draft.carrier = "ACME".to_string();
        draft.waybill = "WB-1".to_string();
        draft.item = "SKU-9".to_string();
        draft.quantity = 3;
        draft.purchase_order = "OC-77".to_string();
        draft.item_description = "Steel bolts".to_string();
        draft.description = "Box arrived crushed".to_string();
        draft.business_line = "Línea 1".to_string();
        draft.claim_type = "Avería".to_string();
        draft
    }

    #[test]
    fn test_draft_defaults() {
        let draft = PqrRecord::draft("jdoe@example.com");
        assert!(draft.id.is_empty());
        assert_eq!(draft.status, PqrStatus::Pending);
        assert!(draft.comments.is_empty());
        assert_eq!(draft.declared_value, Some(0.0));
        assert_eq!(draft.freight_value, Some(0.0));
        assert!(draft.authorized_by.is_none());
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        assert_eq!(filled_draft().validate(), Ok(()));
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let mut draft = filled_draft();
        draft.order = "   ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::MissingField("pedido")));

        let mut draft = filled_draft();
        draft.description.clear();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingField("descripcion"))
        );
    }

    #[test]
    fn test_validate_email_shape() {
        let mut draft = filled_draft();
        draft.created_by = "not-an-email".to_string();
        assert!(matches!(
            draft.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_status_labels_and_parsing() {
        for status in PqrStatus::ALL {
            assert_eq!(status.label().parse::<PqrStatus>(), Ok(status));
        }
        assert_eq!("en-proceso".parse::<PqrStatus>(), Ok(PqrStatus::InProgress));
        assert_eq!("AUTORIZADO".parse::<PqrStatus>(), Ok(PqrStatus::Authorized));
        assert!("cerrado".parse::<PqrStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_with_label() {
        let json = serde_json::to_string(&PqrStatus::InProgress).unwrap();
        assert_eq!(json, "\"En Proceso\"");
    }

    #[test]
    fn test_add_comment_appends_in_order() {
        let mut record = filled_draft();
        record.add_comment("first", "a@example.com").unwrap();
        record.add_comment("second", "b@example.com").unwrap();

        let texts: Vec<_> = record.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_ne!(record.comments[0].id, record.comments[1].id);
        assert!(record.comments[0].id.starts_with("comment-"));
    }

    #[test]
    fn test_add_comment_rejects_blank_text() {
        let mut record = filled_draft();
        assert!(record.add_comment("  \n", "a@example.com").is_err());
        assert!(record.comments.is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let record = filled_draft();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["pedido"], "ORD-1");
        assert_eq!(value["transportador"], "ACME");
        assert_eq!(value["oc"], "OC-77");
        assert_eq!(value["estado"], "Pendiente");
        assert_eq!(value["cantidad"], 3);
        assert!(value.get("autorizadoPor").is_none());
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "id": "PQR-0001",
            "pedido": "ORD-1", "despacho": "D", "transportador": "T",
            "guia": "G", "item": "I", "cantidad": 1, "oc": "OC",
            "descripcionItem": "DI", "descripcion": "DE",
            "lineaNegocio": "L", "tipoPQR": "Avería",
            "createdBy": "x@example.com",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "estado": "Pendiente"
        }"#;

        let record: PqrRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "PQR-0001");
        assert!(record.comments.is_empty());
        assert!(record.declared_value.is_none());
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_reads_loosely_typed_workflow_fields() {
        let json = r#"{
            "id": "PQR-0003",
            "pedido": "ORD-3", "despacho": "D", "transportador": "T",
            "guia": "G", "item": "I", "cantidad": 2, "oc": "OC",
            "descripcionItem": "DI", "descripcion": "DE",
            "lineaNegocio": "L", "tipoPQR": "Pérdida",
            "createdBy": "x@example.com",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "estado": "En Proceso",
            "autorizadoPor": "",
            "fechaAutorizacion": "2024-03-05",
            "valorDeclarado": "150",
            "valorFlete": "",
            "fechaNC": "",
            "ocReemplazo": "",
            "archivos": [{}],
            "comments": null
        }"#;

        let record: PqrRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, PqrStatus::InProgress);
        assert_eq!(record.declared_value, Some(150.0));
        assert!(record.freight_value.is_none());
        assert!(record.authorized_by.is_none());
        assert!(record.replacement_po.is_none());
        assert!(record.credit_note_date.is_none());
        assert_eq!(
            record.authorization_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert!(record.comments.is_empty());
        assert!(record.attachments.is_empty());

        // Saved back in canonical form
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["valorDeclarado"], 150.0);
        assert!(value.get("valorFlete").is_none());
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let json = r#"{
            "id": "PQR-0004",
            "pedido": "ORD-4", "despacho": "D", "transportador": "T",
            "guia": "G", "item": "I", "cantidad": 1, "oc": "OC",
            "descripcionItem": "DI", "descripcion": "DE",
            "lineaNegocio": "L", "tipoPQR": "Avería",
            "createdBy": "x@example.com",
            "createdAt": "2024-03-01T10:00:00.000Z",
            "estado": "Pendiente",
            "valorDeclarado": "ciento"
        }"#;

        assert!(serde_json::from_str::<PqrRecord>(json).is_err());
    }

    #[test]
    fn test_attachments_are_not_serialized() {
        let mut record = filled_draft();
        record.attach("/tmp/photo.jpg", 2048);
        assert_eq!(record.attachments[0].name(), "photo.jpg");

        let json = serde_json::to_string(&record).unwrap();
        let reloaded: PqrRecord = serde_json::from_str(&json).unwrap();
        assert!(reloaded.attachments.is_empty());
    }

    #[test]
    fn test_matches_term_only_searchable_fields() {
        let mut record = filled_draft();
        record.id = "PQR-0042".to_string();

        assert!(record.matches_term("acme"));
        assert!(record.matches_term("pqr-004"));
        assert!(record.matches_term("oc-7"));
        assert!(record.matches_term("ord"));
        assert!(!record.matches_term("crushed"));
        assert!(!record.matches_term("sku"));
    }
}
