use crate::entities::{LocationRef, TransactionType};
use crate::errors::{LineFailure, ServiceError};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use validator::Validate;

/// One line of a movement submission as received from a collaborator:
/// a serial number, or a bulk model id with a quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 128, message = "Serial number must be 1-128 characters"))]
    pub serial_number: Option<String>,

    pub model_id: Option<i64>,

    #[validate(range(min = 1, max = 1000000, message = "Quantity must be between 1 and 1000000"))]
    pub quantity: Option<i32>,
}

impl LineItemRequest {
    pub fn serial(serial: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial.into()),
            ..Default::default()
        }
    }

    pub fn bulk(model_id: i64, quantity: i32) -> Self {
        Self {
            model_id: Some(model_id),
            quantity: Some(quantity),
            ..Default::default()
        }
    }
}

/// A parsed line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineItem {
    Serialized { serial: String },
    Bulk { model_id: i64, quantity: i32 },
}

impl LineItem {
    /// Value used to spot the same target cited twice in one submission.
    pub fn target(&self) -> LineTarget {
        match self {
            LineItem::Serialized { serial } => LineTarget::Serial(serial.clone()),
            LineItem::Bulk { model_id, .. } => LineTarget::Model(*model_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LineTarget {
    Serial(String),
    Model(i64),
}

impl std::fmt::Display for LineTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineTarget::Serial(serial) => write!(f, "serial {}", serial),
            LineTarget::Model(model_id) => write!(f, "model {}", model_id),
        }
    }
}

impl TryFrom<&LineItemRequest> for LineItem {
    type Error = ServiceError;

    fn try_from(line: &LineItemRequest) -> Result<Self, Self::Error> {
        line.validate()?;

        match (&line.serial_number, line.model_id, line.quantity) {
            (Some(serial), _, None) | (Some(serial), _, Some(1)) => Ok(LineItem::Serialized {
                serial: normalize_serial(serial)?,
            }),
            (Some(serial), _, Some(quantity)) => Err(ServiceError::ValidationError(format!(
                "serialized device {} cannot move quantity {}",
                serial, quantity
            ))),
            (None, Some(model_id), Some(quantity)) => Ok(LineItem::Bulk { model_id, quantity }),
            (None, Some(model_id), None) => Err(ServiceError::ValidationError(format!(
                "model {} needs a quantity",
                model_id
            ))),
            (None, None, _) => Err(ServiceError::ValidationError(
                "line item needs a serial number or a model id".to_string(),
            )),
        }
    }
}

/// Trims a serial number; one that is blank after trimming is rejected.
pub fn normalize_serial(serial: &str) -> Result<String, ServiceError> {
    let trimmed = serial.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(
            "serial number cannot be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Parses every line, collecting all malformed lines into one rejection.
pub fn parse_lines(lines: &[LineItemRequest]) -> Result<Vec<LineItem>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "submission has no line items".to_string(),
        ));
    }

    let mut parsed = Vec::with_capacity(lines.len());
    let mut failures = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        match LineItem::try_from(line) {
            Ok(item) => parsed.push(item),
            Err(error) => failures.push(LineFailure::new(index, error)),
        }
    }

    if failures.is_empty() {
        Ok(parsed)
    } else {
        Err(ServiceError::Rejected(failures))
    }
}

/// A stock-changing submission other than procurement.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MovementRequest {
    pub transaction_type: TransactionType,
    pub source: Option<LocationRef>,
    pub destination: Option<LocationRef>,
    #[validate(length(max = 1000, message = "Note cannot exceed 1000 characters"))]
    pub note: Option<String>,
    pub lines: Vec<LineItemRequest>,
}

impl MovementRequest {
    pub fn new(
        transaction_type: TransactionType,
        source: Option<LocationRef>,
        destination: Option<LocationRef>,
        lines: Vec<LineItemRequest>,
    ) -> Self {
        Self {
            transaction_type,
            source,
            destination,
            note: None,
            lines,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One line of a procurement receipt. Serialized models need a serial
/// number per line; bulk models need a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProcurementLineRequest {
    pub model_id: i64,

    #[validate(length(min = 1, max = 128, message = "Serial number must be 1-128 characters"))]
    pub serial_number: Option<String>,

    #[validate(range(min = 1, max = 1000000, message = "Quantity must be between 1 and 1000000"))]
    pub quantity: Option<i32>,
}

impl ProcurementLineRequest {
    pub fn serial(model_id: i64, serial: impl Into<String>) -> Self {
        Self {
            model_id,
            serial_number: Some(serial.into()),
            quantity: None,
        }
    }

    pub fn bulk(model_id: i64, quantity: i32) -> Self {
        Self {
            model_id,
            serial_number: None,
            quantity: Some(quantity),
        }
    }
}

/// Receipt of newly bought devices into a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcurementRequest {
    pub warehouse_id: i64,
    #[validate(length(max = 1000, message = "Note cannot exceed 1000 characters"))]
    pub note: Option<String>,
    pub lines: Vec<ProcurementLineRequest>,
}

impl ProcurementRequest {
    pub fn new(warehouse_id: i64, lines: Vec<ProcurementLineRequest>) -> Self {
        Self {
            warehouse_id,
            note: None,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use assert_matches::assert_matches;

    #[test]
    fn serial_line_parses_and_trims() {
        let item = LineItem::try_from(&LineItemRequest::serial(" SN-1 ")).unwrap();
        assert_eq!(
            item,
            LineItem::Serialized {
                serial: "SN-1".into()
            }
        );
    }

    #[test]
    fn blank_serial_is_rejected() {
        assert_matches!(
            LineItem::try_from(&LineItemRequest::serial("   ")),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(normalize_serial("\t"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn oversized_quantity_is_rejected() {
        assert_matches!(
            LineItem::try_from(&LineItemRequest::bulk(4, 1_000_001)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            LineItem::try_from(&LineItemRequest::bulk(4, 1_000_000)),
            Ok(LineItem::Bulk { quantity: 1_000_000, .. })
        );
    }

    #[test]
    fn serial_line_rejects_quantity_above_one() {
        let line = LineItemRequest {
            serial_number: Some("SN-1".into()),
            quantity: Some(2),
            ..Default::default()
        };
        assert_matches!(
            LineItem::try_from(&line),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn bulk_line_needs_positive_quantity() {
        assert_matches!(
            LineItem::try_from(&LineItemRequest::bulk(4, 0)),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            LineItem::try_from(&LineItemRequest::bulk(4, 3)),
            Ok(LineItem::Bulk {
                model_id: 4,
                quantity: 3
            })
        );
    }

    #[test]
    fn parse_lines_reports_every_malformed_line() {
        let err = parse_lines(&[
            LineItemRequest::default(),
            LineItemRequest::serial("SN-2"),
            LineItemRequest {
                model_id: Some(8),
                ..Default::default()
            },
        ])
        .unwrap_err();

        let lines: Vec<usize> = err.line_failures().iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![0, 2]);
        assert_eq!(err.kinds(), vec![ErrorKind::Validation, ErrorKind::Validation]);
    }

    #[test]
    fn empty_submission_is_invalid() {
        assert_matches!(parse_lines(&[]), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn targets_identify_duplicates() {
        let a = LineItem::Bulk {
            model_id: 3,
            quantity: 1,
        };
        let b = LineItem::Bulk {
            model_id: 3,
            quantity: 5,
        };
        assert_eq!(a.target(), b.target());
        assert_eq!(a.target().to_string(), "model 3");
    }
}
