pub mod human;

use serde_json::{Value, json};

/// Standard JSON envelope every command prints.
pub fn success(command: &str, data: Value) -> Value {
    json!({
        "status": "ok",
        "command": command,
        "data": data,
        "error": null
    })
}

pub fn error(command: &str, code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "command": command,
        "data": null,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Machine-readable code for a library error.
pub fn error_code(err: &crate::Error) -> &'static str {
    use crate::Error;
    match err {
        Error::Storage(_) => "storage_error",
        Error::Notifier(_) => "notifier_error",
        Error::Codec(_) => "corrupt_document",
        Error::InvalidTime(_) => "invalid_time",
        Error::InvalidMedication(_) => "invalid_medication",
        Error::MedicationNotFound(_) => "medication_not_found",
    }
}
