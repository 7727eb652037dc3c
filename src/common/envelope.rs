// src/common/envelope.rs

use serde::Serialize;

/// Uniform JSON body of every successful API response: `{ success, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omits_empty_fields() {
        let body = serde_json::to_value(Envelope::ok(vec![1, 2])).unwrap();
        assert_eq!(body, json!({ "success": true, "data": [1, 2] }));

        let body = serde_json::to_value(Envelope::message("done")).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "done" }));
    }
}
