use serde::{Deserialize, Serialize};

/// Rejection reason returned to the host shell when a command fails.
///
/// Mirrors the `{code, message}` shape a plugin call rejects with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: String,
    pub message: String,
}

impl Rejection {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_json_shape() {
        let r = Rejection::new("NOT_FOUND", "Invalid or missing uploadId");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Invalid or missing uploadId");
    }
}
