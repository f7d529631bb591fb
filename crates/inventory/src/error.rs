use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InventoryError {
    #[error("invalid inventory parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl InventoryError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
