use serde::{Deserialize, Serialize};

use crate::types::{
    EMAIL_MAX_LEN, ID_SIZE, ROW_SIZE, RowId, USERNAME_MAX_LEN,
    error::{EngineError, Result},
};

/// One record of the fixed schema: integer primary key plus two bounded
/// text fields. The serialized form is always exactly `ROW_SIZE` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: RowId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Serialize into the fixed on-page layout: id (8 bytes LE), then the
    /// text fields NUL-padded to their maximum widths. The key leads the
    /// block so cells can be compared by raw prefix without deserializing.
    pub fn to_bytes(&self) -> Result<[u8; ROW_SIZE]> {
        if self.username.len() > USERNAME_MAX_LEN {
            return Err(EngineError::Validation {
                field: "username",
                max: USERNAME_MAX_LEN,
                actual: self.username.len(),
            });
        }
        if self.email.len() > EMAIL_MAX_LEN {
            return Err(EngineError::Validation {
                field: "email",
                max: EMAIL_MAX_LEN,
                actual: self.email.len(),
            });
        }

        let mut buffer = [0u8; ROW_SIZE];
        buffer[..ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        buffer[ID_SIZE..ID_SIZE + self.username.len()].copy_from_slice(self.username.as_bytes());
        let email_start = ID_SIZE + USERNAME_MAX_LEN;
        buffer[email_start..email_start + self.email.len()].copy_from_slice(self.email.as_bytes());
        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ROW_SIZE {
            return Err(EngineError::InvalidPageSize {
                expected: ROW_SIZE,
                actual: bytes.len(),
            });
        }

        let id = Self::key_of(bytes);
        let username = decode_text(&bytes[ID_SIZE..ID_SIZE + USERNAME_MAX_LEN], "username")?;
        let email_start = ID_SIZE + USERNAME_MAX_LEN;
        let email = decode_text(&bytes[email_start..email_start + EMAIL_MAX_LEN], "email")?;

        Ok(Row {
            id,
            username,
            email,
        })
    }

    /// Read the primary key from a serialized cell without decoding the
    /// rest of the row. Callers must hand in at least `ID_SIZE` bytes.
    pub fn key_of(bytes: &[u8]) -> RowId {
        RowId::from_le_bytes(bytes[..ID_SIZE].try_into().unwrap())
    }
}

fn decode_text(field: &[u8], name: &'static str) -> Result<String> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec()).map_err(|_| EngineError::CorruptedDatabase {
        reason: format!("field '{name}' holds invalid UTF-8"),
    })
}
