//! Saved shipping addresses.

use chrono::{DateTime, Utc};

use vivero_core::{AddressId, UserId};

use super::{MissingField, non_blank, require};

/// A saved shipping address belonging to one user.
#[derive(Debug, Clone)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Short name chosen by the user ("Casa", "Trabajo").
    pub label: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub notes: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Single-line form stored on orders as the shipping snapshot.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = format!(
            "{}, {} ({}), {}",
            self.street, self.city, self.postal_code, self.province
        );
        if let Some(notes) = &self.notes {
            line.push_str(" - ");
            line.push_str(notes);
        }
        line
    }
}

/// Address form input.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub label: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub notes: Option<String>,
    pub is_default: bool,
}

impl AddressInput {
    /// Trim every field and drop a blank `notes`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            label: self.label.trim().to_owned(),
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            province: self.province.trim().to_owned(),
            postal_code: self.postal_code.trim().to_owned(),
            notes: non_blank(self.notes),
            is_default: self.is_default,
        }
    }

    /// # Errors
    ///
    /// Returns the first required field left blank.
    pub fn validate(&self) -> Result<(), MissingField> {
        require("label", &self.label)?;
        require("street", &self.street)?;
        require("city", &self.city)?;
        require("province", &self.province)?;
        require("postal_code", &self.postal_code)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            label: "Casa".to_owned(),
            street: "Av. Rivadavia 1234".to_owned(),
            city: "CABA".to_owned(),
            province: "Buenos Aires".to_owned(),
            postal_code: "C1406".to_owned(),
            notes: Some("  ".to_owned()),
            is_default: true,
        }
    }

    #[test]
    fn test_validate_missing_street() {
        let mut address = input();
        address.street = " ".to_owned();
        assert_eq!(
            address.normalized().validate(),
            Err(MissingField { field: "street" })
        );
    }

    #[test]
    fn test_normalized_drops_blank_notes() {
        let address = input().normalized();
        assert_eq!(address.notes, None);
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_one_line() {
        let now = Utc::now();
        let address = Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            label: "Casa".to_owned(),
            street: "Av. Rivadavia 1234".to_owned(),
            city: "CABA".to_owned(),
            province: "Buenos Aires".to_owned(),
            postal_code: "C1406".to_owned(),
            notes: Some("Timbre 2B".to_owned()),
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            address.one_line(),
            "Av. Rivadavia 1234, CABA (C1406), Buenos Aires - Timbre 2B"
        );
    }
}
