//! Scan session: one verification attempt's user-supplied evidence

use super::product::{ImageBlob, ImageRole, ProductType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Something a session still needs before it can be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Requirement {
    Image(ImageRole),
    RegistrationCode,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Image(role) => write!(f, "{} image", role),
            Requirement::RegistrationCode => f.write_str("registration code"),
        }
    }
}

/// Images and registration code gathered for one verification attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSession {
    pub session_id: Uuid,
    pub product_name: String,
    pub product_type: ProductType,
    registration_code: String,
    images: BTreeMap<ImageRole, ImageBlob>,
    pub created_at: DateTime<Utc>,
}

impl ScanSession {
    pub fn new(product_name: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            product_name: product_name.into().trim().to_string(),
            product_type,
            registration_code: String::new(),
            images: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn registration_code(&self) -> &str {
        &self.registration_code
    }

    /// Store the code trimmed and uppercased. Blank input clears it.
    pub fn set_registration_code(&mut self, text: &str) {
        self.registration_code = text.trim().to_uppercase();
    }

    pub fn image(&self, role: ImageRole) -> Option<&ImageBlob> {
        self.images.get(&role)
    }

    pub fn images(&self) -> &BTreeMap<ImageRole, ImageBlob> {
        &self.images
    }

    pub(crate) fn insert_image(&mut self, role: ImageRole, blob: ImageBlob) -> Option<ImageBlob> {
        self.images.insert(role, blob)
    }

    pub(crate) fn remove_image(&mut self, role: ImageRole) -> Option<ImageBlob> {
        self.images.remove(&role)
    }

    pub fn is_satisfied(&self, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Image(role) => self.images.contains_key(&role),
            Requirement::RegistrationCode => !self.registration_code.is_empty(),
        }
    }

    /// Unmet requirements, in capture order
    pub fn missing_requirements(&self) -> Vec<Requirement> {
        let mut missing: Vec<Requirement> = self
            .product_type
            .required_roles()
            .iter()
            .map(|role| Requirement::Image(*role))
            .filter(|r| !self.is_satisfied(*r))
            .collect();
        if !self.is_satisfied(Requirement::RegistrationCode) {
            // Code is entered right after the package photo
            let position = missing
                .iter()
                .position(|r| *r != Requirement::Image(ImageRole::Package))
                .unwrap_or(missing.len());
            missing.insert(position, Requirement::RegistrationCode);
        }
        missing
    }

    /// Every required image present and the registration code non-empty
    pub fn is_complete(&self) -> bool {
        self.missing_requirements().is_empty()
    }
}
