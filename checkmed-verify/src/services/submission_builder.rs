//! Multipart payloads for the verification service
//!
//! Field mapping:
//!
//! | operation | product | fields |
//! |---|---|---|
//! | verify | tablet | drug_name, drug_type, nafdac_number, box_image, blister_pack_image |
//! | verify | syrup | drug_name, nafdac_number, box_image |
//! | register | any | drug_name, drug_type, nafdac_number, manufacturer, box_image, [blister_pack_image (tablet)], [barcode] |
//! | report | any | drug_name, nafdac_number, reason, location, [box_image], [blister_pack_image] |
//!
//! Payloads are built right before a call and never persisted. No validation of
//! code format or image content happens here; that is the service's job.

use crate::error::{Error, Result};
use crate::models::{ImageBlob, ImageRole, ProductType, ReportRecord, ScanSession};
use std::fmt;

/// Remote endpoint, relative to the service base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Verify,
    RegisterDrug,
    Report,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Verify => "verify/",
            Endpoint::RegisterDrug => "register-drug/",
            Endpoint::Report => "report/",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Extra product-registration data not captured by a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub manufacturer: String,
    pub barcode: Option<String>,
}

/// What a session is being submitted for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Verify,
    Register(RegistrationRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Image(ImageBlob),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadField {
    pub name: &'static str,
    pub value: FieldValue,
}

/// Ordered multipart fields bound for one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    endpoint: Endpoint,
    fields: Vec<PayloadField>,
}

impl SubmissionPayload {
    fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            fields: Vec::new(),
        }
    }

    fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push(PayloadField {
            name,
            value: FieldValue::Text(value.into()),
        });
        self
    }

    fn image(mut self, role: ImageRole, blob: Option<&ImageBlob>) -> Self {
        if let Some(blob) = blob {
            self.fields.push(PayloadField {
                name: role.form_field(),
                value: FieldValue::Image(blob.clone()),
            });
        }
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn fields(&self) -> &[PayloadField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldValue::Text(text) if f.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn image_value(&self, name: &str) -> Option<&ImageBlob> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldValue::Image(blob) if f.name == name => Some(blob),
            _ => None,
        })
    }

    /// Convert into a `reqwest` multipart form, preserving field order
    pub fn into_form(self) -> reqwest::Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for field in self.fields {
            form = match field.value {
                FieldValue::Text(text) => form.text(field.name, text),
                FieldValue::Image(blob) => {
                    let file_name = blob
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| field.name.to_string());
                    let media_type = blob.media_type().to_string();
                    let part = reqwest::multipart::Part::bytes(blob.bytes().to_vec())
                        .file_name(file_name)
                        .mime_str(&media_type)?;
                    form.part(field.name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Build the payload for submitting `session` as `operation`.
///
/// Fails with `IncompleteSession` unless the session is complete, and with
/// `MissingManufacturer` for a registration without one.
pub fn build(session: &ScanSession, operation: &Operation) -> Result<SubmissionPayload> {
    let missing = session.missing_requirements();
    if !missing.is_empty() {
        return Err(Error::IncompleteSession { missing });
    }

    let package = session.image(ImageRole::Package);
    let blister = session.image(ImageRole::BlisterPack);

    let payload = match operation {
        Operation::Verify => match session.product_type {
            ProductType::Tablet => SubmissionPayload::new(Endpoint::Verify)
                .text("drug_name", session.product_name.as_str())
                .text("drug_type", session.product_type.as_str())
                .text("nafdac_number", session.registration_code())
                .image(ImageRole::Package, package)
                .image(ImageRole::BlisterPack, blister),
            ProductType::Syrup => SubmissionPayload::new(Endpoint::Verify)
                .text("drug_name", session.product_name.as_str())
                .text("nafdac_number", session.registration_code())
                .image(ImageRole::Package, package),
        },
        Operation::Register(request) => {
            let manufacturer = request.manufacturer.trim();
            if manufacturer.is_empty() {
                return Err(Error::MissingManufacturer);
            }

            let mut payload = SubmissionPayload::new(Endpoint::RegisterDrug)
                .text("drug_name", session.product_name.as_str())
                .text("drug_type", session.product_type.as_str())
                .text("nafdac_number", session.registration_code())
                .text("manufacturer", manufacturer)
                .image(ImageRole::Package, package);
            if session.product_type == ProductType::Tablet {
                payload = payload.image(ImageRole::BlisterPack, blister);
            }
            match request.barcode.as_deref().map(str::trim) {
                Some(barcode) if !barcode.is_empty() => payload.text("barcode", barcode),
                _ => payload,
            }
        }
    };

    Ok(payload)
}

/// Build the counterfeit report payload
pub fn build_report(record: &ReportRecord) -> SubmissionPayload {
    SubmissionPayload::new(Endpoint::Report)
        .text("drug_name", record.product_name.as_str())
        .text("nafdac_number", record.registration_code.as_str())
        .text("reason", record.reason.as_str())
        .text("location", record.location_field())
        .image(ImageRole::Package, record.images.get(&ImageRole::Package))
        .image(ImageRole::BlisterPack, record.images.get(&ImageRole::BlisterPack))
}
