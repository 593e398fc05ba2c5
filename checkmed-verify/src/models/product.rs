//! Product types, image roles and image blobs

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Drug form factor. Decides which photographs a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Tablet,
    Syrup,
}

impl ProductType {
    /// Wire value sent as `drug_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Tablet => "tablet",
            ProductType::Syrup => "syrup",
        }
    }

    /// Image roles a complete session of this type must hold
    pub fn required_roles(&self) -> &'static [ImageRole] {
        match self {
            ProductType::Tablet => &[ImageRole::Package, ImageRole::BlisterPack],
            ProductType::Syrup => &[ImageRole::Package],
        }
    }

    pub fn accepts(&self, role: ImageRole) -> bool {
        self.required_roles().contains(&role)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tablet" => Ok(ProductType::Tablet),
            "syrup" => Ok(ProductType::Syrup),
            other => Err(format!("unknown product type '{}' (expected tablet or syrup)", other)),
        }
    }
}

/// Named slot for a required photograph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageRole {
    /// Outer box or bottle label
    Package,
    /// Blister strip (tablets only)
    BlisterPack,
}

impl ImageRole {
    /// Multipart field the image is sent under
    pub fn form_field(&self) -> &'static str {
        match self {
            ImageRole::Package => "box_image",
            ImageRole::BlisterPack => "blister_pack_image",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRole::Package => f.write_str("package"),
            ImageRole::BlisterPack => f.write_str("blister pack"),
        }
    }
}

/// A captured file with its declared media kind.
///
/// Serialized as a data URL so a cached blob decodes back to identical bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ImageBlobRepr", try_from = "ImageBlobRepr")]
pub struct ImageBlob {
    bytes: Vec<u8>,
    media_type: String,
    file_name: Option<String>,
}

impl ImageBlob {
    /// The media type is stored trimmed and lowercased
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into().trim().to_ascii_lowercase(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Load a file, declaring its media kind from the content's magic bytes.
    ///
    /// Unrecognised content is declared `application/octet-stream`.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let media_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        Ok(Self {
            bytes,
            media_type,
            file_name,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the declared media type is a well-formed `image/<subtype>`
    pub fn is_image(&self) -> bool {
        self.media_type
            .parse::<mime::Mime>()
            .map(|m| m.type_() == mime::IMAGE && !m.subtype().as_str().is_empty())
            .unwrap_or(false)
    }

    /// `data:<media type>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn from_data_url(data_url: &str) -> Result<Self, String> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| "data URL must start with 'data:'".to_string())?;
        let (media_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| "data URL must be base64 encoded".to_string())?;
        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| format!("invalid base64 payload: {}", e))?;

        Ok(Self::new(bytes, media_type))
    }
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct ImageBlobRepr {
    data_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
}

impl From<ImageBlob> for ImageBlobRepr {
    fn from(blob: ImageBlob) -> Self {
        Self {
            data_url: blob.to_data_url(),
            file_name: blob.file_name,
        }
    }
}

impl TryFrom<ImageBlobRepr> for ImageBlob {
    type Error = String;

    fn try_from(repr: ImageBlobRepr) -> Result<Self, Self::Error> {
        let mut blob = ImageBlob::from_data_url(&repr.data_url)?;
        blob.file_name = repr.file_name;
        Ok(blob)
    }
}
