//! Product types and input validation.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize};

use product_catalog_core::{Price, ProductId, RowVersion};

/// Maximum length of a product name.
pub const NAME_MAX_LENGTH: usize = 50;

/// Maximum length of a product description.
pub const DESCRIPTION_MAX_LENGTH: usize = 1024;

/// Content type recorded when an upload does not declare one.
pub const DEFAULT_IMAGE_TYPE: &str = "application/octet-stream";

/// Raw image bytes with their declared content type.
#[derive(Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for ProductImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductImage")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A stored catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image: Option<ProductImage>,
    pub version: RowVersion,
}

/// Validated product fields, ready to insert or to overwrite a row.
///
/// `id` and `version` are only consulted by updates: the id must match the
/// target row and, when present, the version must match the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub id: Option<ProductId>,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image: Option<ProductImage>,
    pub version: Option<RowVersion>,
}

impl ProductDraft {
    /// Materialize the draft as a stored row.
    #[must_use]
    pub fn into_product(self, id: ProductId, version: RowVersion) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
            image: self.image,
            version,
        }
    }
}

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field, empty when it is valid.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Every message, in field order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.values().flatten().map(String::as_str)
    }
}

/// Unvalidated product input, as received from a JSON body or a form.
///
/// `price` accepts either a JSON string or a JSON number. `imageFile` is the
/// base64-encoded image used by API clients; form uploads set `image`
/// directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductInput {
    pub id: Option<ProductId>,
    pub name: Option<String>,
    #[serde(deserialize_with = "price_text")]
    pub price: Option<String>,
    pub description: Option<String>,
    pub image_type: Option<String>,
    pub image_file: Option<String>,
    pub version: Option<RowVersion>,
    #[serde(skip)]
    pub image: Option<ProductImage>,
}

impl ProductInput {
    /// Check every field and build a draft.
    ///
    /// # Errors
    ///
    /// Returns all field errors at once when any rule fails.
    pub fn validate(self) -> Result<ProductDraft, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = required_text(&mut errors, "Name", self.name, NAME_MAX_LENGTH);
        let description = required_text(
            &mut errors,
            "Description",
            self.description,
            DESCRIPTION_MAX_LENGTH,
        );

        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("Price", "The Price field is required.");
                None
            }
            Some(raw) => raw
                .parse::<Price>()
                .map_err(|e| errors.add("Price", e.to_string()))
                .ok(),
        };

        let image = match (self.image, self.image_file) {
            (Some(image), _) => Some(image),
            (None, Some(encoded)) if !encoded.trim().is_empty() => {
                match STANDARD.decode(encoded.trim()) {
                    Ok(data) => Some(ProductImage {
                        content_type: self
                            .image_type
                            .filter(|t| !t.trim().is_empty())
                            .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_owned()),
                        data,
                    }),
                    Err(_) => {
                        errors.add("ImageFile", "The ImageFile field is not valid base64.");
                        None
                    }
                }
            }
            _ => None,
        };

        match (name, price, description) {
            (Some(name), Some(price), Some(description)) if errors.is_empty() => {
                Ok(ProductDraft {
                    id: self.id,
                    name,
                    price,
                    description,
                    image,
                    version: self.version,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    let value = value.map(|v| v.trim().to_owned()).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, format!("The {field} field is required."));
        return None;
    }
    if value.chars().count() > max {
        errors.add(
            field,
            format!("The field {field} must be a string with a maximum length of {max}."),
        );
        return None;
    }
    Some(value)
}

/// Accept a price as a JSON string or number and keep its textual form.
fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
        None => None,
    })
}

/// JSON representation of a product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_type: Option<String>,
    pub image_file: Option<String>,
    pub version: RowVersion,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            description: product.description.clone(),
            image_type: product.image.as_ref().map(|i| i.content_type.clone()),
            image_file: product.image.as_ref().map(|i| STANDARD.encode(&i.data)),
            version: product.version,
        }
    }
}
