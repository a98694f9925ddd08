//! # Payment webhook signatures
//!
//! The payment provider signs each webhook with HMAC-SHA256 over a canonical JSON rendering of the payload, and sends
//! the lowercase hex digest in the `Sign` header. Which rendering it uses is not pinned down by its documentation and
//! has changed over time, so the [`SignatureReconciler`] computes the digest for every known variant and accepts the
//! webhook if any of them matches. The variants are the product of three independent choices:
//!
//! * **Shape**: the payload as received (form bodies keep their `products[0][name]` keys), or with bracket keys
//!   rebuilt into nested lists and maps.
//! * **Escaping**: non-ASCII characters as `\uXXXX` escapes, or as literal UTF-8.
//! * **Newlines**: text as received, or with `\r\n` and `\r` replaced by `\n`.
//!
//! That gives eight [`Canonicalization`]s in total. Do not drop variants without confirming what the provider currently
//! sends; a narrower set silently starts rejecting genuine payment confirmations.
//!
//! All eight digests are compared in constant time and every comparison runs, so neither timing nor errors reveal
//! which variant came close.
use hmac::{Hmac, Mac};
use log::*;
use serde_json::Value;
use sha2::Sha256;
use storefront_common::Secret;
use thiserror::Error;

use super::{
    bracket_keys::unflatten,
    canonical_json::{canonical_json, JsonEscaping},
    payload_value::{normalize_map_newlines, PayloadMap, PayloadValue},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The webhook did not carry a signature")]
    MissingSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Could not decode the webhook payload. {0}")]
    MalformedPayload(String),
    #[error("No payment secret key has been configured")]
    NotConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadShape {
    Flat,
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Newlines {
    Original,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Canonicalization {
    pub shape: PayloadShape,
    pub escaping: JsonEscaping,
    pub newlines: Newlines,
}

impl Canonicalization {
    pub const fn new(shape: PayloadShape, escaping: JsonEscaping, newlines: Newlines) -> Self {
        Self { shape, escaping, newlines }
    }

    pub const ALL: [Canonicalization; 8] = [
        Self::new(PayloadShape::Flat, JsonEscaping::Utf8, Newlines::Original),
        Self::new(PayloadShape::Flat, JsonEscaping::Utf8, Newlines::Normalized),
        Self::new(PayloadShape::Nested, JsonEscaping::Utf8, Newlines::Original),
        Self::new(PayloadShape::Nested, JsonEscaping::Utf8, Newlines::Normalized),
        Self::new(PayloadShape::Flat, JsonEscaping::Ascii, Newlines::Original),
        Self::new(PayloadShape::Flat, JsonEscaping::Ascii, Newlines::Normalized),
        Self::new(PayloadShape::Nested, JsonEscaping::Ascii, Newlines::Original),
        Self::new(PayloadShape::Nested, JsonEscaping::Ascii, Newlines::Normalized),
    ];
}

//--------------------------------------     WebhookPayload    ---------------------------------------------------------
/// A decoded webhook body, held in both of the shapes the provider may have signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookPayload {
    pub flat: PayloadMap,
    pub nested: PayloadMap,
}

impl WebhookPayload {
    /// Decodes a webhook body. Bodies whose content type mentions `application/json` are parsed as a JSON object;
    /// anything else is treated as an url-encoded form.
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self, SignatureError> {
        let is_json = content_type.map(|ct| ct.to_ascii_lowercase().contains("application/json")).unwrap_or(false);
        if is_json {
            Self::from_json_bytes(body)
        } else {
            Self::from_form_bytes(body)
        }
    }

    pub fn from_json_bytes(body: &[u8]) -> Result<Self, SignatureError> {
        let value = serde_json::from_slice::<Value>(body).map_err(|e| SignatureError::MalformedPayload(e.to_string()))?;
        match PayloadValue::stringify_deep(&value) {
            PayloadValue::Map(flat) => Self::from_flat(flat),
            _ => Err(SignatureError::MalformedPayload("The webhook body is not a JSON object".into())),
        }
    }

    /// Form fields are decoded with `+` as space. If a field is repeated, the last value wins.
    pub fn from_form_bytes(body: &[u8]) -> Result<Self, SignatureError> {
        let flat = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), PayloadValue::Text(v.into_owned())))
            .collect::<PayloadMap>();
        Self::from_flat(flat)
    }

    pub fn from_flat(flat: PayloadMap) -> Result<Self, SignatureError> {
        let nested = unflatten(&flat).map_err(|e| SignatureError::MalformedPayload(e.to_string()))?;
        Ok(Self { flat, nested })
    }

    /// Looks a top-level text field up in the flat payload first and then in the nested one. Empty values count as
    /// absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        lookup_text(&self.flat, name).or_else(|| lookup_text(&self.nested, name))
    }

    /// The exact text that is signed under the given canonicalization.
    pub fn canonical_form(&self, canonicalization: Canonicalization) -> String {
        let map = match canonicalization.shape {
            PayloadShape::Flat => &self.flat,
            PayloadShape::Nested => &self.nested,
        };
        match canonicalization.newlines {
            Newlines::Original => canonical_json(map, canonicalization.escaping),
            Newlines::Normalized => canonical_json(&normalize_map_newlines(map), canonicalization.escaping),
        }
    }
}

//--------------------------------------  SignatureReconciler  ---------------------------------------------------------
#[derive(Clone)]
pub struct SignatureReconciler {
    keyed: HmacSha256,
}

impl SignatureReconciler {
    pub fn new(secret: Secret<String>) -> Result<Self, SignatureError> {
        if !secret.is_set() {
            return Err(SignatureError::NotConfigured);
        }
        let keyed = <HmacSha256 as Mac>::new_from_slice(secret.reveal().as_bytes())
            .map_err(|_| SignatureError::NotConfigured)?;
        Ok(Self { keyed })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Lowercase hex HMAC-SHA256 of `message`.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = self.mac();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn sign_map(&self, map: &PayloadMap, escaping: JsonEscaping) -> String {
        self.sign(&canonical_json(map, escaping))
    }

    pub fn candidate(&self, payload: &WebhookPayload, canonicalization: Canonicalization) -> String {
        self.sign(&payload.canonical_form(canonicalization))
    }

    /// Accepts the payload if `claimed` is the signature of any of the supported canonicalizations.
    ///
    /// Surrounding whitespace on the claim is ignored, but the digest itself must be lowercase hex.
    pub fn verify(&self, payload: &WebhookPayload, claimed: &str) -> Result<(), SignatureError> {
        let claimed = claimed.trim();
        if claimed.is_empty() {
            return Err(SignatureError::MissingSignature);
        }
        if !claimed.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            warn!("🔐️ Webhook signature is not lowercase hex. Rejecting.");
            return Err(SignatureError::InvalidSignature);
        }
        let claimed = hex::decode(claimed).map_err(|_| SignatureError::InvalidSignature)?;
        let matches = Canonicalization::ALL.iter().fold(false, |found, c| {
            let mut mac = self.mac();
            mac.update(payload.canonical_form(*c).as_bytes());
            found | mac.verify_slice(&claimed).is_ok()
        });
        if matches {
            debug!("🔐️ Webhook signature verified");
            Ok(())
        } else {
            warn!("🔐️ Webhook signature did not match any supported canonical form. Rejecting.");
            Err(SignatureError::InvalidSignature)
        }
    }
}

impl std::fmt::Debug for SignatureReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureReconciler").field("secret", &"****").finish()
    }
}

fn lookup_text<'a>(map: &'a PayloadMap, name: &str) -> Option<&'a str> {
    map.get(name).and_then(PayloadValue::as_text).filter(|s| !s.is_empty())
}
