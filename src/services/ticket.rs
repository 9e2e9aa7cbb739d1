//! Ticket codec service
//!
//! Encodes ticket identity into a tamper-resistant, QR-scannable payload and
//! decodes submitted payloads back. The wire envelope is JSON
//! `{"data": "<hex ciphertext>", "iv": "<hex iv>"}`; the plaintext inside is
//! a JSON identity record. Cipher is AES-256-CBC with a fresh random IV per
//! encryption, keyed by a server-held 32-byte secret.
//!
//! Older tickets circulated as plain `{"ticketId": ...}` JSON or as the bare
//! ticket ID string; `extract_ticket_id` degrades through those two legacy
//! tiers before giving up.

use aes::Aes256;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::{DateTime, Utc};
use image::Luma;
use qrcode::QrCode;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::settings::Settings;
use crate::utils::errors::{TicketError, TicketResult};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Plaintext identity record carried inside an encrypted ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketIdentity {
    pub ticket_id: String,
    pub user_id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub user_name: String,
    pub registration_date: DateTime<Utc>,
}

/// Wire envelope persisted alongside the registration and embedded in the QR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketEnvelope {
    pub data: String,
    pub iv: String,
}

/// Legacy unencrypted payload shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTicketPayload {
    ticket_id: String,
}

/// Result of issuing a ticket: the rasterized QR plus the persistable pair
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub qr_png: Vec<u8>,
    pub encrypted: String,
    pub iv: String,
}

/// Ticket codec keyed by the server secret
#[derive(Clone)]
pub struct TicketService {
    key: [u8; KEY_LEN],
}

// The key never appears in debug output or logs.
impl std::fmt::Debug for TicketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketService").finish_non_exhaustive()
    }
}

impl TicketService {
    /// Create a codec from settings; the secret must be 64 hex characters
    pub fn new(settings: &Settings) -> TicketResult<Self> {
        Self::from_secret(&settings.ticketing.secret)
    }

    pub fn from_secret(secret: &str) -> TicketResult<Self> {
        let bytes = hex::decode(secret)
            .map_err(|_| TicketError::InvalidKeyLength { expected: KEY_LEN * 2, actual: secret.len() })?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| TicketError::InvalidKeyLength { expected: KEY_LEN * 2, actual: secret.len() })?;
        Ok(Self { key })
    }

    /// Encrypt the identity record, wrap it in the QR envelope and rasterize
    /// it. The returned `(encrypted, iv)` pair is persisted so the ticket can
    /// be re-displayed or re-verified without re-encrypting.
    pub fn issue(&self, identity: &TicketIdentity) -> TicketResult<IssuedTicket> {
        let plaintext = serde_json::to_vec(identity)
            .map_err(|e| TicketError::InvalidEnvelope(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

        let envelope = TicketEnvelope {
            data: hex::encode(ciphertext),
            iv: hex::encode(iv),
        };
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| TicketError::InvalidEnvelope(e.to_string()))?;

        Ok(IssuedTicket {
            qr_png: render_qr_png(&payload)?,
            encrypted: envelope.data,
            iv: envelope.iv,
        })
    }

    /// Decode an encrypted envelope back into the identity record
    pub fn decode(&self, payload: &str) -> TicketResult<TicketIdentity> {
        let envelope: TicketEnvelope = serde_json::from_str(payload)
            .map_err(|e| TicketError::InvalidEnvelope(e.to_string()))?;
        self.decode_envelope(&envelope)
    }

    pub fn decode_envelope(&self, envelope: &TicketEnvelope) -> TicketResult<TicketIdentity> {
        let ciphertext = hex::decode(&envelope.data)
            .map_err(|e| TicketError::InvalidEnvelope(format!("ciphertext is not hex: {e}")))?;
        let iv_bytes = hex::decode(&envelope.iv)
            .map_err(|e| TicketError::InvalidEnvelope(format!("iv is not hex: {e}")))?;
        let iv: [u8; IV_LEN] = iv_bytes
            .try_into()
            .map_err(|_| TicketError::InvalidEnvelope("iv must be 16 bytes".to_string()))?;

        let plaintext = Aes256CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|e| TicketError::DecryptionFailure(e.to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| TicketError::DecryptionFailure(format!("plaintext is not a ticket record: {e}")))
    }

    /// Resolve any scanned input to a ticket ID, degrading through the
    /// legacy tiers in strict order: encrypted envelope, plain
    /// `{"ticketId"}` JSON, bare ticket ID string.
    pub fn extract_ticket_id(&self, input: &str) -> String {
        let trimmed = input.trim();

        if let Ok(identity) = self.decode(trimmed) {
            return identity.ticket_id;
        }

        if let Ok(legacy) = serde_json::from_str::<LegacyTicketPayload>(trimmed) {
            return legacy.ticket_id;
        }

        trimmed.to_string()
    }

    /// Re-render the QR for an already-issued ticket from its persisted
    /// `(encrypted, iv)` pair. Lower assurance: nothing is re-encrypted.
    pub fn render_stored(&self, encrypted: &str, iv: &str) -> TicketResult<Vec<u8>> {
        let envelope = TicketEnvelope {
            data: encrypted.to_string(),
            iv: iv.to_string(),
        };
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| TicketError::InvalidEnvelope(e.to_string()))?;
        render_qr_png(&payload)
    }
}

/// Rasterize a payload as a PNG QR image
fn render_qr_png(payload: &str) -> TicketResult<Vec<u8>> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| TicketError::QrRendering(e.to_string()))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(240, 240)
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| TicketError::QrRendering(e.to_string()))?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn codec() -> TicketService {
        TicketService::from_secret(&"ab".repeat(32)).unwrap()
    }

    fn identity() -> TicketIdentity {
        TicketIdentity {
            ticket_id: "7f3c2a".to_string(),
            user_id: 42,
            event_id: 7,
            event_name: "Hack Night".to_string(),
            user_name: "Priya Sharma".to_string(),
            registration_date: Utc::now(),
        }
    }

    #[test]
    fn test_issue_decode_round_trip() {
        let codec = codec();
        let identity = identity();

        let issued = codec.issue(&identity).unwrap();
        assert!(!issued.qr_png.is_empty());

        let envelope = TicketEnvelope {
            data: issued.encrypted,
            iv: issued.iv,
        };
        let decoded = codec.decode_envelope(&envelope).unwrap();
        assert_eq!(decoded, identity);
    }

    #[test]
    fn test_fresh_iv_per_issue() {
        let codec = codec();
        let identity = identity();
        let first = codec.issue(&identity).unwrap();
        let second = codec.issue(&identity).unwrap();
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.encrypted, second.encrypted);
    }

    #[test]
    fn test_wrong_key_is_decryption_failure() {
        let issued = codec().issue(&identity()).unwrap();
        let other = TicketService::from_secret(&"cd".repeat(32)).unwrap();
        let envelope = TicketEnvelope {
            data: issued.encrypted,
            iv: issued.iv,
        };
        assert_matches!(
            other.decode_envelope(&envelope),
            Err(TicketError::DecryptionFailure(_))
        );
    }

    #[test]
    fn test_malformed_envelope_is_invalid() {
        let codec = codec();
        assert_matches!(codec.decode("not json"), Err(TicketError::InvalidEnvelope(_)));
        assert_matches!(
            codec.decode(r#"{"data": "zz", "iv": "zz"}"#),
            Err(TicketError::InvalidEnvelope(_))
        );
        assert_matches!(
            codec.decode(r#"{"data": "aabb", "iv": "aabb"}"#),
            Err(TicketError::InvalidEnvelope(_))
        );
    }

    #[test]
    fn test_extract_ticket_id_tiers() {
        let codec = codec();
        let identity = identity();
        let issued = codec.issue(&identity).unwrap();

        // Tier 1: encrypted envelope
        let envelope = serde_json::json!({ "data": issued.encrypted, "iv": issued.iv }).to_string();
        assert_eq!(codec.extract_ticket_id(&envelope), "7f3c2a");

        // Tier 2: legacy plaintext JSON
        assert_eq!(codec.extract_ticket_id(r#"{"ticketId": "legacy-1"}"#), "legacy-1");

        // Tier 3: bare ticket ID
        assert_eq!(codec.extract_ticket_id("  raw-ticket "), "raw-ticket");
    }

    #[test]
    fn test_invalid_secret_rejected() {
        assert_matches!(
            TicketService::from_secret("abcd"),
            Err(TicketError::InvalidKeyLength { .. })
        );
        assert_matches!(
            TicketService::from_secret(&"zz".repeat(32)),
            Err(TicketError::InvalidKeyLength { .. })
        );
    }

    #[test]
    fn test_debug_output_redacts_the_key() {
        assert_eq!(format!("{:?}", codec()), "TicketService { .. }");
    }

    #[test]
    fn test_render_stored_matches_issue_payload() {
        let codec = codec();
        let issued = codec.issue(&identity()).unwrap();
        let rendered = codec.render_stored(&issued.encrypted, &issued.iv).unwrap();
        assert!(!rendered.is_empty());
    }
}
