//! Webhook HMAC signing and verification utilities.
//!
//! Inbound webhook triggers carry a hex-encoded HMAC-SHA256 of the raw
//! request body. Verification decodes the claimed signature and uses the
//! MAC's own constant-time comparison, so wrong-length and wrong-value
//! signatures are indistinguishable to a timing observer.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of generated trigger secrets (alphanumeric characters).
pub const SECRET_LENGTH: usize = 40;

/// Prefix identifying Flowline-generated webhook secrets.
pub const SECRET_PREFIX: &str = "whsec_";

/// Compute an HMAC-SHA256 signature over a payload.
///
/// The `secret` is the workflow's configured signing secret. Returns the
/// hex-encoded signature string, as carried in the `x-webhook-signature`
/// header.
pub fn compute_signature(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 signature over a payload.
///
/// Returns `false` for malformed hex, wrong-length digests, and wrong
/// signatures alike. The digest comparison is constant-time.
pub fn verify_signature(secret: &str, payload: &[u8], claimed_hex: &str) -> bool {
    let Some(claimed) = hex::decode(claimed_hex) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&claimed).is_ok()
}

/// Generate a random webhook signing secret.
///
/// Returns a `whsec_`-prefixed alphanumeric string. The plaintext is stored
/// in the workflow's trigger config; it is a shared secret with the caller,
/// not a credential for platform resources.
pub fn generate_trigger_secret() -> String {
    let body: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect();
    format!("{SECRET_PREFIX}{body}")
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string into bytes. Returns `None` on odd length or
    /// non-hex characters.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
