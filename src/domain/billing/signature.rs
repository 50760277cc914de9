//! HMAC-SHA256 verification of payment confirmations and webhook bodies.
//!
//! Signatures are lowercase hex as the gateway emits them, compared as
//! strings in constant time with no trimming or case folding. Verification
//! is a pure function of its inputs; callers map `false` to
//! `InvalidSignature` before touching state.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Stateless signature checks keyed by tenant secrets.
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Checks a client-submitted one-time order payment.
    ///
    /// Signed message: `order_id + "|" + payment_id`.
    pub fn verify_order_payment(
        order_id: &str,
        payment_id: &str,
        signature: &str,
        secret: &SecretString,
    ) -> bool {
        Self::verify_pair(order_id, payment_id, signature, secret)
    }

    /// Checks a client-submitted subscription payment.
    ///
    /// Signed message: `subscription_id + "|" + payment_id`.
    pub fn verify_subscription_payment(
        subscription_id: &str,
        payment_id: &str,
        signature: &str,
        secret: &SecretString,
    ) -> bool {
        Self::verify_pair(subscription_id, payment_id, signature, secret)
    }

    /// Checks a webhook against the exact bytes received.
    ///
    /// Must run before the body is decoded.
    pub fn verify_webhook(raw_body: &[u8], signature_header: &str, secret: &SecretString) -> bool {
        Self::verify_bytes(raw_body, signature_header, secret)
    }

    /// Hex HMAC-SHA256 of `message`. Used by gateway fakes and tests.
    pub fn sign(message: &[u8], secret: &SecretString) -> String {
        hex::encode(Self::mac(message, secret))
    }

    /// Hex signature for an `id|payment_id` pair.
    pub fn sign_pair(id: &str, payment_id: &str, secret: &SecretString) -> String {
        Self::sign(format!("{}|{}", id, payment_id).as_bytes(), secret)
    }

    fn verify_pair(id: &str, payment_id: &str, signature: &str, secret: &SecretString) -> bool {
        if id.is_empty() || payment_id.is_empty() {
            return false;
        }
        Self::verify_bytes(format!("{}|{}", id, payment_id).as_bytes(), signature, secret)
    }

    fn verify_bytes(message: &[u8], signature: &str, secret: &SecretString) -> bool {
        let expected = Self::sign(message, secret);
        constant_time_compare(expected.as_bytes(), signature.as_bytes())
    }

    fn mac(message: &[u8], secret: &SecretString) -> Vec<u8> {
        // HMAC accepts keys of any length, so new_from_slice cannot fail here.
        let mut mac = match HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Compares two byte slices in constant time.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.is_empty() || a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
