use hmac::{Hmac, Mac};
use sha2::Sha256;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Creates the HMAC-SHA256 signature for an authenticated Bybit v5 request.
///
/// The exchange signs the concatenation of the millisecond timestamp, the API
/// key, the receive window, and the request payload (the query string for GET
/// requests, the raw JSON body for POST requests).
///
/// # Returns
///
/// A hexadecimal string representation of the signature.
pub fn sign_request(
    secret: &str,
    api_key: &str,
    timestamp: u128,
    recv_window: u64,
    payload: &str,
) -> String {
    // Create a new HMAC-SHA256 instance with the secret key.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(timestamp.to_string().as_bytes());
    mac.update(api_key.as_bytes());
    mac.update(recv_window.to_string().as_bytes());
    mac.update(payload.as_bytes());

    // Finalize the HMAC computation and convert the raw bytes into the
    // hexadecimal string the API expects.
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}
