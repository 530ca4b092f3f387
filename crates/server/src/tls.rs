//! Certificate handling for the key discovery fingerprint.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::core::federation::discovery::TlsFingerprint;
use crate::core::serde::{Base64, base64};
use crate::{AppError, AppResult};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// The `sha256` fingerprint of a DER encoded certificate.
pub fn fingerprint(der: &[u8]) -> TlsFingerprint {
    let digest = Sha256::digest(der);
    TlsFingerprint::from([("sha256".to_owned(), Base64::new(digest.to_vec()))])
}

/// Reads the leaf certificate at `path` as DER.
///
/// PEM files yield their first certificate; anything else is taken to be DER
/// already.
pub fn load_certificate(path: impl AsRef<Path>) -> AppResult<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    match std::str::from_utf8(&bytes) {
        Ok(text) if text.contains(PEM_BEGIN) => pem_to_der(text),
        _ => Ok(bytes),
    }
}

fn pem_to_der(pem: &str) -> AppResult<Vec<u8>> {
    let body = pem
        .split_once(PEM_BEGIN)
        .and_then(|(_, rest)| rest.split_once(PEM_END))
        .map(|(body, _)| body)
        .ok_or_else(|| AppError::public("certificate PEM block is not terminated"))?;
    let body = body.split_whitespace().collect::<String>();
    base64::decode(body).map_err(|e| AppError::public(format!("certificate PEM is not base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_sha256_of_der() {
        let fp = fingerprint(b"hello");
        assert_eq!(fp.len(), 1);
        assert_eq!(
            fp["sha256"].encode(),
            "LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ"
        );
    }

    #[test]
    fn reads_first_pem_block() {
        let pem = format!(
            "junk\n{PEM_BEGIN}\nAAEC\nAwQ=\n{PEM_END}\n{PEM_BEGIN}\nBQY=\n{PEM_END}\n"
        );
        assert_eq!(pem_to_der(&pem).unwrap(), vec![0, 1, 2, 3, 4]);

        let broken = format!("{PEM_BEGIN}\nAAEC\n");
        assert!(pem_to_der(&broken).is_err());
    }
}
