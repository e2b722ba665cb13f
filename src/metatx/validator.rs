use crate::codec;
use ethers::types::Address;
use tracing::debug;

/// Verifies the cryptographic signature over a meta-transaction payload.
pub struct MetaTxValidator;

impl MetaTxValidator {
    pub fn new() -> Self {
        Self
    }

    /// `true` iff the payload decodes as a signed transaction and its
    /// signature recovers to the claimed sender. Any decode or recovery
    /// failure is an invalid payload, not an error: the caller gets a
    /// hard rejection either way, and no nonce is consumed.
    pub fn is_valid(&self, meta_signed_tx: &str) -> bool {
        let (tx, sig) = match codec::decode_signed_hex(meta_signed_tx) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!("meta tx rejected, undecodable: {e}");
                return false;
            }
        };

        let signer = match codec::recover_sender(&tx, &sig) {
            Ok(signer) => signer,
            Err(e) => {
                debug!("meta tx rejected, signature does not recover: {e}");
                return false;
            }
        };

        if signer == Address::zero() {
            debug!("meta tx rejected, signer is the zero address");
            return false;
        }

        // The decoded envelope carries the sender it claims to be signed
        // by; the recovered signer must agree with it.
        if let Some(claimed) = tx.from() {
            if *claimed != signer {
                debug!(
                    "meta tx rejected, claimed sender {claimed:?} is not signer {signer:?}"
                );
                return false;
            }
        }

        true
    }
}

impl Default for MetaTxValidator {
    fn default() -> Self {
        Self::new()
    }
}
