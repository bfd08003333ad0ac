use crate::error::{Error, Result};

/// Width of a zero-padded nonce field. Chosen so the maximum representable
/// value (10^24 - 1) never shortens the string, which would corrupt
/// lexicographic ordering.
const NONCE_WIDTH: usize = 24;
const NONCE_MAX: u128 = 1_000_000_000_000_000_000_000_000; // 10^24

/// Width of a zero-padded nanosecond timestamp field, matching the 19 digits
/// of `i64::MAX` exactly.
const CREATED_WIDTH: usize = 19;

fn check_nonce(nonce: u128) -> Result<()> {
    if nonce >= NONCE_MAX {
        return Err(Error::InvalidInput(format!(
            "nonce {nonce} does not fit in a {NONCE_WIDTH}-digit key field"
        )));
    }
    Ok(())
}

fn check_created(created: i64) -> Result<()> {
    if created < 0 {
        return Err(Error::InvalidInput(format!(
            "created timestamp {created} must be non-negative"
        )));
    }
    Ok(())
}

pub fn eventstream_prefix() -> Vec<u8> {
    b"eventstreams_0/".to_vec()
}

pub fn eventstream_end() -> Vec<u8> {
    b"eventstreams_1/".to_vec()
}

pub fn eventstream_key(id: &str) -> Vec<u8> {
    format!("eventstreams_0/{id}").into_bytes()
}

pub fn listener_prefix() -> Vec<u8> {
    b"listeners_0/".to_vec()
}

pub fn listener_end() -> Vec<u8> {
    b"listeners_1/".to_vec()
}

pub fn listener_key(id: &str) -> Vec<u8> {
    format!("listeners_0/{id}").into_bytes()
}

pub fn checkpoint_prefix() -> Vec<u8> {
    b"checkpoints_0/".to_vec()
}

pub fn checkpoint_end() -> Vec<u8> {
    b"checkpoints_1/".to_vec()
}

pub fn checkpoint_key(stream_id: &str) -> Vec<u8> {
    format!("checkpoints_0/{stream_id}").into_bytes()
}

pub fn tx_prefix() -> Vec<u8> {
    b"tx_0/".to_vec()
}

pub fn tx_end() -> Vec<u8> {
    b"tx_1/".to_vec()
}

pub fn tx_key(id: &str) -> Vec<u8> {
    format!("tx_0/{id}").into_bytes()
}

pub fn tx_created_prefix() -> Vec<u8> {
    b"tx_created_0/".to_vec()
}

pub fn tx_created_end() -> Vec<u8> {
    b"tx_created_1/".to_vec()
}

pub fn tx_created_key(created: i64, sequence_id: &str) -> Result<Vec<u8>> {
    check_created(created)?;
    Ok(format!("tx_created_0/{created:0width$}/{sequence_id}", width = CREATED_WIDTH).into_bytes())
}

pub fn tx_inflight_prefix() -> Vec<u8> {
    b"tx_inflight_0/".to_vec()
}

pub fn tx_inflight_end() -> Vec<u8> {
    b"tx_inflight_1/".to_vec()
}

pub fn tx_inflight_key(sequence_id: &str) -> Vec<u8> {
    format!("tx_inflight_0/{sequence_id}").into_bytes()
}

pub fn nonce_prefix() -> Vec<u8> {
    b"nonce_0/".to_vec()
}

pub fn nonce_end() -> Vec<u8> {
    b"nonce_1/".to_vec()
}

pub fn nonce_signer_prefix(signer: &str) -> Vec<u8> {
    format!("nonce_0/{signer}_0/").into_bytes()
}

pub fn nonce_signer_end(signer: &str) -> Vec<u8> {
    format!("nonce_0/{signer}_1/").into_bytes()
}

pub fn nonce_key(signer: &str, nonce: u128) -> Result<Vec<u8>> {
    check_nonce(nonce)?;
    Ok(format!("nonce_0/{signer}_0/{nonce:0width$}", width = NONCE_WIDTH).into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_key_preserves_numeric_order() {
        let a = nonce_key("0xA", 7).unwrap();
        let b = nonce_key("0xA", 42).unwrap();
        let c = nonce_key("0xA", 100).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn nonce_key_rejects_out_of_range() {
        assert!(nonce_key("0xA", NONCE_MAX).is_err());
        assert!(nonce_key("0xA", NONCE_MAX - 1).is_ok());
    }

    #[test]
    fn created_key_preserves_numeric_order() {
        let a = tx_created_key(1_000, "seq-a").unwrap();
        let b = tx_created_key(1_000_000_000, "seq-b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn created_key_rejects_negative() {
        assert!(tx_created_key(-1, "seq").is_err());
    }

    #[test]
    fn signer_prefix_end_brackets_only_that_signer() {
        let prefix = nonce_signer_prefix("0xA");
        let end = nonce_signer_end("0xA");
        let key = nonce_key("0xA", 5).unwrap();
        let other_signer_key = nonce_key("0xB", 5).unwrap();
        assert!(key.as_slice() >= prefix.as_slice() && key.as_slice() < end.as_slice());
        assert!(!(other_signer_key.as_slice() >= prefix.as_slice() && other_signer_key.as_slice() < end.as_slice()));
    }
}
