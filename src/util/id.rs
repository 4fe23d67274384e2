use std::time::{Duration, SystemTime};

/// Per-run identifier: seconds since the unix epoch, used to key the temp tree.
pub fn create_run_id() -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    now.as_secs().to_string()
}

/// Uniform-ish index in `0..len` from the OS random source.
///
/// Falls back to the clock when the random source is unavailable; returns 0 for empty ranges.
pub fn random_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mut buf = [0u8; 8];
    let seed = match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64)
            .unwrap_or(0),
    };
    (seed % len as u64) as usize
}
