//! Short-lived secret generation (verification codes, reset tokens)

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a 6-digit numeric verification code
pub fn verification_code() -> String {
    format!("{:06}", random_below(1_000_000))
}

/// Generate a 32-character alphanumeric password reset token
pub fn reset_token() -> String {
    // Rejection-sample each byte so all 62 characters are equally likely.
    // 248 is the largest multiple of 62 that fits in a u8.
    let mut out = String::with_capacity(32);
    while out.len() < 32 {
        let mut buf = [0u8; 48];
        getrandom::getrandom(&mut buf).expect("Failed to generate random bytes");
        for &byte in &buf {
            if byte < 248 {
                out.push(ALPHANUMERIC[(byte % 62) as usize] as char);
                if out.len() == 32 {
                    break;
                }
            }
        }
    }
    out
}

/// Compare two secrets without short-circuiting on the first mismatch,
/// so the comparison time does not leak the matching prefix length.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Uniform random u32 in [0, bound)
fn random_below(bound: u32) -> u32 {
    let zone = u32::MAX - (u32::MAX % bound);
    loop {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf).expect("Failed to generate random bytes");
        let value = u32::from_le_bytes(buf);
        if value < zone {
            return value % bound;
        }
    }
}
