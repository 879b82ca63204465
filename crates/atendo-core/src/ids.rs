// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short, collision-resistant, human-shareable codes for requests and sessions.
//!
//! Codes are 6 uppercase alphanumerics (36^6 ~ 2.2 billion), short enough to
//! read over the phone. Callers that insert into a uniqueness-constrained
//! store retry on the rare collision.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated request/session codes.
pub const CODE_LEN: usize = 6;

/// Bound on code regeneration when an insert target id is already taken.
pub const MAX_CODE_ATTEMPTS: usize = 8;

/// Generate a fresh short code.
pub fn short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
