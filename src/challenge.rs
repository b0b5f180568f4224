//! Daily challenge selection.
//!
//! The challenge for a day is `u64::from_be_bytes(sha256(date)[..8]) % 8`,
//! where `date` is the `YYYY-MM-DD` string. Nothing is stored: the same date
//! always hashes to the same entry, on any platform.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::{date_key, Challenge};

pub const CHALLENGES: [&str; 8] = [
    "Leading Lines: Use lines to guide the viewer's eye to the subject.",
    "Frame within a Frame: Find a natural opening (window, doorway, trees) to frame your subject.",
    "Rule of Thirds: Place your main subject off-center on one of the intersecting grid lines.",
    "Golden Hour Glow: Capture the warm light just after sunrise or just before sunset.",
    "Minimalism: Less is more. Use negative space and an isolated subject.",
    "Reflections: Use water, glass, or metal to capture a clear reflection.",
    "Urban Patterns: Find repetitive shapes or textures in the city architecture.",
    "Low Angle (Worm's Eye View): Get down on the ground and shoot upwards.",
];

pub fn index_for_date(date: NaiveDate) -> usize {
    let digest = Sha256::digest(date_key(date).as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % CHALLENGES.len() as u64) as usize
}

pub fn challenge_for(date: NaiveDate) -> Challenge {
    Challenge::parse(CHALLENGES[index_for_date(date)])
}
