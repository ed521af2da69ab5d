use sha1::{Digest, Sha1};

/// Length of a synthesized id in hex characters.
pub const SYNTHESIZED_ID_LEN: usize = 16;

/// Stable id for rows without a native one: `sha1("{source}:{title}:{region}")`,
/// hex, first 16 characters.
///
/// `region` is the raw mapped value, before the `전국` default applies, so
/// ids match snapshots written by earlier runs.
pub fn synthesize_policy_id(source_id: &str, title: &str, region: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{source_id}:{title}:{region}").as_bytes());
    let mut id = format!("{:x}", hasher.finalize());
    id.truncate(SYNTHESIZED_ID_LEN);
    id
}
