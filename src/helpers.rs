use rand::Rng;

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate `<prefix>-<random>` exactly `max_len` characters long.  An
/// over-long prefix is cut to leave room for at least eight random
/// characters.
pub fn random_suffix_name(prefix: &str, max_len: usize) -> String {
    let min_suffix = 8.min(max_len.saturating_sub(1));
    let keep = prefix.len().min(max_len.saturating_sub(min_suffix + 1));
    let prefix = prefix[..floor_char_boundary(prefix, keep)].trim_end_matches('-');
    let suffix_len = if prefix.is_empty() {
        max_len
    } else {
        max_len.saturating_sub(prefix.len() + 1)
    };

    let mut rng = rand::thread_rng();
    let suffix: String = (0..suffix_len)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    if prefix.is_empty() {
        suffix
    } else {
        format!("{prefix}-{suffix}")
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
