pub mod env;
pub mod tracing;

use std::hint::black_box;

/// Performs `&str` comparisons in constant time so the admin token check does
/// not leak prefix-match information through timing.
pub fn constant_time_cmp(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut res = 0u8;

    // `black_box` each byte so the comparison cannot be short-circuited
    // by the optimizer
    for i in 0..a.len() {
        res |= black_box(a[i]) ^ black_box(b[i]);
    }

    res == 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_const_time_cmp() {
        let expects = "swagly_admin_token";
        let passing = "swagly_admin_token";

        let bad_start = "__agly_admin_token";
        let bad_end = "swagly_admin_tok__";

        let short = "swagly_admin_toke";
        let long = "swagly_admin_token_";

        assert!(constant_time_cmp(expects, passing));
        assert!(!constant_time_cmp(expects, bad_start));
        assert!(!constant_time_cmp(expects, bad_end));
        assert!(!constant_time_cmp(expects, short));
        assert!(!constant_time_cmp(expects, long));
    }
}
