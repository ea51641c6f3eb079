//! Format template scanning for positional references
//!
//! Templates are free text interspersed with `$N` tokens, where `N` is a
//! run of decimal digits immediately after the `$`. A bare `$` with no
//! digit following is literal text.

/// Parse a run of ASCII decimal digits into an integer
///
/// Callers guarantee `digits` is non-empty and all ASCII digits.
pub(crate) fn read_int(digits: &[u8]) -> u64 {
    debug_assert!(!digits.is_empty());
    digits
        .iter()
        .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'))
}

/// Smallest argument count that accommodates every `$N` reference
///
/// Returns `max(N) + 1` over all references found, or 0 when the template
/// contains none. References may repeat and appear in any order.
pub fn max_var_ref(template: &str) -> usize {
    let bytes = template.as_bytes();
    let mut max: Option<u64> = None;

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                let n = read_int(&bytes[start..end]);
                max = Some(max.map_or(n, |m| m.max(n)));
                i = end;
                continue;
            }
        }
        i += 1;
    }

    max.map_or(0, |m| m as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_int() {
        assert_eq!(read_int(b"1"), 1);
        assert_eq!(read_int(b"123"), 123);
        assert_eq!(read_int(b"0"), 0);
        assert_eq!(read_int(b"007"), 7);
    }

    #[test]
    fn test_max_var_ref() {
        assert_eq!(max_var_ref(""), 0);
        assert_eq!(max_var_ref("abc"), 0);
        assert_eq!(max_var_ref("$0"), 1);
        assert_eq!(max_var_ref("$124"), 125);
        assert_eq!(max_var_ref("$1$4"), 5);
        assert_eq!(max_var_ref("$7$4"), 8);
        assert_eq!(max_var_ref("$7 $7"), 8);
        assert_eq!(max_var_ref("$7 $9$10"), 11);
    }

    #[test]
    fn test_bare_dollar_is_literal() {
        assert_eq!(max_var_ref("$"), 0);
        assert_eq!(max_var_ref("cost: $ 12"), 0);
        assert_eq!(max_var_ref("$$3"), 4);
        assert_eq!(max_var_ref("a$b $2"), 3);
    }
}
