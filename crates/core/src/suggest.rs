//! "Did you mean" suggestions for mistyped command and option names.
//!
//! The search widens in three stages and stops at the first that matches:
//! candidates containing the whole typed name, then candidates containing
//! ever shorter tails of it, then candidates containing any three-character
//! slice of it. Names of two characters or fewer never produce suggestions.

/// Suggests candidates for `typed`, rendered as `a, b, or c`.
pub fn suggest<S: AsRef<str>>(candidates: &[S], typed: &str) -> Option<String> {
    let matches = suggestion_matches(candidates, typed);
    if matches.is_empty() {
        None
    } else {
        Some(join_alternatives(&matches))
    }
}

fn suggestion_matches<'c, S: AsRef<str>>(candidates: &'c [S], typed: &str) -> Vec<&'c str> {
    let typed: Vec<char> = typed.chars().collect();
    if typed.len() <= 2 {
        return Vec::new();
    }

    let containing = |needle: &[char]| -> Vec<&'c str> {
        let needle: String = needle.iter().collect();
        candidates
            .iter()
            .map(AsRef::as_ref)
            .filter(|candidate| candidate.contains(&needle))
            .collect()
    };

    let exact = containing(&typed);
    if !exact.is_empty() {
        return exact;
    }

    let mut found: Vec<&'c str> = Vec::new();
    let push_unique = |found: &mut Vec<&'c str>, matches: Vec<&'c str>| {
        for candidate in matches {
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        }
    };

    if typed.len() <= 16 {
        let mut tail: &[char] = &typed;
        while tail.len() > 2 {
            let trim = (tail.len() as f64 / 4.0).round_ties_even() as usize + 1;
            tail = &tail[trim.min(tail.len())..];
            if tail.len() > 2 {
                push_unique(&mut found, containing(tail));
            }
        }
        if !found.is_empty() {
            return found;
        }
    }

    for window in typed.chunks(3).filter(|window| window.len() == 3) {
        push_unique(&mut found, containing(window));
    }
    found
}

fn join_alternatives(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match() {
        let candidates = ["status", "start", "stop"];
        assert_eq!(suggest(&candidates, "sta"), Some("status, or start".to_string()));
    }

    #[test]
    fn test_trimmed_tail_match() {
        let candidates = ["status", "start", "stop"];
        assert_eq!(suggest(&candidates, "sttus"), Some("status".to_string()));
    }

    #[test]
    fn test_window_match_for_long_names() {
        let candidates = ["configuration"];
        assert_eq!(
            suggest(&candidates, "xxxxxxxxxxxxxxxxconfig"),
            Some("configuration".to_string())
        );
    }

    #[test]
    fn test_no_match() {
        let candidates = ["status", "start", "stop"];
        assert_eq!(suggest(&candidates, "zzz"), None);
    }

    #[test]
    fn test_short_names_never_suggest() {
        let candidates = ["status"];
        assert_eq!(suggest(&candidates, "st"), None);
    }

    #[test]
    fn test_join_alternatives() {
        assert_eq!(join_alternatives(&["a"]), "a");
        assert_eq!(join_alternatives(&["a", "b"]), "a, or b");
        assert_eq!(join_alternatives(&["a", "b", "c"]), "a, b, or c");
    }
}
