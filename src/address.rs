//! Address candidate derivation for geocoding
//!
//! Raw listings carry address lines of uneven quality; a full street address
//! often fails to geocode while the bare city succeeds. Candidates are tried
//! from most to least specific, so a coarse fix never shadows a precise one.

/// Derive an ordered, deduplicated list of address strings to attempt
/// geocoding against:
///
/// 1. the full address (all lines joined with ", ")
/// 2. first line + last line (street + city/state)
/// 3. last line alone (city/state)
///
/// Empty or whitespace-only lines are dropped. An empty input yields an
/// empty candidate list, which short-circuits resolution to unresolved.
#[must_use]
pub fn address_candidates(lines: &[String]) -> Vec<String> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    let mut candidates: Vec<String> = Vec::new();
    if lines.is_empty() {
        return candidates;
    }

    candidates.push(lines.join(", "));

    if lines.len() >= 2 {
        let street_city = format!("{}, {}", lines[0], lines[lines.len() - 1]);
        if !candidates.contains(&street_city) {
            candidates.push(street_city);
        }

        let city = lines[lines.len() - 1].to_string();
        if !candidates.contains(&city) {
            candidates.push(city);
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn to_owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_three_line_address_yields_three_candidates() {
        let lines = to_owned(&["Zilker Park", "2207 Lou Neff Rd", "Austin, TX"]);
        let candidates = address_candidates(&lines);
        assert_eq!(
            candidates,
            vec![
                "Zilker Park, 2207 Lou Neff Rd, Austin, TX".to_string(),
                "Zilker Park, Austin, TX".to_string(),
                "Austin, TX".to_string(),
            ]
        );
    }

    #[test]
    fn test_two_line_address_deduplicates_street_city() {
        // street + city/state equals the full join, so only two candidates remain
        let lines = to_owned(&["2207 Lou Neff Rd", "Austin, TX"]);
        let candidates = address_candidates(&lines);
        assert_eq!(
            candidates,
            vec![
                "2207 Lou Neff Rd, Austin, TX".to_string(),
                "Austin, TX".to_string(),
            ]
        );
    }

    #[test]
    fn test_single_line_address() {
        let lines = to_owned(&["Austin, TX"]);
        let candidates = address_candidates(&lines);
        assert_eq!(candidates, vec!["Austin, TX".to_string()]);
    }

    #[test]
    fn test_empty_input_yields_no_candidates() {
        assert!(address_candidates(&[]).is_empty());
    }

    #[test]
    fn test_whitespace_only_lines_are_dropped() {
        let lines = to_owned(&["  ", "\t", ""]);
        assert!(address_candidates(&lines).is_empty());

        let lines = to_owned(&["  Venue Hall  ", "   ", "Austin, TX"]);
        let candidates = address_candidates(&lines);
        assert_eq!(
            candidates,
            vec![
                "Venue Hall, Austin, TX".to_string(),
                "Austin, TX".to_string(),
            ]
        );
    }

    #[rstest]
    #[case(&["A St", "B Town"])]
    #[case(&["A St", "Suite 4", "B Town"])]
    #[case(&["A St", "Suite 4", "Floor 2", "B Town"])]
    fn test_lists_of_two_or_more_yield_between_one_and_three(#[case] lines: &[&str]) {
        let candidates = address_candidates(&to_owned(lines));
        assert!((1..=3).contains(&candidates.len()));
        // deduplicated and non-empty
        for (i, candidate) in candidates.iter().enumerate() {
            assert!(!candidate.trim().is_empty());
            assert!(!candidates[..i].contains(candidate));
        }
        // ordered most-to-least specific
        for pair in candidates.windows(2) {
            assert!(pair[0].len() > pair[1].len());
        }
    }
}
