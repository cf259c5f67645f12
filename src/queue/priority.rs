//! Priority resolution from request hints.

use super::job::Priority;

const PRIORITY_HINTS: &[(&str, Priority)] = &[
    ("high", Priority::High),
    ("urgent", Priority::High),
    ("alta", Priority::High),
    ("normal", Priority::Normal),
    ("default", Priority::Normal),
    ("media", Priority::Normal),
    ("low", Priority::Low),
    ("background", Priority::Low),
    ("baixa", Priority::Low),
];

const TYPE_HINTS: &[(&str, Priority)] = &[
    ("update", Priority::High),
    ("refresh", Priority::High),
    ("atualizacao", Priority::High),
    ("low", Priority::Low),
    ("batch", Priority::Low),
    ("bulk", Priority::Low),
    ("report", Priority::Low),
];

/// Resolves the priority class of a request.
///
/// The priority hint wins when it is recognized; otherwise the type hint is
/// consulted; anything else is `Normal`. Matching ignores case and
/// surrounding whitespace.
pub fn resolve_priority(priority_hint: Option<&str>, type_hint: Option<&str>) -> Priority {
    lookup(PRIORITY_HINTS, priority_hint)
        .or_else(|| lookup(TYPE_HINTS, type_hint))
        .unwrap_or(Priority::Normal)
}

fn lookup(table: &[(&str, Priority)], hint: Option<&str>) -> Option<Priority> {
    let hint = hint?.trim();
    table
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(hint))
        .map(|(_, priority)| *priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_hints() {
        assert_eq!(resolve_priority(Some("high"), None), Priority::High);
        assert_eq!(resolve_priority(Some("URGENT"), None), Priority::High);
        assert_eq!(resolve_priority(Some(" alta "), None), Priority::High);
        assert_eq!(resolve_priority(Some("default"), None), Priority::Normal);
        assert_eq!(resolve_priority(Some("Background"), None), Priority::Low);
        assert_eq!(resolve_priority(Some("baixa"), None), Priority::Low);
    }

    #[test]
    fn test_type_hints_used_when_priority_absent_or_unknown() {
        assert_eq!(resolve_priority(None, Some("update")), Priority::High);
        assert_eq!(resolve_priority(None, Some("Refresh")), Priority::High);
        assert_eq!(resolve_priority(None, Some("bulk")), Priority::Low);
        assert_eq!(resolve_priority(Some("whenever"), Some("report")), Priority::Low);
    }

    #[test]
    fn test_priority_hint_wins_over_type_hint() {
        assert_eq!(resolve_priority(Some("low"), Some("update")), Priority::Low);
        assert_eq!(resolve_priority(Some("high"), Some("batch")), Priority::High);
    }

    #[test]
    fn test_unrecognized_hints_default_to_normal() {
        assert_eq!(resolve_priority(None, None), Priority::Normal);
        assert_eq!(resolve_priority(Some(""), Some("")), Priority::Normal);
        assert_eq!(resolve_priority(Some("asap"), Some("misc")), Priority::Normal);
    }
}
