//! Phase ordering and parallel-group classification, derived purely from
//! step list order.

use std::collections::HashMap;

use indexmap::IndexMap;

use flowscope_model::Step;

const ROMANS: &[&str] = &[
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];

/// Roman numeral per phase key, assigned in order of first appearance while
/// scanning the step list, not alphabetical and not from the phase table.
pub fn phase_romans(steps: &[Step]) -> IndexMap<String, String> {
    let mut map: IndexMap<String, String> = IndexMap::new();
    for step in steps {
        if !map.contains_key(&step.phase) {
            let n = map.len();
            let roman = ROMANS
                .get(n)
                .map(|r| (*r).to_string())
                .unwrap_or_else(|| (n + 1).to_string());
            map.insert(step.phase.clone(), roman);
        }
    }
    map
}

/// Group letter per step id. A run of consecutive `parallel` steps shares one
/// letter; a non-parallel step breaks the run so the next run gets the next
/// letter.
pub fn parallel_groups(steps: &[Step]) -> HashMap<String, char> {
    let mut map = HashMap::new();
    let mut letter = b'A';
    let mut in_group = false;
    for step in steps {
        if step.parallel {
            in_group = true;
            map.insert(step.id.clone(), letter as char);
        } else if in_group {
            in_group = false;
            letter = letter.saturating_add(1).min(b'Z');
        }
    }
    map
}
