// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Spelling suggestions for file paths that matched nothing.

/// Largest edit distance still considered a typo.
pub const MAX_DISTANCE: usize = 3;

/// Find closest candidate to a requested path.
///
/// Only candidates within [`MAX_DISTANCE`] edits, and fewer edits than the
/// requested path has characters, qualify. Ties go to the earliest candidate.
pub fn suggest<'a>(
    requested: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let length = requested.chars().count();
    let mut best: Option<(&str, usize)> = None;

    for candidate in candidates {
        let distance = edit_distance(requested, candidate);
        if distance > MAX_DISTANCE || distance >= length {
            continue;
        }

        if best.is_none_or(|(_, closest)| distance < closest) {
            best = Some((candidate, distance));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Levenshtein edit distance between two strings.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    if a.is_empty() {
        return b.len();
    }

    // Two rows are enough, only the previous row is ever looked at.
    let mut previous = (0..=b.len()).collect::<Vec<_>>();
    let mut current = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
