//! Name normalisation and fuzzy matching of free-text guesses.
//!
//! Everything here is pure: no I/O, no state, deterministic output for a
//! given input. Guesses are compared against answers in three stages (exact,
//! containment, bigram similarity) and the first stage that accepts wins.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization as _;

/// Minimum bigram similarity for a fuzzy match.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Minimum normalised guess length (in characters) for containment matching.
pub const MIN_CONTAINMENT_LEN: usize = 3;

/// Minimum `guess / answer` length ratio for containment matching.
pub const MIN_CONTAINMENT_RATIO: f64 = 0.4;

/// Letters that do not decompose under NFD and need an explicit fallback.
const SUBSTITUTIONS: &[(char, &str)] = &[
  ('ø', "o"),
  ('æ', "ae"),
  ('œ', "oe"),
  ('ß', "ss"),
  ('ł', "l"),
  ('đ', "d"),
  ('ð', "d"),
  ('þ', "th"),
  ('ı', "i"),
  ('ħ', "h"),
];

// ─── Normalisation ───────────────────────────────────────────────────────────

fn is_combining_diacritic(c: char) -> bool { ('\u{0300}'..='\u{036f}').contains(&c) }

/// Normalise a name for comparison.
///
/// Lowercases, strips combining diacritics after canonical decomposition,
/// folds the letters in the substitution table, collapses whitespace runs and
/// trims. `normalize(normalize(s)) == normalize(s)` for every input.
pub fn normalize(input: &str) -> String {
  let folded: String = input
    .to_lowercase()
    .nfd()
    .filter(|c| !is_combining_diacritic(*c))
    .fold(String::with_capacity(input.len()), |mut acc, c| {
      match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
        Some((_, to)) => acc.push_str(to),
        None => acc.push(c),
      }
      acc
    });

  folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Similarity ──────────────────────────────────────────────────────────────

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
  let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
  let mut counts = HashMap::new();
  for pair in chars.windows(2) {
    *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
  }
  counts
}

/// Sørensen–Dice coefficient over character bigrams, whitespace ignored.
///
/// Both arguments are expected to be normalised already.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
  let a_bigrams = bigrams(a);
  let b_bigrams = bigrams(b);
  let a_total: usize = a_bigrams.values().sum();
  let b_total: usize = b_bigrams.values().sum();

  if a_total == 0 || b_total == 0 {
    let a_compact: String = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b_compact: String = b.chars().filter(|c| !c.is_whitespace()).collect();
    return if a_compact == b_compact { 1.0 } else { 0.0 };
  }

  let shared: usize = a_bigrams
    .iter()
    .map(|(pair, count)| b_bigrams.get(pair).map_or(0, |other| (*count).min(*other)))
    .sum();

  (2 * shared) as f64 / (a_total + b_total) as f64
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// The verdict of comparing one guess against one answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameMatch {
  pub is_match: bool,
  /// Confidence in `[0, 1]`; `1.0` only for an exact normalised match.
  pub score:    f64,
}

impl NameMatch {
  const NONE: Self = Self { is_match: false, score: 0.0 };
}

/// Decide whether `guess` names `answer`.
///
/// 1. Exact equality after normalisation → score `1.0`.
/// 2. Guess of at least three characters contained in the answer and at
///    least 40% of its length → score `0.9 + ratio * 0.1`. This is what lets
///    a surname alone match a full name.
/// 3. Otherwise the bigram similarity, matching at or above
///    [`SIMILARITY_THRESHOLD`].
///
/// An empty normalised guess never matches.
pub fn match_name(guess: &str, answer: &str) -> NameMatch {
  let guess = normalize(guess);
  if guess.is_empty() {
    return NameMatch::NONE;
  }
  let answer = normalize(answer);

  if guess == answer {
    return NameMatch { is_match: true, score: 1.0 };
  }

  let guess_len = guess.chars().count();
  let answer_len = answer.chars().count();
  if guess_len >= MIN_CONTAINMENT_LEN && answer_len > 0 && answer.contains(&guess) {
    let ratio = guess_len as f64 / answer_len as f64;
    if ratio >= MIN_CONTAINMENT_RATIO {
      return NameMatch { is_match: true, score: 0.9 + ratio * 0.1 };
    }
  }

  let score = bigram_similarity(&guess, &answer);
  NameMatch { is_match: score >= SIMILARITY_THRESHOLD, score }
}

/// Index and verdict of the best-scoring matching answer, if any matches.
///
/// Ties keep the earliest candidate.
pub fn best_match<'a, I>(guess: &str, answers: I) -> Option<(usize, NameMatch)>
where
  I: IntoIterator<Item = &'a str>,
{
  answers
    .into_iter()
    .enumerate()
    .map(|(idx, answer)| (idx, match_name(guess, answer)))
    .filter(|(_, m)| m.is_match)
    .fold(None, |best: Option<(usize, NameMatch)>, (idx, m)| match best {
      Some((_, current)) if current.score >= m.score => best,
      _ => Some((idx, m)),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_strips_case_and_diacritics() {
    assert_eq!(normalize("  Kylian MBAPPÉ "), "kylian mbappe");
    assert_eq!(normalize("Ñíguez"), "niguez");
    assert_eq!(normalize("Martin Ødegaard"), "martin odegaard");
    assert_eq!(normalize("Łukasz Piszczek"), "lukasz piszczek");
    assert_eq!(normalize("Ærøskøbing"), "aeroskobing");
    assert_eq!(normalize("Müller   Thomas"), "muller thomas");
  }

  #[test]
  fn normalize_is_idempotent() {
    let samples = [
      "Morgan Rogers",
      "  Zlatan Ibrahimović",
      "Øyvind ÆSKE",
      "Đorđe Petrović",
      "Ştefan Radu",
      "N'Golo Kanté",
      "Thiago  Alcântara\t",
      "İlkay Gündoğan",
      "",
      "Œuvre Straße",
    ];
    for s in samples {
      let once = normalize(s);
      assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
    }
  }

  #[test]
  fn exact_match_scores_one() {
    let m = match_name("Morgan Rogers", "Morgan Rogers");
    assert!(m.is_match);
    assert_eq!(m.score, 1.0);

    let m = match_name("kylian mbappe", "Kylian Mbappé");
    assert!(m.is_match);
    assert_eq!(m.score, 1.0);
  }

  #[test]
  fn surname_matches_full_name() {
    let m = match_name("Messi", "Lionel Messi");
    assert!(m.is_match);
    assert!((0.9..=1.0).contains(&m.score), "score {}", m.score);
  }

  #[test]
  fn short_fragments_do_not_match_by_containment() {
    assert!(!match_name("me", "Lionel Messi").is_match);
    // Contained but far below 40% of the answer length.
    assert!(!match_name("Leo", "Leonardo Bonucci Santos").is_match);
  }

  #[test]
  fn different_names_are_rejected() {
    let m = match_name("Ronaldo", "Messi");
    assert!(!m.is_match);
    assert!(m.score < SIMILARITY_THRESHOLD);
  }

  #[test]
  fn small_typos_are_accepted() {
    assert!(match_name("Bukayo Sakka", "Bukayo Saka").is_match);
    assert!(!match_name("Bukayo Saka", "Bruno Fernandes").is_match);
  }

  #[test]
  fn empty_guess_never_matches() {
    assert_eq!(match_name("", "Messi"), NameMatch::NONE);
    assert_eq!(match_name("   ", "Messi"), NameMatch::NONE);
  }

  #[test]
  fn bigram_similarity_bounds() {
    assert_eq!(bigram_similarity("abc", "abc"), 1.0);
    assert_eq!(bigram_similarity("abc", "xyz"), 0.0);
    assert_eq!(bigram_similarity("a", "a"), 1.0);
    assert_eq!(bigram_similarity("a", "b"), 0.0);
  }

  #[test]
  fn best_match_prefers_highest_score() {
    let answers = ["Gabriel Jesus", "Gabriel Martinelli", "Gabriel Magalhaes"];
    let (idx, m) = best_match("Martinelli", answers).unwrap();
    assert_eq!(idx, 1);
    assert!(m.is_match);

    assert!(best_match("Haaland", answers).is_none());
  }
}
