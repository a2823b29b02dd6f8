//! Typo suggestions for task and option names.

/// Find the closest known name to `unknown` by edit distance.
///
/// Returns `None` if nothing is close enough to be a plausible typo.
pub fn suggest_similar<'a>(unknown: &str, known: impl IntoIterator<Item = &'a str>) -> Option<String> {
  let max_distance = match unknown.chars().count() {
    0..=2 => 1,
    3..=5 => 2,
    _ => 3,
  };

  let mut best: Option<(&str, usize)> = None;
  for name in known {
    let dist = levenshtein(unknown, name);
    if dist <= max_distance && best.is_none_or(|(_, d)| dist < d) {
      best = Some((name, dist));
    }
  }

  best.map(|(name, _)| name.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();

  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0usize; b.len() + 1];

  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=b.len() {
      let cost = usize::from(a[i - 1] != b[j - 1]);
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[b.len()]
}
