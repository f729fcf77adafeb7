//! Text preparation: turn a row's requested columns into one document.

use std::sync::LazyLock;

use regex::Regex;

/// Per-document byte budget imposed by the service.
pub const MAX_TEXT_BYTES: usize = 5000;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Options applied to every document of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextOptions {
  pub strip_tags: bool,
}

/// Join `values` with single spaces (absent values count as empty), strip
/// markup when asked to, and fit the result into [`MAX_TEXT_BYTES`].
pub fn prepare_text(values: &[Option<String>], options: TextOptions) -> String {
  let joined = values
    .iter()
    .map(|v| v.as_deref().unwrap_or(""))
    .collect::<Vec<_>>()
    .join(" ");
  let joined = if options.strip_tags { strip_tags(&joined) } else { joined };
  truncate_text(&joined, MAX_TEXT_BYTES).to_owned()
}

/// Remove `<...>`-delimited tags.
pub fn strip_tags(text: &str) -> String { TAG.replace_all(text, "").into_owned() }

/// Cut `text` to at most `max_bytes` bytes, then back to the last whitespace
/// so that neither a codepoint nor a word is split.
///
/// When the cut prefix contains no usable whitespace the longest prefix
/// ending on a character boundary is returned instead.
pub fn truncate_text(text: &str, max_bytes: usize) -> &str {
  if text.len() <= max_bytes {
    return text;
  }

  let mut end = max_bytes;
  while !text.is_char_boundary(end) {
    end -= 1;
  }
  let head = &text[..end];

  match head.rfind(char::is_whitespace) {
    Some(idx) if !head[..idx].trim_end().is_empty() => head[..idx].trim_end(),
    _ => {
      tracing::debug!(bytes = text.len(), "no whitespace to truncate at, cutting at a char boundary");
      head
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn some(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some((*v).to_owned())).collect()
  }

  #[test]
  fn joins_columns_with_single_space() {
    let text = prepare_text(&some(&["John", "Bob"]), TextOptions::default());
    assert_eq!(text, "John Bob");
  }

  #[test]
  fn absent_values_become_empty_strings() {
    let text = prepare_text(&[None, Some("x".into()), None], TextOptions::default());
    assert_eq!(text, " x ");
  }

  #[test]
  fn short_text_is_untouched() {
    assert_eq!(truncate_text("John Bob", MAX_TEXT_BYTES), "John Bob");
  }

  #[test]
  fn strips_tags_only_when_asked() {
    let values = some(&["<p>Hello <b>Sandra</b></p>"]);
    assert_eq!(
      prepare_text(&values, TextOptions { strip_tags: true }),
      "Hello Sandra"
    );
    assert_eq!(
      prepare_text(&values, TextOptions::default()),
      "<p>Hello <b>Sandra</b></p>"
    );
  }

  #[test]
  fn long_text_is_cut_back_to_last_whitespace() {
    let text = format!("{} {}", "a".repeat(4990), "bbbbbbbbbbbbbbbbbbbb");
    let cut = truncate_text(&text, MAX_TEXT_BYTES);
    assert_eq!(cut, "a".repeat(4990));
  }

  #[test]
  fn whitespace_runs_are_trimmed_from_the_cut() {
    let text = format!("{}   {}", "a".repeat(10), "b".repeat(20));
    assert_eq!(truncate_text(&text, 20), "a".repeat(10));
  }

  #[test]
  fn never_splits_a_multibyte_codepoint() {
    let text = format!("{} {}", "€".repeat(1000), "€".repeat(1000));
    let cut = truncate_text(&text, MAX_TEXT_BYTES);
    assert!(cut.len() <= MAX_TEXT_BYTES);
    assert_eq!(cut, "€".repeat(1000));
  }

  #[test]
  fn no_whitespace_falls_back_to_char_boundary() {
    let text = "€".repeat(2000);
    let cut = truncate_text(&text, MAX_TEXT_BYTES);
    assert_eq!(cut.len(), 4998);
    assert!(cut.chars().all(|c| c == '€'));
  }

  #[test]
  fn leading_whitespace_only_falls_back_to_char_boundary() {
    let text = format!(" {}", "x".repeat(6000));
    let cut = truncate_text(&text, MAX_TEXT_BYTES);
    assert_eq!(cut.len(), MAX_TEXT_BYTES);
  }

  #[test]
  fn prepared_text_respects_byte_budget() {
    let long = "word ".repeat(2000);
    let text = prepare_text(&[Some(long)], TextOptions::default());
    assert!(text.len() <= MAX_TEXT_BYTES);
    assert!(text.ends_with("word"));
  }
}
