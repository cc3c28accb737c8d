//! Admin-path exclusion filter.
//!
//! Administrative screens must never generate telemetry: the filter runs
//! before any record is created, on the client before it so much as
//! computes a fingerprint, and again at ingestion as a backstop.
//!
//! Matching is deliberately pure substring matching over the lowercased
//! URL, plus a loose check of query-parameter names. That means a
//! legitimate public path containing one of the markers (say,
//! `/services/project-management`) is silently excluded too. This is a
//! known, accepted limitation of the product behavior; widening or
//! narrowing the patterns is a product decision, not a refactor.

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Pattern set deciding whether a URL belongs to an administrative area.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
  /// Substrings matched against the lowercased URL (path or full form).
  url_markers:     Vec<String>,
  /// Substrings matched against the fragment, `#` included.
  fragment_markers: Vec<String>,
  /// Query-parameter names whose mere presence excludes the page.
  query_flags:     Vec<String>,
}

impl Default for ExclusionFilter {
  fn default() -> Self {
    Self {
      url_markers: vec![
        "/admin".into(),
        "admin-dashboard".into(),
        "management".into(),
        "control-panel".into(),
      ],
      fragment_markers: vec!["#admin".into()],
      query_flags: vec!["admin".into(), "dashboard".into()],
    }
  }
}

impl ExclusionFilter {
  /// Returns `true` when `url` (a path, or a full URL with query and
  /// fragment) matches any administrative marker.
  pub fn is_excluded(&self, url: &str) -> bool {
    let lower = url.to_ascii_lowercase();

    if self.fragment_markers.iter().any(|m| lower.contains(m)) {
      return true;
    }

    // Strip the fragment before the remaining checks so a fragment can
    // only match through fragment_markers.
    let without_fragment = lower.split('#').next().unwrap_or(&lower);
    let (base, query) = match without_fragment.split_once('?') {
      Some((b, q)) => (b, Some(q)),
      None => (without_fragment, None),
    };

    if self.url_markers.iter().any(|m| base.contains(m.as_str())) {
      return true;
    }

    if let Some(query) = query {
      for pair in query.split('&') {
        let key = pair.split('=').next().unwrap_or(pair);
        if self.query_flags.iter().any(|f| f == key) {
          return true;
        }
      }
    }

    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filter() -> ExclusionFilter { ExclusionFilter::default() }

  #[test]
  fn plain_pages_pass() {
    for url in ["/", "/urunler", "/blog/yeni-sezon", "/contact?ref=footer"] {
      assert!(!filter().is_excluded(url), "{url} should be tracked");
    }
  }

  #[test]
  fn admin_paths_are_excluded() {
    for url in [
      "/admin",
      "/admin/products",
      "https://example.com/admin-dashboard",
      "/site/control-panel/settings",
      "/yonetim/management",
    ] {
      assert!(filter().is_excluded(url), "{url} should be excluded");
    }
  }

  #[test]
  fn fragment_and_query_markers_are_excluded() {
    assert!(filter().is_excluded("/#admin"));
    assert!(filter().is_excluded("/app#admin-panel"));
    assert!(filter().is_excluded("/?admin=1"));
    assert!(filter().is_excluded("/home?x=1&dashboard=true"));
    assert!(filter().is_excluded("/home?dashboard"));
  }

  #[test]
  fn query_values_do_not_trip_flags() {
    // Only parameter *names* are flags.
    assert!(!filter().is_excluded("/search?q=admin"));
  }

  #[test]
  fn matching_is_case_insensitive() {
    assert!(filter().is_excluded("/Admin/Panel"));
    assert!(filter().is_excluded("/#ADMIN"));
  }

  #[test]
  fn substring_false_positive_is_accepted_behavior() {
    // Pins the documented limitation: a public marketing page whose path
    // merely contains a marker is excluded as well.
    assert!(filter().is_excluded("/services/project-management"));
  }
}
