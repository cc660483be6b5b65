use std::collections::HashMap;

pub const TOP_TEMPLATE: &str = include_str!("../templates/top.html");
pub const HEADER_TEMPLATE: &str = include_str!("../templates/header.html");
pub const FOOTER_TEMPLATE: &str = include_str!("../templates/footer.html");
pub const BOTTOM_TEMPLATE: &str = include_str!("../templates/bottom.html");

pub const BIBLE_SITE_CSS: &str = include_str!("../templates/BibleSite.css");
pub const BIBLE_CHAPTER_CSS: &str =
  include_str!("../templates/BibleChapter.css");
pub const OET_CHAPTER_CSS: &str = include_str!("../templates/OETChapter.css");
pub const BIBLE_JS: &str = include_str!("../templates/Bible.js");

/// Page templates under the names they include each other by.
///
/// The names carry no `.html` suffix so tera leaves autoescaping off. Values
/// are escaped before they reach the context.
#[must_use]
pub fn page_templates() -> [(&'static str, &'static str); 4] {
  [
    ("top", TOP_TEMPLATE),
    ("header", HEADER_TEMPLATE),
    ("footer", FOOTER_TEMPLATE),
    ("bottom", BOTTOM_TEMPLATE),
  ]
}

/// Stylesheets and scripts copied to the site root, keyed by file name.
#[must_use]
pub fn all_assets() -> HashMap<&'static str, &'static str> {
  let mut assets = HashMap::new();
  assets.insert("BibleSite.css", BIBLE_SITE_CSS);
  assets.insert("BibleChapter.css", BIBLE_CHAPTER_CSS);
  assets.insert("OETChapter.css", OET_CHAPTER_CSS);
  assets.insert("Bible.js", BIBLE_JS);
  assets
}
