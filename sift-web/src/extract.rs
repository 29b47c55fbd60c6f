//! Main-content extraction.
//!
//! Content containers are probed one selector at a time, in order; the first
//! selector that matches an element wins. When none match, the body text is
//! read with boilerplate elements hidden. Either way the text is whitespace
//! normalized before it is returned.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use sift_drivers::browser::BrowserPage;

/// Candidate main-content containers, most specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    ".main-content",
    "#main-content",
    ".post-content",
    ".article-content",
];

/// Elements hidden before reading the whole body.
pub const BOILERPLATE_SELECTORS: &[&str] = &[
    "header",
    "footer",
    "nav",
    "aside",
    "script",
    "style",
    "noscript",
    "template",
    "meta",
    "link",
    "[role=\"complementary\"]",
    "[role=\"navigation\"]",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionSource {
    Selector(&'static str),
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub source: ExtractionSource,
}

/// Script returning the rendered text of the first element matching
/// `selector`, or `null` when nothing matches. Never `textContent`, which
/// includes script and style bodies.
pub fn selector_probe_script(selector: &str) -> String {
    let quoted = Value::String(selector.to_string());
    format!(
        "const el = document.querySelector({quoted});\n\
         if (!el) {{ return null; }}\n\
         return el.innerText ?? '';"
    )
}

/// Script returning the body's visible text with boilerplate hidden. Inline
/// `display` values are restored afterwards, in reverse order so elements
/// matched by several selectors end up as they started.
pub fn fallback_text_script() -> String {
    let selectors = Value::from(BOILERPLATE_SELECTORS.to_vec());
    format!(
        r#"const selectors = {selectors};
const hidden = [];
for (const selector of selectors) {{
  for (const el of document.querySelectorAll(selector)) {{
    hidden.push([el, el.style.display]);
    el.style.display = 'none';
  }}
}}
try {{
  return document.body ? (document.body.innerText || '') : '';
}} finally {{
  for (let i = hidden.length - 1; i >= 0; i--) {{
    hidden[i][0].style.display = hidden[i][1];
  }}
}}"#
    )
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run the selector cascade against the document loaded in `page`.
pub async fn extract_main_content(page: &mut dyn BrowserPage) -> Result<Extraction> {
    for &selector in CONTENT_SELECTORS {
        match page.evaluate(&selector_probe_script(selector)).await? {
            Value::Null => continue,
            Value::String(text) => {
                return Ok(Extraction {
                    text: normalize_whitespace(&text),
                    source: ExtractionSource::Selector(selector),
                });
            }
            other => bail!("selector probe for {selector} returned {other}"),
        }
    }

    let body = page.evaluate(&fallback_text_script()).await?;
    let text = body
        .as_str()
        .ok_or_else(|| anyhow!("fallback extraction returned {body}"))?;
    Ok(Extraction {
        text: normalize_whitespace(text),
        source: ExtractionSource::Fallback,
    })
}
