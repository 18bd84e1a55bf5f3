//! Template renderer
//!
//! Turns a template plus one recipient row into an HTML fragment:
//!   - `{{key}}` tokens are replaced with the row's value for the trimmed key
//!   - each block's styles become one inline `style` attribute
//!   - the block type picks the wrapping element
//!
//! Everything here is pure and total; fetching templates and sending mail
//! live in `services::mailing`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::{Block, BlockStyles, FallbackPolicy, RecipientRow, Template};

/// `{{`, anything but `}`, `}}`. Nesting and escaping are not supported.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]*)\}\}").expect("valid placeholder pattern"));

/// Replace every placeholder token in `content`.
///
/// A key present in `row` is substituted even when its value is empty.
/// A key absent from `row` is handled by `policy`.
pub fn substitute(content: &str, row: &RecipientRow, policy: FallbackPolicy) -> String {
    PLACEHOLDER
        .replace_all(content, |caps: &Captures| {
            let key = caps[1].trim();
            match (row.get(key), policy) {
                (Some(value), _) => value.to_string(),
                (None, FallbackPolicy::Preview) => caps[0].to_string(),
                (None, FallbackPolicy::Send) => String::new(),
            }
        })
        .into_owned()
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Serialize styles to inline CSS in a fixed declaration order.
/// Unset fields get an explicit CSS default instead of being dropped.
pub fn styles_to_css(styles: &BlockStyles) -> String {
    [
        ("text-align", or_default(&styles.text_align, "left")),
        ("font-size", or_default(&styles.font_size, "inherit")),
        ("color", or_default(&styles.color, "inherit")),
        ("background-color", or_default(&styles.background_color, "transparent")),
        ("font-weight", or_default(&styles.font_weight, "normal")),
        ("font-style", or_default(&styles.font_style, "normal")),
        ("text-decoration", or_default(&styles.text_decoration, "none")),
    ]
    .iter()
    .map(|(property, value)| format!("{}: {}", property, value))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Render a single block as an HTML fragment
pub fn render_block(block: &Block, row: &RecipientRow, policy: FallbackPolicy) -> String {
    let tag = block.block_type.html_tag();
    format!(
        r#"<{tag} style="{css}">{content}</{tag}>"#,
        tag = tag,
        css = styles_to_css(&block.styles),
        content = substitute(&block.content, row, policy),
    )
}

/// Render all blocks in order, concatenated without separators
pub fn render_template(template: &Template, row: &RecipientRow, policy: FallbackPolicy) -> String {
    template
        .blocks
        .iter()
        .map(|block| render_block(block, row, policy))
        .collect()
}

/// Render one document per row using the send-time fallback.
/// `result[i]` belongs to `rows[i]`.
pub fn render_batch(template: &Template, rows: &[RecipientRow]) -> Vec<String> {
    rows.iter()
        .map(|row| render_template(template, row, FallbackPolicy::Send))
        .collect()
}

/// Distinct trimmed placeholder names across all blocks, first-seen order.
pub fn extract_placeholders(blocks: &[Block]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for block in blocks {
        for caps in PLACEHOLDER.captures_iter(&block.content) {
            let name = caps[1].trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

// =============================================================================
// Tests
// =============================================================================
