//! HTML table grid renderer
//!
//! Produces the body rows of a table, for the host to wrap in its own
//! `<table>`:
//!
//! ```text
//! <tr><td>..</td><td>..</td><td>..</td><tr><td>..</td>
//! ```
//!
//! A new row starts after every `cols` cells while photos remain. The number
//! of rows is bounded only by how many photos the page returned.

use crate::flickr::PhotoRecord;

/// Opening row marker
pub const ROW_START: &str = "<tr>";

const CELL_START: &str = "<td>";
const CELL_END: &str = "</td>";

/// Render photos into grid rows of `cols` cells
pub fn render(photos: &[PhotoRecord], cols: u32) -> String {
    let cols = cols.max(1) as usize;
    let mut markup = String::from(ROW_START);

    for (i, photo) in photos.iter().enumerate() {
        markup.push_str(CELL_START);
        markup.push_str("<a href=\"");
        push_escaped(&mut markup, &photo.permalink_url());
        markup.push_str("\"><img src=\"");
        push_escaped(&mut markup, &photo.thumbnail_url());
        markup.push_str("\"></a>");
        markup.push_str(CELL_END);

        let placed = i + 1;
        if placed % cols == 0 && placed < photos.len() {
            markup.push_str(ROW_START);
        }
    }

    markup
}

/// Escape a value for use inside a double-quoted attribute
fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
