use crate::canvas::{Command, Document};
use crate::flowable::{HELVETICA, text_width};
use crate::types::{Color, Pt};

/// The fixed-position strings stamped onto every captured page once the
/// total page count is known: the version line and "Page X of Y", both
/// right-aligned at absolute baselines near the bottom edge.
#[derive(Debug, Clone)]
pub struct PageStamp {
    pub version_text: String,
    pub page_number_template: String,
    /// Right edge the strings align against.
    pub right_x: Pt,
    /// Baselines measured from the bottom page edge.
    pub version_baseline: Pt,
    pub page_number_baseline: Pt,
    pub font_name: &'static str,
    pub font_size: Pt,
    pub color: Color,
}

impl PageStamp {
    pub const PAGE_NUMBER_TEMPLATE: &'static str = "Page {page} of {pages}";

    pub fn new(
        version_text: impl Into<String>,
        right_x: Pt,
        version_baseline: Pt,
        page_number_baseline: Pt,
        font_size: Pt,
        color: Color,
    ) -> Self {
        Self {
            version_text: version_text.into(),
            page_number_template: Self::PAGE_NUMBER_TEMPLATE.to_string(),
            right_x,
            version_baseline,
            page_number_baseline,
            font_name: HELVETICA,
            font_size,
            color,
        }
    }
}

/// Replace `{page}` and `{pages}` in a template string.
pub fn substitute_placeholders(template: &str, page_number: usize, page_count: usize) -> String {
    template
        .replace("{page}", &page_number.to_string())
        .replace("{pages}", &page_count.to_string())
}

/// The finalizing half of the two-pass render. The collecting pass captured
/// one command buffer per page; now that the count is known, walk the
/// captured pages in order and append the page-number and version strings.
/// No page is (or could have been) emitted before this runs, so `{pages}`
/// is exact on every page by construction.
pub fn apply_page_stamps(document: &mut Document, stamp: &PageStamp) {
    let page_count = document.pages.len();
    let page_height = document.page_size.height;
    for (index, page) in document.pages.iter_mut().enumerate() {
        let page_text = substitute_placeholders(&stamp.page_number_template, index + 1, page_count);
        page.commands.push(Command::SetFillColor(stamp.color));
        page.commands
            .push(Command::SetFontName(stamp.font_name.to_string()));
        page.commands.push(Command::SetFontSize(stamp.font_size));
        for (text, baseline) in [
            (stamp.version_text.as_str(), stamp.version_baseline),
            (page_text.as_str(), stamp.page_number_baseline),
        ] {
            // DrawString takes the top of the line; convert the absolute
            // bottom-edge baseline the same way the PDF writer will.
            let y = page_height - baseline - stamp.font_size;
            let x = stamp.right_x - text_width(text, stamp.font_size);
            page.commands.push(Command::DrawString {
                x,
                y,
                text: text.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, Page};
    use crate::types::Size;

    fn stamp() -> PageStamp {
        PageStamp::new(
            "1.0",
            Pt::from_f32(567.0),
            Pt::from_f32(32.4),
            Pt::from_f32(23.04),
            Pt::from_f32(6.0),
            Color::rgb(0.5, 0.5, 0.5),
        )
    }

    fn document_with_pages(count: usize) -> Document {
        let mut canvas = Canvas::new(Size::letter());
        for _ in 0..count {
            canvas.draw_string(Pt::ZERO, Pt::ZERO, "content");
            canvas.show_page();
        }
        canvas.finish_without_show()
    }

    fn page_strings(page: &Page) -> Vec<String> {
        page.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn substitution_fills_both_tokens() {
        assert_eq!(
            substitute_placeholders("Page {page} of {pages}", 2, 7),
            "Page 2 of 7"
        );
        assert_eq!(substitute_placeholders("no tokens", 1, 1), "no tokens");
    }

    #[test]
    fn every_page_gets_numbered_against_the_final_total() {
        let mut document = document_with_pages(3);
        apply_page_stamps(&mut document, &stamp());
        assert_eq!(document.pages.len(), 3);
        for (index, page) in document.pages.iter().enumerate() {
            let strings = page_strings(page);
            assert!(strings.contains(&format!("Page {} of 3", index + 1)));
            assert!(strings.contains(&"1.0".to_string()));
        }
    }

    #[test]
    fn stamp_positions_do_not_depend_on_page_content() {
        let mut one = document_with_pages(1);
        let mut three = document_with_pages(3);
        apply_page_stamps(&mut one, &stamp());
        apply_page_stamps(&mut three, &stamp());
        let position_of = |page: &Page, needle: &str| {
            page.commands.iter().find_map(|cmd| match cmd {
                Command::DrawString { x, y, text } if text == needle => Some((*x, *y)),
                _ => None,
            })
        };
        let version_a = position_of(&one.pages[0], "1.0").expect("version on page");
        let version_b = position_of(&three.pages[2], "1.0").expect("version on page");
        assert_eq!(version_a, version_b);
    }

    #[test]
    fn single_page_reads_one_of_one() {
        let mut document = document_with_pages(1);
        apply_page_stamps(&mut document, &stamp());
        assert!(page_strings(&document.pages[0]).contains(&"Page 1 of 1".to_string()));
    }
}
