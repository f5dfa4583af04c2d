//! Deterministic Certificate of Analysis PDF generation.
//!
//! The engine lays user-supplied field values and up to eight
//! tested-property rows into fixed sections (customer info, product info,
//! results table), decorates every page with fixed-position header/footer
//! art and a disclaimer block, and resolves "Page X of Y" with a two-pass
//! render: pages are captured as command buffers first, stamped with the
//! final count second, and only then serialized. Identical inputs produce
//! byte-identical PDFs.
//!
//! ```no_run
//! use coapress::{CoaGenerator, FieldKey, FieldMap, PageAssets, TestRow};
//!
//! let assets = PageAssets::load(std::path::Path::new("assets"));
//! let mut fields = FieldMap::new();
//! fields.insert(FieldKey::CustomerName, "Acme Corp");
//! let rows = vec![TestRow {
//!     property: "Viscosity".into(),
//!     result: "1500".into(),
//!     ..TestRow::default()
//! }];
//! let pdf = CoaGenerator::new(assets).generate(&fields, &rows)?;
//! # Ok::<(), coapress::CoaError>(())
//! ```

mod assets;
mod canvas;
mod doc_template;
mod error;
mod fields;
mod finalize;
mod flowable;
mod format;
mod frame;
mod layout;
mod page_template;
mod pdf;
mod types;

pub use assets::{
    DEFAULT_DISCLAIMER, DEFAULT_VERSION, DISCLAIMER_FILE, FOOTER_IMAGE_FILE, HEADER_IMAGE_FILE,
    PageAssets, RasterAsset, VERSION_FILE, scaled_height,
};
pub use canvas::{Canvas, Command, Document, Page};
pub use doc_template::DocTemplate;
pub use error::CoaError;
pub use fields::{
    FieldKey, FieldMap, ImportWarning, ImportedData, MAX_TEST_ROWS, TestRow, assemble_test_rows,
    parse_import, suggested_filename,
};
pub use finalize::{PageStamp, apply_page_stamps, substitute_placeholders};
pub use flowable::{
    Flowable, GridStyle, HELVETICA, HELVETICA_BOLD, Paragraph, Spacer, TableCell, TableFlowable,
    TextAlign, TextStyle,
};
pub use format::{format_magnitude, normalize_date};
pub use frame::{AddResult, Frame};
pub use layout::{LayoutConfig, LayoutGeometry, fit_column_widths};
pub use page_template::{DocContext, FrameSpec, OnPageCallback, PageTemplate};
pub use pdf::document_to_pdf;
pub use types::{Color, Pt, Rect, Size};

/// The document assembler: owns the immutable layout configuration and the
/// loaded page assets, and turns (fields, rows) into finished PDF bytes.
///
/// A generator holds no mutable state, so one instance can serve concurrent
/// generations; every call builds its own canvas and page list.
pub struct CoaGenerator {
    config: LayoutConfig,
    assets: PageAssets,
}

impl CoaGenerator {
    pub fn new(assets: PageAssets) -> Self {
        Self {
            config: LayoutConfig::default(),
            assets,
        }
    }

    pub fn with_config(config: LayoutConfig, assets: PageAssets) -> Self {
        Self { config, assets }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn assets(&self) -> &PageAssets {
        &self.assets
    }

    /// Run both render passes and return the stamped command-buffer
    /// document. Mostly useful for inspection; [`generate`](Self::generate)
    /// is the byte-producing entry point.
    pub fn render_document(
        &self,
        fields: &FieldMap,
        rows: &[TestRow],
    ) -> Result<Document, CoaError> {
        let geometry = LayoutGeometry::compute(&self.config, &self.assets);
        let decoration = layout::Decoration::new(&self.config, &self.assets, &geometry);
        let template = PageTemplate::new("main", self.config.page_size)
            .with_frame(geometry.frame)
            .set_on_page(move |canvas, _context| decoration.paint(canvas));

        let rows = assemble_test_rows(rows.iter().cloned());
        let mut doc = DocTemplate::new(vec![template]);
        for flowable in layout::build_customer_section(fields, &self.config, geometry.content_width)
        {
            doc.add_flowable(flowable);
        }
        for flowable in layout::build_product_section(fields, &self.config, geometry.content_width)
        {
            doc.add_flowable(flowable);
        }
        for flowable in layout::build_results_section(&rows, &self.config, geometry.content_width) {
            doc.add_flowable(flowable);
        }

        let mut document = doc.build()?;
        apply_page_stamps(&mut document, &self.page_stamp());
        Ok(document)
    }

    /// Generate the certificate. Pure function of (fields, rows, assets,
    /// config): identical inputs yield byte-identical output.
    pub fn generate(&self, fields: &FieldMap, rows: &[TestRow]) -> Result<Vec<u8>, CoaError> {
        let document = self.render_document(fields, rows)?;
        let images = self.assets.image_resources();
        Ok(pdf::document_to_pdf(&document, &images)?)
    }

    fn page_stamp(&self) -> PageStamp {
        PageStamp::new(
            self.assets.version.clone(),
            self.config.footer_right_x,
            self.config.version_baseline,
            self.config.page_number_baseline,
            self.config.decoration_font_size,
            layout::DECORATION_GRAY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn sample_fields() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(FieldKey::CustomerName, "Acme Corp");
        fields.insert(FieldKey::PoNumber, "PO-1234");
        fields.insert(FieldKey::OrderDate, "03/14/2024");
        fields.insert(FieldKey::ItemSku, "SKU-9");
        fields.insert(FieldKey::LotNumber, "L-55");
        fields.insert(FieldKey::ExpirationDate, "12/31/2026");
        fields
    }

    fn sample_rows() -> Vec<TestRow> {
        vec![
            TestRow {
                property: "Viscosity".into(),
                test_method: "ASTM D445".into(),
                unit: "cSt".into(),
                lower_limit: "900".into(),
                upper_limit: "1500".into(),
                result: "1200".into(),
                ..TestRow::default()
            },
            TestRow {
                property: "Particle Count".into(),
                result: "2500000".into(),
                ..TestRow::default()
            },
        ]
    }

    /// Rows long enough to overflow one content frame and force a split.
    fn overflowing_rows() -> Vec<TestRow> {
        let long = "lorem ".repeat(150);
        (0..3)
            .map(|index| TestRow {
                property: format!("prop {} {}", index, long),
                result: "1".into(),
                ..TestRow::default()
            })
            .collect()
    }

    fn assets_with_art() -> PageAssets {
        let png = crate::assets::tests::tiny_png();
        let mut assets = PageAssets::default();
        assets.header = RasterAsset::from_bytes(png.clone());
        assets.footer = RasterAsset::from_bytes(png);
        assets
    }

    fn page_strings(page: &Page) -> Vec<String> {
        page.commands
            .iter()
            .filter_map(|command| match command {
                Command::DrawString { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn generation_is_byte_identical() {
        let generator = CoaGenerator::new(PageAssets::default());
        let first = generator
            .generate(&sample_fields(), &sample_rows())
            .expect("generate");
        let second = generator
            .generate(&sample_fields(), &sample_rows())
            .expect("generate");
        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF"));
    }

    #[test]
    fn single_page_certificate_reads_one_of_one() {
        let generator = CoaGenerator::new(PageAssets::default());
        let document = generator
            .render_document(&sample_fields(), &sample_rows())
            .expect("render");
        assert_eq!(document.pages.len(), 1);
        let strings = page_strings(&document.pages[0]);
        assert!(strings.contains(&"Page 1 of 1".to_string()));
        assert!(strings.contains(&DEFAULT_VERSION.to_string()));
        assert!(strings.contains(&"CUSTOMER INFORMATION".to_string()));
        assert!(strings.contains(&"PRODUCT INFORMATION".to_string()));
        assert!(strings.contains(&"TESTED PROPERTIES".to_string()));
        // Date normalization applied during section construction.
        assert!(strings.contains(&"2024-03-14".to_string()));
        assert!(strings.contains(&"1.5E+03".to_string()));
    }

    #[test]
    fn multi_page_numbering_matches_capture_count() {
        let generator = CoaGenerator::new(PageAssets::default());
        let document = generator
            .render_document(&sample_fields(), &overflowing_rows())
            .expect("render");
        let total = document.pages.len();
        assert!(total > 1, "expected the long rows to span pages");
        for (index, page) in document.pages.iter().enumerate() {
            let strings = page_strings(page);
            assert!(
                strings.contains(&format!("Page {} of {}", index + 1, total)),
                "page {} missing its number",
                index + 1
            );
            assert!(strings.contains(&DEFAULT_VERSION.to_string()));
        }
    }

    #[test]
    fn results_header_repeats_on_continuation_pages() {
        let generator = CoaGenerator::new(PageAssets::default());
        let document = generator
            .render_document(&sample_fields(), &overflowing_rows())
            .expect("render");
        assert!(document.pages.len() > 1);
        for page in &document.pages[1..] {
            assert!(
                page_strings(page).contains(&"PROPERTY".to_string()),
                "continuation page missing repeated table header"
            );
        }
    }

    #[test]
    fn decoration_positions_are_stable_across_document_lengths() {
        let generator = CoaGenerator::new(assets_with_art());
        let short = generator
            .render_document(&sample_fields(), &sample_rows())
            .expect("render");
        let long = generator
            .render_document(&sample_fields(), &overflowing_rows())
            .expect("render");
        assert!(long.pages.len() > short.pages.len());

        let image_positions = |page: &Page| {
            page.commands
                .iter()
                .filter_map(|command| match command {
                    Command::DrawImage { x, y, .. } => Some((*x, *y)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let reference = image_positions(&short.pages[0]);
        assert_eq!(reference.len(), 2, "header and footer on the page");
        for page in long.pages.iter() {
            assert_eq!(image_positions(page), reference);
        }
    }

    #[test]
    fn extra_rows_beyond_the_cap_are_dropped() {
        let generator = CoaGenerator::new(PageAssets::default());
        let rows: Vec<TestRow> = (0..12)
            .map(|index| TestRow {
                property: format!("p{}", index),
                result: "1".into(),
                ..TestRow::default()
            })
            .collect();
        let document = generator
            .render_document(&sample_fields(), &rows)
            .expect("render");
        let strings = page_strings(&document.pages[0]);
        assert!(strings.contains(&"p7".to_string()));
        assert!(!strings.contains(&"p8".to_string()));
    }

    #[test]
    fn missing_asset_directory_still_generates() {
        let assets = PageAssets::load(Path::new("/definitely/not/here"));
        let generator = CoaGenerator::new(assets);
        let bytes = generator
            .generate(&sample_fields(), &sample_rows())
            .expect("generate");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
