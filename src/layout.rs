use crate::assets::{PageAssets, scaled_height};
use crate::canvas::Canvas;
use crate::fields::{FieldKey, FieldMap, TestRow};
use crate::flowable::{
    Flowable, GridStyle, HELVETICA, HELVETICA_BOLD, Paragraph, Spacer, TableCell, TableFlowable,
    TextAlign, TextStyle,
};
use crate::format::{format_magnitude, normalize_date};
use crate::types::{Color, Pt, Rect, Size};

/// Every tunable of the page: geometry, column widths and the absolute
/// positions of the footer strings. Passed into the engine explicitly so
/// concurrent generations with different configurations never share state.
/// `Default` is the production certificate layout.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub page_size: Size,
    /// Uniform page margin, 1/8 inch.
    pub margin: Pt,
    /// [label, value, label, value] for the two info sections.
    pub info_col_widths: [Pt; 4],
    /// [property, test method, unit, lower, upper, result].
    pub results_col_widths: [Pt; 6],
    /// Right edge for the right-aligned version/page strings, from the left.
    pub footer_right_x: Pt,
    /// Baselines measured from the bottom page edge.
    pub version_baseline: Pt,
    pub page_number_baseline: Pt,
    /// Disclaimer block: left edge and bottom edge of the paragraph box.
    pub disclaimer_x: Pt,
    pub disclaimer_bottom: Pt,
    pub decoration_font_size: Pt,
    pub decoration_leading: Pt,
    /// Gap between a header image and the content frame.
    pub header_gap: Pt,
    /// Reserved strip above the bottom margin for disclaimer/version/page text.
    pub footer_text_band: Pt,
    pub section_spacing: Pt,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: Size::letter(),
            margin: Pt::from_inches(0.125),
            info_col_widths: [
                Pt::from_f32(117.0),
                Pt::from_f32(180.0),
                Pt::from_f32(117.0),
                Pt::from_f32(180.0),
            ],
            results_col_widths: [
                Pt::from_f32(174.0),
                Pt::from_f32(120.0),
                Pt::from_f32(60.0),
                Pt::from_f32(80.0),
                Pt::from_f32(80.0),
                Pt::from_f32(80.0),
            ],
            footer_right_x: Pt::from_f32(612.0) - Pt::from_inches(0.625),
            version_baseline: Pt::from_inches(0.45),
            page_number_baseline: Pt::from_inches(0.32),
            disclaimer_x: Pt::from_inches(0.125),
            disclaimer_bottom: Pt::from_inches(0.90),
            decoration_font_size: Pt::from_f32(6.0),
            decoration_leading: Pt::from_f32(8.0),
            header_gap: Pt::from_f32(6.0),
            footer_text_band: Pt::from_f32(36.0),
            section_spacing: Pt::from_f32(6.0),
        }
    }
}

const SECTION_BAR_BACKGROUND: Color = Color {
    r: 230.0 / 255.0,
    g: 230.0 / 255.0,
    b: 230.0 / 255.0,
};

const TABLE_GRID_COLOR: Color = Color {
    r: 238.0 / 255.0,
    g: 238.0 / 255.0,
    b: 238.0 / 255.0,
};

pub(crate) const DECORATION_GRAY: Color = Color {
    r: 0.5,
    g: 0.5,
    b: 0.5,
};

fn table_grid() -> GridStyle {
    GridStyle {
        color: TABLE_GRID_COLOR,
        width: Pt::from_f32(0.25),
    }
}

fn bar_style() -> TextStyle {
    TextStyle::new(HELVETICA_BOLD, 10.0, 12.0)
}

fn label_style() -> TextStyle {
    TextStyle::new(HELVETICA_BOLD, 9.0, 11.0)
}

fn value_style() -> TextStyle {
    TextStyle::new(HELVETICA, 9.0, 11.0)
}

/// Derived page geometry, computed once per generation. The decoration
/// bands come from the scaled asset heights; the flowing content frame is
/// whatever the bands leave behind.
#[derive(Debug, Clone)]
pub struct LayoutGeometry {
    pub content_width: Pt,
    pub top_band: Pt,
    pub bottom_band: Pt,
    pub frame: Rect,
    pub header_size: Option<Size>,
    pub footer_size: Option<Size>,
}

impl LayoutGeometry {
    pub fn compute(config: &LayoutConfig, assets: &PageAssets) -> Self {
        let page = config.page_size;
        let content_width = page.width - config.margin * 2;
        // Each image band is capped at a quarter page, which keeps the two
        // bands plus margins well inside the page no matter the art.
        let max_band = page.height / 4;
        let header_size = assets
            .header
            .as_ref()
            .map(|asset| asset.scaled_size(content_width, max_band));
        let footer_size = assets
            .footer
            .as_ref()
            .map(|asset| asset.scaled_size(content_width, max_band));
        let header_height = scaled_height(assets.header.as_ref(), content_width, max_band);
        let footer_height = scaled_height(assets.footer.as_ref(), content_width, max_band);

        let mut top_band = config.margin + header_height;
        if header_height > Pt::ZERO {
            top_band += config.header_gap;
        }
        let bottom_band = config.margin + footer_height + config.footer_text_band;
        let frame_height = page.height - top_band - bottom_band;
        debug_assert!(
            frame_height > Pt::ZERO,
            "decoration bands must leave room for the content frame"
        );

        Self {
            content_width,
            top_band,
            bottom_band,
            frame: Rect {
                x: config.margin,
                y: top_band,
                width: content_width,
                height: frame_height,
            },
            header_size,
            footer_size,
        }
    }
}

/// Shrink `widths` proportionally when their sum exceeds `max_total`;
/// otherwise return them unchanged. Relative ratios are preserved exactly
/// because the scaling happens in integer milli-point space.
pub fn fit_column_widths(widths: &[Pt], max_total: Pt) -> Vec<Pt> {
    let total: Pt = widths.iter().sum();
    if total <= Pt::ZERO || total <= max_total {
        return widths.to_vec();
    }
    widths
        .iter()
        .map(|width| width.mul_div(max_total, total))
        .collect()
}

const CUSTOMER_INFO_ROWS: [[(&str, FieldKey); 2]; 4] = [
    [
        ("Customer Name", FieldKey::CustomerName),
        ("Account Number", FieldKey::AccountNumber),
    ],
    [
        ("Customer PO Number", FieldKey::PoNumber),
        ("Supplier Quote Number", FieldKey::QuoteNumber),
    ],
    [
        ("Order Date", FieldKey::OrderDate),
        ("Quantity Shipped", FieldKey::QuantityShipped),
    ],
    [
        ("Shipped Date", FieldKey::ShippedDate),
        ("Shipped To Location", FieldKey::ShippedLocation),
    ],
];

const PRODUCT_INFO_ROWS: [[(&str, FieldKey); 2]; 4] = [
    [
        ("Item Name", FieldKey::ItemName),
        ("Item SKU", FieldKey::ItemSku),
    ],
    [
        ("Lot Number", FieldKey::LotNumber),
        ("Manufacturing Location", FieldKey::ManufacturingLocation),
    ],
    [
        ("Manufacturing Date", FieldKey::ManufacturingDate),
        ("Test Date", FieldKey::TestDate),
    ],
    [
        ("Expiration Date", FieldKey::ExpirationDate),
        ("Certificate Print Date", FieldKey::PrintDate),
    ],
];

const RESULTS_HEADER: [&str; 6] = [
    "PROPERTY",
    "TEST METHOD",
    "UNIT",
    "LOWER LIMIT",
    "UPPER LIMIT",
    "RESULT",
];

/// Full-width gray section bar.
fn section_bar(title: &str, width: Pt) -> TableFlowable {
    TableFlowable::new(
        vec![vec![TableCell::new(title, bar_style())]],
        vec![width],
    )
    .with_background(SECTION_BAR_BACKGROUND)
    .with_padding(6.0, 2.0)
}

/// A labeled key/value section: bar plus a bordered label/value/label/value
/// table. Values behind a date-bearing key are canonicalized here.
fn build_info_section(
    title: &str,
    rows: &[[(&str, FieldKey); 2]],
    fields: &FieldMap,
    config: &LayoutConfig,
    content_width: Pt,
) -> Vec<Box<dyn Flowable>> {
    let col_widths = fit_column_widths(&config.info_col_widths, content_width);
    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let mut rendered: Vec<TableCell> = Vec::with_capacity(4);
        for (label, key) in row {
            let raw = fields.get(*key);
            let value = if key.is_date() {
                normalize_date(raw)
            } else {
                raw.to_string()
            };
            rendered.push(TableCell::new(*label, label_style()));
            rendered.push(TableCell::new(value, value_style()));
        }
        cells.push(rendered);
    }
    let table = TableFlowable::new(cells, col_widths).with_grid(table_grid());
    vec![
        Box::new(section_bar(title, content_width)),
        Box::new(table),
        Box::new(Spacer::new(config.section_spacing.to_f32())),
    ]
}

pub(crate) fn build_customer_section(
    fields: &FieldMap,
    config: &LayoutConfig,
    content_width: Pt,
) -> Vec<Box<dyn Flowable>> {
    build_info_section(
        "CUSTOMER INFORMATION",
        &CUSTOMER_INFO_ROWS,
        fields,
        config,
        content_width,
    )
}

pub(crate) fn build_product_section(
    fields: &FieldMap,
    config: &LayoutConfig,
    content_width: Pt,
) -> Vec<Box<dyn Flowable>> {
    build_info_section(
        "PRODUCT INFORMATION",
        &PRODUCT_INFO_ROWS,
        fields,
        config,
        content_width,
    )
}

/// The tested-properties table: fixed six-column header, one row per test,
/// magnitude formatting on the three numeric columns, header repeated when
/// the table spans pages.
pub(crate) fn build_results_section(
    rows: &[TestRow],
    config: &LayoutConfig,
    content_width: Pt,
) -> Vec<Box<dyn Flowable>> {
    let col_widths = fit_column_widths(&config.results_col_widths, content_width);
    let header: Vec<TableCell> = RESULTS_HEADER
        .iter()
        .map(|label| TableCell::new(*label, label_style()))
        .collect();
    let body: Vec<Vec<TableCell>> = rows
        .iter()
        .map(|row| {
            vec![
                TableCell::new(row.property.clone(), value_style()),
                TableCell::new(row.test_method.clone(), value_style()),
                TableCell::new(row.unit.clone(), value_style()),
                TableCell::new(format_magnitude(&row.lower_limit), value_style()),
                TableCell::new(format_magnitude(&row.upper_limit), value_style()),
                TableCell::new(format_magnitude(&row.result), value_style()),
            ]
        })
        .collect();
    let table = TableFlowable::new(body, col_widths)
        .with_header(vec![header])
        .with_header_background(SECTION_BAR_BACKGROUND)
        .with_grid(table_grid())
        .repeat_header(true);
    vec![
        Box::new(section_bar("TESTED PROPERTIES", content_width)),
        Box::new(table),
        Box::new(Spacer::new(config.section_spacing.to_f32())),
    ]
}

/// Everything the per-page decoration callback needs, captured by value so
/// the callback stays `Fn + Send + Sync` and independent of the generator.
#[derive(Clone)]
pub(crate) struct Decoration {
    page_size: Size,
    margin: Pt,
    header: Option<(String, Size)>,
    footer: Option<(String, Size)>,
    disclaimer: Paragraph,
    disclaimer_x: Pt,
    disclaimer_bottom: Pt,
    disclaimer_width: Pt,
}

impl Decoration {
    pub(crate) fn new(
        config: &LayoutConfig,
        assets: &PageAssets,
        geometry: &LayoutGeometry,
    ) -> Self {
        let style = TextStyle::new(
            HELVETICA,
            config.decoration_font_size.to_f32(),
            config.decoration_leading.to_f32(),
        )
        .with_color(DECORATION_GRAY);
        let disclaimer = Paragraph::new(assets.disclaimer.clone(), style)
            .with_align(TextAlign::Justify);
        Self {
            page_size: config.page_size,
            margin: config.margin,
            header: assets
                .header
                .as_ref()
                .zip(geometry.header_size)
                .map(|(asset, size)| (asset.resource_id().to_string(), size)),
            footer: assets
                .footer
                .as_ref()
                .zip(geometry.footer_size)
                .map(|(asset, size)| (asset.resource_id().to_string(), size)),
            disclaimer,
            disclaimer_x: config.disclaimer_x,
            disclaimer_bottom: config.disclaimer_bottom,
            // Right margin of the block mirrors its left offset.
            disclaimer_width: config.page_size.width - config.disclaimer_x * 2,
        }
    }

    /// Paint the fixed-position page furniture. Positions are absolute page
    /// coordinates and never depend on how much flowing content the page
    /// carries.
    pub(crate) fn paint(&self, canvas: &mut Canvas) {
        canvas.save_state();
        if let Some((resource_id, size)) = &self.header {
            canvas.draw_image(
                self.margin,
                self.margin,
                size.width,
                size.height,
                resource_id.clone(),
            );
        }
        if let Some((resource_id, size)) = &self.footer {
            canvas.draw_image(
                self.margin,
                self.page_size.height - self.margin - size.height,
                size.width,
                size.height,
                resource_id.clone(),
            );
        }
        let block = self
            .disclaimer
            .wrap(self.disclaimer_width, self.page_size.height);
        let top = self.page_size.height - self.disclaimer_bottom - block.height;
        self.disclaimer.draw(
            canvas,
            self.disclaimer_x,
            top,
            self.disclaimer_width,
            block.height,
        );
        canvas.restore_state();
    }
}
