use crate::canvas::Canvas;
use crate::types::{Color, Pt, Size};

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font_name: &'static str,
    pub font_size: Pt,
    pub leading: Pt,
    pub color: Color,
}

impl TextStyle {
    pub fn new(font_name: &'static str, font_size: f32, leading: f32) -> Self {
        Self {
            font_name,
            font_size: Pt::from_f32(font_size),
            leading: Pt::from_f32(leading),
            color: Color::BLACK,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// Base-14 fonts are measured with a flat 0.6em-per-character advance.
/// The approximation is coarse but deterministic, which is what the layout
/// contract requires; widths never touch floating point.
pub(crate) fn text_width(text: &str, font_size: Pt) -> Pt {
    let char_width = font_size.mul_ratio(3, 5).max(Pt::from_f32(1.0));
    char_width * (text.chars().count() as i32)
}

/// Greedy word wrap. A word wider than the line gets a line of its own and
/// may overhang; the COA tables never produce one in practice.
pub(crate) fn wrap_lines(text: &str, font_size: Pt, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    let space_width = text_width(" ", font_size);
    for segment in text.split('\n') {
        if segment.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for word in segment.split_whitespace() {
            let word_width = text_width(word, font_size);
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
                continue;
            }
            let next_width = current_width + space_width + word_width;
            if next_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width = next_width;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_width = word_width;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

pub trait Flowable: FlowableClone + Send + Sync {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait FlowableClone {
    fn clone_box(&self) -> Box<dyn Flowable>;
}

impl<T> FlowableClone for T
where
    T: 'static + Flowable + Clone,
{
    fn clone_box(&self) -> Box<dyn Flowable> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Flowable> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    text: String,
    style: TextStyle,
    align: TextAlign,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            align: TextAlign::Left,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn draw_line(&self, canvas: &mut Canvas, line: &str, x: Pt, y: Pt, avail_width: Pt, last: bool) {
        let line_width = text_width(line, self.style.font_size);
        match self.align {
            TextAlign::Left => canvas.draw_string(x, y, line),
            TextAlign::Center => {
                let offset = (avail_width - line_width).max(Pt::ZERO).mul_ratio(1, 2);
                canvas.draw_string(x + offset, y, line);
            }
            TextAlign::Right => {
                let offset = (avail_width - line_width).max(Pt::ZERO);
                canvas.draw_string(x + offset, y, line);
            }
            TextAlign::Justify => {
                let words: Vec<&str> = line.split_whitespace().collect();
                // The last line of a justified block stays ragged-right.
                if last || words.len() < 2 || line_width >= avail_width {
                    canvas.draw_string(x, y, line);
                    return;
                }
                let space_width = text_width(" ", self.style.font_size);
                let extra = avail_width - line_width;
                let gap = space_width + extra / ((words.len() - 1) as i32);
                let mut cursor_x = x;
                for word in words {
                    canvas.draw_string(cursor_x, y, word);
                    cursor_x += text_width(word, self.style.font_size) + gap;
                }
            }
        }
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = wrap_lines(&self.text, self.style.font_size, avail_width);
        let width = lines
            .iter()
            .fold(Pt::ZERO, |acc, line| {
                acc.max(text_width(line, self.style.font_size))
            })
            .min(avail_width);
        Size {
            width,
            height: self.style.leading * (lines.len() as i32),
        }
    }

    fn split(
        &self,
        avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        let lines = wrap_lines(&self.text, self.style.font_size, avail_width);
        let leading = self.style.leading.to_milli_i64();
        let avail = avail_height.to_milli_i64();
        if leading <= 0 || avail <= 0 {
            return None;
        }
        let max_lines = (avail / leading) as usize;
        if max_lines == 0 || max_lines >= lines.len() {
            return None;
        }
        let first = Paragraph {
            text: lines[..max_lines].join("\n"),
            style: self.style.clone(),
            align: self.align,
        };
        let second = Paragraph {
            text: lines[max_lines..].join("\n"),
            style: self.style.clone(),
            align: self.align,
        };
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = wrap_lines(&self.text, self.style.font_size, avail_width);
        canvas.set_fill_color(self.style.color);
        canvas.set_font(self.style.font_name, self.style.font_size);
        let mut cursor_y = y;
        let count = lines.len();
        for (index, line) in lines.iter().enumerate() {
            self.draw_line(canvas, line, x, cursor_y, avail_width, index + 1 == count);
            cursor_y += self.style.leading;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new(height: f32) -> Self {
        Self {
            height: Pt::from_f32(height),
        }
    }
}

impl Flowable for Spacer {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height.max(Pt::ZERO),
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}
}

#[derive(Clone)]
pub struct TableCell {
    pub text: String,
    pub style: TextStyle,
    pub align: TextAlign,
}

impl TableCell {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GridStyle {
    pub color: Color,
    pub width: Pt,
}

/// A table with explicit, pre-fitted column widths. Rows are middle-aligned
/// vertically; the optional grid strokes every cell boundary plus the outer
/// box. Splitting happens between body rows only, and the header rows can
/// repeat on the continuation.
#[derive(Clone)]
pub struct TableFlowable {
    header_rows: Vec<Vec<TableCell>>,
    body_rows: Vec<Vec<TableCell>>,
    col_widths: Vec<Pt>,
    pad_x: Pt,
    pad_y: Pt,
    grid: Option<GridStyle>,
    background: Option<Color>,
    header_background: Option<Color>,
    repeat_header: bool,
}

impl TableFlowable {
    pub fn new(body_rows: Vec<Vec<TableCell>>, col_widths: Vec<Pt>) -> Self {
        Self {
            header_rows: Vec::new(),
            body_rows,
            col_widths,
            pad_x: Pt::from_f32(5.0),
            pad_y: Pt::from_f32(2.0),
            grid: None,
            background: None,
            header_background: None,
            repeat_header: false,
        }
    }

    pub fn with_header(mut self, header_rows: Vec<Vec<TableCell>>) -> Self {
        self.header_rows = header_rows;
        self
    }

    pub fn repeat_header(mut self, repeat: bool) -> Self {
        self.repeat_header = repeat;
        self
    }

    pub fn with_grid(mut self, grid: GridStyle) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_header_background(mut self, color: Color) -> Self {
        self.header_background = Some(color);
        self
    }

    pub fn with_padding(mut self, pad_x: f32, pad_y: f32) -> Self {
        self.pad_x = Pt::from_f32(pad_x);
        self.pad_y = Pt::from_f32(pad_y);
        self
    }

    fn total_width(&self) -> Pt {
        self.col_widths.iter().sum()
    }

    fn cell_lines(&self, cell: &TableCell, col: usize) -> Vec<String> {
        let inner = (self.col_widths[col] - self.pad_x * 2).max(Pt::ZERO);
        wrap_lines(&cell.text, cell.style.font_size, inner)
    }

    fn row_height(&self, row: &[TableCell]) -> Pt {
        let mut height = Pt::ZERO;
        for (col, cell) in row.iter().enumerate().take(self.col_widths.len()) {
            let lines = self.cell_lines(cell, col);
            let block = cell.style.leading * (lines.len() as i32);
            height = height.max(block + self.pad_y * 2);
        }
        height
    }

    fn header_height(&self) -> Pt {
        self.header_rows.iter().map(|row| self.row_height(row)).sum()
    }

    fn draw_row(&self, canvas: &mut Canvas, row: &[TableCell], x: Pt, y: Pt, background: Option<Color>) -> Pt {
        let row_height = self.row_height(row);
        if let Some(bg) = background {
            canvas.set_fill_color(bg);
            canvas.draw_rect(x, y, self.total_width(), row_height);
        }
        let mut cursor_x = x;
        for (col, cell) in row.iter().enumerate().take(self.col_widths.len()) {
            let width = self.col_widths[col];
            let inner = (width - self.pad_x * 2).max(Pt::ZERO);
            let lines = self.cell_lines(cell, col);
            let block = cell.style.leading * (lines.len() as i32);
            // VALIGN middle
            let mut text_y = y + (row_height - block).max(Pt::ZERO).mul_ratio(1, 2);
            canvas.set_fill_color(cell.style.color);
            canvas.set_font(cell.style.font_name, cell.style.font_size);
            for line in &lines {
                let line_width = text_width(line, cell.style.font_size);
                let offset = match cell.align {
                    TextAlign::Center => (inner - line_width).max(Pt::ZERO).mul_ratio(1, 2),
                    TextAlign::Right => (inner - line_width).max(Pt::ZERO),
                    _ => Pt::ZERO,
                };
                canvas.draw_string(cursor_x + self.pad_x + offset, text_y, line.clone());
                text_y += cell.style.leading;
            }
            cursor_x += width;
        }
        row_height
    }

    fn draw_grid(&self, canvas: &mut Canvas, x: Pt, y: Pt, row_heights: &[Pt]) {
        let Some(grid) = self.grid else {
            return;
        };
        let total_width = self.total_width();
        let total_height: Pt = row_heights.iter().sum();
        canvas.set_stroke_color(grid.color);
        canvas.set_line_width(grid.width);
        let mut line_y = y;
        canvas.move_to(x, line_y);
        canvas.line_to(x + total_width, line_y);
        canvas.stroke();
        for height in row_heights {
            line_y += *height;
            canvas.move_to(x, line_y);
            canvas.line_to(x + total_width, line_y);
            canvas.stroke();
        }
        let mut line_x = x;
        canvas.move_to(line_x, y);
        canvas.line_to(line_x, y + total_height);
        canvas.stroke();
        for width in &self.col_widths {
            line_x += *width;
            canvas.move_to(line_x, y);
            canvas.line_to(line_x, y + total_height);
            canvas.stroke();
        }
    }

    fn with_rows(&self, header_rows: Vec<Vec<TableCell>>, body_rows: Vec<Vec<TableCell>>) -> Self {
        Self {
            header_rows,
            body_rows,
            col_widths: self.col_widths.clone(),
            pad_x: self.pad_x,
            pad_y: self.pad_y,
            grid: self.grid,
            background: self.background,
            header_background: self.header_background,
            repeat_header: self.repeat_header,
        }
    }
}

impl Flowable for TableFlowable {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let height = self.header_height()
            + self
                .body_rows
                .iter()
                .map(|row| self.row_height(row))
                .sum::<Pt>();
        Size {
            width: self.total_width().min(avail_width),
            height,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Flowable>, Box<dyn Flowable>)> {
        if self.body_rows.len() < 2 {
            return None;
        }
        let header_height = self.header_height();
        let mut used = header_height;
        let mut fitting = 0usize;
        for row in &self.body_rows {
            let height = self.row_height(row);
            if used + height > avail_height {
                break;
            }
            used += height;
            fitting += 1;
        }
        if fitting == 0 || fitting >= self.body_rows.len() {
            return None;
        }
        let first = self.with_rows(self.header_rows.clone(), self.body_rows[..fitting].to_vec());
        let continuation_header = if self.repeat_header {
            self.header_rows.clone()
        } else {
            Vec::new()
        };
        let second = self.with_rows(continuation_header, self.body_rows[fitting..].to_vec());
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _avail_width: Pt, _avail_height: Pt) {
        let mut row_heights = Vec::with_capacity(self.header_rows.len() + self.body_rows.len());
        let mut cursor_y = y;
        for row in &self.header_rows {
            let background = self.header_background.or(self.background);
            let height = self.draw_row(canvas, row, x, cursor_y, background);
            cursor_y += height;
            row_heights.push(height);
        }
        for row in &self.body_rows {
            let height = self.draw_row(canvas, row, x, cursor_y, self.background);
            cursor_y += height;
            row_heights.push(height);
        }
        self.draw_grid(canvas, x, y, &row_heights);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;

    fn cell(text: &str) -> TableCell {
        TableCell::new(text, TextStyle::new(HELVETICA, 9.0, 11.0))
    }

    #[test]
    fn wrap_lines_splits_on_width() {
        let lines = wrap_lines("alpha beta gamma", Pt::from_f32(10.0), Pt::from_f32(40.0));
        assert!(lines.len() > 1);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, "alpha beta gamma");
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        let lines = wrap_lines("", Pt::from_f32(9.0), Pt::from_f32(100.0));
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn paragraph_split_honors_available_height() {
        let style = TextStyle::new(HELVETICA, 10.0, 12.0);
        let para = Paragraph::new("one two three four five six seven eight", style);
        let (first, second) = para
            .split(Pt::from_f32(60.0), Pt::from_f32(25.0))
            .expect("paragraph should split");
        let first_height = first.wrap(Pt::from_f32(60.0), Pt::from_f32(25.0)).height;
        assert!(first_height <= Pt::from_f32(25.0));
        assert!(second.wrap(Pt::from_f32(60.0), Pt::from_f32(1000.0)).height > Pt::ZERO);
    }

    #[test]
    fn justified_paragraph_draws_word_by_word() {
        let style = TextStyle::new(HELVETICA, 6.0, 8.0);
        let para =
            Paragraph::new("aa bb cc dd ee ff gg hh ii jj kk ll", style).with_align(TextAlign::Justify);
        let mut canvas = Canvas::new(Size::letter());
        para.draw(
            &mut canvas,
            Pt::ZERO,
            Pt::ZERO,
            Pt::from_f32(50.0),
            Pt::from_f32(100.0),
        );
        canvas.show_page();
        let doc = canvas.finish_without_show();
        let strings = doc.pages[0]
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::DrawString { .. }))
            .count();
        // More DrawString commands than wrapped lines means per-word placement.
        let lines = wrap_lines(para.text(), Pt::from_f32(6.0), Pt::from_f32(50.0));
        assert!(strings > lines.len());
    }

    #[test]
    fn table_splits_between_rows_and_repeats_header() {
        let rows: Vec<Vec<TableCell>> = (0..6).map(|i| vec![cell(&format!("row {}", i))]).collect();
        let table = TableFlowable::new(rows, vec![Pt::from_f32(100.0)])
            .with_header(vec![vec![cell("HEAD")]])
            .repeat_header(true);
        let row_h = Pt::from_f32(11.0) + Pt::from_f32(2.0) * 2;
        // Room for the header plus three body rows.
        let avail = row_h * 4 + Pt::from_f32(1.0);
        let (first, second) = table
            .split(Pt::from_f32(100.0), avail)
            .expect("table should split");
        let first_size = first.wrap(Pt::from_f32(100.0), avail);
        assert!(first_size.height <= avail);
        // The continuation carries the repeated header row.
        let second_size = second.wrap(Pt::from_f32(100.0), Pt::from_f32(1000.0));
        assert_eq!(second_size.height, row_h * 4);
    }

    #[test]
    fn table_without_repeat_does_not_duplicate_header() {
        let rows: Vec<Vec<TableCell>> = (0..4).map(|i| vec![cell(&format!("row {}", i))]).collect();
        let table = TableFlowable::new(rows, vec![Pt::from_f32(100.0)])
            .with_header(vec![vec![cell("HEAD")]]);
        let row_h = Pt::from_f32(11.0) + Pt::from_f32(2.0) * 2;
        let avail = row_h * 3 + Pt::from_f32(1.0);
        let (_, second) = table
            .split(Pt::from_f32(100.0), avail)
            .expect("table should split");
        let second_size = second.wrap(Pt::from_f32(100.0), Pt::from_f32(1000.0));
        assert_eq!(second_size.height, row_h * 2);
    }

    #[test]
    fn grid_strokes_every_boundary() {
        let table = TableFlowable::new(
            vec![vec![cell("a"), cell("b")], vec![cell("c"), cell("d")]],
            vec![Pt::from_f32(50.0), Pt::from_f32(50.0)],
        )
        .with_grid(GridStyle {
            color: Color::from_rgb8(238, 238, 238),
            width: Pt::from_f32(0.25),
        });
        let mut canvas = Canvas::new(Size::letter());
        table.draw(
            &mut canvas,
            Pt::ZERO,
            Pt::ZERO,
            Pt::from_f32(100.0),
            Pt::from_f32(100.0),
        );
        canvas.show_page();
        let doc = canvas.finish_without_show();
        let strokes = doc.pages[0]
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::Stroke))
            .count();
        // 3 horizontal + 3 vertical boundaries.
        assert_eq!(strokes, 6);
    }
}
