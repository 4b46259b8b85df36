use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use rust_decimal::Decimal;

use super::csv::CSV_HEADER;
use super::{hours_label, ExportRow};

const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 50.0;
const ROW_H: f32 = 20.0;
const FONT_SIZE: f32 = 9.0;
const HEADER_FONT_SIZE: f32 = 10.0;
const TITLE_FONT_SIZE: f32 = 14.0;

/// Windows-1252 bytes for a standard-14 font string; characters outside the
/// code page become `?`
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// Paginated single-font table on A4 pages
pub struct PdfTable {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    font_id: Ref,
    next_id: i32,
    page_refs: Vec<Ref>,
    title: String,
}

impl PdfTable {
    pub fn new(title: impl Into<String>) -> Self {
        let mut pdf = Pdf::new();
        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let font_id = Ref::new(3);

        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        Self {
            pdf,
            catalog_id,
            pages_id,
            font_id,
            next_id: 4,
            page_refs: Vec::new(),
            title: title.into(),
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a page and returns the id its content stream must use
    fn add_page(&mut self) -> Ref {
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();
        self.page_refs.push(page_id);

        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H))
            .contents(content_id);
        page.resources().fonts().pair(Name(b"F1"), self.font_id);

        content_id
    }

    fn text(content: &mut Content, x: f32, y: f32, size: f32, text: &str) {
        content.begin_text();
        content.set_font(Name(b"F1"), size);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
        content.show(Str(&win_ansi(text)));
        content.end_text();
    }

    fn shade(content: &mut Content, y: f32, width: f32, grey: f32) {
        content.save_state();
        content.set_fill_rgb(grey, grey, grey);
        content.rect(MARGIN, y, width, ROW_H);
        content.fill_nonzero();
        content.restore_state();
    }

    fn row(content: &mut Content, y: f32, widths: &[f32], cells: &[String], size: f32) {
        let mut x = MARGIN;
        for (cell, w) in cells.iter().zip(widths) {
            Self::text(content, x + 4.0, y + 6.0, size, cell);
            content.save_state();
            content.set_stroke_rgb(0.65, 0.65, 0.65);
            content.rect(x, y, *w, ROW_H);
            content.stroke();
            content.restore_state();
            x += w;
        }
    }

    /// Column widths from the longest cell, scaled down to fit the page
    fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<f32> {
        let mut widths: Vec<f32> = headers.iter().map(|h| h.len() as f32 * 6.0 + 8.0).collect();
        for row in rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = w.max(cell.len() as f32 * 5.5 + 8.0);
            }
        }

        let total: f32 = widths.iter().sum();
        let available = PAGE_W - 2.0 * MARGIN;
        if total > available {
            let scale = available / total;
            widths.iter_mut().for_each(|w| *w *= scale);
        }
        widths
    }

    /// Lay out the table across as many pages as needed. The header row
    /// repeats on every page; an empty table still gets one page.
    pub fn write_table(&mut self, headers: &[&str], rows: &[Vec<String>]) {
        let widths = Self::column_widths(headers, rows);
        let table_w: f32 = widths.iter().sum();
        let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

        let mut remaining = rows;
        let mut page_no = 1;
        loop {
            let content_id = self.add_page();
            let mut content = Content::new();

            Self::text(&mut content, MARGIN, PAGE_H - MARGIN + 15.0, TITLE_FONT_SIZE, &self.title);
            Self::text(&mut content, PAGE_W - MARGIN - 40.0, MARGIN - 30.0, FONT_SIZE, &format!("Page {}", page_no));

            let mut y = PAGE_H - MARGIN - 30.0;
            Self::shade(&mut content, y, table_w, 0.85);
            Self::row(&mut content, y, &widths, &header, HEADER_FONT_SIZE);
            y -= ROW_H;

            let mut consumed = 0;
            for (i, cells) in remaining.iter().enumerate() {
                if y < MARGIN {
                    break;
                }
                if i % 2 == 1 {
                    Self::shade(&mut content, y, table_w, 0.96);
                }
                Self::row(&mut content, y, &widths, cells, FONT_SIZE);
                y -= ROW_H;
                consumed += 1;
            }

            self.pdf.stream(content_id, &content.finish());
            remaining = &remaining[consumed..];
            page_no += 1;

            if remaining.is_empty() {
                break;
            }
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        let count = self.page_refs.len() as i32;
        self.pdf
            .pages(self.pages_id)
            .count(count)
            .kids(self.page_refs.iter().copied());
        self.pdf.finish()
    }
}

pub fn render_pdf(title: &str, rows: &[ExportRow], total_hours: Decimal) -> Vec<u8> {
    let mut cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.date.to_string(),
                row.clock_in_label(),
                row.clock_out_label(),
                format!("{}h", hours_label(row.total_hours)),
                row.project.clone(),
                row.description.clone(),
            ]
        })
        .collect();
    cells.push(vec![
        String::new(),
        String::new(),
        "Total:".to_string(),
        format!("{}h", hours_label(total_hours)),
        String::new(),
        String::new(),
    ]);

    let mut table = PdfTable::new(title);
    table.write_table(&CSV_HEADER, &cells);
    table.finish()
}
