use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Rect, Rgb,
};
use thiserror::Error;

use crate::grade;
use crate::models::{FieldError, GradeSummary, StudentRecord};

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const PT_TO_MM: f64 = 25.4 / 72.0;

const NAVY: (u8, u8, u8) = (28, 54, 82);
const BLUE: (u8, u8, u8) = (78, 129, 189);
const LIGHT_GRAY: (u8, u8, u8) = (240, 240, 240);
const LABEL_GRAY: (u8, u8, u8) = (220, 220, 220);
const DIVIDER_GRAY: (u8, u8, u8) = (200, 200, 200);
const WHITE: (u8, u8, u8) = (255, 255, 255);
const DARK_TEXT: (u8, u8, u8) = (50, 50, 50);
const BLACK: (u8, u8, u8) = (0, 0, 0);

const TABLE_ROW_HEIGHT: f64 = 12.0;
const TABLE_TOP: f64 = 90.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("optional asset {0} could not be read")]
    AssetUnreadable(PathBuf),
    #[error("failed to assemble pdf: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Cards are keyed by sanitized student name, so two names that sanitize to
/// the same string share one path and the later render wins.
pub fn output_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{}_gradecard.pdf", name.replace(' ', "_")))
}

struct Fonts {
    helvetica: IndirectFontRef,
    helvetica_bold: IndirectFontRef,
    helvetica_oblique: IndirectFontRef,
    times: IndirectFontRef,
    times_bold: IndirectFontRef,
}

/// Renders one student's grade card into `output_dir` and returns the path of
/// the written file. Missing identity or score columns abort the render;
/// missing decorative assets under `assets_dir` are skipped.
pub fn render(
    student: &StudentRecord,
    output_dir: &Path,
    assets_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let summary = grade::summarize(student)?;
    let roll_no = student.field("RollNo")?.to_string();
    let course = student.field("Course")?.to_string();
    let semester = student.field("Semester")?.to_string();

    let (doc, page, layer) = PdfDocument::new(
        format!("Grade Card - {}", student.name),
        Mm(PAGE_WIDTH as f32),
        Mm(PAGE_HEIGHT as f32),
        "grade card",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let fonts = Fonts {
        helvetica: doc.add_builtin_font(BuiltinFont::Helvetica)?,
        helvetica_bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        helvetica_oblique: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
        times: doc.add_builtin_font(BuiltinFont::TimesRoman)?,
        times_bold: doc.add_builtin_font(BuiltinFont::TimesBold)?,
    };

    draw_header(&layer, &fonts, assets_dir);
    draw_identity(&layer, &fonts, student, &roll_no, &course, &semester);
    let table_end = draw_score_table(&layer, &fonts, &summary);
    let summary_top = draw_summary_boxes(&layer, &fonts, &summary, table_end);
    draw_signatures(&layer, &fonts, assets_dir, summary_top);

    let path = output_path(output_dir, &student.name);
    let file = File::create(&path)?;
    doc.save(&mut BufWriter::new(file))?;
    Ok(path)
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, assets_dir: &Path) {
    // Page border.
    layer.set_outline_color(color(NAVY));
    layer.set_outline_thickness(0.5);
    layer.add_rect(
        Rect::new(Mm(10.0), from_top(287.0), Mm(200.0), from_top(10.0))
            .with_mode(PaintMode::Stroke),
    );

    // Banner.
    layer.set_fill_color(color(NAVY));
    layer.add_rect(
        Rect::new(Mm(10.0), from_top(50.0), Mm(200.0), from_top(10.0))
            .with_mode(PaintMode::Fill),
    );

    draw_optional_asset(layer, &assets_dir.join("logo.png"), 15.0, 15.0, 25.0);

    centered_text(
        layer,
        "XYZ College of Science",
        &fonts.helvetica_bold,
        22.0,
        PAGE_WIDTH / 2.0,
        27.5,
        WHITE,
    );
    centered_text(
        layer,
        "Final Year B.Sc. (Computer Science) - Grade Card",
        &fonts.helvetica_oblique,
        13.0,
        PAGE_WIDTH / 2.0,
        37.5,
        WHITE,
    );
}

fn draw_identity(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    student: &StudentRecord,
    roll_no: &str,
    course: &str,
    semester: &str,
) {
    text_at(layer, &format!("Name: {}", student.name), &fonts.times, 12.0, 20.0, 66.0, DARK_TEXT);
    text_at(layer, &format!("Roll No: {roll_no}"), &fonts.times, 12.0, 115.0, 66.0, DARK_TEXT);
    text_at(layer, &format!("Course: {course}"), &fonts.times, 12.0, 20.0, 74.0, DARK_TEXT);
    text_at(layer, &format!("Semester: {semester}"), &fonts.times, 12.0, 115.0, 74.0, DARK_TEXT);
    text_at(layer, &format!("Email: {}", student.email), &fonts.times, 12.0, 20.0, 82.0, DARK_TEXT);

    layer.set_outline_color(color(DIVIDER_GRAY));
    layer.set_outline_thickness(0.3);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(20.0), from_top(86.0)), false),
            (Point::new(Mm(190.0), from_top(86.0)), false),
        ],
        is_closed: false,
    });
}

/// Column layout: subject (wide) then four mark columns. Returns the top-based
/// y coordinate just below the last subject row.
fn draw_score_table(layer: &PdfLayerReference, fonts: &Fonts, summary: &GradeSummary) -> f64 {
    const COLUMNS: [(f64, f64); 5] = [
        (20.0, 50.0),
        (70.0, 30.0),
        (100.0, 30.0),
        (130.0, 30.0),
        (160.0, 30.0),
    ];
    const HEADERS: [&str; 5] = ["Subject", "Unit Test", "Practical", "Final Exam", "Total"];

    for ((x, width), header) in COLUMNS.iter().zip(HEADERS) {
        table_cell(
            layer,
            header,
            &fonts.helvetica_bold,
            12.0,
            *x,
            TABLE_TOP,
            *width,
            TABLE_ROW_HEIGHT,
            BLUE,
            WHITE,
            Align::Center,
        );
    }

    let mut row_top = TABLE_TOP + TABLE_ROW_HEIGHT;
    for (index, marks) in summary.subjects.iter().enumerate() {
        let fill = if index % 2 == 0 { LIGHT_GRAY } else { WHITE };
        let values = [
            marks.subject.clone(),
            fmt_marks(marks.unit_test),
            fmt_marks(marks.practical),
            fmt_marks(marks.final_exam),
            fmt_marks(marks.total()),
        ];
        for ((x, width), value) in COLUMNS.iter().zip(values.iter()) {
            let align = if *x == COLUMNS[0].0 { Align::Left } else { Align::Center };
            table_cell(
                layer,
                value,
                &fonts.times,
                12.0,
                *x,
                row_top,
                *width,
                TABLE_ROW_HEIGHT,
                fill,
                BLACK,
                align,
            );
        }
        row_top += TABLE_ROW_HEIGHT;
    }

    row_top
}

/// Percentage / CGPA / overall grade strip. Returns the strip's top-based y.
fn draw_summary_boxes(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    summary: &GradeSummary,
    table_end: f64,
) -> f64 {
    const BOX_WIDTH: f64 = 45.0;
    let top = table_end + 12.0;

    let labels = [
        (30.0, "Percentage", LABEL_GRAY, DARK_TEXT),
        (82.5, "CGPA", LABEL_GRAY, DARK_TEXT),
        (135.0, "Overall Grade", NAVY, WHITE),
    ];
    for (x, label, fill, text_color) in labels {
        table_cell(
            layer,
            label,
            &fonts.helvetica_bold,
            10.0,
            x,
            top,
            BOX_WIDTH,
            8.0,
            fill,
            text_color,
            Align::Center,
        );
    }

    let values = [
        (30.0, format!("{:.2}%", summary.percentage), WHITE, DARK_TEXT),
        (82.5, format!("{:.2}", summary.cgpa), WHITE, DARK_TEXT),
        (135.0, summary.grade.to_string(), BLUE, WHITE),
    ];
    for (x, value, fill, text_color) in values {
        table_cell(
            layer,
            &value,
            &fonts.times_bold,
            16.0,
            x,
            top + 8.0,
            BOX_WIDTH,
            15.0,
            fill,
            text_color,
            Align::Center,
        );
    }

    top
}

fn draw_signatures(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    assets_dir: &Path,
    summary_top: f64,
) {
    let sig_y = (summary_top + 50.0).max(250.0).min(270.0);

    draw_optional_asset(layer, &assets_dir.join("hod_sign.png"), 25.0, sig_y - 15.0, 40.0);
    draw_optional_asset(layer, &assets_dir.join("principal_sign.png"), 125.0, sig_y - 15.0, 40.0);

    let rule = "____________________________";
    centered_text(layer, rule, &fonts.helvetica, 12.0, 55.0, sig_y, DARK_TEXT);
    centered_text(
        layer,
        "Head of Department",
        &fonts.helvetica_oblique,
        11.0,
        55.0,
        sig_y + 13.0,
        DARK_TEXT,
    );

    centered_text(layer, rule, &fonts.helvetica, 12.0, 155.0, sig_y, DARK_TEXT);
    centered_text(
        layer,
        "Principal",
        &fonts.helvetica_oblique,
        11.0,
        155.0,
        sig_y + 13.0,
        DARK_TEXT,
    );

    let issue_date = Local::now().format("%d-%m-%Y");
    centered_text(
        layer,
        &format!("Issue Date: {issue_date}"),
        &fonts.helvetica_oblique,
        10.0,
        155.0,
        sig_y + 23.0,
        DARK_TEXT,
    );
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

#[allow(clippy::too_many_arguments)]
fn table_cell(
    layer: &PdfLayerReference,
    text: &str,
    font: &IndirectFontRef,
    size: f64,
    x: f64,
    top: f64,
    width: f64,
    height: f64,
    fill: (u8, u8, u8),
    text_color: (u8, u8, u8),
    align: Align,
) {
    layer.set_fill_color(color(fill));
    layer.set_outline_color(color(DARK_TEXT));
    layer.set_outline_thickness(0.3);
    layer.add_rect(
        Rect::new(
            Mm(x as f32),
            from_top(top + height),
            Mm((x + width) as f32),
            from_top(top),
        )
        .with_mode(PaintMode::FillStroke),
    );

    let baseline = top + height / 2.0 + size * PT_TO_MM * 0.35;
    match align {
        Align::Left => text_at(layer, text, font, size, x + 2.0, baseline, text_color),
        Align::Center => centered_text(layer, text, font, size, x + width / 2.0, baseline, text_color),
    }
}

fn text_at(
    layer: &PdfLayerReference,
    text: &str,
    font: &IndirectFontRef,
    size: f64,
    x: f64,
    baseline_top: f64,
    text_color: (u8, u8, u8),
) {
    layer.set_fill_color(color(text_color));
    layer.use_text(text, size as f32, Mm(x as f32), from_top(baseline_top), font);
}

fn centered_text(
    layer: &PdfLayerReference,
    text: &str,
    font: &IndirectFontRef,
    size: f64,
    center_x: f64,
    baseline_top: f64,
    text_color: (u8, u8, u8),
) {
    // Rough average glyph advance for the builtin faces; close enough for
    // centering inside fixed boxes.
    let width = text.chars().count() as f64 * size * PT_TO_MM * 0.5;
    text_at(layer, text, font, size, center_x - width / 2.0, baseline_top, text_color);
}

fn draw_optional_asset(layer: &PdfLayerReference, path: &Path, x: f64, top: f64, width_mm: f64) {
    if !path.exists() {
        debug!("optional asset {} not present, skipping", path.display());
        return;
    }
    if let Err(err) = place_png(layer, path, x, top, width_mm) {
        warn!("{err}, skipping");
    }
}

fn place_png(
    layer: &PdfLayerReference,
    path: &Path,
    x: f64,
    top: f64,
    width_mm: f64,
) -> Result<(), RenderError> {
    let unreadable = || RenderError::AssetUnreadable(path.to_path_buf());
    let file = File::open(path).map_err(|_| unreadable())?;
    let decoder = PngDecoder::new(file).map_err(|_| unreadable())?;
    let image = Image::try_from(decoder).map_err(|_| unreadable())?;

    // printpdf places images at 300 dpi when no dpi override is given.
    let natural_width = image.image.width.0 as f64 * 25.4 / 300.0;
    let natural_height = image.image.height.0 as f64 * 25.4 / 300.0;
    let scale = width_mm / natural_width;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x as f32)),
            translate_y: Some(from_top(top + natural_height * scale)),
            scale_x: Some(scale as f32),
            scale_y: Some(scale as f32),
            ..Default::default()
        },
    );
    Ok(())
}

fn fmt_marks(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

fn color(rgb: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        rgb.0 as f32 / 255.0,
        rgb.1 as f32 / 255.0,
        rgb.2 as f32 / 255.0,
        None,
    ))
}

fn from_top(mm: f64) -> Mm {
    Mm((PAGE_HEIGHT - mm) as f32)
}
