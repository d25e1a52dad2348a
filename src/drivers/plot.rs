use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::ArrayView1;
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::SpectroError;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
    pub y_label: String,
    /// Axis labels and legend. Off means no font is needed.
    pub annotate: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![RED, WHITE, CYAN, GREEN, MAGENTA, YELLOW, BLUE],
            y_label: "Counts".into(),
            annotate: true,
        }
    }
}
impl PlotStyle {
    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = label.into();
        self
    }
    pub fn without_text(mut self) -> Self {
        self.annotate = false;
        self
    }
}
/// One named trace over the shared wavelength axis.
#[derive(Clone, Debug)]
pub struct CurveSeries<'a> {
    pub name: String,
    pub values: ArrayView1<'a, f64>,
}
impl<'a> CurveSeries<'a> {
    pub fn new(name: impl Into<String>, values: ArrayView1<'a, f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}
/// Renders curves against wavelength to PNG bytes. Non-finite points are skipped.
pub fn render_curve_png(
    wavelengths: ArrayView1<'_, f64>,
    series: &[CurveSeries<'_>],
    style: PlotStyle,
) -> Result<Vec<u8>, SpectroError> {
    if wavelengths.is_empty() || series.is_empty() {
        return Err(SpectroError::Plot("nothing to plot".into()));
    }
    if style.palette.is_empty() {
        return Err(SpectroError::Plot("plot style has an empty palette".into()));
    }
    if let Some(bad) = series.iter().find(|s| s.values.len() != wavelengths.len()) {
        return Err(SpectroError::LengthMismatch {
            expected: wavelengths.len(),
            actual: bad.values.len(),
        });
    }
    let finite = || {
        series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
    };
    let y_min = finite().fold(f64::INFINITY, f64::min);
    let y_max = finite().fold(f64::NEG_INFINITY, f64::max);
    let y_bounds = if !y_min.is_finite() {
        (-1.0, 1.0)
    } else if (y_max - y_min).abs() < f64::EPSILON {
        (y_min - 1.0, y_max + 1.0)
    } else {
        let pad = (y_max - y_min) * 0.05;
        (y_min - pad, y_max + pad)
    };
    let x_min = wavelengths.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = wavelengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x_bounds = if (x_max - x_min).abs() < f64::EPSILON {
        (x_min - 1.0, x_max + 1.0)
    } else {
        (x_min, x_max)
    };
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.annotate {
            builder
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart =
            builder.build_cartesian_2d(x_bounds.0..x_bounds.1, y_bounds.0..y_bounds.1)?;
        if style.annotate {
            chart
                .configure_mesh()
                .x_desc("Wavelength (nm)")
                .y_desc(style.y_label.as_str())
                .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
                .label_style(("sans-serif", 12).into_font().color(&WHITE))
                .light_line_style(&WHITE.mix(0.1))
                .draw()?;
        }
        for (idx, curve) in series.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let points = wavelengths
                .iter()
                .copied()
                .zip(curve.values.iter().copied())
                .filter(|(_, y)| y.is_finite());
            let drawn = chart.draw_series(LineSeries::new(points, &color))?;
            if style.annotate {
                drawn
                    .label(curve.name.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }
        }
        if style.annotate {
            chart
                .configure_series_labels()
                .label_font(("sans-serif", 12).into_font().color(&WHITE))
                .border_style(&WHITE.mix(0.2))
                .background_style(&style.background)
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, SpectroError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| SpectroError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
