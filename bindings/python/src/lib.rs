use facefilter_core::{
    check_box, Compositor, FaceFilterError, FaceRegion, Filter, FilterKind, Rect, RenderSettings,
};
use image::RgbaImage;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyBytes, PyDict};

/// `(x, y, width, height, filter, strength, overshoot)`
type RegionTuple = (f64, f64, f64, f64, String, f32, f64);

fn to_py_err(e: FaceFilterError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn string_to_filter(name: &str, strength: f32) -> PyResult<Filter> {
    match name {
        "" | "none" => Ok(Filter::None),
        _ => Filter::from_name(name, strength).map_err(to_py_err),
    }
}

fn to_region(tuple: RegionTuple) -> PyResult<FaceRegion> {
    let (x, y, width, height, filter, strength, overshoot) = tuple;
    let bounding_box = Rect::new(x, y, width, height);
    check_box(bounding_box).map_err(to_py_err)?;
    if !overshoot.is_finite() || overshoot < 0.0 {
        return Err(to_py_err(FaceFilterError::InvalidOvershoot(overshoot)));
    }
    let mut region = FaceRegion::new(bounding_box, string_to_filter(&filter, strength)?);
    region.overshoot = overshoot;
    Ok(region)
}

fn to_regions(regions: Vec<RegionTuple>) -> PyResult<Vec<FaceRegion>> {
    regions.into_iter().map(to_region).collect()
}

fn decode(input: &[u8]) -> PyResult<RgbaImage> {
    let image = image::load_from_memory(input)
        .map_err(|e| to_py_err(FaceFilterError::Decode(e.to_string())))?;
    Ok(image.into_rgba8())
}

fn compositor(cell_width: Option<u32>) -> PyResult<Compositor> {
    let mut settings = RenderSettings::default();
    if let Some(cell) = cell_width {
        settings.cell_width = cell;
    }
    let default = Compositor::default();
    Compositor::new(settings, default.catalog()).map_err(to_py_err)
}

fn to_png_dict(py: Python<'_>, image: &RgbaImage) -> PyResult<Py<PyDict>> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder;

    let mut data = Vec::new();
    PngEncoder::new(&mut data)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| to_py_err(FaceFilterError::Encode(e.to_string())))?;

    let dict = PyDict::new(py);
    dict.set_item("data", PyBytes::new(py, &data))?;
    dict.set_item("width", image.width())?;
    dict.set_item("height", image.height())?;
    Ok(dict.into())
}

/// Composite every filtered face region over the photo.
///
/// Args:
///     input: Raw image bytes (JPEG, PNG, or WebP)
///     regions: list of (x, y, width, height, filter, strength, overshoot)
///         tuples. Boxes are normalized with a bottom-left origin. Filter is
///         "gaussian-blur", "pixellate", "hexagonal-pixellate" or "none".
///
/// Returns:
///     dict with keys: data (PNG bytes), width (int), height (int)
#[pyfunction]
fn render_result(py: Python<'_>, input: Vec<u8>, regions: Vec<RegionTuple>) -> PyResult<Py<PyDict>> {
    let image = decode(&input)?;
    let regions = to_regions(regions)?;
    let result = compositor(None)?
        .render_result(&image, &regions)
        .map_err(to_py_err)?;
    to_png_dict(py, &result)
}

/// Padded preview of a single face region.
#[pyfunction]
fn render_preview(py: Python<'_>, input: Vec<u8>, region: RegionTuple) -> PyResult<Py<PyDict>> {
    let image = decode(&input)?;
    let region = to_region(region)?;
    let preview = compositor(None)?
        .render_preview(&image, &region)
        .map_err(to_py_err)?;
    to_png_dict(py, &preview)
}

/// Grid of every face preview, filled column by column.
///
/// Args:
///     input: Raw image bytes (JPEG, PNG, or WebP)
///     regions: same tuples as `render_result`; must not be empty
///     cell_width: side of each grid cell in pixels (default: 200)
#[pyfunction]
#[pyo3(signature = (input, regions, *, cell_width=None))]
fn render_overview(
    py: Python<'_>,
    input: Vec<u8>,
    regions: Vec<RegionTuple>,
    cell_width: Option<u32>,
) -> PyResult<Py<PyDict>> {
    let image = decode(&input)?;
    let regions = to_regions(regions)?;
    let overview = compositor(cell_width)?
        .render_overview(&image, &regions)
        .map_err(to_py_err)?;
    to_png_dict(py, &overview)
}

/// Names of the available filters with their parameter name, default and
/// allowed range.
#[pyfunction]
fn filters(py: Python<'_>) -> PyResult<Vec<Py<PyDict>>> {
    FilterKind::ALL
        .iter()
        .map(|kind| -> PyResult<Py<PyDict>> {
            let (min, max) = kind.parameter_range();
            let dict = PyDict::new(py);
            dict.set_item("name", kind.name())?;
            dict.set_item("parameter", kind.parameter_name())?;
            dict.set_item("default", kind.default_parameter())?;
            dict.set_item("min", min)?;
            dict.set_item("max", max)?;
            Ok(dict.into())
        })
        .collect()
}

#[pymodule]
fn facefilter_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(render_result, m)?)?;
    m.add_function(wrap_pyfunction!(render_preview, m)?)?;
    m.add_function(wrap_pyfunction!(render_overview, m)?)?;
    m.add_function(wrap_pyfunction!(filters, m)?)?;
    Ok(())
}
