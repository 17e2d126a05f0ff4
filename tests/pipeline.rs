//! End-to-end run over fixture files: load both inputs, normalize the
//! join keys, render the figure, and check the joined coloring.

use case_map::data;
use case_map::normalize;
use case_map::render::{self, RenderOptions};
use geo::algorithm::bounding_rect::BoundingRect;
use std::path::Path;

#[test]
fn pipeline_renders_fixture_data() {
    let boundaries = data::load_boundaries(Path::new("tests/fixtures/towns.geojson")).unwrap();
    let records = data::load_cases(Path::new("tests/fixtures/cases.csv")).unwrap();

    // Raw labels keep their incidental whitespace until normalization.
    assert_eq!(boundaries[0].name, " Irvine ");
    assert_eq!(records[0].id, "Irvine ");

    let boundaries = normalize::normalize_boundaries(boundaries);
    let records = normalize::normalize_cases(records);
    assert!(boundaries.iter().all(|f| f.id == f.name.trim()));
    assert!(records.iter().all(|r| r.id.trim() == r.id));

    let options = RenderOptions {
        width: 256,
        ..Default::default()
    };
    let figure = render::render(&boundaries, &records, &options).unwrap();

    // " Irvine " and "Irvine " both normalize to "Irvine": the join
    // holds and Irvine's interior carries the gradient color for 42.
    let (px, py) = figure.projection.project(-117.75, 33.65);
    assert_eq!(
        *figure.image.get_pixel(px as u32, py as u32),
        render::fill_color(42, &options)
    );

    // Tustin matched with 7 cases.
    let (px, py) = figure.projection.project(-117.25, 33.65);
    assert_eq!(
        *figure.image.get_pixel(px as u32, py as u32),
        render::fill_color(7, &options)
    );

    // "Santa Ana" appears only in the case table and is silently
    // ignored; "Faraway" appears only in the boundary file and lies
    // outside the fitted viewport.
    let faraway = boundaries.iter().find(|f| f.id == "Faraway").unwrap();
    let rect = faraway.geometry.bounding_rect().unwrap();
    let (fx, _) = figure.projection.project(rect.min().x, rect.min().y);
    assert!(fx >= figure.image.width() as f64);
}

#[test]
fn missing_boundary_file_fails() {
    assert!(data::load_boundaries(Path::new("tests/fixtures/no-such.geojson")).is_err());
}
