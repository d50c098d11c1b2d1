//! Integration test: end-to-end workflows across the public API.
//!
//! 1. Build a small cuboid from raw coordinate lists, flatten it, restore it
//! 2. Sample one dataset at the locations of another with distances attached
//! 3. Interpolate a linear field onto scattered off-grid points
//! 4. Mask and clip a grid against a polygon geometry

use anyhow::Result;
use ndarray::{ArrayD, IxDyn};
use spatial_common::{BBox, CrsDef, GeometryCollection};
use spatial_engine::{
    clip, create_dataset, interp_unstructured_like, mask, nearest_points, spatial_stack,
    spatial_structure, spatial_unstack, to_point, Dataset, InterpMethod, MaskOptions,
    NearestOptions, SpatialStructure, StackOptions, TargetStructure,
};

fn utm() -> CrsDef {
    CrsDef::Utm {
        zone: 32,
        north: true,
    }
}

/// Route engine logs through the test harness so `--nocapture` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Overwrite the builder's zeroed "output" variable with f(x, y, z) = x + 10 y + 100 z
/// evaluated at each grid location, so every interpolation result is checkable by hand.
fn with_linear_field(mut ds: Dataset) -> Dataset {
    let we = ds.coord("west_east").unwrap().values.to_vec();
    let sn = ds.coord("south_north").unwrap().values.to_vec();
    let h = ds
        .coord("height")
        .map(|c| c.values.to_vec())
        .unwrap_or_else(|| vec![0.0]);
    let var = ds.variables.get_mut("output").unwrap();
    let shape = var.data.shape().to_vec();
    let mut values = Vec::with_capacity(shape.iter().product());
    match var.dims.iter().map(String::as_str).collect::<Vec<_>>()[..] {
        ["height", "south_north", "west_east"] => {
            for &z in &h {
                for &y in &sn {
                    for &x in &we {
                        values.push(x + 10.0 * y + 100.0 * z);
                    }
                }
            }
        }
        _ => panic!("unexpected dims {:?}", var.dims),
    }
    var.data = spatial_engine::VariableData::Numeric(
        ArrayD::from_shape_vec(IxDyn(&shape), values).unwrap(),
    );
    ds
}

#[test]
fn build_flatten_restore() -> Result<()> {
    // Auto-detection picks cuboid: both horizontal axes are regularly spaced
    let ds = create_dataset(
        &[0.0, 1.0, 2.0],
        &[0.0, 1.0],
        &[10.0],
        utm(),
        TargetStructure::Auto,
    )?;
    assert_eq!(spatial_structure(&ds), Some(SpatialStructure::Cuboid));

    let flat = to_point(&ds)?;
    assert_eq!(spatial_structure(&flat), Some(SpatialStructure::Point));
    assert_eq!(flat.dim_size("point"), Some(6));
    // C-order flattening: west_east cycles fastest
    assert_eq!(
        flat.coord("west_east").unwrap().values.to_vec(),
        vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]
    );
    assert_eq!(
        flat.coord("south_north").unwrap().values.to_vec(),
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]
    );

    let (stacked, ticket) = spatial_stack(ds.clone(), &StackOptions::default())?;
    let back = spatial_unstack(stacked, &ticket)?;
    assert_eq!(back, ds);
    Ok(())
}

#[test]
fn nearest_sampling_with_distances() -> Result<()> {
    init_tracing();
    let source = with_linear_field(create_dataset(
        &[0.0, 100.0, 200.0],
        &[0.0, 100.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    // Targets sit 10 m east of two grid columns
    let target = create_dataset(
        &[10.0, 110.0],
        &[0.0, 100.0],
        &[10.0, 10.0],
        utm(),
        TargetStructure::Point,
    )?;

    let opts = NearestOptions {
        include_distance: true,
        ..NearestOptions::default()
    };
    let out = nearest_points(&source, &target, &opts)?;
    assert_eq!(spatial_structure(&out), Some(SpatialStructure::Point));

    let values = out.variables["output"].data.as_numeric().unwrap();
    let expected = [
        0.0 + 10.0 * 0.0 + 100.0 * 10.0,
        100.0 + 10.0 * 100.0 + 100.0 * 10.0,
    ];
    for (got, want) in values.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
    }
    let dist = out.variables["distance"].data.as_numeric().unwrap();
    for d in dist.iter() {
        assert!((d - 10.0).abs() < 1e-9, "distance {d} should be 10 m");
    }
    Ok(())
}

#[test]
fn scattered_linear_interpolation_recovers_plane() -> Result<()> {
    let source = with_linear_field(create_dataset(
        &[0.0, 100.0, 200.0, 300.0],
        &[0.0, 100.0, 200.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    let target = create_dataset(
        &[25.0, 150.0, 275.0],
        &[40.0, 60.0, 180.0],
        &[10.0, 10.0, 10.0],
        utm(),
        TargetStructure::Point,
    )?;

    let out = interp_unstructured_like(&source, &target, InterpMethod::Linear)?;
    let values = out.variables["output"].data.as_numeric().unwrap();
    let xs = [25.0, 150.0, 275.0];
    let ys = [40.0, 60.0, 180.0];
    for ((got, x), y) in values.iter().zip(xs).zip(ys) {
        let want = x + 10.0 * y + 100.0 * 10.0;
        assert!(
            (got - want).abs() < 1e-8,
            "linear interpolation at ({x}, {y}): got {got}, want {want}"
        );
    }
    Ok(())
}

#[test]
fn mask_and_clip_grid_against_geometry() -> Result<()> {
    // 3x3 grid of unit cells centered on integer coordinates, values 0..9
    let mut grid = create_dataset(
        &[0.0, 1.0, 2.0],
        &[0.0, 1.0, 2.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?;
    {
        let var = grid.variables.get_mut("output").unwrap();
        var.data = spatial_engine::VariableData::Numeric(
            ArrayD::from_shape_vec(IxDyn(&[1, 3, 3]), (0..9).map(f64::from).collect()).unwrap(),
        );
    }
    let geom: GeometryCollection = BBox::new(0.6, 0.6, 1.4, 1.4, utm()).into();

    let masked = mask(&grid, &geom, &MaskOptions::default())?;
    let values = masked.variables["output"].data.as_numeric().unwrap();
    assert_eq!(values.shape(), &[1, 3, 3]);
    for (idx, v) in values.iter().enumerate() {
        if idx == 4 {
            assert_eq!(*v, 4.0, "center cell keeps its value");
        } else {
            assert!(v.is_nan(), "cell {idx} should be nodata");
        }
    }

    let clipped = clip(&grid, &geom, &MaskOptions::default())?;
    let values = clipped.variables["output"].data.as_numeric().unwrap();
    assert_eq!(values.shape(), &[1, 1, 1]);
    assert_eq!(values.iter().next().copied(), Some(4.0));
    assert_eq!(
        clipped.coord("west_east").unwrap().values.to_vec(),
        vec![1.0]
    );
    Ok(())
}

#[test]
fn nearest_with_rank_dimension() -> Result<()> {
    let source = with_linear_field(create_dataset(
        &[0.0, 100.0],
        &[0.0, 100.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    let target = create_dataset(&[10.0], &[0.0], &[10.0], utm(), TargetStructure::Point)?;

    let opts = NearestOptions {
        n_nearest: 2,
        include_distance: true,
        ..NearestOptions::default()
    };
    let out = nearest_points(&source, &target, &opts)?;
    assert_eq!(out.dim_size("rank"), Some(2));

    let dist = out.variables["distance"].data.as_numeric().unwrap();
    let d: Vec<f64> = dist.iter().copied().collect();
    assert!((d[0] - 10.0).abs() < 1e-9, "closest point is 10 m away");
    assert!((d[1] - 90.0).abs() < 1e-9, "second point is 90 m away");
    Ok(())
}
