//! Integration test: every layout survives the stack/unstack round trip.
//!
//! 1. Build a dataset in each of the four structures with known values
//! 2. Flatten it to point form with `spatial_stack`
//! 3. Restore it with `spatial_unstack`
//! 4. Verify structure, coordinates, and values are identical

use anyhow::Result;
use ndarray::{ArrayD, IxDyn};
use spatial_common::CrsDef;
use spatial_engine::{
    create_dataset, spatial_stack, spatial_structure, spatial_unstack, Dataset, SpatialStructure,
    StackOptions, TargetStructure,
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

/// Fill the builder's zeroed variable with a distinct value per element.
fn filled(mut ds: Dataset) -> Dataset {
    for var in ds.variables.values_mut() {
        let arr = var.data.as_numeric_mut().unwrap();
        let n = arr.len();
        *arr = ArrayD::from_shape_vec(IxDyn(arr.shape()), (0..n).map(|i| i as f64).collect())
            .unwrap();
    }
    ds
}

fn round_trip(ds: Dataset) -> Result<Dataset> {
    let (flat, ticket) = spatial_stack(ds, &StackOptions::default())?;
    assert_eq!(spatial_structure(&flat), Some(SpatialStructure::Point));
    Ok(spatial_unstack(flat, &ticket)?)
}

#[test]
fn cuboid_round_trip_is_identity() -> Result<()> {
    let src = filled(create_dataset(
        &[0.0, 50.0, 100.0, 150.0],
        &[0.0, 50.0, 100.0],
        &[10.0, 40.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    assert_eq!(round_trip(src.clone())?, src);
    Ok(())
}

#[test]
fn raster_round_trip_is_identity() -> Result<()> {
    let mut src = filled(create_dataset(
        &[0.0, 50.0, 100.0],
        &[0.0, 50.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    // Squeeze the height axis away to get a plain raster
    let (flat, _) = spatial_stack(
        src.clone(),
        &StackOptions {
            target_crs: None,
            remove_height: true,
        },
    )?;
    src = spatial_engine::to_raster(&flat)?;
    assert_eq!(spatial_structure(&src), Some(SpatialStructure::Raster));

    assert_eq!(round_trip(src.clone())?, src);
    Ok(())
}

#[test]
fn stacked_point_round_trip_preserves_order() -> Result<()> {
    // Deliberately unsorted horizontal locations
    let src = filled(create_dataset(
        &[900.0, 100.0, 500.0, 300.0],
        &[20.0, 80.0, 10.0, 40.0],
        &[10.0, 40.0, 120.0],
        utm(),
        TargetStructure::StackedPoint,
    )?);
    let back = round_trip(src.clone())?;
    assert_eq!(back, src);
    assert_eq!(
        back.coord("west_east").unwrap().values.to_vec(),
        vec![900.0, 100.0, 500.0, 300.0]
    );
    Ok(())
}

#[test]
fn point_round_trip_is_identity() -> Result<()> {
    let src = filled(create_dataset(
        &[5.0, 3.0, 8.0],
        &[1.0, 9.0, 2.0],
        &[10.0, 50.0, 30.0],
        utm(),
        TargetStructure::Point,
    )?);
    assert_eq!(round_trip(src.clone())?, src);
    Ok(())
}

#[test]
fn reprojected_round_trip_restores_original_crs_and_values() -> Result<()> {
    init_tracing();
    let src = filled(create_dataset(
        &[10.0, 10.2, 10.4, 10.6],
        &[55.0, 55.2, 55.4],
        &[80.0],
        CrsDef::Geographic,
        TargetStructure::Cuboid,
    )?);
    let opts = StackOptions {
        target_crs: Some(utm()),
        remove_height: false,
    };
    let (flat, ticket) = spatial_stack(src.clone(), &opts)?;
    assert_eq!(flat.get_crs()?, utm());

    let back = spatial_unstack(flat, &ticket)?;
    assert_eq!(back.get_crs()?, CrsDef::Geographic);
    assert_eq!(spatial_structure(&back), Some(SpatialStructure::Cuboid));
    // Coordinates come back from the ticket, so even the projection round
    // trip cannot smear them; values must sit in their original cells
    assert_eq!(back.coords, src.coords);
    assert_eq!(back.variables, src.variables);
    Ok(())
}

#[test]
fn descending_south_north_axis_survives() -> Result<()> {
    let src = filled(create_dataset(
        &[0.0, 50.0],
        &[200.0, 150.0, 100.0],
        &[10.0],
        utm(),
        TargetStructure::Cuboid,
    )?);
    assert_eq!(round_trip(src.clone())?, src);
    Ok(())
}
