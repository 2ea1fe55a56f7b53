//! Integration tests for ECL binary cases on disk.
//!
//! These tests verify:
//! - Grid, INIT and restart arrays survive a write/open cycle in both layouts
//! - Active-cell arrays expand to natural order
//! - Report times come from DOUBHEAD in days
//! - Missing keywords and steps are reported, not defaulted

use expreccs::grid::{AxisPartition, CornerPointGrid, GridKind, build_grid};
use expreccs::io::{
    ArchiveError, EclArchive, EclRecord, EclValues, RestartLayout, SimulationArchive, read_file,
    write_case,
};

const TOL: f64 = 1e-9;

/// 3 x 2 x 2 cells with the second cell inactive.
fn grid() -> CornerPointGrid {
    let g = build_grid(
        GridKind::Site,
        [100.0, 200.0, 1000.0],
        [30.0, 20.0, 10.0],
        &[
            AxisPartition::Uniform(3),
            AxisPartition::Uniform(2),
            AxisPartition::Uniform(2),
        ],
    )
    .unwrap();
    let g = CornerPointGrid::from_structured(&g);
    let mut actnum = g.actnum();
    actnum[1] = 0;
    CornerPointGrid::from_arrays(g.dims(), g.coord().to_vec(), g.zcorn().to_vec(), Some(&actnum)).unwrap()
}

fn write(dir: &std::path::Path, layout: RestartLayout) -> std::path::PathBuf {
    let grid = grid();
    let n_active = grid.n_active();
    let case = dir.join("SITE");
    let init = vec![
        EclRecord::new("PORV", EclValues::Real((0..12).map(|c| c as f32).collect())),
        EclRecord::new("OPERNUM", EclValues::Int((0..n_active as i32).map(|c| 1 + c % 2).collect())),
    ];
    let steps: Vec<(f64, Vec<EclRecord>)> = (1..=3)
        .map(|n| {
            let pressure = EclValues::Double((0..n_active).map(|c| 100.0 * n as f64 + c as f64).collect());
            (n as f64 * 86_400.0 * 30.0, vec![EclRecord::new("PRESSURE", pressure)])
        })
        .collect();
    write_case(&case, layout, &grid, &init, &steps).unwrap();
    case
}

#[test]
fn test_unified_case_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let case = write(tmp.path(), RestartLayout::Unified);
    let archive = EclArchive::open(&case, RestartLayout::Unified).unwrap();

    assert_eq!(archive.grid().dims(), [3, 2, 2]);
    assert_eq!(archive.grid().n_active(), 11);
    assert!(!archive.grid().is_active(archive.grid().index(1, 0, 0)));
    let center = archive.grid().center(archive.grid().index(0, 0, 0));
    assert!((center[0] - 105.0).abs() < 1e-3);
    assert!((center[1] - 205.0).abs() < 1e-3);

    assert_eq!(archive.n_steps(), 3);
    assert!((archive.report_times()[2] - 90.0 * 86_400.0).abs() < TOL);

    // Full-size arrays stay as they are.
    let porv = archive.init_global("PORV").unwrap();
    assert_eq!(porv.len(), 12);
    assert!((porv[1] - 1.0).abs() < TOL);

    // Active-size arrays expand with zeros at inactive cells.
    let pressure = archive.restart_global("PRESSURE", 1).unwrap();
    assert_eq!(pressure.len(), 12);
    assert!((pressure[0] - 200.0).abs() < TOL);
    assert_eq!(pressure[1], 0.0);
    assert!((pressure[2] - 201.0).abs() < TOL);

    let zones = archive.init_ints("OPERNUM").unwrap();
    assert_eq!(&zones[..4], &[1, 0, 2, 1]);
}

#[test]
fn test_separate_restart_files() {
    let tmp = tempfile::tempdir().unwrap();
    let case = write(tmp.path(), RestartLayout::Separate);
    assert!(tmp.path().join("SITE.X0002").is_file());
    let archive = EclArchive::open(&case, RestartLayout::Separate).unwrap();
    assert_eq!(archive.n_steps(), 3);
    let last = archive.restart_keyword("PRESSURE", 2).unwrap();
    assert_eq!(last.len(), 11);
    assert!((last[0] - 300.0).abs() < TOL);

    let records = read_file(&tmp.path().join("SITE.X0000")).unwrap();
    assert_eq!(records[0].keyword, "SEQNUM");
    assert_eq!(records[1].keyword, "DOUBHEAD");
}

#[test]
fn test_missing_data_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let case = write(tmp.path(), RestartLayout::Unified);
    let archive = EclArchive::open(&case, RestartLayout::Unified).unwrap();
    assert!(matches!(
        archive.restart_keyword("SGAS", 0),
        Err(ArchiveError::MissingKeyword { .. })
    ));
    assert!(matches!(
        archive.restart_keyword("PRESSURE", 3),
        Err(ArchiveError::StepOutOfRange { step: 3, available: 3 })
    ));
    assert!(EclArchive::open(tmp.path().join("REGIONAL"), RestartLayout::Unified).is_err());
}
