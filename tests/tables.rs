use std::fs;

use habitat_grid::{Anchor, CellPos, CellTable, GridError, SpatialGrid, ThresholdTable};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn painted_grid() -> SpatialGrid {
    let mut grid = SpatialGrid::new(7, 5, 1.0, 2).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    grid.paint_rectangle(Anchor::new(1, 1), 3, 2, 4.0);
    grid.paint_circle_gaussian(Anchor::new(3, 5), 2, 6.5, 1.7).unwrap();
    grid.seed_species((3.0, 2.0), 1.5, 120, 0, &mut rng).unwrap();
    grid.seed_species((1.0, 4.0), 0.5, 60, 1, &mut rng).unwrap();
    grid.set_threshold(0, 0.125).unwrap();
    grid.set_threshold(1, 3.0).unwrap();
    grid
}

#[test]
fn csv_round_trip_preserves_grid() {
    let grid = painted_grid();
    let temp_dir = tempfile::tempdir().unwrap();
    let cells = temp_dir.path().join("grid.csv");
    let thresholds = temp_dir.path().join("thr.csv");

    grid.save(&cells, &thresholds).unwrap();
    let reloaded = SpatialGrid::load(&cells, &thresholds).unwrap();

    assert_eq!(reloaded.width(), 7);
    assert_eq!(reloaded.height(), 5);
    assert_eq!(reloaded.species_count(), 2);
    assert_eq!(reloaded.thresholds(), grid.thresholds());
    assert_eq!(reloaded, grid);
}

#[test]
fn exported_cell_file_is_row_major() {
    let grid = painted_grid();
    let temp_dir = tempfile::tempdir().unwrap();
    let cells = temp_dir.path().join("grid.csv");
    grid.save(&cells, temp_dir.path().join("thr.csv")).unwrap();

    let text = fs::read_to_string(&cells).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("row,col,cost,specie 0,specie 1"));
    let coords: Vec<(usize, usize)> = lines
        .map(|line| {
            let mut fields = line.split(',');
            let row = fields.next().unwrap().parse().unwrap();
            let col = fields.next().unwrap().parse().unwrap();
            (row, col)
        })
        .collect();
    let expected: Vec<_> = (0..5).flat_map(|r| (0..7).map(move |c| (r, c))).collect();
    assert_eq!(coords, expected);
}

#[test]
fn dataframe_export_with_index_column_loads() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cells = temp_dir.path().join("grid.csv");
    let thresholds = temp_dir.path().join("thr.csv");
    fs::write(
        &cells,
        ",row,col,cost,specie 0\n0,1,0,2.0,3\n1,0,0,1.0,0\n2,1,1,7.5,1\n3,0,1,1.0,0\n",
    )
    .unwrap();
    fs::write(&thresholds, ",thr\n0,0.4\n").unwrap();

    let grid = SpatialGrid::load(&cells, &thresholds).unwrap();

    assert_eq!((grid.width(), grid.height()), (2, 2));
    assert_eq!(grid.cost(CellPos::new(1, 1)).unwrap(), 7.5);
    assert_eq!(grid.population(0, CellPos::new(1, 0)).unwrap(), 3);
    assert_eq!(grid.threshold(0).unwrap(), 0.4);
}

#[test]
fn malformed_tables_are_rejected() {
    let missing_col = "row,cost,specie 0\n0,1.0,0\n";
    assert!(matches!(
        CellTable::from_reader(missing_col.as_bytes()),
        Err(GridError::MalformedInput(_))
    ));

    let bad_cost = "row,col,cost\n0,0,steep\n";
    assert!(matches!(
        CellTable::from_reader(bad_cost.as_bytes()),
        Err(GridError::MalformedInput(_))
    ));

    let negative_cost = CellTable::from_reader("row,col,cost\n0,0,-2\n".as_bytes()).unwrap();
    assert!(matches!(
        SpatialGrid::from_tables(&negative_cost, &ThresholdTable::default()),
        Err(GridError::MalformedInput(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let err = SpatialGrid::load(
        temp_dir.path().join("absent.csv"),
        temp_dir.path().join("thr.csv"),
    )
    .unwrap_err();

    assert!(matches!(err, GridError::Io(_)));
}
