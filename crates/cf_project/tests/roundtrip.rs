// crates/cf_project/tests/roundtrip.rs

//! 整工程写回/装载往返测试
//!
//! 在临时目录中写出一个完整工程，再整体装载并比较内存模型。
//! 所有数值用最短往返表示法写出，两个方向的转换都必须无损。

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::tempdir;

use cf_codec::boundary::BoundaryConditions;
use cf_codec::control_volume::{ControlVolumeBlock, ControlVolumes};
use cf_codec::forcing::{ClimateSeries, ForcingConfig, PrecipitationSeries};
use cf_codec::heterogeneity::HeterogeneityMap;
use cf_codec::initial::{WaterIcKind, WaterInitialCondition};
use cf_codec::landuse::{LandUseLibrary, LandUseType, PlantRow, PlantTable};
use cf_codec::macropore::{MacroporeField, MacroporeParams, VelocityMethod};
use cf_codec::mesh::{HillslopeMesh, LateralNode, MeshHeader, MeshNode};
use cf_codec::printout::{OutputStep, PrintoutTimes};
use cf_codec::run_control::RunControl;
use cf_codec::soil::SoilAssignment;
use cf_codec::soil_library::{SoilLibrary, SoilType};
use cf_codec::surface::{SurfaceAssignment, SurfaceRecord};
use cf_codec::wind::{WindLibrary, WindSector};
use cf_codec::{CfError, Grid2, GridDims};
use cf_project::{load_project, write_project, GlobalConfig, Hill, Project};

const N_LAYERS: usize = 5;
const N_COLUMNS: usize = 4;

fn reference_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn sample_mesh() -> HillslopeMesh {
    let mut nodes = Grid2::filled(N_LAYERS, N_COLUMNS, MeshNode::default());
    for iv in 0..N_LAYERS {
        for il in 0..N_COLUMNS {
            nodes.set(
                iv,
                il,
                MeshNode {
                    hko: 250.0 + iv as f64 * 0.5 + il as f64 * 0.125,
                    sko: il as f64 * 2.0,
                    ..MeshNode::default()
                },
            );
        }
    }
    let mut mesh = HillslopeMesh {
        header: MeshHeader {
            n_layers: N_LAYERS,
            n_columns: N_COLUMNS,
            anisotropy_angle: 0.0,
            hill_id: 1,
            reference_coords: [3512000.0, 5400000.0, 250.0],
            surface_stats: [1200.0, 10.0, 120.0],
        },
        etas: (0..N_LAYERS).map(|i| i as f64 * 0.25).collect(),
        laterals: (0..N_COLUMNS)
            .map(|i| LateralNode {
                xsi: i as f64 / (N_COLUMNS - 1) as f64,
                xko_top: i as f64 * 2.0,
                yko_top: 252.0,
                xko_bot: i as f64 * 2.0,
                yko_bot: 250.0,
                varbr: 1.0,
            })
            .collect(),
        nodes,
    };
    mesh.recompute_metric_factors();
    mesh
}

fn sample_hill() -> Hill {
    let dims = GridDims::new(N_LAYERS, N_COLUMNS);

    let mut soil = SoilAssignment::uniform(dims, 1);
    // 底部两层换为第二种土壤
    soil.ids.fill_block(0..2, 0..N_COLUMNS, 2);

    let mut k_het = HeterogeneityMap::neutral(1, dims);
    k_het.factors.set(2, 1, 1.5);
    k_het.factors.set(4, 3, 0.25);

    let mut macropores = MacroporeField {
        velocity_method: VelocityMethod::Geometric,
        anisotropy: 1,
        params: Grid2::filled(N_LAYERS, N_COLUMNS, MacroporeParams::default()),
    };
    macropores.params.fill_block(
        3..N_LAYERS,
        0..N_COLUMNS,
        MacroporeParams {
            fmac: 2.5,
            amac: 0.0,
            beta: 1.0,
        },
    );

    let mut boundary = BoundaryConditions::no_flow(dims);
    boundary.top = vec![-9; N_COLUMNS];
    boundary.left[3] = 5;
    boundary.left[4] = 5;

    Hill {
        id: 1,
        mesh: Some(sample_mesh()),
        soil: Some(soil),
        k_heterogeneity: Some(k_het),
        theta_heterogeneity: Some(HeterogeneityMap::neutral(1, dims)),
        macropores: Some(macropores),
        control_volumes: Some(ControlVolumes {
            blocks: vec![ControlVolumeBlock::whole_domain()],
        }),
        initial_water: Some(WaterInitialCondition {
            kind: WaterIcKind::Psi,
            time: 0.0,
            hill_id: 1,
            values: Grid2::filled(N_LAYERS, N_COLUMNS, -3.5),
        }),
        initial_solute: None,
        printout: Some(PrintoutTimes {
            reference: reference_time(),
            time_factor: 86400.0,
            steps: vec![
                OutputStep { time: 0.0, flag: 1 },
                OutputStep { time: 0.5, flag: 0 },
                OutputStep { time: 1.0, flag: 1 },
            ],
        }),
        surface: Some(SurfaceAssignment::uniform(
            N_COLUMNS,
            SurfaceRecord {
                land_use_id: 3,
                precip_id: 1,
                climate_id: 1,
                wind_factors: vec![1.0],
            },
        )),
        boundary: Some(boundary),
    }
}

fn sample_project() -> Project {
    Project {
        config: GlobalConfig::default(),
        run_control: RunControl {
            start_time: "01.01.2000 00:00:00.00".into(),
            end_time: "02.01.2000 00:00:00.00".into(),
            offset: 0.0,
            method: "pic".into(),
            dt_bach: 1200.0,
            qtol: 1e-6,
            dt_max: 900.0,
            dt_min: 0.01,
            dt_init: 1.0,
            d_th_opt: 0.002,
            d_phi_opt: 0.002,
            n_gr: 800,
            it_max: 10,
            piceps: 1e-5,
            cgeps: 1e-9,
            rlongi: 9.0,
            longi: 8.417,
            lati: 49.02,
            istact: 0,
            seed: 12345,
            interaction: 0,
            output_files: vec!["out/q.out".into(), "out/theta.out".into()],
            output_flags: vec![1, 0],
        },
        global_extras: Vec::new(),
        soil_library: SoilLibrary {
            soils: vec![
                SoilType {
                    id: 1,
                    name: "SL - St3 Su3".into(),
                    model_id: 1,
                    table_size: 800,
                    anisotropy_x: 1.0,
                    anisotropy_z: 1.0,
                    s_null: 0.09,
                    control_extras: Vec::new(),
                    ks: 2.1e-6,
                    theta_s: 0.44,
                    theta_r: 0.06,
                    alpha: 2.5,
                    n_param: 1.32,
                    extra_params: Vec::new(),
                },
                SoilType {
                    id: 2,
                    name: "Ut4".into(),
                    model_id: 1,
                    table_size: 800,
                    anisotropy_x: 1.0,
                    anisotropy_z: 1.0,
                    s_null: 0.09,
                    control_extras: Vec::new(),
                    ks: 1e-7,
                    theta_s: 0.47,
                    theta_r: 0.08,
                    alpha: 1.1,
                    n_param: 1.25,
                    extra_params: Vec::new(),
                },
            ],
        },
        forcing: Some(ForcingConfig {
            precipitation: vec![PrecipitationSeries {
                filename: "regen.dat".into(),
                start: reference_time(),
                factor_t: 86400.0,
                factor_v: 2.77e-6,
                rows: vec![(0.0, 0.0), (0.25, 1.5), (0.5, 0.0)],
            }],
            climate: vec![ClimateSeries {
                filename: "klima.dat".into(),
                station_ids: "1 1".into(),
                start: reference_time(),
                factor_t: 86400.0,
                coeffs: vec![8.0, -6.0, 0.7],
                rows: vec![vec![0.0, 12.5, 0.6], vec![1.0, 13.0, 0.5]],
            }],
            land_use_timeline: None,
            boundary_files: Vec::new(),
            sink_files: Vec::new(),
        }),
        land_use_library: Some(LandUseLibrary {
            types: vec![LandUseType {
                id: 3,
                name: "Acker".into(),
                par_path: "in/landuse/acker.par".into(),
                table: Some(PlantTable {
                    column_count: 2,
                    labels: vec!["KST".into(), "MAK".into()],
                    rows: vec![PlantRow {
                        day: 1,
                        params: vec![5.0, 1.0],
                    }],
                }),
            }],
        }),
        wind_library: Some(WindLibrary {
            sectors: vec![
                WindSector {
                    lower_angle: None,
                    upper_angle: 180.0,
                    factor: 0.85,
                },
                WindSector {
                    lower_angle: Some(180.0),
                    upper_angle: 360.0,
                    factor: 1.1,
                },
            ],
        }),
        hills: vec![sample_hill()],
    }
}

#[test]
fn test_write_then_load_preserves_model() {
    let dir = tempdir().unwrap();
    let project = sample_project();
    write_project(dir.path(), &project).unwrap();

    let run_file = std::fs::read_to_string(dir.path().join("run_01.in")).unwrap();
    assert!(run_file.contains("-1\n"));
    assert!(run_file.contains("in/soil/soils.def"));
    assert!(run_file.contains("in/hill_1/hang.geo"));

    let loaded = load_project(dir.path()).unwrap();
    assert_eq!(loaded, project);
}

#[test]
fn test_rewrite_is_idempotent() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let project = sample_project();

    write_project(first.path(), &project).unwrap();
    let loaded = load_project(first.path()).unwrap();
    write_project(second.path(), &loaded).unwrap();
    let reloaded = load_project(second.path()).unwrap();

    assert_eq!(reloaded, loaded);
    assert_eq!(reloaded.hills[0].soil, project.hills[0].soil);
    assert_eq!(
        reloaded.hills[0].k_heterogeneity,
        project.hills[0].k_heterogeneity
    );
    assert_eq!(reloaded.hills[0].dims(), project.hills[0].dims());
}

#[test]
fn test_missing_required_component_aborts() {
    let dir = tempdir().unwrap();
    let project = sample_project();
    write_project(dir.path(), &project).unwrap();

    std::fs::remove_file(dir.path().join("in/hill_1/hang.geo")).unwrap();
    let err = load_project(dir.path()).unwrap_err();
    assert!(err.to_string().contains("hang.geo"));
}

#[test]
fn test_missing_optional_component_degrades() {
    let dir = tempdir().unwrap();
    let project = sample_project();
    write_project(dir.path(), &project).unwrap();

    std::fs::remove_file(dir.path().join("in/climate/winddir.def")).unwrap();
    let loaded = load_project(dir.path()).unwrap();
    assert!(loaded.wind_library.is_none());
    assert_eq!(loaded.hills.len(), 1);
}

#[test]
fn test_validate_rejects_shape_mismatch() {
    let dir = tempdir().unwrap();
    let mut project = sample_project();
    project.hills[0].soil = Some(SoilAssignment::uniform(GridDims::new(2, 2), 1));

    let err = write_project(dir.path(), &project).unwrap_err();
    assert!(matches!(err, CfError::DimensionMismatch { .. }));
}

#[test]
fn test_write_rejects_incomplete_hill() {
    let dir = tempdir().unwrap();
    let mut project = sample_project();
    // 半成品坡面在内存里合法，但不能整体写回
    project.hills[0].soil = None;

    let err = write_project(dir.path(), &project).unwrap_err();
    assert!(matches!(err, CfError::InvalidInput { .. }));
    assert!(err.to_string().contains("soil assignment"));
    assert!(!dir.path().join("run_01.in").exists());
}

#[test]
fn test_project_json_roundtrip() {
    let project = sample_project();
    let json = serde_json::to_string(&project).unwrap();
    let back: Project = serde_json::from_str(&json).unwrap();
    assert_eq!(back, project);
}
