// crates/cf_project/src/orchestrator.rs

//! 工程装载与写回
//!
//! 装载：`CATFLOW.IN` → 运行控制文件 → 全局库 + 各坡面输入。
//! 必备组件的任何失败携带出错路径向上中止；可选组件（驱动配置、
//! 土地利用库、风向库、溶质初值）失败降级为警告。
//!
//! 写回：一律落到规范目录布局（`in/soil`、`in/control`、`in/landuse`、
//! `in/climate`、`in/hill_{N}`），运行控制文件按规范路径重新生成。
//! 各坡面相互独立，装载与写回都按坡面并行。

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use cf_codec::boundary::BoundaryCodec;
use cf_codec::control_volume::ControlVolumeCodec;
use cf_codec::forcing::ForcingCodec;
use cf_codec::heterogeneity::HeterogeneityCodec;
use cf_codec::initial::{SoluteIcCodec, WaterIcCodec};
use cf_codec::landuse::LandUseCodec;
use cf_codec::macropore::MacroporeCodec;
use cf_codec::mesh::MeshCodec;
use cf_codec::printout::PrintoutCodec;
use cf_codec::run_control::{GlobalPaths, HillPaths, RunControlCodec, RunFilePlan};
use cf_codec::soil::SoilCodec;
use cf_codec::soil_library::SoilLibraryCodec;
use cf_codec::surface::SurfaceCodec;
use cf_codec::wind::WindCodec;
use cf_codec::{CfError, CfResult};
use cf_foundation::TokenLines;

use crate::model::{FileRole, GlobalConfig, Hill, Project};

/// 工程入口文件名
pub const PROJECT_FILE: &str = "CATFLOW.IN";

const SOIL_DEF: &str = "in/soil/soils.def";
const FORCING_DEF: &str = "in/control/timeser.def";
const LANDUSE_DEF: &str = "in/landuse/lu_file.def";
const WIND_DEF: &str = "in/climate/winddir.def";

/// 从工程根目录整体装载
pub fn load_project(root: &Path) -> CfResult<Project> {
    let entry = root.join(PROJECT_FILE);
    let config = parse_entry(&read_text(&entry)?)?;

    let run_path = root.join(&config.run_filename);
    let plan = RunControlCodec::load(&run_path).map_err(|e| e.in_file(&run_path))?;

    let soil_def = root.join(&plan.globals.soil_library);
    let soil_library = SoilLibraryCodec::load(&soil_def).map_err(|e| e.in_file(&soil_def))?;

    let forcing = load_optional("forcing", || {
        ForcingCodec::load(root.join(&plan.globals.forcing), root)
    });
    let land_use_library = load_optional("land use library", || {
        LandUseCodec::load(root.join(&plan.globals.land_use_library), root)
    });
    let wind_library = load_optional("wind library", || {
        WindCodec::load(root.join(&plan.globals.wind_library))
    });

    let istact = plan.control.istact;
    let hills: Vec<Hill> = plan
        .hills
        .par_iter()
        .enumerate()
        .map(|(idx, paths)| load_hill(root, idx, paths, istact))
        .collect::<CfResult<_>>()?;

    info!(
        root = %root.display(),
        hills = hills.len(),
        soils = soil_library.soils.len(),
        "project loaded"
    );
    Ok(Project {
        config,
        run_control: plan.control,
        global_extras: plan.globals.extras,
        soil_library,
        forcing,
        land_use_library,
        wind_library,
        hills,
    })
}

/// 把工程按规范布局写到目录
pub fn write_project(root: &Path, project: &Project) -> CfResult<()> {
    project.validate()?;

    SoilLibraryCodec::save(root.join(SOIL_DEF), &project.soil_library)?;
    if let Some(forcing) = &project.forcing {
        ForcingCodec::save(root.join(FORCING_DEF), root, forcing)?;
    }
    if let Some(lib) = &project.land_use_library {
        LandUseCodec::save(root.join(LANDUSE_DEF), root, lib)?;
    }
    if let Some(lib) = &project.wind_library {
        WindCodec::save(root.join(WIND_DEF), lib)?;
    }

    let with_solute = project.run_control.istact > 0;
    project
        .hills
        .par_iter()
        .enumerate()
        .map(|(idx, hill)| write_hill(root, idx, hill, with_solute))
        .collect::<CfResult<Vec<_>>>()?;

    let plan = RunFilePlan {
        control: project.run_control.clone(),
        globals: GlobalPaths {
            soil_library: SOIL_DEF.to_string(),
            forcing: FORCING_DEF.to_string(),
            land_use_library: LANDUSE_DEF.to_string(),
            wind_library: WIND_DEF.to_string(),
            extras: project.global_extras.clone(),
        },
        hills: (0..project.hills.len())
            .map(|idx| canonical_hill_paths(idx, with_solute))
            .collect(),
    };
    RunControlCodec::save(root.join(&project.config.run_filename), &plan)?;

    write_text(
        &root.join(PROJECT_FILE),
        &format!(
            "{} {}\n",
            project.config.run_filename, project.config.scale_factor
        ),
    )?;
    info!(root = %root.display(), hills = project.hills.len(), "project written");
    Ok(())
}

/// 第 `idx` 个坡面（0 起始）的规范写回路径
pub fn canonical_hill_paths(idx: usize, with_solute: bool) -> HillPaths {
    let dir = format!("in/hill_{}", idx + 1);
    let file = |role: FileRole| format!("{}/{}", dir, role.canonical_filename());
    HillPaths {
        geometry: file(FileRole::Geometry),
        soil: file(FileRole::SoilMap),
        k_heterogeneity: file(FileRole::KHeterogeneity),
        theta_heterogeneity: file(FileRole::ThetaHeterogeneity),
        macropores: file(FileRole::Macropores),
        control_volume: file(FileRole::ControlVolume),
        initial_water: file(FileRole::InitialWater),
        initial_solute: with_solute.then(|| file(FileRole::InitialSolute)),
        printout: file(FileRole::Printout),
        surface: file(FileRole::Surface),
        boundary: file(FileRole::Boundary),
    }
}

fn load_hill(root: &Path, idx: usize, paths: &HillPaths, istact: i64) -> CfResult<Hill> {
    let geo_path = root.join(&paths.geometry);
    let mesh = MeshCodec::load(&geo_path).map_err(|e| e.in_file(&geo_path))?;
    let dims = mesh.dims();

    let soil_path = root.join(&paths.soil);
    let soil = SoilCodec::load(&soil_path, dims).map_err(|e| e.in_file(&soil_path))?;

    let k_path = root.join(&paths.k_heterogeneity);
    let k_heterogeneity =
        HeterogeneityCodec::load(&k_path, Some(dims)).map_err(|e| e.in_file(&k_path))?;
    let th_path = root.join(&paths.theta_heterogeneity);
    let theta_heterogeneity =
        HeterogeneityCodec::load(&th_path, Some(dims)).map_err(|e| e.in_file(&th_path))?;

    let mak_path = root.join(&paths.macropores);
    let macropores = MacroporeCodec::load(&mak_path, dims).map_err(|e| e.in_file(&mak_path))?;

    let cv_path = root.join(&paths.control_volume);
    let control_volumes = ControlVolumeCodec::load(&cv_path).map_err(|e| e.in_file(&cv_path))?;

    let ini_path = root.join(&paths.initial_water);
    let initial_water = WaterIcCodec::load(&ini_path, dims).map_err(|e| e.in_file(&ini_path))?;

    let initial_solute = match (&paths.initial_solute, istact > 0) {
        (Some(rel), true) => {
            load_optional("solute initial condition", || {
                SoluteIcCodec::load(root.join(rel), dims)
            })
        }
        _ => None,
    };

    let prt_path = root.join(&paths.printout);
    let printout = PrintoutCodec::load(&prt_path).map_err(|e| e.in_file(&prt_path))?;

    let pob_path = root.join(&paths.surface);
    let surface =
        SurfaceCodec::load(&pob_path, dims.n_columns).map_err(|e| e.in_file(&pob_path))?;

    let rb_path = root.join(&paths.boundary);
    let boundary = BoundaryCodec::load(&rb_path, dims).map_err(|e| e.in_file(&rb_path))?;

    Ok(Hill {
        id: idx + 1,
        mesh: Some(mesh),
        soil: Some(soil),
        k_heterogeneity: Some(k_heterogeneity),
        theta_heterogeneity: Some(theta_heterogeneity),
        macropores: Some(macropores),
        control_volumes: Some(control_volumes),
        initial_water: Some(initial_water),
        initial_solute,
        printout: Some(printout),
        surface: Some(surface),
        boundary: Some(boundary),
    })
}

// 写回要求组件就位；`Project::validate` 先行把关，这里兜底报错
fn require<'a, T>(hill_id: usize, what: &str, value: &'a Option<T>) -> CfResult<&'a T> {
    value.as_ref().ok_or_else(|| {
        CfError::invalid_input(format!(
            "hill {} is missing required component: {}",
            hill_id, what
        ))
    })
}

fn write_hill(root: &Path, idx: usize, hill: &Hill, with_solute: bool) -> CfResult<()> {
    let paths = canonical_hill_paths(idx, with_solute);
    let id = hill.id;
    MeshCodec::save(root.join(&paths.geometry), require(id, "mesh geometry", &hill.mesh)?)?;
    SoilCodec::save(root.join(&paths.soil), require(id, "soil assignment", &hill.soil)?)?;
    HeterogeneityCodec::save(
        root.join(&paths.k_heterogeneity),
        require(id, "k heterogeneity", &hill.k_heterogeneity)?,
    )?;
    HeterogeneityCodec::save(
        root.join(&paths.theta_heterogeneity),
        require(id, "theta heterogeneity", &hill.theta_heterogeneity)?,
    )?;
    MacroporeCodec::save(
        root.join(&paths.macropores),
        require(id, "macropore field", &hill.macropores)?,
    )?;
    ControlVolumeCodec::save(
        root.join(&paths.control_volume),
        require(id, "control volumes", &hill.control_volumes)?,
    )?;
    WaterIcCodec::save(
        root.join(&paths.initial_water),
        require(id, "water initial condition", &hill.initial_water)?,
    )?;
    if let (Some(rel), Some(ic)) = (&paths.initial_solute, &hill.initial_solute) {
        SoluteIcCodec::save(root.join(rel), ic)?;
    }
    PrintoutCodec::save(root.join(&paths.printout), require(id, "printout times", &hill.printout)?)?;
    SurfaceCodec::save(root.join(&paths.surface), require(id, "surface assignment", &hill.surface)?)?;
    BoundaryCodec::save(root.join(&paths.boundary), require(id, "boundary conditions", &hill.boundary)?)?;
    Ok(())
}

// 入口文件：一条有效行，运行控制文件名 + 可选缩放因子
fn parse_entry(content: &str) -> CfResult<GlobalConfig> {
    let mut scan = TokenLines::new(content);
    let line = scan.expect("project entry line")?;
    let fields = line.fields();
    let run_filename = fields
        .first()
        .ok_or_else(|| CfError::parse(line.number, "missing run control filename"))?
        .to_string();
    let scale_factor = if fields.len() > 1 { line.f64_at(1)? } else { 1.0 };
    Ok(GlobalConfig {
        run_filename,
        scale_factor,
    })
}

fn load_optional<T>(what: &str, load: impl FnOnce() -> CfResult<T>) -> Option<T> {
    match load() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(component = what, error = %e, "optional component unavailable");
            None
        }
    }
}

fn read_text(path: &Path) -> CfResult<String> {
    if !path.exists() {
        return Err(CfError::MissingRequiredFile {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path)
        .map_err(|e| CfError::io_with_source(format!("failed to read {}", path.display()), e))
}

fn write_text(path: &Path, content: &str) -> CfResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CfError::io_with_source(format!("failed to create {}", parent.display()), e)
        })?;
    }
    fs::write(path, content)
        .map_err(|e| CfError::io_with_source(format!("failed to write {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_with_scale() {
        let config = parse_entry("% Projekt\nrun_01.in 2.5\n").unwrap();
        assert_eq!(config.run_filename, "run_01.in");
        assert_eq!(config.scale_factor, 2.5);
    }

    #[test]
    fn test_parse_entry_default_scale() {
        let config = parse_entry("run_99.in\n").unwrap();
        assert_eq!(config.scale_factor, 1.0);
    }

    #[test]
    fn test_parse_entry_empty_rejected() {
        assert!(parse_entry("% nur Kommentar\n").is_err());
    }

    #[test]
    fn test_canonical_hill_paths() {
        let paths = canonical_hill_paths(1, false);
        assert_eq!(paths.geometry, "in/hill_2/hang.geo");
        assert_eq!(paths.boundary, "in/hill_2/boundary.rb");
        assert!(paths.initial_solute.is_none());
        let with = canonical_hill_paths(0, true);
        assert_eq!(with.initial_solute.as_deref(), Some("in/hill_1/solute.ini"));
    }
}
