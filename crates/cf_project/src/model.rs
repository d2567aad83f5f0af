// crates/cf_project/src/model.rs

//! 工程内存模型
//!
//! [`Project`] 聚合全局配置、运行控制、四个全局库与各坡面的输入。
//! 坡面输入按角色存放在显式字段里，角色由 [`FileRole`] 枚举分派，
//! 绝不按文件名后缀猜测。

use serde::{Deserialize, Serialize};

use cf_codec::boundary::BoundaryConditions;
use cf_codec::control_volume::ControlVolumes;
use cf_codec::forcing::ForcingConfig;
use cf_codec::heterogeneity::HeterogeneityMap;
use cf_codec::initial::{SoluteInitialCondition, WaterInitialCondition};
use cf_codec::landuse::LandUseLibrary;
use cf_codec::macropore::MacroporeField;
use cf_codec::mesh::HillslopeMesh;
use cf_codec::printout::PrintoutTimes;
use cf_codec::run_control::RunControl;
use cf_codec::soil::SoilAssignment;
use cf_codec::soil_library::SoilLibrary;
use cf_codec::surface::SurfaceAssignment;
use cf_codec::wind::WindLibrary;
use cf_codec::{CfError, CfResult, GridDims};

/// 坡面输入文件的角色
///
/// 运行控制文件里的路径按位置携带角色；装载与写回都按角色分派到
/// 对应的编解码器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileRole {
    /// 网格几何 (`.geo`)
    Geometry,
    /// 土壤赋值 (`.bod`)
    SoilMap,
    /// 导水率异质性网格
    KHeterogeneity,
    /// 含水量异质性网格
    ThetaHeterogeneity,
    /// 大孔隙参数场 (`.mak`)
    Macropores,
    /// 控制体块表 (`.cv`)
    ControlVolume,
    /// 水分初值 (`.ini`)
    InitialWater,
    /// 溶质初值
    InitialSolute,
    /// 输出时刻表 (`.prt`)
    Printout,
    /// 地表赋值 (`.pob`)
    Surface,
    /// 边界条件 (`.rb`)
    Boundary,
}

impl FileRole {
    /// 写回时的规范文件名
    pub fn canonical_filename(&self) -> &'static str {
        match self {
            Self::Geometry => "hang.geo",
            Self::SoilMap => "soils.bod",
            Self::KHeterogeneity => "kstat.dat",
            Self::ThetaHeterogeneity => "thstat.dat",
            Self::Macropores => "profil.mak",
            Self::ControlVolume => "control.cv",
            Self::InitialWater => "initial.ini",
            Self::InitialSolute => "solute.ini",
            Self::Printout => "printout.prt",
            Self::Surface => "surface.pob",
            Self::Boundary => "boundary.rb",
        }
    }
}

/// `CATFLOW.IN` 入口配置：运行控制文件名 + 全局缩放因子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// 运行控制文件路径，相对工程根
    pub run_filename: String,
    /// 全局缩放因子，入口文件缺省第二记号时为 1.0
    pub scale_factor: f64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            run_filename: "run_01.in".to_string(),
            scale_factor: 1.0,
        }
    }
}

/// 一个坡面的输入
///
/// 每个组件都是显式的 `Option`：缺席是一等状态，半成品坡面可以
/// 在内存里合法存在。完整性在写回前由 [`Project::validate`] 检查，
/// 装载时必备组件的缺失仍在装载器中直接中止。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hill {
    /// 坡面序号（1 起始，运行控制文件中的位置）
    pub id: usize,
    /// 网格几何，其尺寸约束其余逐节点文件的形状
    pub mesh: Option<HillslopeMesh>,
    /// 土壤赋值
    pub soil: Option<SoilAssignment>,
    /// 导水率异质性
    pub k_heterogeneity: Option<HeterogeneityMap>,
    /// 含水量异质性
    pub theta_heterogeneity: Option<HeterogeneityMap>,
    /// 大孔隙参数场
    pub macropores: Option<MacroporeField>,
    /// 控制体块表
    pub control_volumes: Option<ControlVolumes>,
    /// 水分初值
    pub initial_water: Option<WaterInitialCondition>,
    /// 溶质初值，仅当 `istact > 0` 时要求存在
    pub initial_solute: Option<SoluteInitialCondition>,
    /// 输出时刻表
    pub printout: Option<PrintoutTimes>,
    /// 地表赋值
    pub surface: Option<SurfaceAssignment>,
    /// 边界条件
    pub boundary: Option<BoundaryConditions>,
}

impl Hill {
    /// 只带序号的空坡面
    pub fn empty(id: usize) -> Self {
        Self {
            id,
            mesh: None,
            soil: None,
            k_heterogeneity: None,
            theta_heterogeneity: None,
            macropores: None,
            control_volumes: None,
            initial_water: None,
            initial_solute: None,
            printout: None,
            surface: None,
            boundary: None,
        }
    }

    /// 坡面网格尺寸；尚无几何时为 `None`
    pub fn dims(&self) -> Option<GridDims> {
        self.mesh.as_ref().map(|m| m.dims())
    }
}

/// 一个完整的模拟工程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// 入口配置
    pub config: GlobalConfig,
    /// 运行控制参数
    pub run_control: RunControl,
    /// 运行控制文件里第 4 条之后的全局路径，原样保留
    pub global_extras: Vec<String>,
    /// 土壤参数库（必备）
    pub soil_library: SoilLibrary,
    /// 驱动配置，装载失败降级为 `None`
    pub forcing: Option<ForcingConfig>,
    /// 土地利用库，装载失败降级为 `None`
    pub land_use_library: Option<LandUseLibrary>,
    /// 风向因子库，装载失败降级为 `None`
    pub wind_library: Option<WindLibrary>,
    /// 坡面列表，运行控制文件顺序
    pub hills: Vec<Hill>,
}

impl Project {
    /// 工程级一致性检查
    ///
    /// 写回前调用：逐坡面要求全部必备组件就位，校验所有逐节点数据
    /// 的形状与网格尺寸一致，`istact > 0` 时每个坡面必须有溶质初值。
    pub fn validate(&self) -> CfResult<()> {
        if self.run_control.istact > 0 {
            for hill in &self.hills {
                if hill.initial_solute.is_none() {
                    return Err(CfError::invalid_input(format!(
                        "istact = {} but hill {} has no solute initial condition",
                        self.run_control.istact, hill.id
                    )));
                }
            }
        }
        for hill in &self.hills {
            let missing = |what: &str| {
                CfError::invalid_input(format!(
                    "hill {} is missing required component: {}",
                    hill.id, what
                ))
            };
            let mesh = hill.mesh.as_ref().ok_or_else(|| missing("mesh geometry"))?;
            let soil = hill.soil.as_ref().ok_or_else(|| missing("soil assignment"))?;
            let k_het = hill
                .k_heterogeneity
                .as_ref()
                .ok_or_else(|| missing("k heterogeneity"))?;
            let th_het = hill
                .theta_heterogeneity
                .as_ref()
                .ok_or_else(|| missing("theta heterogeneity"))?;
            let macropores = hill
                .macropores
                .as_ref()
                .ok_or_else(|| missing("macropore field"))?;
            hill.control_volumes
                .as_ref()
                .ok_or_else(|| missing("control volumes"))?;
            let initial_water = hill
                .initial_water
                .as_ref()
                .ok_or_else(|| missing("water initial condition"))?;
            hill.printout
                .as_ref()
                .ok_or_else(|| missing("printout times"))?;
            let surface = hill
                .surface
                .as_ref()
                .ok_or_else(|| missing("surface assignment"))?;
            let boundary = hill
                .boundary
                .as_ref()
                .ok_or_else(|| missing("boundary conditions"))?;

            let dims = mesh.dims();
            let expected = (dims.n_layers, dims.n_columns);
            let check = |name: &'static str, rows: usize, cols: usize| -> CfResult<()> {
                if (rows, cols) != expected {
                    return Err(CfError::dimension_mismatch(name, expected, (rows, cols)));
                }
                Ok(())
            };
            check("soil assignment", soil.ids.rows(), soil.ids.cols())?;
            check(
                "k heterogeneity",
                k_het.factors.rows(),
                k_het.factors.cols(),
            )?;
            check(
                "theta heterogeneity",
                th_het.factors.rows(),
                th_het.factors.cols(),
            )?;
            check(
                "macropore field",
                macropores.params.rows(),
                macropores.params.cols(),
            )?;
            check(
                "initial condition",
                initial_water.values.rows(),
                initial_water.values.cols(),
            )?;
            if surface.records.len() != dims.n_columns {
                return Err(CfError::dimension_mismatch(
                    "surface assignment",
                    (1, dims.n_columns),
                    (1, surface.records.len()),
                ));
            }
            if boundary.left.len() != dims.n_layers || boundary.right.len() != dims.n_layers {
                return Err(CfError::dimension_mismatch(
                    "boundary side edges",
                    (dims.n_layers, 1),
                    (boundary.left.len(), 1),
                ));
            }
            if boundary.top.len() != dims.n_columns || boundary.bottom.len() != dims.n_columns {
                return Err(CfError::dimension_mismatch(
                    "boundary top/bottom edges",
                    (1, dims.n_columns),
                    (1, boundary.top.len()),
                ));
            }
        }
        Ok(())
    }
}
