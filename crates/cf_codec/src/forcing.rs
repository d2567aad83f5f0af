// crates/cf_codec/src/forcing.rs

//! 驱动序列配置 (`timeser.def` 及其引用文件)
//!
//! 定义文件按关键字分节（`NIEDERSCHLAG`、`KLIMA`、`RANDBEDINGUNGEN`、
//! `SENKEN`、`LANDNUTZUNG`），每节一个数量行加对应条数的相对路径。
//! 降水与气象序列在装载时立即读入并整体物化，下游消费方需要对整个
//! 序列随机访问；边界与汇源驱动只记录路径。
//!
//! 土地利用时间线是"日期 + 查找表路径"的交替行，查找表把外部土地
//! 利用编号映射到库内编号。
//!
//! 写回时数据文件落到规范目录（`in/precip`、`in/climate`、
//! `in/landuse`），定义文件随之引用这些路径。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use chrono::NaiveDateTime;

use cf_foundation::prelude::*;

use crate::util;

/// 一条降水序列（整体物化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationSeries {
    /// 文件名（不含目录）
    pub filename: String,
    /// 序列起始时刻
    pub start: NaiveDateTime,
    /// 时间换算因子（原值 → 秒）
    pub factor_t: f64,
    /// 数值换算因子（原值 → m/s）
    pub factor_v: f64,
    /// (时间原值, 降水原值) 序列
    pub rows: Vec<(f64, f64)>,
}

/// 一条气象序列（整体物化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSeries {
    /// 文件名（不含目录）
    pub filename: String,
    /// 站点编号行，原样保留
    pub station_ids: String,
    /// 序列起始时刻
    pub start: NaiveDateTime,
    /// 时间换算因子
    pub factor_t: f64,
    /// 物理系数（辐射、温度修正等，位置语义由求解器定义）
    pub coeffs: Vec<f64>,
    /// 每行一个时间步的变量矩阵
    pub rows: Vec<Vec<f64>>,
}

/// 外部土地利用编号到库内编号的查找表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseLookup {
    /// 文件名（不含目录）
    pub filename: String,
    /// 外部栅格里的列号
    pub column_idx: i64,
    /// (外部编号, 库内编号) 对
    pub mapping: Vec<(i64, i64)>,
}

impl LandUseLookup {
    /// 外部编号映射到库内编号
    pub fn map(&self, external: i64) -> Option<i64> {
        self.mapping
            .iter()
            .find(|(ext, _)| *ext == external)
            .map(|(_, lib)| *lib)
    }
}

/// 时间线的一个时段：起始日期 + 生效的查找表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUsePeriod {
    /// 时段起始日期，原样保留
    pub start: String,
    /// 生效的查找表
    pub lookup: LandUseLookup,
}

/// 土地利用时间线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseTimeline {
    /// 文件名（不含目录）
    pub filename: String,
    /// 时段列表，按日期顺序
    pub periods: Vec<LandUsePeriod>,
    /// 末尾单独的结束日期行
    pub end_time: Option<String>,
}

/// 驱动配置聚合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForcingConfig {
    /// 降水序列
    pub precipitation: Vec<PrecipitationSeries>,
    /// 气象序列
    pub climate: Vec<ClimateSeries>,
    /// 土地利用时间线
    pub land_use_timeline: Option<LandUseTimeline>,
    /// 边界驱动文件路径（相对工程根，不在此解析）
    pub boundary_files: Vec<String>,
    /// 汇源驱动文件路径（相对工程根，不在此解析）
    pub sink_files: Vec<String>,
}

/// `timeser.def` 文件编解码器
pub struct ForcingCodec;

impl ForcingCodec {
    /// 从定义文件装载，`root` 为解析相对路径的工程根
    pub fn load<P: AsRef<Path>>(def_path: P, root: &Path) -> CfResult<ForcingConfig> {
        let content = util::read_file(def_path.as_ref())?;
        let mut scan = TokenLines::new(&content);
        let mut config = ForcingConfig::default();

        while let Some(line) = scan.next_line() {
            let upper = line.text.to_ascii_uppercase();
            if upper.contains("NIEDERSCHLAG") {
                for rel in Self::read_paths(&mut scan)? {
                    let full = root.join(&rel);
                    let data = util::read_file(&full)?;
                    let series = Self::parse_precipitation(&data, &Self::basename(&rel))
                        .map_err(|e| e.in_file(full))?;
                    config.precipitation.push(series);
                }
            } else if upper.contains("KLIMA") {
                for rel in Self::read_paths(&mut scan)? {
                    let full = root.join(&rel);
                    let data = util::read_file(&full)?;
                    let series = Self::parse_climate(&data, &Self::basename(&rel))
                        .map_err(|e| e.in_file(full))?;
                    config.climate.push(series);
                }
            } else if upper.contains("RANDBEDINGUNGEN") {
                config.boundary_files = Self::read_paths(&mut scan)?;
            } else if upper.contains("SENKEN") {
                config.sink_files = Self::read_paths(&mut scan)?;
            } else if upper.contains("LANDNUTZUNG") {
                if let Some(rel) = Self::read_landuse_ref(&mut scan)? {
                    config.land_use_timeline = Some(Self::load_timeline(&root.join(&rel), root)?);
                }
            } else if upper.contains("MASSE") || upper.contains("STOFF") {
                let count = scan.expect("section count")?.usize_at(0)?;
                scan.skip(count);
            }
            // 其余行（节之间的分隔等）跳过
        }
        Ok(config)
    }

    // 一节的数量行 + 对应条数的路径
    fn read_paths(scan: &mut TokenLines) -> CfResult<Vec<String>> {
        let count = scan.expect("section count")?.usize_at(0)?;
        let mut paths = Vec::with_capacity(count);
        for i in 0..count {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("section paths", count, i))?;
            paths.push(line.text.to_string());
        }
        Ok(paths)
    }

    // LANDNUTZUNG 节：数量行（0 = 无）或直接一条路径
    fn read_landuse_ref(scan: &mut TokenLines) -> CfResult<Option<String>> {
        let line = scan.expect("land use reference")?;
        if let Ok(flag) = line.text.parse::<i64>() {
            if flag > 0 {
                let path = scan.expect("land use timeline path")?;
                return Ok(Some(path.text.to_string()));
            }
            return Ok(None);
        }
        Ok(Some(line.text.to_string()))
    }

    fn basename(rel: &str) -> String {
        Path::new(rel)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel.to_string())
    }

    /// 解析一条降水序列
    pub fn parse_precipitation(content: &str, filename: &str) -> CfResult<PrecipitationSeries> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("precipitation header")?;
        let fields = header.fields();
        if fields.len() < 4 {
            return Err(CfError::malformed_header(
                header.number,
                format!("expected datetime + 2 factors, got {} tokens", fields.len()),
            ));
        }
        let start =
            util::parse_datetime(&format!("{} {}", fields[0], fields[1]), header.number)?;
        let factor_t = header.f64_at(2)?;
        let factor_v = header.f64_at(3)?;

        let mut rows = Vec::new();
        while let Some(line) = scan.next_line() {
            rows.push((line.f64_at(0)?, line.f64_at(1)?));
        }
        Ok(PrecipitationSeries {
            filename: filename.to_string(),
            start,
            factor_t,
            factor_v,
            rows,
        })
    }

    /// 解析一条气象序列
    pub fn parse_climate(content: &str, filename: &str) -> CfResult<ClimateSeries> {
        let mut scan = TokenLines::new(content);
        let ids_line = scan.expect("climate station ids")?;
        let station_ids = ids_line.text.to_string();

        let header = scan.expect("climate header")?;
        let fields = header.fields();
        if fields.len() < 3 {
            return Err(CfError::malformed_header(
                header.number,
                format!("expected datetime + factor, got {} tokens", fields.len()),
            ));
        }
        let start =
            util::parse_datetime(&format!("{} {}", fields[0], fields[1]), header.number)?;
        let factor_t = header.f64_at(2)?;
        let mut coeffs = Vec::new();
        for idx in 3..fields.len() {
            coeffs.push(header.f64_at(idx)?);
        }

        let mut rows = Vec::new();
        while let Some(line) = scan.next_line() {
            rows.push(line.all_f64()?);
        }
        Ok(ClimateSeries {
            filename: filename.to_string(),
            station_ids,
            start,
            factor_t,
            coeffs,
            rows,
        })
    }

    /// 解析一个土地利用查找表
    pub fn parse_lookup(content: &str, filename: &str) -> CfResult<LandUseLookup> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("lookup column index")?;
        let column_idx = header.i64_at(0)?;
        let mut mapping = Vec::new();
        while let Some(line) = scan.next_line() {
            if line.fields().len() >= 2 {
                mapping.push((line.i64_at(0)?, line.i64_at(1)?));
            }
        }
        Ok(LandUseLookup {
            filename: filename.to_string(),
            column_idx,
            mapping,
        })
    }

    /// 装载土地利用时间线及其全部查找表
    pub fn load_timeline(ts_path: &Path, root: &Path) -> CfResult<LandUseTimeline> {
        let content = util::read_file(ts_path)?;
        let filename = ts_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut scan = TokenLines::new(&content);

        let mut periods = Vec::new();
        let mut end_time = None;
        while let Some(date_line) = scan.next_line() {
            let Some(path_line) = scan.next_line() else {
                end_time = Some(date_line.text.to_string());
                break;
            };
            let rel = path_line.text.to_string();
            let full = root.join(&rel);
            let lookup = if full.exists() {
                let data = util::read_file(&full)?;
                Self::parse_lookup(&data, &Self::basename(&rel)).map_err(|e| e.in_file(full))?
            } else {
                warn!(path = %full.display(), "land use lookup missing");
                LandUseLookup {
                    filename: Self::basename(&rel),
                    column_idx: 1,
                    mapping: Vec::new(),
                }
            };
            periods.push(LandUsePeriod {
                start: date_line.text.to_string(),
                lookup,
            });
        }
        Ok(LandUseTimeline {
            filename,
            periods,
            end_time,
        })
    }

    /// 写定义文件及其引用的全部数据文件
    pub fn save<P: AsRef<Path>>(def_path: P, root: &Path, config: &ForcingConfig) -> CfResult<()> {
        let mut precip_paths = Vec::new();
        for series in &config.precipitation {
            let rel = format!("in/precip/{}", series.filename);
            util::write_file(&root.join(&rel), &Self::render_precipitation(series))?;
            precip_paths.push(rel);
        }
        let mut climate_paths = Vec::new();
        for series in &config.climate {
            let rel = format!("in/climate/{}", series.filename);
            util::write_file(&root.join(&rel), &Self::render_climate(series))?;
            climate_paths.push(rel);
        }
        let timeline_path = match &config.land_use_timeline {
            Some(timeline) => {
                for period in &timeline.periods {
                    let rel = format!("in/landuse/{}", period.lookup.filename);
                    util::write_file(&root.join(rel), &Self::render_lookup(&period.lookup))?;
                }
                let rel = format!("in/landuse/{}", timeline.filename);
                util::write_file(&root.join(&rel), &Self::render_timeline(timeline))?;
                Some(rel)
            }
            None => None,
        };

        let mut out = String::new();
        out.push_str(&format!("NIEDERSCHLAG\n{}\n", precip_paths.len()));
        for p in &precip_paths {
            out.push_str(p);
            out.push('\n');
        }
        out.push_str(&format!("RANDBEDINGUNGEN\n{}\n", config.boundary_files.len()));
        for p in &config.boundary_files {
            out.push_str(p);
            out.push('\n');
        }
        out.push_str(&format!("SENKEN\n{}\n", config.sink_files.len()));
        for p in &config.sink_files {
            out.push_str(p);
            out.push('\n');
        }
        out.push_str("Masse an Stoffen\n0\n");
        out.push_str("LANDNUTZUNG\n");
        match &timeline_path {
            Some(rel) => out.push_str(&format!("{}\n", rel)),
            None => out.push_str("0\n"),
        }
        out.push_str(&format!("KLIMA\n{}\n", climate_paths.len()));
        for p in &climate_paths {
            out.push_str(p);
            out.push('\n');
        }
        util::write_file(def_path.as_ref(), &out)
    }

    fn render_precipitation(series: &PrecipitationSeries) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {}\n",
            util::format_datetime(&series.start),
            series.factor_t,
            series.factor_v
        ));
        out.push_str("#  Startdatum              [d] -> [s]  [mm/6min] -> [m/s]\n");
        for (t, v) in &series.rows {
            out.push_str(&format!("{} {}\n", t, v));
        }
        out
    }

    fn render_climate(series: &ClimateSeries) -> String {
        let mut out = String::new();
        out.push_str(&series.station_ids);
        out.push('\n');
        let coeffs: Vec<String> = series.coeffs.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!(
            "{} {} {}\n",
            util::format_datetime(&series.start),
            series.factor_t,
            coeffs.join(" ")
        ));
        for row in &series.rows {
            let tokens: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            out.push_str(&tokens.join(" "));
            out.push('\n');
        }
        out
    }

    fn render_lookup(lookup: &LandUseLookup) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:<15} % columnnumber\n", lookup.column_idx));
        for (ext, lib) in &lookup.mapping {
            out.push_str(&format!("{:<4} {:<4}\n", ext, lib));
        }
        out
    }

    fn render_timeline(timeline: &LandUseTimeline) -> String {
        let mut out = String::new();
        for period in &timeline.periods {
            out.push_str(&period.start);
            out.push('\n');
            out.push_str(&format!("in/landuse/{}\n", period.lookup.filename));
        }
        if let Some(end) = &timeline.end_time {
            out.push_str(end);
            out.push('\n');
        }
        out
    }
}
