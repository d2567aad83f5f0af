// crates/cf_codec/src/surface.rs

//! 地表节点属性赋值 (`*.pob`)
//!
//! 头部三个浮点：属性类数、风向数、地平线角数。之后每行一个地表
//! 记录：`lu_id precip_id climate_id wind_factors...`。
//!
//! 数据行数等于地表节点数时为稠密格式；少于节点数时为稀疏锚点
//! 格式，第 `i` 个锚点落在节点 `round(i*(N-1)/(count-1))`，锚点之间
//! 向前填充。编码一律写稠密格式。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个地表节点的属性记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRecord {
    /// 土地利用编号
    pub land_use_id: i64,
    /// 降水序列编号
    pub precip_id: i64,
    /// 气候序列编号
    pub climate_id: i64,
    /// 风向因子（数量 = 头部风向数，历史文件可能缺省为 1 个）
    pub wind_factors: Vec<f64>,
}

/// 一个坡面的地表属性赋值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceAssignment {
    /// 属性类数
    pub n_attributes: usize,
    /// 风向数
    pub n_wind_directions: usize,
    /// 地平线角数
    pub n_horizon: usize,
    /// 逐地表节点的记录，长度 = 侧向列数
    pub records: Vec<SurfaceRecord>,
}

impl SurfaceAssignment {
    /// 全部节点同一记录的赋值
    pub fn uniform(n_columns: usize, record: SurfaceRecord) -> Self {
        Self {
            n_attributes: 3,
            n_wind_directions: record.wind_factors.len().max(1),
            n_horizon: 0,
            records: vec![record; n_columns],
        }
    }
}

/// `.pob` 文件编解码器
pub struct SurfaceCodec;

impl SurfaceCodec {
    /// 从文件装载，记录数由侧向列数约束
    pub fn load<P: AsRef<Path>>(path: P, n_columns: usize) -> CfResult<SurfaceAssignment> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, n_columns)
    }

    /// 从字符串解析
    pub fn parse(content: &str, n_columns: usize) -> CfResult<SurfaceAssignment> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("surface header")?;
        if header.fields().len() < 2 {
            return Err(CfError::malformed_header(
                header.number,
                "expected at least 2 header tokens",
            ));
        }
        let n_attributes = header.f64_at(0)? as usize;
        let n_wind_directions = header.f64_at(1)? as usize;
        let n_horizon = header.f64_at(2).unwrap_or(0.0) as usize;

        let mut anchors = Vec::new();
        while let Some(line) = scan.next_line() {
            let fields = line.fields();
            if fields.len() < 3 {
                return Err(CfError::parse(
                    line.number,
                    format!("surface record needs 3 ids, got {} tokens", fields.len()),
                ));
            }
            let mut wind_factors = Vec::new();
            for idx in 3..fields.len() {
                wind_factors.push(line.f64_at(idx)?);
            }
            if wind_factors.is_empty() {
                wind_factors.push(1.0);
            }
            anchors.push(SurfaceRecord {
                land_use_id: line.i64_at(0)?,
                precip_id: line.i64_at(1)?,
                climate_id: line.i64_at(2)?,
                wind_factors,
            });
        }
        if anchors.is_empty() {
            return Err(CfError::truncated("surface records", n_columns, 0));
        }
        if anchors.len() > n_columns {
            return Err(CfError::dimension_mismatch(
                "surface assignment",
                (1, n_columns),
                (1, anchors.len()),
            ));
        }

        let records = if anchors.len() == n_columns {
            anchors
        } else {
            Self::expand_anchors(&anchors, n_columns)
        };
        Ok(SurfaceAssignment {
            n_attributes,
            n_wind_directions,
            n_horizon,
            records,
        })
    }

    // 稀疏锚点的向前填充展开
    fn expand_anchors(anchors: &[SurfaceRecord], n_columns: usize) -> Vec<SurfaceRecord> {
        let count = anchors.len();
        let index_of = |i: usize| -> usize {
            if count > 1 {
                ((i as f64 * (n_columns - 1) as f64) / (count - 1) as f64).round() as usize
            } else {
                0
            }
        };
        let mut records = Vec::with_capacity(n_columns);
        for (i, anchor) in anchors.iter().enumerate() {
            let from = index_of(i);
            let to = if i + 1 < count {
                index_of(i + 1)
            } else {
                n_columns
            };
            for _ in from..to {
                records.push(anchor.clone());
            }
        }
        records.truncate(n_columns);
        while records.len() < n_columns {
            // count > n_columns 已被上层拒绝，这里只补齐取整空隙
            records.push(anchors[count - 1].clone());
        }
        records
    }

    /// 写到文件（稠密格式）
    pub fn save<P: AsRef<Path>>(path: P, surface: &SurfaceAssignment) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(surface))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, surface: &SurfaceAssignment) -> CfResult<()> {
        writer
            .write_all(Self::render(surface).as_bytes())
            .map_err(|e| CfError::io_with_source("surface assignment write failed", e))
    }

    fn render(surface: &SurfaceAssignment) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:.6} {:.6} {:.6}\n",
            surface.n_attributes as f64,
            surface.n_wind_directions as f64,
            surface.n_horizon as f64
        ));
        for rec in &surface.records {
            out.push_str(&format!(
                "{} {} {}",
                rec.land_use_id, rec.precip_id, rec.climate_id
            ));
            for factor in &rec.wind_factors {
                out.push_str(&format!(" {}", factor));
            }
            out.push('\n');
        }
        out
    }
}
