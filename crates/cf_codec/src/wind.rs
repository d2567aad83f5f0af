// crates/cf_codec/src/wind.rs

//! 风向因子库 (`winddir.def`)
//!
//! 首行为扇区数，之后每行一个扇区。历史文件有两种行形：
//! `upper factor`（两记号）与 `lower upper factor`（三记号），
//! 下界缺省时由上一扇区的上界衔接。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个风向扇区
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSector {
    /// 扇区下界 [°]，两记号行形没有显式下界
    pub lower_angle: Option<f64>,
    /// 扇区上界 [°]
    pub upper_angle: f64,
    /// 暴露因子
    pub factor: f64,
}

/// 风向因子库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindLibrary {
    /// 扇区列表，按角度顺序
    pub sectors: Vec<WindSector>,
}

impl WindLibrary {
    /// 给定风向角的暴露因子；无匹配扇区时为 1.0
    pub fn factor_for(&self, angle: f64) -> f64 {
        let mut lower = 0.0;
        for sector in &self.sectors {
            let lo = sector.lower_angle.unwrap_or(lower);
            if angle >= lo && angle < sector.upper_angle {
                return sector.factor;
            }
            lower = sector.upper_angle;
        }
        1.0
    }
}

/// `winddir.def` 文件编解码器
pub struct WindCodec;

impl WindCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<WindLibrary> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<WindLibrary> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("wind sector count")?;
        let count = header.usize_at(0)?;

        let mut sectors = Vec::with_capacity(count);
        for i in 0..count {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("wind sectors", count, i))?;
            let fields = line.fields();
            let sector = match fields.len() {
                2 => WindSector {
                    lower_angle: None,
                    upper_angle: line.f64_at(0)?,
                    factor: line.f64_at(1)?,
                },
                _ if fields.len() >= 3 => WindSector {
                    lower_angle: Some(line.f64_at(0)?),
                    upper_angle: line.f64_at(1)?,
                    factor: line.f64_at(2)?,
                },
                _ => {
                    return Err(CfError::parse(
                        line.number,
                        format!("wind sector needs 2 or 3 tokens, got {}", fields.len()),
                    ))
                }
            };
            sectors.push(sector);
        }
        Ok(WindLibrary { sectors })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, lib: &WindLibrary) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(lib))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, lib: &WindLibrary) -> CfResult<()> {
        writer
            .write_all(Self::render(lib).as_bytes())
            .map_err(|e| CfError::io_with_source("wind library write failed", e))
    }

    fn render(lib: &WindLibrary) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", lib.sectors.len()));
        for sector in &lib.sectors {
            match sector.lower_angle {
                Some(lower) => out.push_str(&format!(
                    "{} {} {}\n",
                    lower, sector.upper_angle, sector.factor
                )),
                None => out.push_str(&format!("{} {}\n", sector.upper_angle, sector.factor)),
            }
        }
        out
    }
}
