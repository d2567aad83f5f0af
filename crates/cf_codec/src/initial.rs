// crates/cf_codec/src/initial.rs

//! 初始条件 (`*.ini`)
//!
//! 水分初值与溶质初值两族文件，各有两种子格式：
//!
//! - 关键字逐点格式：`PSI|THETA|PHI time hill nv nl 1`（溶质为
//!   `KONZ ... n_solutes`）+ 全网格数值；`PHI` 只带 1 个数值时表示
//!   全域均一势
//! - 数值块格式：`n_lines ischal` + 区间行 `v1 v2 l1 l2 value`，
//!   `ischal=0` 解为饱和度 (THETA)，否则为吸力 (PSI)
//!
//! 逐点格式的节点顺序为垂直外层、侧向内层，与文件书写顺序一致，
//! 不做垂直翻转。编码一律写关键字逐点格式。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 水分初值场的物理量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterIcKind {
    /// 基质吸力
    Psi,
    /// 饱和度
    Theta,
    /// 总势（均一或逐点）
    Phi,
}

impl WaterIcKind {
    /// 文件头部关键字
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Psi => "PSI",
            Self::Theta => "THETA",
            Self::Phi => "PHI",
        }
    }
}

/// 一个坡面的水分初始条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterInitialCondition {
    /// 物理量类型，决定编码关键字
    pub kind: WaterIcKind,
    /// 头部时间戳
    pub time: f64,
    /// 坡面编号
    pub hill_id: i64,
    /// 逐节点初值，形状与网格一致
    pub values: Grid2<f64>,
}

/// 一个坡面的溶质初始浓度（每种溶质一个网格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoluteInitialCondition {
    /// 头部时间戳
    pub time: f64,
    /// 坡面编号
    pub hill_id: i64,
    /// 逐溶质的浓度网格
    pub concentrations: Vec<Grid2<f64>>,
}

// 把余下所有行的记号展平为浮点序列
fn collect_values(scan: &mut TokenLines) -> CfResult<Vec<f64>> {
    let mut values = Vec::new();
    while let Some(line) = scan.next_line() {
        values.extend(line.all_f64()?);
    }
    Ok(values)
}

// 按垂直外层、侧向内层的顺序从平铺记号填网格
fn fill_pointwise(
    values: &[f64],
    offset: usize,
    dims: GridDims,
    context: &str,
) -> CfResult<Grid2<f64>> {
    let needed = dims.n_layers * dims.n_columns;
    if values.len() < offset + needed {
        return Err(CfError::truncated(
            context,
            needed,
            values.len().saturating_sub(offset),
        ));
    }
    let mut grid = Grid2::filled(dims.n_layers, dims.n_columns, 0.0);
    let mut idx = offset;
    for v in 0..dims.n_layers {
        for l in 0..dims.n_columns {
            grid.set(v, l, values[idx]);
            idx += 1;
        }
    }
    Ok(grid)
}

fn render_grid(out: &mut String, grid: &Grid2<f64>) {
    for v in 0..grid.rows() {
        let tokens: Vec<String> = grid.row(v).iter().map(|x| x.to_string()).collect();
        out.push_str(&tokens.join(" "));
        out.push('\n');
    }
}

/// 水分初值文件编解码器
pub struct WaterIcCodec;

impl WaterIcCodec {
    /// 从文件装载，形状由网格尺寸约束
    pub fn load<P: AsRef<Path>>(path: P, dims: GridDims) -> CfResult<WaterInitialCondition> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, dims)
    }

    /// 从字符串解析
    pub fn parse(content: &str, dims: GridDims) -> CfResult<WaterInitialCondition> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("initial condition header")?;
        let fields = header.fields();
        let first = fields
            .first()
            .ok_or_else(|| CfError::malformed_header(header.number, "empty header line"))?;

        if first.parse::<f64>().is_ok() {
            return Self::parse_blocks(&mut scan, header, dims);
        }

        let kind = match first.to_ascii_uppercase().as_str() {
            "PSI" => WaterIcKind::Psi,
            "THETA" => WaterIcKind::Theta,
            "PHI" => WaterIcKind::Phi,
            other => return Err(CfError::unknown_keyword(other, header.number)),
        };
        let time = header.f64_at(1).unwrap_or(0.0);
        let hill_id = header.i64_at(2).unwrap_or(1);
        let values = collect_values(&mut scan)?;

        // 均一总势：只有 1 个数值（可带模式标志）
        let grid = if kind == WaterIcKind::Phi && values.len() <= 2 {
            let uniform = *values.first().ok_or_else(|| {
                CfError::truncated("uniform potential value", 1, 0)
            })?;
            Grid2::filled(dims.n_layers, dims.n_columns, uniform)
        } else {
            fill_pointwise(&values, 0, dims, "initial condition values")?
        };

        Ok(WaterInitialCondition {
            kind,
            time,
            hill_id,
            values: grid,
        })
    }

    // 数值块格式：`n_lines ischal` + 区间行
    fn parse_blocks(
        scan: &mut TokenLines,
        header: Line,
        dims: GridDims,
    ) -> CfResult<WaterInitialCondition> {
        let n_lines = header.usize_at(0)?;
        let ischal = header.i64_at(1).unwrap_or(1);
        let kind = if ischal == 0 {
            WaterIcKind::Theta
        } else {
            WaterIcKind::Psi
        };

        let mut values = Grid2::filled(dims.n_layers, dims.n_columns, 0.0);
        for i in 0..n_lines {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("initial condition blocks", n_lines, i))?;
            let (vs, ve) = resolve_auto(line.f64_at(0)?, line.f64_at(1)?, dims.n_layers);
            let (ls, le) = resolve_auto(line.f64_at(2)?, line.f64_at(3)?, dims.n_columns);
            values.fill_block(vs..ve, ls..le, line.f64_at(4)?);
        }
        Ok(WaterInitialCondition {
            kind,
            time: 0.0,
            hill_id: 1,
            values,
        })
    }

    /// 写到文件（关键字逐点格式）
    pub fn save<P: AsRef<Path>>(path: P, ic: &WaterInitialCondition) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(ic))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, ic: &WaterInitialCondition) -> CfResult<()> {
        writer
            .write_all(Self::render(ic).as_bytes())
            .map_err(|e| CfError::io_with_source("initial condition write failed", e))
    }

    fn render(ic: &WaterInitialCondition) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {} {} {} 1\n",
            ic.kind.keyword(),
            ic.time,
            ic.hill_id,
            ic.values.rows(),
            ic.values.cols()
        ));
        render_grid(&mut out, &ic.values);
        out
    }
}

/// 溶质初始浓度文件编解码器
pub struct SoluteIcCodec;

impl SoluteIcCodec {
    /// 从文件装载，形状由网格尺寸约束
    pub fn load<P: AsRef<Path>>(path: P, dims: GridDims) -> CfResult<SoluteInitialCondition> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, dims)
    }

    /// 从字符串解析
    pub fn parse(content: &str, dims: GridDims) -> CfResult<SoluteInitialCondition> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("solute header")?;
        let fields = header.fields();
        let first = fields
            .first()
            .ok_or_else(|| CfError::malformed_header(header.number, "empty header line"))?;

        if first.eq_ignore_ascii_case("KONZ") {
            let time = header.f64_at(1).unwrap_or(0.0);
            let hill_id = header.i64_at(2).unwrap_or(1);
            let n_solutes = header.usize_at(5)?;
            let values = collect_values(&mut scan)?;
            let per_solute = dims.n_layers * dims.n_columns;
            let mut concentrations = Vec::with_capacity(n_solutes);
            for s in 0..n_solutes {
                concentrations.push(fill_pointwise(
                    &values,
                    s * per_solute,
                    dims,
                    "solute concentration values",
                )?);
            }
            return Ok(SoluteInitialCondition {
                time,
                hill_id,
                concentrations,
            });
        }
        if first.parse::<f64>().is_err() {
            return Err(CfError::unknown_keyword(*first, header.number));
        }

        // 块格式：`n_lines mode n_solutes`，每种溶质前可有单记号编号行
        let n_lines = header.usize_at(0)?;
        let n_solutes = header.usize_at(2).unwrap_or(1);
        let mut concentrations = Vec::with_capacity(n_solutes);
        for _ in 0..n_solutes {
            if let Some(peeked) = scan.peek() {
                if peeked.fields().len() == 1 {
                    scan.skip(1);
                }
            }
            let mut grid = Grid2::filled(dims.n_layers, dims.n_columns, 0.0);
            for i in 0..n_lines {
                let line = scan
                    .next_line()
                    .ok_or_else(|| CfError::truncated("solute blocks", n_lines, i))?;
                let (vs, ve) = resolve_auto(line.f64_at(0)?, line.f64_at(1)?, dims.n_layers);
                let (ls, le) = resolve_auto(line.f64_at(2)?, line.f64_at(3)?, dims.n_columns);
                grid.fill_block(vs..ve, ls..le, line.f64_at(4)?);
            }
            concentrations.push(grid);
        }
        Ok(SoluteInitialCondition {
            time: 0.0,
            hill_id: 1,
            concentrations,
        })
    }

    /// 写到文件（`KONZ` 逐点格式）
    pub fn save<P: AsRef<Path>>(path: P, ic: &SoluteInitialCondition) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(ic))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, ic: &SoluteInitialCondition) -> CfResult<()> {
        writer
            .write_all(Self::render(ic).as_bytes())
            .map_err(|e| CfError::io_with_source("solute write failed", e))
    }

    fn render(ic: &SoluteInitialCondition) -> String {
        let (rows, cols) = ic
            .concentrations
            .first()
            .map(|g| (g.rows(), g.cols()))
            .unwrap_or((0, 0));
        let mut out = String::new();
        out.push_str(&format!(
            "KONZ {} {} {} {} {}\n",
            ic.time,
            ic.hill_id,
            rows,
            cols,
            ic.concentrations.len()
        ));
        for grid in &ic.concentrations {
            render_grid(&mut out, grid);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointwise_psi() {
        let content = "PSI 0.0 1 2 3 1\n-1.0 -1.0 -1.0\n-2.5 -2.5 -2.5\n";
        let ic = WaterIcCodec::parse(content, GridDims::new(2, 3)).unwrap();
        assert_eq!(ic.kind, WaterIcKind::Psi);
        assert_eq!(*ic.values.get(0, 0), -1.0);
        assert_eq!(*ic.values.get(1, 2), -2.5);
    }

    #[test]
    fn test_uniform_phi() {
        let content = "PHI 0.0 1 4 3 1\n-3.5\n";
        let ic = WaterIcCodec::parse(content, GridDims::new(4, 3)).unwrap();
        assert_eq!(ic.kind, WaterIcKind::Phi);
        assert!(ic.values.as_slice().iter().all(|&v| v == -3.5));
    }

    #[test]
    fn test_block_format_ischal_selects_kind() {
        let content = "1 0\n0.0 1.0 0.0 1.0 0.3\n";
        let ic = WaterIcCodec::parse(content, GridDims::new(3, 3)).unwrap();
        assert_eq!(ic.kind, WaterIcKind::Theta);
        assert!(ic.values.as_slice().iter().all(|&v| v == 0.3));
    }

    #[test]
    fn test_truncated_pointwise() {
        let content = "THETA 0.0 1 2 2 1\n0.2 0.2\n";
        let err = WaterIcCodec::parse(content, GridDims::new(2, 2)).unwrap_err();
        assert!(matches!(err, CfError::TruncatedInput { .. }));
    }

    #[test]
    fn test_water_roundtrip() {
        let mut values = Grid2::filled(3, 2, -1.0);
        values.set(2, 1, -9.75);
        let ic = WaterInitialCondition {
            kind: WaterIcKind::Psi,
            time: 0.0,
            hill_id: 2,
            values,
        };
        let mut buf = Vec::new();
        WaterIcCodec::write_to(&mut buf, &ic).unwrap();
        let parsed =
            WaterIcCodec::parse(std::str::from_utf8(&buf).unwrap(), GridDims::new(3, 2)).unwrap();
        assert_eq!(parsed, ic);
    }

    #[test]
    fn test_solute_konz_two_solutes() {
        let content = "KONZ 0.0 1 2 2 2\n1 1\n1 1\n5 5\n5 5\n";
        let ic = SoluteIcCodec::parse(content, GridDims::new(2, 2)).unwrap();
        assert_eq!(ic.concentrations.len(), 2);
        assert_eq!(*ic.concentrations[0].get(0, 0), 1.0);
        assert_eq!(*ic.concentrations[1].get(1, 1), 5.0);
    }

    #[test]
    fn test_solute_block_with_id_lines() {
        let content = "1 0 2\n1\n0.0 1.0 0.0 1.0 0.1\n2\n0.0 1.0 0.0 1.0 0.2\n";
        let ic = SoluteIcCodec::parse(content, GridDims::new(2, 2)).unwrap();
        assert_eq!(ic.concentrations.len(), 2);
        assert!(ic.concentrations[0].as_slice().iter().all(|&v| v == 0.1));
        assert!(ic.concentrations[1].as_slice().iter().all(|&v| v == 0.2));
    }
}
