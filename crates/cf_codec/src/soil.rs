// crates/cf_codec/src/soil.rs

//! 土壤类型逐节点赋值 (`*.bod`)
//!
//! 两种子格式，由首个记号区分：
//!
//! - 稠密格式：`BODEN|BLOCK nv nl hill_id` + `nv` 行整数矩阵，
//!   文件自上而下
//! - 块格式：`n_blocks mode` + `n_blocks` 行 `v1 v2 h1 h2 soil_id`，
//!   区间经 [`resolve_with_mode`] 统一解析，文件顺序靠后的块覆盖
//!   靠前的块
//!
//! 编码一律写稠密 `BLOCK` 格式，保证取值逐节点无损。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 块格式未命中的节点使用的缺省土壤编号
const DEFAULT_SOIL_ID: i32 = 1;

/// 一个坡面的土壤类型赋值，形状与网格一致，第 0 层为底层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilAssignment {
    /// 坡面编号（写入稠密头部）
    pub hill_id: i32,
    /// 逐节点土壤编号
    pub ids: Grid2<i32>,
}

impl SoilAssignment {
    /// 全域同一土壤的赋值
    pub fn uniform(dims: GridDims, soil_id: i32) -> Self {
        Self {
            hill_id: 1,
            ids: Grid2::filled(dims.n_layers, dims.n_columns, soil_id),
        }
    }
}

/// `.bod` 文件编解码器
pub struct SoilCodec;

impl SoilCodec {
    /// 从文件装载，形状由网格尺寸约束
    pub fn load<P: AsRef<Path>>(path: P, dims: GridDims) -> CfResult<SoilAssignment> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, dims)
    }

    /// 从字符串解析
    pub fn parse(content: &str, dims: GridDims) -> CfResult<SoilAssignment> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("soil assignment header")?;
        let fields = header.fields();
        let first = fields
            .first()
            .ok_or_else(|| CfError::malformed_header(header.number, "empty header line"))?;

        if first.parse::<f64>().is_err() {
            match first.to_ascii_uppercase().as_str() {
                "BODEN" | "BLOCK" => Self::parse_dense(&mut scan, header, dims),
                other => Err(CfError::unknown_keyword(other, header.number)),
            }
        } else {
            Self::parse_blocks(&mut scan, header, dims)
        }
    }

    // 稠密格式：头部 `KW nv nl hill_id`，之后 nv*nl 个整数记号
    fn parse_dense(
        scan: &mut TokenLines,
        header: Line,
        dims: GridDims,
    ) -> CfResult<SoilAssignment> {
        let nv = header.usize_at(1)?;
        let nl = header.usize_at(2)?;
        let hill_id = header.i64_at(3).unwrap_or(1) as i32;
        if nv != dims.n_layers || nl != dims.n_columns {
            return Err(CfError::dimension_mismatch(
                "soil assignment",
                (dims.n_layers, dims.n_columns),
                (nv, nl),
            ));
        }

        let expected = nv * nl;
        let mut values: Vec<i32> = Vec::with_capacity(expected);
        while values.len() < expected {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("soil matrix", expected, values.len()))?;
            for idx in 0..line.fields().len() {
                values.push(line.i64_at(idx)? as i32);
            }
        }
        values.truncate(expected);

        let mut ids = Grid2::from_vec(nv, nl, values)?;
        ids.flip_vertical();
        Ok(SoilAssignment { hill_id, ids })
    }

    // 块格式：头部 `n_blocks mode`，行 `v1 v2 h1 h2 soil_id`
    fn parse_blocks(
        scan: &mut TokenLines,
        header: Line,
        dims: GridDims,
    ) -> CfResult<SoilAssignment> {
        let n_blocks = header.usize_at(0)?;
        let mode = RangeMode::from_flag(header.i64_at(1).unwrap_or(0));

        let mut ids = Grid2::filled(dims.n_layers, dims.n_columns, DEFAULT_SOIL_ID);
        for i in 0..n_blocks {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("soil blocks", n_blocks, i))?;
            let (v1, v2) = (line.f64_at(0)?, line.f64_at(1)?);
            let (h1, h2) = (line.f64_at(2)?, line.f64_at(3)?);
            let soil_id = line.i64_at(4)? as i32;

            let (vs, ve) = resolve_with_mode(mode, v1, v2, dims.n_layers);
            let (hs, he) = resolve_with_mode(mode, h1, h2, dims.n_columns);
            ids.fill_block(vs..ve, hs..he, soil_id);
        }
        Ok(SoilAssignment { hill_id: 1, ids })
    }

    /// 写到文件（稠密 `BLOCK` 格式）
    pub fn save<P: AsRef<Path>>(path: P, soil: &SoilAssignment) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(soil))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, soil: &SoilAssignment) -> CfResult<()> {
        writer
            .write_all(Self::render(soil).as_bytes())
            .map_err(|e| CfError::io_with_source("soil assignment write failed", e))
    }

    fn render(soil: &SoilAssignment) -> String {
        let (nv, nl) = (soil.ids.rows(), soil.ids.cols());
        let mut out = String::new();
        out.push_str(&format!("BLOCK {} {} {}\n", nv, nl, soil.hill_id));
        for iv_file in 0..nv {
            let row = soil.ids.row(nv - 1 - iv_file);
            let tokens: Vec<String> = row.iter().map(|id| id.to_string()).collect();
            out.push_str(&tokens.join(" "));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_parse_flips_rows() {
        let content = "BLOCK 2 3 1\n2 2 2\n1 1 1\n";
        let soil = SoilCodec::parse(content, GridDims::new(2, 3)).unwrap();
        // 文件首行是顶层
        assert_eq!(*soil.ids.get(1, 0), 2);
        assert_eq!(*soil.ids.get(0, 0), 1);
    }

    #[test]
    fn test_dense_dimension_mismatch() {
        let content = "BLOCK 3 3 1\n1 1 1\n1 1 1\n1 1 1\n";
        let err = SoilCodec::parse(content, GridDims::new(2, 3)).unwrap_err();
        assert!(matches!(err, CfError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_block_parse_later_wins() {
        // 先整域铺 2，再把下半层覆成 3
        let content = "2 0\n0.0 1.0 0.0 1.0 2\n0.0 0.5 0.0 1.0 3\n";
        let soil = SoilCodec::parse(content, GridDims::new(4, 4)).unwrap();
        assert_eq!(*soil.ids.get(0, 0), 3);
        assert_eq!(*soil.ids.get(1, 3), 3);
        assert_eq!(*soil.ids.get(2, 0), 2);
        assert_eq!(*soil.ids.get(3, 3), 2);
    }

    #[test]
    fn test_block_absolute_mode() {
        let content = "1 1\n1 2 2 4 7\n";
        let soil = SoilCodec::parse(content, GridDims::new(4, 4)).unwrap();
        assert_eq!(*soil.ids.get(0, 1), 7);
        assert_eq!(*soil.ids.get(1, 3), 7);
        assert_eq!(*soil.ids.get(2, 1), DEFAULT_SOIL_ID);
    }

    #[test]
    fn test_unknown_keyword_rejected() {
        let err = SoilCodec::parse("GESTEIN 2 2 1\n", GridDims::new(2, 2)).unwrap_err();
        assert!(matches!(err, CfError::UnknownKeyword { .. }));
    }

    #[test]
    fn test_roundtrip() {
        let mut soil = SoilAssignment::uniform(GridDims::new(3, 4), 1);
        soil.ids.fill_block(0..2, 1..3, 9);
        let mut buf = Vec::new();
        SoilCodec::write_to(&mut buf, &soil).unwrap();
        let parsed =
            SoilCodec::parse(std::str::from_utf8(&buf).unwrap(), GridDims::new(3, 4)).unwrap();
        assert_eq!(parsed.ids, soil.ids);
    }
}
