// crates/cf_codec/src/heterogeneity.rs

//! 标量缩放因子网格 (`kstat*.dat` / `thstat*.dat`)
//!
//! 对导水率 K 或孔隙度 θ 的逐节点乘性缩放。头部 `hill_id rows cols`，
//! 之后 `rows` 行、每行 `cols` 个浮点，文件自上而下。给定期望尺寸时
//! 头部声明不符是硬错误。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个坡面的异质性缩放场，第 0 层为底层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeterogeneityMap {
    /// 坡面编号
    pub hill_id: i64,
    /// 逐节点缩放因子
    pub factors: Grid2<f64>,
}

impl HeterogeneityMap {
    /// 全域无缩放（因子 1.0）
    pub fn neutral(hill_id: i64, dims: GridDims) -> Self {
        Self {
            hill_id,
            factors: Grid2::filled(dims.n_layers, dims.n_columns, 1.0),
        }
    }
}

/// 异质性网格文件编解码器
pub struct HeterogeneityCodec;

impl HeterogeneityCodec {
    /// 从文件装载；`expected` 给定时校验头部声明的形状
    pub fn load<P: AsRef<Path>>(
        path: P,
        expected: Option<GridDims>,
    ) -> CfResult<HeterogeneityMap> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, expected)
    }

    /// 从字符串解析
    pub fn parse(content: &str, expected: Option<GridDims>) -> CfResult<HeterogeneityMap> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("heterogeneity header")?;
        if header.fields().len() < 3 {
            return Err(CfError::malformed_header(
                header.number,
                format!("expected 3 header tokens, got {}", header.fields().len()),
            ));
        }
        let hill_id = header.i64_at(0)?;
        let rows = header.usize_at(1)?;
        let cols = header.usize_at(2)?;
        if let Some(dims) = expected {
            if rows != dims.n_layers || cols != dims.n_columns {
                return Err(CfError::dimension_mismatch(
                    "heterogeneity map",
                    (dims.n_layers, dims.n_columns),
                    (rows, cols),
                ));
            }
        }

        let expected_count = rows * cols;
        let mut values: Vec<f64> = Vec::with_capacity(expected_count);
        while values.len() < expected_count {
            let line = scan.next_line().ok_or_else(|| {
                CfError::truncated("heterogeneity values", expected_count, values.len())
            })?;
            values.extend(line.all_f64()?);
        }
        values.truncate(expected_count);

        let mut factors = Grid2::from_vec(rows, cols, values)?;
        factors.flip_vertical();
        Ok(HeterogeneityMap { hill_id, factors })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, map: &HeterogeneityMap) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(map))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, map: &HeterogeneityMap) -> CfResult<()> {
        writer
            .write_all(Self::render(map).as_bytes())
            .map_err(|e| CfError::io_with_source("heterogeneity write failed", e))
    }

    fn render(map: &HeterogeneityMap) -> String {
        let (rows, cols) = (map.factors.rows(), map.factors.cols());
        let mut out = String::new();
        out.push_str(&format!("{} {} {}\n", map.hill_id, rows, cols));
        for iv_file in 0..rows {
            let row = map.factors.row(rows - 1 - iv_file);
            let tokens: Vec<String> = row.iter().map(|v| v.to_string()).collect();
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
    fn test_parse_flips_to_bottom_origin() {
        let content = "1 2 3\n2.0 2.0 2.0\n0.5 0.5 0.5\n";
        let map = HeterogeneityCodec::parse(content, Some(GridDims::new(2, 3))).unwrap();
        assert_eq!(*map.factors.get(1, 0), 2.0);
        assert_eq!(*map.factors.get(0, 0), 0.5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let content = "1 2 2\n1.0 1.0\n1.0 1.0\n";
        let err = HeterogeneityCodec::parse(content, Some(GridDims::new(3, 2))).unwrap_err();
        assert!(matches!(err, CfError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_no_expectation_accepts_any_shape() {
        let content = "7 1 4\n1.0 1.1 1.2 1.3\n";
        let map = HeterogeneityCodec::parse(content, None).unwrap();
        assert_eq!(map.hill_id, 7);
        assert_eq!(map.factors.dims(), GridDims::new(1, 4));
    }

    #[test]
    fn test_truncated_values() {
        let content = "1 2 2\n1.0 1.0\n";
        let err = HeterogeneityCodec::parse(content, None).unwrap_err();
        assert!(matches!(err, CfError::TruncatedInput { .. }));
    }

    #[test]
    fn test_roundtrip() {
        let mut map = HeterogeneityMap::neutral(3, GridDims::new(3, 2));
        map.factors.set(0, 0, 0.25);
        map.factors.set(2, 1, 4.5);
        let mut buf = Vec::new();
        HeterogeneityCodec::write_to(&mut buf, &map).unwrap();
        let parsed = HeterogeneityCodec::parse(std::str::from_utf8(&buf).unwrap(), None).unwrap();
        assert_eq!(parsed, map);
    }
}
