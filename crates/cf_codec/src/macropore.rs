// crates/cf_codec/src/macropore.rs

//! 大孔隙参数场 (`*.mak`)
//!
//! 头部：`n_lines mode m_aniso`，第二行为速度平均方式关键字
//! (`ari`/`geo`)。之后 `n_lines` 行 `v1 v2 l1 l2 fmac amac beta`。
//! 首记号为 `DIRECT` 的矩阵子格式可识别但不支持。
//!
//! 编码做二维游程压缩：每列先垂直压成最长同值段，段表完全相同的
//! 相邻列再合并为一个侧向块。块数可能与原文件不同，但展开后的
//! 参数场逐节点一致。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 大孔隙流速的平均方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelocityMethod {
    /// 算术平均 (`ari`)
    Arithmetic,
    /// 几何平均 (`geo`)
    Geometric,
}

impl VelocityMethod {
    /// 文件中的关键字
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Arithmetic => "ari",
            Self::Geometric => "geo",
        }
    }

    fn from_keyword(keyword: &str, line: usize) -> CfResult<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "ari" => Ok(Self::Arithmetic),
            "geo" => Ok(Self::Geometric),
            other => Err(CfError::unknown_keyword(other, line)),
        }
    }
}

/// 一个节点的大孔隙参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroporeParams {
    /// 大孔隙度放大因子
    pub fmac: f64,
    /// 大孔隙截面积
    pub amac: f64,
    /// 饱和导水率增长指数
    pub beta: f64,
}

impl Default for MacroporeParams {
    /// 缺省为"无大孔隙"
    fn default() -> Self {
        Self {
            fmac: 1.0,
            amac: 0.0,
            beta: 1.0,
        }
    }
}

/// 一个坡面的大孔隙参数场
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroporeField {
    /// 速度平均方式
    pub velocity_method: VelocityMethod,
    /// 各向异性作用方向：1=垂直，2=侧向，3=双向
    pub anisotropy: i64,
    /// 逐节点参数，形状与网格一致
    pub params: Grid2<MacroporeParams>,
}

/// `.mak` 文件编解码器
pub struct MacroporeCodec;

impl MacroporeCodec {
    /// 从文件装载，形状由网格尺寸约束
    pub fn load<P: AsRef<Path>>(path: P, dims: GridDims) -> CfResult<MacroporeField> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, dims)
    }

    /// 从字符串解析
    pub fn parse(content: &str, dims: GridDims) -> CfResult<MacroporeField> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("macropore header")?;
        let fields = header.fields();
        let first = fields
            .first()
            .ok_or_else(|| CfError::malformed_header(header.number, "empty header line"))?;
        if first.eq_ignore_ascii_case("DIRECT") {
            return Err(CfError::unsupported("macropore DIRECT matrix"));
        }
        if fields.len() < 3 {
            return Err(CfError::malformed_header(
                header.number,
                format!("expected 3 header tokens, got {}", fields.len()),
            ));
        }
        let n_lines = header.usize_at(0)?;
        let mode = RangeMode::from_flag(header.i64_at(1)?);
        let anisotropy = header.i64_at(2)?;

        let method_line = scan.expect("velocity method")?;
        let velocity_method = VelocityMethod::from_keyword(method_line.text, method_line.number)?;

        let mut params = Grid2::filled(dims.n_layers, dims.n_columns, MacroporeParams::default());
        for i in 0..n_lines {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("macropore blocks", n_lines, i))?;
            let (vs, ve) = resolve_with_mode(mode, line.f64_at(0)?, line.f64_at(1)?, dims.n_layers);
            let (ls, le) =
                resolve_with_mode(mode, line.f64_at(2)?, line.f64_at(3)?, dims.n_columns);
            let fmac = line.f64_at(4)?;
            let mut amac = line.f64_at(5)?;
            let beta = line.f64_at(6)?;
            // 激活的大孔隙截面积必须非零，过小时按 1.0 处理
            if amac > 0.0 && amac < 1e-8 {
                amac = 1.0;
            }
            params.fill_block(vs..ve, ls..le, MacroporeParams { fmac, amac, beta });
        }

        Ok(MacroporeField {
            velocity_method,
            anisotropy,
            params,
        })
    }

    /// 写到文件（二维游程压缩的块格式）
    pub fn save<P: AsRef<Path>>(path: P, field: &MacroporeField) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(field))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, field: &MacroporeField) -> CfResult<()> {
        writer
            .write_all(Self::render(field).as_bytes())
            .map_err(|e| CfError::io_with_source("macropore write failed", e))
    }

    fn render(field: &MacroporeField) -> String {
        let n_columns = field.params.cols();

        // 每列垂直压缩，段表相同的相邻列合并
        let mut lateral_blocks: Vec<(usize, usize, Vec<Run<MacroporeParams>>)> = Vec::new();
        for col in 0..n_columns {
            let runs = compress_1d(&field.params.column(col));
            match lateral_blocks.last_mut() {
                Some((_, end, prev)) if *prev == runs && *end == col => *end = col + 1,
                _ => lateral_blocks.push((col, col + 1, runs)),
            }
        }

        let mut rows = Vec::new();
        for (l_start, l_end, runs) in &lateral_blocks {
            for run in runs {
                rows.push(format!(
                    "{} {} {} {} {} {} {}",
                    run.start + 1,
                    run.end,
                    l_start + 1,
                    l_end,
                    run.value.fmac,
                    run.value.amac,
                    run.value.beta
                ));
            }
        }

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {}\n",
            rows.len(),
            RangeMode::Absolute.to_flag(),
            field.anisotropy
        ));
        out.push_str(field.velocity_method.keyword());
        out.push('\n');
        for row in rows {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_mode() {
        let content = "1 1 1\nari\n1 2 1 3 2.0 0.001 1.5\n";
        let field = MacroporeCodec::parse(content, GridDims::new(4, 3)).unwrap();
        assert_eq!(field.velocity_method, VelocityMethod::Arithmetic);
        assert_eq!(field.params.get(0, 0).fmac, 2.0);
        assert_eq!(field.params.get(1, 2).beta, 1.5);
        assert_eq!(*field.params.get(2, 0), MacroporeParams::default());
    }

    #[test]
    fn test_tiny_amac_promoted() {
        let content = "1 1 1\ngeo\n1 4 1 3 2.0 1e-12 1.0\n";
        let field = MacroporeCodec::parse(content, GridDims::new(4, 3)).unwrap();
        assert_eq!(field.params.get(0, 0).amac, 1.0);
    }

    #[test]
    fn test_direct_mode_unsupported() {
        let err = MacroporeCodec::parse("DIRECT 4 3\n", GridDims::new(4, 3)).unwrap_err();
        assert!(matches!(err, CfError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_unknown_velocity_keyword() {
        let err = MacroporeCodec::parse("0 1 1\nharmonic\n", GridDims::new(2, 2)).unwrap_err();
        assert!(matches!(err, CfError::UnknownKeyword { .. }));
    }

    #[test]
    fn test_roundtrip_exact() {
        let dims = GridDims::new(5, 4);
        let mut params = Grid2::filled(dims.n_layers, dims.n_columns, MacroporeParams::default());
        // 左侧两列上部为同一参数块，最后一列底部单独一段
        params.fill_block(
            2..5,
            0..2,
            MacroporeParams {
                fmac: 3.0,
                amac: 0.001,
                beta: 2.0,
            },
        );
        params.fill_block(
            0..1,
            3..4,
            MacroporeParams {
                fmac: 1.5,
                amac: 0.002,
                beta: 1.0,
            },
        );
        let field = MacroporeField {
            velocity_method: VelocityMethod::Geometric,
            anisotropy: 3,
            params,
        };
        let mut buf = Vec::new();
        MacroporeCodec::write_to(&mut buf, &field).unwrap();
        let parsed = MacroporeCodec::parse(std::str::from_utf8(&buf).unwrap(), dims).unwrap();
        assert_eq!(parsed, field);
    }

    #[test]
    fn test_merged_columns_minimal_blocks() {
        let dims = GridDims::new(3, 4);
        let params = Grid2::filled(dims.n_layers, dims.n_columns, MacroporeParams::default());
        let field = MacroporeField {
            velocity_method: VelocityMethod::Arithmetic,
            anisotropy: 1,
            params,
        };
        let mut buf = Vec::new();
        MacroporeCodec::write_to(&mut buf, &field).unwrap();
        let text = String::from_utf8(buf).unwrap();
        // 均匀场压成唯一一个块
        assert!(text.starts_with("1 1 1\n"));
        assert!(text.contains("1 3 1 4"));
    }
}
