// crates/cf_codec/src/boundary.rs

//! 边界条件 (`boundary.rb`)
//!
//! 按关键字分节：`LINKS`/`RECHTS`/`OBEN`/`UNTEN` 四条边各填一个一维
//! 编号数组，`SENKEN` 填内部汇源网格，`MASSE` 只存一个溶质输运文件
//! 引用编号。每节自带 `count [mode]` 行，区间经统一解析器落位。
//!
//! 编码时四条边做一维游程压缩，区间按数组长度归一成相对坐标；
//! 汇源网格对每个编号写其包围盒，非矩形区域因此有损（源格式本身
//! 没有多边形表示，这是已知限制）。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个坡面的边界条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditions {
    /// 左边界编号，长度 = 垂直层数
    pub left: Vec<i32>,
    /// 右边界编号，长度 = 垂直层数
    pub right: Vec<i32>,
    /// 上边界编号，长度 = 侧向列数
    pub top: Vec<i32>,
    /// 下边界编号，长度 = 侧向列数
    pub bottom: Vec<i32>,
    /// 内部汇源编号网格，形状与网格一致
    pub sinks: Grid2<i32>,
    /// 溶质输运文件引用（`MASSE` 节，0 表示无）
    pub transport_id: Option<i64>,
}

impl BoundaryConditions {
    /// 全域无流动边界
    pub fn no_flow(dims: GridDims) -> Self {
        Self {
            left: vec![0; dims.n_layers],
            right: vec![0; dims.n_layers],
            top: vec![0; dims.n_columns],
            bottom: vec![0; dims.n_columns],
            sinks: Grid2::filled(dims.n_layers, dims.n_columns, 0),
            transport_id: None,
        }
    }
}

// 四条边在文件中的规范关键字
const EDGE_SECTIONS: [&str; 4] = ["LINKS", "RECHTS", "OBEN", "UNTEN"];

/// `boundary.rb` 文件编解码器
pub struct BoundaryCodec;

impl BoundaryCodec {
    /// 从文件装载，形状由网格尺寸约束
    pub fn load<P: AsRef<Path>>(path: P, dims: GridDims) -> CfResult<BoundaryConditions> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content, dims)
    }

    /// 从字符串解析
    pub fn parse(content: &str, dims: GridDims) -> CfResult<BoundaryConditions> {
        let mut scan = TokenLines::new(content);
        let mut bc = BoundaryConditions::no_flow(dims);

        while let Some(line) = scan.next_line() {
            let keyword = line.text.to_ascii_uppercase();
            match keyword.as_str() {
                "LINKS" | "LEFT" => Self::parse_edge(&mut scan, &mut bc.left)?,
                "RECHTS" | "RIGHT" => Self::parse_edge(&mut scan, &mut bc.right)?,
                "OBEN" | "TOP" => Self::parse_edge(&mut scan, &mut bc.top)?,
                "UNTEN" | "BOTTOM" => Self::parse_edge(&mut scan, &mut bc.bottom)?,
                "SENKEN" | "SINK" => Self::parse_sinks(&mut scan, &mut bc.sinks)?,
                "MASSE" | "MASS" => {
                    let id_line = scan.expect("transport reference")?;
                    let id = id_line.i64_at(0)?;
                    bc.transport_id = (id != 0).then_some(id);
                }
                other => return Err(CfError::unknown_keyword(other, line.number)),
            }
        }
        Ok(bc)
    }

    // 一条边：`count [mode]` + count 行 `p1 p2 id`
    fn parse_edge(scan: &mut TokenLines, edge: &mut [i32]) -> CfResult<()> {
        let meta = scan.expect("edge section count")?;
        let count = meta.usize_at(0)?;
        let mode = RangeMode::from_flag(meta.i64_at(1).unwrap_or(0));
        let n = edge.len();
        for i in 0..count {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("edge ranges", count, i))?;
            let (s, e) = resolve_with_mode(mode, line.f64_at(0)?, line.f64_at(1)?, n);
            let id = line.i64_at(2)? as i32;
            for slot in edge.iter_mut().take(e).skip(s) {
                *slot = id;
            }
        }
        Ok(())
    }

    // 汇源：`count [mode]` + count 行 `v1 v2 h1 h2 id`
    fn parse_sinks(scan: &mut TokenLines, sinks: &mut Grid2<i32>) -> CfResult<()> {
        let meta = scan.expect("sink section count")?;
        let count = meta.usize_at(0)?;
        let mode = RangeMode::from_flag(meta.i64_at(1).unwrap_or(0));
        for i in 0..count {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("sink ranges", count, i))?;
            let (vs, ve) = resolve_with_mode(mode, line.f64_at(0)?, line.f64_at(1)?, sinks.rows());
            let (hs, he) = resolve_with_mode(mode, line.f64_at(2)?, line.f64_at(3)?, sinks.cols());
            let id = line.i64_at(4)? as i32;
            sinks.fill_block(vs..ve, hs..he, id);
        }
        Ok(())
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, bc: &BoundaryConditions) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(bc))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, bc: &BoundaryConditions) -> CfResult<()> {
        writer
            .write_all(Self::render(bc).as_bytes())
            .map_err(|e| CfError::io_with_source("boundary write failed", e))
    }

    fn render(bc: &BoundaryConditions) -> String {
        let mut out = String::new();
        let edges = [&bc.left, &bc.right, &bc.top, &bc.bottom];
        for (keyword, edge) in EDGE_SECTIONS.iter().zip(edges) {
            Self::render_edge(&mut out, keyword, edge);
        }
        Self::render_sinks(&mut out, &bc.sinks);
        out.push_str(&format!("MASSE\n{}\n", bc.transport_id.unwrap_or(0)));
        out
    }

    // 一条边的游程压缩，区间归一为相对坐标
    fn render_edge(out: &mut String, keyword: &str, edge: &[i32]) {
        let n = edge.len();
        let runs = compress_1d(edge);
        out.push_str(&format!("{}\n{} 0\n", keyword, runs.len()));
        for run in &runs {
            out.push_str(&format!(
                "{} {} {}\n",
                run.start as f64 / n as f64,
                run.end as f64 / n as f64,
                run.value
            ));
        }
    }

    // 每个非零编号一个包围盒
    fn render_sinks(out: &mut String, sinks: &Grid2<i32>) {
        let (rows, cols) = (sinks.rows(), sinks.cols());
        let mut ids: Vec<i32> = sinks.as_slice().iter().copied().filter(|&v| v != 0).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut blocks = Vec::new();
        for id in ids {
            let (mut rmin, mut rmax, mut cmin, mut cmax) = (rows, 0usize, cols, 0usize);
            for r in 0..rows {
                for c in 0..cols {
                    if *sinks.get(r, c) == id {
                        rmin = rmin.min(r);
                        rmax = rmax.max(r);
                        cmin = cmin.min(c);
                        cmax = cmax.max(c);
                    }
                }
            }
            blocks.push(format!(
                "{} {} {} {} {}",
                rmin as f64 / rows as f64,
                (rmax + 1) as f64 / rows as f64,
                cmin as f64 / cols as f64,
                (cmax + 1) as f64 / cols as f64,
                id
            ));
        }

        out.push_str(&format!("SENKEN\n{} 0\n", blocks.len()));
        for block in blocks {
            out.push_str(&block);
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_with_aliases() {
        let content = "\
LEFT
1 0
0.0 0.5 3
SENKEN
1 1
2 3 2 3 9
MASSE
4
";
        let bc = BoundaryCodec::parse(content, GridDims::new(4, 4)).unwrap();
        assert_eq!(bc.left, vec![3, 3, 0, 0]);
        assert_eq!(bc.right, vec![0; 4]);
        assert_eq!(*bc.sinks.get(1, 1), 9);
        assert_eq!(*bc.sinks.get(2, 2), 9);
        assert_eq!(*bc.sinks.get(0, 0), 0);
        assert_eq!(bc.transport_id, Some(4));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = BoundaryCodec::parse("VORNE\n0\n", GridDims::new(2, 2)).unwrap_err();
        assert!(matches!(err, CfError::UnknownKeyword { .. }));
    }

    #[test]
    fn test_edge_rle_is_minimal_and_exact() {
        let dims = GridDims::new(8, 2);
        let mut bc = BoundaryConditions::no_flow(dims);
        bc.left = vec![0, 0, 0, 5, 5, 2, 2, 2];
        let mut buf = Vec::new();
        BoundaryCodec::write_to(&mut buf, &bc).unwrap();
        let text = String::from_utf8(buf).unwrap();

        // 恰好 3 个游程
        let links_count = text
            .lines()
            .skip_while(|l| *l != "LINKS")
            .nth(1)
            .unwrap();
        assert_eq!(links_count, "3 0");

        let parsed = BoundaryCodec::parse(&text, dims).unwrap();
        assert_eq!(parsed.left, bc.left);
    }

    #[test]
    fn test_roundtrip() {
        let dims = GridDims::new(5, 4);
        let mut bc = BoundaryConditions::no_flow(dims);
        bc.left = vec![1, 1, 0, 0, 2];
        bc.bottom = vec![0, 7, 7, 0];
        bc.sinks.fill_block(1..3, 1..3, 4);
        bc.transport_id = Some(2);
        let mut buf = Vec::new();
        BoundaryCodec::write_to(&mut buf, &bc).unwrap();
        let parsed = BoundaryCodec::parse(std::str::from_utf8(&buf).unwrap(), dims).unwrap();
        assert_eq!(parsed, bc);
    }

    #[test]
    fn test_masse_zero_means_none() {
        let bc = BoundaryCodec::parse("MASSE\n0\n", GridDims::new(2, 2)).unwrap();
        assert_eq!(bc.transport_id, None);
    }
}
