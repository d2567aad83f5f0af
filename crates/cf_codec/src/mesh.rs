// crates/cf_codec/src/mesh.rs

//! 曲线坐标网格几何 (`*.geo`)
//!
//! 文件布局（全部为有效行）：
//!
//! 1. 头部：`iacnv iacnl w_fix hangnr`（垂直节点数、侧向节点数、
//!    各向异性角、坡面编号）
//! 2. 参考坐标：`xkobez ykobez hkobez`
//! 3. 地表统计：`hgobfl hgbreit hglang`
//! 4. `iacnv` 行垂直坐标 eta
//! 5. `iacnl` 行侧向记录 `xsi xko_top yko_top xko_bot yko_bot varbr`
//!    （地表与底部两对端点坐标；旧文件存在只带地表坐标的四记号行形，
//!    读取时容忍并把底部端点复制为地表端点）
//! 6. `iacnl × iacnv` 行节点记录 `hko sko f_eta f_xsi w_xsho w_hohr
//!    iboden`，列主序（侧向外层、垂直内层），文件内自上而下
//!
//! 内部存储第 0 层为底层，解码与编码各做一次垂直翻转。
//! 节点级 `iboden` 是网格自带的土壤编号副本，权威赋值在 `.bod` 中。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 网格头部
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshHeader {
    /// 垂直节点数（层数）
    pub n_layers: usize,
    /// 侧向节点数（列数）
    pub n_columns: usize,
    /// 全局各向异性角 [°]
    pub anisotropy_angle: f64,
    /// 坡面编号
    pub hill_id: i32,
    /// 参考坐标 (x, y, h)
    pub reference_coords: [f64; 3],
    /// 地表统计：面积、平均宽度、总长度
    pub surface_stats: [f64; 3],
}

/// 一个侧向位置的剖面端点记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateralNode {
    /// 侧向相对坐标 [0,1]
    pub xsi: f64,
    /// 地表端点 x 坐标
    pub xko_top: f64,
    /// 地表端点高程
    pub yko_top: f64,
    /// 底部端点 x 坐标
    pub xko_bot: f64,
    /// 底部端点高程
    pub yko_bot: f64,
    /// 可变宽度因子
    pub varbr: f64,
}

/// 一个网格节点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshNode {
    /// 高程坐标
    pub hko: f64,
    /// 侧向弧长坐标
    pub sko: f64,
    /// 垂直度量系数
    pub f_eta: f64,
    /// 侧向度量系数
    pub f_xsi: f64,
    /// 侧向倾角
    pub w_xsho: f64,
    /// 各向异性角
    pub w_hohr: f64,
    /// 土壤编号（网格内副本）
    pub soil_id: i32,
}

impl Default for MeshNode {
    fn default() -> Self {
        Self {
            hko: 0.0,
            sko: 0.0,
            f_eta: 1.0,
            f_xsi: 1.0,
            w_xsho: 0.0,
            w_hohr: 0.0,
            soil_id: 1,
        }
    }
}

/// 一个坡面的网格几何
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HillslopeMesh {
    /// 头部
    pub header: MeshHeader,
    /// 垂直坐标向量，长度 `n_layers`
    pub etas: Vec<f64>,
    /// 侧向记录，长度 `n_columns`
    pub laterals: Vec<LateralNode>,
    /// 节点网格，形状 `(n_layers, n_columns)`，第 0 层为底层
    pub nodes: Grid2<MeshNode>,
}

impl HillslopeMesh {
    /// 网格尺寸，约束同一坡面所有逐节点文件的形状
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.header.n_layers, self.header.n_columns)
    }

    /// 由坐标差分重算度量系数
    ///
    /// 简化网格来源（外部 DEM 等）只携带坐标；此时 `f_eta`/`f_xsi`
    /// 用前向差分近似，域边缘复制最后一个有效值。
    pub fn recompute_metric_factors(&mut self) {
        let (nv, nl) = (self.header.n_layers, self.header.n_columns);
        for il in 0..nl {
            for iv in 0..nv {
                let f_eta = if iv + 1 < nv {
                    (self.nodes.get(iv + 1, il).hko - self.nodes.get(iv, il).hko).abs()
                } else if iv > 0 {
                    self.nodes.get(iv - 1, il).f_eta
                } else {
                    1.0
                };
                let f_xsi = if il + 1 < nl {
                    (self.nodes.get(iv, il + 1).sko - self.nodes.get(iv, il).sko).abs()
                } else if il > 0 {
                    self.nodes.get(iv, il - 1).f_xsi
                } else {
                    1.0
                };
                let mut node = *self.nodes.get(iv, il);
                node.f_eta = f_eta;
                node.f_xsi = f_xsi;
                self.nodes.set(iv, il, node);
            }
        }
    }
}

/// `.geo` 文件编解码器
pub struct MeshCodec;

impl MeshCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<HillslopeMesh> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<HillslopeMesh> {
        let mut scan = TokenLines::new(content);

        let l1 = scan.expect("geometry header")?;
        let fields = l1.fields();
        if fields.len() < 4 {
            return Err(CfError::malformed_header(
                l1.number,
                format!("expected 4 header tokens, got {}", fields.len()),
            ));
        }
        let n_layers = l1.usize_at(0)?;
        let n_columns = l1.usize_at(1)?;
        let anisotropy_angle = l1.f64_at(2)?;
        let hill_id = l1.i64_at(3)? as i32;

        let l2 = scan.expect("reference coordinates")?;
        let reference_coords = [l2.f64_at(0)?, l2.f64_at(1)?, l2.f64_at(2)?];

        let l3 = scan.expect("surface statistics")?;
        let surface_stats = [l3.f64_at(0)?, l3.f64_at(1)?, l3.f64_at(2)?];

        let mut etas = Vec::with_capacity(n_layers);
        for i in 0..n_layers {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("eta vector", n_layers, i))?;
            etas.push(line.f64_at(0)?);
        }

        let mut laterals = Vec::with_capacity(n_columns);
        for i in 0..n_columns {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("lateral vector", n_columns, i))?;
            let lateral = if line.fields().len() >= 6 {
                LateralNode {
                    xsi: line.f64_at(0)?,
                    xko_top: line.f64_at(1)?,
                    yko_top: line.f64_at(2)?,
                    xko_bot: line.f64_at(3)?,
                    yko_bot: line.f64_at(4)?,
                    varbr: line.f64_at(5)?,
                }
            } else {
                // 旧的四记号行形只带地表端点，底部端点复制地表
                let xko = line.f64_at(1)?;
                let yko = line.f64_at(2)?;
                LateralNode {
                    xsi: line.f64_at(0)?,
                    xko_top: xko,
                    yko_top: yko,
                    xko_bot: xko,
                    yko_bot: yko,
                    varbr: line.f64_at(3)?,
                }
            };
            laterals.push(lateral);
        }

        // 节点块：侧向外层、垂直内层，文件自上而下
        let expected = n_layers * n_columns;
        let mut nodes = Grid2::filled(n_layers, n_columns, MeshNode::default());
        for il in 0..n_columns {
            for iv_file in 0..n_layers {
                let consumed = il * n_layers + iv_file;
                let line = scan
                    .next_line()
                    .ok_or_else(|| CfError::truncated("node records", expected, consumed))?;
                let node = MeshNode {
                    hko: line.f64_at(0)?,
                    sko: line.f64_at(1)?,
                    f_eta: line.f64_at(2)?,
                    f_xsi: line.f64_at(3)?,
                    w_xsho: line.f64_at(4)?,
                    w_hohr: line.f64_at(5)?,
                    soil_id: line.i64_at(6)? as i32,
                };
                nodes.set(n_layers - 1 - iv_file, il, node);
            }
        }

        Ok(HillslopeMesh {
            header: MeshHeader {
                n_layers,
                n_columns,
                anisotropy_angle,
                hill_id,
                reference_coords,
                surface_stats,
            },
            etas,
            laterals,
            nodes,
        })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, mesh: &HillslopeMesh) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(mesh)?)
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, mesh: &HillslopeMesh) -> CfResult<()> {
        let text = Self::render(mesh)?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| CfError::io_with_source("mesh write failed", e))
    }

    fn render(mesh: &HillslopeMesh) -> CfResult<String> {
        let h = &mesh.header;
        if mesh.etas.len() != h.n_layers {
            return Err(CfError::dimension_mismatch(
                "eta vector",
                (h.n_layers, 1),
                (mesh.etas.len(), 1),
            ));
        }
        if mesh.laterals.len() != h.n_columns {
            return Err(CfError::dimension_mismatch(
                "lateral vector",
                (1, h.n_columns),
                (1, mesh.laterals.len()),
            ));
        }
        if mesh.nodes.dims() != mesh.dims() {
            return Err(CfError::dimension_mismatch(
                "node grid",
                (h.n_layers, h.n_columns),
                (mesh.nodes.rows(), mesh.nodes.cols()),
            ));
        }

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {} {}\n",
            h.n_layers, h.n_columns, h.anisotropy_angle, h.hill_id
        ));
        out.push_str(&format!(
            "{} {} {}\n",
            h.reference_coords[0], h.reference_coords[1], h.reference_coords[2]
        ));
        out.push_str(&format!(
            "{} {} {}\n",
            h.surface_stats[0], h.surface_stats[1], h.surface_stats[2]
        ));
        for eta in &mesh.etas {
            out.push_str(&format!("{}\n", eta));
        }
        for lat in &mesh.laterals {
            out.push_str(&format!(
                "{} {} {} {} {} {}\n",
                lat.xsi, lat.xko_top, lat.yko_top, lat.xko_bot, lat.yko_bot, lat.varbr
            ));
        }
        for il in 0..h.n_columns {
            for iv_file in 0..h.n_layers {
                let node = mesh.nodes.get(h.n_layers - 1 - iv_file, il);
                out.push_str(&format!(
                    "{} {} {} {} {} {} {}\n",
                    node.hko,
                    node.sko,
                    node.f_eta,
                    node.f_xsi,
                    node.w_xsho,
                    node.w_hohr,
                    node.soil_id
                ));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mesh(n_layers: usize, n_columns: usize) -> HillslopeMesh {
        let mut nodes = Grid2::filled(n_layers, n_columns, MeshNode::default());
        for iv in 0..n_layers {
            for il in 0..n_columns {
                nodes.set(
                    iv,
                    il,
                    MeshNode {
                        hko: 100.0 + iv as f64,
                        sko: il as f64 * 2.5,
                        f_eta: 1.0,
                        f_xsi: 2.5,
                        w_xsho: 0.0,
                        w_hohr: 0.0,
                        soil_id: 1 + (iv % 2) as i32,
                    },
                );
            }
        }
        HillslopeMesh {
            header: MeshHeader {
                n_layers,
                n_columns,
                anisotropy_angle: 0.0,
                hill_id: 1,
                reference_coords: [3480100.0, 5445400.0, 202.0],
                surface_stats: [4.0, 10.0, 40.0],
            },
            etas: (0..n_layers).map(|i| i as f64 / (n_layers - 1) as f64).collect(),
            laterals: (0..n_columns)
                .map(|i| LateralNode {
                    xsi: i as f64 / (n_columns - 1) as f64,
                    xko_top: i as f64 * 2.5,
                    yko_top: 101.0,
                    xko_bot: i as f64 * 2.5,
                    yko_bot: 100.0,
                    varbr: 1.0,
                })
                .collect(),
            nodes,
        }
    }

    #[test]
    fn test_roundtrip_preserves_nodes() {
        let mesh = sample_mesh(5, 4);
        let mut buf = Vec::new();
        MeshCodec::write_to(&mut buf, &mesh).unwrap();
        let parsed = MeshCodec::parse(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(parsed, mesh);
    }

    #[test]
    fn test_parse_sample_layout() {
        let content = "\
2 2 0.0 1
0. 0. 0.
1. 1. 2.
0.0
1.0
0.0 0.0 0.0 1.0
1.0 1.0 0.0 1.0
% column 1, top to bottom
101. 0. 1. 1. 0. 0. 2
100. 0. 1. 1. 0. 0. 1
101. 1. 1. 1. 0. 0. 2
100. 1. 1. 1. 0. 0. 1
";
        let mesh = MeshCodec::parse(content).unwrap();
        assert_eq!(mesh.dims(), GridDims::new(2, 2));
        // 文件首条节点记录是顶层，内部应落到第 1 层
        assert_eq!(mesh.nodes.get(1, 0).soil_id, 2);
        assert_eq!(mesh.nodes.get(0, 0).soil_id, 1);
        assert_eq!(mesh.nodes.get(0, 0).hko, 100.0);
    }

    #[test]
    fn test_six_token_lateral_record() {
        let content = "\
2 2 0.0 1
0. 0. 0.
1. 1. 2.
0.0
1.0
0.0 0.0 101.0 10.5 95.0 1.0
1.0 2.5 101.5 12.0 95.5 0.8
101. 0. 1. 1. 0. 0. 2
100. 0. 1. 1. 0. 0. 1
101. 1. 1. 1. 0. 0. 2
100. 1. 1. 1. 0. 0. 1
";
        let mesh = MeshCodec::parse(content).unwrap();
        // 第四记号是底部端点坐标，不是宽度因子
        assert_eq!(mesh.laterals[0].xko_bot, 10.5);
        assert_eq!(mesh.laterals[0].yko_bot, 95.0);
        assert_eq!(mesh.laterals[0].varbr, 1.0);
        assert_eq!(mesh.laterals[1].varbr, 0.8);
        // 写回保持六记号行形
        let mut buf = Vec::new();
        MeshCodec::write_to(&mut buf, &mesh).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lateral_line = text.lines().nth(5).unwrap();
        assert_eq!(lateral_line.split_whitespace().count(), 6);
        let parsed = MeshCodec::parse(&text).unwrap();
        assert_eq!(parsed, mesh);
    }

    #[test]
    fn test_legacy_four_token_lateral_duplicates_endpoints() {
        let content = "\
2 2 0.0 1
0. 0. 0.
1. 1. 2.
0.0
1.0
0.0 3.0 101.0 1.0
1.0 5.0 102.0 0.9
101. 0. 1. 1. 0. 0. 2
100. 0. 1. 1. 0. 0. 1
101. 1. 1. 1. 0. 0. 2
100. 1. 1. 1. 0. 0. 1
";
        let mesh = MeshCodec::parse(content).unwrap();
        assert_eq!(mesh.laterals[0].varbr, 1.0);
        assert_eq!(mesh.laterals[0].xko_bot, 3.0);
        assert_eq!(mesh.laterals[0].yko_bot, 101.0);
        assert_eq!(mesh.laterals[1].xko_top, 5.0);
        assert_eq!(mesh.laterals[1].xko_bot, 5.0);
    }

    #[test]
    fn test_truncated_node_block() {
        let content = "\
2 2 0.0 1
0. 0. 0.
1. 1. 2.
0.0
1.0
0.0 0.0 0.0 1.0
1.0 1.0 0.0 1.0
101. 0. 1. 1. 0. 0. 2
100. 0. 1. 1. 0. 0. 1
";
        let err = MeshCodec::parse(content).unwrap_err();
        match err {
            CfError::TruncatedInput {
                expected, consumed, ..
            } => {
                assert_eq!(expected, 4);
                assert_eq!(consumed, 2);
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_recompute_metric_factors_forward_difference() {
        let mut mesh = sample_mesh(3, 3);
        mesh.recompute_metric_factors();
        // 层间距 1.0，列间距 2.5
        assert_eq!(mesh.nodes.get(0, 0).f_eta, 1.0);
        assert_eq!(mesh.nodes.get(2, 0).f_eta, 1.0); // 边缘复制
        assert_eq!(mesh.nodes.get(0, 0).f_xsi, 2.5);
        assert_eq!(mesh.nodes.get(0, 2).f_xsi, 2.5); // 边缘复制
    }
}
