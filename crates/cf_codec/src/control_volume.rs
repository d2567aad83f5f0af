// crates/cf_codec/src/control_volume.rs

//! 控制体块表 (`*.cv`)
//!
//! 水量平衡统计的积分区域。`<count>` + `count` 行 `v1 v2 h1 h2`，
//! 坐标保持文件原值（通常为相对坐标），不在此解析为节点区间。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个控制体块
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlVolumeBlock {
    /// 垂直起点
    pub v_start: f64,
    /// 垂直终点
    pub v_end: f64,
    /// 侧向起点
    pub h_start: f64,
    /// 侧向终点
    pub h_end: f64,
}

impl ControlVolumeBlock {
    /// 覆盖整个域的块
    pub fn whole_domain() -> Self {
        Self {
            v_start: 0.0,
            v_end: 1.0,
            h_start: 0.0,
            h_end: 1.0,
        }
    }
}

/// 一个坡面的控制体定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlVolumes {
    /// 块列表，通常只有一个全域块
    pub blocks: Vec<ControlVolumeBlock>,
}

/// `.cv` 文件编解码器
pub struct ControlVolumeCodec;

impl ControlVolumeCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<ControlVolumes> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<ControlVolumes> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("control volume count")?;
        let count = header.usize_at(0)?;
        let mut blocks = Vec::with_capacity(count);
        for i in 0..count {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("control volume blocks", count, i))?;
            blocks.push(ControlVolumeBlock {
                v_start: line.f64_at(0)?,
                v_end: line.f64_at(1)?,
                h_start: line.f64_at(2)?,
                h_end: line.f64_at(3)?,
            });
        }
        Ok(ControlVolumes { blocks })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, cv: &ControlVolumes) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(cv))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, cv: &ControlVolumes) -> CfResult<()> {
        writer
            .write_all(Self::render(cv).as_bytes())
            .map_err(|e| CfError::io_with_source("control volume write failed", e))
    }

    fn render(cv: &ControlVolumes) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", cv.blocks.len()));
        for b in &cv.blocks {
            out.push_str(&format!(
                "{} {} {} {}\n",
                b.v_start, b.v_end, b.h_start, b.h_end
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let cv = ControlVolumeCodec::parse("2\n0.0 1.0 0.0 1.0\n0.0 0.5 0.25 0.75\n").unwrap();
        assert_eq!(cv.blocks.len(), 2);
        assert_eq!(cv.blocks[1].h_start, 0.25);
    }

    #[test]
    fn test_truncated() {
        let err = ControlVolumeCodec::parse("2\n0.0 1.0 0.0 1.0\n").unwrap_err();
        assert!(matches!(err, CfError::TruncatedInput { .. }));
    }

    #[test]
    fn test_roundtrip() {
        let cv = ControlVolumes {
            blocks: vec![ControlVolumeBlock::whole_domain()],
        };
        let mut buf = Vec::new();
        ControlVolumeCodec::write_to(&mut buf, &cv).unwrap();
        let parsed = ControlVolumeCodec::parse(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(parsed, cv);
    }
}
