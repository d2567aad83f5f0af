// crates/cf_codec/src/printout.rs

//! 输出时刻表 (`*.prt`)
//!
//! 头部：参考时刻 `dd.mm.yyyy HH:MM:SS.ss` + 时间换算因子（原值
//! 单位 → 秒）。之后每行一个输出步：时间原值 + 可选的输出标志
//! （1=全场，0=仅地表节点，缺省 1）。

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一个输出步：时间原值 + 输出标志
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputStep {
    /// 换算前的时间值
    pub time: f64,
    /// 1=全场输出，0=仅地表节点
    pub flag: i64,
}

/// 一个坡面的输出时刻表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintoutTimes {
    /// 参考时刻
    pub reference: NaiveDateTime,
    /// 时间换算因子（原值 × 因子 = 秒）
    pub time_factor: f64,
    /// 输出步列表
    pub steps: Vec<OutputStep>,
}

impl PrintoutTimes {
    /// 各输出步相对参考时刻的秒数
    pub fn absolute_times_seconds(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.time * self.time_factor).collect()
    }
}

/// `.prt` 文件编解码器
pub struct PrintoutCodec;

impl PrintoutCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<PrintoutTimes> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<PrintoutTimes> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("printout header")?;
        let fields = header.fields();
        if fields.len() < 2 {
            return Err(CfError::malformed_header(
                header.number,
                format!("expected datetime + factor, got {} tokens", fields.len()),
            ));
        }
        let datetime_text = format!("{} {}", fields[0], fields[1]);
        let reference = util::parse_datetime(&datetime_text, header.number)?;
        let time_factor = if fields.len() > 2 {
            header.f64_at(2)?
        } else {
            1.0
        };

        let mut steps = Vec::new();
        while let Some(line) = scan.next_line() {
            steps.push(OutputStep {
                time: line.f64_at(0)?,
                flag: line.i64_at(1).unwrap_or(1),
            });
        }
        Ok(PrintoutTimes {
            reference,
            time_factor,
            steps,
        })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, prt: &PrintoutTimes) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(prt))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, prt: &PrintoutTimes) -> CfResult<()> {
        writer
            .write_all(Self::render(prt).as_bytes())
            .map_err(|e| CfError::io_with_source("printout write failed", e))
    }

    fn render(prt: &PrintoutTimes) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            util::format_datetime(&prt.reference),
            prt.time_factor
        ));
        out.push_str("#  Startzeit              [d] -> [s]\n");
        out.push_str("#  1: dump all; 0: dump for surface nodes\n");
        for step in &prt.steps {
            out.push_str(&format!("{} {}\n", step.time, step.flag));
        }
        out
    }
}
