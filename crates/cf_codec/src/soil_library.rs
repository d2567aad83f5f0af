// crates/cf_codec/src/soil_library.rs

//! 土壤参数库 (`soils.def`)
//!
//! 首行为土壤种数，之后每种土壤占 6 个有效行：
//!
//! 1. `id name...`（名称可含空白）
//! 2. 控制行：模型编号、查表长度、两个各向异性因子、初始饱和度，
//!    后接可选扩展项
//! 3. 物理行：Ks、θs、θr、α、n，后接可选扩展项
//! 4.–6. 三行补零占位
//!
//! 扩展项按原样保留，保证写回时不丢字段。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 一种土壤的参数条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilType {
    /// 土壤编号，被 `.bod` 赋值引用
    pub id: i64,
    /// 名称
    pub name: String,
    /// 水力模型编号（1 = Van Genuchten）
    pub model_id: i64,
    /// 查表长度
    pub table_size: i64,
    /// 水平各向异性因子
    pub anisotropy_x: f64,
    /// 垂直各向异性因子
    pub anisotropy_z: f64,
    /// 初始饱和度
    pub s_null: f64,
    /// 控制行的扩展项
    pub control_extras: Vec<f64>,
    /// 饱和导水率 [m/s]
    pub ks: f64,
    /// 饱和含水量
    pub theta_s: f64,
    /// 残余含水量
    pub theta_r: f64,
    /// α 参数 [1/m]
    pub alpha: f64,
    /// n 参数
    pub n_param: f64,
    /// 物理行的扩展项
    pub extra_params: Vec<f64>,
}

/// 土壤参数库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLibrary {
    /// 条目列表，文件顺序
    pub soils: Vec<SoilType>,
}

impl SoilLibrary {
    /// 按编号查条目
    pub fn by_id(&self, id: i64) -> Option<&SoilType> {
        self.soils.iter().find(|s| s.id == id)
    }
}

/// `soils.def` 文件编解码器
pub struct SoilLibraryCodec;

impl SoilLibraryCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<SoilLibrary> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<SoilLibrary> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("soil library count")?;
        let count = header.usize_at(0)?;

        let mut soils = Vec::with_capacity(count);
        for i in 0..count {
            let name_line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("soil entries", count, i))?;
            let fields = name_line.fields();
            if fields.len() < 2 {
                return Err(CfError::malformed_header(
                    name_line.number,
                    "expected soil id and name",
                ));
            }
            let id = name_line.i64_at(0)?;
            let name = fields[1..].join(" ");

            let control = scan.expect("soil control line")?.all_f64()?;
            if control.len() < 5 {
                return Err(CfError::invalid_input(format!(
                    "soil '{}': control line needs 5 values, got {}",
                    name,
                    control.len()
                )));
            }
            let physics = scan.expect("soil physics line")?.all_f64()?;
            if physics.len() < 5 {
                return Err(CfError::invalid_input(format!(
                    "soil '{}': physics line needs 5 values, got {}",
                    name,
                    physics.len()
                )));
            }
            // 三行补零占位
            scan.skip(3);

            soils.push(SoilType {
                id,
                name,
                model_id: control[0] as i64,
                table_size: control[1] as i64,
                anisotropy_x: control[2],
                anisotropy_z: control[3],
                s_null: control[4],
                control_extras: control[5..].to_vec(),
                ks: physics[0],
                theta_s: physics[1],
                theta_r: physics[2],
                alpha: physics[3],
                n_param: physics[4],
                extra_params: physics[5..].to_vec(),
            });
        }
        Ok(SoilLibrary { soils })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, lib: &SoilLibrary) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(lib))
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, lib: &SoilLibrary) -> CfResult<()> {
        writer
            .write_all(Self::render(lib).as_bytes())
            .map_err(|e| CfError::io_with_source("soil library write failed", e))
    }

    fn render(lib: &SoilLibrary) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", lib.soils.len()));
        for s in &lib.soils {
            out.push_str(&format!("{} {}\n", s.id, s.name));

            let mut control = vec![
                s.model_id.to_string(),
                s.table_size.to_string(),
                s.anisotropy_x.to_string(),
                s.anisotropy_z.to_string(),
                s.s_null.to_string(),
            ];
            control.extend(s.control_extras.iter().map(|x| x.to_string()));
            out.push_str(&control.join(" "));
            out.push('\n');

            let mut physics = vec![
                s.ks.to_string(),
                s.theta_s.to_string(),
                s.theta_r.to_string(),
                s.alpha.to_string(),
                s.n_param.to_string(),
            ];
            physics.extend(s.extra_params.iter().map(|x| x.to_string()));
            out.push_str(&physics.join(" "));
            out.push('\n');

            out.push_str("0. 0. 0.\n0. 0. 0.\n0. 0. 0.\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
2
1 SL - St3 Su3
1 800 1.00 1.00 0.09
2.1e-06 0.44 0.06 2.5 1.32
0. 0. 0.
0. 0. 0.
0. 0. 0.
2 Ut4
1 800 1.00 1.00 0.09 0.5
1.0e-07 0.47 0.08 1.1 1.25 0.5 -2.0
0. 0. 0.
0. 0. 0.
0. 0. 0.
";

    #[test]
    fn test_parse_two_soils() {
        let lib = SoilLibraryCodec::parse(SAMPLE).unwrap();
        assert_eq!(lib.soils.len(), 2);
        assert_eq!(lib.soils[0].name, "SL - St3 Su3");
        assert_eq!(lib.soils[0].ks, 2.1e-6);
        assert_eq!(lib.soils[1].control_extras, vec![0.5]);
        assert_eq!(lib.soils[1].extra_params, vec![0.5, -2.0]);
    }

    #[test]
    fn test_by_id() {
        let lib = SoilLibraryCodec::parse(SAMPLE).unwrap();
        assert_eq!(lib.by_id(2).unwrap().theta_s, 0.47);
        assert!(lib.by_id(9).is_none());
    }

    #[test]
    fn test_truncated_entry() {
        let err = SoilLibraryCodec::parse("1\n1 Sand\n1 800 1. 1. 0.09\n").unwrap_err();
        assert!(matches!(err, CfError::TruncatedInput { .. }));
    }

    #[test]
    fn test_roundtrip() {
        let lib = SoilLibraryCodec::parse(SAMPLE).unwrap();
        let mut buf = Vec::new();
        SoilLibraryCodec::write_to(&mut buf, &lib).unwrap();
        let parsed = SoilLibraryCodec::parse(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(parsed, lib);
    }
}
