// crates/cf_codec/src/landuse.rs

//! 土地利用库 (`lu_file.def` + `*.par`)
//!
//! 定义文件每行一个类型：编号、名称、参数表相对路径。路径总是
//! 相对工程根，名称可含空白，因此按"首记号 = 编号、末记号 = 路径、
//! 中间 = 名称"切分。
//!
//! 参数表 `.par` 是植被的季节参数：首行为列数 + 列标签，之后每行
//! 一个年积日加参数值。装载时递归读取各 `.par`，缺失的参数表降级
//! 为警告并保留路径。

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use cf_foundation::prelude::*;

use crate::util;

/// 植被参数表的一行：年积日 + 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRow {
    /// 年积日
    pub day: i64,
    /// 参数值（列序与表头标签对应）
    pub params: Vec<f64>,
}

/// 一个 `.par` 植被参数表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantTable {
    /// 表头首记号（列数声明，原样保留）
    pub column_count: i64,
    /// 列标签
    pub labels: Vec<String>,
    /// 行
    pub rows: Vec<PlantRow>,
}

/// 一个土地利用类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseType {
    /// 编号，被 `.pob` 赋值引用
    pub id: i64,
    /// 名称
    pub name: String,
    /// 参数表路径，相对工程根
    pub par_path: String,
    /// 装载到的参数表（文件缺失时为 `None`）
    pub table: Option<PlantTable>,
}

/// 土地利用库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandUseLibrary {
    /// 类型列表，文件顺序
    pub types: Vec<LandUseType>,
}

/// `lu_file.def` 文件编解码器
pub struct LandUseCodec;

impl LandUseCodec {
    /// 从定义文件装载，`root` 为解析 `.par` 相对路径的工程根
    pub fn load<P: AsRef<Path>>(def_path: P, root: &Path) -> CfResult<LandUseLibrary> {
        let content = util::read_file(def_path.as_ref())?;
        let mut lib = Self::parse(&content)?;
        for lu in &mut lib.types {
            let full = root.join(&lu.par_path);
            if full.exists() {
                let par_content = util::read_file(&full)?;
                lu.table = Some(Self::parse_par(&par_content).map_err(|e| e.in_file(full))?);
            } else {
                warn!(path = %full.display(), "plant parameter table missing");
            }
        }
        Ok(lib)
    }

    /// 只解析定义文件，不追参数表
    pub fn parse(content: &str) -> CfResult<LandUseLibrary> {
        let mut scan = TokenLines::new(content);
        let mut types = Vec::new();
        while let Some(line) = scan.next_line() {
            let fields = line.fields();
            if fields.len() < 3 {
                return Err(CfError::parse(
                    line.number,
                    format!("expected id, name and path, got {} tokens", fields.len()),
                ));
            }
            types.push(LandUseType {
                id: line.i64_at(0)?,
                name: fields[1..fields.len() - 1].join(" "),
                par_path: fields[fields.len() - 1].to_string(),
                table: None,
            });
        }
        Ok(LandUseLibrary { types })
    }

    /// 解析一个 `.par` 参数表
    pub fn parse_par(content: &str) -> CfResult<PlantTable> {
        let mut scan = TokenLines::new(content);
        let header = scan.expect("plant table header")?;
        let column_count = header.i64_at(0)?;
        let labels = header.fields()[1..]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        while let Some(line) = scan.next_line() {
            let values = line.all_f64()?;
            let Some((day, params)) = values.split_first() else {
                continue;
            };
            rows.push(PlantRow {
                day: *day as i64,
                params: params.to_vec(),
            });
        }
        Ok(PlantTable {
            column_count,
            labels,
            rows,
        })
    }

    /// 写定义文件及其引用的全部参数表
    pub fn save<P: AsRef<Path>>(def_path: P, root: &Path, lib: &LandUseLibrary) -> CfResult<()> {
        for lu in &lib.types {
            if let Some(table) = &lu.table {
                util::write_file(&root.join(&lu.par_path), &Self::render_par(table))?;
            }
        }
        util::write_file(def_path.as_ref(), &Self::render(lib))
    }

    /// 只写定义文件到流
    pub fn write_to<W: Write>(writer: &mut W, lib: &LandUseLibrary) -> CfResult<()> {
        writer
            .write_all(Self::render(lib).as_bytes())
            .map_err(|e| CfError::io_with_source("land use library write failed", e))
    }

    fn render(lib: &LandUseLibrary) -> String {
        let mut out = String::new();
        for lu in &lib.types {
            out.push_str(&format!("{:<5} {:<35} {}\n", lu.id, lu.name, lu.par_path));
        }
        out
    }

    fn render_par(table: &PlantTable) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            table.column_count,
            table.labels.join("  ")
        ));
        for row in &table.rows {
            let params: Vec<String> = row.params.iter().map(|x| x.to_string()).collect();
            out.push_str(&format!("{}. {}\n", row.day, params.join("  ")));
        }
        out
    }

    /// 参数表的规范存放路径
    pub fn canonical_par_path(filename: &str) -> PathBuf {
        PathBuf::from("in/landuse").join(filename)
    }
}
