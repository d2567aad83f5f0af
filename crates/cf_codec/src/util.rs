// crates/cf_codec/src/util.rs

//! 文件读写的内部公共封装

use std::path::Path;

use chrono::{NaiveDateTime, Timelike};

use cf_foundation::{CfError, CfResult};

/// 读整个文件为字符串；不存在时报 `MissingRequiredFile`
pub(crate) fn read_file(path: &Path) -> CfResult<String> {
    if !path.exists() {
        return Err(CfError::MissingRequiredFile {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| {
        CfError::io_with_source(format!("cannot read {}", path.display()), e)
    })
}

/// 写整个文件，必要时建立父目录
pub(crate) fn write_file(path: &Path, content: &str) -> CfResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            CfError::io_with_source(format!("cannot create {}", parent.display()), e)
        })?;
    }
    std::fs::write(path, content).map_err(|e| {
        CfError::io_with_source(format!("cannot write {}", path.display()), e)
    })
}

/// 解析 `dd.mm.yyyy HH:MM:SS[.ss]` 时刻
pub(crate) fn parse_datetime(text: &str, line: usize) -> CfResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M:%S"))
        .map_err(|_| CfError::parse(line, format!("'{}' is not a datetime", text)))
}

/// 按 `dd.mm.yyyy HH:MM:SS.ss` 写回时刻（百分之一秒精度）
pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    format!(
        "{}.{:02}",
        dt.format("%d.%m.%Y %H:%M:%S"),
        dt.nanosecond() / 10_000_000
    )
}
