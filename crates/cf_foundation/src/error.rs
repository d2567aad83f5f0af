// crates/cf_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CfError` 枚举和 `CfResult` 类型别名，覆盖整个编解码层的
//! 错误分类：头部格式、维度校验、关键字识别、提前截断、缺失文件、
//! 未实现的子格式。
//!
//! 编解码器自身只报告行号；文件路径由上层（编排器）通过
//! [`CfError::in_file`] 附加，必需组件的任何失败都会携带出错路径
//! 向上中止整个装载。

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type CfResult<T> = Result<T, CfError>;

/// CATFLOW 编解码错误类型
#[derive(Error, Debug)]
pub enum CfError {
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 被引用的文件不存在
    #[error("文件不存在: {path}")]
    MissingRequiredFile {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 固定位置行的记号数量或类型错误
    #[error("头部格式错误: 第{line}行: {message}")]
    MalformedHeader {
        /// 行号（1 起始，按去注释后的原始行计）
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 解码出的网格形状与期望的网格尺寸不符
    #[error("维度不匹配: {name} 期望 {expected_rows}x{expected_cols}, 实际 {actual_rows}x{actual_cols}")]
    DimensionMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望行数（垂直层数）
        expected_rows: usize,
        /// 期望列数（侧向列数）
        expected_cols: usize,
        /// 实际行数
        actual_rows: usize,
        /// 实际列数
        actual_cols: usize,
    },

    /// 无法识别的段落或格式标记
    #[error("未知关键字: '{keyword}' (第{line}行)")]
    UnknownKeyword {
        /// 读到的关键字
        keyword: String,
        /// 行号
        line: usize,
    },

    /// 数据块中途耗尽
    #[error("输入提前结束: {context} 期望 {expected} 条, 实际读取 {consumed} 条")]
    TruncatedInput {
        /// 正在读取的内容描述
        context: String,
        /// 期望的记录数
        expected: usize,
        /// 已消费的记录数
        consumed: usize,
    },

    /// 可识别但未实现的子格式
    #[error("不支持的子格式: {format}")]
    UnsupportedFormat {
        /// 子格式名称
        format: String,
    },

    /// 单行记号解析失败
    #[error("解析错误: 第{line}行: {message}")]
    ParseError {
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 带文件路径的上下文包装，由上层附加
    #[error("{path}: {source}")]
    InFile {
        /// 出错的文件路径
        path: PathBuf,
        /// 底层错误
        #[source]
        source: Box<CfError>,
    },
}

impl CfError {
    /// 从 IO 错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从 IO 错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 头部格式错误
    pub fn malformed_header(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            line,
            message: message.into(),
        }
    }

    /// 维度不匹配
    pub fn dimension_mismatch(
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Self::DimensionMismatch {
            name,
            expected_rows: expected.0,
            expected_cols: expected.1,
            actual_rows: actual.0,
            actual_cols: actual.1,
        }
    }

    /// 未知关键字
    pub fn unknown_keyword(keyword: impl Into<String>, line: usize) -> Self {
        Self::UnknownKeyword {
            keyword: keyword.into(),
            line,
        }
    }

    /// 输入截断
    pub fn truncated(context: impl Into<String>, expected: usize, consumed: usize) -> Self {
        Self::TruncatedInput {
            context: context.into(),
            expected,
            consumed,
        }
    }

    /// 不支持的子格式
    pub fn unsupported(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// 解析错误
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 为错误附加出错文件路径
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_contains_line() {
        let err = CfError::malformed_header(3, "expected 4 tokens, got 2");
        assert!(err.to_string().contains("第3行"));
    }

    #[test]
    fn test_in_file_wraps_path() {
        let err = CfError::truncated("node records", 20, 13).in_file("in/hill_1/hang.geo");
        let s = err.to_string();
        assert!(s.contains("hang.geo"));
        assert!(s.contains("20"));
        assert!(s.contains("13"));
    }
}
