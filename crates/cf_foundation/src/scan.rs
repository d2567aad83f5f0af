// crates/cf_foundation/src/scan.rs

//! 去注释的逐行扫描器
//!
//! CATFLOW 的全部输入文件都是按位置解释的 ASCII 文本：`%` 之后为
//! 行内注释，`#` 开头为整行注释，空行无意义。[`TokenLines`] 在构造时
//! 一次性完成清理，之后编解码器按顺序消费"有效行"，行号保留为
//! 原始文件中的 1 起始行号，便于错误定位。

use crate::error::{CfError, CfResult};

/// 一条有效行：原始行号 + 去注释后的文本
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// 原始文件中的行号（1 起始）
    pub number: usize,
    /// 去掉注释与首尾空白后的文本
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// 按空白切分出的记号
    pub fn fields(&self) -> Vec<&'a str> {
        self.text.split_whitespace().collect()
    }

    /// 第 `idx` 个记号解析为 f64
    pub fn f64_at(&self, idx: usize) -> CfResult<f64> {
        let fields = self.fields();
        let tok = fields.get(idx).ok_or_else(|| {
            CfError::parse(self.number, format!("missing token {}", idx + 1))
        })?;
        tok.parse::<f64>()
            .map_err(|_| CfError::parse(self.number, format!("'{}' is not a number", tok)))
    }

    /// 第 `idx` 个记号解析为 i64（容忍 `1.` 这类浮点写法）
    pub fn i64_at(&self, idx: usize) -> CfResult<i64> {
        let fields = self.fields();
        let tok = fields.get(idx).ok_or_else(|| {
            CfError::parse(self.number, format!("missing token {}", idx + 1))
        })?;
        if let Ok(v) = tok.parse::<i64>() {
            return Ok(v);
        }
        tok.parse::<f64>()
            .map(|v| v as i64)
            .map_err(|_| CfError::parse(self.number, format!("'{}' is not an integer", tok)))
    }

    /// 第 `idx` 个记号解析为 usize
    pub fn usize_at(&self, idx: usize) -> CfResult<usize> {
        let v = self.i64_at(idx)?;
        if v < 0 {
            return Err(CfError::parse(
                self.number,
                format!("expected non-negative integer, got {}", v),
            ));
        }
        Ok(v as usize)
    }

    /// 整行解析为 f64 序列
    pub fn all_f64(&self) -> CfResult<Vec<f64>> {
        self.text
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>().map_err(|_| {
                    CfError::parse(self.number, format!("'{}' is not a number", tok))
                })
            })
            .collect()
    }
}

/// 有效行的顺序扫描器
#[derive(Debug)]
pub struct TokenLines<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> TokenLines<'a> {
    /// 清理整段文本并建立扫描器
    pub fn new(content: &'a str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let no_comment = raw.split('%').next().unwrap_or("").trim();
                if no_comment.is_empty() || no_comment.starts_with('#') {
                    None
                } else {
                    Some(Line {
                        number: i + 1,
                        text: no_comment,
                    })
                }
            })
            .collect();
        Self { lines, pos: 0 }
    }

    /// 已消费的有效行数
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// 剩余有效行数
    pub fn remaining(&self) -> usize {
        self.lines.len() - self.pos
    }

    /// 消费下一有效行
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        let line = self.lines.get(self.pos).copied();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    /// 消费下一有效行，耗尽时报 [`CfError::TruncatedInput`]
    pub fn expect(&mut self, context: &str) -> CfResult<Line<'a>> {
        let consumed = self.pos;
        self.next_line()
            .ok_or_else(|| CfError::truncated(context, consumed + 1, consumed))
    }

    /// 窥视下一有效行而不消费
    pub fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// 按索引窥视任意有效行（用于运行控制文件的同步点扫描）
    pub fn peek_at(&self, offset: usize) -> Option<Line<'a>> {
        self.lines.get(self.pos + offset).copied()
    }

    /// 跳过 `n` 条有效行
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.lines.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_comments_and_blanks() {
        let content = "a 1 % trailing\n\n# full comment\n  b 2  \n";
        let mut scan = TokenLines::new(content);
        let l1 = scan.next_line().unwrap();
        assert_eq!(l1.text, "a 1");
        assert_eq!(l1.number, 1);
        let l2 = scan.next_line().unwrap();
        assert_eq!(l2.text, "b 2");
        assert_eq!(l2.number, 4);
        assert!(scan.next_line().is_none());
    }

    #[test]
    fn test_expect_reports_truncation() {
        let mut scan = TokenLines::new("only\n");
        scan.next_line();
        let err = scan.expect("range rows").unwrap_err();
        assert!(err.to_string().contains("range rows"));
    }

    #[test]
    fn test_tolerant_integer_parse() {
        let mut scan = TokenLines::new("1. 5\n");
        let line = scan.next_line().unwrap();
        assert_eq!(line.i64_at(0).unwrap(), 1);
        assert_eq!(line.usize_at(1).unwrap(), 5);
    }
}
