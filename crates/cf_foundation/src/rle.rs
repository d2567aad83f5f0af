// crates/cf_foundation/src/rle.rs

//! 一维游程压缩
//!
//! 边界条件的四条边数组和大孔隙场的列压缩都以"最长同值段"为单位
//! 写出区间行。区间一律为 0 起始半开，与 [`crate::range`] 的解析
//! 结果对应，保证 `decode(encode(x)) == x`。

/// 一个游程：半开区间 `[start, end)` 内的值均为 `value`
#[derive(Debug, Clone, PartialEq)]
pub struct Run<T> {
    /// 起始索引（含）
    pub start: usize,
    /// 结束索引（不含）
    pub end: usize,
    /// 段内的值
    pub value: T,
}

impl<T> Run<T> {
    /// 段长
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 是否为空段
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// 将序列压缩为最少数量的最长同值段
pub fn compress_1d<T: PartialEq + Clone>(values: &[T]) -> Vec<Run<T>> {
    let mut runs = Vec::new();
    let mut iter = values.iter().enumerate();
    let Some((_, first)) = iter.next() else {
        return runs;
    };
    let mut start = 0;
    let mut current = first;
    for (i, v) in iter {
        if v != current {
            runs.push(Run {
                start,
                end: i,
                value: current.clone(),
            });
            start = i;
            current = v;
        }
    }
    runs.push(Run {
        start,
        end: values.len(),
        value: current.clone(),
    });
    runs
}

/// 将游程展开回长度为 `n` 的序列，空隙填 `default`（测试与校验用）
pub fn expand_1d<T: Clone>(runs: &[Run<T>], n: usize, default: T) -> Vec<T> {
    let mut out = vec![default; n];
    for run in runs {
        for slot in out.iter_mut().take(run.end.min(n)).skip(run.start) {
            *slot = run.value.clone();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_run_count() {
        let arr = [0, 0, 0, 5, 5, 2, 2, 2];
        let runs = compress_1d(&arr);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], Run { start: 0, end: 3, value: 0 });
        assert_eq!(runs[1], Run { start: 3, end: 5, value: 5 });
        assert_eq!(runs[2], Run { start: 5, end: 8, value: 2 });
    }

    #[test]
    fn test_expand_reconstructs_exactly() {
        let arr = [0, 0, 0, 5, 5, 2, 2, 2];
        let runs = compress_1d(&arr);
        assert_eq!(expand_1d(&runs, arr.len(), -1), arr.to_vec());
    }

    #[test]
    fn test_empty_and_uniform() {
        assert!(compress_1d::<i32>(&[]).is_empty());
        let runs = compress_1d(&[7, 7, 7]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 3);
    }
}
