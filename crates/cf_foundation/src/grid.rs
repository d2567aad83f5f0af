// crates/cf_foundation/src/grid.rs

//! 稠密二维网格存储
//!
//! [`Grid2`] 以 `(n_layers, n_columns)` 形状按行主序平铺存储，
//! 内部约定行索引 0 = 底层、行索引 `n_layers-1` = 地表层。
//! 磁盘文件一律自上而下书写，翻转由各编解码器在解码/编码时完成
//! （见 [`Grid2::flip_vertical`]）。

use serde::{Deserialize, Serialize};

use crate::error::{CfError, CfResult};

/// 网格尺寸：垂直层数 × 侧向列数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    /// 垂直节点数（层）
    pub n_layers: usize,
    /// 侧向节点数（列）
    pub n_columns: usize,
}

impl GridDims {
    /// 创建尺寸
    pub fn new(n_layers: usize, n_columns: usize) -> Self {
        Self {
            n_layers,
            n_columns,
        }
    }
}

/// 行主序稠密二维网格
///
/// 行对应垂直层（0 = 底层），列对应侧向位置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid2<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// 创建填满同一初值的网格
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// 从平铺数据创建，长度必须等于 `rows * cols`
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> CfResult<Self> {
        if data.len() != rows * cols {
            return Err(CfError::invalid_input(format!(
                "grid data length {} != {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// 行数（垂直层数）
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 列数（侧向列数）
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 尺寸
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.rows, self.cols)
    }

    /// 读取节点值
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.cols + col]
    }

    /// 写入节点值
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// 按块覆写：`rows`/`cols` 均为半开区间，越界部分被裁剪。
    /// 文件顺序靠后的块覆盖靠前的块，与求解器的读取顺序一致。
    pub fn fill_block(
        &mut self,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
        value: T,
    ) {
        let r_end = rows.end.min(self.rows);
        let c_end = cols.end.min(self.cols);
        for r in rows.start..r_end {
            for c in cols.start..c_end {
                self.data[r * self.cols + c] = value.clone();
            }
        }
    }

    /// 一行的切片
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// 一列的拷贝
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|r| self.get(r, col).clone()).collect()
    }

    /// 就地垂直翻转（首行与末行互换）
    ///
    /// 文件自上而下、内部自下而上，解码与编码各翻转一次。
    pub fn flip_vertical(&mut self) {
        for r in 0..self.rows / 2 {
            let opposite = self.rows - 1 - r;
            for c in 0..self.cols {
                self.data.swap(r * self.cols + c, opposite * self.cols + c);
            }
        }
    }

    /// 平铺数据的只读视图
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}
