// crates/cf_project/src/lib.rs

//! CATFLOW 工程编排层
//!
//! 把一个完整的模拟工程（入口文件 `CATFLOW.IN`、运行控制文件、
//! 全局库、各坡面的输入文件）聚合为内存模型 [`Project`]，并提供
//! 整体装载 [`load_project`] 与规范化写回 [`write_project`]。
//!
//! 装载按引用链展开：入口文件指向运行控制文件，运行控制文件列出
//! 全局库与每坡面的输入路径，逐节点文件的形状由该坡面的网格尺寸
//! 约束。写回不保留原始路径，一律落到规范目录布局。

#![warn(missing_docs)]

pub mod model;
pub mod orchestrator;

pub use model::{FileRole, GlobalConfig, Hill, Project};
pub use orchestrator::{load_project, write_project};

pub use cf_codec::{CfError, CfResult};
