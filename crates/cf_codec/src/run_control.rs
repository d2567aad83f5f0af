// crates/cf_codec/src/run_control.rs

//! 主控制文件文法 (`run_NN.in`)
//!
//! 固定但不规则的布局，按严格状态顺序解析去注释后的有效行流：
//!
//! 1. 21 行标量头部（时间窗、方法、步长、迭代容差、地理位置、
//!    溶质数、随机种子、交互开关）
//! 2. 输出文件块：无固定偏移，向前扫描"单个整数行 + 紧随其后的
//!    等长 0/1 标志行"作为同步点
//! 3. 全局输入数量 + 对应条数的路径，前四条按约定为土壤库、驱动
//!    配置、土地利用库、风向库，多余条目保留不拒绝
//! 4. 坡面数量（带符号，符号无语义，取绝对值）
//! 5. 每个坡面 10 条路径，固定角色顺序；全局 `istact > 0` 时在水分
//!    初值之后多一条溶质初值路径
//!
//! 编码是镜像：重写后的文件必须能被同一状态机再次读取。

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cf_foundation::prelude::*;

use crate::util;

/// 标量头部的行数
const HEADER_LINES: usize = 21;

/// 运行控制参数（固定顺序的 21 个标量）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunControl {
    /// 模拟起始时刻，原样保留
    pub start_time: String,
    /// 模拟结束时刻，原样保留
    pub end_time: String,
    /// 时间偏移
    pub offset: f64,
    /// 计算方法（如 `pic`）
    pub method: String,
    /// 河道排水的最大时间步长 [s]
    pub dt_bach: f64,
    /// 排水阈值 [m³/s]
    pub qtol: f64,
    /// 最大时间步长 [s]
    pub dt_max: f64,
    /// 最小时间步长 [s]
    pub dt_min: f64,
    /// 初始时间步长 [s]
    pub dt_init: f64,
    /// 土壤含水量的最优变化
    pub d_th_opt: f64,
    /// 吸力水头的最优变化
    pub d_phi_opt: f64,
    /// 缩减时间步长的阈值
    pub n_gr: i64,
    /// Picard 迭代上限
    pub it_max: i64,
    /// Picard 收敛判据
    pub piceps: f64,
    /// 共轭梯度收敛判据
    pub cgeps: f64,
    /// 时角计算用经度
    pub rlongi: f64,
    /// 参考经度
    pub longi: f64,
    /// 参考纬度
    pub lati: f64,
    /// 溶质数，决定每坡面是否有溶质初值路径
    pub istact: i64,
    /// 随机种子
    pub seed: i64,
    /// 交互开关：0 = noiact，1 = simact
    pub interaction: i64,
    /// 输出文件路径
    pub output_files: Vec<String>,
    /// 输出标志，与 `output_files` 等长
    pub output_flags: Vec<i64>,
}

/// 四个全局库路径（相对工程根）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPaths {
    /// 土壤参数库 (`soils.def`)
    pub soil_library: String,
    /// 驱动配置 (`timeser.def`)
    pub forcing: String,
    /// 土地利用库 (`lu_file.def`)
    pub land_use_library: String,
    /// 风向库 (`winddir.def`)
    pub wind_library: String,
    /// 第 4 条之后的多余条目，保留不拒绝
    pub extras: Vec<String>,
}

/// 一个坡面的输入路径，固定角色顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HillPaths {
    /// 网格几何 (`.geo`)
    pub geometry: String,
    /// 土壤赋值 (`.bod`)
    pub soil: String,
    /// K 异质性网格
    pub k_heterogeneity: String,
    /// θ 异质性网格
    pub theta_heterogeneity: String,
    /// 大孔隙参数场 (`.mak`)
    pub macropores: String,
    /// 控制体 (`.cv`)
    pub control_volume: String,
    /// 水分初值 (`.ini`)
    pub initial_water: String,
    /// 溶质初值，仅 `istact > 0` 时存在
    pub initial_solute: Option<String>,
    /// 输出时刻表 (`.prt`)
    pub printout: String,
    /// 地表赋值 (`.pob`)
    pub surface: String,
    /// 边界条件 (`.rb`)
    pub boundary: String,
}

/// 一个 `run_NN.in` 的完整解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFilePlan {
    /// 标量参数与输出块
    pub control: RunControl,
    /// 全局库路径
    pub globals: GlobalPaths,
    /// 每坡面的输入路径
    pub hills: Vec<HillPaths>,
}

/// `run_NN.in` 文件编解码器
pub struct RunControlCodec;

impl RunControlCodec {
    /// 从文件装载
    pub fn load<P: AsRef<Path>>(path: P) -> CfResult<RunFilePlan> {
        let content = util::read_file(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> CfResult<RunFilePlan> {
        let mut scan = TokenLines::new(content);

        let mut header = Vec::with_capacity(HEADER_LINES);
        for i in 0..HEADER_LINES {
            let line = scan.next_line().ok_or_else(|| {
                CfError::malformed_header(i + 1, "run control header ends early")
            })?;
            header.push(line);
        }

        let interaction_text = header[20].text.to_ascii_lowercase();
        let interaction = if interaction_text.contains("noiact") {
            0
        } else if interaction_text.contains("simact") {
            1
        } else {
            header[20].i64_at(0).unwrap_or(0)
        };

        let mut control = RunControl {
            start_time: header[0].text.to_string(),
            end_time: header[1].text.to_string(),
            offset: header[2].f64_at(0)?,
            method: header[3].text.to_string(),
            dt_bach: header[4].f64_at(0)?,
            qtol: header[5].f64_at(0)?,
            dt_max: header[6].f64_at(0)?,
            dt_min: header[7].f64_at(0)?,
            dt_init: header[8].f64_at(0)?,
            d_th_opt: header[9].f64_at(0)?,
            d_phi_opt: header[10].f64_at(0)?,
            n_gr: header[11].i64_at(0)?,
            it_max: header[12].i64_at(0)?,
            piceps: header[13].f64_at(0)?,
            cgeps: header[14].f64_at(0)?,
            rlongi: header[15].f64_at(0)?,
            longi: header[16].f64_at(0)?,
            lati: header[17].f64_at(0)?,
            istact: header[18].i64_at(0)?,
            seed: header[19].i64_at(0)?,
            interaction,
            output_files: Vec::new(),
            output_flags: Vec::new(),
        };

        let n_out = Self::seek_output_block(&mut scan)?;
        let flags_line = scan.expect("output flags")?;
        for idx in 0..n_out {
            control.output_flags.push(flags_line.i64_at(idx)?);
        }
        for i in 0..n_out {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("output paths", n_out, i))?;
            control.output_files.push(line.text.to_string());
        }

        let n_global = scan.expect("global input count")?.usize_at(0)?;
        if n_global < 4 {
            return Err(CfError::invalid_input(format!(
                "expected at least 4 global inputs, got {}",
                n_global
            )));
        }
        let mut global_paths = Vec::with_capacity(n_global);
        for i in 0..n_global {
            let line = scan
                .next_line()
                .ok_or_else(|| CfError::truncated("global input paths", n_global, i))?;
            global_paths.push(line.text.to_string());
        }
        let extras = global_paths.split_off(4);
        let globals = GlobalPaths {
            soil_library: global_paths[0].clone(),
            forcing: global_paths[1].clone(),
            land_use_library: global_paths[2].clone(),
            wind_library: global_paths[3].clone(),
            extras,
        };

        // 符号无语义
        let n_hills = scan.expect("hill count")?.i64_at(0)?.unsigned_abs() as usize;
        let with_solute = control.istact > 0;
        let mut hills = Vec::with_capacity(n_hills);
        for _ in 0..n_hills {
            hills.push(Self::parse_hill_paths(&mut scan, with_solute)?);
        }

        Ok(RunFilePlan {
            control,
            globals,
            hills,
        })
    }

    // 输出块同步点：单个整数行，紧随一行恰好等长的 0/1 记号。
    // 消费同步点之前的多余行和整数行本身，返回输出文件数。
    fn seek_output_block(scan: &mut TokenLines) -> CfResult<usize> {
        let mut offset = 0;
        loop {
            let Some(line) = scan.peek_at(offset) else {
                return Err(CfError::invalid_input(
                    "output block sync point not found in run control file",
                ));
            };
            if line.fields().len() == 1 {
                if let Ok(n) = line.text.parse::<i64>() {
                    let count = n.unsigned_abs() as usize;
                    if count > 0 {
                        if let Some(next) = scan.peek_at(offset + 1) {
                            let flags = next.fields();
                            if flags.len() == count
                                && flags.iter().all(|f| *f == "0" || *f == "1")
                            {
                                scan.skip(offset + 1);
                                return Ok(count);
                            }
                        }
                    }
                }
            }
            offset += 1;
        }
    }

    fn parse_hill_paths(scan: &mut TokenLines, with_solute: bool) -> CfResult<HillPaths> {
        let mut next = |context: &str| -> CfResult<String> {
            Ok(scan.expect(context)?.text.to_string())
        };
        Ok(HillPaths {
            geometry: next("hill geometry path")?,
            soil: next("hill soil path")?,
            k_heterogeneity: next("hill k heterogeneity path")?,
            theta_heterogeneity: next("hill theta heterogeneity path")?,
            macropores: next("hill macropore path")?,
            control_volume: next("hill control volume path")?,
            initial_water: next("hill initial condition path")?,
            initial_solute: if with_solute {
                Some(next("hill solute initial condition path")?)
            } else {
                None
            },
            printout: next("hill printout path")?,
            surface: next("hill surface path")?,
            boundary: next("hill boundary path")?,
        })
    }

    /// 写到文件
    pub fn save<P: AsRef<Path>>(path: P, plan: &RunFilePlan) -> CfResult<()> {
        util::write_file(path.as_ref(), &Self::render(plan)?)
    }

    /// 写到流
    pub fn write_to<W: Write>(writer: &mut W, plan: &RunFilePlan) -> CfResult<()> {
        writer
            .write_all(Self::render(plan)?.as_bytes())
            .map_err(|e| CfError::io_with_source("run control write failed", e))
    }

    fn render(plan: &RunFilePlan) -> CfResult<String> {
        let c = &plan.control;
        if c.istact > 0 {
            for (i, hill) in plan.hills.iter().enumerate() {
                if hill.initial_solute.is_none() {
                    return Err(CfError::invalid_input(format!(
                        "istact = {} but hill {} has no solute initial condition path",
                        c.istact,
                        i + 1
                    )));
                }
            }
        }

        let mut out = String::new();
        let mut push = |value: &str, label: &str| {
            out.push_str(&format!("{:<30} % {}\n", value, label));
        };
        push(&c.start_time, "start time");
        push(&c.end_time, "end time");
        push(&c.offset.to_string(), "offset");
        push(&c.method, "computation method");
        push(&c.dt_bach.to_string(), "dtbach");
        push(&c.qtol.to_string(), "qtol");
        push(&c.dt_max.to_string(), "dt_max");
        push(&c.dt_min.to_string(), "dt_min");
        push(&c.dt_init.to_string(), "dt_init");
        push(&c.d_th_opt.to_string(), "d_Th_opt");
        push(&c.d_phi_opt.to_string(), "d_Phi_opt");
        push(&c.n_gr.to_string(), "n_gr");
        push(&c.it_max.to_string(), "it_max");
        push(&c.piceps.to_string(), "piceps");
        push(&c.cgeps.to_string(), "cgeps");
        push(&c.rlongi.to_string(), "rlongi");
        push(&c.longi.to_string(), "longi");
        push(&c.lati.to_string(), "lati");
        push(&c.istact.to_string(), "istact");
        push(&c.seed.to_string(), "random seed");
        push(
            if c.interaction == 0 { "noiact" } else { "simact" },
            "interaction",
        );

        out.push_str(&format!("{} % number of output files\n", c.output_files.len()));
        let flags: Vec<String> = (0..c.output_files.len())
            .map(|i| c.output_flags.get(i).copied().unwrap_or(1).to_string())
            .collect();
        out.push_str(&flags.join(" "));
        out.push('\n');
        for file in &c.output_files {
            out.push_str(file);
            out.push('\n');
        }

        let g = &plan.globals;
        out.push_str(&format!("{}\n", 4 + g.extras.len()));
        out.push_str(&format!("{}\n{}\n{}\n{}\n", g.soil_library, g.forcing, g.land_use_library, g.wind_library));
        for extra in &g.extras {
            out.push_str(extra);
            out.push('\n');
        }

        out.push_str(&format!("-{}\n", plan.hills.len()));
        for hill in &plan.hills {
            out.push_str(&format!("{}\n{}\n", hill.geometry, hill.soil));
            out.push_str(&format!("{}\n{}\n", hill.k_heterogeneity, hill.theta_heterogeneity));
            out.push_str(&format!("{}\n{}\n", hill.macropores, hill.control_volume));
            out.push_str(&format!("{}\n", hill.initial_water));
            if c.istact > 0 {
                if let Some(solute) = &hill.initial_solute {
                    out.push_str(solute);
                    out.push('\n');
                }
            }
            out.push_str(&format!("{}\n{}\n{}\n", hill.printout, hill.surface, hill.boundary));
        }
        Ok(out)
    }
}
