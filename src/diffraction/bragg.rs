//! # Bragg 位置表
//!
//! 每个衍射组一行：
//! `h k l 多重度 相号 2θ shift FWHM 强度 0 0 0`
//!
//! shift 与 FWHM 列在生成时为占位文本，精修程序可写入数值。
//! 文件为制表符分隔，浮点数保留 6 位小数；读回时前 5 列四舍五入为整数。
//!
//! ## 依赖关系
//! - 被 `commands/bragg.rs`、`commands/pattern.rs` 和 `models/parameters.rs` 使用
//! - 使用 `diffraction/hkl.rs` 的 ReflectionGroup

use crate::diffraction::hkl::ReflectionGroup;
use crate::error::{QdiffractError, Result};

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 每行的列数
pub const COLUMN_COUNT: usize = 12;

/// 文本或数值单元格（shift / FWHM 列）
#[derive(Debug, Clone, PartialEq)]
pub enum BraggCell {
    Text(String),
    Number(f64),
}

impl BraggCell {
    fn parse(raw: &str) -> Self {
        raw.parse::<f64>()
            .map(BraggCell::Number)
            .unwrap_or_else(|_| BraggCell::Text(raw.to_string()))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            BraggCell::Number(v) => Some(*v),
            BraggCell::Text(_) => None,
        }
    }
}

impl fmt::Display for BraggCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BraggCell::Text(s) => write!(f, "{}", s),
            BraggCell::Number(v) => write!(f, "{:.6}", v),
        }
    }
}

/// 一条 Bragg 位置
#[derive(Debug, Clone, PartialEq)]
pub struct BraggRow {
    pub hkl: [i32; 3],
    pub multiplicity: usize,
    pub phase_id: u32,
    pub two_theta: f64,
    pub shift: BraggCell,
    pub fwhm: BraggCell,
    /// 平均 |F|² × 多重度
    pub intensity: f64,
    pub extra: [f64; 3],
}

impl BraggRow {
    pub fn from_group(group: &ReflectionGroup, phase_id: u32) -> Self {
        Self {
            hkl: group.label,
            multiplicity: group.multiplicity,
            phase_id,
            two_theta: group.mean_two_theta(),
            shift: BraggCell::Text("shift".to_string()),
            fwhm: BraggCell::Text("FWHM".to_string()),
            intensity: group.intensity(),
            extra: [0.0; 3],
        }
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{:.6}\t{}\t{}\t{:.6}\t{}\t{}\t{}",
            self.hkl[0],
            self.hkl[1],
            self.hkl[2],
            self.multiplicity,
            self.phase_id,
            self.two_theta,
            self.shift,
            self.fwhm,
            self.intensity,
            format_extra(self.extra[0]),
            format_extra(self.extra[1]),
            format_extra(self.extra[2]),
        )
    }

    fn from_line(line: &str, path: &str, line_no: usize) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < COLUMN_COUNT {
            return Err(parse_error(
                path,
                format!(
                    "line {}: expected {} columns, found {}",
                    line_no,
                    COLUMN_COUNT,
                    fields.len()
                ),
            ));
        }

        let number = |idx: usize| -> Result<f64> {
            fields[idx].trim().parse::<f64>().map_err(|_| {
                parse_error(
                    path,
                    format!("line {}: column {} is not numeric: '{}'", line_no, idx + 1, fields[idx]),
                )
            })
        };
        let integer = |idx: usize| -> Result<i64> { Ok(number(idx)?.round() as i64) };

        let multiplicity = integer(3)?;
        let phase_id = integer(4)?;
        if multiplicity < 0 || phase_id < 0 {
            return Err(parse_error(
                path,
                format!("line {}: multiplicity and phase must be non-negative", line_no),
            ));
        }

        Ok(Self {
            hkl: [integer(0)? as i32, integer(1)? as i32, integer(2)? as i32],
            multiplicity: multiplicity as usize,
            phase_id: phase_id as u32,
            two_theta: number(5)?,
            shift: BraggCell::parse(fields[6].trim()),
            fwhm: BraggCell::parse(fields[7].trim()),
            intensity: number(8)?,
            extra: [number(9)?, number(10)?, number(11)?],
        })
    }
}

fn format_extra(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}

fn parse_error(path: &str, reason: String) -> QdiffractError {
    QdiffractError::ParseError {
        format: "Bragg positions".to_string(),
        path: path.to_string(),
        reason,
    }
}

/// 由衍射组组装 Bragg 位置：按 2θ 升序，可选截断于 `two_theta_max`
pub fn build_bragg_positions(
    groups: &[ReflectionGroup],
    phase_id: u32,
    two_theta_max: Option<f64>,
) -> Vec<BraggRow> {
    let mut rows: Vec<BraggRow> = groups
        .iter()
        .filter(|g| !g.members.is_empty())
        .map(|g| BraggRow::from_group(g, phase_id))
        .collect();
    rows.sort_by(|a, b| a.two_theta.total_cmp(&b.two_theta));
    if let Some(max) = two_theta_max {
        rows.retain(|r| r.two_theta <= max);
    }
    rows
}

/// 写入 Bragg 位置文件
pub fn save_bragg_positions(rows: &[BraggRow], path: &Path) -> Result<()> {
    let write_err = |e| QdiffractError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };
    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        writeln!(writer, "{}", row.to_line()).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)?;
    Ok(())
}

/// 读取 Bragg 位置文件（空行忽略）
pub fn load_bragg_positions(path: &Path) -> Result<Vec<BraggRow>> {
    if !path.exists() {
        return Err(QdiffractError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| QdiffractError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_bragg_positions(&content, &path.display().to_string())
}

pub fn parse_bragg_positions(content: &str, path: &str) -> Result<Vec<BraggRow>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| BraggRow::from_line(line, path, idx + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffraction::hkl::ReflectionRow;
    use num_complex::Complex64;
    use tempfile::tempdir;

    fn member(hkl: [i32; 3], two_theta: f64, f2: f64) -> ReflectionRow {
        ReflectionRow {
            hkl,
            d: 2.0,
            two_theta,
            stl: 0.25,
            phase: Complex64::new(1.0, 0.0),
            op_index: 0,
            f2,
        }
    }

    fn sample_groups() -> Vec<ReflectionGroup> {
        vec![
            ReflectionGroup {
                label: [0, 0, 2],
                multiplicity: 2,
                members: vec![member([0, 0, 2], 40.0, 10.0), member([0, 0, -2], 40.0, 12.0)],
            },
            ReflectionGroup {
                label: [0, 0, 1],
                multiplicity: 1,
                members: vec![member([0, 0, 1], 20.0, 5.0)],
            },
            ReflectionGroup {
                label: [0, 0, 3],
                multiplicity: 1,
                members: vec![member([0, 0, 3], 65.0, 1.0)],
            },
        ]
    }

    #[test]
    fn test_build_sorted_and_truncated() {
        let rows = build_bragg_positions(&sample_groups(), 1, Some(60.0));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hkl, [0, 0, 1]);
        assert_eq!(rows[1].hkl, [0, 0, 2]);
        // 平均 |F|² = 11，乘多重度 2
        assert!((rows[1].intensity - 22.0).abs() < 1e-12);
        assert_eq!(rows[1].shift, BraggCell::Text("shift".to_string()));

        let all = build_bragg_positions(&sample_groups(), 2, None);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.phase_id == 2));
    }

    #[test]
    fn test_line_format() {
        let rows = build_bragg_positions(&sample_groups(), 1, Some(30.0));
        assert_eq!(
            rows[0].to_line(),
            "0\t0\t1\t1\t1\t20.000000\tshift\tFWHM\t5.000000\t0\t0\t0"
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Phase1_bragg_positions.txt");

        let mut rows = build_bragg_positions(&sample_groups(), 1, None);
        rows[0].two_theta = 20.123456789;
        rows[1].fwhm = BraggCell::Number(0.0512);
        save_bragg_positions(&rows, &path).unwrap();

        let loaded = load_bragg_positions(&path).unwrap();
        assert_eq!(loaded.len(), rows.len());
        assert!((loaded[0].two_theta - 20.123457).abs() < 1e-9);
        assert_eq!(loaded[1].fwhm, BraggCell::Number(0.0512));
        assert_eq!(loaded[2].hkl, [0, 0, 3]);
        assert_eq!(loaded[1].multiplicity, 2);
        assert_eq!(loaded[0].shift.as_number(), None);
    }

    #[test]
    fn test_load_rounds_integer_columns() {
        let content = "1.0000004\t-1\t0.9999\t12.0\t1\t35.5\tshift\tFWHM\t100.0\t0\t0\t0\n\n";
        let rows = parse_bragg_positions(content, "mem").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hkl, [1, -1, 1]);
        assert_eq!(rows[0].multiplicity, 12);
    }

    #[test]
    fn test_load_errors() {
        assert!(parse_bragg_positions("1\t2\t3", "mem").is_err());
        assert!(parse_bragg_positions("a\t0\t0\t1\t1\t10\ts\tF\t1\t0\t0\t0", "mem").is_err());
        assert!(matches!(
            load_bragg_positions(Path::new("/nonexistent/bragg.txt")),
            Err(QdiffractError::FileNotFound { .. })
        ));
    }
}
