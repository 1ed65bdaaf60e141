//! # 图谱导出
//!
//! ## 支持格式
//! - CSV: Bragg 位置（2θ, 强度, hkl, 多重度, 相号），或展宽图谱（2θ, 强度）
//! - XY: 展宽图谱的文本交换格式，带 `#` 注释头
//!
//! ## 依赖关系
//! - 被 `commands/pattern.rs` 和 `commands/bragg.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::diffraction::bragg::BraggRow;
use crate::error::{QdiffractError, Result};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> QdiffractError + '_ {
    move |e| QdiffractError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    }
}

/// 导出 Bragg 位置（峰位）为 CSV
pub fn sticks_to_csv(rows: &[BraggRow], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["2theta", "intensity", "h", "k", "l", "multiplicity", "phase"])?;

    let mut sorted: Vec<&BraggRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.two_theta.total_cmp(&b.two_theta));

    for row in sorted {
        wtr.write_record(&[
            format!("{:.4}", row.two_theta),
            format!("{:.4}", row.intensity),
            row.hkl[0].to_string(),
            row.hkl[1].to_string(),
            row.hkl[2].to_string(),
            row.multiplicity.to_string(),
            row.phase_id.to_string(),
        ])?;
    }

    wtr.flush().map_err(write_error(output_path))?;
    Ok(())
}

/// 导出展宽图谱为 CSV
pub fn broadened_to_csv(data: &[(f64, f64)], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(["2theta", "intensity"])?;
    for (two_theta, intensity) in data {
        wtr.write_record(&[format!("{:.4}", two_theta), format!("{:.4}", intensity)])?;
    }

    wtr.flush().map_err(write_error(output_path))?;
    Ok(())
}

/// 导出展宽图谱为 XY
pub fn broadened_to_xy(
    data: &[(f64, f64)],
    title: &str,
    wavelength: Option<f64>,
    output_path: &Path,
) -> Result<()> {
    let err = write_error(output_path);
    let file = File::create(output_path).map_err(&err)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# Pattern: {} (broadened)", title).map_err(&err)?;
    if let Some(wavelength) = wavelength {
        writeln!(out, "# Wavelength: {:.6} Angstrom", wavelength).map_err(&err)?;
    }
    writeln!(out, "# Columns: 2theta (degrees), Intensity (relative)").map_err(&err)?;
    writeln!(out, "#").map_err(&err)?;

    for (two_theta, intensity) in data {
        writeln!(out, "{:.4}\t{:.4}", two_theta, intensity).map_err(&err)?;
    }

    out.flush().map_err(&err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffraction::bragg::BraggCell;
    use std::fs;
    use tempfile::tempdir;

    fn rows() -> Vec<BraggRow> {
        vec![
            BraggRow {
                hkl: [0, 0, 2],
                multiplicity: 6,
                phase_id: 1,
                two_theta: 31.7,
                shift: BraggCell::Text("shift".to_string()),
                fwhm: BraggCell::Text("FWHM".to_string()),
                intensity: 1200.0,
                extra: [0.0; 3],
            },
            BraggRow {
                hkl: [1, -1, -1],
                multiplicity: 8,
                phase_id: 1,
                two_theta: 27.4,
                shift: BraggCell::Text("shift".to_string()),
                fwhm: BraggCell::Text("FWHM".to_string()),
                intensity: 300.0,
                extra: [0.0; 3],
            },
        ]
    }

    #[test]
    fn test_sticks_csv_sorted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sticks.csv");
        sticks_to_csv(&rows(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "2theta,intensity,h,k,l,multiplicity,phase");
        assert_eq!(lines[1], "27.4000,300.0000,1,-1,-1,8,1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_broadened_exports() {
        let dir = tempdir().unwrap();
        let data = vec![(10.0, 0.0), (10.5, 100.0)];

        let csv_path = dir.path().join("pattern.csv");
        broadened_to_csv(&data, &csv_path).unwrap();
        let csv_content = fs::read_to_string(&csv_path).unwrap();
        assert!(csv_content.contains("10.5000,100.0000"));

        let xy_path = dir.path().join("pattern.xy");
        broadened_to_xy(&data, "NaCl", Some(1.5418), &xy_path).unwrap();
        let xy_content = fs::read_to_string(&xy_path).unwrap();
        assert!(xy_content.starts_with("# Pattern: NaCl"));
        assert!(xy_content.contains("# Wavelength: 1.541800"));
        assert!(xy_content.trim_end().ends_with("10.5000\t100.0000"));
    }
}
